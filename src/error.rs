pub const NO_DATA_PROVIDED: &str = "no data provided.";
pub const UNREADABLE_DATA: &str = "could not interpret the data — verify the copied content";

/// Everything that can go wrong in a consultation. None of these is fatal:
/// each one leaves the session ready for another attempt.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ConsultError {
    #[fail(
        display = "the registry blocked the automatic connection; open {} and paste the page below",
        url
    )]
    CorsOrNetwork { url: String },
    #[fail(display = "{}", _0)]
    EmptyInput(&'static str),
    #[fail(display = "{}", reason)]
    Extraction { reason: String },
    #[fail(display = "stored history is unreadable: {}", reason)]
    StorageRead { reason: String },
}

impl ConsultError {
    pub fn empty_input() -> ConsultError {
        ConsultError::EmptyInput(NO_DATA_PROVIDED)
    }

    pub fn unreadable() -> ConsultError {
        ConsultError::Extraction {
            reason: UNREADABLE_DATA.to_string(),
        }
    }

    /// Whether the manual copy-paste fallback can recover from this error.
    pub fn needs_manual_entry(&self) -> bool {
        match self {
            ConsultError::CorsOrNetwork { .. } => true,
            _ => false,
        }
    }
}

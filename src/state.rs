//! Consultation state machine. `next` is pure: the orchestrator performs the
//! fetch, extraction and history side effects and feeds their outcomes back
//! in as events.

use crate::detran::query_from_url;
use crate::error::ConsultError;
use crate::types::{ExtractedData, VehicleConsultation, VehicleQuery};
use chrono::{DateTime, Utc};
use log::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Fetching {
        url: Url,
    },
    ManualEntryNeeded {
        url: Url,
    },
    /// `fallback` holds the request URL when the text was pasted by hand, so
    /// a failed extraction can return to the manual-entry view.
    Extracting {
        query: VehicleQuery,
        fallback: Option<Url>,
    },
    Ready(VehicleConsultation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub phase: Phase,
    pub error: Option<ConsultError>,
    pub manual_text: String,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            phase: Phase::Idle,
            error: None,
            manual_text: String::new(),
        }
    }
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        match self.phase {
            Phase::Fetching { .. } | Phase::Extracting { .. } => true,
            _ => false,
        }
    }

    /// Whether a new query may start: the form is showing and nothing is in
    /// flight.
    pub fn accepts_submit(&self) -> bool {
        match self.phase {
            Phase::Idle | Phase::ManualEntryNeeded { .. } => true,
            _ => false,
        }
    }

    /// The request URL the user should open by hand, if any.
    pub fn manual_url(&self) -> Option<&Url> {
        match &self.phase {
            Phase::ManualEntryNeeded { url } => Some(url),
            Phase::Extracting {
                fallback: Some(url),
                ..
            } => Some(url),
            _ => None,
        }
    }

    pub fn consultation(&self) -> Option<&VehicleConsultation> {
        match &self.phase {
            Phase::Ready(consultation) => Some(consultation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Submit { url: Url },
    FetchSucceeded,
    FetchFailed,
    ManualTextEdited(String),
    ManualSubmitted,
    Extracted { data: ExtractedData, at: DateTime<Utc> },
    ExtractionFailed(ConsultError),
    NewConsultation,
    ClearError,
}

pub fn next(state: AppState, event: Event) -> AppState {
    let AppState {
        phase,
        error,
        manual_text,
    } = state;
    match (phase, event) {
        (Phase::Idle, Event::Submit { url }) | (Phase::ManualEntryNeeded { .. }, Event::Submit { url }) => {
            AppState {
                phase: Phase::Fetching { url },
                error: None,
                manual_text,
            }
        }
        (Phase::Fetching { url }, Event::FetchSucceeded) => AppState {
            phase: Phase::Extracting {
                query: query_from_url(&url),
                fallback: None,
            },
            error,
            manual_text,
        },
        (Phase::Fetching { url }, Event::FetchFailed) => AppState {
            error: Some(ConsultError::CorsOrNetwork {
                url: url.to_string(),
            }),
            phase: Phase::ManualEntryNeeded { url },
            manual_text,
        },
        (Phase::ManualEntryNeeded { url }, Event::ManualTextEdited(text)) => AppState {
            phase: Phase::ManualEntryNeeded { url },
            error,
            manual_text: text,
        },
        // The query comes from the URL of the failed request, not the form,
        // which may have been edited since.
        (Phase::ManualEntryNeeded { url }, Event::ManualSubmitted) => AppState {
            phase: Phase::Extracting {
                query: query_from_url(&url),
                fallback: Some(url),
            },
            error,
            manual_text,
        },
        (Phase::Extracting { query, .. }, Event::Extracted { data, at }) => AppState {
            phase: Phase::Ready(VehicleConsultation::new(query, data, at)),
            error: None,
            manual_text: String::new(),
        },
        (Phase::Extracting { fallback, .. }, Event::ExtractionFailed(e)) => AppState {
            phase: match fallback {
                Some(url) => Phase::ManualEntryNeeded { url },
                None => Phase::Idle,
            },
            error: Some(e),
            manual_text,
        },
        (Phase::Ready(_), Event::NewConsultation) => AppState {
            phase: Phase::Idle,
            error: None,
            manual_text,
        },
        (phase, Event::ClearError) => AppState {
            phase,
            error: None,
            manual_text,
        },
        (phase, event) => {
            debug!("Ignoring {:?} while {:?}", event, phase);
            AppState {
                phase,
                error,
                manual_text,
            }
        }
    }
}

use crate::types::{VehicleHistoryItem, VehicleQuery};
use std::fmt::{self, Write};

pub const MAX_PLATE_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Fail)]
pub enum FormError {
    #[fail(display = "plate is required")]
    MissingPlate,
    #[fail(display = "registration number (RENAVAM) is required")]
    MissingRegistrationNumber,
}

/// Plate and registration number fields of the consultation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleForm {
    plate: String,
    registration_number: String,
}

impl VehicleForm {
    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }

    /// Uppercases and keeps at most `MAX_PLATE_LEN` characters.
    pub fn set_plate(&mut self, plate: &str) {
        self.plate = normalize_plate(plate);
    }

    pub fn set_registration_number(&mut self, registration_number: &str) {
        self.registration_number = registration_number.trim().to_string();
    }

    pub fn fill_from(&mut self, item: &VehicleHistoryItem) {
        self.set_plate(&item.plate);
        self.set_registration_number(&item.registration_number);
    }

    pub fn submission(&self) -> Result<VehicleQuery, FormError> {
        if self.plate.is_empty() {
            return Err(FormError::MissingPlate);
        }
        if self.registration_number.is_empty() {
            return Err(FormError::MissingRegistrationNumber);
        }
        Ok(VehicleQuery {
            plate: self.plate.clone(),
            registration_number: self.registration_number.clone(),
        })
    }
}

pub fn normalize_plate(plate: &str) -> String {
    plate
        .trim()
        .to_uppercase()
        .chars()
        .take(MAX_PLATE_LEN)
        .collect()
}

/// Form fields plus the "my vehicles" list for quick re-selection.
pub struct FormView<'a> {
    pub form: &'a VehicleForm,
    pub history: &'a [VehicleHistoryItem],
    pub busy: bool,
}

impl fmt::Display for FormView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vehicle plate:       {}", blank_or(self.form.plate(), "ABC1D23"))?;
        writeln!(
            f,
            "Registration number: {}",
            blank_or(self.form.registration_number(), "00000000000")
        )?;
        if self.busy {
            writeln!(f, "[ querying... ]")?;
        } else {
            writeln!(f, "[ consult ]")?;
        }
        writeln!(f)?;
        writeln!(f, "MY VEHICLES")?;
        if self.history.is_empty() {
            return writeln!(f, "  (empty)");
        }
        for (i, item) in self.history.iter().enumerate() {
            let mut line = String::new();
            write!(line, "{:>3}. {:<8}", i + 1, item.plate)?;
            write!(
                line,
                " {}",
                item.vehicle_model.as_deref().unwrap_or("VEHICLE")
            )?;
            writeln!(
                f,
                "{}  ({})",
                line,
                item.last_consulted.format("%d/%m/%Y %H:%M")
            )?;
        }
        Ok(())
    }
}

fn blank_or(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        format!("_ (e.g. {})", placeholder)
    } else {
        value.to_string()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebtCategory {
    #[serde(rename = "IPVA")]
    Ipva,
    #[serde(rename = "Licenciamento")]
    Licensing,
    #[serde(rename = "Multa")]
    Fine,
    #[serde(rename = "Taxa")]
    Fee,
    #[serde(rename = "Outros")]
    Other,
}

impl DebtCategory {
    /// Matches the labels the registry (and the oracle) use, in Portuguese
    /// or English. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<DebtCategory> {
        match label.trim().to_lowercase().as_str() {
            "ipva" => Some(DebtCategory::Ipva),
            "licenciamento" | "licensing" => Some(DebtCategory::Licensing),
            "multa" | "multas" | "fine" | "fines" => Some(DebtCategory::Fine),
            "taxa" | "taxas" | "fee" | "fees" => Some(DebtCategory::Fee),
            "outros" | "outro" | "other" => Some(DebtCategory::Other),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DebtCategory::Ipva => "IPVA",
            DebtCategory::Licensing => "Licenciamento",
            DebtCategory::Fine => "Multa",
            DebtCategory::Fee => "Taxa",
            DebtCategory::Other => "Outros",
        }
    }
}

impl fmt::Display for DebtCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtItem {
    pub description: String,
    pub category: DebtCategory,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Structured data the oracle pulled out of a registry page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedData {
    pub owner_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub items: Vec<DebtItem>,
}

/// Plate and registration number (RENAVAM) identifying one debt query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleQuery {
    pub plate: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleConsultation {
    pub plate: String,
    pub registration_number: String,
    pub owner_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub total_debts: f64,
    pub items: Vec<DebtItem>,
    pub consulted_at: DateTime<Utc>,
}

impl VehicleConsultation {
    pub fn new(query: VehicleQuery, data: ExtractedData, consulted_at: DateTime<Utc>) -> Self {
        let total_debts = data.items.iter().map(|item| item.value).sum();
        VehicleConsultation {
            plate: query.plate,
            registration_number: query.registration_number,
            owner_name: data.owner_name,
            vehicle_model: data.vehicle_model,
            total_debts,
            items: data.items,
            consulted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHistoryItem {
    pub plate: String,
    #[serde(rename = "renavam")]
    pub registration_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    pub last_consulted: DateTime<Utc>,
}

impl From<&VehicleConsultation> for VehicleHistoryItem {
    fn from(consultation: &VehicleConsultation) -> Self {
        VehicleHistoryItem {
            plate: consultation.plate.clone(),
            registration_number: consultation.registration_number.clone(),
            vehicle_model: consultation.vehicle_model.clone(),
            last_consulted: consultation.consulted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(description: &str, category: DebtCategory, value: f64) -> DebtItem {
        DebtItem {
            description: description.to_string(),
            category,
            value,
            due_date: None,
        }
    }

    #[test]
    fn total_is_sum_of_item_values() {
        let data = ExtractedData {
            owner_name: None,
            vehicle_model: Some("FIAT UNO".to_string()),
            items: vec![
                item("IPVA 2024", DebtCategory::Ipva, 450.0),
                item("Multa velocidade", DebtCategory::Fine, 195.5),
                item("Taxa de licenciamento", DebtCategory::Fee, 0.1),
                item("Taxa extra", DebtCategory::Fee, 0.2),
            ],
        };
        let expected: f64 = data.items.iter().map(|i| i.value).sum();
        let consultation = VehicleConsultation::new(
            VehicleQuery {
                plate: "XYZ9Z99".to_string(),
                registration_number: "00112233445".to_string(),
            },
            data,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );
        assert!((consultation.total_debts - expected).abs() < 1e-9);
        assert!((consultation.total_debts - 645.8).abs() < 1e-9);
        assert_eq!(consultation.items.len(), 4);
    }

    #[test]
    fn empty_consultation_totals_zero() {
        let consultation = VehicleConsultation::new(
            VehicleQuery {
                plate: "ABC1D23".to_string(),
                registration_number: "1".to_string(),
            },
            ExtractedData {
                owner_name: None,
                vehicle_model: None,
                items: vec![],
            },
            Utc::now(),
        );
        assert_eq!(consultation.total_debts, 0.0);
    }

    #[test]
    fn category_labels_in_both_languages() {
        assert_eq!(DebtCategory::from_label("Multa"), Some(DebtCategory::Fine));
        assert_eq!(DebtCategory::from_label(" fine "), Some(DebtCategory::Fine));
        assert_eq!(
            DebtCategory::from_label("LICENCIAMENTO"),
            Some(DebtCategory::Licensing)
        );
        assert_eq!(DebtCategory::from_label("Seguro DPVAT"), None);
    }

    #[test]
    fn history_item_uses_stored_field_names() {
        let item = VehicleHistoryItem {
            plate: "ABC1D23".to_string(),
            registration_number: "12345678901".to_string(),
            vehicle_model: None,
            last_consulted: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["renavam"], "12345678901");
        assert_eq!(json["lastConsulted"], "2024-01-02T03:04:05Z");
        assert!(json.get("vehicleModel").is_none());
    }
}

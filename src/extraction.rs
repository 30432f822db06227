use crate::error::ConsultError;
use crate::gemini::{extraction_prompt, response_schema, Oracle};
use crate::types::{DebtCategory, DebtItem, ExtractedData};
use failure::Error;
use log::{error, warn};
use serde_json::Value;

pub type ExtractionResult = Result<ExtractedData, ConsultError>;

pub struct Extractor<O> {
    oracle: O,
}

impl<O: Oracle> Extractor<O> {
    pub fn new(oracle: O) -> Self {
        Extractor { oracle }
    }

    /// Turns raw registry text into debt records with a single oracle call.
    /// Blank input fails without reaching the oracle.
    pub async fn extract(&self, raw_text: &str) -> ExtractionResult {
        if raw_text.trim().is_empty() {
            return Err(ConsultError::empty_input());
        }
        let answer = self
            .oracle
            .generate(&extraction_prompt(raw_text), &response_schema())
            .await
            .map_err(|e| {
                error!("Oracle call failed: {}", e);
                ConsultError::unreadable()
            })?;
        interpret(&answer).map_err(|e| {
            error!("Unusable oracle answer: {}", e);
            ConsultError::unreadable()
        })
    }

    #[cfg(test)]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

/// Checks the oracle's JSON against the requested schema and builds the
/// debt items from it.
pub fn interpret(answer: &str) -> Result<ExtractedData, Error> {
    let json: Value = serde_json::from_str(answer)?;
    if !json.is_object() {
        bail!("Unexpected answer JSON type: {}", answer);
    }
    let items = json["items"]
        .as_array()
        .ok_or_else(|| format_err!("Missing items in answer"))?
        .iter()
        .enumerate()
        .map(|(i, item)| debt_item(item).map_err(|e| format_err!("item {}: {}", i, e)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ExtractedData {
        owner_name: optional_text(&json["ownerName"]),
        vehicle_model: optional_text(&json["vehicleModel"]),
        items,
    })
}

fn debt_item(item: &Value) -> Result<DebtItem, Error> {
    let description = item["description"]
        .as_str()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| format_err!("Missing description field"))?;
    let label = item["category"]
        .as_str()
        .ok_or_else(|| format_err!("Missing category field"))?;
    let value = item["value"]
        .as_f64()
        .ok_or_else(|| format_err!("Missing value field"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Invalid value {}", value);
    }
    let category = DebtCategory::from_label(label).unwrap_or_else(|| {
        warn!("Unknown debt category {:?}, filing as {}", label, DebtCategory::Other);
        DebtCategory::Other
    });
    Ok(DebtItem {
        description: description.to_string(),
        category,
        value,
        due_date: optional_text(&item["dueDate"]),
    })
}

fn optional_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

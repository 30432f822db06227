//! Text-understanding oracle backed by the Gemini `generateContent` API.

use async_trait::async_trait;
use failure::Error;
use log::{debug, info};
use serde_json::{json, Value};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

// The key travels as a header, never in the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Answers `prompt` with JSON text shaped by `schema`.
#[async_trait]
pub trait Oracle {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<String, Error>;
}

pub struct GeminiOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiOracle {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        GeminiOracle {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<String, Error> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });
        info!("Asking {} to extract debts", self.model);
        let resp = self
            .client
            .post(&self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("oracle returned {}: {}", status, text);
        }
        let json: Value = resp.json().await?;
        response_text(&json)
    }
}

/// Pulls the generated text out of a `generateContent` response.
pub fn response_text(json: &Value) -> Result<String, Error> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        bail!("prompt blocked: {}", reason);
    }
    let text = json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| format_err!("Missing candidate text in oracle response"))?;
    debug!("Oracle answered with {} bytes", text.len());
    Ok(text.to_string())
}

pub fn extraction_prompt(raw_text: &str) -> String {
    format!(
        "Você recebeu um retorno (bruto ou texto copiado) de uma consulta de débitos do DETRAN Maranhão. Sua missão é estruturar esses dados.

REGRAS:
1. Identifique o Proprietário e o Modelo do Veículo.
2. Liste TODOS os débitos (IPVA, Multas, Licenciamento, Taxas).
3. Extraia o valor numérico exato de cada um (remova 'R$', use ponto para decimais).
4. Formate as datas como DD/MM/AAAA.
5. Se for uma lista vazia ou \"Nada Consta\", retorne itens vazios.

CONTEÚDO PARA ANÁLISE:
{}",
        raw_text
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "ownerName": { "type": "STRING" },
            "vehicleModel": { "type": "STRING" },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": { "type": "STRING" },
                        "category": { "type": "STRING" },
                        "value": { "type": "NUMBER" },
                        "dueDate": { "type": "STRING" }
                    },
                    "required": ["description", "category", "value"]
                }
            }
        },
        "required": ["ownerName", "vehicleModel", "items"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_raw_text() {
        let prompt = extraction_prompt("PLACA ABC1D23 - Nada Consta");
        assert!(prompt.ends_with("PLACA ABC1D23 - Nada Consta"));
        assert!(prompt.contains("DD/MM/AAAA"));
    }

    #[test]
    fn schema_requires_item_fields() {
        let schema = response_schema();
        assert_eq!(
            schema["properties"]["items"]["items"]["required"],
            json!(["description", "category", "value"])
        );
        assert_eq!(schema["properties"]["items"]["type"], "ARRAY");
    }

    #[test]
    fn reads_first_candidate_text() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"items\": []}" }], "role": "model" }
            }]
        });
        assert_eq!(response_text(&response).unwrap(), "{\"items\": []}");
    }

    #[test]
    fn blocked_or_empty_response_is_error() {
        assert!(response_text(&json!({ "candidates": [] })).is_err());
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(response_text(&blocked).is_err());
    }

    #[test]
    fn endpoint_includes_model() {
        let oracle = GeminiOracle::new("http://localhost:9000/v1beta/", "test-model", "k");
        assert_eq!(
            oracle.endpoint(),
            "http://localhost:9000/v1beta/models/test-model:generateContent"
        );
    }

    #[tokio::test]
    async fn transport_error_does_not_expose_api_key() {
        let oracle = GeminiOracle::new("http://127.0.0.1:1/v1beta", "m", "SECRET_KEY_123");
        let err = oracle
            .generate("prompt", &response_schema())
            .await
            .unwrap_err();
        let text = format!("{} {:?}", err, err);
        assert!(text.contains("127.0.0.1"));
        assert!(!text.contains("SECRET_KEY_123"));
    }
}

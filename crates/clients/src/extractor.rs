use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use wayfind_core::{ExtractionError, ResolvedEndpoints, CURRENT_LOCATION};

use crate::config::ClientConfig;

const EXTRACTION_INSTRUCTIONS: &str = "Extract the trip origin and destination from the user's route request. \
Be as specific as possible and include the city or town. \
If the request does not name a starting point, use \"Current Location\" as the origin. \
Return only the JSON object.";

/// Turns a free-text route request into origin and destination text.
pub trait LocationExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ResolvedEndpoints, ExtractionError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiExtractor {
    pub fn new(client: Client, api_key: String, model: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .context("WAYFIND_OPENAI_API_KEY is not set")?;
        Ok(Self::new(
            config.quick_http_client()?,
            api_key,
            config.openai_model.clone(),
            config.openai_base_url.clone(),
        ))
    }
}

impl LocationExtractor for OpenAiExtractor {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn extract(&self, text: &str) -> Result<ResolvedEndpoints, ExtractionError> {
        let response = self
            .client
            .post(format!("{}/v1/responses", self.base_url))
            .bearer_auth(self.api_key.as_str())
            .json(&extraction_payload(&self.model, text))
            .send()
            .await
            .map_err(|err| ExtractionError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "extraction service rejected request");
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ExtractionError::Malformed(err.to_string()))?;
        let output = extract_output_text(&body)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ExtractionError::Malformed("output text missing".to_string()))?;

        let endpoints = parse_endpoints(&output)?;
        debug!(origin = %endpoints.origin, destination = %endpoints.destination, "endpoints extracted");
        Ok(endpoints)
    }
}

fn extraction_payload(model: &str, text: &str) -> Value {
    json!({
        "model": model,
        "input": [
            {
                "role": "system",
                "content": [{ "type": "input_text", "text": EXTRACTION_INSTRUCTIONS }]
            },
            {
                "role": "user",
                "content": [{ "type": "input_text", "text": text }]
            }
        ],
        "text": {
            "format": {
                "type": "json_schema",
                "name": "route_endpoints",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "origin": { "type": "string" },
                        "destination": { "type": "string" }
                    },
                    "required": ["origin", "destination"],
                    "additionalProperties": false
                }
            }
        }
    })
}

pub fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(value) = payload.get("output_text").and_then(|value| value.as_str()) {
        return Some(value.to_string());
    }
    let output = payload.get("output")?.as_array()?;
    let chunks = output
        .iter()
        .filter_map(|item| item.get("content").and_then(|value| value.as_array()))
        .flatten()
        .filter(|content| content.get("type").and_then(|value| value.as_str()) == Some("output_text"))
        .filter_map(|content| content.get("text").and_then(|value| value.as_str()))
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

#[derive(Debug, Deserialize)]
struct EndpointsPayload {
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    destination: Option<String>,
}

/// Parses the model output, tolerating ```json fences around the object.
pub fn parse_endpoints(output: &str) -> Result<ResolvedEndpoints, ExtractionError> {
    let mut text = output.trim();
    if let Some(rest) = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    let payload: EndpointsPayload = serde_json::from_str(text.trim())
        .map_err(|err| ExtractionError::Malformed(err.to_string()))?;

    let destination = payload
        .destination
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ExtractionError::MissingDestination)?;
    let origin = payload
        .origin
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| CURRENT_LOCATION.to_string());

    Ok(ResolvedEndpoints {
        origin,
        destination,
    })
}

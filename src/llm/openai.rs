//! OpenAI-compatible client implementation
//!
//! Async HTTP client for `/chat/completions` using `json_schema` response
//! formatting, so the model is forced to answer with a conformant object.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::{Config, Result, WaypointError};
use crate::llm::traits::{ContentPart, Message, ObjectRequest, StructuredModel};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    response_format: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message in the wire format
#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Vec<Value>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.model.timeout_secs))
            .build()
            .map_err(|e| WaypointError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.model.api_base.trim_end_matches('/').to_string(),
            api_key: config.model.api_key.clone(),
            model: config.model.model.clone(),
            temperature: config.model.temperature,
        })
    }

    /// Convert internal Message to the wire format
    fn to_wire_message(msg: &Message) -> WireMessage {
        let content = msg
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                ContentPart::Image { data } => json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:image/png;base64,{}", data) }
                }),
            })
            .collect();

        WireMessage {
            role: msg.role.clone(),
            content,
        }
    }

    /// Pull the JSON object out of a completion response
    fn parse_object(response: ChatResponse) -> Result<Value> {
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| WaypointError::schema("Model returned no choices"))?;

        if let Some(refusal) = message.refusal {
            return Err(WaypointError::schema(format!("Model refused: {}", refusal)));
        }

        let content = message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| WaypointError::schema("Model returned empty content"))?;

        let value: Value = serde_json::from_str(&content)
            .map_err(|e| WaypointError::schema(format!("Model output is not JSON: {}", e)))?;

        if !value.is_object() {
            return Err(WaypointError::schema("Model output is not a JSON object"));
        }

        Ok(value)
    }
}

#[async_trait]
impl StructuredModel for OpenAiClient {
    async fn generate_object(&self, request: ObjectRequest) -> Result<Value> {
        let body = ChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                    "strict": true
                }
            }),
            temperature: request.options.temperature.or(self.temperature),
            max_tokens: request.options.max_tokens,
        };

        tracing::debug!(model = %self.model, schema = %request.schema_name, "Requesting structured output");

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                WaypointError::model(format!("Cannot connect to {}: {}", self.base_url, e))
            } else if e.is_timeout() {
                WaypointError::model(format!("Request to {} timed out", self.base_url))
            } else {
                WaypointError::model(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WaypointError::model(format!(
                "Model API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| WaypointError::model(format!("Malformed completion response: {}", e)))?;

        Self::parse_object(parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

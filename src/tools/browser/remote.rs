//! HTTP client for a remote browser command API
//!
//! Every command is `POST {api_base}/sessions/{id}/{command}` with a JSON
//! body, answered by a `{ success, data, error? }` envelope.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::{Config, ObservationRecord, Result, WaypointError};
use crate::tools::browser::backend::{BrowserBackend, BrowserError, BrowserResult};

/// Remote browser command client
#[derive(Clone)]
pub struct RemoteBrowser {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

/// Response envelope shared by all commands
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| WaypointError::config(format!("Invalid header value: {}", e)))
}

impl RemoteBrowser {
    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-stream-response", HeaderValue::from_static("false"));
        if let Some(ref key) = config.browser.api_key {
            headers.insert("x-bb-api-key", header_value(key)?);
        }
        if let Some(ref project) = config.browser.project_id {
            headers.insert("x-bb-project-id", header_value(project)?);
        }
        if let Some(ref model_key) = config.model.api_key {
            headers.insert("x-model-api-key", header_value(model_key)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.browser.request_timeout_secs))
            .build()
            .map_err(|e| WaypointError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.browser.api_base.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn command_url(&self, session_id: &str, command: &str) -> String {
        format!("{}/sessions/{}/{}", self.base_url, session_id, command)
    }

    /// Send a command and return the `data` field
    async fn send(&self, session_id: &str, command: &str, body: Value) -> BrowserResult<Value> {
        let response = self
            .client
            .post(self.command_url(session_id, command))
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BrowserError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(BrowserError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_envelope(&text)
    }
}

fn parse_envelope(text: &str) -> BrowserResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| BrowserError::Protocol(e.to_string()))?;

    if !envelope.success {
        return Err(BrowserError::Protocol(
            envelope
                .error
                .unwrap_or_else(|| "command reported failure".to_string()),
        ));
    }

    Ok(envelope.data)
}

/// Read a string either directly from `data` or from `data.<field>`
fn string_field(data: Value, field: &str) -> BrowserResult<String> {
    match data {
        Value::String(s) => Ok(s),
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Ok(other.to_string()),
            None => Err(BrowserError::Protocol(format!("missing '{}' in response", field))),
        },
        other => Err(BrowserError::Protocol(format!(
            "expected '{}' string, got {}",
            field, other
        ))),
    }
}

fn observation_list(data: Value) -> BrowserResult<Vec<ObservationRecord>> {
    let list = match data {
        Value::Object(mut map) => map.remove("observations").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(list).map_err(|e| BrowserError::Protocol(e.to_string()))
}

#[async_trait]
impl BrowserBackend for RemoteBrowser {
    async fn navigate(&self, session_id: &str, url: &str, timeout: Duration) -> BrowserResult<()> {
        let body = json!({
            "url": url,
            "options": { "waitUntil": "commit", "timeout": timeout.as_millis() as u64 }
        });
        self.send(session_id, "navigate", body).await.map(|_| ())
    }

    async fn act(&self, session_id: &str, instruction: &str) -> BrowserResult<()> {
        self.send(session_id, "act", json!({ "action": instruction }))
            .await
            .map(|_| ())
    }

    async fn extract(&self, session_id: &str, instruction: &str) -> BrowserResult<String> {
        let data = self
            .send(session_id, "extract", json!({ "instruction": instruction }))
            .await?;
        string_field(data, "extraction")
    }

    async fn observe(
        &self,
        session_id: &str,
        instruction: &str,
    ) -> BrowserResult<Vec<ObservationRecord>> {
        let body = json!({ "instruction": instruction, "useAccessibilityTree": true });
        let data = self.send(session_id, "observe", body).await?;
        observation_list(data)
    }

    async fn screenshot(&self, session_id: &str) -> BrowserResult<String> {
        let data = self.send(session_id, "screenshot", json!({})).await?;
        string_field(data, "screenshot")
    }

    async fn go_back(&self, session_id: &str) -> BrowserResult<()> {
        self.send(session_id, "navback", json!({})).await.map(|_| ())
    }

    async fn close(&self, session_id: &str) -> BrowserResult<()> {
        self.send(session_id, "end", json!({})).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "remote"
    }
}

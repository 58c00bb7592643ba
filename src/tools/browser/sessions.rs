//! Remote session provisioning
//!
//! Sessions are created here and handed to the agent loop; teardown goes
//! through the executor's CLOSE so it happens at most once.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::core::{Config, Result, WaypointError};

/// A freshly provisioned browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Opaque session id
    pub id: String,
    /// URL where the session can be watched live
    pub live_view_url: String,
}

/// Trait for session provisioning services
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Create a new remote browser context
    async fn create(&self) -> Result<SessionInfo>;
}

/// Browserbase session API client
pub struct BrowserbaseSessions {
    client: Client,
    base_url: String,
    api_key: String,
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugUrls {
    #[serde(default)]
    debugger_fullscreen_url: Option<String>,
}

impl BrowserbaseSessions {
    /// Create a client from configuration.
    ///
    /// Requires both an API key and a project id.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .browser
            .api_key
            .clone()
            .ok_or_else(|| WaypointError::config("BROWSERBASE_API_KEY is not set"))?;
        let project_id = config
            .browser
            .project_id
            .clone()
            .ok_or_else(|| WaypointError::config("BROWSERBASE_PROJECT_ID is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.browser.request_timeout_secs))
            .build()
            .map_err(|e| WaypointError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.browser.sessions_api_base.trim_end_matches('/').to_string(),
            api_key,
            project_id,
        })
    }

    /// Dashboard URL used when no debugger URL is available
    pub fn dashboard_url(session_id: &str) -> String {
        format!("https://www.browserbase.com/sessions/{}", session_id)
    }

    async fn live_view_url(&self, session_id: &str) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/sessions/{}/debug", self.base_url, session_id))
            .header("X-BB-API-Key", &self.api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response
            .json::<DebugUrls>()
            .await
            .ok()
            .and_then(|urls| urls.debugger_fullscreen_url)
    }
}

#[async_trait]
impl SessionProvider for BrowserbaseSessions {
    async fn create(&self) -> Result<SessionInfo> {
        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .header("X-BB-API-Key", &self.api_key)
            .json(&json!({ "projectId": self.project_id }))
            .send()
            .await
            .map_err(|e| WaypointError::Provisioning(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WaypointError::Provisioning(format!("{}: {}", status, body)));
        }

        let created: CreatedSession = response
            .json()
            .await
            .map_err(|e| WaypointError::Provisioning(format!("Malformed response: {}", e)))?;

        let live_view_url = match self.live_view_url(&created.id).await {
            Some(url) => url,
            None => Self::dashboard_url(&created.id),
        };

        tracing::info!(session = %created.id, "Created remote browser session");

        Ok(SessionInfo {
            id: created.id,
            live_view_url,
        })
    }
}

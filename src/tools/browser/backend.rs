//! Remote browser backend abstraction
//!
//! One method per browser-side effect, keyed by session id. The executor
//! owns timeouts, error context and teardown; backends only talk to the
//! remote service.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::ObservationRecord;

/// Instruction used to read the current page location through EXTRACT
pub const LOCATION_INSTRUCTION: &str = "return document.location.href";

/// Errors raised by a browser backend
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Transport-level failure
    #[error("request failed: {0}")]
    Http(String),

    /// The service answered with a failure status
    #[error("browser API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The service answered, but not with what was expected
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// Navigation was not acknowledged in time
    #[error("navigation not acknowledged within {0}ms")]
    Timeout(u64),
}

/// Result type for backend calls
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Trait for remote browser automation services
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Navigate, waiting only for the navigation to commit
    async fn navigate(&self, session_id: &str, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Perform one atomic UI action described in natural language
    async fn act(&self, session_id: &str, instruction: &str) -> BrowserResult<()>;

    /// Extract a scalar string from the live page
    async fn extract(&self, session_id: &str, instruction: &str) -> BrowserResult<String>;

    /// List candidate elements using the accessibility tree
    async fn observe(
        &self,
        session_id: &str,
        instruction: &str,
    ) -> BrowserResult<Vec<ObservationRecord>>;

    /// Capture the viewport as base64-encoded PNG
    async fn screenshot(&self, session_id: &str) -> BrowserResult<String>;

    /// Browser back navigation
    async fn go_back(&self, session_id: &str) -> BrowserResult<()>;

    /// Permanently end the session
    async fn close(&self, session_id: &str) -> BrowserResult<()>;

    /// Current page URL
    async fn current_url(&self, session_id: &str) -> BrowserResult<String> {
        self.extract(session_id, LOCATION_INSTRUCTION).await
    }

    /// Get the backend name
    fn name(&self) -> &str;
}

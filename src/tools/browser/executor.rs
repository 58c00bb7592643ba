//! Tool executor - performs exactly one browser-side effect per call
//!
//! Owns every interaction with a remote session: per-session serialization,
//! the navigation deadline, fail-closed teardown and the closed-session ledger
//! that keeps CLOSE to at most once per session.
//!
//! The closed ledger holds one id per session for the life of the executor,
//! so a long-running server grows by one short string per finished session.
//! Lock entries exist only for sessions that have been probed or commanded,
//! and are dropped on close. Steps that fail validation never create one.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::core::{Action, Config, Extraction, Result, Step, ToolOutput, WaypointError};
use crate::tools::browser::backend::{BrowserBackend, BrowserError, BrowserResult};

/// Executor for browser actions against remote sessions
pub struct ToolExecutor {
    backend: Arc<dyn BrowserBackend>,
    navigation_timeout: Duration,
    /// One lock per live session so commands never overlap
    session_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Sessions that have been closed, by CLOSE or by fail-closed teardown
    closed: Mutex<HashSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ToolExecutor {
    /// Create a new executor
    pub fn new(backend: Arc<dyn BrowserBackend>, navigation_timeout: Duration) -> Self {
        Self {
            backend,
            navigation_timeout,
            session_locks: Mutex::new(HashMap::new()),
            closed: Mutex::new(HashSet::new()),
        }
    }

    /// Create an executor using the configured navigation deadline
    pub fn from_config(backend: Arc<dyn BrowserBackend>, config: &Config) -> Self {
        Self::new(
            backend,
            Duration::from_millis(config.browser.navigation_timeout_ms),
        )
    }

    /// Whether the session has already been closed
    pub fn is_closed(&self, session_id: &str) -> bool {
        lock(&self.closed).contains(session_id)
    }

    fn session_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        lock(&self.session_locks)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Record the session as closed; false if it already was
    fn mark_closed(&self, session_id: &str) -> bool {
        let inserted = lock(&self.closed).insert(session_id.to_string());
        lock(&self.session_locks).remove(session_id);
        inserted
    }

    fn ensure_open(&self, session_id: &str) -> Result<()> {
        if self.is_closed(session_id) {
            return Err(WaypointError::session(session_id, "session is already closed"));
        }
        Ok(())
    }

    /// Validate a step and execute it, returning any extraction it produced
    pub async fn execute_step(&self, session_id: &str, step: &Step) -> Result<Option<Extraction>> {
        let action = step.to_action()?;
        let output = self.execute(session_id, &action).await?;
        Ok(output.and_then(ToolOutput::into_extraction))
    }

    /// Execute a single action.
    ///
    /// On failure the session is closed before the error is returned.
    pub async fn execute(&self, session_id: &str, action: &Action) -> Result<Option<ToolOutput>> {
        self.ensure_open(session_id)?;
        let session_lock = self.session_lock(session_id);
        let _guard = session_lock.lock().await;
        // Closed while we waited for the lock
        self.ensure_open(session_id)?;

        let tool = action.tool();
        tracing::debug!(session = %session_id, %tool, backend = self.backend.name(), "Executing tool");

        if let Action::Close = action {
            if !self.mark_closed(session_id) {
                return Err(WaypointError::session(session_id, "session is already closed"));
            }
        }

        match self.dispatch(session_id, action).await {
            Ok(output) => {
                if let Action::Close = action {
                    tracing::info!(session = %session_id, "Session closed");
                }
                Ok(output)
            }
            Err(e) => {
                let instruction = action.instruction();
                tracing::warn!(session = %session_id, %tool, error = %e, "Tool failed, closing session");
                self.fail_close(session_id).await;
                Err(WaypointError::execution(tool, instruction.as_deref(), e.to_string()))
            }
        }
    }

    async fn dispatch(&self, session_id: &str, action: &Action) -> BrowserResult<Option<ToolOutput>> {
        match action {
            Action::Goto { url } => {
                let deadline = self.navigation_timeout;
                tokio::time::timeout(
                    deadline,
                    self.backend.navigate(session_id, url, deadline),
                )
                .await
                .map_err(|_| BrowserError::Timeout(deadline.as_millis() as u64))??;
                Ok(None)
            }
            Action::Act { instruction } => {
                self.backend.act(session_id, instruction).await?;
                Ok(None)
            }
            Action::Extract { instruction } => {
                let text = self.backend.extract(session_id, instruction).await?;
                Ok(Some(ToolOutput::Extraction(Extraction::Text(text))))
            }
            Action::Observe { instruction } => {
                let records = self.backend.observe(session_id, instruction).await?;
                Ok(Some(ToolOutput::Extraction(Extraction::Observations(records))))
            }
            Action::Screenshot => {
                let image = self.backend.screenshot(session_id).await?;
                Ok(Some(ToolOutput::Screenshot(image)))
            }
            Action::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(None)
            }
            Action::NavBack => {
                self.backend.go_back(session_id).await?;
                Ok(None)
            }
            Action::Close => {
                self.backend.close(session_id).await?;
                Ok(None)
            }
        }
    }

    /// Close after a failure, swallowing teardown errors.
    ///
    /// Skipped when the session is already closed, including when the
    /// failing call was the CLOSE itself.
    async fn fail_close(&self, session_id: &str) {
        if !self.mark_closed(session_id) {
            return;
        }
        if let Err(e) = self.backend.close(session_id).await {
            tracing::error!(session = %session_id, error = %e, "Failed to close session after error");
        }
    }

    /// Best-effort read of the current page URL
    pub async fn current_url(&self, session_id: &str) -> Option<String> {
        if self.is_closed(session_id) {
            return None;
        }
        let session_lock = self.session_lock(session_id);
        let _guard = session_lock.lock().await;

        match self.backend.current_url(session_id).await {
            Ok(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "Could not read current URL");
                None
            }
        }
    }

    /// Best-effort screenshot of the viewport
    pub async fn screenshot(&self, session_id: &str) -> Option<String> {
        if self.is_closed(session_id) {
            return None;
        }
        let session_lock = self.session_lock(session_id);
        let _guard = session_lock.lock().await;

        match self.backend.screenshot(session_id).await {
            Ok(image) if !image.is_empty() => Some(image),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "Could not capture screenshot");
                None
            }
        }
    }

}

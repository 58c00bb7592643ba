//! Shared test doubles for integration tests
//!
//! `MockModel` replays scripted model outputs; `MockBackend` stands in for a
//! remote browser and records every command it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use waypoint::agent::Agent;
use waypoint::core::{ObservationRecord, Result, WaypointError};
use waypoint::llm::{ObjectRequest, StructuredModel};
use waypoint::tools::browser::{BrowserBackend, BrowserError, BrowserResult};
use waypoint::tools::ToolExecutor;

/// A planner-shaped step object
pub fn step_json(text: &str, reasoning: &str, tool: &str, instruction: &str) -> Value {
    json!({
        "text": text,
        "reasoning": reasoning,
        "tool": tool,
        "instruction": instruction,
    })
}

/// A selector-shaped starting URL object
pub fn start_json(url: &str) -> Value {
    json!({ "url": url, "reasoning": "The goal names this site directly" })
}

/// Model that returns queued responses in order
#[derive(Default)]
pub struct MockModel {
    responses: Mutex<VecDeque<Result<Value>>>,
    requests: Mutex<Vec<ObjectRequest>>,
}

impl MockModel {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<ObjectRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether request `index` carried a screenshot
    pub fn request_has_image(&self, index: usize) -> bool {
        self.requests()[index]
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .any(|part| part.is_image())
    }

    /// All text parts of request `index`, joined
    pub fn request_text(&self, index: usize) -> String {
        self.requests()[index]
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|part| match part {
                waypoint::llm::ContentPart::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl StructuredModel for MockModel {
    async fn generate_object(&self, request: ObjectRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WaypointError::model("mock model has no responses left")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Browser backend that records commands
pub struct MockBackend {
    pub calls: Mutex<Vec<String>>,
    pub closes: AtomicUsize,
    pub page_url: String,
    pub extract_text: String,
    pub fail_act: bool,
    pub fail_close: bool,
    pub navigation_delay: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            page_url: "https://www.browserbase.com/".to_string(),
            extract_text: "Browserbase: headless browsers for AI agents".to_string(),
            fail_act: false,
            fail_close: false,
            navigation_delay: Duration::ZERO,
        }
    }
}

impl MockBackend {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl BrowserBackend for MockBackend {
    async fn navigate(&self, _: &str, url: &str, _: Duration) -> BrowserResult<()> {
        self.record(format!("navigate {}", url));
        if !self.navigation_delay.is_zero() {
            tokio::time::sleep(self.navigation_delay).await;
        }
        Ok(())
    }

    async fn act(&self, _: &str, instruction: &str) -> BrowserResult<()> {
        self.record(format!("act {}", instruction));
        if self.fail_act {
            return Err(BrowserError::Protocol(format!(
                "no element matches \"{}\"",
                instruction
            )));
        }
        Ok(())
    }

    async fn extract(&self, _: &str, instruction: &str) -> BrowserResult<String> {
        self.record(format!("extract {}", instruction));
        Ok(self.extract_text.clone())
    }

    async fn observe(&self, _: &str, instruction: &str) -> BrowserResult<Vec<ObservationRecord>> {
        self.record(format!("observe {}", instruction));
        Ok(vec![ObservationRecord {
            description: "Accept cookies button".to_string(),
            selector: "xpath=/html/body/div[2]/button[1]".to_string(),
            method: Some("click".to_string()),
            arguments: Some(Vec::new()),
        }])
    }

    async fn screenshot(&self, _: &str) -> BrowserResult<String> {
        self.record("screenshot");
        Ok("iVBORw0KGgo=".to_string())
    }

    async fn go_back(&self, _: &str) -> BrowserResult<()> {
        self.record("navback");
        Ok(())
    }

    async fn close(&self, _: &str) -> BrowserResult<()> {
        self.record("close");
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(BrowserError::Api {
                status: 502,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn current_url(&self, _: &str) -> BrowserResult<String> {
        self.record("current_url");
        Ok(self.page_url.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Agent wired to the given doubles
pub fn agent_with(model: Arc<MockModel>, backend: Arc<MockBackend>) -> Agent {
    let executor = Arc::new(ToolExecutor::new(backend, Duration::from_secs(2)));
    Agent::new(model, executor)
}

//! Starting-URL selection, run once per goal

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

use crate::core::{Result, WaypointError};
use crate::llm::{ContentPart, GenerateOptions, Message, ObjectRequest, StructuredModel};

/// Where the run begins and why
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartingUrl {
    pub url: String,
    pub reasoning: String,
}

fn start_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": { "type": "string", "description": "Absolute http(s) URL to open first" },
            "reasoning": { "type": "string" }
        },
        "required": ["url", "reasoning"],
        "additionalProperties": false
    })
}

fn start_prompt(goal: &str) -> String {
    format!(
        "Given the goal: \"{}\", determine the best URL to start from.\n\
         Choose from:\n\
         1. A relevant search engine (Google, Bing, etc.)\n\
         2. A direct URL if confident about the target\n\
         3. Another appropriate starting point\n\n\
         Return a URL that is most effective for this goal.",
        goal
    )
}

/// Validate model output; the URL must parse as an absolute http(s) URL
pub fn parse_starting_url(value: Value) -> Result<StartingUrl> {
    let mut start: StartingUrl =
        serde_json::from_value(value).map_err(|e| WaypointError::schema(e.to_string()))?;
    start.url = start.url.trim().to_string();

    let parsed = Url::parse(&start.url)
        .map_err(|e| WaypointError::schema(format!("invalid URL '{}': {}", start.url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WaypointError::schema(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(start)
}

/// Asks the model where a goal should begin
pub struct StartingUrlSelector {
    model: Arc<dyn StructuredModel>,
    options: GenerateOptions,
}

impl StartingUrlSelector {
    pub fn new(model: Arc<dyn StructuredModel>) -> Self {
        Self {
            model,
            options: GenerateOptions::default(),
        }
    }

    /// Override generation options
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Pick the starting URL. Reachability is not checked.
    pub async fn select(&self, goal: &str) -> Result<StartingUrl> {
        let message = Message::user(vec![ContentPart::text(start_prompt(goal))]);
        let request = ObjectRequest::new("starting_url", start_schema(), vec![message])
            .with_options(self.options.clone());
        let output = self.model.generate_object(request).await?;
        parse_starting_url(output)
    }
}

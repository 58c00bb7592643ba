//! Context builder - assembles the next planning request
//!
//! Goal, current URL, the step transcript, an optional screenshot and the
//! previous extraction, in that order.

use std::sync::Arc;

use crate::core::{Extraction, StepHistory};
use crate::llm::{ContentPart, Message};
use crate::tools::ToolExecutor;

/// Guidance appended to every planning prompt
const PLANNING_GUIDELINES: &str = "\
Determine the immediate next step to take to achieve the goal.

Important guidelines:
1. Break down complex actions into small atomic steps
2. For ACT commands, use only one action at a time (click, type, etc.)
3. Avoid combining multiple actions into one step
4. If multiple actions are needed, separate them into multiple steps
5. If the goal is achieved, return \"CLOSE\".";

/// A fully assembled planning request
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningContext {
    /// Content parts in prompt order
    pub parts: Vec<ContentPart>,
}

impl PlanningContext {
    /// Whether a screenshot was attached
    pub fn has_image(&self) -> bool {
        self.parts.iter().any(ContentPart::is_image)
    }

    /// Wrap the context as the single user message sent to the model
    pub fn into_message(self) -> Message {
        Message::user(self.parts)
    }
}

/// Render the main prompt block
pub fn render_prompt(goal: &str, current_url: Option<&str>, history: &StepHistory) -> String {
    let mut prompt = String::from("Consider the following screenshot of a web page");
    if let Some(url) = current_url {
        prompt.push_str(&format!(" (URL: {})", url));
    }
    prompt.push_str(&format!(", with the goal being \"{}\".\n", goal));

    if !history.is_empty() {
        prompt.push_str("Previous steps taken:\n");
        for (i, step) in history.iter().enumerate() {
            prompt.push_str(&format!(
                "\nStep {}:\n- Action: {}\n- Reasoning: {}\n- Tool Used: {}\n- Instruction: {}\n",
                i + 1,
                step.text,
                step.reasoning,
                step.tool,
                step.instruction
            ));
        }
    }

    prompt.push_str(PLANNING_GUIDELINES);
    prompt
}

/// Render the trailing block describing the last extraction or observation
pub fn render_extraction(extraction: &Extraction) -> String {
    format!(
        "The result of the previous {} is: {}.",
        extraction.kind(),
        extraction.render()
    )
}

/// Builds planning contexts from live session state
pub struct ContextBuilder {
    executor: Arc<ToolExecutor>,
}

impl ContextBuilder {
    /// Create a builder that probes sessions through the executor
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }

    /// Build the context for the next planning round.
    ///
    /// Never fails: the URL and screenshot are probed best-effort and simply
    /// left out when unavailable.
    pub async fn build(
        &self,
        goal: &str,
        session_id: &str,
        history: &StepHistory,
        last_extraction: Option<&Extraction>,
    ) -> PlanningContext {
        let current_url = self.executor.current_url(session_id).await;

        let mut parts = vec![ContentPart::text(render_prompt(
            goal,
            current_url.as_deref(),
            history,
        ))];

        // No point spending image tokens on a blank page
        if history.has_navigated() {
            if let Some(image) = self.executor.screenshot(session_id).await {
                parts.push(ContentPart::image(image));
            }
        }

        if let Some(extraction) = last_extraction {
            parts.push(ContentPart::text(render_extraction(extraction)));
        }

        let context = PlanningContext { parts };
        tracing::debug!(
            session = %session_id,
            steps = history.len(),
            url = current_url.as_deref().unwrap_or("<unknown>"),
            screenshot = context.has_image(),
            "Built planning context"
        );

        context
    }
}

//! Planner - turns a planning context into exactly one validated Step
//!
//! The model is asked for a schema-constrained object and the result is
//! checked again locally; nothing free-form ever becomes an action.

use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use crate::agent::context::PlanningContext;
use crate::core::{Result, Step, Tool, WaypointError};
use crate::llm::{GenerateOptions, ObjectRequest, StructuredModel};

/// JSON Schema for a planned step
pub fn step_schema() -> Value {
    let tools: Vec<&str> = Tool::PLANNABLE.iter().map(Tool::as_str).collect();
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string", "description": "Short summary of the action" },
            "reasoning": { "type": "string", "description": "Why this action moves toward the goal" },
            "tool": { "type": "string", "enum": tools },
            "instruction": {
                "type": "string",
                "description": "URL for GOTO, one atomic action for ACT, what to extract or observe, milliseconds for WAIT"
            }
        },
        "required": ["text", "reasoning", "tool", "instruction"],
        "additionalProperties": false
    })
}

/// Step shape as produced by the model, before tool validation
#[derive(Debug, Deserialize)]
struct RawStep {
    text: String,
    reasoning: String,
    tool: String,
    #[serde(default)]
    instruction: String,
}

/// Coerce model output into a Step or fail with a schema error
pub fn parse_step(value: Value) -> Result<Step> {
    let raw: RawStep =
        serde_json::from_value(value).map_err(|e| WaypointError::schema(e.to_string()))?;

    let tool = Tool::from_str(raw.tool.trim()).map_err(|e| WaypointError::schema(e.to_string()))?;
    if !tool.is_plannable() {
        return Err(WaypointError::schema(format!(
            "{} cannot be chosen by the planner",
            tool
        )));
    }

    let step = Step::new(raw.text, raw.reasoning, tool, raw.instruction.trim());
    step.validate()
        .map_err(|e| WaypointError::schema(e.to_string()))?;
    Ok(step)
}

/// Plans the next step with a structured-output model
pub struct Planner {
    model: Arc<dyn StructuredModel>,
    options: GenerateOptions,
}

impl Planner {
    /// Create a planner using the given model
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

    /// Ask the model for the next step. No retries happen here.
    pub async fn plan(&self, context: PlanningContext) -> Result<Step> {
        let request = ObjectRequest::new("step", step_schema(), vec![context.into_message()])
            .with_options(self.options.clone());

        let output = self.model.generate_object(request).await?;
        let step = parse_step(output)?;

        tracing::debug!(provider = self.model.name(), tool = %step.tool, "Planned step");
        Ok(step)
    }
}

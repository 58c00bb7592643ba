//! Shared types used across Waypoint modules
//!
//! Steps, the tool vocabulary, and the payloads tools hand back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Result, WaypointError};

/// The closed action vocabulary.
///
/// `Screenshot` is only ever issued internally by the context builder and is
/// never accepted from the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "GOTO")]
    Goto,
    #[serde(rename = "ACT")]
    Act,
    #[serde(rename = "EXTRACT")]
    Extract,
    #[serde(rename = "OBSERVE")]
    Observe,
    #[serde(rename = "CLOSE")]
    Close,
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "NAVBACK")]
    NavBack,
    #[serde(rename = "SCREENSHOT")]
    Screenshot,
}

impl Tool {
    /// Tools the planner may choose from
    pub const PLANNABLE: [Tool; 7] = [
        Tool::Goto,
        Tool::Act,
        Tool::Extract,
        Tool::Observe,
        Tool::Close,
        Tool::Wait,
        Tool::NavBack,
    ];

    /// Wire name of the tool
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Goto => "GOTO",
            Tool::Act => "ACT",
            Tool::Extract => "EXTRACT",
            Tool::Observe => "OBSERVE",
            Tool::Close => "CLOSE",
            Tool::Wait => "WAIT",
            Tool::NavBack => "NAVBACK",
            Tool::Screenshot => "SCREENSHOT",
        }
    }

    /// Whether the planner is allowed to emit this tool
    pub fn is_plannable(&self) -> bool {
        !matches!(self, Tool::Screenshot)
    }

    /// Whether a step using this tool must carry an instruction
    pub fn requires_instruction(&self) -> bool {
        matches!(
            self,
            Tool::Goto | Tool::Act | Tool::Extract | Tool::Observe | Tool::Wait
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GOTO" => Ok(Tool::Goto),
            "ACT" => Ok(Tool::Act),
            "EXTRACT" => Ok(Tool::Extract),
            "OBSERVE" => Ok(Tool::Observe),
            "CLOSE" => Ok(Tool::Close),
            "WAIT" => Ok(Tool::Wait),
            "NAVBACK" => Ok(Tool::NavBack),
            "SCREENSHOT" => Ok(Tool::Screenshot),
            other => Err(WaypointError::validation(format!("Unknown tool '{}'", other))),
        }
    }
}

/// One planned or executed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable summary of the action
    pub text: String,
    /// Model-provided justification
    pub reasoning: String,
    /// Tool to invoke
    pub tool: Tool,
    /// Tool-dependent argument (URL, action, milliseconds, ...)
    #[serde(default)]
    pub instruction: String,
}

impl Step {
    /// Create a new step
    pub fn new(
        text: impl Into<String>,
        reasoning: impl Into<String>,
        tool: Tool,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            reasoning: reasoning.into(),
            tool,
            instruction: instruction.into(),
        }
    }

    /// The navigation step that opens every run
    pub fn goto(url: impl Into<String>, reasoning: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(format!("Navigating to {}", url), reasoning, Tool::Goto, url)
    }

    /// Whether this step ends the run
    pub fn is_terminal(&self) -> bool {
        self.tool == Tool::Close
    }

    /// Check the step invariants without converting it
    pub fn validate(&self) -> Result<()> {
        self.to_action().map(|_| ())
    }

    /// Convert the step into an executable action.
    ///
    /// Fails with a validation error if the tool is internal-only or a
    /// required instruction is missing or malformed.
    pub fn to_action(&self) -> Result<Action> {
        let instruction = self.instruction.trim();
        if self.tool.requires_instruction() && instruction.is_empty() {
            return Err(WaypointError::validation(format!(
                "{} step requires a non-empty instruction",
                self.tool
            )));
        }

        let action = match self.tool {
            Tool::Goto => Action::Goto {
                url: instruction.to_string(),
            },
            Tool::Act => Action::Act {
                instruction: instruction.to_string(),
            },
            Tool::Extract => Action::Extract {
                instruction: instruction.to_string(),
            },
            Tool::Observe => Action::Observe {
                instruction: instruction.to_string(),
            },
            Tool::Close => Action::Close,
            Tool::Wait => {
                let millis = instruction.parse::<u64>().map_err(|_| {
                    WaypointError::validation(format!(
                        "WAIT instruction must be a number of milliseconds, got '{}'",
                        instruction
                    ))
                })?;
                Action::Wait { millis }
            }
            Tool::NavBack => Action::NavBack,
            Tool::Screenshot => {
                return Err(WaypointError::validation(
                    "SCREENSHOT is an internal tool and cannot be used in a step",
                ))
            }
        };

        Ok(action)
    }
}

/// An executable tool invocation with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto { url: String },
    Act { instruction: String },
    Extract { instruction: String },
    Observe { instruction: String },
    Close,
    Wait { millis: u64 },
    NavBack,
    Screenshot,
}

impl Action {
    /// The tool this action belongs to
    pub fn tool(&self) -> Tool {
        match self {
            Action::Goto { .. } => Tool::Goto,
            Action::Act { .. } => Tool::Act,
            Action::Extract { .. } => Tool::Extract,
            Action::Observe { .. } => Tool::Observe,
            Action::Close => Tool::Close,
            Action::Wait { .. } => Tool::Wait,
            Action::NavBack => Tool::NavBack,
            Action::Screenshot => Tool::Screenshot,
        }
    }

    /// The instruction text, if this action carries one
    pub fn instruction(&self) -> Option<String> {
        match self {
            Action::Goto { url } => Some(url.clone()),
            Action::Act { instruction }
            | Action::Extract { instruction }
            | Action::Observe { instruction } => Some(instruction.clone()),
            Action::Wait { millis } => Some(millis.to_string()),
            Action::Close | Action::NavBack | Action::Screenshot => None,
        }
    }
}

/// A candidate element returned by OBSERVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    /// What the element is
    pub description: String,
    /// Locator for the element (usually an xpath)
    pub selector: String,
    /// Suggested interaction method, e.g. "click"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Arguments for the suggested method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
}

/// Result of the last EXTRACT or OBSERVE, carried into the next planning round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extraction {
    /// Scalar value from EXTRACT
    Text(String),
    /// Candidate elements from OBSERVE
    Observations(Vec<ObservationRecord>),
}

impl Extraction {
    /// "observation" for sequences, "extraction" for scalars
    pub fn kind(&self) -> &'static str {
        match self {
            Extraction::Text(_) => "extraction",
            Extraction::Observations(_) => "observation",
        }
    }

    /// Literal content for inclusion in a prompt
    pub fn render(&self) -> String {
        match self {
            Extraction::Text(text) => text.clone(),
            Extraction::Observations(records) => {
                serde_json::to_string(records).unwrap_or_else(|_| format!("{:?}", records))
            }
        }
    }
}

/// Payload returned by a tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Extraction(Extraction),
    /// Base64-encoded viewport image
    Screenshot(String),
}

impl ToolOutput {
    /// The extraction carried by this output, if any
    pub fn into_extraction(self) -> Option<Extraction> {
        match self {
            ToolOutput::Extraction(extraction) => Some(extraction),
            ToolOutput::Screenshot(_) => None,
        }
    }
}

/// Append-only record of the steps taken toward one goal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepHistory {
    steps: Vec<Step>,
}

impl StepHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Number of steps taken
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps have been taken yet
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// Whether any step so far navigated somewhere
    pub fn has_navigated(&self) -> bool {
        self.steps.iter().any(|step| step.tool == Tool::Goto)
    }

    /// Consume into the underlying steps
    pub fn into_vec(self) -> Vec<Step> {
        self.steps
    }
}

impl From<Vec<Step>> for StepHistory {
    fn from(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

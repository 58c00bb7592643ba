//! Custom error types for Waypoint
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

use crate::core::types::Tool;

/// Main error type for Waypoint operations
#[derive(Error, Debug)]
pub enum WaypointError {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// Model output did not match the expected schema
    #[error("Model output failed schema validation: {0}")]
    SchemaValidation(String),

    /// Transport or model service failure
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A remote browser action failed
    #[error("{tool} failed{}: {message}", instruction_suffix(.instruction))]
    Execution {
        tool: Tool,
        instruction: Option<String>,
        message: String,
    },

    /// Operating on a closed or unknown session
    #[error("Session '{session_id}': {message}")]
    SessionLifecycle { session_id: String, message: String },

    /// Remote session could not be created
    #[error("Session provisioning failed: {0}")]
    Provisioning(String),

    /// The loop reached its configured step limit without a CLOSE
    #[error("Step limit of {0} reached without the goal being completed")]
    StepLimitExceeded(usize),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn instruction_suffix(instruction: &Option<String>) -> String {
    match instruction {
        Some(text) if !text.is_empty() => format!(" (instruction: \"{}\")", text),
        _ => String::new(),
    }
}

/// Convenience Result type for Waypoint operations
pub type Result<T> = std::result::Result<T, WaypointError>;

impl WaypointError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a schema validation error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaValidation(msg.into())
    }

    /// Create a model unavailable error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create an execution error for a tool call
    pub fn execution(tool: Tool, instruction: Option<&str>, msg: impl Into<String>) -> Self {
        Self::Execution {
            tool,
            instruction: instruction.map(str::to_string),
            message: msg.into(),
        }
    }

    /// Create a session lifecycle error
    pub fn session(session_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SessionLifecycle {
            session_id: session_id.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came out of the tool executor
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

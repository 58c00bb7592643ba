//! Waypoint - goal-directed browser agent
//!
//! Directs a remote, stateful browser session toward a natural-language goal
//! by repeatedly asking a planning model for exactly one next action,
//! validating it, and executing it until the model chooses CLOSE.
//!
//! # Architecture
//!
//! - **Core**: Steps, the tool vocabulary, configuration, and error handling
//! - **LLM**: Structured-output model abstraction with an OpenAI-compatible client
//! - **Tools**: Remote browser backend, session provisioning, and the tool executor
//! - **Agent**: Context builder, planner, starting-URL selector, and the loop driver
//! - **Server**: HTTP action protocol (START / GET_NEXT_STEP / EXECUTE_STEP)
//! - **CLI**: Commands behind the `waypoint` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use waypoint::{Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> waypoint::Result<()> {
//!     let agent = Agent::from_config(&Config::load())?;
//!     let outcome = agent
//!         .run("go to browserbase.com and tell me what it is about", "session-id", |n, step| {
//!             println!("{}: {}", n, step.text);
//!         })
//!         .await?;
//!     println!("{} steps", outcome.history.len());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, RunOutcome};
pub use core::{Config, Result, Step, StepHistory, Tool, WaypointError};

//! Agent module - planning and the plan/execute loop
//!
//! Contains the context builder, planner, starting-URL selector and the
//! orchestrator that drives them against a browser session.

pub mod context;
pub mod loop_state;
pub mod orchestrator;
pub mod planner;
pub mod start_url;

pub use context::{ContextBuilder, PlanningContext};
pub use loop_state::{AgentLoopState, LoopPhase};
pub use orchestrator::{Agent, RunOutcome};
pub use planner::Planner;
pub use start_url::{StartingUrl, StartingUrlSelector};

//! Tools module - browser-side effects for the agent
//!
//! Contains the remote browser integration and the tool executor.

pub mod browser;

pub use browser::ToolExecutor;

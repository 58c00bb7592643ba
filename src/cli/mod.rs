//! CLI module - command implementations behind the `waypoint` binary

pub mod commands;

pub use commands::{config_command, format_step, run_goal, serve};

//! CLI commands
//!
//! `run` drives a goal locally, `config` inspects or writes configuration.

use std::sync::Arc;

use crate::agent::Agent;
use crate::core::{Config, Result, Step};
use crate::server;
use crate::tools::browser::{BrowserbaseSessions, SessionProvider};

/// Format a step the way it is shown while a run is in progress
pub fn format_step(number: usize, step: &Step) -> String {
    let mut out = format!("\n[Step {}] {} ({})", number, step.text, step.tool);
    if !step.instruction.is_empty() && step.instruction != step.text {
        out.push_str(&format!("\n  instruction: {}", step.instruction));
    }
    if !step.reasoning.is_empty() {
        out.push_str(&format!("\n  reasoning:   {}", step.reasoning));
    }
    out
}

/// Run a goal end to end against a remote session
pub async fn run_goal(
    config: &Config,
    goal: &str,
    session_id: Option<String>,
    open_live_view: bool,
) -> Result<()> {
    let agent = Agent::from_config(config)?;

    let session_id = match session_id {
        Some(id) => id,
        None => {
            let provider = BrowserbaseSessions::from_config(config)?;
            let session = provider.create().await?;
            println!("View this session live: {}", session.live_view_url);
            if open_live_view {
                if let Err(e) = webbrowser::open(&session.live_view_url) {
                    tracing::warn!("Could not open live view: {}", e);
                }
            }
            session.id
        }
    };

    let outcome = agent
        .run(goal, &session_id, |number, step| {
            println!("{}", format_step(number, step));
        })
        .await?;

    println!("\nDone in {} steps.", outcome.history.len());
    if let Some(result) = outcome.last_extraction {
        println!("Last {}: {}", result.kind(), result.render());
    }
    Ok(())
}

/// Serve the HTTP action endpoint
pub async fn serve(config: &Config) -> Result<()> {
    let agent = Arc::new(Agent::from_config(config)?);
    server::serve(agent, &config.server_addr()).await
}

/// Print the effective configuration, or write the default config file
pub fn config_command(config: &Config, init: bool) -> Result<()> {
    if init {
        if Config::config_exists() {
            println!("Config already exists at {}", Config::config_file().display());
            return Ok(());
        }
        let path = Config::default().save()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    println!("# {}", Config::config_file().display());
    println!("{}", config.to_display_toml());
    Ok(())
}

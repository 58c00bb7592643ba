//! Waypoint - goal-directed browser agent
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint::{cli, Config};

/// Waypoint - drive a remote browser toward a goal, one step at a time
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Planning model
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Maximum planned steps per goal (0 for unbounded)
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the agent action endpoint over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Run a goal to completion
    Run {
        /// What the agent should accomplish
        #[arg(long, short = 'g')]
        goal: String,

        /// Use an existing session instead of creating one
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Open the live view in your browser
        #[arg(long)]
        open: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the default config file
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging first, so config load problems are reported
    dotenvy::dotenv().ok();
    let debug = args.debug || Config::default().agent.debug;
    init_logging(debug)?;

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.model.model = model.clone();
    }

    if let Some(max_steps) = args.max_steps {
        config.agent.max_steps = max_steps;
    }

    if debug {
        config.agent.debug = true;
    }

    match args.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            cli::serve(&config).await?;
        }
        Command::Run {
            goal,
            session,
            open,
        } => {
            cli::run_goal(&config, &goal, session, open).await?;
        }
        Command::Config { init } => {
            cli::config_command(&config, init)?;
        }
    }

    Ok(())
}

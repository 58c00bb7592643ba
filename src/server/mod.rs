//! HTTP endpoint for the agent action protocol

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::agent::Agent;
use crate::core::Result;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

/// Build the router
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route(
            "/api/agent",
            get(handlers::ready).post(handlers::handle_action),
        )
        .with_state(AppState { agent })
}

/// Serve the router until the process is stopped
pub async fn serve(agent: Arc<Agent>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Agent API listening on http://{}/api/agent", addr);

    axum::serve(listener, router(agent)).await?;
    Ok(())
}

//! Handlers for the agent action protocol
//!
//! `POST /api/agent` takes `{ action, goal, sessionId, previousSteps,
//! previousExtraction, step }` and dispatches on `action`. No error escapes
//! as anything but a JSON body.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{Extraction, Step, StepHistory, WaypointError};
use crate::server::AppState;

/// Body of an action request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub previous_steps: Option<Vec<Step>>,
    #[serde(default)]
    pub previous_extraction: Option<Extraction>,
    #[serde(default)]
    pub step: Option<Step>,
}

/// Response to START and GET_NEXT_STEP
#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub success: bool,
    pub result: Step,
    pub steps: Vec<Step>,
    pub done: bool,
}

/// Response to EXECUTE_STEP
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<Extraction>,
    pub done: bool,
}

/// Error translated into an HTTP response
#[derive(Debug)]
pub struct ApiError(WaypointError);

impl From<WaypointError> for ApiError {
    fn from(err: WaypointError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0 {
            WaypointError::Validation(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            WaypointError::SessionLifecycle { .. } => (
                StatusCode::CONFLICT,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
            _ => {
                tracing::error!("Error in agent endpoint: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": message })),
                )
                    .into_response()
            }
        }
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| WaypointError::validation(format!("Missing {} in request body", name)).into())
}

fn required_text(value: Option<String>, name: &str) -> Result<String, ApiError> {
    required(value.filter(|v| !v.trim().is_empty()), name)
}

/// GET /api/agent
pub async fn ready() -> Json<serde_json::Value> {
    Json(json!({ "message": "Agent API endpoint ready" }))
}

/// POST /api/agent
pub async fn handle_action(
    State(state): State<AppState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| WaypointError::validation(rejection.body_text()))?;

    let session_id = required_text(request.session_id, "sessionId")?;

    match request.action.as_deref() {
        Some("START") => {
            let goal = required_text(request.goal, "goal")?;
            let step = state.agent.start(&goal, &session_id).await?;
            Ok(Json(StepResponse {
                success: true,
                result: step.clone(),
                steps: vec![step],
                done: false,
            })
            .into_response())
        }
        Some("GET_NEXT_STEP") => {
            let goal = required_text(request.goal, "goal")?;
            let history = StepHistory::from(required(request.previous_steps, "previousSteps")?);

            let step = state
                .agent
                .next_step(
                    &goal,
                    &session_id,
                    &history,
                    request.previous_extraction.as_ref(),
                )
                .await?;

            let done = step.is_terminal();
            if done {
                state.agent.close(&session_id).await?;
            }

            let mut steps = history.into_vec();
            steps.push(step.clone());

            Ok(Json(StepResponse {
                success: true,
                result: step,
                steps,
                done,
            })
            .into_response())
        }
        Some("EXECUTE_STEP") => {
            let step = required(request.step, "step")?;
            // CLOSE is executed once here; no extra teardown follows
            let extraction = state.agent.execute_step(&session_id, &step).await?;

            Ok(Json(ExecuteResponse {
                success: true,
                extraction,
                done: step.is_terminal(),
            })
            .into_response())
        }
        _ => Err(WaypointError::validation("Invalid action type").into()),
    }
}

//! Colorize trigger and state query

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::ApiResult;
use crate::workflow::WorkflowSnapshot;
use crate::AppState;

/// POST /colorize
///
/// Starts colorization of the current sketch and returns immediately.
/// The outcome arrives on `/events` and in `/state`.
/// - 202: snapshot with phase `PROCESSING`
/// - 409: no sketch uploaded, or a colorization is already running
pub async fn start_colorize(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<WorkflowSnapshot>)> {
    let task = state.workflow.request_colorize().await?;

    tracing::info!(
        generation = task.ticket.generation,
        job = task.ticket.job,
        "Colorization accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(task.snapshot)))
}

/// GET /state
pub async fn get_state(State(state): State<AppState>) -> Json<WorkflowSnapshot> {
    Json(state.workflow.snapshot().await)
}

/// Build colorize routes
pub fn colorize_routes() -> Router<AppState> {
    Router::new()
        .route("/colorize", post(start_colorize))
        .route("/state", get(get_state))
}

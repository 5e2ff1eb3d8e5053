//! Sketch upload and display endpoints

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::SketchFile;
use crate::workflow::WorkflowSnapshot;
use crate::AppState;

/// File name used when the client does not supply one
const UNNAMED_SKETCH: &str = "sketch";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// POST /sketch?filename=<name>
///
/// Raw image bytes in the body; `Content-Type` is taken as the declared
/// media type (sniffed from the bytes when absent).
/// - 200: new snapshot (`PREVIEWING`)
/// - 415: not an image, state unchanged
/// - 400: empty body
/// - 413: body larger than the configured upload limit
pub async fn upload_sketch(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WorkflowSnapshot>> {
    let declared_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let file_name = query
        .filename
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_SKETCH.to_string());

    tracing::debug!(
        file_name = %file_name,
        declared_type = ?declared_type,
        size_bytes = body.len(),
        "Sketch upload received"
    );

    let file = SketchFile::from_bytes(file_name, declared_type, body.to_vec());
    let snapshot = state.workflow.upload(file).await?;

    Ok(Json(snapshot))
}

/// GET /sketches/{id}
///
/// Serves the bytes behind a live display reference; 404 once released.
pub async fn get_sketch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let displayed = state
        .workflow
        .ingestor()
        .resolve_display(id)
        .ok_or_else(|| ApiError::NotFound(format!("Sketch not found: {}", id)))?;

    let bytes = displayed.read_bytes().await?;
    let content_type = HeaderValue::from_str(&displayed.media_type)
        .map_err(|e| ApiError::Internal(format!("Invalid stored media type: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Build sketch routes
///
/// Upload bodies above `max_upload_bytes` are answered with 413.
pub fn sketch_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/sketch",
            post(upload_sketch).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/sketches/:id", get(get_sketch))
}

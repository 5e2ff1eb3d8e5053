//! Server-Sent Events for workflow updates

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams every workflow event:
/// - SketchUploaded / SketchRejected
/// - ColorizeStarted / ColorizeCompleted / ColorizeFailed
/// - StaleResultDiscarded
/// - Notification (toasts)
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    skc_common::sse::create_event_sse_stream(&state.event_bus, "skc-colorizer")
}

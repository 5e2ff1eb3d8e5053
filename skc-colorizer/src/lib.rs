//! skc-colorizer library interface
//!
//! Sketch colorization service: accepts a sketch upload, forwards it to an
//! external image-generation backend and reports the colorized result.
//! Exposes the public API for integration testing.

pub mod api;
pub mod error;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use skc_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use skc_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::workflow::Workflow;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Upload → colorize workflow
    pub workflow: Workflow,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last colorization failure detail, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Body size cap for `POST /sketch`
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            event_bus: workflow.event_bus().clone(),
            last_error: workflow.last_error(),
            workflow,
            startup_time: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::sketch_routes(state.max_upload_bytes))
        .merge(api::colorize_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

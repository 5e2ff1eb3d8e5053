//! HTTP API handlers for skc-colorizer
//!
//! REST endpoints for upload/colorize plus an SSE stream of workflow events.

pub mod colorize;
pub mod health;
pub mod sketch;
pub mod sse;

pub use colorize::colorize_routes;
pub use health::health_routes;
pub use sketch::sketch_routes;
pub use sse::event_stream;

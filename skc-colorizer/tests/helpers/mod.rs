//! Test Helper Utilities
//!
//! Shared utilities for testing skc-colorizer

#![allow(dead_code)]

pub mod backends;
pub mod mock_server;

pub use backends::{GatedBackend, PendingCall, ScriptedBackend};
pub use mock_server::spawn_mock_server;

use skc_colorizer::services::{ColorizationBackend, ColorizationClient, SketchFile};
use skc_colorizer::workflow::Workflow;
use skc_common::events::{ColorizeEvent, EventBus};
use std::sync::Arc;
use tokio::sync::broadcast;

/// PNG signature followed by the start of an IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
];

pub const TEST_PROMPT: &str = "Colorize this sketch";

/// In-memory PNG sketch
pub fn png_sketch(name: &str) -> SketchFile {
    SketchFile::from_bytes(name, Some("image/png".to_string()), PNG_BYTES.to_vec())
}

/// In-memory non-image upload
pub fn text_file(name: &str) -> SketchFile {
    SketchFile::from_bytes(name, Some("text/plain".to_string()), b"not an image".to_vec())
}

/// Workflow over `backend` with a fresh event bus
pub fn test_workflow(backend: Arc<dyn ColorizationBackend>) -> (Workflow, EventBus) {
    let event_bus = EventBus::new(100);
    let client = ColorizationClient::with_backend(backend, TEST_PROMPT);
    (Workflow::new(client, event_bus.clone()), event_bus)
}

/// Everything currently buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<ColorizeEvent>) -> Vec<ColorizeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event type names, in order
pub fn event_types(events: &[ColorizeEvent]) -> Vec<&str> {
    events.iter().map(|e| e.event_type()).collect()
}

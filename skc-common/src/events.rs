//! Event types for the colorizer event system
//!
//! Provides the shared event definitions and the `EventBus` used to fan
//! workflow transitions and user notifications out to SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a user-facing notification (toast)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Colorizer event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// `generation` identifies the uploaded sketch an event belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorizeEvent {
    /// A new sketch replaced the current one
    ///
    /// Triggers:
    /// - SSE: Show the original-sketch panel
    SketchUploaded {
        /// Generation assigned to the new sketch
        generation: u64,
        /// Display reference for the uploaded bytes
        display_ref: String,
        /// Media type accepted at ingestion
        media_type: String,
        timestamp: DateTime<Utc>,
    },

    /// An upload was rejected because it is not an image
    SketchRejected {
        /// Declared (or sniffed) media type, if any
        media_type: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Colorization request sent for the current sketch
    ///
    /// Triggers:
    /// - SSE: Disable colorize button, show spinner
    ColorizeStarted {
        generation: u64,
        timestamp: DateTime<Utc>,
    },

    /// Colorization finished and the result is now current
    ColorizeCompleted {
        generation: u64,
        /// Colorized image reference exactly as returned by the backend
        result_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Colorization failed; detail is only logged
    ColorizeFailed {
        generation: u64,
        timestamp: DateTime<Utc>,
    },

    /// A colorization finished after its sketch was replaced and was ignored
    StaleResultDiscarded {
        generation: u64,
        timestamp: DateTime<Utc>,
    },

    /// Toast shown to the user
    Notification {
        level: NotificationLevel,
        title: String,
        description: String,
        timestamp: DateTime<Utc>,
    },
}

impl ColorizeEvent {
    /// Get event type as string for SSE event names
    pub fn event_type(&self) -> &str {
        match self {
            ColorizeEvent::SketchUploaded { .. } => "SketchUploaded",
            ColorizeEvent::SketchRejected { .. } => "SketchRejected",
            ColorizeEvent::ColorizeStarted { .. } => "ColorizeStarted",
            ColorizeEvent::ColorizeCompleted { .. } => "ColorizeCompleted",
            ColorizeEvent::ColorizeFailed { .. } => "ColorizeFailed",
            ColorizeEvent::StaleResultDiscarded { .. } => "StaleResultDiscarded",
            ColorizeEvent::Notification { .. } => "Notification",
        }
    }

    /// Success toast shown after a colorization completes
    pub fn success_notification() -> Self {
        ColorizeEvent::Notification {
            level: NotificationLevel::Success,
            title: "✨ Colorization Complete!".to_string(),
            description: "Your sketch has been transformed with AI colors".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Generic error toast; concrete failure detail is never shown
    pub fn error_notification() -> Self {
        ColorizeEvent::Notification {
            level: NotificationLevel::Error,
            title: "Processing Error".to_string(),
            description: GENERIC_FAILURE_MESSAGE.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// User-facing text for every colorize-path failure
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to colorize the sketch. Please try again.";

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use skc_common::events::{ColorizeEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ColorizeEvent::ColorizeStarted {
///     generation: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let received = rx.try_recv().unwrap();
/// assert_eq!(received.event_type(), "ColorizeStarted");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ColorizeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ColorizeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ColorizeEvent,
    ) -> Result<usize, broadcast::error::SendError<ColorizeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ColorizeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

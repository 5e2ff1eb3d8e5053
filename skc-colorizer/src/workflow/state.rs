//! Workflow state machine types
//!
//! EMPTY → PREVIEWING → PROCESSING → DONE | FAILED
//!
//! Exactly one state holds at a time. Transitions happen only on user
//! actions (upload, colorize) or on completion of the in-flight call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skc_common::events::GENERIC_FAILURE_MESSAGE;

use crate::services::{ColorizationResult, ColorizeError, IngestError, SketchAsset};

/// Coarse phase, as exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowPhase {
    /// No sketch uploaded yet
    Empty,
    /// Sketch uploaded, not colorized
    Previewing,
    /// Colorization call in flight
    Processing,
    /// Colorized result available
    Done,
    /// Last colorization failed
    Failed,
}

/// Category of a colorize-path failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Network,
    Service,
    EmptyResult,
}

/// Failure recorded on the `Failed` state
///
/// `detail` is for logs only; clients only ever see [`ErrorInfo::user_message`].
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub kind: FailureKind,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

impl From<&IngestError> for ErrorInfo {
    fn from(e: &IngestError) -> Self {
        ErrorInfo::new(FailureKind::Read, e.to_string())
    }
}

impl From<&ColorizeError> for ErrorInfo {
    fn from(e: &ColorizeError) -> Self {
        let kind = match e {
            ColorizeError::Network(_) => FailureKind::Network,
            ColorizeError::Service { .. } => FailureKind::Service,
            ColorizeError::EmptyResult(_) => FailureKind::EmptyResult,
        };
        ErrorInfo::new(kind, e.to_string())
    }
}

/// Workflow state
///
/// `previous` holds the last successful result for the same sketch; it stays
/// visible while a re-colorization runs and after it fails, and is replaced
/// only by a newer success.
#[derive(Debug, Clone, Default)]
pub enum WorkflowState {
    #[default]
    Empty,
    Previewing(SketchAsset),
    Processing {
        asset: SketchAsset,
        previous: Option<ColorizationResult>,
    },
    Done {
        asset: SketchAsset,
        result: ColorizationResult,
    },
    Failed {
        asset: SketchAsset,
        error: ErrorInfo,
        previous: Option<ColorizationResult>,
    },
}

impl WorkflowState {
    pub fn phase(&self) -> WorkflowPhase {
        match self {
            WorkflowState::Empty => WorkflowPhase::Empty,
            WorkflowState::Previewing(_) => WorkflowPhase::Previewing,
            WorkflowState::Processing { .. } => WorkflowPhase::Processing,
            WorkflowState::Done { .. } => WorkflowPhase::Done,
            WorkflowState::Failed { .. } => WorkflowPhase::Failed,
        }
    }

    pub fn asset(&self) -> Option<&SketchAsset> {
        match self {
            WorkflowState::Empty => None,
            WorkflowState::Previewing(asset)
            | WorkflowState::Processing { asset, .. }
            | WorkflowState::Done { asset, .. }
            | WorkflowState::Failed { asset, .. } => Some(asset),
        }
    }

    /// Result currently shown next to the sketch
    pub fn visible_result(&self) -> Option<&ColorizationResult> {
        match self {
            WorkflowState::Done { result, .. } => Some(result),
            WorkflowState::Processing { previous, .. } | WorkflowState::Failed { previous, .. } => {
                previous.as_ref()
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            WorkflowState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Sketch details exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchSummary {
    pub generation: u64,
    pub display_ref: String,
    pub file_name: String,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl From<&SketchAsset> for SketchSummary {
    fn from(asset: &SketchAsset) -> Self {
        Self {
            generation: asset.generation(),
            display_ref: asset.display_ref().to_string(),
            file_name: asset.file_name().to_string(),
            media_type: asset.media_type().to_string(),
            size_bytes: asset.size_bytes(),
        }
    }
}

/// Serializable view of [`WorkflowState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub sketch: Option<SketchSummary>,
    pub result_url: Option<String>,
    /// Generic user-facing failure text (never the concrete error)
    pub message: Option<String>,
}

impl From<&WorkflowState> for WorkflowSnapshot {
    fn from(state: &WorkflowState) -> Self {
        Self {
            phase: state.phase(),
            sketch: state.asset().map(SketchSummary::from),
            result_url: state.visible_result().map(|r| r.as_str().to_string()),
            message: state.error().map(|e| e.user_message().to_string()),
        }
    }
}

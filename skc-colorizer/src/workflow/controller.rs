//! Workflow controller
//!
//! Synchronous state machine mediating between ingestion and the
//! colorization client. It never performs I/O itself: `request_colorize`
//! hands out a [`ColorizeJob`] and the caller reports the outcome back
//! through `complete`.
//!
//! # Stale-response guard
//! Every job carries a [`JobTicket`]. `complete` applies an outcome only
//! while the controller is still processing that exact ticket; a result for
//! a replaced sketch is reported as [`Completion::Stale`] and changes nothing.

use thiserror::Error;
use tracing::{debug, info};

use super::state::{ErrorInfo, WorkflowSnapshot, WorkflowState};
use crate::services::{ColorizationResult, IngestError, SketchAsset, SketchFile, SketchIngestor};

/// Workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Colorize requested before any sketch was uploaded
    #[error("No sketch uploaded")]
    NoSketch,

    /// Colorize requested while a call is already in flight
    #[error("Colorization already in progress")]
    AlreadyProcessing,

    /// Upload rejected by ingestion
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl WorkflowError {
    /// Action not valid in the current state
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, WorkflowError::NoSketch | WorkflowError::AlreadyProcessing)
    }
}

/// Identifies one colorize attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTicket {
    /// Generation of the sketch the job was started for
    pub generation: u64,
    /// Controller-wide attempt counter
    pub job: u64,
}

/// Work handed out by [`WorkflowController::request_colorize`]
#[derive(Debug, Clone)]
pub struct ColorizeJob {
    pub ticket: JobTicket,
    pub asset: SketchAsset,
}

/// What `complete` did with an outcome
#[derive(Debug, Clone)]
pub enum Completion {
    /// Now `Done` with this result
    Done(ColorizationResult),
    /// Now `Failed` with this error
    Failed(ErrorInfo),
    /// Outcome ignored; it belongs to a sketch or attempt that is no longer current
    Stale,
}

pub struct WorkflowController {
    state: WorkflowState,
    ingestor: SketchIngestor,
    active_job: Option<JobTicket>,
    next_job: u64,
}

impl WorkflowController {
    pub fn new(ingestor: SketchIngestor) -> Self {
        Self {
            state: WorkflowState::Empty,
            ingestor,
            active_job: None,
            next_job: 0,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot::from(&self.state)
    }

    pub fn active_job(&self) -> Option<JobTicket> {
        self.active_job
    }

    /// Replace the current sketch
    ///
    /// Valid from every state. A non-image leaves the state untouched. When a
    /// call is in flight its result is orphaned and will be discarded.
    pub fn upload(&mut self, file: SketchFile) -> Result<&WorkflowState, WorkflowError> {
        let asset = self.ingestor.upload(file)?;

        if let Some(orphaned) = self.active_job.take() {
            debug!(
                orphaned_generation = orphaned.generation,
                orphaned_job = orphaned.job,
                "Upload supersedes in-flight colorization"
            );
        }

        info!(
            from = ?self.state.phase(),
            generation = asset.generation(),
            "Workflow → PREVIEWING"
        );
        self.state = WorkflowState::Previewing(asset);
        Ok(&self.state)
    }

    /// Start a colorize attempt for the current sketch
    ///
    /// Valid from `Previewing`, `Done` and `Failed`; moves to `Processing`.
    pub fn request_colorize(&mut self) -> Result<ColorizeJob, WorkflowError> {
        let (asset, previous) = match &self.state {
            WorkflowState::Empty => return Err(WorkflowError::NoSketch),
            WorkflowState::Processing { .. } => return Err(WorkflowError::AlreadyProcessing),
            WorkflowState::Previewing(asset) => (asset.clone(), None),
            WorkflowState::Done { asset, result } => (asset.clone(), Some(result.clone())),
            WorkflowState::Failed { asset, previous, .. } => (asset.clone(), previous.clone()),
        };

        self.next_job += 1;
        let ticket = JobTicket {
            generation: asset.generation(),
            job: self.next_job,
        };
        self.active_job = Some(ticket);

        info!(
            from = ?self.state.phase(),
            generation = ticket.generation,
            job = ticket.job,
            "Workflow → PROCESSING"
        );
        self.state = WorkflowState::Processing {
            asset: asset.clone(),
            previous,
        };

        Ok(ColorizeJob { ticket, asset })
    }

    /// Report the outcome of the job identified by `ticket`
    pub fn complete(
        &mut self,
        ticket: JobTicket,
        outcome: Result<ColorizationResult, ErrorInfo>,
    ) -> Completion {
        if self.active_job != Some(ticket) {
            debug!(
                generation = ticket.generation,
                job = ticket.job,
                "Discarding stale colorization outcome"
            );
            return Completion::Stale;
        }

        let (asset, previous) = match std::mem::take(&mut self.state) {
            WorkflowState::Processing { asset, previous } => (asset, previous),
            other => {
                // Active ticket implies Processing; restore and ignore otherwise
                self.state = other;
                self.active_job = None;
                return Completion::Stale;
            }
        };
        self.active_job = None;

        match outcome {
            Ok(result) => {
                info!(generation = ticket.generation, job = ticket.job, "Workflow → DONE");
                self.state = WorkflowState::Done {
                    asset,
                    result: result.clone(),
                };
                Completion::Done(result)
            }
            Err(error) => {
                info!(
                    generation = ticket.generation,
                    job = ticket.job,
                    kind = ?error.kind,
                    "Workflow → FAILED"
                );
                self.state = WorkflowState::Failed {
                    asset,
                    error: error.clone(),
                    previous,
                };
                Completion::Failed(error)
            }
        }
    }
}

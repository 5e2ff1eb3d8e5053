//! Sketch colorization workflow
//!
//! [`Workflow`] owns the [`WorkflowController`] behind a tokio mutex and
//! drives colorize jobs on background tasks. Every transition is published
//! on the [`EventBus`]; success and failure additionally emit a toast.
//!
//! The controller lock is never held across the network call: a job takes
//! the lock to start, releases it while encoding and calling the backend,
//! and takes it again to report its outcome.

pub mod controller;
pub mod state;

pub use controller::{ColorizeJob, Completion, JobTicket, WorkflowController, WorkflowError};
pub use state::{ErrorInfo, FailureKind, WorkflowPhase, WorkflowSnapshot, WorkflowState};

use chrono::Utc;
use skc_common::events::{ColorizeEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::{
    ColorizationClient, ColorizationResult, ImagePayload, IngestError, SketchAsset, SketchFile,
    SketchIngestor,
};

/// Handle to a started colorize job
pub struct ColorizeTask {
    pub ticket: JobTicket,
    /// State right after the job was started (phase `PROCESSING`)
    pub snapshot: WorkflowSnapshot,
    /// Resolves once the outcome has been applied or discarded
    pub handle: JoinHandle<Completion>,
}

/// Shared workflow handle
///
/// Cheap to clone; clones drive the same controller.
#[derive(Clone)]
pub struct Workflow {
    controller: Arc<Mutex<WorkflowController>>,
    client: ColorizationClient,
    event_bus: EventBus,
    ingestor: SketchIngestor,
    last_error: Arc<RwLock<Option<String>>>,
}

impl Workflow {
    pub fn new(client: ColorizationClient, event_bus: EventBus) -> Self {
        let ingestor = SketchIngestor::new();
        Self {
            controller: Arc::new(Mutex::new(WorkflowController::new(ingestor.clone()))),
            client,
            event_bus,
            ingestor,
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Ingestor serving display references
    pub fn ingestor(&self) -> &SketchIngestor {
        &self.ingestor
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn backend_name(&self) -> &'static str {
        self.client.backend_name()
    }

    /// Detail of the most recent colorize failure, for diagnostics
    pub fn last_error(&self) -> Arc<RwLock<Option<String>>> {
        Arc::clone(&self.last_error)
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.controller.lock().await.snapshot()
    }

    /// Replace the current sketch with `file`
    pub async fn upload(&self, file: SketchFile) -> Result<WorkflowSnapshot, WorkflowError> {
        let mut controller = self.controller.lock().await;

        match controller.upload(file) {
            Ok(state) => {
                let snapshot = WorkflowSnapshot::from(state);
                if let Some(sketch) = &snapshot.sketch {
                    self.event_bus.emit_lossy(ColorizeEvent::SketchUploaded {
                        generation: sketch.generation,
                        display_ref: sketch.display_ref.clone(),
                        media_type: sketch.media_type.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(snapshot)
            }
            Err(e) => {
                if let WorkflowError::Ingest(IngestError::NotAnImage(media_type)) = &e {
                    info!(media_type = ?media_type, "Upload rejected: not an image");
                    self.event_bus.emit_lossy(ColorizeEvent::SketchRejected {
                        media_type: media_type.clone(),
                        timestamp: Utc::now(),
                    });
                } else {
                    info!(error = %e, "Upload rejected");
                }
                Err(e)
            }
        }
    }

    /// Start colorizing the current sketch in the background
    pub async fn request_colorize(&self) -> Result<ColorizeTask, WorkflowError> {
        let (job, snapshot) = {
            let mut controller = self.controller.lock().await;
            let job = controller.request_colorize()?;
            (job, controller.snapshot())
        };

        self.event_bus.emit_lossy(ColorizeEvent::ColorizeStarted {
            generation: job.ticket.generation,
            timestamp: Utc::now(),
        });

        let ticket = job.ticket;
        let workflow = self.clone();
        let handle = tokio::spawn(async move { workflow.run_job(job).await });

        Ok(ColorizeTask {
            ticket,
            snapshot,
            handle,
        })
    }

    async fn run_job(self, job: ColorizeJob) -> Completion {
        let ColorizeJob { ticket, asset } = job;
        debug!(generation = ticket.generation, job = ticket.job, "Colorize job started");

        let outcome = self.call_backend(&asset).await;

        let completion = {
            let mut controller = self.controller.lock().await;
            controller.complete(ticket, outcome)
        };

        match &completion {
            Completion::Done(result) => {
                self.event_bus.emit_lossy(ColorizeEvent::ColorizeCompleted {
                    generation: ticket.generation,
                    result_url: result.as_str().to_string(),
                    timestamp: Utc::now(),
                });
                self.event_bus.emit_lossy(ColorizeEvent::success_notification());
            }
            Completion::Failed(error) => {
                warn!(
                    generation = ticket.generation,
                    kind = ?error.kind,
                    detail = %error.detail,
                    "Colorization failed"
                );
                *self.last_error.write().await = Some(error.detail.clone());
                self.event_bus.emit_lossy(ColorizeEvent::ColorizeFailed {
                    generation: ticket.generation,
                    timestamp: Utc::now(),
                });
                self.event_bus.emit_lossy(ColorizeEvent::error_notification());
            }
            Completion::Stale => {
                info!(
                    generation = ticket.generation,
                    job = ticket.job,
                    "Colorization outcome discarded: sketch or attempt superseded"
                );
                self.event_bus.emit_lossy(ColorizeEvent::StaleResultDiscarded {
                    generation: ticket.generation,
                    timestamp: Utc::now(),
                });
            }
        }

        completion
    }

    /// Encode `asset` and send it to the backend
    async fn call_backend(&self, asset: &SketchAsset) -> Result<ColorizationResult, ErrorInfo> {
        let data_url = asset
            .encode_for_transfer()
            .await
            .map_err(|e| ErrorInfo::from(&e))?;

        self.client
            .colorize(ImagePayload::DataUrl(data_url))
            .await
            .map_err(|e| ErrorInfo::from(&e))
    }
}

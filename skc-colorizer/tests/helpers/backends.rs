//! In-process colorization backends
//!
//! - `ScriptedBackend`: answers immediately from a queue of outcomes
//! - `GatedBackend`: parks each call until the test answers it

use async_trait::async_trait;
use skc_colorizer::services::{
    ColorizationBackend, ColorizationRequest, ColorizationResult, ColorizeError,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

pub type Outcome = Result<ColorizationResult, ColorizeError>;

/// Backend that pops one scripted outcome per call
pub struct ScriptedBackend {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<ColorizationRequest>>,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(url: &str) -> Self {
        Self::new(vec![Ok(ColorizationResult::new(url))])
    }

    pub fn failing(error: ColorizeError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ColorizationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ColorizationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn colorize(&self, request: &ColorizationRequest) -> Outcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ColorizeError::Network("no scripted outcome left".to_string())))
    }
}

/// A call parked inside `GatedBackend`
pub struct PendingCall {
    pub request: ColorizationRequest,
    respond: oneshot::Sender<Outcome>,
}

impl PendingCall {
    pub fn respond(self, outcome: Outcome) {
        let _ = self.respond.send(outcome);
    }

    pub fn succeed(self, url: &str) {
        self.respond(Ok(ColorizationResult::new(url)));
    }
}

/// Backend whose calls complete only when the test answers them
pub struct GatedBackend {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl GatedBackend {
    /// Backend plus the receiver the test answers calls from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Self { calls }, rx)
    }
}

#[async_trait]
impl ColorizationBackend for GatedBackend {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn colorize(&self, request: &ColorizationRequest) -> Outcome {
        let (respond, answer) = oneshot::channel();
        self.calls
            .send(PendingCall {
                request: request.clone(),
                respond,
            })
            .map_err(|_| ColorizeError::Network("gate closed".to_string()))?;

        answer
            .await
            .unwrap_or_else(|_| Err(ColorizeError::Network("call abandoned".to_string())))
    }
}

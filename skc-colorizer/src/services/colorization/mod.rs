//! Colorization client
//!
//! Wraps the single HTTP exchange with the external image-generation service.
//! Two backend shapes exist (see [`data_api`] and [`chat_completion`]); exactly
//! one is active per deployment, selected by [`BackendKind`]. Callers only see
//! [`ColorizationClient::colorize`].
//!
//! One request per call, no retries. Every request is bounded by the
//! configured timeout; an elapsed timeout surfaces as [`ColorizeError::Network`].

pub mod chat_completion;
pub mod data_api;

pub use chat_completion::ChatCompletionBackend;
pub use data_api::DataApiBackend;

use async_trait::async_trait;
use serde::Serialize;
use skc_common::config::{BackendKind, ColorizerConfig};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Colorization failures, each surfaced distinctly to the caller
#[derive(Debug, Error)]
pub enum ColorizeError {
    /// Request could not be sent or the transport failed (includes timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; `message` is the backend's error text when present
    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    /// 2xx response without a usable image reference
    #[error("No colorized image in response: {0}")]
    EmptyResult(String),
}

/// Image handed to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// `data:<type>;base64,<payload>`
    DataUrl(String),
    /// Directly fetchable image URL
    Url(String),
}

impl ImagePayload {
    pub fn as_str(&self) -> &str {
        match self {
            ImagePayload::DataUrl(s) | ImagePayload::Url(s) => s,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ImagePayload::DataUrl(_) => "data-url",
            ImagePayload::Url(_) => "url",
        }
    }
}

/// Ephemeral value object built per call
#[derive(Debug, Clone)]
pub struct ColorizationRequest {
    pub image: ImagePayload,
    /// Fixed colorization instruction
    pub prompt: String,
}

/// Colorized image reference (URL or data URL), kept exactly as returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColorizationResult(String);

impl ColorizationResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Data URLs can be megabytes; never print the payload
        if self.0.starts_with("data:") {
            write!(f, "<data url, {} chars>", self.0.len())
        } else {
            f.write_str(&self.0)
        }
    }
}

/// One colorization backend shape
///
/// # Example
/// ```rust,ignore
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl ColorizationBackend for Fixed {
///     fn name(&self) -> &'static str { "fixed" }
///
///     async fn colorize(&self, _req: &ColorizationRequest) -> Result<ColorizationResult, ColorizeError> {
///         Ok(ColorizationResult::new("https://x/result.png"))
///     }
/// }
/// ```
#[async_trait]
pub trait ColorizationBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Send exactly one request and return the first colorized image found
    async fn colorize(
        &self,
        request: &ColorizationRequest,
    ) -> Result<ColorizationResult, ColorizeError>;
}

/// Backend-agnostic colorization client
#[derive(Clone)]
pub struct ColorizationClient {
    backend: Arc<dyn ColorizationBackend>,
    prompt: String,
}

impl ColorizationClient {
    /// Build the client for whichever backend `config` selects
    pub fn from_config(config: &ColorizerConfig) -> skc_common::Result<Self> {
        let http_client = build_http_client(config.request_timeout)?;

        let backend: Arc<dyn ColorizationBackend> = match config.backend {
            BackendKind::DataApi => Arc::new(DataApiBackend::new(
                http_client,
                &config.base_url,
                config.api_token.clone(),
            )),
            BackendKind::ChatCompletion => Arc::new(ChatCompletionBackend::new(
                http_client,
                &config.base_url,
                config.api_token.clone(),
                config.model.clone(),
            )),
        };

        info!(
            backend = config.backend.as_str(),
            base_url = %config.base_url,
            timeout_secs = config.request_timeout.as_secs(),
            "Colorization client configured"
        );

        Ok(Self::with_backend(backend, config.prompt.clone()))
    }

    /// Client over an explicit backend (used by tests and embedding code)
    pub fn with_backend(backend: Arc<dyn ColorizationBackend>, prompt: impl Into<String>) -> Self {
        Self {
            backend,
            prompt: prompt.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Colorize `image` with the configured backend
    pub async fn colorize(
        &self,
        image: ImagePayload,
    ) -> Result<ColorizationResult, ColorizeError> {
        let request = ColorizationRequest {
            image,
            prompt: self.prompt.clone(),
        };

        debug!(
            backend = self.backend.name(),
            payload_kind = request.image.kind(),
            payload_len = request.image.as_str().len(),
            "Sending colorization request"
        );

        let started = Instant::now();
        let outcome = self.backend.colorize(&request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => info!(
                backend = self.backend.name(),
                elapsed_ms,
                result = %result,
                "Colorization succeeded"
            ),
            Err(e) => warn!(
                backend = self.backend.name(),
                elapsed_ms,
                error = %e,
                "Colorization failed"
            ),
        }

        outcome
    }
}

/// HTTP client shared by the backends, bounded by `timeout`
pub fn build_http_client(timeout: Duration) -> skc_common::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("skc-colorizer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| skc_common::Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a reqwest transport failure to [`ColorizeError::Network`]
fn transport_error(context: &str, e: reqwest::Error) -> ColorizeError {
    if e.is_timeout() {
        ColorizeError::Network(format!("{} timed out: {}", context, e))
    } else {
        ColorizeError::Network(format!("{} failed: {}", context, e))
    }
}

/// Turn a non-2xx response into [`ColorizeError::Service`]
///
/// The backend's own error text is kept verbatim when the body carries one.
async fn service_error(response: reqwest::Response) -> ColorizeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body).unwrap_or_else(|| {
        format!(
            "Failed to colorize image ({})",
            status.canonical_reason().unwrap_or("unknown status")
        )
    });

    ColorizeError::Service {
        status: status.as_u16(),
        message,
    }
}

/// Extract `error` / `error.message` / `message` from a JSON error body
fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidate = match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        None => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
    };

    candidate.filter(|s| !s.trim().is_empty())
}

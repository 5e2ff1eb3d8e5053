//! Data API backend
//!
//! # API Reference
//! - Endpoint: `POST <base>/colorize-sketch`
//! - Auth: `Authorization: Bearer <token>`
//! - Request: `{ "imageBase64": "<data url or url>" }`
//! - Success: `{ "colorizedImageUrl": "<url>" }`
//! - Failure: non-2xx with `{ "error": "<message>" }`
//!
//! The instruction prompt lives server-side for this shape and is not sent.

use super::{
    service_error, transport_error, ColorizationBackend, ColorizationRequest, ColorizationResult,
    ColorizeError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Path appended to the configured base URL
pub const COLORIZE_PATH: &str = "/colorize-sketch";

pub struct DataApiBackend {
    http_client: Client,
    endpoint: String,
    api_token: String,
}

impl DataApiBackend {
    pub fn new(http_client: Client, base_url: &str, api_token: String) -> Self {
        Self {
            http_client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), COLORIZE_PATH),
            api_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ColorizationBackend for DataApiBackend {
    fn name(&self) -> &'static str {
        "data-api"
    }

    async fn colorize(
        &self,
        request: &ColorizationRequest,
    ) -> Result<ColorizationResult, ColorizeError> {
        debug!(endpoint = %self.endpoint, "Calling colorize-sketch endpoint");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&ColorizeSketchRequest {
                image_base64: request.image.as_str(),
            })
            .send()
            .await
            .map_err(|e| transport_error("colorize-sketch request", e))?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let body: ColorizeSketchResponse = response.json().await.map_err(|e| {
            ColorizeError::EmptyResult(format!("Unreadable colorize-sketch response: {}", e))
        })?;

        body.colorized_image_url
            .filter(|url| !url.trim().is_empty())
            .map(ColorizationResult::new)
            .ok_or_else(|| {
                ColorizeError::EmptyResult("Response has no colorizedImageUrl".to_string())
            })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ColorizeSketchRequest<'a> {
    image_base64: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorizeSketchResponse {
    #[serde(default)]
    colorized_image_url: Option<String>,
}

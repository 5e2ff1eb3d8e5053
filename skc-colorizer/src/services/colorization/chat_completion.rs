//! Chat-completion gateway backend
//!
//! # API Reference
//! - Endpoint: `POST <gateway>/v1/chat/completions`
//! - Request: model id, one user message with a text part (the instruction)
//!   and an `image_url` part, `modalities: ["image", "text"]`
//! - Success: image at `choices[0].message.images[0].image_url.url`
//! - Failure: non-2xx, or 2xx without that path (empty result)

use super::{
    service_error, transport_error, ColorizationBackend, ColorizationRequest, ColorizationResult,
    ColorizeError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Path appended to the configured gateway URL
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub struct ChatCompletionBackend {
    http_client: Client,
    endpoint: String,
    api_token: String,
    model: String,
}

impl ChatCompletionBackend {
    pub fn new(http_client: Client, gateway_url: &str, api_token: String, model: String) -> Self {
        Self {
            http_client,
            endpoint: format!("{}{}", gateway_url.trim_end_matches('/'), COMPLETIONS_PATH),
            api_token,
            model,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body<'a>(&'a self, request: &'a ColorizationRequest) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrlRef {
                            url: request.image.as_str(),
                        },
                    },
                ],
            }],
            modalities: ["image", "text"],
        }
    }
}

#[async_trait]
impl ColorizationBackend for ChatCompletionBackend {
    fn name(&self) -> &'static str {
        "chat-completion"
    }

    async fn colorize(
        &self,
        request: &ColorizationRequest,
    ) -> Result<ColorizationResult, ColorizeError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Calling chat completion endpoint");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| transport_error("chat completion request", e))?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            ColorizeError::EmptyResult(format!("Unreadable chat completion response: {}", e))
        })?;

        first_image_url(body)
            .map(ColorizationResult::new)
            .ok_or_else(|| {
                ColorizeError::EmptyResult(
                    "No image at choices[0].message.images[0].image_url.url".to_string(),
                )
            })
    }
}

/// `choices[0].message.images[0].image_url.url`, if present and non-blank
fn first_image_url(body: CompletionResponse) -> Option<String> {
    body.choices
        .into_iter()
        .next()?
        .message?
        .images
        .into_iter()
        .next()?
        .image_url?
        .url
        .filter(|url| !url.trim().is_empty())
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    modalities: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrlRef<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrlRef<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    images: Vec<ResponseImage>,
}

#[derive(Debug, Deserialize)]
struct ResponseImage {
    #[serde(default)]
    image_url: Option<ResponseImageUrl>,
}

#[derive(Debug, Deserialize)]
struct ResponseImageUrl {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::colorization::ImagePayload;

    fn backend() -> ChatCompletionBackend {
        ChatCompletionBackend::new(
            Client::new(),
            "https://gateway.example/",
            "t".to_string(),
            "image-model".to_string(),
        )
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(backend().endpoint(), "https://gateway.example/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let backend = backend();
        let request = ColorizationRequest {
            image: ImagePayload::DataUrl("data:image/png;base64,AA==".to_string()),
            prompt: "Colorize it".to_string(),
        };

        let json = serde_json::to_value(backend.build_body(&request)).unwrap();

        assert_eq!(json["model"], "image-model");
        assert_eq!(json["modalities"], serde_json::json!(["image", "text"]));
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);

        let message = &json["messages"][0];
        assert_eq!(message["role"], "user");
        assert_eq!(message["content"][0]["type"], "text");
        assert_eq!(message["content"][0]["text"], "Colorize it");
        assert_eq!(message["content"][1]["type"], "image_url");
        assert_eq!(
            message["content"][1]["image_url"]["url"],
            "data:image/png;base64,AA=="
        );
    }

    #[test]
    fn test_first_image_url_extraction() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"done",
                "images":[{"type":"image_url","image_url":{"url":"data:image/png;base64,QQ=="}},
                          {"type":"image_url","image_url":{"url":"https://x/second.png"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            first_image_url(body).as_deref(),
            Some("data:image/png;base64,QQ==")
        );
    }

    #[test]
    fn test_missing_image_path_yields_none() {
        for raw in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":"I cannot do that"}}]}"#,
            r#"{"choices":[{"message":{"images":[{"image_url":{}}]}}]}"#,
            r#"{"choices":[{"message":{"images":[{"image_url":{"url":"  "}}]}}]}"#,
        ] {
            let body: CompletionResponse = serde_json::from_str(raw).unwrap();
            assert!(first_image_url(body).is_none(), "expected no image for {}", raw);
        }
    }
}

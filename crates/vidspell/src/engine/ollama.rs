use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Frame, VisionModel};
use crate::analysis::prompt;
use crate::config::AnalysisConfig;
use crate::error::InferenceError;
use crate::language::Language;
use crate::sanitize;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    format: Value,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Vision-language inference through an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaVisionModel {
    client: Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl OllamaVisionModel {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::Unreachable {
                url: sanitize::redact_url(&base_url),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            model: model.into(),
            request_timeout,
            health_timeout,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, InferenceError> {
        Self::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
            config.timeouts.inference(),
            config.timeouts.health_check(),
        )
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn build_request(&self, image_b64: String, language: Language) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt::instruction(language),
                images: vec![image_b64],
            }],
            format: prompt::response_format(),
            stream: false,
        }
    }

    fn map_transport(&self, url: &str, err: reqwest::Error, limit: Duration) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout(limit)
        } else if let Some(status) = err.status() {
            InferenceError::Status {
                status: status.as_u16(),
            }
        } else {
            InferenceError::Unreachable {
                url: sanitize::redact_url(url),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl VisionModel for OllamaVisionModel {
    async fn analyze_frame(
        &self,
        frame: &Frame,
        language: Language,
    ) -> Result<String, InferenceError> {
        let bytes =
            tokio::fs::read(&frame.image)
                .await
                .map_err(|e| InferenceError::ReadImage {
                    path: frame.image.clone(),
                    source: e,
                })?;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(bytes);

        let url = self.chat_url();
        let request = self.build_request(image_b64, language);
        let limit = self.request_timeout;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(&url, e, limit))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
            });
        }

        // A body that is not the chat envelope is handed on as-is; the
        // validator decides whether it is usable.
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport(&url, e, limit))?;
        let content = match serde_json::from_str::<ChatResponse>(&body) {
            Ok(ChatResponse {
                message: Some(message),
            }) => message.content.trim().to_string(),
            _ => body,
        };

        debug!(
            "Frame {} response: {}",
            frame.index,
            sanitize::preview(&content, 120)
        );
        Ok(content)
    }

    async fn health_check(&self) -> Result<(), InferenceError> {
        let url = self.tags_url();
        self.client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| self.map_transport(&url, e, self.health_timeout))?;
        Ok(())
    }
}

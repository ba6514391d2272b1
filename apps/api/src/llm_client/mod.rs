//! LLM Client: the single point of entry for all generation backend calls.
//!
//! ARCHITECTURAL RULE: No other module may call the backend directly.
//! All generation requests MUST go through `GenerationBackend`.
//!
//! Protocol: one POST to `{base_url}/generate` with `{model, prompt, stream}`.
//! Streaming responses are newline-delimited JSON chunks; the last has `done = true`.
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod ndjson;
pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream closed before the final chunk")]
    Truncated,
}

/// One incremental unit of backend output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationEvent {
    pub fragment: String,
    pub is_final: bool,
}

/// Lazy sequence of backend events. Dropping it closes the backend connection.
pub type EventStream = BoxStream<'static, Result<GenerationEvent, LlmError>>;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Wire shape of both the single response and each streamed line.
#[derive(Debug, Deserialize)]
pub struct GenerateChunk {
    #[allow(dead_code)]
    pub model: Option<String>,
    #[allow(dead_code)]
    pub created_at: Option<String>,
    pub response: String,
    pub done: bool,
}

/// Seam between the generation pipeline and whatever produces text.
///
/// Carried in `AppState` as `Arc<dyn GenerationBackend>`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Opens a streaming generation. Errors before the first event (connection,
    /// non-success status) are returned here; later ones arrive on the stream.
    async fn generate_stream(&self, prompt: &str) -> Result<EventStream, LlmError>;

    /// Single-shot generation returning the full text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP client for the generation backend. No retries: a failed call is
/// reported to the caller as-is.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    /// `timeout` bounds each call end to end, including the whole streamed body.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/generate", self.base_url)
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generation backend returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_stream(&self, prompt: &str) -> Result<EventStream, LlmError> {
        let response = self.send(prompt, true).await?;
        debug!("Streaming generation opened (model: {})", self.model);
        Ok(ndjson::decode_events(Box::pin(response.bytes_stream())))
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.send(prompt, false).await?;
        let body = response.bytes().await?;
        let chunk: GenerateChunk = serde_json::from_slice(&body)?;

        debug!(
            "Generation succeeded: model={}, chars={}",
            self.model,
            chunk.response.len()
        );

        Ok(chunk.response)
    }
}

//! Tool-only model client: a single bounded-timeout HTTP call, no retries,
//! no provider selection, no authority over the pipeline's decisions.
//!
//! Client-trait and defensive HTTP-builder idiom grounded on
//! `examples/rand-loop/rlm-core/src/llm/client.rs`'s `AnthropicClient`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::envelope::{ModelInvocationRequest, ModelOutputFormat};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to model endpoint failed: {0}")]
    Request(String),
    #[error("model endpoint returned status {0}: {1}")]
    Status(u16, String),
    #[error("model response body could not be read: {0}")]
    Body(String),
}

#[derive(Debug, Clone)]
pub struct ModelClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl ModelClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        ModelClientConfig { base_url: base_url.into(), api_key: api_key.into(), model: model.into(), timeout_ms: 8_000 }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

fn build_http_client(timeout_ms: u64) -> Client {
    let timeout = Duration::from_millis(timeout_ms);
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => client,
        Ok(Err(_)) | Err(_) => {
            Client::builder().no_proxy().timeout(timeout).build().expect("failed to build fallback HTTP client")
        }
    }
}

/// The tool-only model surface: renders one envelope into one raw output.
/// Implementors must never retry and must never exceed the configured
/// timeout.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &ModelInvocationRequest) -> Result<String, ClientError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct HttpModelClient {
    config: ModelClientConfig,
    http: Client,
}

impl HttpModelClient {
    pub fn new(config: ModelClientConfig) -> Self {
        let http = build_http_client(config.timeout_ms);
        HttpModelClient { config, http }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn invoke(&self, request: &ModelInvocationRequest) -> Result<String, ClientError> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage { role: "user", content: request.envelope_text.clone() }],
            max_tokens: request.max_output_tokens,
            response_format: (request.output_format == ModelOutputFormat::Json)
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ClientError::Body(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16(), text));
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| ClientError::Body(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClientError::Body("no choices in model response".into()))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_timeout() {
        let config = ModelClientConfig::new("https://example.test", "key", "expression-model").with_timeout_ms(3000);
        assert_eq!(config.timeout_ms, 3000);
    }
}

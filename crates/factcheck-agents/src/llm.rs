//! Language-model reasoning endpoint.

use std::time::Duration;

use async_trait::async_trait;
use factcheck_core::{FactCheckError, LlmConfig, ReasoningError, SecretValue};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

/// One structured reasoning call: a system instruction and a user payload.
/// The answer is expected to be a single JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRequest {
    pub system: String,
    pub user: String,
}

impl ReasoningRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Raw model text for `request`.
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints in JSON mode.
#[derive(Clone)]
pub struct OpenAiReasoningClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: SecretValue,
}

impl OpenAiReasoningClient {
    pub fn new(
        config: &LlmConfig,
        api_key: SecretValue,
        timeout: Duration,
    ) -> Result<Self, FactCheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FactCheckError::InvalidConfiguration(format!("llm client: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }

    fn body(&self, request: &ReasoningRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        })
    }
}

#[async_trait]
impl ReasoningClient for OpenAiReasoningClient {
    #[instrument(name = "llm.complete", skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&self.body(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &self.api_key.scrub(&body)));
        }

        let payload: Value = response.json().await.map_err(transport_error)?;
        let content = message_content(&payload)?;
        debug!(chars = content.len(), "reasoning call answered");
        Ok(content)
    }
}

/// `choices[0].message.content` of a chat completion.
pub(crate) fn message_content(payload: &Value) -> Result<String, ReasoningError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ReasoningError::Malformed("completion has no message content".into()))
}

/// Rate limits and server errors are worth retrying; other client errors are not.
pub(crate) fn status_error(status: StatusCode, body: &str) -> ReasoningError {
    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
    let detail: String = body.chars().take(200).collect();
    ReasoningError::request(format!("HTTP {}: {detail}", status.as_u16()), retryable)
}

fn transport_error(err: reqwest::Error) -> ReasoningError {
    if err.is_timeout() {
        ReasoningError::Timeout
    } else if err.is_decode() {
        ReasoningError::Malformed(err.to_string())
    } else {
        ReasoningError::request(err.to_string(), true)
    }
}

//! OpenAI chat completions in JSON-object mode.

use serde_json::Value;
use tracing::debug;

use super::http::{ChatEndpoint, message_content};
use super::payload::parse_json_payload;
use super::{BackendSettings, CompletionBackend};
use crate::error::{BackendError, InvextError};
use crate::extract::Prompt;

/// OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    endpoint: ChatEndpoint,
}

impl OpenAiBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, InvextError> {
        Ok(Self {
            endpoint: ChatEndpoint::new(settings)?,
        })
    }
}

impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn submit(&self, prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
        let body = self.endpoint.request_body(prompt, text, true);
        let envelope = self.endpoint.post(&body).await?;

        if let Some(reason) = envelope.pointer("/choices/0/message/refusal").and_then(Value::as_str) {
            return Err(BackendError::MalformedResponse(format!("model refused: {}", reason)));
        }

        let content = message_content(&envelope)?
            .as_str()
            .ok_or_else(|| BackendError::MalformedResponse("content is not a string".to_string()))?;
        debug!("openai replied with {} chars", content.len());

        parse_json_payload(content)
    }
}

//! Mistral chat completions.

use serde_json::Value;
use tracing::debug;

use super::http::{ChatEndpoint, message_content};
use super::payload::parse_json_payload;
use super::{BackendSettings, CompletionBackend};
use crate::error::{BackendError, InvextError};
use crate::extract::Prompt;

/// Mistral backend.
///
/// Message content is either a string or a list of typed parts.
#[derive(Debug, Clone)]
pub struct MistralBackend {
    endpoint: ChatEndpoint,
}

impl MistralBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, InvextError> {
        Ok(Self {
            endpoint: ChatEndpoint::new(settings)?,
        })
    }
}

/// Flatten string or `[{type: "text", text}]` content to text.
fn content_text(content: &Value) -> Result<String, BackendError> {
    match content {
        Value::String(s) => Ok(s.clone()),
        Value::Array(parts) => Ok(parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("")),
        _ => Err(BackendError::MalformedResponse(
            "unexpected content type".to_string(),
        )),
    }
}

impl CompletionBackend for MistralBackend {
    fn name(&self) -> &'static str {
        "mistral"
    }

    async fn submit(&self, prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
        let body = self.endpoint.request_body(prompt, text, true);
        let envelope = self.endpoint.post(&body).await?;

        let content = content_text(message_content(&envelope)?)?;
        debug!("mistral replied with {} chars", content.len());

        parse_json_payload(&content)
    }
}

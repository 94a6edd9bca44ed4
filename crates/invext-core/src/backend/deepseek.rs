//! DeepSeek chat API.

use serde_json::Value;
use tracing::debug;

use super::http::{ChatEndpoint, message_content};
use super::payload::parse_json_payload;
use super::{BackendSettings, CompletionBackend};
use crate::error::{BackendError, InvextError};
use crate::extract::Prompt;

/// DeepSeek backend.
///
/// The reply is a JSON array, sometimes wrapped in prose or a code fence.
#[derive(Debug, Clone)]
pub struct DeepSeekBackend {
    endpoint: ChatEndpoint,
}

impl DeepSeekBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, InvextError> {
        Ok(Self {
            endpoint: ChatEndpoint::new(settings)?,
        })
    }
}

impl CompletionBackend for DeepSeekBackend {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn submit(&self, prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
        let body = self.endpoint.request_body(prompt, text, false);
        let envelope = self.endpoint.post(&body).await?;

        let content = message_content(&envelope)?
            .as_str()
            .ok_or_else(|| BackendError::MalformedResponse("content is not a string".to_string()))?;
        debug!("deepseek replied with {} chars", content.len());

        parse_json_payload(content)
    }
}

//! Shared chat-completions plumbing: client, request, status mapping.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{Value, json};
use tracing::{debug, trace};

use super::BackendSettings;
use crate::error::{BackendError, InvextError};
use crate::extract::Prompt;

const OBJECT_MODE_NOTE: &str =
    "Wrap the array in a JSON object under the key \"invoices\", e.g. {\"invoices\": [...]}.";

/// Longest error body we keep in a `Rejected` message.
const MAX_ERROR_BODY: usize = 300;

/// Build the HTTP client used by every backend.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, InvextError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30).min(timeout))
        .timeout(timeout)
        .user_agent(concat!("invext/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| InvextError::Config(format!("failed to build HTTP client: {}", e)))
}

/// A `/chat/completions` endpoint with credentials.
#[derive(Clone)]
pub(crate) struct ChatEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for ChatEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatEndpoint")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl ChatEndpoint {
    pub(crate) fn new(settings: &BackendSettings) -> Result<Self, InvextError> {
        let base_url = settings.base_url.trim_end_matches('/');
        Ok(Self {
            client: build_client(settings.timeout)?,
            url: format!("{}/chat/completions", base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// Request body shared by all backends.
    ///
    /// `object_mode` asks for a JSON object instead of a bare array.
    pub(crate) fn request_body(&self, prompt: &Prompt, text: &str, object_mode: bool) -> Value {
        let mut user = prompt.user_message(text);
        if object_mode {
            user.push_str("\n\n");
            user.push_str(OBJECT_MODE_NOTE);
        }

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": user },
            ],
            "temperature": prompt.temperature,
            "stream": false,
        });
        if object_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    /// POST the body and return the response envelope.
    pub(crate) async fn post(&self, body: &Value) -> Result<Value, BackendError> {
        trace!("POST {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            debug!("{} returned HTTP {}", self.url, status);
            return Err(status_error(status, &headers, &text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| BackendError::MalformedResponse(format!("response is not JSON: {}", e)))
    }
}

/// Map a non-success HTTP status to a backend error.
pub(crate) fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> BackendError {
    match status.as_u16() {
        401 | 403 => BackendError::Auth {
            status: status.as_u16(),
        },
        429 => BackendError::RateLimited {
            retry_after: retry_after(headers),
        },
        500..=599 => BackendError::Network(format!("server error: HTTP {}", status.as_u16())),
        code => BackendError::Rejected {
            status: code,
            message: body.chars().take(MAX_ERROR_BODY).collect(),
        },
    }
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// `choices[0].message.content` of a chat-completions envelope.
pub(crate) fn message_content(envelope: &Value) -> Result<&Value, BackendError> {
    envelope
        .pointer("/choices/0/message/content")
        .filter(|content| !content.is_null())
        .ok_or_else(|| BackendError::MalformedResponse("response has no message content".to_string()))
}

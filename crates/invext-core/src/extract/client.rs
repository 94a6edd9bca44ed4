//! Model client adapter: prompt, single retry, response normalization.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::CompletionBackend;
use crate::error::BackendError;
use crate::models::config::BackendConfig;
use crate::models::invoice::InvoiceRecord;
use crate::text::TextChunk;

use super::Prompt;

/// Object keys that may hold the invoice array.
const ARRAY_KEYS: [&str; 3] = ["invoices", "data", "records"];

/// When and how long to wait before the one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay when the backend gives no usable `Retry-After`.
    pub backoff: Duration,
    /// Longest `Retry-After` that is honoured.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            backoff: Duration::from_millis(config.retry_backoff_ms),
            max_retry_after: Duration::from_secs(config.max_retry_after_secs),
        }
    }

    /// Delay before retrying after `error`, or `None` if it is not retried.
    pub fn delay_for(&self, error: &BackendError) -> Option<Duration> {
        if !error.is_transient() {
            return None;
        }
        match error {
            BackendError::RateLimited {
                retry_after: Some(wait),
            } if *wait <= self.max_retry_after => Some(*wait),
            _ => Some(self.backoff),
        }
    }
}

/// Sends chunks to a backend and returns invoice records.
pub struct ModelClient<B> {
    backend: B,
    prompt: Prompt,
    retry: RetryPolicy,
}

impl<B: CompletionBackend> ModelClient<B> {
    /// Create a client with the standard extraction prompt.
    pub fn new(backend: B, config: &BackendConfig) -> Self {
        Self {
            backend,
            prompt: Prompt::invoice_extraction(config.temperature),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Extract the invoices found in one chunk.
    ///
    /// Transient failures are retried once. The records keep the order the
    /// backend returned them in.
    pub async fn extract(&self, chunk: &TextChunk) -> Result<Vec<InvoiceRecord>, BackendError> {
        let value = match self.backend.submit(&self.prompt, &chunk.text).await {
            Ok(value) => value,
            Err(e) => match self.retry.delay_for(&e) {
                Some(delay) => {
                    warn!(
                        "Chunk {}: {} error ({}), retrying in {}ms",
                        chunk.index + 1,
                        e.kind(),
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    self.backend.submit(&self.prompt, &chunk.text).await?
                }
                None => return Err(e),
            },
        };

        let records = records_from_json(value)?;
        debug!(
            "Chunk {}: {} invoice records from {}",
            chunk.index + 1,
            records.len(),
            self.backend.name()
        );
        Ok(records)
    }
}

/// Normalize backend JSON into records.
///
/// Accepts an array of objects, an object wrapping such an array under
/// `invoices`, `data` or `records` (any case), or a single invoice object. Elements that
/// are not objects or hold no recognized field are skipped.
pub fn records_from_json(value: Value) -> Result<Vec<InvoiceRecord>, BackendError> {
    match value {
        Value::Array(items) => Ok(records_from_array(&items)),
        Value::Object(object) => {
            let wrapped = ARRAY_KEYS.iter().find_map(|wanted| {
                object
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(wanted))
                    .and_then(|(_, value)| value.as_array())
            });
            Ok(match wrapped {
                Some(items) => records_from_array(items),
                None => InvoiceRecord::from_json_object(&object).into_iter().collect(),
            })
        }
        other => Err(BackendError::MalformedResponse(format!(
            "expected a JSON array or object, got {}",
            json_type(&other)
        ))),
    }
}

fn records_from_array(items: &[Value]) -> Vec<InvoiceRecord> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(InvoiceRecord::from_json_object)
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Hosted extraction backends behind one completion interface.

mod deepseek;
mod http;
mod mistral;
mod openai;
mod payload;

pub use deepseek::DeepSeekBackend;
pub use mistral::MistralBackend;
pub use openai::OpenAiBackend;
pub use payload::parse_json_payload;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, InvextError};
use crate::extract::Prompt;
use crate::models::config::BackendConfig;

/// Identifier of a hosted backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "mistral")]
    Mistral,
}

impl BackendKind {
    /// All backends.
    pub const ALL: [BackendKind; 3] = [BackendKind::DeepSeek, BackendKind::OpenAi, BackendKind::Mistral];

    /// Identifier used on the command line and in config files.
    pub fn id(&self) -> &'static str {
        match self {
            BackendKind::DeepSeek => "deepseek",
            BackendKind::OpenAi => "openai",
            BackendKind::Mistral => "mistral",
        }
    }

    /// Base URL, everything before `/chat/completions`.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::DeepSeek => "https://api.deepseek.com/v1",
            BackendKind::OpenAi => "https://api.openai.com/v1",
            BackendKind::Mistral => "https://api.mistral.ai/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::DeepSeek => "deepseek-chat",
            BackendKind::OpenAi => "gpt-4o",
            BackendKind::Mistral => "mistral-large-latest",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            BackendKind::DeepSeek => "DEEPSEEK_API_KEY",
            BackendKind::OpenAi => "OPENAI_API_KEY",
            BackendKind::Mistral => "MISTRAL_API_KEY",
        }
    }

    /// Chunk size in characters that fits the model's context comfortably.
    pub fn default_max_chars(&self) -> usize {
        match self {
            BackendKind::DeepSeek => 8000,
            BackendKind::OpenAi => 6000,
            BackendKind::Mistral => 4000,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BackendKind {
    type Err = InvextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == needle)
            .ok_or_else(|| {
                InvextError::Config(format!(
                    "unknown backend '{}' (expected deepseek, openai or mistral)",
                    s
                ))
            })
    }
}

/// Resolved connection settings for one backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendSettings {
    /// Settings with the backend's defaults and an explicit key.
    pub fn new(kind: BackendKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
            timeout: Duration::from_secs(BackendConfig::default().timeout_secs),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Resolve settings from config, reading the API key from the environment.
    ///
    /// A missing or empty key is a configuration error.
    pub fn from_config(config: &BackendConfig) -> Result<Self, InvextError> {
        let kind = config.kind;
        let api_key = std::env::var(kind.api_key_env())
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                InvextError::Config(format!(
                    "{} is not set (required for the {} backend)",
                    kind.api_key_env(),
                    kind
                ))
            })?;

        let mut settings = Self::new(kind, api_key);
        if let Some(base_url) = &config.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(model) = &config.model {
            settings.model = model.clone();
        }
        settings.timeout = Duration::from_secs(config.timeout_secs.max(1));
        Ok(settings)
    }
}

/// A hosted model that turns a prompt and document text into JSON.
pub trait CompletionBackend: Send + Sync {
    /// Backend identifier used in logs.
    fn name(&self) -> &'static str;

    /// Send one request and return the JSON the model produced.
    fn submit(
        &self,
        prompt: &Prompt,
        text: &str,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;
}

/// The backend selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    DeepSeek(DeepSeekBackend),
    OpenAi(OpenAiBackend),
    Mistral(MistralBackend),
}

impl Backend {
    /// Build the backend described by `settings`.
    pub fn new(settings: &BackendSettings) -> Result<Self, InvextError> {
        Ok(match settings.kind {
            BackendKind::DeepSeek => Backend::DeepSeek(DeepSeekBackend::new(settings)?),
            BackendKind::OpenAi => Backend::OpenAi(OpenAiBackend::new(settings)?),
            BackendKind::Mistral => Backend::Mistral(MistralBackend::new(settings)?),
        })
    }

    /// Build the configured backend; fails fast when the API key is missing.
    pub fn from_config(config: &BackendConfig) -> Result<Self, InvextError> {
        Self::new(&BackendSettings::from_config(config)?)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::DeepSeek(_) => BackendKind::DeepSeek,
            Backend::OpenAi(_) => BackendKind::OpenAi,
            Backend::Mistral(_) => BackendKind::Mistral,
        }
    }
}

impl CompletionBackend for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::DeepSeek(b) => b.name(),
            Backend::OpenAi(b) => b.name(),
            Backend::Mistral(b) => b.name(),
        }
    }

    async fn submit(&self, prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
        match self {
            Backend::DeepSeek(b) => b.submit(prompt, text).await,
            Backend::OpenAi(b) => b.submit(prompt, text).await,
            Backend::Mistral(b) => b.submit(prompt, text).await,
        }
    }
}

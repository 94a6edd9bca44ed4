//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::backend::BackendKind;
use crate::export::ExportFormat;
use crate::ocr::OcrEngineKind;

/// Main configuration for the invext pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvextConfig {
    /// PDF text-layer configuration.
    pub pdf: PdfConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,

    /// Chunking configuration.
    pub chunking: ChunkingConfig,

    /// Extraction backend configuration.
    pub backend: BackendConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try the empty password on encrypted PDFs.
    pub try_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            try_empty_password: true,
        }
    }
}

/// OCR fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on pages with too little layer text.
    pub enabled: bool,

    /// Recognition engine.
    pub engine: OcrEngineKind,

    /// Pages with fewer non-whitespace characters than this are OCR'd.
    pub min_text_chars: usize,

    /// DPI for rendering PDF pages to images.
    pub dpi: u32,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    pub language: String,

    /// Model directory for the ONNX engine.
    pub model_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: OcrEngineKind::Tesseract,
            min_text_chars: 20,
            dpi: 300,
            language: "eng".to_string(),
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters. Defaults to the backend's budget.
    pub max_chars: Option<usize>,
}

/// Extraction backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which hosted backend to call.
    pub kind: BackendKind,

    /// Model name override.
    pub model: Option<String>,

    /// Base URL override (everything before `/chat/completions`).
    pub base_url: Option<String>,

    /// Sampling temperature.
    pub temperature: f64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Delay before the single retry of a transient failure.
    pub retry_backoff_ms: u64,

    /// Longest `Retry-After` we are willing to honour.
    pub max_retry_after_secs: u64,

    /// Chunk requests in flight at once (1 = strictly sequential).
    pub concurrency: usize,

    /// Stop submitting chunks after the first authentication failure.
    pub abort_on_auth_failure: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::DeepSeek,
            model: None,
            base_url: None,
            temperature: 0.1,
            timeout_secs: 120,
            retry_backoff_ms: 2000,
            max_retry_after_secs: 30,
            concurrency: 1,
            abort_on_auth_failure: true,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output file format.
    pub format: ExportFormat,

    /// Output path. Defaults to `extracted_invoice_data.<ext>`.
    pub output: Option<PathBuf>,
}

impl ExportConfig {
    /// Resolve the output path.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.format.default_path())
    }
}

impl InvextConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Effective chunk size: explicit override or the backend's default budget.
    pub fn max_chunk_chars(&self) -> usize {
        self.chunking
            .max_chars
            .unwrap_or_else(|| self.backend.kind.default_max_chars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: InvextConfig =
            serde_json::from_str(r#"{"backend": {"kind": "mistral"}, "ocr": {"dpi": 200}}"#)
                .unwrap();
        assert_eq!(config.backend.kind, BackendKind::Mistral);
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.ocr.dpi, 200);
        assert_eq!(config.ocr.min_text_chars, 20);
        assert_eq!(config.max_chunk_chars(), 4000);
    }

    #[test]
    fn test_chunk_override() {
        let mut config = InvextConfig::default();
        assert_eq!(config.max_chunk_chars(), 8000);
        config.chunking.max_chars = Some(1500);
        assert_eq!(config.max_chunk_chars(), 1500);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = InvextConfig::default();
        config.backend.kind = BackendKind::OpenAi;
        config.save(&path).unwrap();

        let loaded = InvextConfig::from_file(&path).unwrap();
        assert_eq!(loaded.backend.kind, BackendKind::OpenAi);
    }
}

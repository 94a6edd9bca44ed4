//! Error types for the invext-core library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the invext library.
///
/// Only the variants here abort a run. Per-page OCR failures and per-chunk
/// backend failures are reported in the run summary instead.
#[derive(Error, Debug)]
pub enum InvextError {
    /// The input PDF could not be opened at all.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The result file could not be written.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration error (unknown backend, missing API key, bad value).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The PDF is missing, unreadable or corrupt.
#[derive(Error, Debug)]
pub enum InputError {
    /// The file does not exist or cannot be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the PDF structure.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be opened with an empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors from a text-layer extractor. Never fatal on their own.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to extract text.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The extractor panicked while decoding the document.
    #[error("extractor panicked: {0}")]
    Panicked(String),

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing. Never fatal to a run.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine or the page renderer is not installed.
    #[error("OCR unavailable: {0}")]
    Unavailable(String),

    /// Rendering the page to an image failed.
    #[error("page rendering failed: {0}")]
    Render(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image encoding or decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether retrying other pages is pointless.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, OcrError::Unavailable(_))
    }
}

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    Network,
    Auth,
    RateLimit,
    Timeout,
    MalformedResponse,
    Rejected,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendErrorKind::Network => "network",
            BackendErrorKind::Auth => "auth",
            BackendErrorKind::RateLimit => "rate-limit",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::MalformedResponse => "malformed-response",
            BackendErrorKind::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Errors from a hosted extraction backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection failure or server-side (5xx) error.
    #[error("network error: {0}")]
    Network(String),

    /// The API key was rejected.
    #[error("authentication failed (HTTP {status})")]
    Auth { status: u16 },

    /// The backend asked us to slow down.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// The request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The response was not the JSON we asked for.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend refused the request for another reason (4xx).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl BackendError {
    /// Get the coarse kind of this error.
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::Network(_) => BackendErrorKind::Network,
            BackendError::Auth { .. } => BackendErrorKind::Auth,
            BackendError::RateLimited { .. } => BackendErrorKind::RateLimit,
            BackendError::Timeout => BackendErrorKind::Timeout,
            BackendError::MalformedResponse(_) => BackendErrorKind::MalformedResponse,
            BackendError::Rejected { .. } => BackendErrorKind::Rejected,
        }
    }

    /// Whether a single retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            BackendErrorKind::Network | BackendErrorKind::RateLimit | BackendErrorKind::Timeout
        )
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_decode() {
            BackendError::MalformedResponse(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Errors while writing the result file.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook serialization failed.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the invext library.
pub type Result<T> = std::result::Result<T, InvextError>;

//! OCR fallback for pages with too little embedded text.

mod render;
mod tesseract;

#[cfg(feature = "onnx")]
mod onnx;

pub use render::PdftoppmRenderer;
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "onnx")]
pub use onnx::OnnxRecognizer;

use std::path::Path;
use std::str::FromStr;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::document::{Document, PageSource};

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Rasterizes a PDF page.
pub trait PageRenderer: Send + Sync {
    /// Render page `page` (1-indexed) of the PDF at `dpi`.
    fn render(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<DynamicImage>;
}

/// Recognizes text in an image.
pub trait TextRecognizer: Send + Sync {
    /// Short engine name used in logs.
    fn name(&self) -> &'static str;

    /// Recognize all text in the image.
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// Available recognition engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// The `tesseract` command-line tool.
    #[default]
    Tesseract,
    /// `pure-onnx-ocr` with PaddleOCR models (requires the `onnx` feature).
    Onnx,
}

impl FromStr for OcrEngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Ok(OcrEngineKind::Tesseract),
            "onnx" => Ok(OcrEngineKind::Onnx),
            other => Err(format!("unknown OCR engine: {} (expected tesseract or onnx)", other)),
        }
    }
}

/// What the fallback did to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OcrReport {
    /// Pages below the text threshold.
    pub attempted: usize,
    /// Pages whose text was replaced by OCR output.
    pub replaced: usize,
    /// Pages where rendering or recognition failed.
    pub failed: usize,
    /// The engine was missing; remaining pages were not tried.
    pub unavailable: bool,
}

/// Replaces thin page text with OCR output.
pub struct OcrFallback {
    renderer: Box<dyn PageRenderer>,
    recognizer: Box<dyn TextRecognizer>,
    min_text_chars: usize,
    dpi: u32,
}

impl OcrFallback {
    /// Create a fallback from a renderer and recognizer.
    pub fn new(renderer: Box<dyn PageRenderer>, recognizer: Box<dyn TextRecognizer>) -> Self {
        let defaults = OcrConfig::default();
        Self {
            renderer,
            recognizer,
            min_text_chars: defaults.min_text_chars,
            dpi: defaults.dpi,
        }
    }

    /// Build the configured engine.
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let recognizer: Box<dyn TextRecognizer> = match config.engine {
            OcrEngineKind::Tesseract => Box::new(TesseractRecognizer::new(&config.language)),
            #[cfg(feature = "onnx")]
            OcrEngineKind::Onnx => Box::new(OnnxRecognizer::from_dir(&config.model_dir)?),
            #[cfg(not(feature = "onnx"))]
            OcrEngineKind::Onnx => {
                return Err(OcrError::Unavailable(
                    "built without the `onnx` feature".to_string(),
                ));
            }
        };

        Ok(Self::new(Box::new(PdftoppmRenderer::new()), recognizer)
            .with_min_text_chars(config.min_text_chars)
            .with_dpi(config.dpi))
    }

    /// Set the minimum non-whitespace character count.
    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    /// Set the render DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Run OCR on every page below the threshold.
    ///
    /// Failures are logged and counted, never returned.
    pub fn apply(&self, document: &mut Document, pdf_path: &Path) -> OcrReport {
        let mut report = OcrReport::default();

        for page in document.pages.iter_mut() {
            if page.content_chars() >= self.min_text_chars {
                continue;
            }
            report.attempted += 1;

            if report.unavailable {
                continue;
            }

            debug!(
                "Page {} has {} chars of layer text, running OCR",
                page.number,
                page.content_chars()
            );

            let recognized = self
                .renderer
                .render(pdf_path, page.number, self.dpi)
                .and_then(|image| self.recognizer.recognize(&image));

            match recognized {
                Ok(text) if !text.trim().is_empty() => {
                    page.text = text;
                    page.source = PageSource::Ocr;
                    report.replaced += 1;
                }
                Ok(_) => {
                    debug!("OCR found no text on page {}", page.number);
                }
                Err(e) if e.is_unavailable() => {
                    warn!("{}; continuing with layer text only", e);
                    report.failed += 1;
                    report.unavailable = true;
                }
                Err(e) => {
                    warn!("OCR failed for page {}: {}", page.number, e);
                    report.failed += 1;
                }
            }
        }

        if report.attempted > 0 {
            info!(
                "OCR ({}): {} pages attempted, {} replaced, {} failed",
                self.recognizer.name(),
                report.attempted,
                report.replaced,
                report.failed
            );
        }

        report
    }
}

//! Text recognition with the `tesseract` command-line tool.

use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::trace;

use super::{Result, TextRecognizer};
use crate::error::OcrError;

const TESSERACT_NOT_FOUND: &str = "tesseract not found (install tesseract-ocr)";

/// Tesseract OCR via its CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    language: String,
}

impl TesseractRecognizer {
    /// Create a recognizer for the given language code(s).
    pub fn new(language: &str) -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: language.to_string(),
        }
    }

    /// Use a specific binary path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let input = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout).to_string();
                trace!("tesseract recognized {} chars", text.len());
                Ok(text)
            }
            Ok(output) => Err(OcrError::Recognition(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::Unavailable(TESSERACT_NOT_FOUND.to_string()))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

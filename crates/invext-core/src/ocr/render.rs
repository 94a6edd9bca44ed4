//! Page rasterization with poppler's `pdftoppm`.

use std::path::Path;
use std::process::Command;

use image::DynamicImage;
use tempfile::TempDir;
use tracing::trace;

use super::{PageRenderer, Result};
use crate::error::OcrError;

const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not found (install poppler-utils)";

/// Renders pages by shelling out to `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: String,
}

impl PdftoppmRenderer {
    /// Create a renderer using `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: "pdftoppm".to_string(),
        }
    }

    /// Use a specific binary path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<DynamicImage> {
        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();

        let output = Command::new(&self.binary)
            .args(["-png", "-singlefile", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let image_path = output_prefix.with_extension("png");
                trace!("Rendered page {} to {}", page, image_path.display());
                Ok(image::open(&image_path)?)
            }
            Ok(output) => Err(OcrError::Render(format!(
                "pdftoppm failed on page {}: {}",
                page,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::Unavailable(PDFTOPPM_NOT_FOUND.to_string()))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let renderer = PdftoppmRenderer::new().with_binary("definitely-not-pdftoppm-binary");
        let result = renderer.render(Path::new("invoice.pdf"), 1, 300);
        assert!(matches!(result, Err(OcrError::Unavailable(_))));
    }
}

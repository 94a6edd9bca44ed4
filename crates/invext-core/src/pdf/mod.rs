//! PDF text-layer extraction with per-page fallback.

mod extractor;

pub use extractor::{LopdfLayer, PdfExtractLayer, PdfExtractor};

use tracing::{debug, trace};

use crate::error::PdfError;
use crate::models::document::{Document, Page};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A source of embedded page text.
pub trait TextLayer {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract text from a specific page (1-indexed).
    fn page_text(&self, page: u32) -> Result<String>;
}

/// Combines a primary and a secondary text layer.
///
/// For each page the primary is tried first; the secondary is consulted only
/// when the primary fails or returns blank text for that page. If both fail the
/// page is left empty.
pub struct PdfTextSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P: TextLayer, S: TextLayer> PdfTextSource<P, S> {
    /// Create a text source from two layers.
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    /// Extract every page of a `page_count`-page document.
    pub fn read(&self, page_count: u32) -> Document {
        let pages = (1..=page_count)
            .map(|number| Page::layer(number, self.read_page(number)))
            .collect::<Vec<_>>();

        debug!(
            "Extracted text layer for {} pages ({} blank)",
            pages.len(),
            pages.iter().filter(|p| p.is_blank()).count()
        );
        Document::new(pages)
    }

    fn read_page(&self, page: u32) -> String {
        match self.primary.page_text(page) {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => trace!("{} returned no text for page {}", self.primary.name(), page),
            Err(e) => debug!("{} failed on page {}: {}", self.primary.name(), page, e),
        }

        match self.secondary.page_text(page) {
            Ok(text) => text,
            Err(e) => {
                debug!("{} failed on page {}: {}", self.secondary.name(), page, e);
                String::new()
            }
        }
    }
}

impl<'a> PdfTextSource<PdfExtractLayer<'a>, LopdfLayer<'a>> {
    /// The default chain over a loaded PDF: pdf-extract, then lopdf.
    pub fn for_pdf(pdf: &'a PdfExtractor) -> Self {
        Self::new(pdf.pdf_extract_layer(), pdf.lopdf_layer())
    }
}

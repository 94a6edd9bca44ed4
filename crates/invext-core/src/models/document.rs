//! Page-ordered document text as produced by extraction and OCR.

use serde::{Deserialize, Serialize};

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Embedded text layer (pdf-extract or lopdf).
    #[default]
    Layer,
    /// Optical character recognition of the rendered page.
    Ocr,
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text, possibly empty.
    pub text: String,
    /// Source of the text.
    pub source: PageSource,
}

impl Page {
    /// Create a page with text from the text layer.
    pub fn layer(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            source: PageSource::Layer,
        }
    }

    /// Count of non-whitespace characters.
    pub fn content_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    /// Whether the page holds no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A PDF document as an ordered sequence of pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a document from pages in reading order.
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page holds visible text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(Page::is_blank)
    }

    /// Number of pages whose text came from OCR.
    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.source == PageSource::Ocr)
            .count()
    }

    /// Concatenate all pages, each preceded by its page-break marker.
    ///
    /// A blank document concatenates to the empty string.
    pub fn full_text(&self) -> String {
        if self.is_blank() {
            return String::new();
        }

        let mut text = String::new();
        for page in &self.pages {
            text.push_str(&page_marker(page.number));
            text.push_str(&page.text);
            text.push_str("\n\n");
        }
        text
    }
}

/// Marker line inserted before each page's text.
pub fn page_marker(number: u32) -> String {
    format!("===== Page {} =====\n", number)
}

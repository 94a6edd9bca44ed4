//! PDF loading and the two text-layer extractors (pdf-extract and lopdf).

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::OnceLock;

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{Result, TextLayer};
use crate::error::{InputError, PdfError};

/// A PDF that lopdf could open, plus the bytes handed to pdf-extract.
pub struct PdfExtractor {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Open a PDF file.
    pub fn open(path: &Path, try_empty_password: bool) -> std::result::Result<Self, InputError> {
        let data = std::fs::read(path).map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&data, try_empty_password)
    }

    /// Load a PDF from bytes.
    pub fn load(data: &[u8], try_empty_password: bool) -> std::result::Result<Self, InputError> {
        let mut doc = Document::load_mem(data).map_err(|e| InputError::Parse(e.to_string()))?;

        let raw_data = if doc.is_encrypted() {
            if !try_empty_password || doc.decrypt("").is_err() {
                return Err(InputError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| InputError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(InputError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self {
            document: doc,
            raw_data,
        })
    }

    /// Get the number of pages in the PDF.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Primary extractor over this PDF.
    pub fn pdf_extract_layer(&self) -> PdfExtractLayer<'_> {
        PdfExtractLayer::new(&self.raw_data)
    }

    /// Secondary extractor over this PDF.
    pub fn lopdf_layer(&self) -> LopdfLayer<'_> {
        LopdfLayer {
            document: &self.document,
        }
    }
}

/// Text layer backed by `pdf-extract`.
///
/// pdf-extract works on the whole document, so pages are decoded once on first
/// use and cached.
pub struct PdfExtractLayer<'a> {
    raw_data: &'a [u8],
    pages: OnceLock<Decoded>,
}

enum Decoded {
    Pages(Vec<String>),
    Failed(String),
    Panicked,
}

impl<'a> PdfExtractLayer<'a> {
    /// Create a layer over raw PDF bytes.
    pub fn new(raw_data: &'a [u8]) -> Self {
        Self {
            raw_data,
            pages: OnceLock::new(),
        }
    }

    fn pages(&self) -> &Decoded {
        self.pages.get_or_init(|| {
            // pdf-extract panics on some malformed fonts
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem_by_pages(self.raw_data)
            }));
            match outcome {
                Ok(Ok(pages)) => {
                    trace!("pdf-extract decoded {} pages", pages.len());
                    Decoded::Pages(pages)
                }
                Ok(Err(e)) => {
                    debug!("pdf-extract failed: {}", e);
                    Decoded::Failed(e.to_string())
                }
                Err(_) => {
                    warn!("pdf-extract panicked, falling back to lopdf for every page");
                    Decoded::Panicked
                }
            }
        })
    }
}

impl TextLayer for PdfExtractLayer<'_> {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn page_text(&self, page: u32) -> Result<String> {
        match self.pages() {
            Decoded::Pages(pages) => page
                .checked_sub(1)
                .and_then(|idx| pages.get(idx as usize))
                .cloned()
                .ok_or(PdfError::InvalidPage(page)),
            Decoded::Failed(e) => Err(PdfError::TextExtraction(e.clone())),
            Decoded::Panicked => Err(PdfError::Panicked("pdf-extract".to_string())),
        }
    }
}

/// Text layer backed by `lopdf`.
pub struct LopdfLayer<'a> {
    document: &'a Document,
}

impl TextLayer for LopdfLayer<'_> {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn page_text(&self, page: u32) -> Result<String> {
        if !self.document.get_pages().contains_key(&page) {
            return Err(PdfError::InvalidPage(page));
        }
        self.document
            .extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

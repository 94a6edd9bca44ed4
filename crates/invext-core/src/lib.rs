//! Core library for extracting invoice data from PDFs with hosted language models.
//!
//! This crate provides:
//! - PDF text-layer extraction with a per-page secondary extractor
//! - OCR fallback for scanned or near-empty pages
//! - Chunking of document text for the model's context budget
//! - DeepSeek, OpenAI and Mistral backends behind one interface
//! - Deduplication and XLSX/CSV/JSON export of invoice records

pub mod backend;
pub mod dedup;
pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod text;

pub use backend::{Backend, BackendKind, BackendSettings, CompletionBackend};
pub use dedup::{Deduplicated, ExtractionBatch, deduplicate};
pub use error::{BackendError, BackendErrorKind, InputError, InvextError, OcrError, Result};
pub use export::{ExportFormat, ExportMetadata, export_records};
pub use extract::{ModelClient, Prompt, RetryPolicy};
pub use models::config::InvextConfig;
pub use models::document::{Document, Page, PageSource};
pub use models::invoice::{InvoiceField, InvoiceRecord};
pub use ocr::{OcrFallback, OcrReport};
pub use pdf::{PdfExtractor, PdfTextSource, TextLayer};
pub use pipeline::{
    BatchOutcome, DocumentOutcome, DocumentRun, InvoicePipeline, NoProgress, ProgressSink, RunSummary,
};
pub use text::{TextChunk, chunk_document, chunk_text};

//! Per-document pipeline: read, OCR, normalize, chunk, extract, deduplicate.

use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{Backend, CompletionBackend};
use crate::dedup::{ExtractionBatch, deduplicate};
use crate::error::{BackendErrorKind, InvextError, Result};
use crate::extract::ModelClient;
use crate::models::config::InvextConfig;
use crate::models::document::Document;
use crate::models::invoice::InvoiceRecord;
use crate::ocr::{OcrFallback, OcrReport};
use crate::pdf::{PdfExtractor, PdfTextSource};
use crate::text::{chunk_document, normalize_document};

/// Receives progress updates while a document is processed.
pub trait ProgressSink: Send + Sync {
    /// A new stage started (e.g. "Reading invoices.pdf").
    fn stage(&self, _message: &str) {}

    /// Chunk extraction is about to start.
    fn chunks_started(&self, _total: usize) {}

    /// A chunk finished, successfully or not.
    fn chunk_finished(&self, _index: usize, _succeeded: bool) {}
}

/// Progress sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// A chunk whose extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    /// Document index within the run (0-indexed).
    pub document: usize,
    /// Chunk index (0-indexed).
    pub index: usize,
    /// Error kind.
    #[serde(serialize_with = "serialize_kind")]
    pub kind: BackendErrorKind,
    /// Error message.
    pub message: String,
}

fn serialize_kind<S: serde::Serializer>(
    kind: &BackendErrorKind,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Documents processed.
    pub documents: usize,
    /// Pages read.
    pub pages: usize,
    /// OCR fallback statistics.
    pub ocr: OcrReport,
    /// Chunks produced.
    pub chunks: usize,
    /// Chunks the backend answered successfully.
    pub chunks_succeeded: usize,
    /// Chunks that failed.
    pub failures: Vec<ChunkFailure>,
    /// Chunks not submitted after an authentication failure.
    pub chunks_skipped: usize,
    /// Records returned by the backend before deduplication.
    pub records_extracted: usize,
    /// Records dropped as duplicates.
    pub duplicates_removed: usize,
    /// Records kept.
    pub invoices: usize,
    /// The run stopped early because the API key was rejected.
    pub aborted_on_auth: bool,
}

impl RunSummary {
    pub fn chunks_failed(&self) -> usize {
        self.failures.len()
    }

    /// One line describing the outcome.
    pub fn headline(&self) -> String {
        if self.aborted_on_auth {
            format!(
                "Authentication failed; stopped with {} chunks skipped, {} invoices found",
                self.chunks_skipped, self.invoices
            )
        } else if self.chunks == 0 {
            "No text found; 0 invoices found".to_string()
        } else if self.chunks_succeeded == 0 {
            format!("{} chunks failed, 0 succeeded", self.chunks_failed())
        } else if self.chunks_failed() > 0 {
            format!(
                "{} invoices found ({} of {} chunks failed)",
                self.invoices,
                self.chunks_failed(),
                self.chunks
            )
        } else {
            format!("{} invoices found", self.invoices)
        }
    }

    /// Fold another document's summary into this one.
    fn absorb(&mut self, other: &RunSummary) {
        self.documents += other.documents;
        self.pages += other.pages;
        self.ocr.attempted += other.ocr.attempted;
        self.ocr.replaced += other.ocr.replaced;
        self.ocr.failed += other.ocr.failed;
        self.ocr.unavailable |= other.ocr.unavailable;
        self.chunks += other.chunks;
        self.chunks_succeeded += other.chunks_succeeded;
        self.failures.extend(other.failures.iter().cloned());
        self.chunks_skipped += other.chunks_skipped;
        self.records_extracted += other.records_extracted;
        self.aborted_on_auth |= other.aborted_on_auth;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline())?;
        if self.documents > 1 {
            writeln!(f, "  Documents: {}", self.documents)?;
        }
        writeln!(f, "  Pages: {} ({} via OCR)", self.pages, self.ocr.replaced)?;
        writeln!(
            f,
            "  Chunks: {} total, {} succeeded, {} failed, {} skipped",
            self.chunks,
            self.chunks_succeeded,
            self.chunks_failed(),
            self.chunks_skipped
        )?;
        for failure in &self.failures {
            if self.documents > 1 {
                write!(f, "    document {}, ", failure.document + 1)?;
            } else {
                write!(f, "    ")?;
            }
            writeln!(
                f,
                "chunk {}: {} ({})",
                failure.index + 1,
                failure.kind,
                failure.message
            )?;
        }
        write!(
            f,
            "  Records: {} extracted, {} duplicates removed, {} kept",
            self.records_extracted, self.duplicates_removed, self.invoices
        )
    }
}

/// Records and summary for one document before deduplication.
#[derive(Debug, Clone, Default)]
pub struct DocumentRun {
    pub batch: ExtractionBatch,
    pub summary: RunSummary,
}

/// Final result for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub source: PathBuf,
    pub records: Vec<InvoiceRecord>,
    pub summary: RunSummary,
}

/// An input that could not be opened during a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a multi-document run, deduplicated across documents.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub sources: Vec<PathBuf>,
    pub records: Vec<InvoiceRecord>,
    pub summary: RunSummary,
    pub skipped_inputs: Vec<SkippedInput>,
}

/// Invoice extraction pipeline over one backend.
pub struct InvoicePipeline<B> {
    client: ModelClient<B>,
    ocr: Option<OcrFallback>,
    try_empty_password: bool,
    max_chunk_chars: usize,
    concurrency: usize,
    abort_on_auth_failure: bool,
}

impl InvoicePipeline<Backend> {
    /// Build the configured backend and OCR engine.
    ///
    /// Fails when the backend's API key is missing. An OCR engine that cannot
    /// be set up only disables OCR.
    pub fn from_config(config: &InvextConfig) -> Result<Self> {
        let backend = Backend::from_config(&config.backend)?;
        let ocr = if config.ocr.enabled {
            match OcrFallback::from_config(&config.ocr) {
                Ok(ocr) => Some(ocr),
                Err(e) => {
                    warn!("OCR disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(ModelClient::new(backend, &config.backend), config).with_ocr(ocr))
    }
}

impl<B: CompletionBackend> InvoicePipeline<B> {
    /// Create a pipeline without OCR.
    pub fn new(client: ModelClient<B>, config: &InvextConfig) -> Self {
        Self {
            client,
            ocr: None,
            try_empty_password: config.pdf.try_empty_password,
            max_chunk_chars: config.max_chunk_chars(),
            concurrency: config.backend.concurrency.max(1),
            abort_on_auth_failure: config.backend.abort_on_auth_failure,
        }
    }

    pub fn with_ocr(mut self, ocr: Option<OcrFallback>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.client.backend().name()
    }

    /// Read page text from a PDF, running OCR on thin pages.
    pub fn read_pdf(&self, path: &Path) -> Result<(Document, OcrReport)> {
        let pdf = PdfExtractor::open(path, self.try_empty_password)?;
        let mut document = PdfTextSource::for_pdf(&pdf).read(pdf.page_count());

        let report = match &self.ocr {
            Some(ocr) => ocr.apply(&mut document, path),
            None => OcrReport::default(),
        };
        Ok((document, report))
    }

    /// Chunk a document and extract records from every chunk.
    pub async fn extract_document(
        &self,
        mut document: Document,
        ocr: OcrReport,
        document_index: usize,
        progress: &dyn ProgressSink,
    ) -> DocumentRun {
        normalize_document(&mut document);
        let chunks = chunk_document(&document, self.max_chunk_chars);

        let mut summary = RunSummary {
            documents: 1,
            pages: document.page_count(),
            ocr,
            chunks: chunks.len(),
            ..RunSummary::default()
        };
        let mut batch = ExtractionBatch::new();

        if chunks.is_empty() {
            info!("Document has no text; nothing to extract");
            return DocumentRun { batch, summary };
        }

        progress.chunks_started(chunks.len());
        let client = &self.client;
        let mut results = stream::iter(chunks.iter().map(|chunk| async move {
            (chunk.index, client.extract(chunk).await)
        }))
        .buffered(self.concurrency);

        let mut consumed = 0;
        while let Some((index, result)) = results.next().await {
            consumed += 1;
            match result {
                Ok(records) => {
                    summary.chunks_succeeded += 1;
                    summary.records_extracted += records.len();
                    batch.push_chunk(document_index, index, records);
                    progress.chunk_finished(index, true);
                }
                Err(e) => {
                    let kind = e.kind();
                    warn!("Chunk {} failed ({}): {}", index + 1, kind, e);
                    summary.failures.push(ChunkFailure {
                        document: document_index,
                        index,
                        kind,
                        message: e.to_string(),
                    });
                    progress.chunk_finished(index, false);

                    if kind == BackendErrorKind::Auth && self.abort_on_auth_failure {
                        warn!(
                            "{} rejected the API key; not submitting the remaining chunks",
                            self.backend_name()
                        );
                        summary.aborted_on_auth = true;
                        break;
                    }
                }
            }
        }
        summary.chunks_skipped = chunks.len() - consumed;

        debug!(
            "Extraction finished: {} succeeded, {} failed, {} skipped",
            summary.chunks_succeeded,
            summary.chunks_failed(),
            summary.chunks_skipped
        );
        DocumentRun { batch, summary }
    }

    /// Run the whole pipeline on one PDF.
    pub async fn run(&self, path: &Path, progress: &dyn ProgressSink) -> Result<DocumentOutcome> {
        progress.stage(&format!("Reading {}", path.display()));
        let (document, ocr) = self.read_pdf(path)?;
        info!(
            "Read {} pages from {} ({} via OCR)",
            document.page_count(),
            path.display(),
            document.ocr_page_count()
        );

        progress.stage(&format!("Extracting with {}", self.backend_name()));
        let run = self.extract_document(document, ocr, 0, progress).await;
        let (records, summary) = finish(run);

        Ok(DocumentOutcome {
            source: path.to_path_buf(),
            records,
            summary,
        })
    }

    /// Run several PDFs and deduplicate across all of them.
    ///
    /// With `continue_on_error`, inputs that cannot be opened are skipped;
    /// otherwise the first one aborts the batch. An authentication failure
    /// stops the batch.
    pub async fn run_batch(
        &self,
        paths: &[PathBuf],
        continue_on_error: bool,
        progress: &dyn ProgressSink,
    ) -> Result<BatchOutcome> {
        let mut combined = DocumentRun::default();
        let mut outcome = BatchOutcome::default();

        for (index, path) in paths.iter().enumerate() {
            progress.stage(&format!("[{}/{}] Reading {}", index + 1, paths.len(), path.display()));
            let (document, ocr) = match self.read_pdf(path) {
                Ok(read) => read,
                Err(InvextError::Input(e)) if continue_on_error => {
                    warn!("Skipping {}: {}", path.display(), e);
                    outcome.skipped_inputs.push(SkippedInput {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let run = self.extract_document(document, ocr, index, progress).await;
            combined.summary.absorb(&run.summary);
            combined.batch.append(run.batch);
            outcome.sources.push(path.clone());

            if run.summary.aborted_on_auth {
                break;
            }
        }

        let (records, summary) = finish(combined);
        outcome.records = records;
        outcome.summary = summary;
        Ok(outcome)
    }
}

/// Deduplicate a run and complete its summary.
fn finish(run: DocumentRun) -> (Vec<InvoiceRecord>, RunSummary) {
    let mut summary = run.summary;
    let deduplicated = deduplicate(run.batch);
    summary.duplicates_removed = deduplicated.removed;
    summary.invoices = deduplicated.records.len();
    (deduplicated.records, summary)
}

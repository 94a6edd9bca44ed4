//! End-to-end pipeline runs with fake text layers, OCR and backend.

mod common;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use image::DynamicImage;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use invext_core::error::{OcrError, PdfError};
use invext_core::ocr::{PageRenderer, TextRecognizer};
use invext_core::{
    BackendError, BackendErrorKind, CompletionBackend, Document, ExportFormat, ExportMetadata,
    InvextConfig, InvextError, InvoiceField, InvoicePipeline, ModelClient, NoProgress, OcrFallback, Page,
    PageSource, PdfTextSource, Prompt, RetryPolicy, TextLayer, export_records,
};

type Handler = fn(&str) -> Result<Value, BackendError>;

struct FakeBackend {
    handler: Handler,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn new(handler: Handler) -> Self {
        Self {
            handler,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CompletionBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn submit(&self, _prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push(text.to_string());
        (self.handler)(text)
    }
}

fn pipeline(handler: Handler, config: &InvextConfig) -> InvoicePipeline<FakeBackend> {
    let client = ModelClient::new(FakeBackend::new(handler), &config.backend).with_retry_policy(RetryPolicy {
        backoff: Duration::ZERO,
        max_retry_after: Duration::ZERO,
    });
    InvoicePipeline::new(client, config)
}

fn config_with_max_chars(max_chars: usize) -> InvextConfig {
    let mut config = InvextConfig::default();
    config.chunking.max_chars = Some(max_chars);
    config
}

/// Chunk limit that puts every page of `doc` in its own chunk.
fn one_page_per_chunk(doc: &Document) -> usize {
    let full = doc.full_text();
    full.find("===== Page 2").unwrap()
}

fn five_invoice_document() -> Document {
    Document::new(
        (1..=5)
            .map(|n| Page::layer(n, format!("Vendor Co{n} invoice INV-00{n} amount 100.00")))
            .collect(),
    )
}

fn invoice_in_chunk(text: &str) -> Result<Value, BackendError> {
    let n = (1..=5)
        .find(|n| text.contains(&format!("INV-00{n}")))
        .ok_or_else(|| BackendError::MalformedResponse("no invoice".to_string()))?;
    Ok(json!([{
        "Vendor Name": format!("Vendor Co{n}"),
        "Invoice Number": format!("INV-00{n}"),
        "Total Amount": "100.00",
    }]))
}

#[tokio::test]
async fn test_split_invoice_keeps_first_chunk_record() {
    let doc = Document::new(vec![
        Page::layer(1, "Acme Corp\nInvoice INV-001\nDue Date: 2024-02-01"),
        Page::layer(2, "INV-001 cont."),
    ]);
    let full = doc.full_text();
    let split = full.find("===== Page 2").unwrap();
    assert!(full.chars().count() - split <= split + 3);
    let config = config_with_max_chars(split + 3);

    let pipeline = pipeline(
        |text| {
            if text.contains("Due Date") {
                Ok(json!([{
                    "Vendor Name": "Acme Corp",
                    "Invoice Number": "INV-001",
                    "Due Date": "2024-02-01",
                    "Total Amount": "$1,200.00"
                }]))
            } else {
                Ok(json!([{ "Vendor Name": "ACME CORP ", "Invoice Number": "inv-001", "Due Date": "" }]))
            }
        },
        &config,
    );

    let run = pipeline.extract_document(doc, Default::default(), 0, &NoProgress).await;
    assert_eq!(run.summary.chunks, 2);
    assert_eq!(run.batch.len(), 2);

    let deduplicated = invext_core::deduplicate(run.batch);
    assert_eq!(deduplicated.removed, 1);
    assert_eq!(deduplicated.records.len(), 1);
    let kept = &deduplicated.records[0];
    assert_eq!(kept.vendor_name(), Some("Acme Corp"));
    assert_eq!(kept.get(InvoiceField::DueDate), Some("2024-02-01"));
}

#[tokio::test]
async fn test_malformed_chunk_does_not_stop_the_run() {
    let doc = five_invoice_document();
    let config = config_with_max_chars(one_page_per_chunk(&doc));
    let pipeline = pipeline(
        |text| {
            if text.contains("INV-003") {
                Ok(json!("I found an invoice but will not format it"))
            } else {
                invoice_in_chunk(text)
            }
        },
        &config,
    );

    let run = pipeline.extract_document(doc, Default::default(), 1, &NoProgress).await;

    assert_eq!(run.summary.chunks, 5);
    assert_eq!(run.summary.chunks_succeeded, 4);
    assert_eq!(run.summary.failures.len(), 1);
    assert_eq!(run.summary.failures[0].document, 1);
    assert_eq!(run.summary.failures[0].index, 2);
    assert_eq!(run.summary.failures[0].kind, BackendErrorKind::MalformedResponse);

    let deduplicated = invext_core::deduplicate(run.batch);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("invoices.csv");
    export_records(&deduplicated.records, &out, ExportFormat::Csv, &ExportMetadata::default()).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let numbers: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(1).unwrap().to_string())
        .collect();
    assert_eq!(numbers, vec!["INV-001", "INV-002", "INV-004", "INV-005"]);
}

#[tokio::test]
async fn test_auth_failure_stops_submitting() {
    let doc = five_invoice_document();
    let config = config_with_max_chars(one_page_per_chunk(&doc));
    let pipeline = pipeline(|_| Err(BackendError::Auth { status: 401 }), &config);

    let run = pipeline.extract_document(doc, Default::default(), 0, &NoProgress).await;

    assert!(run.summary.aborted_on_auth);
    assert_eq!(run.summary.failures.len(), 1);
    assert_eq!(run.summary.chunks_skipped, 4);
    assert!(run.batch.is_empty());
}

#[tokio::test]
async fn test_auth_failure_without_abort_tries_every_chunk() {
    let doc = five_invoice_document();
    let mut config = config_with_max_chars(one_page_per_chunk(&doc));
    config.backend.abort_on_auth_failure = false;
    let pipeline = pipeline(|_| Err(BackendError::Auth { status: 403 }), &config);

    let run = pipeline.extract_document(doc, Default::default(), 0, &NoProgress).await;

    assert!(!run.summary.aborted_on_auth);
    assert_eq!(run.summary.failures.len(), 5);
    assert_eq!(run.summary.headline(), "5 chunks failed, 0 succeeded");
}

#[tokio::test]
async fn test_concurrent_chunks_keep_chunk_order() {
    struct SlowFirstBackend;

    impl CompletionBackend for SlowFirstBackend {
        fn name(&self) -> &'static str {
            "slow-first"
        }

        async fn submit(&self, _prompt: &Prompt, text: &str) -> Result<Value, BackendError> {
            if text.contains("INV-001") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let due = if text.contains("INV-001") { "first" } else { "later" };
            Ok(json!([{ "Vendor Name": "Acme Corp", "Invoice Number": "X-1", "Due Date": due }]))
        }
    }

    let doc = five_invoice_document();
    let mut config = config_with_max_chars(one_page_per_chunk(&doc));
    config.backend.concurrency = 4;
    let pipeline = InvoicePipeline::new(ModelClient::new(SlowFirstBackend, &config.backend), &config);

    let run = pipeline.extract_document(doc, Default::default(), 0, &NoProgress).await;
    let chunk_order: Vec<usize> = run.batch.entries().iter().map(|e| e.chunk).collect();
    assert_eq!(chunk_order, vec![0, 1, 2, 3, 4]);

    let deduplicated = invext_core::deduplicate(run.batch);
    assert_eq!(deduplicated.records.len(), 1);
    assert_eq!(deduplicated.records[0].get(InvoiceField::DueDate), Some("first"));
}

#[tokio::test]
async fn test_blank_document_finds_nothing() {
    let config = InvextConfig::default();
    let pipeline = pipeline(invoice_in_chunk, &config);
    let doc = Document::new(vec![Page::layer(1, "  "), Page::layer(2, "")]);

    let run = pipeline.extract_document(doc, Default::default(), 0, &NoProgress).await;

    assert_eq!(run.summary.chunks, 0);
    assert_eq!(run.summary.headline(), "No text found; 0 invoices found");
}

fn acme_reply(text: &str) -> Result<Value, BackendError> {
    if !text.contains("INV-001") {
        return Ok(json!([]));
    }
    if text.contains("Payment Terms") {
        Ok(json!([{ "Vendor Name": "acme corp", "Invoice Number": "INV-001", "Payment Terms": "Net 30" }]))
    } else {
        Ok(json!([{
            "Vendor Name": "Acme Corp",
            "Invoice Number": "INV-001",
            "Invoice Date": "2024-01-15",
            "Total Amount": "1200.00"
        }]))
    }
}

#[tokio::test]
async fn test_two_page_pdf_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acme.pdf");
    std::fs::write(&path, common::pdf_bytes(common::two_page_invoice())).unwrap();

    let (mut doc, _) = pipeline(acme_reply, &InvextConfig::default()).read_pdf(&path).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(doc.pages[0].text.contains("INV-001"));
    assert!(doc.pages[1].text.contains("continued"));

    invext_core::text::normalize_document(&mut doc);
    let config = config_with_max_chars(one_page_per_chunk(&doc));
    let pipeline = pipeline(acme_reply, &config);

    let outcome = pipeline.run(&path, &NoProgress).await.unwrap();

    assert_eq!(outcome.source, path);
    assert_eq!(outcome.summary.pages, 2);
    assert_eq!(outcome.summary.chunks, 2);
    assert_eq!(outcome.summary.chunks_succeeded, 2);
    assert_eq!(outcome.summary.records_extracted, 2);
    assert_eq!(outcome.summary.duplicates_removed, 1);
    assert_eq!(outcome.summary.headline(), "1 invoices found");

    assert_eq!(outcome.records.len(), 1);
    let kept = &outcome.records[0];
    assert_eq!(kept.vendor_name(), Some("Acme Corp"));
    assert_eq!(kept.get(InvoiceField::TotalAmount), Some("1200.00"));
    assert_eq!(kept.get(InvoiceField::PaymentTerms), None);
}

#[tokio::test]
async fn test_corrupt_pdf_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"%PDF-1.7\nthis is not really a pdf").unwrap();

    let config = InvextConfig::default();
    let pipeline = pipeline(invoice_in_chunk, &config);

    let result = pipeline.run(&path, &NoProgress).await;

    assert!(matches!(result, Err(InvextError::Input(_))));
}

#[tokio::test]
async fn test_batch_skips_unreadable_inputs_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.pdf");
    std::fs::write(&broken, b"garbage").unwrap();
    let missing = dir.path().join("missing.pdf");

    let config = InvextConfig::default();
    let pipeline = pipeline(invoice_in_chunk, &config);
    let paths = vec![broken.clone(), missing];

    let outcome = pipeline.run_batch(&paths, true, &NoProgress).await.unwrap();
    assert_eq!(outcome.skipped_inputs.len(), 2);
    assert!(outcome.records.is_empty());

    let result = pipeline.run_batch(&paths, false, &NoProgress).await;
    assert!(matches!(result, Err(InvextError::Input(_))));
}

struct EmptyLayer;

impl TextLayer for EmptyLayer {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn page_text(&self, _page: u32) -> Result<String, PdfError> {
        Ok(String::new())
    }
}

struct BlankRenderer;

impl PageRenderer for BlankRenderer {
    fn render(&self, _pdf_path: &Path, _page: u32, _dpi: u32) -> Result<DynamicImage, OcrError> {
        Ok(DynamicImage::new_luma8(10, 10))
    }
}

struct CannedRecognizer;

impl TextRecognizer for CannedRecognizer {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Ok("Vendor Co1 invoice INV-001 amount 100.00".to_string())
    }
}

#[tokio::test]
async fn test_scanned_document_goes_through_ocr() {
    let mut doc = PdfTextSource::new(EmptyLayer, EmptyLayer).read(2);
    assert!(doc.is_blank());

    let ocr = OcrFallback::new(Box::new(BlankRenderer), Box::new(CannedRecognizer));
    let report = ocr.apply(&mut doc, Path::new("scan.pdf"));
    assert_eq!(report.replaced, 2);
    assert!(doc.pages.iter().all(|p| p.source == PageSource::Ocr));

    let config = InvextConfig::default();
    let pipeline = pipeline(invoice_in_chunk, &config);
    let run = pipeline.extract_document(doc, report, 0, &NoProgress).await;

    assert_eq!(run.summary.ocr.replaced, 2);
    assert_eq!(run.summary.chunks_succeeded, 1);
    let deduplicated = invext_core::deduplicate(run.batch);
    assert_eq!(deduplicated.records.len(), 1);
}

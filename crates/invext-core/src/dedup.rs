//! Record accumulation and duplicate removal.

use std::collections::HashSet;

use tracing::debug;

use crate::models::invoice::InvoiceRecord;

/// A record together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Document index within a batch run (0 for single-document runs).
    pub document: usize,
    /// Chunk index within the document.
    pub chunk: usize,
    pub record: InvoiceRecord,
}

/// Records accumulated across chunks, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionBatch {
    entries: Vec<BatchEntry>,
}

impl ExtractionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records of one chunk.
    pub fn push_chunk(&mut self, document: usize, chunk: usize, records: Vec<InvoiceRecord>) {
        self.entries.extend(records.into_iter().map(|record| BatchEntry {
            document,
            chunk,
            record,
        }));
    }

    /// Append every entry of another batch.
    pub fn append(&mut self, other: ExtractionBatch) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }
}

/// Result of deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduplicated {
    /// Surviving records in first-seen order.
    pub records: Vec<InvoiceRecord>,
    /// Number of records dropped as duplicates.
    pub removed: usize,
}

/// Keep the first record for every (vendor, invoice number) identity.
///
/// Entries are ordered by document then chunk index first (stable, so
/// within-chunk order is kept), which makes the survivor the one from the
/// earliest chunk regardless of the order chunks completed in. Records with
/// no identity key are always kept.
pub fn deduplicate(batch: ExtractionBatch) -> Deduplicated {
    let mut entries = batch.entries;
    entries.sort_by_key(|entry| (entry.document, entry.chunk));

    let total = entries.len();
    let mut seen = HashSet::new();
    let records: Vec<InvoiceRecord> = entries
        .into_iter()
        .filter(|entry| match entry.record.identity_key() {
            Some(key) => seen.insert(key),
            None => true,
        })
        .map(|entry| entry.record)
        .collect();

    let removed = total - records.len();
    debug!("Deduplicated {} records, removed {}", total, removed);
    Deduplicated { records, removed }
}

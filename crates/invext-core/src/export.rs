//! Writing deduplicated records to XLSX, CSV or JSON.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use rust_xlsxwriter::{Color, Format, Workbook};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::ExportError;
use crate::models::invoice::{InvoiceField, InvoiceRecord};

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

const DEFAULT_STEM: &str = "extracted_invoice_data";

const SHEET_NAME: &str = "Invoices";

/// Widest auto-fitted column, in characters.
const MAX_COLUMN_WIDTH: usize = 50;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Excel workbook with a styled header row.
    #[default]
    Xlsx,
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed JSON with run metadata.
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// `extracted_invoice_data.<ext>` in the working directory.
    pub fn default_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", DEFAULT_STEM, self.extension()))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!(
                "unknown export format: {} (expected xlsx, csv or json)",
                other
            )),
        }
    }
}

/// Run details recorded in JSON exports.
#[derive(Debug, Clone, Default)]
pub struct ExportMetadata {
    /// Backend identifier.
    pub backend: String,
    /// Input PDF paths.
    pub sources: Vec<PathBuf>,
}

/// Write `records` to `path`, replacing any existing file.
///
/// The file is written next to `path` and renamed into place, so a failure
/// never leaves a partial file behind.
pub fn export_records(
    records: &[InvoiceRecord],
    path: &Path,
    format: ExportFormat,
    metadata: &ExportMetadata,
) -> Result<()> {
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;

    match format {
        ExportFormat::Xlsx => {
            let workbook = xlsx_workbook(records)?;
            file.as_file_mut().write_all(&workbook).map_err(write_err)?;
        }
        ExportFormat::Csv => write_csv(records, file.as_file_mut())?,
        ExportFormat::Json => write_json(records, metadata, file.as_file_mut())?,
    }
    file.as_file_mut().flush().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

fn write_csv<W: Write>(records: &[InvoiceRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(InvoiceField::ALL.iter().map(|f| f.label()))?;
    for record in records {
        csv.write_record(record.row())?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Build the workbook: bold grey header, one row per record, fitted columns.
fn xlsx_workbook(records: &[InvoiceRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD3D3D3));

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, field) in InvoiceField::ALL.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, field.label(), &header)?;
    }
    for (row, record) in records.iter().enumerate() {
        for (col, value) in record.row().into_iter().enumerate() {
            // Absent fields stay blank cells.
            if !value.is_empty() {
                sheet.write_string(row as u32 + 1, col as u16, value)?;
            }
        }
    }
    for (col, width) in column_widths(records).into_iter().enumerate() {
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Longest cell in each column plus two, capped at [`MAX_COLUMN_WIDTH`].
fn column_widths(records: &[InvoiceRecord]) -> Vec<usize> {
    InvoiceField::ALL
        .iter()
        .map(|field| {
            let longest = records
                .iter()
                .filter_map(|record| record.get(*field))
                .map(|value| value.chars().count())
                .chain(std::iter::once(field.label().chars().count()))
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

fn write_json<W: Write>(records: &[InvoiceRecord], metadata: &ExportMetadata, writer: W) -> Result<()> {
    let sources: Vec<String> = metadata
        .sources
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let document = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "backend": metadata.backend,
        "source": sources,
        "invoices": records,
    });
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

//! Subcommands and the pieces they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use invext_core::{BackendKind, ExportFormat, InvextConfig, InvoiceRecord, ProgressSink, RunSummary};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invext")
        .join("config.json")
}

/// Load the config from `--config`, else the default file if present, else defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<InvextConfig> {
    if let Some(path) = explicit {
        return InvextConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let path = default_config_path();
    if path.exists() {
        Ok(InvextConfig::from_file(&path)?)
    } else {
        Ok(InvextConfig::default())
    }
}

/// Options shared by `extract` and `batch` that override the config file.
#[derive(Args, Debug, Default)]
pub struct RunOptions {
    /// Output file (default: extracted_invoice_data.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: xlsx, csv or json
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// Extraction backend: deepseek, openai or mistral
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Model name (default depends on the backend)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Skip OCR and use only the PDF text layer
    #[arg(long)]
    pub no_ocr: bool,

    /// Number of chunk requests in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Do not print extracted records
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunOptions {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut InvextConfig) {
        if let Some(output) = &self.output {
            config.export.output = Some(output.clone());
        }
        if let Some(format) = self.format {
            config.export.format = format;
        }
        if let Some(kind) = self.backend {
            config.backend.kind = kind;
        }
        if let Some(model) = &self.model {
            config.backend.model = Some(model.clone());
        }
        if let Some(max_chars) = self.max_chars {
            config.chunking.max_chars = Some(max_chars.max(1));
        }
        if self.no_ocr {
            config.ocr.enabled = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.backend.concurrency = concurrency.max(1);
        }
    }
}

/// Progress bar over chunks.
pub struct ChunkProgress {
    bar: ProgressBar,
}

impl ChunkProgress {
    pub fn new(hidden: bool) -> anyhow::Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ChunkProgress {
    fn stage(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn chunks_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn chunk_finished(&self, _index: usize, succeeded: bool) {
        if !succeeded {
            self.bar.set_message("chunk failed, continuing");
        }
        self.bar.inc(1);
    }
}

/// Print every record as a labeled block.
pub fn print_records(records: &[InvoiceRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!("{}", style(format!("Invoice {}:", i + 1)).bold());
        print!("{}", record.format_block());
        println!();
    }
}

/// Print the run summary with a status marker.
pub fn print_summary(summary: &RunSummary) {
    let marker = if summary.aborted_on_auth || (summary.chunks > 0 && summary.chunks_succeeded == 0) {
        style("✗").red()
    } else if summary.chunks_failed() > 0 || summary.invoices == 0 {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    println!("{} {}", marker, summary);

    if summary.aborted_on_auth {
        eprintln!(
            "{} The API key was rejected. Check the key for the selected backend.",
            style("Warning:").yellow().bold()
        );
    }
}

//! Batch command - extract invoices from many PDFs into one file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invext_core::{ExportMetadata, InvoicePipeline, export_records};

use super::{ChunkProgress, RunOptions, load_config, print_records, print_summary};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern (e.g., "invoices/*.pdf")
    #[arg(required = true)]
    pattern: String,

    /// Skip inputs that cannot be opened instead of stopping
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    options: RunOptions,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.options.apply(&mut config);

    let mut files: Vec<PathBuf> = glob::glob(&args.pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No files matched pattern: {}", args.pattern);
    }
    info!("Found {} files to process", files.len());

    let pipeline = InvoicePipeline::from_config(&config)?;

    let progress = ChunkProgress::new(args.options.quiet)?;
    let outcome = pipeline
        .run_batch(&files, args.continue_on_error, &progress)
        .await;
    progress.finish();
    let outcome = outcome?;

    if !args.options.quiet {
        print_records(&outcome.records);
    }
    print_summary(&outcome.summary);

    for skipped in &outcome.skipped_inputs {
        eprintln!(
            "{} {}: {}",
            style("✗").red(),
            skipped.path.display(),
            skipped.reason
        );
    }

    let output_path = config.export.output_path();
    let metadata = ExportMetadata {
        backend: pipeline.backend_name().to_string(),
        sources: outcome.sources.clone(),
    };
    export_records(&outcome.records, &output_path, config.export.format, &metadata)?;

    println!(
        "{} Processed {} of {} files, output written to {}",
        style("✓").green(),
        outcome.sources.len(),
        files.len(),
        output_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

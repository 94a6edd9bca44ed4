//! Extract command - pull invoices out of a single PDF.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invext_core::{ExportMetadata, InvoicePipeline, export_records};

use super::{ChunkProgress, RunOptions, load_config, print_records, print_summary};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    #[command(flatten)]
    options: RunOptions,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.options.apply(&mut config);

    // Fails on a missing API key before the PDF is touched
    let pipeline = InvoicePipeline::from_config(&config)?;
    info!("Using {} backend", pipeline.backend_name());

    let progress = ChunkProgress::new(args.options.quiet)?;
    let outcome = pipeline.run(&args.input, &progress).await;
    progress.finish();
    let outcome = outcome?;

    if !args.options.quiet {
        print_records(&outcome.records);
    }
    print_summary(&outcome.summary);

    let output_path = config.export.output_path();
    let metadata = ExportMetadata {
        backend: pipeline.backend_name().to_string(),
        sources: vec![outcome.source.clone()],
    };
    export_records(&outcome.records, &output_path, config.export.format, &metadata)?;

    println!(
        "{} Output written to {}",
        style("✓").green(),
        output_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

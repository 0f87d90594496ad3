//! Batch processing command for multiple vendor documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use poex_core::ExtractionResult;

use super::process::{format_order, OutputFormat};
use super::{build_extractor, load_config};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Vendor registry file (default: built-in vendors)
    #[arg(long)]
    vendor_registry: Option<PathBuf>,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    outcome: Result<ExtractionResult, String>,
    processing_time_ms: u64,
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let extractor = Arc::new(build_extractor(config, args.vendor_registry.as_deref())?);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Each task opens its own document; only the extractor is shared.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for (index, path) in files.iter().cloned().enumerate() {
        let extractor = Arc::clone(&extractor);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let file_start = Instant::now();
            let target = path.clone();
            let outcome = tokio::task::spawn_blocking(move || extractor.extract(&target))
                .await?
                .map_err(|e| e.to_string());
            let processing_time_ms = file_start.elapsed().as_millis() as u64;
            anyhow::Ok((
                index,
                FileResult {
                    path,
                    outcome,
                    processing_time_ms,
                },
            ))
        });
    }

    let mut slots: Vec<Option<FileResult>> = files.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined??;

        if let Err(message) = &result.outcome {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), message);
            } else {
                error!("Failed to process {}: {}", result.path.display(), message);
                tasks.abort_all();
                overall_pb.abandon();
                anyhow::bail!("Processing failed: {}", message);
            }
        }

        overall_pb.inc(1);
        slots[index] = Some(result);
    }

    overall_pb.finish_with_message("Complete");

    // Input order, regardless of completion order.
    let results: Vec<FileResult> = slots.into_iter().flatten().collect();
    let successful: Vec<_> = results.iter().filter(|r| r.outcome.is_ok()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.outcome.is_err()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Ok(extraction) = &result.outcome {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("order");
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_order(&extraction.order, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Err(message) = &result.outcome {
                println!("  - {}: {}", result.path.display(), message);
            }
        }
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "vendor_id",
        "po_number",
        "order_date",
        "vendor_name",
        "customer_name",
        "total",
        "line_items",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = result.processing_time_ms.to_string();

        match &result.outcome {
            Ok(extraction) => {
                let order = &extraction.order;
                wtr.write_record([
                    filename,
                    "success",
                    extraction.vendor_id.as_str(),
                    order.po_number.as_str(),
                    order.order_date.as_str(),
                    order.vendor_name.as_str(),
                    order.customer_name.as_str(),
                    order.total.to_string().as_str(),
                    order.line_items.len().to_string().as_str(),
                    extraction.warnings.len().to_string().as_str(),
                    time.as_str(),
                    "",
                ])?;
            }
            Err(message) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    time.as_str(),
                    message.as_str(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

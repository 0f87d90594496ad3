//! Process command - extract a purchase order from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use poex_core::{ExtractionResult, PurchaseOrder};

use super::{build_extractor, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, xlsx, xls, ods or csv)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Vendor registry file (default: built-in vendors)
    #[arg(long)]
    vendor_registry: Option<PathBuf>,

    /// Print recovered extraction warnings
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extractor = build_extractor(config, args.vendor_registry.as_deref())?;
    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message("Extracting...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let input = args.input.clone();
    let result = tokio::task::spawn_blocking(move || extractor.extract(&input)).await?;
    pb.finish_and_clear();
    let result = result?;

    if args.show_warnings {
        print_warnings(&result);
    }

    let output = format_order(&result.order, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_warnings(result: &ExtractionResult) {
    if result.warnings.is_empty() {
        return;
    }
    eprintln!("{}", style("Extraction warnings:").yellow());
    for warning in &result.warnings {
        eprintln!("  - {}", warning);
    }
}

/// Render an order in the requested format.
pub fn format_order(order: &PurchaseOrder, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(order)?),
        OutputFormat::Csv => format_order_csv(order),
        OutputFormat::Text => Ok(format_order_text(order)),
    }
}

fn format_order_csv(order: &PurchaseOrder) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "po_number",
        "order_date",
        "vendor_name",
        "customer_name",
        "item_number",
        "description",
        "quantity",
        "unit_price",
        "line_total",
    ])?;

    for item in &order.line_items {
        wtr.write_record([
            order.po_number.as_str(),
            order.order_date.as_str(),
            order.vendor_name.as_str(),
            order.customer_name.as_str(),
            item.item_number.as_str(),
            item.description.as_str(),
            item.quantity.to_string().as_str(),
            item.unit_price.to_string().as_str(),
            item.line_total.to_string().as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_order_text(order: &PurchaseOrder) -> String {
    let mut output = String::new();

    output.push_str(&format!("PO number: {}\n", order.po_number));
    output.push_str(&format!("Date: {}\n", order.order_date));
    output.push_str(&format!("Customer: {}\n", order.customer_name));
    output.push('\n');

    output.push_str(&format!("Vendor ({}):\n", order.vendor_id));
    output.push_str(&format!("  {}\n", order.vendor_name));
    for line in order.vendor_address.lines() {
        output.push_str(&format!("  {}\n", line));
    }
    output.push_str(&format!("  {}\n", order.vendor_phone));
    output.push('\n');

    output.push_str(&format!("Line items ({}):\n", order.line_items.len()));
    for item in &order.line_items {
        output.push_str(&format!(
            "  {:<16} {:<40} {:>8} x {:>10} = {:>10}\n",
            item.item_number, item.description, item.quantity, item.unit_price, item.line_total
        ));
    }
    output.push('\n');

    output.push_str(&format!("Total: {}\n", order.total));
    let sum = order.line_total_sum();
    if !order.line_items.is_empty() && sum != order.total {
        output.push_str(&format!("Line total sum: {}\n", sum));
    }

    output
}

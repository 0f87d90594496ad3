//! Vendors command - inspect and edit the vendor registry.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use console::style;

use poex_core::document::{Document, TextBackend};
use poex_core::models::vendor::parse_columns;
use poex_core::models::{DocumentKind, Flavor, HeaderAliases, LayoutConfig, Rect, VendorInfo};
use poex_core::{identify_vendor, VendorConfig, VendorRegistry};

use super::{default_registry_path, load_config, load_registry, registry_path};

/// Arguments for the vendors command.
#[derive(Args)]
pub struct VendorsArgs {
    /// Vendor registry file (default: configured registry, else built-in)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: VendorsCommand,
}

#[derive(Subcommand)]
enum VendorsCommand {
    /// List vendors in identification order
    List,

    /// Show one vendor's configuration
    Show {
        /// Vendor id
        id: String,
    },

    /// Add or replace a vendor
    Add(AddArgs),

    /// Remove a vendor
    Remove {
        /// Vendor id
        id: String,
    },

    /// Show which vendor a document is identified as
    Identify {
        /// Document to identify
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Pdf,
    Spreadsheet,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FlavorArg {
    Auto,
    Stream,
}

#[derive(Args)]
struct AddArgs {
    /// Vendor id
    id: String,

    /// Read the vendor configuration from a JSON file
    #[arg(long, conflicts_with_all = ["pattern", "name"])]
    from_json: Option<PathBuf>,

    /// Identification pattern (repeatable)
    #[arg(short, long)]
    pattern: Vec<String>,

    /// Vendor display name
    #[arg(long)]
    name: Option<String>,

    /// Document kind
    #[arg(long, value_enum, default_value = "pdf")]
    kind: KindArg,

    /// Table area "x0,y0,x1,y1" (repeatable)
    #[arg(long)]
    area: Vec<String>,

    /// Column boundaries "x1,x2,..."
    #[arg(long)]
    columns: Option<String>,

    /// Table strategy
    #[arg(long, value_enum, default_value = "auto")]
    flavor: FlavorArg,

    /// Leading spreadsheet rows to skip
    #[arg(long, default_value = "0")]
    skip_rows: usize,

    /// Header alias as field=text, e.g. unit_price="Unit Price" (repeatable)
    #[arg(long)]
    header: Vec<String>,
}

pub async fn run(args: VendorsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let explicit = args.registry.as_deref();

    match args.command {
        VendorsCommand::List => list_vendors(&load_registry(&config, explicit)?),
        VendorsCommand::Show { id } => show_vendor(&load_registry(&config, explicit)?, &id),
        VendorsCommand::Identify { input } => {
            identify(&load_registry(&config, explicit)?, &config.layout, &input)
        }
        VendorsCommand::Add(add_args) => {
            let path = registry_path(&config, explicit).unwrap_or_else(default_registry_path);
            add_vendor(&path, add_args)
        }
        VendorsCommand::Remove { id } => {
            let path = registry_path(&config, explicit).unwrap_or_else(default_registry_path);
            remove_vendor(&path, &id)
        }
    }
}

fn list_vendors(registry: &VendorRegistry) -> anyhow::Result<()> {
    println!(
        "{:<16} {:<12} {:<8} {}",
        style("ID").bold(),
        style("KIND").bold(),
        style("FLAVOR").bold(),
        style("PATTERNS").bold()
    );

    for vendor in registry.iter() {
        println!(
            "{:<16} {:<12} {:<8} {}",
            vendor.id,
            format!("{:?}", vendor.kind).to_lowercase(),
            format!("{:?}", vendor.flavor).to_lowercase(),
            vendor.patterns.join(", ")
        );
    }

    println!();
    println!(
        "{} {} vendors; unmatched documents use '{}'",
        style("ℹ").blue(),
        registry.len(),
        registry.unknown().id
    );

    Ok(())
}

fn show_vendor(registry: &VendorRegistry, id: &str) -> anyhow::Result<()> {
    let vendor = registry
        .get(&id.to_lowercase())
        .ok_or_else(|| anyhow::anyhow!("Vendor '{}' not found in registry", id))?;
    println!("{}", serde_json::to_string_pretty(vendor)?);
    Ok(())
}

fn identify(registry: &VendorRegistry, layout: &LayoutConfig, input: &Path) -> anyhow::Result<()> {
    let document = Document::open(input, layout)?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let vendor = identify_vendor(registry, document.full_text(), &filename);
    if vendor.is_unknown() {
        println!(
            "{} No vendor matched, using '{}'",
            style("ℹ").yellow(),
            vendor.id
        );
    } else {
        println!("{}", vendor.id);
    }
    Ok(())
}

/// Load the registry file for editing, seeding it from the built-in
/// vendors when it does not exist yet.
fn open_for_edit(path: &Path) -> anyhow::Result<VendorRegistry> {
    if path.exists() {
        Ok(VendorRegistry::from_file(path)?)
    } else {
        Ok(VendorRegistry::builtin().clone())
    }
}

fn save_registry(registry: &VendorRegistry, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    registry.save(path)?;
    Ok(())
}

fn parse_headers(pairs: &[String]) -> anyhow::Result<HeaderAliases> {
    let mut headers = HeaderAliases::generic();
    for pair in pairs {
        let (field, alias) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Header alias must be field=text, got: {}", pair))?;
        let alias = alias.trim().to_string();
        match field.trim() {
            "item_number" => headers.item_number = alias,
            "description" => headers.description = alias,
            "quantity" => headers.quantity = alias,
            "unit_price" => headers.unit_price = alias,
            "line_total" => headers.line_total = alias,
            "quantity_price" => headers.quantity_price = (!alias.is_empty()).then_some(alias),
            other => anyhow::bail!("Unknown header field: {}", other),
        }
    }
    Ok(headers)
}

fn vendor_from_args(args: &AddArgs) -> anyhow::Result<VendorConfig> {
    if let Some(path) = &args.from_json {
        let content = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&content)?);
    }

    let table_areas = args
        .area
        .iter()
        .map(|a| a.parse::<Rect>())
        .collect::<Result<Vec<_>, _>>()?;
    let columns = args.columns.as_deref().map(parse_columns).transpose()?;

    Ok(VendorConfig {
        id: args.id.clone(),
        patterns: args.pattern.clone(),
        vendor_info: VendorInfo {
            name: args.name.clone().unwrap_or_default(),
            ..VendorInfo::default()
        },
        headers: parse_headers(&args.header)?,
        kind: match args.kind {
            KindArg::Pdf => DocumentKind::Pdf,
            KindArg::Spreadsheet => DocumentKind::Spreadsheet,
        },
        skip_rows: args.skip_rows,
        table_areas,
        columns,
        flavor: match args.flavor {
            FlavorArg::Auto => Flavor::Auto,
            FlavorArg::Stream => Flavor::Stream,
        },
    })
}

fn add_vendor(path: &Path, args: AddArgs) -> anyhow::Result<()> {
    let mut registry = open_for_edit(path)?;
    let vendor = vendor_from_args(&args)?;
    let replaced = registry.get(&args.id.trim().to_lowercase()).is_some();

    registry.add(args.id.as_str(), vendor)?;
    save_registry(&registry, path)?;

    println!(
        "{} {} vendor '{}' in {}",
        style("✓").green(),
        if replaced { "Replaced" } else { "Added" },
        args.id,
        path.display()
    );
    Ok(())
}

fn remove_vendor(path: &Path, id: &str) -> anyhow::Result<()> {
    let mut registry = open_for_edit(path)?;
    if registry.remove(&id.to_lowercase()).is_none() {
        anyhow::bail!("Vendor '{}' not found in {}", id, path.display());
    }
    save_registry(&registry, path)?;

    println!(
        "{} Removed vendor '{}' from {}",
        style("✓").green(),
        id,
        path.display()
    );
    Ok(())
}

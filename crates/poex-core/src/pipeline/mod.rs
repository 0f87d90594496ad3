//! Purchase order extraction pipeline.
//!
//! Stages run in order: vendor identification, table extraction, header
//! location, column normalization, line item building and metadata
//! extraction. [`Extractor`] assembles their outputs into a
//! [`PurchaseOrder`].

pub mod columns;
pub mod header;
pub mod identify;
pub mod items;
pub mod metadata;
pub mod patterns;
pub mod tables;

pub use identify::identify_vendor;
pub use metadata::{extract_metadata, Metadata, MetadataContext};

use std::path::Path;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::{Document, TextBackend};
use crate::error::{DocumentError, ExtractionError, Result};
use crate::models::{LineItem, PoexConfig, PurchaseOrder, VendorConfig, VendorProfile, VendorRegistry};
use columns::normalize;
use header::{first_with_header, LocatedTable};
use items::build_line_items;
use tables::{extract_area_tables, read_sheet_table};

/// Result of extracting one document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Assembled purchase order.
    pub order: PurchaseOrder,
    /// Registry id of the vendor configuration that was applied.
    pub vendor_id: String,
    /// Recovered problems: missing fields, missing table.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Runs the extraction pipeline against a vendor registry.
///
/// Holds only read-only state, so one extractor can be shared across
/// threads; every call opens its own document.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    registry: Option<VendorRegistry>,
    config: PoexConfig,
}

impl Extractor {
    /// Extractor using the built-in registry and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration, loading the external registry if one is
    /// configured.
    pub fn from_config(config: PoexConfig) -> Result<Self> {
        let registry = match &config.registry.path {
            Some(path) => {
                debug!("Loading vendor registry from {}", path.display());
                Some(VendorRegistry::from_file(path)?)
            }
            None => None,
        };
        Ok(Self { registry, config })
    }

    /// Use a specific vendor registry.
    pub fn with_registry(mut self, registry: VendorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a specific configuration. The registry path in `config` is not
    /// read; see [`Extractor::from_config`].
    pub fn with_config(mut self, config: PoexConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry used for identification.
    pub fn registry(&self) -> &VendorRegistry {
        self.registry.as_ref().unwrap_or_else(|| VendorRegistry::builtin())
    }

    pub fn config(&self) -> &PoexConfig {
        &self.config
    }

    /// Open and extract a document. Fails only when the document cannot be
    /// opened or parsed.
    pub fn extract(&self, path: &Path) -> std::result::Result<ExtractionResult, DocumentError> {
        let start = Instant::now();
        let document = Document::open(path, &self.config.layout)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut result = self.extract_document(&document, &filename);
        result.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Extracted {} line items from {} (vendor '{}', {} warnings) in {}ms",
            result.order.line_items.len(),
            path.display(),
            result.vendor_id,
            result.warnings.len(),
            result.processing_time_ms
        );
        Ok(result)
    }

    /// Extract from an already opened document. Never fails; shortfalls end
    /// up as sentinels and warnings.
    pub fn extract_document(&self, document: &Document, filename: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let vendor = identify_vendor(self.registry(), document.full_text(), filename);
        if vendor.is_unknown() {
            warnings.push("No vendor pattern matched, using fallback configuration".to_string());
        }

        let line_items = match self.line_items(document, vendor) {
            Ok(items) => items,
            Err(e) => {
                warn!("{}: {}", filename, e);
                warnings.push(format!("No line items: {}", e));
                Vec::new()
            }
        };

        let ctx = MetadataContext::new(
            document.full_text(),
            document.blocks(),
            vendor,
            &self.config.extraction,
        );
        let metadata = extract_metadata(&ctx);
        let order = self.assemble(vendor, metadata, line_items, &mut warnings);

        ExtractionResult {
            vendor_id: order.vendor_id.clone(),
            order,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn line_items(
        &self,
        document: &Document,
        vendor: &VendorConfig,
    ) -> std::result::Result<Vec<LineItem>, ExtractionError> {
        let hints = vendor.extraction_hints();
        if hints.kind != document.kind() {
            debug!(
                "Vendor '{}' is configured for {:?}, document is {:?}",
                vendor.id(),
                hints.kind,
                document.kind()
            );
        }

        let located = match document {
            Document::Pdf(pdf) => first_with_header(extract_area_tables(pdf, &hints)?)?,
            Document::Sheet(sheet) => {
                let table = read_sheet_table(sheet, &hints)?;
                LocatedTable::from_first_row(table).ok_or(ExtractionError::NoHeader { tables: 1 })?
            }
        };

        let rows = normalize(&located, vendor.header_aliases());
        Ok(build_line_items(&rows))
    }

    fn assemble(
        &self,
        vendor: &VendorConfig,
        metadata: Metadata,
        line_items: Vec<LineItem>,
        warnings: &mut Vec<String>,
    ) -> PurchaseOrder {
        let not_found = &self.config.extraction.not_found;
        let mut text_field = |name: &str, value: Option<String>| {
            value.unwrap_or_else(|| {
                warnings.push(format!("Could not extract {}", name));
                not_found.clone()
            })
        };

        let po_number = text_field("po_number", metadata.po_number);
        let order_date = text_field("order_date", metadata.order_date);
        let vendor_name = text_field("vendor_name", metadata.vendor_name);
        let vendor_address = text_field("vendor_address", metadata.vendor_address);
        let vendor_phone = text_field("vendor_phone", metadata.vendor_phone);
        let customer_name = text_field("customer_name", metadata.customer_name);

        let total = metadata.total.unwrap_or_else(|| {
            warnings.push("Could not extract total".to_string());
            Decimal::ZERO
        });

        PurchaseOrder {
            vendor_id: vendor.id().to_string(),
            po_number,
            order_date,
            vendor_name,
            vendor_address,
            vendor_phone,
            customer_name,
            total,
            line_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SheetDocument;
    use crate::models::{PoexConfig, NOT_FOUND, UNKNOWN_VENDOR};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sheet(rows: &[&[&str]]) -> Document {
        Document::Sheet(SheetDocument::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        ))
    }

    fn registry() -> VendorRegistry {
        VendorRegistry::from_json(
            r#"{"vendors": {
                "acme": {
                    "patterns": ["Acme Supply"],
                    "vendor_info": {"name": "Acme Supply Co", "phone": "800-555-1234"},
                    "headers": {
                        "item_number": "Part",
                        "description": "Description",
                        "quantity": "Qty",
                        "unit_price": "Unit Price",
                        "line_total": "Amount"
                    },
                    "file_type": "spreadsheet",
                    "skip_rows": 2
                }
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_sheet_extraction_keeps_row_order() {
        let document = sheet(&[
            &["Acme Supply", "Quote # 5521"],
            &["Date 3/4/25", ""],
            &["Part", "Description", "Qty", "Unit Price", "Amount"],
            &["Z9", "Last alphabetically", "1", "$5.00", "$5.00"],
            &["A1", "First alphabetically", "2", "$1.50", "$3.00"],
            &["", "Subtotal", "", "", "$8.00"],
        ]);

        let result = Extractor::new()
            .with_registry(registry())
            .extract_document(&document, "quote.csv");

        assert_eq!(result.vendor_id, "acme");
        let order = result.order;
        let numbers: Vec<&str> = order.line_items.iter().map(|i| i.item_number.as_str()).collect();
        assert_eq!(numbers, vec!["Z9", "A1"]);
        assert_eq!(order.line_items[1].quantity, dec!(2));
        assert_eq!(order.line_items[1].unit_price, dec!(1.50));
        assert_eq!(order.po_number, "5521");
        assert_eq!(order.order_date, "3/4/2025");
        assert_eq!(order.vendor_name, "Acme Supply Co");
        assert_eq!(order.vendor_phone, "800-555-1234");
        assert_eq!(order.customer_name, NOT_FOUND);
    }

    #[test]
    fn test_unknown_vendor_still_assembles() {
        let document = sheet(&[&["nothing useful here"]]);
        let result = Extractor::new()
            .with_registry(registry())
            .extract_document(&document, "mystery.csv");

        assert_eq!(result.vendor_id, UNKNOWN_VENDOR);
        assert_eq!(result.order.po_number, NOT_FOUND);
        assert_eq!(result.order.total, dec!(0));
        assert!(result.order.line_items.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("fallback")));
        assert!(result.warnings.iter().any(|w| w.contains("po_number")));
    }

    #[test]
    fn test_empty_sheet_yields_warning_not_error() {
        let document = sheet(&[&["Acme Supply"], &["Total $10.00"]]);
        let result = Extractor::new()
            .with_registry(registry())
            .extract_document(&document, "short.csv");

        assert!(result.order.line_items.is_empty());
        assert_eq!(result.order.total, dec!(10.00));
        assert!(result.warnings.iter().any(|w| w.starts_with("No line items")));
    }

    #[test]
    fn test_custom_sentinel() {
        let mut config = PoexConfig::default();
        config.extraction.not_found = "N/A".to_string();
        let result = Extractor::new()
            .with_registry(registry())
            .with_config(config)
            .extract_document(&sheet(&[&["blank"]]), "x.csv");
        assert_eq!(result.order.customer_name, "N/A");
        assert_eq!(
            result.order.missing_fields("N/A"),
            vec![
                "po_number",
                "order_date",
                "vendor_name",
                "vendor_address",
                "vendor_phone",
                "customer_name"
            ]
        );
        assert!(result.order.missing_fields(NOT_FOUND).is_empty());
    }

    #[test]
    fn test_from_config_loads_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendors.json");
        registry().save(&path).unwrap();

        let mut config = PoexConfig::default();
        config.registry.path = Some(path);
        let extractor = Extractor::from_config(config).unwrap();
        assert_eq!(extractor.registry().len(), 1);
        assert!(extractor.registry().get("acme").is_some());
    }

    #[test]
    fn test_default_extractor_uses_builtin_registry() {
        assert!(Extractor::new().registry().get("iosouth").is_some());
    }
}

//! Core library for vendor purchase order extraction.
//!
//! This crate provides:
//! - A data-driven vendor registry with pattern-based identification
//! - PDF layout analysis (lattice and stream table detection, text blocks)
//! - Spreadsheet reading (xlsx, xls, ods, csv)
//! - Header location, column normalization and line item building
//! - Ordered-strategy metadata extraction (PO number, date, vendor, total)

pub mod document;
pub mod error;
pub mod models;
pub mod pipeline;

use std::path::Path;

pub use document::{Document, RawTable, TextBlock};
pub use error::{ConfigError, DocumentError, ExtractionError, FieldParseError, PoexError, Result};
pub use models::{
    CanonicalField, LineItem, PoexConfig, PurchaseOrder, VendorConfig, VendorRegistry, NOT_FOUND,
    UNKNOWN_VENDOR,
};
pub use pipeline::{identify_vendor, ExtractionResult, Extractor};

/// Extract a purchase order from a PDF or spreadsheet using the built-in
/// vendor registry and default configuration.
///
/// Fails only when the document cannot be opened. Missing fields come back
/// as [`NOT_FOUND`], a missing total as 0 and a missing table as an empty
/// line item list.
pub fn extract_purchase_order(path: impl AsRef<Path>) -> std::result::Result<PurchaseOrder, DocumentError> {
    Extractor::new().extract(path.as_ref()).map(|result| result.order)
}

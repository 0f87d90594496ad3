//! Purchase-order data models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder stored in string fields that could not be extracted.
pub const NOT_FOUND: &str = "Not Found";

/// One of the five normalized line-item attributes every vendor header is
/// mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ItemNumber,
    Description,
    Quantity,
    UnitPrice,
    LineTotal,
}

impl CanonicalField {
    /// All fields in output column order.
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::ItemNumber,
        CanonicalField::Description,
        CanonicalField::Quantity,
        CanonicalField::UnitPrice,
        CanonicalField::LineTotal,
    ];

    /// Snake-case field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::ItemNumber => "item_number",
            CanonicalField::Description => "description",
            CanonicalField::Quantity => "quantity",
            CanonicalField::UnitPrice => "unit_price",
            CanonicalField::LineTotal => "line_total",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line item on a quote or purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Vendor item number or SKU. Never empty.
    pub item_number: String,

    /// Product description.
    pub description: String,

    /// Ordered quantity, 0 when the cell could not be parsed.
    pub quantity: Decimal,

    /// Unit price with currency symbols stripped.
    pub unit_price: Decimal,

    /// Extended line total as printed on the document. Not reconciled with
    /// quantity times unit price.
    pub line_total: Decimal,
}

/// A purchase order assembled from one vendor document.
///
/// Constructed once per extraction call and owned by the caller; it owns its
/// line items outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// Registry id of the vendor configuration that was applied.
    pub vendor_id: String,

    /// Quote or PO number, or [`NOT_FOUND`].
    pub po_number: String,

    /// Order date in `M/D/YYYY` textual form, or [`NOT_FOUND`].
    pub order_date: String,

    /// Vendor display name.
    pub vendor_name: String,

    /// Vendor postal address, lines joined with `\n`.
    pub vendor_address: String,

    /// Vendor phone number.
    pub vendor_phone: String,

    /// Customer (bill-to) name.
    pub customer_name: String,

    /// Document total, 0 when no total label was found.
    pub total: Decimal,

    /// Line items in document order.
    pub line_items: Vec<LineItem>,
}

impl PurchaseOrder {
    /// Sum of all line totals. Informational only; never used to overwrite
    /// the printed total.
    pub fn line_total_sum(&self) -> Decimal {
        self.line_items.iter().map(|i| i.line_total).sum()
    }

    /// Names of string fields holding the `not_found` sentinel the order
    /// was extracted with.
    pub fn missing_fields(&self, not_found: &str) -> Vec<&'static str> {
        let fields = [
            ("po_number", &self.po_number),
            ("order_date", &self.order_date),
            ("vendor_name", &self.vendor_name),
            ("vendor_address", &self.vendor_address),
            ("vendor_phone", &self.vendor_phone),
            ("customer_name", &self.customer_name),
        ];
        fields
            .into_iter()
            .filter(|(_, v)| v.as_str() == not_found)
            .map(|(k, _)| k)
            .collect()
    }
}

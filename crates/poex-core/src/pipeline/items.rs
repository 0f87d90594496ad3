//! Line item building and numeric coercion.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use super::columns::NormalizedRow;
use super::patterns::NON_NUMERIC;
use crate::error::FieldParseError;
use crate::models::{CanonicalField, LineItem};

/// Strip everything but digits, `.` and `-`, then parse as a decimal.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, FieldParseError> {
    let cleaned = NON_NUMERIC.replace_all(raw, "");
    Decimal::from_str(&cleaned).map_err(|_| FieldParseError::new(field, raw))
}

/// Numeric cell with 0 as the fallback.
fn numeric(row: &NormalizedRow, field: CanonicalField) -> Decimal {
    let raw = row.get(field).map(str::trim).unwrap_or("");
    match parse_decimal(field.as_str(), raw) {
        Ok(value) => value,
        Err(e) => {
            if !raw.is_empty() {
                debug!("{}, using 0", e);
            }
            Decimal::ZERO
        }
    }
}

fn text(row: &NormalizedRow, field: CanonicalField) -> String {
    row.get(field).map(str::trim).unwrap_or("").to_string()
}

/// Convert normalized rows into line items, keeping document order.
///
/// Rows without an item number are headers, footers or separators and are
/// dropped.
pub fn build_line_items(rows: &[NormalizedRow]) -> Vec<LineItem> {
    let mut items = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.is_blank() {
            trace!("Row {}: blank, dropped", index);
            continue;
        }

        let item_number = text(row, CanonicalField::ItemNumber);
        if item_number.is_empty() {
            trace!("Row {}: no item number, dropped", index);
            continue;
        }

        let mut quantity = numeric(row, CanonicalField::Quantity);
        if quantity.is_sign_negative() && !quantity.is_zero() {
            warn!("Row {}: negative quantity {} for {}, using 0", index, quantity, item_number);
            quantity = Decimal::ZERO;
        }

        items.push(LineItem {
            description: text(row, CanonicalField::Description),
            quantity,
            unit_price: numeric(row, CanonicalField::UnitPrice),
            line_total: numeric(row, CanonicalField::LineTotal),
            item_number,
        });
    }

    debug!("Built {} line items from {} rows", items.len(), rows.len());
    items
}

//! Column normalization: vendor header aliases to canonical fields.

use tracing::{debug, warn};

use super::header::LocatedTable;
use super::patterns::{QTY_ONLY, QTY_PRICE};
use crate::error::FieldParseError;
use crate::models::{CanonicalField, HeaderAliases};

/// A data row keyed by canonical field. Fields without a mapped column are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    values: [Option<String>; 5],
}

impl NormalizedRow {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values[field as usize].as_deref()
    }

    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        self.values[field as usize] = Some(value.into());
    }

    /// True when every field is absent or whitespace.
    pub fn is_blank(&self) -> bool {
        self.values
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

impl<const N: usize> From<[(CanonicalField, &str); N]> for NormalizedRow {
    fn from(pairs: [(CanonicalField, &str); N]) -> Self {
        let mut row = NormalizedRow::default();
        for (field, value) in pairs {
            row.set(field, value);
        }
        row
    }
}

/// Where a source column goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Field(CanonicalField),
    QuantityPrice,
}

/// Column index to target mapping derived from one header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    targets: Vec<(usize, Target)>,
}

impl ColumnMap {
    /// Map each header cell to a canonical field. Unmatched headers are
    /// dropped; the first column claiming a field wins.
    pub fn from_header(header: &[String], aliases: &HeaderAliases) -> Self {
        let mut targets: Vec<(usize, Target)> = Vec::new();

        for (index, cell) in header.iter().enumerate() {
            let target = if aliases.is_merged_quantity_price(cell) {
                Some(Target::QuantityPrice)
            } else {
                aliases.canonical_for(cell).map(Target::Field)
            };

            match target {
                Some(t) if targets.iter().any(|(_, existing)| *existing == t) => {
                    debug!("Column {} {:?} duplicates an earlier mapping, dropped", index, cell);
                }
                Some(t) => targets.push((index, t)),
                None => {
                    if !cell.trim().is_empty() {
                        debug!("Column {} {:?} has no canonical field, dropped", index, cell);
                    }
                }
            }
        }

        Self { targets }
    }

    /// Canonical fields covered by this map.
    pub fn fields(&self) -> Vec<CanonicalField> {
        let mut fields = Vec::new();
        for (_, target) in &self.targets {
            match target {
                Target::Field(f) => fields.push(*f),
                Target::QuantityPrice => {
                    fields.extend([CanonicalField::Quantity, CanonicalField::UnitPrice])
                }
            }
        }
        fields.sort();
        fields.dedup();
        fields
    }

    fn has_field(&self, field: CanonicalField) -> bool {
        self.targets.iter().any(|(_, t)| *t == Target::Field(field))
    }

    /// Apply the mapping to one data row. Missing trailing cells read as
    /// empty.
    pub fn apply(&self, row: &[String]) -> NormalizedRow {
        let mut out = NormalizedRow::default();

        for (index, target) in &self.targets {
            let cell = row.get(*index).map(String::as_str).unwrap_or("");
            match target {
                Target::Field(field) => out.set(*field, cell),
                Target::QuantityPrice => {
                    if cell.trim().is_empty() {
                        continue;
                    }
                    let (quantity, price) = split_quantity_price(cell).unwrap_or_else(|e| {
                        warn!("{}, using 0 for quantity and unit price", e);
                        ("0".to_string(), "0".to_string())
                    });
                    // A dedicated column always wins over the merged one.
                    if !self.has_field(CanonicalField::Quantity) {
                        out.set(CanonicalField::Quantity, quantity);
                    }
                    if !self.has_field(CanonicalField::UnitPrice) {
                        out.set(CanonicalField::UnitPrice, price);
                    }
                }
            }
        }

        out
    }
}

/// Split a merged quantity/price cell into `(quantity, unit_price)` text.
///
/// `"5 $120.00"` gives `("5", "120.00")`; a bare integer is a quantity with
/// price `"0"`.
pub fn split_quantity_price(cell: &str) -> Result<(String, String), FieldParseError> {
    if let Some(caps) = QTY_PRICE.captures(cell) {
        return Ok((caps[1].to_string(), caps[2].replace(',', "")));
    }
    if let Some(caps) = QTY_ONLY.captures(cell) {
        return Ok((caps[1].to_string(), "0".to_string()));
    }
    Err(FieldParseError::new("quantity_price", cell))
}

/// Normalize every data row of a located table.
pub fn normalize(table: &LocatedTable, aliases: &HeaderAliases) -> Vec<NormalizedRow> {
    let map = ColumnMap::from_header(&table.header, aliases);
    debug!("Header {:?} maps to {:?}", table.header, map.fields());
    table.rows.iter().map(|row| map.apply(row)).collect()
}

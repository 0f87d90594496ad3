//! Header row location.
//!
//! Keyword sets are per canonical field, not per vendor. Vendor aliases are
//! applied later by the column normalizer.

use tracing::{debug, trace};

use crate::document::RawTable;
use crate::error::ExtractionError;

/// One keyword set per required header column. A row must hit every set.
const HEADER_KEYWORDS: [&[&str]; 5] = [
    &["item", "sku", "part"],
    &["description", "desc"],
    &["qty", "quantity"],
    &["cost", "price"],
    &["total", "extended", "amount"],
];

/// A table split into its header row and the rows below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LocatedTable {
    /// Treat the first row as the header.
    pub fn from_first_row(table: RawTable) -> Option<Self> {
        let mut rows = table.into_rows().into_iter();
        let header = rows.next()?;
        Some(Self {
            header,
            rows: rows.collect(),
        })
    }
}

/// Check whether a row's joined text contains every header keyword set.
pub fn is_header_row(row: &[String]) -> bool {
    let joined = row.join(" ").to_lowercase();
    HEADER_KEYWORDS
        .iter()
        .all(|set| set.iter().any(|keyword| joined.contains(keyword)))
}

/// Index of the first header row, scanning top to bottom.
pub fn locate_header(table: &RawTable) -> Option<usize> {
    table.rows().iter().position(|row| is_header_row(row))
}

/// Split a table at its header row. Rows above the header are discarded.
pub fn split_at_header(table: RawTable) -> Option<LocatedTable> {
    let index = locate_header(&table)?;
    trace!("Header row at index {}", index);
    let mut rows = table.into_rows();
    let data = rows.split_off(index + 1);
    let header = rows.pop()?;
    Some(LocatedTable { header, rows: data })
}

/// First table, in order, that has a locatable header row.
pub fn first_with_header(tables: Vec<RawTable>) -> Result<LocatedTable, ExtractionError> {
    let count = tables.len();
    for (index, table) in tables.into_iter().enumerate() {
        if let Some(located) = split_at_header(table) {
            debug!(
                "Table {}: header {:?}, {} data rows",
                index,
                located.header,
                located.rows.len()
            );
            return Ok(located);
        }
        debug!("Table {}: no header row", index);
    }
    Err(ExtractionError::NoHeader { tables: count })
}

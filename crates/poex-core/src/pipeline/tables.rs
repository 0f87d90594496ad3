//! Table extraction driven by vendor hints.

use tracing::{debug, warn};

use crate::document::{RawTable, SpreadsheetBackend, Strategy, TableBackend};
use crate::error::ExtractionError;
use crate::models::{ExtractionHints, Flavor};

/// Strategies to try for one area, in order.
fn strategies(flavor: Flavor) -> &'static [Strategy] {
    match flavor {
        Flavor::Stream => &[Strategy::Stream],
        Flavor::Auto => &[Strategy::Lattice, Strategy::Stream],
    }
}

/// Extract at most one table per configured area, in area order.
///
/// An area that yields nothing, or whose backend call fails, is skipped.
/// Fails only when every area comes back empty.
pub fn extract_area_tables(
    backend: &dyn TableBackend,
    hints: &ExtractionHints<'_>,
) -> Result<Vec<RawTable>, ExtractionError> {
    let mut tables = Vec::with_capacity(hints.table_areas.len());

    for (index, area) in hints.table_areas.iter().enumerate() {
        let found = strategies(hints.flavor).iter().find_map(|&strategy| {
            match backend.extract_tables(area, strategy, hints.columns) {
                Ok(found) => {
                    let count = found.len();
                    let first = found.into_iter().find(|t| !t.is_empty());
                    if first.is_some() {
                        debug!(
                            "Area {} [{}]: {} table(s) with {} strategy, keeping the first",
                            index, area, count, strategy
                        );
                    }
                    first
                }
                Err(e) => {
                    warn!("Area {} [{}]: {} strategy failed: {}", index, area, strategy, e);
                    None
                }
            }
        });

        match found {
            Some(table) => tables.push(table),
            None => warn!("Area {} [{}]: no table found", index, area),
        }
    }

    if tables.is_empty() {
        return Err(ExtractionError::NoTable {
            areas: hints.table_areas.len(),
        });
    }
    Ok(tables)
}

/// Read a sheet after skipping the configured leading rows.
pub fn read_sheet_table(
    backend: &dyn SpreadsheetBackend,
    hints: &ExtractionHints<'_>,
) -> Result<RawTable, ExtractionError> {
    let table = backend.read(hints.skip_rows);
    if table.is_empty() {
        return Err(ExtractionError::NoTable { areas: 0 });
    }
    debug!("Sheet: {} rows after skipping {}", table.len(), hints.skip_rows);
    Ok(table)
}

//! Spreadsheet backend: calamine for workbooks, csv for delimited text.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use super::{RawTable, SpreadsheetBackend, TextBackend, TextBlock};
use crate::error::DocumentError;

/// Rows of the first worksheet of a spreadsheet file.
#[derive(Debug)]
pub struct SheetDocument {
    rows: Vec<Vec<String>>,
    text: String,
}

impl SheetDocument {
    /// Read a workbook (xlsx, xls, ods) or a csv file.
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        std::fs::metadata(path).map_err(|e| DocumentError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        let rows = if is_csv {
            read_csv(path)?
        } else {
            read_workbook(path)?
        };
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Self::from_rows(rows))
    }

    /// Build from already-parsed rows.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let text = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self { rows, text }
    }
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, DocumentError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DocumentError::Sheet(e.to_string()))?;

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| DocumentError::Sheet(e.to_string()))
        })
        .collect()
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, DocumentError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| DocumentError::Sheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DocumentError::Sheet("workbook has no worksheets".to_string()))?
        .map_err(|e| DocumentError::Sheet(e.to_string()))?;

    // The range starts at the first non-empty cell; restore the blank rows
    // above it so skip counts stay absolute.
    let leading = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); leading];
    rows.extend(
        range
            .rows()
            .map(|row| row.iter().map(cell_as_string).collect::<Vec<_>>()),
    );
    Ok(rows)
}

fn cell_as_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%-m/%-d/%Y").to_string())
            .unwrap_or_else(|| dt.to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

impl SpreadsheetBackend for SheetDocument {
    fn read(&self, skip_rows: usize) -> RawTable {
        RawTable::new(self.rows.iter().skip(skip_rows).cloned().collect())
    }
}

impl TextBackend for SheetDocument {
    fn full_text(&self) -> &str {
        &self.text
    }

    fn blocks(&self) -> &[TextBlock] {
        &[]
    }
}

//! Document backends.
//!
//! The pipeline talks to documents only through the traits defined here:
//! [`TableBackend`] for region-based table extraction, [`TextBackend`] for
//! full text and positional blocks, and [`SpreadsheetBackend`] for sheets.

pub mod layout;
mod pdf;
mod sheet;

pub use pdf::PdfDocument;
pub use sheet::SheetDocument;

use std::path::Path;

use tracing::debug;

use crate::error::{DocumentError, ExtractionError};
use crate::models::{DocumentKind, LayoutConfig, Rect};

/// A grid of cell strings, rows top to bottom. Rows may be jagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for RawTable {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// A positioned paragraph of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Bounding box in top-down page coordinates.
    pub bbox: Rect,
    /// Block text, lines joined with `\n`.
    pub text: String,
}

/// Table extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cells delimited by visible ruling lines.
    Lattice,
    /// Columns inferred from text alignment.
    Stream,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Lattice => f.write_str("lattice"),
            Strategy::Stream => f.write_str("stream"),
        }
    }
}

/// Region-based table extraction.
pub trait TableBackend {
    /// Extract tables inside `region`. An empty vector means no table was
    /// detected there.
    fn extract_tables(
        &self,
        region: &Rect,
        strategy: Strategy,
        columns: Option<&[f32]>,
    ) -> Result<Vec<RawTable>, ExtractionError>;
}

/// Full text and positional blocks of a document.
pub trait TextBackend {
    /// Whole-document text.
    fn full_text(&self) -> &str;

    /// Text blocks of the first page in reading order. Empty when the
    /// backend has no positional information.
    fn blocks(&self) -> &[TextBlock];
}

/// Sheet reading.
pub trait SpreadsheetBackend {
    /// Rows of the first sheet after skipping `skip_rows` leading rows.
    fn read(&self, skip_rows: usize) -> RawTable;
}

/// An opened document. Owns everything read from the file; the file itself
/// is closed once `open` returns.
#[derive(Debug)]
pub enum Document {
    Pdf(PdfDocument),
    Sheet(SheetDocument),
}

impl Document {
    /// Open a document, choosing the backend from the file extension.
    pub fn open(path: &Path, layout: &LayoutConfig) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let document = match extension.as_str() {
            "pdf" => Document::Pdf(PdfDocument::open(path, layout.clone())?),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" | "csv" => {
                Document::Sheet(SheetDocument::open(path)?)
            }
            other => return Err(DocumentError::UnsupportedFormat(other.to_string())),
        };

        debug!("Opened {} as {:?}", path.display(), document.kind());
        Ok(document)
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Pdf(_) => DocumentKind::Pdf,
            Document::Sheet(_) => DocumentKind::Spreadsheet,
        }
    }
}

impl TextBackend for Document {
    fn full_text(&self) -> &str {
        match self {
            Document::Pdf(pdf) => pdf.full_text(),
            Document::Sheet(sheet) => sheet.full_text(),
        }
    }

    fn blocks(&self) -> &[TextBlock] {
        match self {
            Document::Pdf(pdf) => pdf.blocks(),
            Document::Sheet(sheet) => sheet.blocks(),
        }
    }
}

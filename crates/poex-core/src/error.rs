//! Error types for the poex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the poex library.
#[derive(Error, Debug)]
pub enum PoexError {
    /// The document could not be opened or parsed at the container level.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Line-item table extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Vendor registry or configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening a document. These are the only failures
/// surfaced by [`crate::extract_purchase_order`].
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    /// Failed to parse the PDF container.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Failed to read a spreadsheet workbook.
    #[error("failed to read spreadsheet: {0}")]
    Sheet(String),

    /// File extension is not a supported document kind.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
}

/// Recoverable errors of the table stage. The assembler converts these into
/// warnings and continues with an empty line-item list.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No configured table area yielded a table.
    #[error("no table found in any of {areas} configured area(s)")]
    NoTable { areas: usize },

    /// Tables were found but none contained a recognisable header row.
    #[error("no header row found in {tables} extracted table(s)")]
    NoHeader { tables: usize },

    /// The backend failed for one region.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// A single cell, date, number or label failed to parse. Always recovered
/// locally with a typed default.
#[derive(Error, Debug)]
#[error("failed to parse {field}: {value:?}")]
pub struct FieldParseError {
    pub field: String,
    pub value: String,
}

impl FieldParseError {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Errors related to the vendor registry and configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A vendor other than the reserved fallback has no detection patterns.
    #[error("vendor '{0}' has no detection patterns")]
    MissingPatterns(String),

    /// A table area could not be parsed.
    #[error("invalid table area {0:?}: expected \"x0,y0,x1,y1\"")]
    InvalidRect(String),

    /// A column boundary list could not be parsed.
    #[error("invalid column boundaries {0:?}")]
    InvalidColumns(String),

    /// Failed to read or write a configuration file.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the poex library.
pub type Result<T> = std::result::Result<T, PoexError>;

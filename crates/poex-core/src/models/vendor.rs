//! Vendor registry data model.
//!
//! A [`VendorRegistry`] is an ordered mapping from vendor id to
//! [`VendorConfig`]. Adding a vendor only ever means adding a record; the
//! pipeline has no vendor-specific control flow.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::embedded::BUILTIN_VENDORS;
use super::order::CanonicalField;
use crate::error::ConfigError;

/// Reserved id of the fallback configuration.
pub const UNKNOWN_VENDOR: &str = "unknown";

/// Axis-aligned rectangle in top-down page coordinates (points).
///
/// `(x0, y0)` is the top-left corner and `(x1, y1)` the bottom-right one.
/// Serialized as the string `"x0,y0,x1,y1"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectRepr", into = "String")]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle, normalising corner order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Check whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

impl FromStr for Rect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coords: Vec<f32> = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ConfigError::InvalidRect(s.to_string()))?;

        match coords.as_slice() {
            [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
            _ => Err(ConfigError::InvalidRect(s.to_string())),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x0, self.y0, self.x1, self.y1)
    }
}

impl From<Rect> for String {
    fn from(rect: Rect) -> Self {
        rect.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RectRepr {
    Text(String),
    Coords([f32; 4]),
    Fields { x0: f32, y0: f32, x1: f32, y1: f32 },
}

impl TryFrom<RectRepr> for Rect {
    type Error = ConfigError;

    fn try_from(repr: RectRepr) -> Result<Self, Self::Error> {
        match repr {
            RectRepr::Text(s) => s.parse(),
            RectRepr::Coords([x0, y0, x1, y1]) => Ok(Rect::new(x0, y0, x1, y1)),
            RectRepr::Fields { x0, y0, x1, y1 } => Ok(Rect::new(x0, y0, x1, y1)),
        }
    }
}

/// Kind of document a vendor sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// PDF quote or invoice.
    #[default]
    Pdf,
    /// Spreadsheet quote (xlsx, xls, ods or csv).
    #[serde(alias = "csv", alias = "xlsx", alias = "xls", alias = "excel")]
    Spreadsheet,
}

/// Table extraction strategy preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Try lattice first, fall back to stream.
    #[default]
    #[serde(alias = "lattice")]
    Auto,
    /// Always use stream.
    Stream,
}

/// Literal header text used by a vendor for each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderAliases {
    pub item_number: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub line_total: String,

    /// Header of a column that merges quantity and unit price into a single
    /// cell (e.g. `QtyCost`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_price: Option<String>,
}

impl HeaderAliases {
    /// Generic aliases used by the fallback configuration.
    pub fn generic() -> Self {
        Self {
            item_number: "Item".to_string(),
            description: "Description".to_string(),
            quantity: "Qty".to_string(),
            unit_price: "Cost".to_string(),
            line_total: "Total".to_string(),
            quantity_price: Some("QtyCost".to_string()),
        }
    }

    /// Configured alias for a canonical field.
    pub fn alias(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::ItemNumber => &self.item_number,
            CanonicalField::Description => &self.description,
            CanonicalField::Quantity => &self.quantity,
            CanonicalField::UnitPrice => &self.unit_price,
            CanonicalField::LineTotal => &self.line_total,
        }
    }

    /// Map a literal header cell to its canonical field (case-insensitive,
    /// trimmed). The canonical snake-case name is always accepted.
    pub fn canonical_for(&self, header: &str) -> Option<CanonicalField> {
        let header = header.trim();
        if header.is_empty() {
            return None;
        }
        CanonicalField::ALL.into_iter().find(|field| {
            let alias = self.alias(*field).trim();
            (!alias.is_empty() && alias.eq_ignore_ascii_case(header))
                || field.as_str().eq_ignore_ascii_case(header)
        })
    }

    /// Check whether a header cell is the merged quantity/price column.
    pub fn is_merged_quantity_price(&self, header: &str) -> bool {
        self.quantity_price
            .as_deref()
            .map(|alias| !alias.trim().is_empty() && alias.trim().eq_ignore_ascii_case(header.trim()))
            .unwrap_or(false)
    }
}

/// Free-text vendor identity, used for display and as a fallback when the
/// document itself does not yield a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
}

/// Configuration for a single vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Registry key. Filled in when the registry is loaded.
    #[serde(skip)]
    pub id: String,

    /// Case-insensitive substrings matched against document text or filename.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Vendor identity fields.
    #[serde(default)]
    pub vendor_info: VendorInfo,

    /// Header alias mapping.
    #[serde(default)]
    pub headers: HeaderAliases,

    /// Document kind.
    #[serde(default, rename = "file_type")]
    pub kind: DocumentKind,

    /// Leading spreadsheet rows to skip before the header row.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skip_rows: usize,

    /// PDF table areas, tried in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_areas: Vec<Rect>,

    /// Explicit column boundaries (x-coordinates) for the stream strategy.
    #[serde(
        default,
        deserialize_with = "deserialize_columns",
        skip_serializing_if = "Option::is_none"
    )]
    pub columns: Option<Vec<f32>>,

    /// Strategy preference.
    #[serde(default)]
    pub flavor: Flavor,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnsRepr {
    Text(String),
    List(Vec<f32>),
}

fn deserialize_columns<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<ColumnsRepr>::deserialize(deserializer)?;
    let columns = match repr {
        None => return Ok(None),
        Some(ColumnsRepr::List(list)) => list,
        Some(ColumnsRepr::Text(s)) => parse_columns(&s).map_err(serde::de::Error::custom)?,
    };
    Ok(if columns.is_empty() { None } else { Some(columns) })
}

/// Parse a comma-separated list of column x-coordinates.
pub fn parse_columns(s: &str) -> Result<Vec<f32>, ConfigError> {
    let mut columns = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidColumns(s.to_string()))?;
    columns.sort_by(|a, b| a.total_cmp(b));
    Ok(columns)
}

impl VendorConfig {
    /// The reserved fallback configuration: no patterns, a broad table area,
    /// no explicit columns, stream strategy, generic header aliases.
    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_VENDOR.to_string(),
            patterns: Vec::new(),
            vendor_info: VendorInfo::default(),
            headers: HeaderAliases::generic(),
            kind: DocumentKind::Pdf,
            skip_rows: 0,
            table_areas: vec![Rect::new(0.0, 0.0, 1000.0, 1000.0)],
            columns: None,
            flavor: Flavor::Stream,
        }
    }

    /// Check whether this is the reserved fallback configuration.
    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_VENDOR
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_unknown() && !self.patterns.iter().any(|p| !p.trim().is_empty()) {
            return Err(ConfigError::MissingPatterns(self.id.clone()));
        }
        Ok(())
    }
}

/// Lower-cased identification signals of one document.
#[derive(Debug, Clone)]
pub struct Haystack {
    text: String,
    filename: String,
}

impl Haystack {
    pub fn new(text: &str, filename: &str) -> Self {
        Self {
            text: text.to_lowercase(),
            filename: filename.to_lowercase(),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle) || self.filename.contains(needle)
    }
}

/// Extraction hints a vendor provides to the table stage.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionHints<'a> {
    pub kind: DocumentKind,
    pub table_areas: &'a [Rect],
    pub columns: Option<&'a [f32]>,
    pub flavor: Flavor,
    pub skip_rows: usize,
}

/// Capability interface the pipeline uses to talk to a vendor.
pub trait VendorProfile {
    /// Registry id.
    fn id(&self) -> &str;

    /// Whether any detection pattern occurs in the document text or filename.
    fn identify(&self, haystack: &Haystack) -> bool;

    /// Table extraction hints.
    fn extraction_hints(&self) -> ExtractionHints<'_>;

    /// Header alias mapping.
    fn header_aliases(&self) -> &HeaderAliases;
}

impl VendorProfile for VendorConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn identify(&self, haystack: &Haystack) -> bool {
        self.patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .any(|p| haystack.contains(&p))
    }

    fn extraction_hints(&self) -> ExtractionHints<'_> {
        ExtractionHints {
            kind: self.kind,
            table_areas: &self.table_areas,
            columns: self.columns.as_deref(),
            flavor: self.flavor,
            skip_rows: self.skip_rows,
        }
    }

    fn header_aliases(&self) -> &HeaderAliases {
        &self.headers
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    vendors: IndexMap<String, VendorConfig>,
}

lazy_static! {
    static ref BUILTIN: VendorRegistry = VendorRegistry::from_json(BUILTIN_VENDORS)
        .unwrap_or_else(|e| panic!("built-in vendor registry is invalid: {e}"));
}

/// Ordered, read-only mapping of vendor id to configuration, plus the
/// reserved fallback.
#[derive(Debug, Clone)]
pub struct VendorRegistry {
    vendors: IndexMap<String, VendorConfig>,
    unknown: VendorConfig,
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self {
            vendors: IndexMap::new(),
            unknown: VendorConfig::unknown(),
        }
    }
}

impl VendorRegistry {
    /// Process-wide built-in registry, parsed once on first use.
    pub fn builtin() -> &'static VendorRegistry {
        &BUILTIN
    }

    /// Parse a registry from JSON of the form `{"vendors": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::default();
        for (id, config) in file.vendors {
            registry.add(id, config)?;
        }
        debug!("Loaded vendor registry with {} vendors", registry.len());
        Ok(registry)
    }

    /// Load a registry from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Serialize to the on-disk JSON format. The fallback is only written
    /// when it differs from the built-in default.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let mut vendors = self.vendors.clone();
        if self.unknown != VendorConfig::unknown() {
            vendors.insert(UNKNOWN_VENDOR.to_string(), self.unknown.clone());
        }
        Ok(serde_json::to_string_pretty(&RegistryFile { vendors })?)
    }

    /// Save the registry to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add or replace a vendor. Replacing keeps the original position.
    pub fn add(&mut self, id: impl Into<String>, mut config: VendorConfig) -> Result<(), ConfigError> {
        let id = id.into().trim().to_lowercase();
        config.id = id.clone();
        config.validate()?;
        if id == UNKNOWN_VENDOR {
            self.unknown = config;
        } else {
            self.vendors.insert(id, config);
        }
        Ok(())
    }

    /// Remove a vendor, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<VendorConfig> {
        self.vendors.shift_remove(id)
    }

    /// Look up a vendor by id. The reserved id returns the fallback.
    pub fn get(&self, id: &str) -> Option<&VendorConfig> {
        if id == UNKNOWN_VENDOR {
            return Some(&self.unknown);
        }
        self.vendors.get(id)
    }

    /// Vendors in registry order, excluding the fallback.
    pub fn iter(&self) -> impl Iterator<Item = &VendorConfig> {
        self.vendors.values()
    }

    /// The reserved fallback configuration.
    pub fn unknown(&self) -> &VendorConfig {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

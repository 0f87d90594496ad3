//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::order::NOT_FOUND;

/// Main configuration for the poex pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoexConfig {
    /// Metadata extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF layout analysis configuration.
    pub layout: LayoutConfig,

    /// Vendor registry location.
    pub registry: RegistryConfig,
}

/// Metadata extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum left-edge offset (points) between the "Name / Address" label
    /// block and the block holding the customer name.
    pub customer_x_tolerance: f32,

    /// Blocks whose top edge is above this y-coordinate (points, top-down)
    /// form the page header band searched for the vendor phone.
    pub header_band_y: f32,

    /// Sentinel stored in string fields that could not be extracted.
    pub not_found: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            customer_x_tolerance: 50.0,
            header_band_y: 250.0,
            not_found: NOT_FOUND.to_string(),
        }
    }
}

/// Geometry heuristics of the PDF backend. All values are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Words whose baselines differ by less than this share a line.
    pub line_y_tolerance: f32,

    /// Minimum horizontal whitespace separating two inferred stream columns.
    pub column_gap: f32,

    /// Rulings closer than this are merged into one grid line.
    pub rule_tolerance: f32,

    /// Vertical whitespace that starts a new text block.
    pub block_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_y_tolerance: 3.0,
            column_gap: 8.0,
            rule_tolerance: 2.0,
            block_gap: 6.0,
        }
    }
}

/// Vendor registry location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// External registry file. The built-in registry is used when unset.
    pub path: Option<PathBuf>,
}

impl PoexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PoexConfig =
            serde_json::from_str(r#"{"extraction": {"header_band_y": 300.0}}"#).unwrap();
        assert_eq!(config.extraction.header_band_y, 300.0);
        assert_eq!(config.extraction.customer_x_tolerance, 50.0);
        assert_eq!(config.extraction.not_found, "Not Found");
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.registry.path, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PoexConfig::default();
        config.registry.path = Some(PathBuf::from("/etc/poex/vendors.json"));
        config.layout.column_gap = 12.0;
        config.save(&path).unwrap();

        let loaded = PoexConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

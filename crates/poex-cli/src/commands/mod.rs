//! Subcommands and the configuration plumbing they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod vendors;

use std::path::{Path, PathBuf};

use tracing::debug;

use poex_core::{Extractor, PoexConfig, VendorRegistry};

/// Per-user configuration directory.
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poex")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn default_registry_path() -> PathBuf {
    config_dir().join("vendors.json")
}

/// Load the configuration from an explicit path, else the per-user file if
/// present, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<PoexConfig> {
    if let Some(path) = path {
        return Ok(PoexConfig::from_file(Path::new(path))?);
    }

    let default = default_config_path();
    if default.exists() {
        debug!("Using config file {}", default.display());
        Ok(PoexConfig::from_file(&default)?)
    } else {
        Ok(PoexConfig::default())
    }
}

/// Registry file to use: explicit flag, then config, then the per-user
/// file if it exists. `None` means the built-in registry.
pub fn registry_path(config: &PoexConfig, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = &config.registry.path {
        return Some(path.clone());
    }
    let default = default_registry_path();
    default.exists().then_some(default)
}

pub fn load_registry(config: &PoexConfig, explicit: Option<&Path>) -> anyhow::Result<VendorRegistry> {
    match registry_path(config, explicit) {
        Some(path) => {
            debug!("Loading vendor registry from {}", path.display());
            Ok(VendorRegistry::from_file(&path)?)
        }
        None => Ok(VendorRegistry::builtin().clone()),
    }
}

pub fn build_extractor(mut config: PoexConfig, registry: Option<&Path>) -> anyhow::Result<Extractor> {
    config.registry.path = registry_path(&config, registry);
    Ok(Extractor::from_config(config)?)
}

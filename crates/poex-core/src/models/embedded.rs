//! Embedded data for standalone binary distribution.

/// Built-in vendor registry.
pub static BUILTIN_VENDORS: &str = include_str!("../../vendors.json");

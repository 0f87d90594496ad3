//! Vendor identification.

use tracing::debug;

use crate::models::{Haystack, VendorConfig, VendorProfile, VendorRegistry};

/// Pick the vendor whose patterns occur in the document text or filename.
///
/// Vendors are tried in registry order and the first match wins. When no
/// vendor matches, the registry's fallback configuration is returned.
pub fn identify_vendor<'r>(registry: &'r VendorRegistry, text: &str, filename: &str) -> &'r VendorConfig {
    let haystack = Haystack::new(text, filename);

    match registry.iter().find(|vendor| vendor.identify(&haystack)) {
        Some(vendor) => {
            debug!("Identified vendor '{}' for {}", vendor.id(), filename);
            vendor
        }
        None => {
            debug!("No vendor pattern matched {}, using fallback", filename);
            registry.unknown()
        }
    }
}

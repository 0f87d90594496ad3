//! Data models.

pub mod config;
pub mod embedded;
pub mod order;
pub mod vendor;

pub use config::{ExtractionConfig, LayoutConfig, PoexConfig, RegistryConfig};
pub use order::{CanonicalField, LineItem, PurchaseOrder, NOT_FOUND};
pub use vendor::{
    DocumentKind, ExtractionHints, Flavor, Haystack, HeaderAliases, Rect, VendorConfig, VendorInfo,
    VendorProfile, VendorRegistry, UNKNOWN_VENDOR,
};

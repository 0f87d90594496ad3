//! Scalar field extraction from document text and positional blocks.
//!
//! Every field has an ordered list of strategies; the first one returning a
//! value wins. Fields are independent of each other.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::items::parse_decimal;
use super::patterns::{
    ADDRESS_STOP_ANYWHERE, ADDRESS_STOP_LINE, AMOUNT_DUE, DATE_ISO, DATE_PARTS, GRAND_TOTAL,
    ORDER_DATE, PHONE, PHONE_LINE, PO_NUMBER, QUOTE_NUMBER, TOTAL,
};
use crate::document::TextBlock;
use crate::error::FieldParseError;
use crate::models::{ExtractionConfig, VendorConfig};

/// Label of the block preceding the customer name.
const CUSTOMER_LABEL: &str = "name / address";

/// Scalar fields recovered from one document. `None` means no strategy
/// produced a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub po_number: Option<String>,
    pub order_date: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_address: Option<String>,
    pub vendor_phone: Option<String>,
    pub customer_name: Option<String>,
    pub total: Option<Decimal>,
}

/// Inputs shared by all strategies.
pub struct MetadataContext<'a> {
    text: &'a str,
    blocks: &'a [TextBlock],
    header_band: String,
    vendor: &'a VendorConfig,
    config: &'a ExtractionConfig,
}

impl<'a> MetadataContext<'a> {
    pub fn new(
        text: &'a str,
        blocks: &'a [TextBlock],
        vendor: &'a VendorConfig,
        config: &'a ExtractionConfig,
    ) -> Self {
        let header_band = if blocks.is_empty() {
            text.to_string()
        } else {
            blocks
                .iter()
                .filter(|b| b.bbox.y0 < config.header_band_y)
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        Self {
            text,
            blocks,
            header_band,
            vendor,
            config,
        }
    }

    fn vendor_name(&self) -> Option<&str> {
        non_empty(&self.vendor.vendor_info.name)
    }
}

type Strategy<T> = (&'static str, fn(&MetadataContext<'_>) -> Option<T>);

const PO_NUMBER_STRATEGIES: &[Strategy<String>] = &[
    ("quote label", po_from_quote_label),
    ("po label", po_from_po_label),
];

const ORDER_DATE_STRATEGIES: &[Strategy<String>] = &[("date label", date_from_label)];

const CUSTOMER_STRATEGIES: &[Strategy<String>] = &[("label block", customer_from_label_block)];

const VENDOR_NAME_STRATEGIES: &[Strategy<String>] = &[
    ("literal name", vendor_name_in_header),
    ("configured name", vendor_name_configured),
];

const ADDRESS_STRATEGIES: &[Strategy<String>] = &[
    ("address pattern", address_until_label_line),
    ("line walk", address_line_walk),
    ("configured address", address_configured),
];

const PHONE_STRATEGIES: &[Strategy<String>] = &[
    ("header band", phone_in_header_band),
    ("configured phone", phone_configured),
];

const TOTAL_STRATEGIES: &[Strategy<Decimal>] = &[
    ("grand total", total_grand),
    ("amount due", total_amount_due),
    ("total", total_plain),
];

fn first_success<T>(field: &str, ctx: &MetadataContext<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    for (name, strategy) in strategies {
        if let Some(value) = strategy(ctx) {
            debug!("{}: found by {}", field, name);
            return Some(value);
        }
        trace!("{}: {} found nothing", field, name);
    }
    None
}

/// Run every field's strategy chain.
pub fn extract_metadata(ctx: &MetadataContext<'_>) -> Metadata {
    Metadata {
        po_number: first_success("po_number", ctx, PO_NUMBER_STRATEGIES),
        order_date: first_success("order_date", ctx, ORDER_DATE_STRATEGIES),
        vendor_name: first_success("vendor_name", ctx, VENDOR_NAME_STRATEGIES),
        vendor_address: first_success("vendor_address", ctx, ADDRESS_STRATEGIES),
        vendor_phone: first_success("vendor_phone", ctx, PHONE_STRATEGIES),
        customer_name: first_success("customer_name", ctx, CUSTOMER_STRATEGIES),
        total: first_success("total", ctx, TOTAL_STRATEGIES),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Byte offset just past a case-insensitive occurrence of `needle`.
fn end_of(haystack: &str, needle: &str) -> Option<usize> {
    let re = Regex::new(&format!("(?i){}", regex::escape(needle))).ok()?;
    re.find(haystack).map(|m| m.end())
}

/// Normalise a matched date to `M/D/YYYY` text without zero padding.
///
/// Accepts `M/D/Y` with `/`, `-` or `.` separators (two-digit years read as
/// 20YY) and ISO `YYYY-MM-DD`. Dates that do not exist on the calendar are
/// rejected.
pub fn normalize_date(raw: &str) -> Result<String, FieldParseError> {
    let raw = raw.trim();
    let invalid = || FieldParseError::new("order_date", raw);

    let (year, month, day) = if let Some(caps) = DATE_ISO.captures(raw) {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    } else if let Some(caps) = DATE_PARTS.captures(raw) {
        let year = match &caps[3] {
            short if short.len() == 2 => format!("20{}", short),
            long => long.to_string(),
        };
        (year, caps[1].to_string(), caps[2].to_string())
    } else {
        return Err(invalid());
    };

    calendar_date(&year, &month, &day).ok_or_else(invalid)
}

fn calendar_date(year: &str, month: &str, day: &str) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some(date.format("%-m/%-d/%Y").to_string())
}

fn po_from_quote_label(ctx: &MetadataContext<'_>) -> Option<String> {
    capture(&QUOTE_NUMBER, ctx.text)
}

fn po_from_po_label(ctx: &MetadataContext<'_>) -> Option<String> {
    capture(&PO_NUMBER, ctx.text)
}

fn date_from_label(ctx: &MetadataContext<'_>) -> Option<String> {
    let raw = capture(&ORDER_DATE, ctx.text)?;
    normalize_date(&raw)
        .map_err(|e| debug!("{}", e))
        .ok()
}

/// The block right after the first "Name / Address" label, when it starts
/// within tolerance of the label's left edge.
fn customer_from_label_block(ctx: &MetadataContext<'_>) -> Option<String> {
    let index = ctx
        .blocks
        .iter()
        .position(|b| b.text.to_lowercase().contains(CUSTOMER_LABEL))?;
    let label = &ctx.blocks[index];
    let next = ctx.blocks.get(index + 1)?;

    if (next.bbox.x0 - label.bbox.x0).abs() < ctx.config.customer_x_tolerance {
        non_empty(&next.text).map(str::to_string)
    } else {
        trace!(
            "Block after label is at x={:.1}, label at x={:.1}; not aligned",
            next.bbox.x0,
            label.bbox.x0
        );
        None
    }
}

fn vendor_name_in_header(ctx: &MetadataContext<'_>) -> Option<String> {
    let name = ctx.vendor_name()?;
    end_of(&ctx.header_band, name).map(|_| name.to_string())
}

fn vendor_name_configured(ctx: &MetadataContext<'_>) -> Option<String> {
    ctx.vendor_name().map(str::to_string)
}

/// Lines after the vendor-name line up to the first line starting with a
/// known label, phone lines removed.
fn address_until_label_line(ctx: &MetadataContext<'_>) -> Option<String> {
    let band = ctx.header_band.as_str();
    let rest = &band[end_of(band, ctx.vendor_name()?)?..];

    let body = rest.trim_start();
    if !rest[..rest.len() - body.len()].contains('\n') {
        return None;
    }

    let mut lines = Vec::new();
    let mut stopped = false;
    for line in body.lines() {
        if ADDRESS_STOP_LINE.is_match(line) {
            stopped = true;
            break;
        }
        lines.push(line);
    }
    if !stopped {
        return None;
    }

    let address = lines
        .into_iter()
        .filter(|line| !PHONE_LINE.is_match(line.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    non_empty(&address).map(str::to_string)
}

/// Lines after the vendor name until a blank line or a label, skipping any
/// line containing a phone number.
fn address_line_walk(ctx: &MetadataContext<'_>) -> Option<String> {
    let band = ctx.header_band.as_str();
    let after = band[end_of(band, ctx.vendor_name()?)?..].trim();

    let mut lines = Vec::new();
    for line in after.lines() {
        if line.trim().is_empty() || ADDRESS_STOP_ANYWHERE.is_match(line) {
            break;
        }
        if !PHONE.is_match(line) {
            lines.push(line.trim());
        }
    }
    non_empty(&lines.join("\n")).map(str::to_string)
}

fn address_configured(ctx: &MetadataContext<'_>) -> Option<String> {
    non_empty(&ctx.vendor.vendor_info.address).map(str::to_string)
}

fn phone_in_header_band(ctx: &MetadataContext<'_>) -> Option<String> {
    PHONE.find(&ctx.header_band).map(|m| m.as_str().to_string())
}

fn phone_configured(ctx: &MetadataContext<'_>) -> Option<String> {
    non_empty(&ctx.vendor.vendor_info.phone).map(str::to_string)
}

fn labelled_amount(re: &Regex, ctx: &MetadataContext<'_>) -> Option<Decimal> {
    let raw = capture(re, ctx.text)?;
    parse_decimal("total", &raw).map_err(|e| debug!("{}", e)).ok()
}

fn total_grand(ctx: &MetadataContext<'_>) -> Option<Decimal> {
    labelled_amount(&GRAND_TOTAL, ctx)
}

fn total_amount_due(ctx: &MetadataContext<'_>) -> Option<Decimal> {
    labelled_amount(&AMOUNT_DUE, ctx)
}

fn total_plain(ctx: &MetadataContext<'_>) -> Option<Decimal> {
    labelled_amount(&TOTAL, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rect, VendorInfo};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn block(x0: f32, y0: f32, text: &str) -> TextBlock {
        TextBlock {
            bbox: Rect::new(x0, y0, x0 + 200.0, y0 + 12.0),
            text: text.to_string(),
        }
    }

    fn iosouth() -> VendorConfig {
        let mut vendor = VendorConfig::unknown();
        vendor.id = "iosouth".into();
        vendor.vendor_info = VendorInfo {
            name: "I/O South, LLC".into(),
            address: "PO Box 1\nNowhere".into(),
            phone: "800-000-0000".into(),
            website: String::new(),
        };
        vendor
    }

    fn quote_blocks() -> Vec<TextBlock> {
        vec![
            block(20.0, 40.0, "I/O South, LLC\n100 Main Street\nSuite 4\nMobile, AL 36602\n251-555-0100"),
            block(400.0, 60.0, "Date 7/16/2025"),
            block(400.0, 80.0, "Quote # 111651"),
            block(20.0, 140.0, "Name / Address"),
            block(24.0, 160.0, "Egate Inc"),
            block(20.0, 300.0, "Item Description QtyCost Total\nA1 Widget 2 $10.00 20.00"),
            block(400.0, 700.0, "Total $2,600.00"),
        ]
    }

    fn extract(blocks: &[TextBlock], vendor: &VendorConfig) -> Metadata {
        let text = blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n");
        let config = ExtractionConfig::default();
        let ctx = MetadataContext::new(&text, blocks, vendor, &config);
        extract_metadata(&ctx)
    }

    #[test]
    fn test_full_quote() {
        let meta = extract(&quote_blocks(), &iosouth());
        assert_eq!(
            meta,
            Metadata {
                po_number: Some("111651".into()),
                order_date: Some("7/16/2025".into()),
                vendor_name: Some("I/O South, LLC".into()),
                vendor_address: Some("100 Main Street\nSuite 4\nMobile, AL 36602".into()),
                vendor_phone: Some("251-555-0100".into()),
                customer_name: Some("Egate Inc".into()),
                total: Some(dec!(2600.00)),
            }
        );
    }

    #[test]
    fn test_misaligned_customer_block_is_rejected() {
        let mut blocks = quote_blocks();
        blocks[4] = block(300.0, 160.0, "Ship To Someone");
        let meta = extract(&blocks, &iosouth());
        assert_eq!(meta.customer_name, None);
        assert_eq!(meta.po_number, Some("111651".into()));
    }

    #[test]
    fn test_only_first_customer_label_is_used() {
        let mut blocks = quote_blocks();
        blocks[4] = block(300.0, 160.0, "Ship To Someone");
        blocks.insert(5, block(20.0, 200.0, "Name / Address"));
        blocks.insert(6, block(20.0, 220.0, "Later Customer"));
        let meta = extract(&blocks, &iosouth());
        assert_eq!(meta.customer_name, None);
    }

    #[test]
    fn test_unknown_vendor_has_no_identity() {
        let meta = extract(&quote_blocks(), &VendorConfig::unknown());
        assert_eq!(meta.vendor_name, None);
        assert_eq!(meta.vendor_address, None);
        assert_eq!(meta.vendor_phone, Some("251-555-0100".into()));
    }

    #[test]
    fn test_address_falls_back_to_line_walk_then_config() {
        // No label line follows the address: primary pattern fails.
        let blocks = vec![block(20.0, 40.0, "I/O South, LLC\n100 Main Street\n\nunrelated")];
        let text = "I/O South, LLC\n100 Main Street\n\nunrelated";
        let vendor = iosouth();
        let config = ExtractionConfig::default();
        let ctx = MetadataContext::new(text, &blocks, &vendor, &config);
        assert_eq!(address_until_label_line(&ctx), None);
        assert_eq!(address_line_walk(&ctx), Some("100 Main Street".into()));

        let blocks = vec![block(20.0, 40.0, "Some other header")];
        let meta = extract(&blocks, &vendor);
        assert_eq!(meta.vendor_name, Some("I/O South, LLC".into()));
        assert_eq!(meta.vendor_address, Some("PO Box 1\nNowhere".into()));
        assert_eq!(meta.vendor_phone, Some("800-000-0000".into()));
    }

    #[test]
    fn test_phone_only_searched_in_header_band() {
        let blocks = vec![
            block(20.0, 40.0, "Some Vendor"),
            block(20.0, 600.0, "Call 555-123-4567"),
        ];
        let meta = extract(&blocks, &VendorConfig::unknown());
        assert_eq!(meta.vendor_phone, None);
    }

    #[test]
    fn test_total_strategies_in_order() {
        let blocks = vec![block(20.0, 600.0, "Subtotal 90.00\nTotal 100.00\nGrand Total $110.00")];
        assert_eq!(extract(&blocks, &VendorConfig::unknown()).total, Some(dec!(110.00)));

        let blocks = vec![block(20.0, 600.0, "Subtotal 90.00\nAmount Due: 95.50")];
        assert_eq!(extract(&blocks, &VendorConfig::unknown()).total, Some(dec!(95.50)));

        let blocks = vec![block(20.0, 600.0, "Subtotal 90.00")];
        assert_eq!(extract(&blocks, &VendorConfig::unknown()).total, None);
    }

    #[test]
    fn test_po_label_fallback() {
        let blocks = vec![block(20.0, 40.0, "PO # 11931304\nOrder Date 06/25/2025")];
        let meta = extract(&blocks, &VendorConfig::unknown());
        assert_eq!(meta.po_number, Some("11931304".into()));
        assert_eq!(meta.order_date, Some("6/25/2025".into()));
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("7/16/2025").unwrap(), "7/16/2025");
        assert_eq!(normalize_date("06-25-2025").unwrap(), "6/25/2025");
        assert_eq!(normalize_date("07/04/2025").unwrap(), "7/4/2025");
        assert_eq!(normalize_date("10.14.25").unwrap(), "10/14/2025");
        assert_eq!(normalize_date("2025-10-14").unwrap(), "10/14/2025");
        assert!(normalize_date("2025-13-45").is_err());
        assert!(normalize_date("13/45/2025").is_err());
        assert!(normalize_date("2/30/25").is_err());
        assert!(normalize_date("soon").is_err());
    }
}

//! Common regex patterns for purchase-order metadata and cell cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Order date following a "Date" label: M/D/YYYY, M-D-YY or ISO.
    pub static ref ORDER_DATE: Regex = Regex::new(
        r"(?i)\bdate\b[\s:]*(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[/.\-]\d{1,2}[/.\-](?:\d{4}|\d{2}))\b"
    ).unwrap();

    pub static ref DATE_PARTS: Regex = Regex::new(
        r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})$"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})$"
    ).unwrap();

    // Document numbers
    pub static ref QUOTE_NUMBER: Regex = Regex::new(
        r"(?i)\bquote\s*(?:#|no\.?|number)[\s:]*(\d+)"
    ).unwrap();

    pub static ref PO_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:p\.?o\.?|purchase\s+order|order)\s*(?:#|no\.?|number)?[\s:]*(\d{3,})"
    ).unwrap();

    // Totals. A value on the following line must carry a currency symbol.
    pub static ref GRAND_TOTAL: Regex = Regex::new(
        r"(?i)\bgrand\s+total\b[ \t:]*(?:\$[ \t]*|\n[ \t]*\$[ \t]*)?(-?\d[\d,]*(?:\.\d+)?)"
    ).unwrap();

    pub static ref AMOUNT_DUE: Regex = Regex::new(
        r"(?i)\b(?:amount|balance|total)\s+due\b[ \t:]*(?:\$[ \t]*|\n[ \t]*\$[ \t]*)?(-?\d[\d,]*(?:\.\d+)?)"
    ).unwrap();

    pub static ref TOTAL: Regex = Regex::new(
        r"(?i)\btotal\b[ \t:]*(?:\$[ \t]*|\n[ \t]*\$[ \t]*)?(-?\d[\d,]*(?:\.\d+)?)"
    ).unwrap();

    // Phone numbers
    pub static ref PHONE: Regex = Regex::new(
        r"(?:\(\d{3}\)|\b\d{3})[-. ]?\d{3}[-. ]?\d{4}\b"
    ).unwrap();

    pub static ref PHONE_LINE: Regex = Regex::new(
        r"(?i)^(?:(?:tel|phone|ph|fax)\.?:?\s*)?(?:\(\d{3}\)|\d{3})[-.\s]?\d{3}[-.\s]?\d{4}$"
    ).unwrap();

    // Labels that end the vendor address block
    pub static ref ADDRESS_STOP_LINE: Regex = Regex::new(
        r"^(?:Date|Quote #|www\.|Name / Address|Item|Description|Qty|Cost|Total)"
    ).unwrap();

    pub static ref ADDRESS_STOP_ANYWHERE: Regex = Regex::new(
        r"(?i)\b(?:date|item|description|qty|cost|total)\b|quote #|www\.|name / address"
    ).unwrap();

    // Merged quantity/price cell: "5 $120.00", "10$50.00", "3,12.50"
    pub static ref QTY_PRICE: Regex = Regex::new(
        r"^\s*(\d+)(?:\s+|\s*[$,]\s*)(\d[\d,]*(?:\.\d+)?)\s*$"
    ).unwrap();

    pub static ref QTY_ONLY: Regex = Regex::new(
        r"^\s*(\d+)\s*$"
    ).unwrap();

    // Everything that is not part of a plain decimal number
    pub static ref NON_NUMERIC: Regex = Regex::new(r"[^\d.\-]").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_date_pattern() {
        let caps = ORDER_DATE.captures("Quote\nDate 7/16/2025\nQuote # 111651").unwrap();
        assert_eq!(&caps[1], "7/16/2025");
        let caps = ORDER_DATE.captures("Order Date: 2025-06-25").unwrap();
        assert_eq!(&caps[1], "2025-06-25");
        assert!(ORDER_DATE.captures("Update 7/16/2025").is_none());
    }

    #[test]
    fn test_total_does_not_match_subtotal_or_next_line_digits() {
        assert!(TOTAL.captures("Subtotal 100.00").is_none());
        assert!(TOTAL.captures("Qty Cost Total\n1001 Widget").is_none());
        assert_eq!(&TOTAL.captures("Total\n$2,600.00").unwrap()[1], "2,600.00");
        assert_eq!(&TOTAL.captures("Total: $11,094.06").unwrap()[1], "11,094.06");
    }

    #[test]
    fn test_phone_patterns() {
        assert_eq!(PHONE.find("Call 555-123-4567 now").unwrap().as_str(), "555-123-4567");
        assert_eq!(PHONE.find("(555) 123-4567").unwrap().as_str(), "(555) 123-4567");
        assert!(PHONE.find("Quote # 11165100001").is_none());
        assert!(PHONE_LINE.is_match("Phone: 555.123.4567"));
        assert!(!PHONE_LINE.is_match("Suite 555-123-4567 B"));
    }

    #[test]
    fn test_address_stop_patterns() {
        assert!(ADDRESS_STOP_LINE.is_match("Date 7/16/2025"));
        assert!(!ADDRESS_STOP_LINE.is_match("100 Date Street"));
        assert!(ADDRESS_STOP_ANYWHERE.is_match("see www.iosouth.com"));
        assert!(!ADDRESS_STOP_ANYWHERE.is_match("Costa Mesa, CA"));
    }
}

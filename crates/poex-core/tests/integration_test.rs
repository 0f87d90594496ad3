//! End-to-end extraction tests.
//!
//! PDFs are generated with lopdf (Courier, 10pt, letter size) and
//! spreadsheets are written as CSV or minimal xlsx packages into a
//! temporary directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use poex_core::{
    extract_purchase_order, DocumentError, Extractor, PurchaseOrder, VendorRegistry, NOT_FOUND,
    UNKNOWN_VENDOR,
};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const PAGE_HEIGHT: i64 = 792;

/// Content stream builder taking top-down coordinates.
#[derive(Default)]
struct Page {
    operations: Vec<Operation>,
}

impl Page {
    fn text(mut self, x: i64, baseline: i64, text: &str) -> Self {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![x.into(), (PAGE_HEIGHT - baseline).into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
        self
    }

    fn line(mut self, x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        self.operations.extend([
            Operation::new("m", vec![x0.into(), (PAGE_HEIGHT - y0).into()]),
            Operation::new("l", vec![x1.into(), (PAGE_HEIGHT - y1).into()]),
            Operation::new("S", vec![]),
        ]);
        self
    }

    /// Ruled grid with the given column and row edges.
    fn grid(self, xs: &[i64], ys: &[i64]) -> Self {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        let page = ys.iter().fold(self, |p, &y| p.line(left, y, right, y));
        xs.iter().fold(page, |p, &x| p.line(x, top, x, bottom))
    }

    /// One table row: each cell's text starts 5pt right of its column edge.
    fn row(self, xs: &[i64], baseline: i64, cells: &[&str]) -> Self {
        xs.iter()
            .zip(cells)
            .fold(self, |p, (&x, cell)| p.text(x + 5, baseline, cell))
    }

    fn save(self, path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: self.operations,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}

fn registry() -> VendorRegistry {
    VendorRegistry::from_json(
        r#"{"vendors": {
            "testvendor": {
                "patterns": ["Test Vendor"],
                "vendor_info": {"name": "Test Vendor Inc"},
                "headers": {
                    "item_number": "Item",
                    "description": "Description",
                    "quantity": "Qty",
                    "unit_price": "Cost",
                    "line_total": "Total",
                    "quantity_price": "QtyCost"
                },
                "file_type": "pdf",
                "table_areas": ["0,300,612,500"],
                "flavor": "auto"
            },
            "acme": {
                "patterns": ["Acme Supply"],
                "vendor_info": {"name": "Acme Supply Co"},
                "headers": {
                    "item_number": "Part",
                    "description": "Description",
                    "quantity": "Qty",
                    "unit_price": "Unit Price",
                    "line_total": "Amount"
                },
                "file_type": "spreadsheet",
                "skip_rows": 2
            }
        }}"#,
    )
    .unwrap()
}

fn extract(path: &Path) -> PurchaseOrder {
    Extractor::new()
        .with_registry(registry())
        .extract(path)
        .unwrap()
        .order
}

/// Quote header shared by the PDF scenarios.
fn quote_header() -> Page {
    Page::default()
        .text(40, 60, "Test Vendor Inc")
        .text(400, 60, "Quote # 111651")
        .text(400, 75, "Date 07/16/2025")
        .text(40, 150, "Name / Address")
        .text(40, 200, "Egate Inc")
}

/// Write a single-sheet xlsx with inline string cells. `rows` holds
/// 1-based row numbers; rows not listed stay empty.
fn write_xlsx(path: &Path, rows: &[(u32, &[&str])]) {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row, cells) in rows {
        sheet.push_str(&format!(r#"<row r="{row}">"#));
        for (col, value) in cells.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + col as u8) as char, row);
            sheet.push_str(&format!(
                r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Quote" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, content) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn write_pdf(dir: &TempDir, name: &str, page: Page) -> PathBuf {
    let path = dir.path().join(name);
    page.save(&path);
    path
}

#[test]
fn test_lattice_table_quote() {
    let dir = TempDir::new().unwrap();
    let xs = [20, 100, 300, 380, 460, 560];
    let page = quote_header()
        .grid(&xs, &[320, 340, 360])
        .row(&xs, 335, &["Item", "Description", "Qty", "Cost", "Total"])
        .row(&xs, 355, &["A1", "Widget", "2", "10.00", "20.00"])
        .text(380, 420, "Grand Total $20.00");
    let path = write_pdf(&dir, "quote.pdf", page);

    let order = extract(&path);

    assert_eq!(order.vendor_id, "testvendor");
    assert_eq!(order.line_items.len(), 1);
    let item = &order.line_items[0];
    assert_eq!(item.item_number, "A1");
    assert_eq!(item.description, "Widget");
    assert_eq!(item.quantity, dec!(2));
    assert_eq!(item.unit_price, dec!(10.00));
    assert_eq!(item.line_total, dec!(20.00));

    assert_eq!(order.po_number, "111651");
    assert_eq!(order.order_date, "7/16/2025");
    assert_eq!(order.vendor_name, "Test Vendor Inc");
    assert_eq!(order.customer_name, "Egate Inc");
    assert_eq!(order.total, dec!(20.00));
}

#[test]
fn test_merged_quantity_price_column() {
    let dir = TempDir::new().unwrap();
    let xs = [20, 100, 300, 400, 560];
    let page = quote_header()
        .grid(&xs, &[320, 340, 360])
        .row(&xs, 335, &["Item", "Description", "QtyCost", "Total"])
        .row(&xs, 355, &["A1", "Widget", "10$50.00", "500.00"]);
    let path = write_pdf(&dir, "merged.pdf", page);

    let order = extract(&path);

    assert_eq!(order.line_items.len(), 1);
    let item = &order.line_items[0];
    assert_eq!(item.quantity, dec!(10));
    assert_eq!(item.unit_price, dec!(50.00));
    assert_eq!(item.line_total, dec!(500.00));
}

#[test]
fn test_spreadsheet_rows_keep_sheet_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acme_quote.csv");
    fs::write(
        &path,
        "Acme Supply,Quote # 9001\n\
         Prepared for,Egate\n\
         Part,Description,Qty,Unit Price,Amount\n\
         B200,Second,1,$2.00,$2.00\n\
         A100,First,3,\"$1,000.00\",\"$3,000.00\"\n\
         C300,Third,2,4.50,9.00\n",
    )
    .unwrap();

    let order = extract(&path);

    assert_eq!(order.vendor_id, "acme");
    let numbers: Vec<&str> = order.line_items.iter().map(|i| i.item_number.as_str()).collect();
    assert_eq!(numbers, vec!["B200", "A100", "C300"]);
    assert_eq!(order.line_items[1].unit_price, dec!(1000.00));
    assert_eq!(order.line_items[1].line_total, dec!(3000.00));
    assert_eq!(order.po_number, "9001");
}

#[test]
fn test_xlsx_skip_rows_count_leading_blank_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acme_quote.xlsx");
    write_xlsx(
        &path,
        &[
            (2, &["Acme Supply", "Quote # 9001"]),
            (3, &["Part", "Description", "Qty", "Unit Price", "Amount"]),
            (4, &["A1", "Anchor", "3", "$1.00", "$3.00"]),
            (5, &["B2", "Bracket", "1", "$2.00", "$2.00"]),
        ],
    );

    let order = extract(&path);

    assert_eq!(order.vendor_id, "acme");
    let numbers: Vec<&str> = order.line_items.iter().map(|i| i.item_number.as_str()).collect();
    assert_eq!(numbers, vec!["A1", "B2"]);
    assert_eq!(order.line_items[0].quantity, dec!(3));
    assert_eq!(order.line_items[1].line_total, dec!(2.00));
}

#[test]
fn test_unknown_vendor_returns_order() {
    let dir = TempDir::new().unwrap();
    let page = Page::default()
        .text(40, 60, "Random Supplier")
        .text(40, 80, "Thank you for your business");
    let path = write_pdf(&dir, "mystery.pdf", page);

    let order = extract_purchase_order(&path).unwrap();

    assert_eq!(order.vendor_id, UNKNOWN_VENDOR);
    assert_eq!(order.po_number, NOT_FOUND);
    assert_eq!(order.customer_name, NOT_FOUND);
    assert_eq!(order.total, dec!(0));
    assert!(order.line_items.is_empty());
}

#[test]
fn test_builtin_stream_vendor() {
    let dir = TempDir::new().unwrap();
    let page = Page::default()
        .text(40, 40, "I/O South, LLC")
        .text(20, 300, "Item")
        .text(100, 300, "Description")
        .text(400, 300, "QtyCost")
        .text(470, 300, "Total")
        .text(20, 320, "A1")
        .text(100, 320, "Widget")
        .text(400, 320, "5 $120.00")
        .text(470, 320, "600.00");
    let path = write_pdf(&dir, "quote.pdf", page);

    let order = extract_purchase_order(&path).unwrap();

    assert_eq!(order.vendor_id, "iosouth");
    assert_eq!(order.vendor_name, "I/O South, LLC");
    assert_eq!(order.line_items.len(), 1);
    let item = &order.line_items[0];
    assert_eq!(item.item_number, "A1");
    assert_eq!(item.quantity, dec!(5));
    assert_eq!(item.unit_price, dec!(120.00));
    assert_eq!(item.line_total, dec!(600.00));
}

#[test]
fn test_rows_drawn_as_single_strings() {
    // Each row is one Tj; columns are aligned with spaces, so cells must be
    // split at word level against the vendor's column boundaries.
    let header = format!("{:<11}{:<52}{:<12}{}", "Item", "Description", "QtyCost", "Total");
    let row = format!("{:<11}{:<52}{:<12}{}", "A1", "Widget", "5 $120.00", "600.00");
    let dir = TempDir::new().unwrap();
    let page = Page::default()
        .text(40, 40, "I/O South, LLC")
        .text(20, 300, &header)
        .text(20, 320, &row);
    let path = write_pdf(&dir, "single_strings.pdf", page);

    let order = extract_purchase_order(&path).unwrap();

    assert_eq!(order.vendor_id, "iosouth");
    assert_eq!(order.line_items.len(), 1);
    let item = &order.line_items[0];
    assert_eq!(item.item_number, "A1");
    assert_eq!(item.description, "Widget");
    assert_eq!(item.quantity, dec!(5));
    assert_eq!(item.unit_price, dec!(120.00));
    assert_eq!(item.line_total, dec!(600.00));
}

#[test]
fn test_corrupt_pdf_is_document_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"not a pdf at all").unwrap();

    let err = extract_purchase_order(&path).unwrap_err();
    assert!(matches!(err, DocumentError::Parse(_)));
}

#[test]
fn test_missing_and_unsupported_files() {
    let dir = TempDir::new().unwrap();

    let err = extract_purchase_order(dir.path().join("absent.pdf")).unwrap_err();
    assert!(matches!(err, DocumentError::Open { .. }));

    let err = extract_purchase_order(dir.path().join("quote.docx")).unwrap_err();
    assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
}

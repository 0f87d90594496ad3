//! PDF backend built on pdf-extract's output device.
//!
//! pdf-extract decodes the fonts (simple encodings, `/Differences`,
//! ToUnicode maps, Type0 CID fonts), follows form XObjects and reports every
//! glyph with its real advance width. [`PageDevice`] groups those glyphs
//! into words and keeps stroked and filled path edges, all in top-down page
//! coordinates.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::Document;
use pdf_extract::{ColorSpace, MediaBox, OutputDev, OutputError, PathOp, Transform};
use tracing::{debug, trace, warn};

use super::layout::{self, PageLayout, Segment, Word};
use super::{RawTable, Strategy, TableBackend, TextBackend, TextBlock};
use crate::error::{DocumentError, ExtractionError};
use crate::models::{LayoutConfig, Rect};

/// A glyph further than this fraction of the font size from the end of the
/// current word starts a new word.
const WORD_GAP: f32 = 0.15;

/// A loaded PDF: per-page layouts plus the document text.
#[derive(Debug)]
pub struct PdfDocument {
    pages: Vec<PageLayout>,
    blocks: Vec<TextBlock>,
    text: String,
    layout: LayoutConfig,
}

impl PdfDocument {
    /// Read and interpret a PDF file.
    pub fn open(path: &Path, layout: LayoutConfig) -> Result<Self, DocumentError> {
        let data = std::fs::read(path).map_err(|e| DocumentError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::load(&data, layout)
    }

    /// Interpret a PDF held in memory.
    pub fn load(data: &[u8], layout: LayoutConfig) -> Result<Self, DocumentError> {
        let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::Encrypted);
            }
            doc.trailer.remove(b"Encrypt");
            debug!("Decrypted PDF with empty password");
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(DocumentError::NoPages);
        }

        let pages: Vec<PageLayout> = page_numbers
            .iter()
            .map(|&number| interpret_page(&doc, number))
            .collect();

        let page_blocks: Vec<Vec<TextBlock>> =
            pages.iter().map(|p| layout::text_blocks(p, &layout)).collect();

        let text = page_blocks
            .iter()
            .map(|b| layout::page_text(b))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let blocks = page_blocks.into_iter().next().unwrap_or_default();
        debug!(
            "Loaded PDF with {} pages, {} blocks on first page, {} chars text",
            pages.len(),
            blocks.len(),
            text.len()
        );

        Ok(Self {
            pages,
            blocks,
            text,
            layout,
        })
    }

    /// Layout of the first page.
    pub fn first_page(&self) -> Option<&PageLayout> {
        self.pages.first()
    }
}

impl TableBackend for PdfDocument {
    fn extract_tables(
        &self,
        region: &Rect,
        strategy: Strategy,
        columns: Option<&[f32]>,
    ) -> Result<Vec<RawTable>, ExtractionError> {
        let page = self
            .first_page()
            .ok_or_else(|| ExtractionError::Backend("document has no pages".to_string()))?;

        let table = match strategy {
            Strategy::Lattice => layout::lattice_table(page, region, &self.layout),
            Strategy::Stream => layout::stream_table(page, region, columns, &self.layout),
        };
        Ok(table.into_iter().collect())
    }
}

impl TextBackend for PdfDocument {
    fn full_text(&self) -> &str {
        &self.text
    }

    fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }
}

/// Run one page through pdf-extract. A page that fails, or that makes
/// pdf-extract panic on malformed content, comes back empty.
fn interpret_page(doc: &Document, number: u32) -> PageLayout {
    let mut device = PageDevice::default();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::output_doc_page(doc, &mut device, number)
    }));

    match outcome {
        Ok(Ok(())) => {
            let page = device.page.unwrap_or_default();
            trace!(
                "Page {}: {} words, {} segments",
                number,
                page.words.len(),
                page.segments.len()
            );
            page
        }
        Ok(Err(e)) => {
            warn!("Failed to interpret page {}: {}", number, e);
            PageLayout::default()
        }
        Err(_) => {
            warn!("pdf-extract panicked on page {}", number);
            PageLayout::default()
        }
    }
}

/// Word being assembled from consecutive glyphs.
#[derive(Debug)]
struct PendingWord {
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
    text: String,
}

impl PendingWord {
    fn continues_at(&self, x: f32, baseline: f32) -> bool {
        let slack = self.size * WORD_GAP;
        (baseline - self.baseline).abs() <= self.size * 0.5
            && x >= self.x1 - slack
            && x <= self.x1 + slack
    }
}

/// Collects the words and path edges of a single page.
#[derive(Debug, Default)]
struct PageDevice {
    width: f32,
    height: f32,
    word: Option<PendingWord>,
    words: Vec<Word>,
    segments: Vec<Segment>,
    page: Option<PageLayout>,
}

impl PageDevice {
    fn finish_word(&mut self) {
        if let Some(w) = self.word.take() {
            trace!("Word at ({:.1}, {:.1}) size {:.1}: {:?}", w.x0, w.baseline, w.size, w.text);
            self.words
                .push(Word::new(w.x0, w.baseline, w.x1 - w.x0, w.size, w.text));
        }
    }

    /// Record the straight edges of a painted path.
    fn add_path(&mut self, ctm: &Transform, path: &pdf_extract::Path) {
        let height = self.height;
        let to_page = |x: f64, y: f64| {
            let px = x * ctm.m11 + y * ctm.m21 + ctm.m31;
            let py = x * ctm.m12 + y * ctm.m22 + ctm.m32;
            (px as f32, height - py as f32)
        };

        let mut edges = Vec::new();
        let mut current: Option<(f32, f32)> = None;
        let mut start: Option<(f32, f32)> = None;

        for op in &path.ops {
            match *op {
                PathOp::MoveTo(x, y) => {
                    let p = to_page(x, y);
                    current = Some(p);
                    start = Some(p);
                }
                PathOp::LineTo(x, y) => {
                    let p = to_page(x, y);
                    if let Some(from) = current {
                        edges.push(Segment::new(from.0, from.1, p.0, p.1));
                    }
                    current = Some(p);
                }
                PathOp::CurveTo(_, _, _, _, x, y) => current = Some(to_page(x, y)),
                PathOp::Rect(x, y, w, h) => {
                    let corners = [
                        to_page(x, y),
                        to_page(x + w, y),
                        to_page(x + w, y + h),
                        to_page(x, y + h),
                    ];
                    for i in 0..4 {
                        let (a, b) = (corners[i], corners[(i + 1) % 4]);
                        edges.push(Segment::new(a.0, a.1, b.0, b.1));
                    }
                    current = Some(corners[0]);
                    start = Some(corners[0]);
                }
                PathOp::Close => {
                    if let (Some(from), Some(to)) = (current, start) {
                        if from != to {
                            edges.push(Segment::new(from.0, from.1, to.0, to.1));
                        }
                        current = Some(to);
                    }
                }
            }
        }

        self.segments.extend(edges);
    }
}

impl OutputDev for PageDevice {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.width = (media_box.urx - media_box.llx) as f32;
        self.height = (media_box.ury - media_box.lly) as f32;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_word();
        self.page = Some(PageLayout {
            width: self.width,
            height: self.height,
            words: std::mem::take(&mut self.words),
            segments: std::mem::take(&mut self.segments),
        });
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        if char.trim().is_empty() {
            self.finish_word();
            return Ok(());
        }

        let scale_x = trm.m11.hypot(trm.m12);
        let scale_y = trm.m21.hypot(trm.m22);
        let size = (font_size * scale_y) as f32;
        let advance = (width * font_size * scale_x) as f32;
        let x = trm.m31 as f32;
        let baseline = self.height - trm.m32 as f32;

        if !self
            .word
            .as_ref()
            .is_some_and(|w| w.continues_at(x, baseline))
        {
            self.finish_word();
        }

        match &mut self.word {
            Some(word) => {
                word.text.push_str(char);
                word.x1 = x + advance;
            }
            None => {
                self.word = Some(PendingWord {
                    x0: x,
                    x1: x + advance,
                    baseline,
                    size,
                    text: char.to_string(),
                })
            }
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn stroke(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &pdf_extract::Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }

    fn fill(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &pdf_extract::Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }
}

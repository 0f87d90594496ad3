//! Page geometry: words and ruling segments turned into lines, tables
//! and blocks.
//!
//! Everything here works in top-down page coordinates: `y` grows towards
//! the bottom of the page.

use tracing::trace;

use super::{RawTable, TextBlock};
use crate::models::{LayoutConfig, Rect};

/// A run of glyphs with no whitespace or positional break between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
    pub baseline: f32,
    pub text: String,
}

impl Word {
    /// Build a word from its baseline origin, advance width and font size.
    pub fn new(x: f32, baseline: f32, width: f32, size: f32, text: impl Into<String>) -> Self {
        Self {
            x0: x,
            x1: x + width.max(0.0),
            top: baseline - size * 0.8,
            bottom: baseline + size * 0.2,
            baseline,
            text: text.into(),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }
}

/// A straight stroked or filled path edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Segment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn length(&self) -> f32 {
        ((self.x1 - self.x0).powi(2) + (self.y1 - self.y0).powi(2)).sqrt()
    }

    pub fn midpoint(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn is_horizontal(&self, tolerance: f32) -> bool {
        (self.y1 - self.y0).abs() <= tolerance
    }

    pub fn is_vertical(&self, tolerance: f32) -> bool {
        (self.x1 - self.x0).abs() <= tolerance
    }
}

/// Interpreted content of one page.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
    pub segments: Vec<Segment>,
}

/// Words sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct Line {
    pub words: Vec<Word>,
    pub top: f32,
    pub bottom: f32,
    pub x0: f32,
    pub x1: f32,
}

impl Line {
    fn from_words(mut words: Vec<Word>) -> Self {
        words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        let top = words.iter().map(|w| w.top).fold(f32::INFINITY, f32::min);
        let bottom = words.iter().map(|w| w.bottom).fold(f32::NEG_INFINITY, f32::max);
        let x0 = words.iter().map(|w| w.x0).fold(f32::INFINITY, f32::min);
        let x1 = words.iter().map(|w| w.x1).fold(f32::NEG_INFINITY, f32::max);
        Self { words, top, bottom, x0, x1 }
    }

    pub fn text(&self) -> String {
        join_words(self.words.iter())
    }
}

fn join_words<'a>(words: impl Iterator<Item = &'a Word>) -> String {
    words.map(|w| w.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group words into lines by baseline proximity, top to bottom.
pub fn group_lines<'a>(words: impl IntoIterator<Item = &'a Word>, tolerance: f32) -> Vec<Line> {
    let mut words: Vec<&Word> = words.into_iter().filter(|r| !r.text.trim().is_empty()).collect();
    words.sort_by(|a, b| a.baseline.total_cmp(&b.baseline).then(a.x0.total_cmp(&b.x0)));

    let mut grouped: Vec<Vec<Word>> = Vec::new();
    let mut current_y = f32::NEG_INFINITY;

    for word in words {
        match grouped.last_mut() {
            Some(line) if (word.baseline - current_y).abs() < tolerance => line.push(word.clone()),
            _ => {
                grouped.push(vec![word.clone()]);
                current_y = word.baseline;
            }
        }
    }

    grouped.into_iter().map(Line::from_words).collect()
}

fn words_in<'a>(layout: &'a PageLayout, region: &'a Rect) -> impl Iterator<Item = &'a Word> {
    layout.words.iter().filter(move |w| {
        let (cx, cy) = w.center();
        region.contains(cx, cy)
    })
}

/// Column separators inferred from the horizontal projection of every word.
fn infer_columns(lines: &[Line], gap: f32) -> Vec<f32> {
    let mut spans: Vec<(f32, f32)> = lines
        .iter()
        .flat_map(|l| l.words.iter().map(|r| (r.x0, r.x1)))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bands: Vec<(f32, f32)> = Vec::new();
    for (x0, x1) in spans {
        match bands.last_mut() {
            Some(band) if x0 < band.1 + gap => band.1 = band.1.max(x1),
            _ => bands.push((x0, x1)),
        }
    }

    bands.windows(2).map(|w| (w[0].1 + w[1].0) / 2.0).collect()
}

fn column_index(separators: &[f32], x: f32) -> usize {
    separators.iter().filter(|&&s| s <= x).count()
}

/// Stream strategy: rows from baselines, columns from explicit separators or
/// from whitespace bands.
pub fn stream_table(
    layout: &PageLayout,
    region: &Rect,
    columns: Option<&[f32]>,
    config: &LayoutConfig,
) -> Option<RawTable> {
    let lines = group_lines(words_in(layout, region), config.line_y_tolerance);
    if lines.is_empty() {
        return None;
    }

    let separators = match columns {
        Some(cols) => {
            let mut cols = cols.to_vec();
            cols.sort_by(|a, b| a.total_cmp(b));
            cols
        }
        None => infer_columns(&lines, config.column_gap),
    };
    trace!("Stream table: {} lines, separators {:?}", lines.len(), separators);

    let width = separators.len() + 1;
    let rows = lines
        .iter()
        .map(|line| {
            let mut cells: Vec<Vec<&Word>> = vec![Vec::new(); width];
            for word in &line.words {
                let (cx, _) = word.center();
                cells[column_index(&separators, cx)].push(word);
            }
            cells.into_iter().map(|c| join_words(c.into_iter())).collect()
        })
        .collect();

    Some(RawTable::new(rows))
}

/// Merge nearby coordinates into single grid lines.
fn cluster(mut values: Vec<f32>, tolerance: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut clusters: Vec<(f32, usize)> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some((sum, n)) if v - *sum / *n as f32 <= tolerance => {
                *sum += v;
                *n += 1;
            }
            _ => clusters.push((v, 1)),
        }
    }
    clusters.into_iter().map(|(sum, n)| sum / n as f32).collect()
}

fn band_index(edges: &[f32], v: f32) -> Option<usize> {
    edges.windows(2).position(|w| v >= w[0] && v < w[1])
}

/// Lattice strategy: a cell grid from ruling lines. Requires at least two
/// horizontal and two vertical rulings inside the region.
pub fn lattice_table(layout: &PageLayout, region: &Rect, config: &LayoutConfig) -> Option<RawTable> {
    let tol = config.rule_tolerance;
    let mut ys = Vec::new();
    let mut xs = Vec::new();

    for seg in &layout.segments {
        let (mx, my) = seg.midpoint();
        if !region.contains(mx, my) || seg.length() < tol * 2.0 {
            continue;
        }
        if seg.is_horizontal(tol) {
            ys.push(my);
        } else if seg.is_vertical(tol) {
            xs.push(mx);
        }
    }

    let ys = cluster(ys, tol);
    let xs = cluster(xs, tol);
    if ys.len() < 2 || xs.len() < 2 {
        trace!("Lattice: {} horizontal, {} vertical rulings; not a grid", ys.len(), xs.len());
        return None;
    }

    let mut grid: Vec<Vec<Vec<Word>>> = vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
    let mut placed = 0;
    for line in group_lines(words_in(layout, region), config.line_y_tolerance) {
        for word in line.words {
            let (cx, cy) = word.center();
            if let (Some(row), Some(col)) = (band_index(&ys, cy), band_index(&xs, cx)) {
                grid[row][col].push(word);
                placed += 1;
            }
        }
    }

    if placed == 0 {
        return None;
    }

    let rows = grid
        .into_iter()
        .map(|row| row.iter().map(|c| join_words(c.iter())).collect())
        .collect();
    Some(RawTable::new(rows))
}

/// Group lines into paragraph blocks, in reading order (top to bottom, then
/// left to right).
///
/// Words on one line separated by more than twice `column_gap` start
/// separate chunks; a chunk joins the latest block it horizontally overlaps
/// when the vertical gap is at most `block_gap`.
pub fn text_blocks(layout: &PageLayout, config: &LayoutConfig) -> Vec<TextBlock> {
    let chunk_gap = config.column_gap * 2.0;
    let mut blocks: Vec<Vec<Line>> = Vec::new();

    for line in group_lines(layout.words.iter(), config.line_y_tolerance) {
        for chunk in split_chunks(line, chunk_gap) {
            let target = blocks.iter_mut().rev().find(|block| {
                let last = &block[block.len() - 1];
                let (bx0, bx1) = block_x_range(block);
                chunk.top - last.bottom <= config.block_gap
                    && chunk.top > last.top
                    && chunk.x0 < bx1
                    && chunk.x1 > bx0
            });
            match target {
                Some(block) => block.push(chunk),
                None => blocks.push(vec![chunk]),
            }
        }
    }

    let mut blocks: Vec<TextBlock> = blocks
        .into_iter()
        .map(|lines| {
            let (x0, x1) = block_x_range(&lines);
            let top = lines[0].top;
            let bottom = lines[lines.len() - 1].bottom;
            TextBlock {
                bbox: Rect::new(x0, top, x1, bottom),
                text: lines.iter().map(Line::text).collect::<Vec<_>>().join("\n"),
            }
        })
        .collect();

    blocks.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0).then(a.bbox.x0.total_cmp(&b.bbox.x0)));
    blocks
}

fn block_x_range(lines: &[Line]) -> (f32, f32) {
    let x0 = lines.iter().map(|l| l.x0).fold(f32::INFINITY, f32::min);
    let x1 = lines.iter().map(|l| l.x1).fold(f32::NEG_INFINITY, f32::max);
    (x0, x1)
}

fn split_chunks(line: Line, gap: f32) -> Vec<Line> {
    let mut chunks: Vec<Vec<Word>> = Vec::new();
    let mut right = f32::NEG_INFINITY;
    for word in line.words {
        match chunks.last_mut() {
            Some(chunk) if word.x0 - right <= gap => {
                right = right.max(word.x1);
                chunk.push(word);
            }
            _ => {
                right = word.x1;
                chunks.push(vec![word]);
            }
        }
    }
    chunks.into_iter().map(Line::from_words).collect()
}

/// Page text in block order, blocks separated by newlines.
pub fn page_text(blocks: &[TextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

//! Table-like row detection from positioned words.
//!
//! Investor-relations PDFs rarely carry real table structure, so rows are
//! rebuilt from word positions:
//!
//! 1. Bucket words by `top` rounded to the nearest point (absorbs sub-pixel
//!    baseline jitter within one visual line)
//! 2. Order each bucket by `x0` and join with `" | "`
//! 3. Keep rows that contain a `|` (two or more words) or a digit
//! 4. Split kept rows on `|` into trimmed cells
//!
//! This is position-based only. Layouts with proportional spacing and no
//! separators will be over- or under-segmented into columns.

use std::collections::BTreeMap;

use super::pdf::PdfDocumentHandle;
use super::types::{Cell, DetectedTable, PageSelector, Word};
use crate::error::Result;

/// Separator placed between words of one row.
pub const CELL_SEPARATOR: &str = " | ";

/// Build one [`DetectedTable`] per selected page that has table-like rows.
pub fn build_tables(
    doc: &dyn PdfDocumentHandle,
    selector: &PageSelector,
) -> Result<Vec<DetectedTable>> {
    let mut tables = Vec::new();
    for page in selector.resolve(doc.page_count()) {
        let words = doc.page_words(page)?;
        if let Some(table) = table_from_words(page, &words) {
            tables.push(table);
        }
    }
    Ok(tables)
}

/// Cluster a page's words into rows and keep the table-like ones.
///
/// Output depends only on word positions and text, never on input order.
#[must_use]
pub fn table_from_words(page: u32, words: &[Word]) -> Option<DetectedTable> {
    let rows: Vec<String> = cluster_rows(words)
        .into_iter()
        .filter(|row| is_table_like(row))
        .collect();

    if rows.is_empty() {
        return None;
    }

    let mut cells = Vec::new();
    let mut col_count = 0;
    for (row_idx, row) in rows.iter().enumerate() {
        let cols: Vec<&str> = row.split('|').map(str::trim).collect();
        col_count = col_count.max(cols.len());
        cells.extend(cols.into_iter().enumerate().map(|(col_idx, text)| Cell {
            row: row_idx,
            col: col_idx,
            text: text.to_string(),
        }));
    }

    Some(DetectedTable {
        page,
        title: format!("Detected table-like rows p.{page}"),
        row_count: rows.len(),
        col_count,
        cells,
    })
}

/// Group words into `" | "`-joined row strings, top to bottom.
#[must_use]
pub fn cluster_rows(words: &[Word]) -> Vec<String> {
    let mut buckets: BTreeMap<i64, Vec<&Word>> = BTreeMap::new();
    for word in words {
        #[allow(clippy::cast_possible_truncation)]
        let key = word.top.round_ties_even() as i64;
        buckets.entry(key).or_default().push(word);
    }

    buckets
        .into_values()
        .map(|mut row| {
            row.sort_by(|a, b| a.x0.total_cmp(&b.x0).then_with(|| a.text.cmp(&b.text)));
            row.iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .collect()
}

/// A row survives when it has several words or any digit.
#[must_use]
pub fn is_table_like(row: &str) -> bool {
    row.contains('|') || row.chars().any(|c| c.is_ascii_digit())
}

impl DetectedTable {
    /// Cell texts as a `rows[row][col]` grid.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut grid = vec![Vec::new(); self.row_count];
        for cell in &self.cells {
            if let Some(row) = grid.get_mut(cell.row) {
                row.push(cell.text.clone());
            }
        }
        grid
    }

    /// Render as a GitHub-flavored markdown table; short rows are padded.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let rows = self.rows();
        if rows.is_empty() || self.col_count == 0 {
            return String::new();
        }

        let mut md = String::new();
        for (i, row) in rows.iter().enumerate() {
            md.push('|');
            for col in 0..self.col_count {
                let cell = row.get(col).map_or("", String::as_str);
                md.push_str(&format!(" {cell} |"));
            }
            md.push('\n');

            if i == 0 {
                md.push('|');
                for _ in 0..self.col_count {
                    md.push_str(" --- |");
                }
                md.push('\n');
            }
        }
        md
    }
}

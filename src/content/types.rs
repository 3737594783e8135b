//! Shared types for PDF extraction.
//!
//! Coordinates follow a top-left origin in PDF points (1pt = 1/72 inch):
//! `top` grows downwards, `x0` grows to the right.

use serde::{Deserialize, Serialize};

/// A positioned character extracted from a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedChar {
    pub ch: char,
    /// Left edge.
    pub x0: f32,
    /// Right edge.
    pub x1: f32,
    /// Distance from the top of the page to the top of the glyph box.
    pub top: f32,
}

/// A word with its origin, assembled from positioned characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub top: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            top,
        }
    }
}

/// Extracted text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub text: String,
}

/// Table-like rows found on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTable {
    pub page: u32,
    pub title: String,
    #[serde(rename = "n_rows")]
    pub row_count: usize,
    #[serde(rename = "n_cols")]
    pub col_count: usize,
    pub cells: Vec<Cell>,
}

/// Which pages an extraction covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelector {
    #[default]
    All,
    /// 1-based page numbers; out-of-range entries are dropped.
    Pages(Vec<u32>),
}

impl PageSelector {
    /// `None` or an empty list select every page.
    #[must_use]
    pub fn from_option(pages: Option<Vec<u32>>) -> Self {
        match pages {
            Some(pages) if !pages.is_empty() => PageSelector::Pages(pages),
            _ => PageSelector::All,
        }
    }

    /// Resolve against a document, ascending, in-range, without duplicates.
    #[must_use]
    pub fn resolve(&self, page_count: usize) -> Vec<u32> {
        let count = u32::try_from(page_count).unwrap_or(u32::MAX);
        match self {
            PageSelector::All => (1..=count).collect(),
            PageSelector::Pages(pages) => {
                let mut valid: Vec<u32> = pages
                    .iter()
                    .copied()
                    .filter(|p| (1..=count).contains(p))
                    .collect();
                valid.sort_unstable();
                valid.dedup();
                valid
            }
        }
    }
}

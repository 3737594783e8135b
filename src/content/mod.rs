//! PDF content extraction.
//!
//! Turns downloaded PDF bytes into page text, table-like rows and the raw
//! material for metric extraction.
//!
//! # Pipeline
//!
//! | Step | Function | Output |
//! |------|----------|--------|
//! | format check | [`validate_pdf`] | bytes |
//! | decode | [`PdfEngine::with_document`] | [`PdfDocumentHandle`] |
//! | text | [`extract_text`] | [`TextBlock`] per page |
//! | tables | [`build_tables`] | [`DetectedTable`] per page |
//!
//! # Example
//!
//! ```rust
//! use irpdf::content::{extract_text, memory::MemoryDocument, PageSelector, TextOptions};
//!
//! let doc = MemoryDocument::from_texts(["Germany   net fees +2%", "France -5%"]);
//! let blocks = extract_text(&doc, &PageSelector::Pages(vec![1]), TextOptions::default()).unwrap();
//! assert_eq!(blocks[0].text, "Germany net fees +2%");
//! ```

pub mod memory;
pub mod pdf;
pub mod table;
pub mod text;
pub mod types;

use url::Url;

use crate::error::{Error, Result};

pub use pdf::{group_words, PdfDocumentHandle, PdfEngine};
pub use table::{build_tables, cluster_rows, table_from_words};
pub use text::{extract_text, normalize_whitespace, TextOptions};
pub use types::{Cell, DetectedTable, PageSelector, PositionedChar, TextBlock, Word};

/// Accept `bytes` as a PDF when the declared content type mentions `pdf` or
/// the URL path ends in `.pdf`.
///
/// A cheap heuristic: the body's magic bytes are not inspected.
pub fn validate_pdf<'a>(bytes: &'a [u8], url: &str, content_type: Option<&str>) -> Result<&'a [u8]> {
    let declared = content_type.unwrap_or("");
    if declared.to_ascii_lowercase().contains("pdf") || path_is_pdf(url) {
        Ok(bytes)
    } else {
        Err(Error::NotAPdf {
            url: url.to_string(),
            content_type: declared.to_string(),
        })
    }
}

fn path_is_pdf(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(
        |_| url.split(['?', '#']).next().unwrap_or(url).to_string(),
        |u| u.path().to_string(),
    );
    path.to_ascii_lowercase().ends_with(".pdf")
}

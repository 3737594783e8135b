//! Per-page text extraction with optional whitespace normalization.

use std::sync::LazyLock;

use regex::Regex;

use super::pdf::PdfDocumentHandle;
use super::types::{PageSelector, TextBlock};
use crate::error::Result;

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").expect("valid regex"));
static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    /// Collapse space/tab runs and 3+ newlines.
    pub dedupe_whitespace: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            dedupe_whitespace: true,
        }
    }
}

/// Extract one [`TextBlock`] per selected page, ascending by page.
pub fn extract_text(
    doc: &dyn PdfDocumentHandle,
    selector: &PageSelector,
    options: TextOptions,
) -> Result<Vec<TextBlock>> {
    selector
        .resolve(doc.page_count())
        .into_iter()
        .map(|page| {
            let raw = doc.page_text(page)?;
            let text = if options.dedupe_whitespace {
                normalize_whitespace(&raw)
            } else {
                raw
            };
            Ok(TextBlock { page, text })
        })
        .collect()
}

/// Fold CR and CRLF breaks to LF, then collapse space/tab runs to one space
/// and 3+ newlines to two.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    let unix = LINE_BREAKS.replace_all(text, "\n");
    let collapsed = HORIZONTAL_WS.replace_all(&unix, " ");
    BLANK_RUNS.replace_all(&collapsed, "\n\n").into_owned()
}

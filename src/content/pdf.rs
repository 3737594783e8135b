//! PDF document access via pdfium.
//!
//! Uses `pdfium-render` (Chromium's PDF library) to read per-page text and
//! character positions. Characters are grouped into positioned [`Word`]s the
//! same way for every page:
//!
//! ```text
//! PDF bytes → pdfium chars → word grouping (x/y tolerance) → Word { text, x0, top }
//! ```
//!
//! Documents are only reachable inside [`PdfEngine::with_document`], so the
//! pdfium handle is released when the closure returns, success or not.

use std::path::PathBuf;

use pdfium_render::prelude::*;
use tracing::debug;

use super::types::{PositionedChar, Word};
use crate::error::{Error, Result};

/// Horizontal gap (points) that ends a word.
pub const X_TOLERANCE: f32 = 3.0;

/// Vertical offset (points) that ends a word.
pub const Y_TOLERANCE: f32 = 3.0;

/// Read access to a decoded PDF.
pub trait PdfDocumentHandle {
    fn page_count(&self) -> usize;

    /// Raw text of a 1-based page; empty when the page has no text layer.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Positioned words of a 1-based page.
    fn page_words(&self, page: u32) -> Result<Vec<Word>>;
}

/// Opens PDF bytes with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    /// Directory holding the pdfium shared library; system lookup when unset.
    library_dir: Option<PathBuf>,
}

impl PdfEngine {
    #[must_use]
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Error::PdfDecodeFailure(format!("pdfium library unavailable: {e}")))?;
        Ok(Pdfium::new(bindings))
    }

    /// Decode `bytes` and run `f` against the document.
    ///
    /// Blocking; call from `spawn_blocking` in async contexts.
    pub fn with_document<T>(
        &self,
        bytes: &[u8],
        f: impl FnOnce(&dyn PdfDocumentHandle) -> Result<T>,
    ) -> Result<T> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| Error::PdfDecodeFailure(e.to_string()))?;
        let handle = PdfiumDocument { document };
        debug!(pages = handle.page_count(), "PDF opened");
        f(&handle)
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, page: u32) -> Result<PdfPage<'a>> {
        let index = page
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| Error::PdfDecodeFailure(format!("page {page} out of range")))?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| Error::PdfDecodeFailure(format!("page {page}: {e}")))
    }
}

impl PdfDocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        usize::from(self.document.pages().len())
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let pdf_page = self.page(page)?;
        // Pages without a text layer (scans) have nothing to give.
        Ok(lf_line_breaks(&pdf_page.text().map(|t| t.all()).unwrap_or_default()))
    }

    #[allow(deprecated)] // PdfRect field access deprecated in 0.8.28, removed in 0.9.0
    fn page_words(&self, page: u32) -> Result<Vec<Word>> {
        let pdf_page = self.page(page)?;
        let height = pdf_page.height().value;
        let Ok(text) = pdf_page.text() else {
            return Ok(Vec::new());
        };

        let mut chars = Vec::new();
        for ch in text.chars().iter() {
            if let (Some(unicode_ch), Ok(rect)) = (ch.unicode_char(), ch.tight_bounds()) {
                chars.push(PositionedChar {
                    ch: unicode_ch,
                    x0: rect.left.value,
                    x1: rect.right.value,
                    top: height - rect.top.value,
                });
            }
        }

        Ok(group_words(&chars))
    }
}

/// pdfium breaks lines with CRLF; callers see LF only.
fn lf_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Group characters (in content order) into words.
///
/// A word ends at whitespace, at a horizontal gap wider than
/// [`X_TOLERANCE`], or when the next character sits more than
/// [`Y_TOLERANCE`] above or below the word.
#[must_use]
pub fn group_words(chars: &[PositionedChar]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<(String, f32, f32, f32)> = None; // text, x0, x1, top

    for ch in chars {
        if ch.ch.is_whitespace() {
            if let Some((text, x0, _, top)) = current.take() {
                words.push(Word { text, x0, top });
            }
            continue;
        }

        let continues = current.as_ref().is_some_and(|(_, _, x1, top)| {
            (ch.x0 - x1).abs() <= X_TOLERANCE && (ch.top - top).abs() <= Y_TOLERANCE
        });

        if continues {
            if let Some((text, _, x1, top)) = current.as_mut() {
                text.push(ch.ch);
                *x1 = ch.x1;
                *top = top.min(ch.top);
            }
        } else {
            if let Some((text, x0, _, top)) = current.take() {
                words.push(Word { text, x0, top });
            }
            current = Some((ch.ch.to_string(), ch.x0, ch.x1, ch.top));
        }
    }

    if let Some((text, x0, _, top)) = current {
        words.push(Word { text, x0, top });
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_line_breaks_become_lf() {
        assert_eq!(
            lf_line_breaks("Interim results\r\nGermany +2%\rFrance -5%\n"),
            "Interim results\nGermany +2%\nFrance -5%\n"
        );
    }

    fn chars(text: &str, x_start: f32, top: f32, width: f32) -> Vec<PositionedChar> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| {
                let x0 = x_start + i as f32 * width;
                PositionedChar {
                    ch,
                    x0,
                    x1: x0 + width,
                    top,
                }
            })
            .collect()
    }

    #[test]
    fn group_words_empty() {
        assert!(group_words(&[]).is_empty());
    }

    #[test]
    fn group_words_splits_on_whitespace() {
        let words = group_words(&chars("Net fees", 10.0, 100.0, 5.0));
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["Net", "fees"]);
        assert_eq!(words[0].x0, 10.0);
        assert_eq!(words[1].x0, 30.0);
    }

    #[test]
    fn group_words_splits_on_wide_gap() {
        let mut input = chars("Germany", 10.0, 100.0, 5.0);
        input.extend(chars("42", 120.0, 100.0, 5.0));
        let words = group_words(&input);
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].text, "42");
        assert_eq!(words[1].x0, 120.0);
    }

    #[test]
    fn group_words_splits_on_line_change() {
        let mut input = chars("ab", 10.0, 100.0, 5.0);
        input.extend(chars("cd", 20.0, 120.0, 5.0));
        let words = group_words(&input);
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].top, 120.0);
    }

    #[test]
    fn group_words_keeps_smallest_top() {
        let mut input = chars("x", 10.0, 100.0, 5.0);
        input.extend(chars("y", 15.0, 98.5, 5.0));
        let words = group_words(&input);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].top, 98.5);
    }
}

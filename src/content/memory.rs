//! In-memory document handle.
//!
//! Holds already decoded pages. Used by tests and by callers that obtained
//! text and word positions from another source.

use super::pdf::PdfDocumentHandle;
use super::types::Word;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub text: String,
    pub words: Vec<Word>,
}

impl MemoryPage {
    /// A page with text only; words are derived from whitespace-separated
    /// tokens, one visual line per text line.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let words = text
            .lines()
            .enumerate()
            .flat_map(|(line_idx, line)| {
                let top = 100.0 + line_idx as f32 * 14.0;
                line.split_whitespace()
                    .scan(0.0_f32, move |x, token| {
                        let word = Word::new(token, 50.0 + *x, top);
                        *x += (token.chars().count() as f32 + 1.0) * 6.0;
                        Some(word)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { text, words }
    }

    #[must_use]
    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.words = words;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(MemoryPage::from_text).collect())
    }

    fn page(&self, page: u32) -> Result<&MemoryPage> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or_else(|| Error::PdfDecodeFailure(format!("page {page} out of range")))
    }
}

impl PdfDocumentHandle for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        Ok(self.page(page)?.text.clone())
    }

    fn page_words(&self, page: u32) -> Result<Vec<Word>> {
        Ok(self.page(page)?.words.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_lays_out_words_per_line() {
        let page = MemoryPage::from_text("Germany 42\nFrance 7");
        assert_eq!(page.words.len(), 4);
        assert_eq!(page.words[0].top, page.words[1].top);
        assert!(page.words[2].top > page.words[0].top);
        assert!(page.words[1].x0 > page.words[0].x0);
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let doc = MemoryDocument::from_texts(["only page"]);
        assert_eq!(doc.page_count(), 1);
        assert!(doc.page_text(2).is_err());
        assert!(doc.page_text(0).is_err());
    }
}

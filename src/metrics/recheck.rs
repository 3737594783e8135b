//! Second pass over page text for countries that produced no metric.
//!
//! A country counts as found when any of its spellings appears as a whole
//! word, case-sensitively, anywhere in the document. Found countries leave
//! `not_disclosed`; no metric items are created.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use super::patterns::MetricPatterns;

/// Return `not_disclosed` minus every country mentioned in `pages`,
/// preserving order.
#[must_use]
pub fn recheck(
    pages: &[(u32, String)],
    not_disclosed: &[String],
    patterns: &MetricPatterns,
) -> Vec<String> {
    let found: HashSet<&str> = not_disclosed
        .iter()
        .filter(|country| mentioned(pages, &patterns.spellings(country)))
        .map(String::as_str)
        .collect();

    if !found.is_empty() {
        debug!(?found, "Recheck found mentions of undisclosed countries");
    }

    not_disclosed
        .iter()
        .filter(|country| !found.contains(country.as_str()))
        .cloned()
        .collect()
}

fn mentioned(pages: &[(u32, String)], spellings: &[String]) -> bool {
    spellings.iter().any(|spelling| {
        let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(spelling))) else {
            return false;
        };
        pages.iter().any(|(_, text)| re.is_match(text))
    })
}

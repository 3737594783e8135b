//! Country-level metric extraction.
//!
//! Scans page text for `country … value%` patterns, classifies each hit by
//! metric and reporting basis, then works out which requested countries
//! were not disclosed. When enough countries look undisclosed a recheck
//! pass ([`recheck`]) looks for bare mentions before reporting them.
//!
//! ```text
//! page text → MetricPatterns::metric_regex → windows → Basis / metric name → filters
//!                                                                               │
//!                                  not_disclosed ≥ threshold → recheck ←────────┘
//! ```

pub mod patterns;
pub mod recheck;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::PdfDocumentHandle;
use crate::error::Result;

pub use patterns::{MetricPatterns, GROSS_PROFIT_METRIC, NET_FEES_METRIC};

/// Recheck runs once this many requested countries look undisclosed.
pub const DEFAULT_RECHECK_THRESHOLD: usize = 3;

/// Reporting convention of a percentage metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Basis {
    #[serde(rename = "Like-for-like")]
    LikeForLike,
    #[serde(rename = "Constant FX")]
    ConstantFx,
    /// Accepted in filters and output, never assigned by the current rules.
    Underlying,
    Reported,
    Unknown,
}

/// One extracted metric. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricItem {
    pub company: String,
    /// Not populated by any rule yet.
    pub report_title: Option<String>,
    /// Not populated by any rule yet.
    pub report_date: Option<String>,
    pub country: String,
    /// Not populated by any rule yet.
    pub region: Option<String>,
    #[serde(rename = "metric")]
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub period_label: String,
    pub basis: Basis,
    pub source_text: String,
    pub page: u32,
    /// Not populated by any rule yet.
    pub table_title: Option<String>,
    /// Not populated by any rule yet.
    pub footnote_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricExtractionResult {
    pub items: Vec<MetricItem>,
    pub not_disclosed: Vec<String>,
    pub recheck_performed: bool,
}

/// Per-request inputs.
#[derive(Debug, Clone, Default)]
pub struct MetricRequest {
    /// Company display name written into every item.
    pub company: String,
    pub period_label: String,
    /// Allow-list of metric names.
    pub metrics: Option<Vec<String>>,
    /// Allow-list of countries; also the basis of `not_disclosed`.
    pub countries: Option<Vec<String>>,
}

/// Pattern-driven extractor with a configurable recheck threshold.
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    patterns: Arc<MetricPatterns>,
    recheck_threshold: usize,
}

impl MetricExtractor {
    #[must_use]
    pub fn new(patterns: Arc<MetricPatterns>) -> Self {
        Self {
            patterns,
            recheck_threshold: DEFAULT_RECHECK_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_recheck_threshold(mut self, threshold: usize) -> Self {
        self.recheck_threshold = threshold;
        self
    }

    /// Extract metrics from every page of `doc`.
    pub fn extract(
        &self,
        doc: &dyn PdfDocumentHandle,
        request: &MetricRequest,
    ) -> Result<MetricExtractionResult> {
        let page_count = u32::try_from(doc.page_count()).unwrap_or(u32::MAX);
        let pages = (1..=page_count)
            .map(|page| Ok((page, doc.page_text(page)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.extract_from_pages(&pages, request))
    }

    /// Extract metrics from `(page, text)` pairs, pages ascending.
    #[must_use]
    pub fn extract_from_pages(
        &self,
        pages: &[(u32, String)],
        request: &MetricRequest,
    ) -> MetricExtractionResult {
        let mut items = Vec::new();
        for (page, text) in pages {
            items.extend(
                self.scan_page(*page, text, request)
                    .into_iter()
                    .filter(|item| passes_filters(item, request)),
            );
        }

        let not_disclosed: Vec<String> = request
            .countries
            .iter()
            .flatten()
            .filter(|wanted| {
                !items
                    .iter()
                    .any(|item| item.country.eq_ignore_ascii_case(wanted))
            })
            .cloned()
            .collect();

        let (not_disclosed, recheck_performed) = if not_disclosed.len() >= self.recheck_threshold
        {
            debug!(
                undisclosed = not_disclosed.len(),
                threshold = self.recheck_threshold,
                "Running disclosure recheck"
            );
            (recheck::recheck(pages, &not_disclosed, &self.patterns), true)
        } else {
            (not_disclosed, false)
        };

        info!(
            items = items.len(),
            not_disclosed = not_disclosed.len(),
            recheck_performed,
            "Metric extraction complete"
        );

        MetricExtractionResult {
            items,
            not_disclosed,
            recheck_performed,
        }
    }

    /// Every pattern hit on one page, classified but not yet filtered.
    fn scan_page(&self, page: u32, text: &str, request: &MetricRequest) -> Vec<MetricItem> {
        let hits: Vec<(usize, usize, String, String)> = self
            .patterns
            .metric_regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some((
                    whole.start(),
                    whole.end(),
                    caps.name("country")?.as_str().to_string(),
                    caps.name("value")?.as_str().to_string(),
                ))
            })
            .collect();

        let mut items = Vec::with_capacity(hits.len());
        for (i, (start, end, country, value)) in hits.iter().enumerate() {
            let Ok(value) = value.parse::<f64>() else {
                continue;
            };

            let source_start = chars_before(text, *start, patterns::CONTEXT_BEFORE);
            let source_end = chars_after(text, *end, patterns::CONTEXT_AFTER);

            let window_end = match hits.get(i + 1) {
                Some((next_start, _, _, _)) => source_end.min(*next_start),
                None => source_end,
            };
            // The previous hit and its trailing context are cut out; text
            // before it still qualifies every country that follows.
            let window = match i.checked_sub(1).and_then(|p| hits.get(p)) {
                Some((prev_start, prev_end, _, _)) => {
                    let lead = &text[source_start..source_start.max(*prev_start)];
                    let rest_start = source_start
                        .max(chars_after(text, *prev_end, patterns::CONTEXT_AFTER).min(*start));
                    format!("{lead} {}", &text[rest_start..window_end])
                }
                None => text[source_start..window_end].to_string(),
            };

            items.push(MetricItem {
                company: request.company.clone(),
                report_title: None,
                report_date: None,
                country: self.patterns.canonical_country(country),
                region: None,
                metric_name: self.patterns.classify_metric(&window).to_string(),
                value,
                unit: "%".to_string(),
                period_label: request.period_label.clone(),
                basis: self.patterns.classify_basis(&window),
                source_text: text[source_start..source_end]
                    .replace(['\r', '\n'], " ")
                    .trim()
                    .to_string(),
                page,
                table_title: None,
                footnote_refs: Vec::new(),
            });
        }
        items
    }
}

fn passes_filters(item: &MetricItem, request: &MetricRequest) -> bool {
    let metric_ok = request.metrics.as_ref().map_or(true, |allowed| {
        allowed.is_empty() || allowed.iter().any(|m| m.eq_ignore_ascii_case(&item.metric_name))
    });
    let country_ok = request.countries.as_ref().map_or(true, |allowed| {
        allowed.is_empty() || allowed.iter().any(|c| c.eq_ignore_ascii_case(&item.country))
    });
    metric_ok && country_ok
}

/// Byte index `n` characters before `idx` (or 0).
fn chars_before(text: &str, idx: usize, n: usize) -> usize {
    if n == 0 {
        return idx;
    }
    text[..idx]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte index `n` characters after `idx` (or the end).
fn chars_after(text: &str, idx: usize, n: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(i, _)| idx + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MetricExtractor {
        MetricExtractor::new(Arc::new(MetricPatterns::default_set().unwrap()))
    }

    fn request(countries: Option<&[&str]>) -> MetricRequest {
        MetricRequest {
            company: "Hays plc".into(),
            period_label: "FY24".into(),
            metrics: None,
            countries: countries.map(|c| c.iter().map(|s| (*s).to_string()).collect()),
        }
    }

    fn pages(texts: &[&str]) -> Vec<(u32, String)> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32 + 1, (*t).to_string()))
            .collect()
    }

    #[test]
    fn classifies_each_hit_from_its_own_context() {
        let result = extractor().extract_from_pages(
            &pages(&["Germany net fees +2% (LFL) while France gross profit -5% reported"]),
            &request(None),
        );
        assert_eq!(result.items.len(), 2);

        let germany = &result.items[0];
        assert_eq!(germany.country, "Germany");
        assert_eq!(germany.metric_name, NET_FEES_METRIC);
        assert!((germany.value - 2.0).abs() < f64::EPSILON);
        assert_eq!(germany.basis, Basis::LikeForLike);

        let france = &result.items[1];
        assert_eq!(france.country, "France");
        assert_eq!(france.metric_name, GROSS_PROFIT_METRIC);
        assert!((france.value + 5.0).abs() < f64::EPSILON);
        assert_eq!(france.basis, Basis::Reported);
    }

    #[test]
    fn shared_leading_qualifier_applies_to_every_country() {
        let result = extractor().extract_from_pages(
            &pages(&["Like-for-like net fees: Germany +2%, France -5%, Japan +3%"]),
            &request(None),
        );
        let classified: Vec<_> = result
            .items
            .iter()
            .map(|i| (i.country.as_str(), i.metric_name.as_str(), i.basis))
            .collect();
        assert_eq!(
            classified,
            [
                ("Germany", NET_FEES_METRIC, Basis::LikeForLike),
                ("France", NET_FEES_METRIC, Basis::LikeForLike),
                ("Japan", NET_FEES_METRIC, Basis::LikeForLike),
            ]
        );
    }

    #[test]
    fn source_text_drops_carriage_returns() {
        let result = extractor().extract_from_pages(
            &pages(&["Outlook\r\n\r\nGermany net fees +2% like-for-like\r\nNext"]),
            &request(None),
        );
        let source = &result.items[0].source_text;
        assert!(!source.contains('\r'), "{source:?}");
        assert!(source.starts_with("Outlook"), "{source:?}");
        assert!(source.contains("Germany net fees +2%"), "{source:?}");
    }

    #[test]
    fn uk_normalises_to_united_kingdom() {
        let result = extractor()
            .extract_from_pages(&pages(&["UK net fees down 4% in constant currency"]), &request(None));
        assert_eq!(result.items[0].country, "United Kingdom");
        assert_eq!(result.items[0].basis, Basis::ConstantFx);
        assert!((result.items[0].value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn source_text_is_flattened_window() {
        let text = format!("{}\nGermany fees +2%\n{}", "x".repeat(100), "y".repeat(100));
        let result = extractor().extract_from_pages(&pages(&[&text]), &request(None));
        let source = &result.items[0].source_text;
        assert!(!source.contains('\n'));
        assert!(source.contains("Germany fees +2%"));
        // 60 before (59 x + flattened newline), match, 40 after
        assert_eq!(source.chars().count(), 59 + 1 + 16 + 1 + 39);
    }

    #[test]
    fn items_carry_page_and_placeholders() {
        let result = extractor().extract_from_pages(
            &pages(&["no metrics here", "Japan headcount 3%"]),
            &request(None),
        );
        let item = &result.items[0];
        assert_eq!(item.page, 2);
        assert_eq!(item.company, "Hays plc");
        assert_eq!(item.period_label, "FY24");
        assert_eq!(item.unit, "%");
        assert_eq!(item.basis, Basis::Unknown);
        assert!(item.report_title.is_none() && item.region.is_none());
        assert!(item.footnote_refs.is_empty());
    }

    #[test]
    fn filters_drop_items() {
        let mut req = request(Some(&["France"]));
        req.metrics = Some(vec![GROSS_PROFIT_METRIC.to_string()]);
        let result = extractor().extract_from_pages(
            &pages(&["Germany net fees +2% (LFL) while France gross profit -5% reported"]),
            &req,
        );
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].country, "France");
    }

    #[test]
    fn undisclosed_countries_below_threshold_skip_recheck() {
        let result = extractor().extract_from_pages(
            &pages(&["Germany net fees +2% (LFL) while France gross profit -5% reported"]),
            &request(Some(&["Germany", "France", "Japan"])),
        );
        assert_eq!(result.not_disclosed, vec!["Japan"]);
        assert!(!result.recheck_performed);
    }

    #[test]
    fn no_matches_is_an_empty_result() {
        let result = extractor().extract_from_pages(&pages(&["nothing to see"]), &request(None));
        assert!(result.items.is_empty());
        assert!(result.not_disclosed.is_empty());
        assert!(!result.recheck_performed);
    }

    #[test]
    fn country_must_be_a_whole_word() {
        let result =
            extractor().extract_from_pages(&pages(&["Duke of Ukraine grew 5%"]), &request(None));
        assert!(result.items.is_empty());
    }

    #[test]
    fn basis_serializes_with_display_names() {
        assert_eq!(
            serde_json::to_string(&Basis::LikeForLike).unwrap(),
            "\"Like-for-like\""
        );
        assert_eq!(
            serde_json::to_string(&Basis::ConstantFx).unwrap(),
            "\"Constant FX\""
        );
    }

    #[test]
    fn char_windows_respect_utf8_boundaries() {
        let text = "€€€ abc";
        assert_eq!(chars_before(text, text.len(), 3), text.len() - 3);
        assert_eq!(chars_before(text, 6, 10), 0);
        assert_eq!(chars_after(text, 0, 2), 6);
        assert_eq!(chars_after(text, 0, 100), text.len());
    }
}

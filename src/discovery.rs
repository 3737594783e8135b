//! Report link discovery on investor-relations results pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::allowlist::HostAllowlist;

/// Links whose title or URL mention any of these are policy/ESG documents.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "sustainability",
    "esg",
    "human rights",
    "modern slavery",
    "tax strategy",
    "gender pay",
    "gri",
    "privacy",
    "policy",
];

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 20;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// A PDF linked from a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLink {
    pub title: String,
    pub pdf_url: String,
    pub source_page: String,
}

/// Collect same-site PDF links from `html`, in document order.
///
/// Relative hrefs are resolved against `base_url`; links off the allowlist
/// and repeats of an already-seen URL are dropped.
pub fn discover_pdfs(html: &str, base_url: &Url, allowlist: &HostAllowlist) -> Vec<ReportLink> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for element in document.select(&ANCHORS) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        let Ok(full) = base_url.join(href) else {
            continue;
        };
        if !full.as_str().to_ascii_lowercase().ends_with(".pdf") || !allowlist.allows(&full) {
            continue;
        }
        if !seen.insert(full.to_string()) {
            continue;
        }

        let text = element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let title = if text.is_empty() {
            last_segment(&full)
        } else {
            text
        };

        links.push(ReportLink {
            title,
            pdf_url: full.to_string(),
            source_page: base_url.to_string(),
        });
    }

    links
}

fn last_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .unwrap_or_default()
}

/// Keep reports matching the filters, at most `limit` (clamped to 1..=20).
///
/// `report_type` is a comma-separated list of keywords, any of which must
/// appear in the title or URL. Matching is case-insensitive.
pub fn filter_reports(
    links: Vec<ReportLink>,
    report_type: Option<&str>,
    exclude_esg: bool,
    limit: Option<usize>,
) -> Vec<ReportLink> {
    let positives: Vec<String> = report_type
        .map(|rt| {
            rt.split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    links
        .into_iter()
        .filter(|link| {
            let title = link.title.to_lowercase();
            let url = link.pdf_url.to_lowercase();
            let mentions = |k: &str| title.contains(k) || url.contains(k);
            if exclude_esg && NEGATIVE_KEYWORDS.iter().any(|k| mentions(k)) {
                return false;
            }
            positives.is_empty() || positives.iter().any(|k| mentions(k))
        })
        .take(limit)
        .collect()
}

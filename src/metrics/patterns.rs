//! Pattern set for country-level metric extraction.
//!
//! Everything the extractor matches against lives in one immutable
//! [`MetricPatterns`] value, so alternative country lists or keyword sets can
//! be injected without touching extraction code.

use regex::Regex;

use super::Basis;
use crate::error::{Error, Result};

/// Metric name for fee-based growth figures.
pub const NET_FEES_METRIC: &str = "Net Fees YoY %";

/// Metric name for everything else.
pub const GROSS_PROFIT_METRIC: &str = "Gross Profit YoY %";

/// Countries recognised by default, in canonical spelling.
pub const DEFAULT_COUNTRIES: &[&str] = &[
    "Germany",
    "United Kingdom",
    "France",
    "Australia",
    "Netherlands",
    "Belgium",
    "Spain",
    "Portugal",
    "Italy",
    "Japan",
    "China",
    "Hong Kong",
    "Singapore",
    "USA",
    "United States",
    "Canada",
    "Switzerland",
    "Austria",
    "Ireland",
    "Poland",
    "Czech Republic",
    "UAE",
    "United Arab Emirates",
    "New Zealand",
    "India",
    "Brazil",
    "Chile",
    "Mexico",
];

/// `(alias, canonical)` pairs.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("UK", "United Kingdom")];

/// Domain keywords that may sit between a country and its value.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "net fees",
    "gross profit",
    "fees",
    "consultants",
    "headcount",
];

/// Characters of context kept before a match.
pub const CONTEXT_BEFORE: usize = 60;

/// Characters of context kept after a match.
pub const CONTEXT_AFTER: usize = 40;

#[derive(Debug, Clone)]
pub struct MetricPatterns {
    countries: Vec<String>,
    aliases: Vec<(String, String)>,
    metric: Regex,
    like_for_like: Regex,
    constant_fx: Regex,
    reported: Regex,
    fees: Regex,
}

impl MetricPatterns {
    /// Compile a pattern set.
    ///
    /// The value is captured by the named group `value`, the country by
    /// `country`, whatever the size of the country alternation.
    pub fn new(
        countries: Vec<String>,
        aliases: Vec<(String, String)>,
        keywords: &[String],
    ) -> Result<Self> {
        let mut names: Vec<&str> = countries
            .iter()
            .map(String::as_str)
            .chain(aliases.iter().map(|(alias, _)| alias.as_str()))
            .collect();
        if names.is_empty() {
            return Err(Error::Internal("metric patterns need at least one country".into()));
        }
        // Longest first so "United Arab Emirates" is never cut short.
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));

        let country_alt = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let keyword_alt = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let keyword_part = if keyword_alt.is_empty() {
            String::new()
        } else {
            format!("(?:{keyword_alt})?.*?")
        };

        let pattern = format!(
            r"(?i)\b(?P<country>{country_alt})\b.*?{keyword_part}(?P<value>[+\-]?\d+(?:\.\d+)?)\s*%"
        );

        Ok(Self {
            countries,
            aliases,
            metric: compile(&pattern)?,
            like_for_like: compile(r"(?i)\bLFL\b|like[- ]for[- ]like")?,
            constant_fx: compile(r"(?i)constant (?:fx|currency)")?,
            reported: compile(r"(?i)\breported\b")?,
            fees: compile(r"(?i)net fees|fees")?,
        })
    }

    /// The built-in pattern set.
    pub fn default_set() -> Result<Self> {
        Self::new(
            DEFAULT_COUNTRIES.iter().map(|c| (*c).to_string()).collect(),
            DEFAULT_ALIASES
                .iter()
                .map(|(a, c)| ((*a).to_string(), (*c).to_string()))
                .collect(),
            &DEFAULT_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect::<Vec<_>>(),
        )
    }

    pub(crate) fn metric_regex(&self) -> &Regex {
        &self.metric
    }

    /// Canonical spelling of a matched country name or alias.
    #[must_use]
    pub fn canonical_country(&self, matched: &str) -> String {
        if let Some((_, canonical)) = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(matched))
        {
            return canonical.clone();
        }
        self.countries
            .iter()
            .find(|c| c.eq_ignore_ascii_case(matched))
            .cloned()
            .unwrap_or_else(|| matched.to_string())
    }

    /// Every spelling that refers to `country`: itself, its canonical form
    /// and that form's aliases.
    #[must_use]
    pub fn spellings(&self, country: &str) -> Vec<String> {
        let canonical = self.canonical_country(country);
        let mut out = vec![country.to_string()];
        if canonical != country {
            out.push(canonical.clone());
        }
        out.extend(
            self.aliases
                .iter()
                .filter(|(_, c)| *c == canonical)
                .map(|(alias, _)| alias.clone()),
        );
        out
    }

    /// Basis named in a context window; first rule that matches wins.
    ///
    /// `Underlying` is never produced by this rule set.
    #[must_use]
    pub fn classify_basis(&self, window: &str) -> Basis {
        if self.like_for_like.is_match(window) {
            Basis::LikeForLike
        } else if self.constant_fx.is_match(window) {
            Basis::ConstantFx
        } else if self.reported.is_match(window) {
            Basis::Reported
        } else {
            Basis::Unknown
        }
    }

    #[must_use]
    pub fn classify_metric(&self, window: &str) -> &'static str {
        if self.fees.is_match(window) {
            NET_FEES_METRIC
        } else {
            GROSS_PROFIT_METRIC
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Internal(format!("invalid metric pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> MetricPatterns {
        MetricPatterns::default_set().unwrap()
    }

    #[test]
    fn uk_alias_is_canonicalised() {
        let p = patterns();
        assert_eq!(p.canonical_country("UK"), "United Kingdom");
        assert_eq!(p.canonical_country("uk"), "United Kingdom");
        assert_eq!(p.canonical_country("GERMANY"), "Germany");
    }

    #[test]
    fn spellings_include_aliases() {
        let p = patterns();
        assert_eq!(p.spellings("United Kingdom"), vec!["United Kingdom", "UK"]);
        assert_eq!(p.spellings("Japan"), vec!["Japan"]);
    }

    #[test]
    fn basis_priority_order() {
        let p = patterns();
        assert_eq!(p.classify_basis("+2% LFL, reported 5%"), Basis::LikeForLike);
        assert_eq!(p.classify_basis("like-for-like"), Basis::LikeForLike);
        assert_eq!(p.classify_basis("in constant currency, reported"), Basis::ConstantFx);
        assert_eq!(p.classify_basis("Constant FX"), Basis::ConstantFx);
        assert_eq!(p.classify_basis("as reported"), Basis::Reported);
        assert_eq!(p.classify_basis("unreported figures"), Basis::Unknown);
        assert_eq!(p.classify_basis("growth"), Basis::Unknown);
    }

    #[test]
    fn metric_name_from_fee_keywords() {
        let p = patterns();
        assert_eq!(p.classify_metric("Net Fees up"), NET_FEES_METRIC);
        assert_eq!(p.classify_metric("fees"), NET_FEES_METRIC);
        assert_eq!(p.classify_metric("gross profit"), GROSS_PROFIT_METRIC);
    }

    #[test]
    fn value_uses_named_group_whatever_the_alternation() {
        let p = MetricPatterns::new(
            vec!["Atlantis".into()],
            vec![],
            &["fees".to_string()],
        )
        .unwrap();
        let caps = p.metric_regex().captures("Atlantis fees -3.5 %").unwrap();
        assert_eq!(&caps["country"], "Atlantis");
        assert_eq!(&caps["value"], "-3.5");
    }

    #[test]
    fn empty_country_list_is_rejected() {
        assert!(MetricPatterns::new(vec![], vec![], &[]).is_err());
    }
}

//! Ordered-fallback fetch chain.
//!
//! Different origins enforce different TLS, HTTP-version and fingerprint
//! policies, so no single client configuration serves every target. The
//! chain walks a fixed list of [`FetchStrategy`] descriptors and stops at
//! the first one that produces a usable response.
//!
//! # Architecture
//!
//! - [`FetchStrategy`]: pure configuration for one attempt
//! - [`Transport`]: executes a strategy, returns a tagged [`AttemptOutcome`]
//! - [`FetchChain`]: allowlist check, cache busting, ordered attempts
//!
//! ```text
//! url → HostAllowlist::check → [strategy 1] ─fail→ [strategy 2] ─fail→ … → FetchExhausted
//!                                   │ok               │ok
//!                                   ▼                 ▼
//!                              FetchedContent    FetchedContent
//! ```

pub mod strategy;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::allowlist::{FetchTarget, HostAllowlist};
use crate::error::{Error, Result};

pub use strategy::{
    default_chain, CipherPolicy, FetchStrategy, HttpVersion, Identity, TlsPolicy, TlsVersion,
};
pub use transport::ReqwestTransport;

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for a whole chain run when none is configured.
pub const DEFAULT_CHAIN_DEADLINE: Duration = Duration::from_secs(120);

/// What the caller expects to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Html,
    Pdf,
}

/// A successful response body and where it came from.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub strategy_id: String,
}

impl FetchedContent {
    /// Body decoded as UTF-8, lossy.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of executing one strategy.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The server answered; status may still be non-2xx.
    Response(FetchedContent),
    /// A redirect pointed outside the allowlist.
    RedirectBlocked { url: String },
    /// Timeout, TLS failure, connection error, body read error.
    Failed { error: String },
}

/// Bookkeeping for one attempt, used for diagnostics only.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub strategy_id: String,
    pub succeeded: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Executes a single strategy against an approved target.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn attempt(
        &self,
        strategy: &FetchStrategy,
        target: &FetchTarget,
        timeout: Duration,
    ) -> AttemptOutcome;
}

/// The ordered strategy chain.
pub struct FetchChain {
    strategies: Vec<FetchStrategy>,
    transport: Arc<dyn Transport>,
    allowlist: Arc<HostAllowlist>,
    cache_bust_hosts: Vec<String>,
    attempt_timeout: Duration,
    deadline: Duration,
}

impl FetchChain {
    pub fn new(
        strategies: Vec<FetchStrategy>,
        transport: Arc<dyn Transport>,
        allowlist: Arc<HostAllowlist>,
    ) -> Self {
        Self {
            strategies,
            transport,
            allowlist,
            cache_bust_hosts: Vec::new(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            deadline: DEFAULT_CHAIN_DEADLINE,
        }
    }

    #[must_use]
    pub fn with_cache_bust_hosts(mut self, hosts: Vec<String>) -> Self {
        self.cache_bust_hosts = hosts;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn allowlist(&self) -> &HostAllowlist {
        &self.allowlist
    }

    /// Fetch `url`, walking the strategy chain until one attempt succeeds.
    ///
    /// The host is checked before anything touches the network. The whole
    /// run is bounded by the chain deadline; no partial result is returned
    /// when it expires.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str, kind: FetchKind) -> Result<FetchedContent> {
        let mut target = self.allowlist.check(url)?;

        if kind == FetchKind::Html && self.wants_cache_bust(&target.host) {
            target.url = with_cache_buster(&target.url);
            debug!(url = %target.url, "Appended cache buster");
        }

        match tokio::time::timeout(self.deadline, self.run(&target, kind)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline = ?self.deadline, "Fetch chain deadline exceeded");
                Err(Error::FetchExhausted {
                    url: target.url.to_string(),
                    attempts: self.strategies.len(),
                    last_error: format!("chain deadline of {:?} exceeded", self.deadline),
                })
            }
        }
    }

    async fn run(&self, target: &FetchTarget, kind: FetchKind) -> Result<FetchedContent> {
        let mut attempts: Vec<FetchAttempt> = Vec::new();
        let mut last_error = String::from("no strategy applies to this host");

        for strategy in &self.strategies {
            if !strategy.applies_to(&target.host) {
                debug!(strategy = %strategy.id, host = %target.host, "Strategy skipped for host");
                continue;
            }

            let outcome = match tokio::time::timeout(
                self.attempt_timeout,
                self.transport.attempt(strategy, target, self.attempt_timeout),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => AttemptOutcome::Failed {
                    error: format!("timed out after {:?}", self.attempt_timeout),
                },
            };

            let attempt = match outcome {
                AttemptOutcome::Response(content) => {
                    let status = content.status;
                    if !(200..300).contains(&status) {
                        FetchAttempt::failed(strategy, Some(status), format!("HTTP {status}"))
                    } else if !content_type_matches(kind, content.content_type.as_deref()) {
                        FetchAttempt::failed(
                            strategy,
                            Some(status),
                            format!(
                                "unexpected content type {:?} for {kind:?}",
                                content.content_type.as_deref().unwrap_or("")
                            ),
                        )
                    } else {
                        attempts.push(FetchAttempt::succeeded(strategy, status));
                        info!(
                            strategy = %strategy.id,
                            status,
                            bytes = content.body.len(),
                            attempts = attempts.len(),
                            "Fetch succeeded"
                        );
                        return Ok(content);
                    }
                }
                AttemptOutcome::RedirectBlocked { url } => {
                    warn!(strategy = %strategy.id, redirect = %url, "Redirect left the allowlist");
                    return Err(Error::HostNotAllowed { url });
                }
                AttemptOutcome::Failed { error } => FetchAttempt::failed(strategy, None, error),
            };

            debug!(
                strategy = %attempt.strategy_id,
                status = ?attempt.status,
                error = attempt.error.as_deref().unwrap_or(""),
                "Strategy failed, advancing"
            );
            if let Some(error) = &attempt.error {
                last_error = format!("{}: {error}", attempt.strategy_id);
            }
            attempts.push(attempt);
        }

        warn!(attempts = attempts.len(), %last_error, "All fetch strategies failed");
        Err(Error::FetchExhausted {
            url: target.url.to_string(),
            attempts: attempts.len(),
            last_error,
        })
    }

    fn wants_cache_bust(&self, host: &str) -> bool {
        self.cache_bust_hosts.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

impl FetchAttempt {
    fn succeeded(strategy: &FetchStrategy, status: u16) -> Self {
        Self {
            strategy_id: strategy.id.clone(),
            succeeded: true,
            status: Some(status),
            error: None,
        }
    }

    fn failed(strategy: &FetchStrategy, status: Option<u16>, error: String) -> Self {
        Self {
            strategy_id: strategy.id.clone(),
            succeeded: false,
            status,
            error: Some(error),
        }
    }
}

/// Whether a 2xx response is usable for `kind`.
///
/// PDF fetches only reject HTML documents (CDN challenge pages served with
/// 200); whether the body really is a PDF is decided by
/// [`crate::content::validate_pdf`].
#[must_use]
pub fn content_type_matches(kind: FetchKind, content_type: Option<&str>) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    match kind {
        FetchKind::Html => {
            ct.is_empty() || ct.starts_with("text/") || ct.contains("html") || ct.contains("xml")
        }
        FetchKind::Pdf => !ct.contains("text/html"),
    }
}

/// Append `nocache=1` unless the URL already carries a `nocache` parameter.
#[must_use]
pub fn with_cache_buster(url: &Url) -> Url {
    if url.query_pairs().any(|(k, _)| k == "nocache") {
        return url.clone();
    }
    let mut busted = url.clone();
    busted.query_pairs_mut().append_pair("nocache", "1");
    busted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_once() {
        let url = Url::parse("https://www.robertwaltersplc.com/investors/reports.html").unwrap();
        let busted = with_cache_buster(&url);
        assert_eq!(busted.query(), Some("nocache=1"));
        assert_eq!(with_cache_buster(&busted), busted);
    }

    #[test]
    fn cache_buster_keeps_existing_query() {
        let url = Url::parse("https://www.robertwaltersplc.com/r.html?year=2024").unwrap();
        assert_eq!(with_cache_buster(&url).query(), Some("year=2024&nocache=1"));
    }

    #[test]
    fn attempt_records_mark_outcome() {
        let strategy = FetchStrategy::new(
            "tls12-http1",
            TlsPolicy::default(),
            HttpVersion::Http1,
            Identity::Static,
        );
        let ok = FetchAttempt::succeeded(&strategy, 200);
        assert!(ok.succeeded);
        assert_eq!((ok.status, ok.error), (Some(200), None));

        let failed = FetchAttempt::failed(&strategy, Some(403), "HTTP 403".into());
        assert!(!failed.succeeded);
        assert_eq!(failed.strategy_id, "tls12-http1");
        assert_eq!(failed.error.as_deref(), Some("HTTP 403"));
    }

    #[test]
    fn html_kind_accepts_markup_types() {
        assert!(content_type_matches(FetchKind::Html, Some("text/html; charset=utf-8")));
        assert!(content_type_matches(FetchKind::Html, Some("application/xhtml+xml")));
        assert!(content_type_matches(FetchKind::Html, None));
        assert!(!content_type_matches(FetchKind::Html, Some("application/pdf")));
    }

    #[test]
    fn pdf_kind_rejects_html_challenge_pages() {
        assert!(content_type_matches(FetchKind::Pdf, Some("application/pdf")));
        assert!(content_type_matches(FetchKind::Pdf, Some("application/octet-stream")));
        assert!(content_type_matches(FetchKind::Pdf, None));
        assert!(!content_type_matches(FetchKind::Pdf, Some("text/html")));
    }
}

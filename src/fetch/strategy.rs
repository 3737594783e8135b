//! Fetch strategy descriptors.
//!
//! A strategy is pure configuration: which TLS policy, HTTP version and
//! client identity to use for one attempt. The chain walks them in order;
//! executing one is the transport's job.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{chrome_profile, static_profile, BrowserProfile};

/// Highest TLS protocol version a strategy will negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

/// Cipher suite selection.
///
/// `Relaxed` offers every suite the crypto provider ships with TLS 1.2
/// suites first, for servers that only negotiate older stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherPolicy {
    Default,
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsPolicy {
    pub max_version: TlsVersion,
    pub ciphers: CipherPolicy,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            max_version: TlsVersion::Tls13,
            ciphers: CipherPolicy::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 offered via ALPN, HTTP/1.1 accepted as fallback.
    Http2,
}

/// Client identity presented by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Identity {
    /// Fixed Chrome 124 headers with cache bypass.
    Static,
    /// Current Chrome with client hints.
    Chrome,
}

impl Identity {
    #[must_use]
    pub fn profile(self) -> BrowserProfile {
        match self {
            Identity::Static => static_profile(),
            Identity::Chrome => chrome_profile(),
        }
    }
}

/// One entry of the fetch chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStrategy {
    pub id: String,
    #[serde(default)]
    pub tls: TlsPolicy,
    pub http: HttpVersion,
    pub identity: Identity,
    /// Restrict this strategy to hosts ending in one of these domains.
    /// Empty means every host.
    #[serde(default)]
    pub only_hosts: Vec<String>,
}

impl FetchStrategy {
    pub fn new(id: impl Into<String>, tls: TlsPolicy, http: HttpVersion, identity: Identity) -> Self {
        Self {
            id: id.into(),
            tls,
            http,
            identity,
            only_hosts: Vec::new(),
        }
    }

    #[must_use]
    pub fn only_for<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_hosts = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this strategy should be attempted for `host`.
    #[must_use]
    pub fn applies_to(&self, host: &str) -> bool {
        if self.only_hosts.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.only_hosts.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

/// The default chain, most permissive-to-servers last.
#[must_use]
pub fn default_chain() -> Vec<FetchStrategy> {
    let tls12 = TlsPolicy {
        max_version: TlsVersion::Tls12,
        ciphers: CipherPolicy::Default,
    };
    let tls12_relaxed = TlsPolicy {
        max_version: TlsVersion::Tls12,
        ciphers: CipherPolicy::Relaxed,
    };

    vec![
        FetchStrategy::new(
            "plain-http1",
            TlsPolicy::default(),
            HttpVersion::Http1,
            Identity::Static,
        ),
        FetchStrategy::new(
            "tls12-relaxed",
            tls12_relaxed,
            HttpVersion::Http1,
            Identity::Static,
        )
        .only_for(["robertwaltersplc.com"]),
        FetchStrategy::new("tls12-http1", tls12, HttpVersion::Http1, Identity::Static),
        FetchStrategy::new("tls12-http2", tls12, HttpVersion::Http2, Identity::Static),
        FetchStrategy::new(
            "chrome-impersonate",
            TlsPolicy::default(),
            HttpVersion::Http2,
            Identity::Chrome,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_order_is_fixed() {
        let ids: Vec<String> = default_chain().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            [
                "plain-http1",
                "tls12-relaxed",
                "tls12-http1",
                "tls12-http2",
                "chrome-impersonate"
            ]
        );
    }

    #[test]
    fn host_restriction_matches_domain_and_subdomains() {
        let strategy = &default_chain()[1];
        assert!(strategy.applies_to("robertwaltersplc.com"));
        assert!(strategy.applies_to("www.RobertWaltersPLC.com"));
        assert!(!strategy.applies_to("www.haysplc.com"));
        assert!(!strategy.applies_to("notrobertwaltersplc.com"));
        assert!(default_chain()[0].applies_to("www.haysplc.com"));
    }

    #[test]
    fn strategy_deserializes_from_toml() {
        let strategy: FetchStrategy = toml::from_str(
            r#"
id = "legacy"
http = "http1"
identity = "chrome"
only_hosts = ["example.com"]
[tls]
max_version = "tls12"
ciphers = "relaxed"
"#,
        )
        .unwrap();
        assert_eq!(strategy.tls.max_version, TlsVersion::Tls12);
        assert_eq!(strategy.tls.ciphers, CipherPolicy::Relaxed);
        assert_eq!(strategy.identity, Identity::Chrome);
    }

    #[test]
    fn unknown_identity_is_rejected() {
        let parsed = toml::from_str::<FetchStrategy>(
            r#"
id = "x"
http = "http1"
identity = "random"
"#,
        );
        assert!(parsed.is_err());
    }
}

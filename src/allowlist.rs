//! Host allowlist guard.
//!
//! Every outbound request, including each redirect hop, is checked here
//! before it leaves the process. Hosts are compared case-insensitively and
//! without a port.

use std::collections::BTreeSet;

use url::Url;

use crate::error::{Error, Result};

/// A URL that passed the allowlist check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: Url,
    /// Lowercased hostname, no port.
    pub host: String,
}

/// Fixed set of approved hostnames.
#[derive(Debug, Clone, Default)]
pub struct HostAllowlist {
    hosts: BTreeSet<String>,
}

impl HostAllowlist {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Validate `url` and return the approved target.
    pub fn check(&self, url: &str) -> Result<FetchTarget> {
        let parsed = Url::parse(url).map_err(|_| Error::HostNotAllowed {
            url: url.to_string(),
        })?;
        self.check_url(&parsed)?;
        let host = host_of(&parsed).unwrap_or_default();
        Ok(FetchTarget { url: parsed, host })
    }

    /// Validate an already parsed URL (used for redirect targets).
    pub fn check_url(&self, url: &Url) -> Result<()> {
        if self.allows(url) {
            Ok(())
        } else {
            Err(Error::HostNotAllowed {
                url: url.to_string(),
            })
        }
    }

    #[must_use]
    pub fn allows(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && host_of(url).is_some_and(|h| self.hosts.contains(&h))
    }

    #[must_use]
    pub fn contains_host(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }
}

fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(str::to_ascii_lowercase)
}

//! Configuration loaded from `~/.config/irpdf/config.toml`.
//!
//! Every key is optional; anything absent falls back to the built-in
//! defaults for Hays, PageGroup and Robert Walters.
//!
//! ```toml
//! attempt_timeout_secs = 20
//! recheck_threshold = 2
//!
//! [[companies]]
//! id = "hays"
//! name = "Hays plc"
//! results_url = "https://www.haysplc.com/investors/results-centre"
//! hosts = ["www.haysplc.com", "haysplc.com"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::allowlist::HostAllowlist;
use crate::error::{Error, Result};
use crate::fetch::{default_chain, FetchStrategy};
use crate::metrics::DEFAULT_RECHECK_THRESHOLD;

/// One company whose results page can be scanned for reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyConfig {
    /// Short id used on the command line (`hays`).
    pub id: String,
    /// Display name written into metric items.
    pub name: String,
    pub results_url: String,
    /// Hosts PDFs may be fetched from.
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub companies: Vec<CompanyConfig>,
    /// Hosts whose HTML fetches get a `nocache=1` query parameter.
    pub cache_bust_hosts: Vec<String>,
    pub attempt_timeout_secs: u64,
    pub chain_deadline_secs: u64,
    pub recheck_threshold: usize,
    /// Directory containing the pdfium shared library.
    pub pdfium_library_dir: Option<PathBuf>,
    /// Replaces the built-in fetch chain when present.
    pub strategies: Option<Vec<FetchStrategy>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            companies: default_companies(),
            cache_bust_hosts: vec!["robertwaltersplc.com".to_string()],
            attempt_timeout_secs: 30,
            chain_deadline_secs: 120,
            recheck_threshold: DEFAULT_RECHECK_THRESHOLD,
            pdfium_library_dir: None,
            strategies: None,
        }
    }
}

fn company(id: &str, name: &str, results_url: &str, domain: &str) -> CompanyConfig {
    CompanyConfig {
        id: id.to_string(),
        name: name.to_string(),
        results_url: results_url.to_string(),
        hosts: vec![format!("www.{domain}"), domain.to_string()],
    }
}

fn default_companies() -> Vec<CompanyConfig> {
    vec![
        company(
            "hays",
            "Hays plc",
            "https://www.haysplc.com/investors/results-centre",
            "haysplc.com",
        ),
        company(
            "pagegroup",
            "PageGroup",
            "https://www.page.com/investors/results-and-presentations",
            "page.com",
        ),
        company(
            "robertwalters",
            "Robert Walters plc",
            "https://www.robertwaltersplc.com/investors/reports.html",
            "robertwaltersplc.com",
        ),
    ]
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&content).map_err(|reason| Error::Config {
            path: path.clone(),
            reason,
        })?;
        debug!(path = %path.display(), companies = config.companies.len(), "Config loaded");
        Ok(config)
    }

    fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.companies.is_empty() {
            return Err("at least one company must be configured".into());
        }
        if matches!(&config.strategies, Some(s) if s.is_empty()) {
            return Err("strategies, when given, must not be empty".into());
        }
        Ok(config)
    }

    pub fn company(&self, id: &str) -> Result<&CompanyConfig> {
        self.companies
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| Error::UnknownCompany(id.to_string()))
    }

    /// Union of every company's hosts.
    pub fn allowlist(&self) -> HostAllowlist {
        HostAllowlist::new(self.companies.iter().flat_map(|c| c.hosts.iter()))
    }

    pub fn strategies(&self) -> Vec<FetchStrategy> {
        self.strategies.clone().unwrap_or_else(default_chain)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn chain_deadline(&self) -> Duration {
        Duration::from_secs(self.chain_deadline_secs)
    }
}

/// Return the path to the default config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("irpdf")
        .join("config.toml")
}

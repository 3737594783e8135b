//! reqwest-backed strategy executor.
//!
//! One `reqwest::Client` is built per strategy at construction time, each
//! with its own rustls configuration:
//! - TLS version ceiling (1.2 or 1.3)
//! - cipher suite policy
//! - ALPN (HTTP/1.1 only, or h2 with HTTP/1.1 fallback)
//! - browser fingerprint headers
//! - a redirect policy that re-checks every hop against the allowlist

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;
use rustls::RootCertStore;
use tracing::{debug, info, instrument, warn};

use super::strategy::{CipherPolicy, FetchStrategy, HttpVersion, TlsPolicy, TlsVersion};
use super::{AttemptOutcome, FetchedContent, Transport};
use crate::allowlist::{FetchTarget, HostAllowlist};
use crate::error::{Error, Result};

const MAX_REDIRECTS: usize = 10;

/// Raised by the redirect policy when a hop leaves the allowlist.
#[derive(Debug, thiserror::Error)]
#[error("redirect to {url} is not on the allowlist")]
pub struct RedirectBlocked {
    pub url: String,
}

/// Executes strategies with real HTTP clients.
pub struct ReqwestTransport {
    clients: HashMap<String, Client>,
}

impl ReqwestTransport {
    /// Build one client per strategy.
    ///
    /// Root certificates come from the platform store and are shared by all
    /// strategies.
    pub fn new(
        strategies: &[FetchStrategy],
        allowlist: Arc<HostAllowlist>,
        attempt_timeout: Duration,
    ) -> Result<Self> {
        let roots = Arc::new(native_roots());
        let mut clients = HashMap::with_capacity(strategies.len());
        for strategy in strategies {
            let client = build_client(strategy, Arc::clone(&allowlist), &roots, attempt_timeout)?;
            clients.insert(strategy.id.clone(), client);
        }
        Ok(Self { clients })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, strategy, target), fields(strategy = %strategy.id, url = %target.url))]
    async fn attempt(
        &self,
        strategy: &FetchStrategy,
        target: &FetchTarget,
        timeout: Duration,
    ) -> AttemptOutcome {
        let Some(client) = self.clients.get(&strategy.id) else {
            return AttemptOutcome::Failed {
                error: format!("no client built for strategy {}", strategy.id),
            };
        };

        debug!("Sending request");
        let response = match client.get(target.url.clone()).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        info!(
            status,
            version = ?response.version(),
            content_type = content_type.as_deref().unwrap_or(""),
            "Response received"
        );

        match response.bytes().await {
            Ok(body) => AttemptOutcome::Response(FetchedContent {
                final_url,
                status,
                content_type,
                body,
                strategy_id: strategy.id.clone(),
            }),
            Err(e) => classify_error(&e),
        }
    }
}

fn build_client(
    strategy: &FetchStrategy,
    allowlist: Arc<HostAllowlist>,
    roots: &Arc<RootCertStore>,
    timeout: Duration,
) -> Result<Client> {
    let tls = tls_config(strategy.tls, strategy.http, Arc::clone(roots))?;

    let builder = Client::builder()
        // TLS policy, ALPN included
        .use_preconfigured_tls(tls)
        // Fingerprint
        .default_headers(strategy.identity.profile().to_headers())
        // Connection reuse
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        // Compression
        .brotli(true)
        .zstd(true)
        .gzip(true)
        .deflate(true)
        // Timeouts
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .timeout(timeout)
        // Every hop re-validated
        .redirect(redirect_policy(allowlist))
        .cookie_store(true);

    let builder = match strategy.http {
        HttpVersion::Http1 => builder.http1_only(),
        HttpVersion::Http2 => builder.http2_adaptive_window(true),
    };

    builder
        .build()
        .map_err(|e| Error::Internal(format!("failed to build client {}: {e}", strategy.id)))
}

/// rustls configuration for a strategy.
pub fn tls_config(
    policy: TlsPolicy,
    http: HttpVersion,
    roots: Arc<RootCertStore>,
) -> Result<rustls::ClientConfig> {
    let mut provider = rustls::crypto::ring::default_provider();
    if policy.ciphers == CipherPolicy::Relaxed {
        let mut suites = rustls::crypto::ring::ALL_CIPHER_SUITES.to_vec();
        // TLS 1.2 suites first
        suites.sort_by_key(|s| s.version().version == rustls::ProtocolVersion::TLSv1_3);
        provider.cipher_suites = suites;
        provider.kx_groups = rustls::crypto::ring::ALL_KX_GROUPS.to_vec();
    }

    let versions: &[&'static rustls::SupportedProtocolVersion] = match policy.max_version {
        TlsVersion::Tls12 => &[&rustls::version::TLS12],
        TlsVersion::Tls13 => &[&rustls::version::TLS13, &rustls::version::TLS12],
    };

    let mut config = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(versions)
        .map_err(|e| Error::Internal(format!("invalid TLS policy {policy:?}: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    config.alpn_protocols = match http {
        HttpVersion::Http1 => vec![b"http/1.1".to_vec()],
        HttpVersion::Http2 => vec![b"h2".to_vec(), b"http/1.1".to_vec()],
    };

    Ok(config)
}

fn redirect_policy(allowlist: Arc<HostAllowlist>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if allowlist.allows(attempt.url()) {
            attempt.follow()
        } else {
            let url = attempt.url().to_string();
            attempt.error(RedirectBlocked { url })
        }
    })
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    if !loaded.errors.is_empty() {
        warn!(errors = loaded.errors.len(), "Some platform certificates failed to load");
    }
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    debug!(added, ignored, "Loaded platform root certificates");
    roots
}

fn classify_error(err: &reqwest::Error) -> AttemptOutcome {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    let mut chain = Vec::new();
    while let Some(e) = source {
        if let Some(blocked) = e.downcast_ref::<RedirectBlocked>() {
            return AttemptOutcome::RedirectBlocked {
                url: blocked.url.clone(),
            };
        }
        chain.push(e.to_string());
        source = e.source();
    }
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else {
        "request"
    };
    AttemptOutcome::Failed {
        error: format!("{kind}: {}", chain.join(": ")),
    }
}

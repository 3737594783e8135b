//! Browser header sets for fetch strategies.
//!
//! Strict CDNs in front of investor-relations sites reject clients that
//! announce themselves as automation, so every strategy sends a desktop
//! browser's request headers.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL,
    PRAGMA, USER_AGENT,
};

const WINDOWS_UA_PREFIX: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                 (KHTML, like Gecko)";

/// Chrome release used by the impersonation strategy, as `(major, full)`.
const CHROME_RELEASE: (&str, &str) = ("131", "131.0.6778.86");

const LANGUAGE: &str = "en-GB,en;q=0.9";

/// Headers one strategy sends with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: &'static str,
    pub accept_encoding: &'static str,
    /// `sec-ch-ua` brand list; Chromium client hints are sent only when set.
    pub client_hints: Option<String>,
    /// Send `no-cache` directives instead of `max-age=0`.
    pub no_cache: bool,
}

/// Fixed Chrome 124 header set for the plain strategies.
///
/// Every run sends identical headers so failures reproduce.
#[must_use]
pub fn static_profile() -> BrowserProfile {
    BrowserProfile {
        user_agent: format!("{WINDOWS_UA_PREFIX} Chrome/124.0.0.0 Safari/537.36"),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_encoding: "gzip, deflate, br",
        client_hints: None,
        no_cache: true,
    }
}

/// Current desktop Chrome on Windows, client hints included.
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let (major, full) = CHROME_RELEASE;
    BrowserProfile {
        user_agent: format!("{WINDOWS_UA_PREFIX} Chrome/{full} Safari/537.36"),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
                 */*;q=0.8,application/pdf",
        accept_encoding: "gzip, deflate, br, zstd",
        client_hints: Some(format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        )),
        no_cache: false,
    }
}

impl BrowserProfile {
    /// Headers for `reqwest::ClientBuilder::default_headers`.
    ///
    /// A user agent that is not valid header text is dropped.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGE));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(self.accept_encoding));

        let brands = self.client_hints.as_deref().map(HeaderValue::from_str);
        if let Some(Ok(brands)) = brands {
            headers.insert(HeaderName::from_static("sec-ch-ua"), brands);
            headers.insert(
                HeaderName::from_static("sec-ch-ua-mobile"),
                HeaderValue::from_static("?0"),
            );
            headers.insert(
                HeaderName::from_static("sec-ch-ua-platform"),
                HeaderValue::from_static("\"Windows\""),
            );
        }

        for (name, value) in [
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
            ("upgrade-insecure-requests", "1"),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        if self.no_cache {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        } else {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        }

        headers
    }
}

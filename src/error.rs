//! Error taxonomy for fetching and extraction.
//!
//! Every variant maps to an HTTP-style status class via
//! [`Error::status_code`], so an API layer can surface failures without
//! re-classifying them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the fetch and extraction operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The URL's host is not on the allowlist. Never retried.
    #[error("host not allowed: {url}")]
    HostNotAllowed { url: String },

    /// Every strategy in the fetch chain failed.
    #[error("all {attempts} fetch strategies failed for {url}: {last_error}")]
    FetchExhausted {
        url: String,
        attempts: usize,
        last_error: String,
    },

    /// Downloaded content is neither declared nor named as a PDF.
    #[error("URL is not a PDF: {url} (content-type: {content_type})")]
    NotAPdf { url: String, content_type: String },

    /// pdfium could not be bound, or the document is corrupt/unsupported.
    #[error("PDF decode failed: {0}")]
    PdfDecodeFailure(String),

    #[error("unknown company: {0}")]
    UnknownCompany(String),

    #[error("failed to load config from {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP-style status class for this error.
    ///
    /// Policy and validation violations are 400, upstream exhaustion 502.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::HostNotAllowed { .. }
            | Error::NotAPdf { .. }
            | Error::UnknownCompany(_)
            | Error::Config { .. } => 400,
            Error::PdfDecodeFailure(_) => 422,
            Error::FetchExhausted { .. } => 502,
            Error::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_violations_are_client_errors() {
        let err = Error::HostNotAllowed {
            url: "https://evil.example/x.pdf".into(),
        };
        assert_eq!(err.status_code(), 400);

        let err = Error::NotAPdf {
            url: "https://www.haysplc.com/page".into(),
            content_type: "text/html".into(),
        };
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn exhaustion_is_bad_gateway() {
        let err = Error::FetchExhausted {
            url: "https://www.page.com/".into(),
            attempts: 5,
            last_error: "connection reset".into(),
        };
        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().contains("connection reset"));
        assert!(err.to_string().contains("all 5 fetch strategies"));
    }
}

//! `irpdf` - Investor-relations PDF fetching and extraction
//!
//! # Features
//!
//! - **Resilient fetching**: ordered chain of TLS/HTTP/identity strategies,
//!   host allowlist enforced before every request and on every redirect
//! - **Browser identities**: fixed Chrome 124 headers or current Chrome with client hints
//! - **Text & tables**: per-page text and position-based table-like rows via pdfium
//! - **Metrics**: country-level YoY percentages with basis classification
//!   and a disclosure recheck
//!
//! # Example
//!
//! ```rust,no_run
//! use irpdf::{Config, ReportService};
//! use irpdf::service::ReportQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = ReportService::new(Config::load(None)?)?;
//!     let reports = service
//!         .list_reports(&ReportQuery {
//!             company: "hays".into(),
//!             report_type: Some("annual".into()),
//!             exclude_esg: true,
//!             limit: None,
//!         })
//!         .await?;
//!     println!("Found {} reports", reports.results.len());
//!     Ok(())
//! }
//! ```

pub mod allowlist;
pub mod config;
pub mod content;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod metrics;
pub mod service;

pub use allowlist::{FetchTarget, HostAllowlist};
pub use config::{CompanyConfig, Config};
pub use content::{DetectedTable, PageSelector, PdfDocumentHandle, PdfEngine, TextBlock};
pub use discovery::{discover_pdfs, filter_reports, ReportLink};
pub use error::{Error, Result};
pub use fetch::{FetchChain, FetchKind, FetchStrategy, FetchedContent, ReqwestTransport, Transport};
pub use fingerprint::{chrome_profile, static_profile, BrowserProfile};
pub use metrics::{Basis, MetricExtractionResult, MetricExtractor, MetricItem, MetricPatterns};
pub use service::ReportService;

/// Version of irpdf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! The four report operations, wired from configuration.
//!
//! Every operation downloads through the [`FetchChain`]; PDF work runs on
//! the blocking pool because pdfium is synchronous FFI.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

use crate::config::Config;
use crate::content::{
    build_tables, extract_text, validate_pdf, DetectedTable, PageSelector, PdfDocumentHandle,
    PdfEngine, TextBlock, TextOptions,
};
use crate::discovery::{discover_pdfs, filter_reports, ReportLink};
use crate::error::{Error, Result};
use crate::fetch::{FetchChain, FetchKind, ReqwestTransport, Transport};
use crate::metrics::{MetricExtractor, MetricItem, MetricPatterns, MetricRequest};

#[derive(Debug, Clone, Serialize)]
pub struct ReportsResponse {
    pub company: String,
    pub results: Vec<ReportLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextResponse {
    pub pdf_url: String,
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    pub pdf_url: String,
    pub tables: Vec<DetectedTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub pdf_url: String,
    pub report_title: Option<String>,
    pub report_date: Option<String>,
    /// Company id as requested.
    pub company: String,
    pub period_label: String,
    pub items: Vec<MetricItem>,
    pub not_disclosed: Vec<String>,
    pub recheck_performed: bool,
}

/// Filters for [`ReportService::list_reports`].
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub company: String,
    pub report_type: Option<String>,
    pub exclude_esg: bool,
    pub limit: Option<usize>,
}

/// Inputs for [`ReportService::extract_metrics`].
#[derive(Debug, Clone, Default)]
pub struct MetricsQuery {
    pub pdf_url: String,
    pub company: String,
    pub expected_period_label: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
}

pub struct ReportService {
    config: Config,
    chain: FetchChain,
    engine: PdfEngine,
    extractor: MetricExtractor,
}

impl ReportService {
    /// Build a service with real HTTP clients for every configured strategy.
    pub fn new(config: Config) -> Result<Self> {
        let allowlist = Arc::new(config.allowlist());
        let strategies = config.strategies();
        let transport =
            ReqwestTransport::new(&strategies, Arc::clone(&allowlist), config.attempt_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a service over an arbitrary transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let chain = FetchChain::new(config.strategies(), transport, Arc::new(config.allowlist()))
            .with_cache_bust_hosts(config.cache_bust_hosts.clone())
            .with_attempt_timeout(config.attempt_timeout())
            .with_deadline(config.chain_deadline());
        let extractor = MetricExtractor::new(Arc::new(MetricPatterns::default_set()?))
            .with_recheck_threshold(config.recheck_threshold);
        let engine = PdfEngine::new(config.pdfium_library_dir.clone());

        Ok(Self {
            config,
            chain,
            engine,
            extractor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// List report PDFs linked from a company's results page.
    #[instrument(skip(self), fields(company = %query.company))]
    pub async fn list_reports(&self, query: &ReportQuery) -> Result<ReportsResponse> {
        let company = self.config.company(&query.company)?;
        let page = self
            .chain
            .fetch(&company.results_url, FetchKind::Html)
            .await?;

        let base = Url::parse(&company.results_url)
            .map_err(|e| Error::Internal(format!("bad results URL for {}: {e}", company.id)))?;
        let links = discover_pdfs(&page.text(), &base, self.chain.allowlist());
        let found = links.len();
        let results = filter_reports(
            links,
            query.report_type.as_deref(),
            query.exclude_esg,
            query.limit,
        );
        info!(found, kept = results.len(), "Reports discovered");

        Ok(ReportsResponse {
            company: query.company.clone(),
            results,
        })
    }

    /// Page text, one block per selected page.
    #[instrument(skip(self))]
    pub async fn extract_text(
        &self,
        pdf_url: &str,
        pages: Option<Vec<u32>>,
        options: TextOptions,
    ) -> Result<TextResponse> {
        let selector = PageSelector::from_option(pages);
        let blocks = self
            .with_pdf(pdf_url, move |doc| extract_text(doc, &selector, options))
            .await?;
        Ok(TextResponse {
            pdf_url: pdf_url.to_string(),
            blocks,
        })
    }

    /// Table-like rows, one table per selected page that has any.
    #[instrument(skip(self))]
    pub async fn extract_tables(
        &self,
        pdf_url: &str,
        pages: Option<Vec<u32>>,
    ) -> Result<TablesResponse> {
        let selector = PageSelector::from_option(pages);
        let tables = self
            .with_pdf(pdf_url, move |doc| build_tables(doc, &selector))
            .await?;
        Ok(TablesResponse {
            pdf_url: pdf_url.to_string(),
            tables,
        })
    }

    /// Country-level percentage metrics.
    #[instrument(skip(self, query), fields(pdf_url = %query.pdf_url, company = %query.company))]
    pub async fn extract_metrics(&self, query: &MetricsQuery) -> Result<MetricsResponse> {
        let company = self.config.company(&query.company)?;
        let period_label = query.expected_period_label.clone().unwrap_or_default();
        let request = MetricRequest {
            company: company.name.clone(),
            period_label: period_label.clone(),
            metrics: query.metrics.clone(),
            countries: query.countries.clone(),
        };

        let extractor = self.extractor.clone();
        let result = self
            .with_pdf(&query.pdf_url, move |doc| extractor.extract(doc, &request))
            .await?;

        Ok(MetricsResponse {
            pdf_url: query.pdf_url.clone(),
            report_title: None,
            report_date: None,
            company: query.company.clone(),
            period_label,
            items: result.items,
            not_disclosed: result.not_disclosed,
            recheck_performed: result.recheck_performed,
        })
    }

    /// Download and validate a PDF, then run `f` on it off the async runtime.
    async fn with_pdf<T, F>(&self, pdf_url: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PdfDocumentHandle) -> Result<T> + Send + 'static,
    {
        let bytes = self.download_pdf(pdf_url).await?;
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.with_document(&bytes, f))
            .await
            .map_err(|e| Error::Internal(format!("PDF worker failed: {e}")))?
    }

    async fn download_pdf(&self, pdf_url: &str) -> Result<Bytes> {
        let fetched = self.chain.fetch(pdf_url, FetchKind::Pdf).await?;
        validate_pdf(&fetched.body, pdf_url, fetched.content_type.as_deref())?;
        Ok(fetched.body)
    }
}

//! `irpdf` CLI - list investor-relations reports and extract PDF content

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use irpdf::content::TextOptions;
use irpdf::service::{MetricsQuery, ReportQuery};
use irpdf::{Config, ReportService};

#[derive(Parser)]
#[command(name = "irpdf")]
#[command(about = "Fetch investor-relations PDFs and extract text, tables and metrics")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/irpdf/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-attempt timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List report PDFs on a company's results page
    Reports {
        /// Company id (hays, pagegroup, robertwalters)
        company: String,

        /// Comma-separated keywords the title or URL must contain
        #[arg(long)]
        report_type: Option<String>,

        /// Maximum number of results (1-20)
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Keep sustainability/ESG/policy documents
        #[arg(long)]
        include_esg: bool,
    },

    /// Extract page text
    Text {
        pdf_url: String,

        /// 1-based pages, comma-separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        pages: Option<Vec<u32>>,

        /// Keep whitespace as extracted
        #[arg(long)]
        raw: bool,
    },

    /// Extract table-like rows
    Tables {
        pdf_url: String,

        /// 1-based pages, comma-separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        pages: Option<Vec<u32>>,

        /// Print markdown tables instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Extract country-level percentage metrics
    Metrics {
        pdf_url: String,

        /// Company id (hays, pagegroup, robertwalters)
        #[arg(short, long)]
        company: String,

        /// Period label copied into every item
        #[arg(long)]
        period: Option<String>,

        /// Metric names to keep (repeatable)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// Countries to keep and check for disclosure (repeatable)
        #[arg(long = "country")]
        countries: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "irpdf=debug" } else { "irpdf=info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<irpdf::Error>() {
                Some(err) => eprintln!("error ({}): {err}", err.status_code()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout {
        config.attempt_timeout_secs = secs;
    }
    let service = ReportService::new(config)?;

    match cli.command {
        Commands::Reports {
            company,
            report_type,
            limit,
            include_esg,
        } => {
            let response = service
                .list_reports(&ReportQuery {
                    company,
                    report_type,
                    exclude_esg: !include_esg,
                    limit: Some(limit),
                })
                .await?;
            print_json(&response)?;
        }
        Commands::Text {
            pdf_url,
            pages,
            raw,
        } => {
            let options = TextOptions {
                dedupe_whitespace: !raw,
            };
            print_json(&service.extract_text(&pdf_url, pages, options).await?)?;
        }
        Commands::Tables {
            pdf_url,
            pages,
            markdown,
        } => {
            let response = service.extract_tables(&pdf_url, pages).await?;
            if markdown {
                for table in &response.tables {
                    println!("## {}\n\n{}", table.title, table.to_markdown());
                }
            } else {
                print_json(&response)?;
            }
        }
        Commands::Metrics {
            pdf_url,
            company,
            period,
            metrics,
            countries,
        } => {
            let query = MetricsQuery {
                pdf_url,
                company,
                expected_period_label: period,
                metrics: (!metrics.is_empty()).then_some(metrics),
                countries: (!countries.is_empty()).then_some(countries),
            };
            print_json(&service.extract_metrics(&query).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize response")?;
    println!("{json}");
    Ok(())
}

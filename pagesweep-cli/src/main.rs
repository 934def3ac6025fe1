//! Command-line front end for pagesweep.
//!
//! Sweeps one paginated listing and optionally writes the records to CSV:
//!
//! ```text
//! pagesweep --preset books --output books.csv
//! pagesweep --url-template 'https://shop.example/list?page={}' \
//!     --item-selector '.product' --field 'name=.title' --field 'link=a@href'
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use pagesweep::config::{BackoffStrategy, SweepConfig};
use pagesweep::engine::{PaginationEngine, SweepResult};
use pagesweep::events::LoggingObserver;
use pagesweep::extract::{presets, CssExtractor, FieldSpec};
use pagesweep::sink::{CsvSink, ResultSink};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagesweep")]
#[command(about = "Sweep a paginated listing in batches and collect its records")]
#[command(version)]
struct Cli {
    /// Built-in site preset (books, sportsmans)
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(presets::PRESET_NAMES.iter().copied()))]
    preset: Option<String>,

    /// Listing URL with one `{}` page placeholder
    #[arg(long)]
    url_template: Option<String>,

    /// CSS selector matching one listing item
    #[arg(long, requires = "fields")]
    item_selector: Option<String>,

    /// Field to extract, as NAME=SELECTOR, NAME=SELECTOR@ATTR or NAME=SELECTOR@class:last
    #[arg(long = "field", value_name = "SPEC", requires = "item_selector")]
    fields: Vec<FieldSpec>,

    /// JSON sweep configuration; flags given alongside override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pages per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum simultaneous fetches
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Attempts per page, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Base retry delay in seconds
    #[arg(long, value_name = "SECONDS")]
    backoff: Option<f64>,

    /// Retry delay growth: linear, exponential or constant
    #[arg(long)]
    backoff_strategy: Option<BackoffStrategy>,

    /// Pause after each successful fetch, in seconds
    #[arg(long, value_name = "SECONDS")]
    post_success_delay: Option<f64>,

    /// Pause between batches, in seconds
    #[arg(long, value_name = "SECONDS")]
    inter_batch_delay: Option<f64>,

    /// Per-attempt fetch timeout, in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Stop after this page
    #[arg(long)]
    max_pages: Option<u32>,

    /// Render pages in a headless browser instead of plain HTTP
    #[cfg(feature = "browser")]
    #[arg(long)]
    browser: bool,

    /// Write the records to this CSV file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit logs and the final report as JSON
    #[arg(long, env = "PAGESWEEP_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    /// Builds the sweep configuration: file first, then preset, then flags.
    fn sweep_config(&self, preset_template: Option<&str>) -> Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => match self.url_template.as_deref().or(preset_template) {
                Some(template) => SweepConfig::new(template),
                None => bail!("one of --url-template, --preset or --config is required"),
            },
        };

        if let Some(template) = &self.url_template {
            config.url_template.clone_from(template);
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(seconds) = self.backoff {
            config.retry.backoff_base_seconds = seconds;
        }
        if let Some(strategy) = self.backoff_strategy {
            config.retry.backoff_strategy = strategy;
        }
        if let Some(seconds) = self.post_success_delay {
            config.post_success_delay_seconds = seconds;
        }
        if let Some(seconds) = self.inter_batch_delay {
            config.inter_batch_delay_seconds = seconds;
        }
        if let Some(seconds) = self.timeout {
            config.fetch_timeout_seconds = seconds;
        }
        if let Some(max) = self.max_pages {
            config.max_pages = Some(max);
        }
        Ok(config)
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagesweep=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let preset = cli.preset.as_deref().map(presets::by_name).transpose()?;
    let config = cli.sweep_config(preset.as_ref().map(|p| p.url_template.as_str()))?;
    config.validate()?;

    let extractor = match (&cli.item_selector, preset) {
        (Some(item), _) => CssExtractor::new(item.as_str(), cli.fields.clone())?,
        (None, Some(preset)) => preset.extractor,
        (None, None) => bail!("either --preset or --item-selector with --field is required"),
    };
    let columns = extractor.field_names();
    #[cfg(feature = "browser")]
    let browser_config = config.browser.clone();

    #[cfg_attr(not(feature = "browser"), allow(unused_mut))]
    let mut builder = PaginationEngine::builder(config)
        .extractor(extractor)
        .observer(Arc::new(LoggingObserver::default()));

    #[cfg(feature = "browser")]
    let browser = if cli.browser {
        let fetcher = Arc::new(
            pagesweep::fetch::BrowserFetcher::launch(browser_config).await?,
        );
        builder = builder.shared_fetcher(fetcher.clone());
        Some(fetcher)
    } else {
        None
    };

    let engine = builder.build()?;
    let token = Arc::clone(engine.cancellation());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight pages");
            token.cancel("interrupted");
        }
    });

    let result = engine.run().await;
    drop(engine);

    #[cfg(feature = "browser")]
    if let Some(fetcher) = browser.and_then(|f| Arc::try_unwrap(f).ok()) {
        fetcher.shutdown().await;
    }

    finish(&result, cli.output.as_deref(), columns, cli.json_logs).await
}

/// Prints the report, then exports. The report is printed even if the export fails.
async fn finish(
    result: &SweepResult,
    output: Option<&Path>,
    columns: Vec<String>,
    json: bool,
) -> Result<()> {
    print_report(result, json)?;

    if let Some(path) = output {
        let sink = CsvSink::new(path).with_columns(columns);
        let receipt = sink
            .write(result.records.records())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(records = receipt.records_written, path = %receipt.destination, "CSV written");
    }
    Ok(())
}

fn print_report(result: &SweepResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&result.report)?);
    } else {
        println!("{}", result.report);
    }
    Ok(())
}

//! Top-level sweep configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{check_seconds, BrowserFetchConfig, HttpFetchConfig, RetryConfig};
use crate::core::UrlTemplate;
use crate::errors::{ConfigurationError, PagesweepError};

/// Configuration for one pagination sweep.
///
/// Retry settings are flattened, so a JSON config reads
/// `{"url_template": "...", "batch_size": 5, "max_attempts": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Listing URL with one `{}` or `{page}` placeholder.
    pub url_template: String,
    /// Pages fetched per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Ceiling on simultaneous in-flight fetches across the whole run.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Stop after this page even if it still had records.
    #[serde(default)]
    pub max_pages: Option<u32>,
    /// Courtesy pause after each successful fetch, in seconds.
    #[serde(default = "default_post_success_delay")]
    pub post_success_delay_seconds: f64,
    /// Pause between batches, in seconds.
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_seconds: f64,
    /// Per-attempt fetch timeout, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: f64,
    /// Retry settings.
    #[serde(flatten)]
    pub retry: RetryConfig,
    /// Settings for the HTTP fetcher.
    #[serde(default)]
    pub http: HttpFetchConfig,
    /// Settings for the browser fetcher.
    #[serde(default)]
    pub browser: BrowserFetchConfig,
}

fn default_batch_size() -> usize {
    3
}

fn default_max_concurrency() -> usize {
    3
}

fn default_post_success_delay() -> f64 {
    1.0
}

fn default_inter_batch_delay() -> f64 {
    2.0
}

fn default_fetch_timeout() -> f64 {
    30.0
}

impl SweepConfig {
    /// Creates a configuration with defaults for everything but the template.
    #[must_use]
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            max_pages: None,
            post_success_delay_seconds: default_post_success_delay(),
            inter_batch_delay_seconds: default_inter_batch_delay(),
            fetch_timeout_seconds: default_fetch_timeout(),
            retry: RetryConfig::default(),
            http: HttpFetchConfig::default(),
            browser: BrowserFetchConfig::default(),
        }
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::new("config", e.to_string()))
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PagesweepError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the concurrency ceiling.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the page limit.
    #[must_use]
    pub fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the courtesy delay after a successful fetch.
    #[must_use]
    pub fn with_post_success_delay(mut self, delay: Duration) -> Self {
        self.post_success_delay_seconds = delay.as_secs_f64();
        self
    }

    /// Sets the pause between batches.
    #[must_use]
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay_seconds = delay.as_secs_f64();
        self
    }

    /// Sets the per-attempt fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_seconds = timeout.as_secs_f64();
        self
    }

    /// Removes every pacing delay. Useful against local fixtures.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.post_success_delay_seconds = 0.0;
        self.inter_batch_delay_seconds = 0.0;
        self.retry.backoff_base_seconds = 0.0;
        self
    }

    /// Courtesy delay as a Duration.
    #[must_use]
    pub fn post_success_delay(&self) -> Duration {
        Duration::from_secs_f64(self.post_success_delay_seconds)
    }

    /// Inter-batch delay as a Duration.
    #[must_use]
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_batch_delay_seconds)
    }

    /// Fetch timeout as a Duration.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fetch_timeout_seconds)
    }

    /// Checks every setting and parses the URL template.
    ///
    /// Run this before any fetch; every failure here is fatal.
    pub fn validate(&self) -> Result<UrlTemplate, ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::not_positive("batch_size"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::not_positive("max_concurrency"));
        }
        if self.max_pages == Some(0) {
            return Err(ConfigurationError::new("max_pages", "must be at least 1 when set"));
        }
        self.retry.validate()?;
        check_seconds("post_success_delay_seconds", self.post_success_delay_seconds)?;
        check_seconds("inter_batch_delay_seconds", self.inter_batch_delay_seconds)?;
        check_seconds("fetch_timeout_seconds", self.fetch_timeout_seconds)?;
        check_seconds("browser.settle_delay_seconds", self.browser.settle_delay_seconds)?;
        if self.fetch_timeout_seconds == 0.0 {
            return Err(ConfigurationError::new("fetch_timeout_seconds", "must be greater than zero"));
        }

        UrlTemplate::parse(self.url_template.as_str())
    }
}

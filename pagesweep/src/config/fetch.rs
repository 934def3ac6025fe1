//! Transport configuration for the bundled fetchers.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the plain HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFetchConfig {
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

// Some catalogs serve an empty shell to unknown agents.
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

fn default_max_redirects() -> usize {
    10
}

impl Default for HttpFetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            headers: HashMap::new(),
            retry_status_codes: default_retry_status_codes(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl HttpFetchConfig {
    /// Creates a new HTTP fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for the headless browser fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserFetchConfig {
    /// Run Chromium without a window.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Pause after navigation before reading the DOM, in seconds.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_seconds: f64,
    /// Explicit Chromium binary; discovered from the system when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

fn default_headless() -> bool {
    true
}

fn default_settle_delay() -> f64 {
    0.5
}

impl Default for BrowserFetchConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            settle_delay_seconds: default_settle_delay(),
            executable: None,
        }
    }
}

impl BrowserFetchConfig {
    /// Creates a new browser fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the browser window.
    #[must_use]
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Sets the settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_seconds = delay.as_secs_f64();
        self
    }

    /// Settle delay as a Duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.settle_delay_seconds.max(0.0))
    }
}

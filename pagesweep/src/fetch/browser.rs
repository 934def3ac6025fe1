//! Headless browser fetcher.
//!
//! One Chromium instance is shared by every fetch. Each fetch opens its own
//! tab, navigates, waits for the page to settle, reads the rendered DOM and
//! closes the tab again.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::ops::Deref;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{reject_invalid, PageFetcher};
use crate::config::BrowserFetchConfig;
use crate::core::{FetchOutcome, PageRequest};
use crate::errors::{ConfigurationError, FailureReason, PagesweepError};

/// Scoped ownership of one browser tab.
///
/// Close it explicitly with [`TabGuard::close`]. If the guard is dropped
/// instead (a timeout cancelled the fetch future, or a task was aborted),
/// the close is spawned onto the runtime captured at construction.
pub struct TabGuard {
    page: Option<Page>,
    url: String,
    runtime: tokio::runtime::Handle,
}

impl TabGuard {
    /// Wraps a freshly opened tab.
    #[must_use]
    pub fn new(page: Page, url: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            url: url.into(),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Closes the tab, consuming the guard.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            match page.close().await {
                Ok(()) => trace!(url = %self.url, "Tab closed"),
                Err(e) => warn!(url = %self.url, error = %e, "Failed to close tab"),
            }
        }
    }
}

impl Deref for TabGuard {
    type Target = Option<Page>;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let url = std::mem::take(&mut self.url);
            self.runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!(url = %url, error = %e, "Deferred tab close failed");
                } else {
                    trace!(url = %url, "Deferred tab close succeeded");
                }
            });
        }
    }
}

/// Fetches pages by rendering them in headless Chromium.
pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserFetchConfig,
}

impl BrowserFetcher {
    /// Launches Chromium and starts its event handler.
    pub async fn launch(config: BrowserFetchConfig) -> Result<Self, PagesweepError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref executable) = config.executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder
            .build()
            .map_err(|e| ConfigurationError::new("browser", e))?;

        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| PagesweepError::Transport(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler error");
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            config,
        })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &BrowserFetchConfig {
        &self.config
    }

    /// Closes the browser and stops its handler.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
    }

    async fn render(&self, request: &PageRequest) -> FetchOutcome {
        let tab = match self.browser.new_page("about:blank").await {
            Ok(page) => TabGuard::new(page, request.url()),
            Err(e) => {
                return FetchOutcome::retryable(FailureReason::navigation(format!(
                    "failed to open tab: {e}"
                )))
            }
        };

        let Some(page) = tab.as_ref() else {
            return FetchOutcome::retryable(FailureReason::navigation("tab already closed"));
        };

        let outcome = match page.goto(request.url()).await {
            Err(e) => FetchOutcome::retryable(FailureReason::navigation(e.to_string())),
            Ok(page) => {
                tokio::time::sleep(self.config.settle_delay()).await;
                match page.content().await {
                    Ok(html) => FetchOutcome::success(html),
                    Err(e) => FetchOutcome::retryable(FailureReason::navigation(format!(
                        "failed to read DOM: {e}"
                    ))),
                }
            }
        };

        tab.close().await;
        outcome
    }
}

impl std::fmt::Debug for BrowserFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, request: &PageRequest, timeout: Duration) -> FetchOutcome {
        if let Some(rejected) = reject_invalid(request) {
            return rejected;
        }

        // On timeout the render future is dropped and its TabGuard closes the tab.
        match tokio::time::timeout(timeout, self.render(request)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::retryable(FailureReason::timeout(timeout.as_millis())),
        }
    }
}

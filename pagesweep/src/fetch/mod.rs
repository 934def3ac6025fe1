//! Page fetching.
//!
//! A [`PageFetcher`] turns one [`PageRequest`] into one [`FetchOutcome`].
//! Implementations own their per-call resources (a pooled connection, a
//! browser tab) and release them before returning, on every path.

#[cfg(feature = "browser")]
mod browser;
#[cfg(feature = "http")]
mod http;

#[cfg(feature = "browser")]
pub use browser::{BrowserFetcher, TabGuard};
#[cfg(feature = "http")]
pub use http::HttpFetcher;

use async_trait::async_trait;
use std::time::Duration;

use crate::core::{FetchOutcome, PageRequest};
use crate::errors::FailureReason;

/// Protocol for fetching a single page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a page, giving up after `timeout`.
    ///
    /// Exceeding the timeout and transport errors are retryable failures;
    /// an invalid request is a fatal failure.
    async fn fetch(&self, request: &PageRequest, timeout: Duration) -> FetchOutcome;
}

/// The fatal outcome every fetcher returns for a request that cannot exist.
#[must_use]
pub fn reject_invalid(request: &PageRequest) -> Option<FetchOutcome> {
    if request.is_valid() {
        None
    } else {
        Some(FetchOutcome::fatal(FailureReason::invalid_request(format!(
            "page number must be positive, got {} ({})",
            request.page_number(),
            request.url()
        ))))
    }
}

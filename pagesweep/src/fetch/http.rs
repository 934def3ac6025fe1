//! Plain HTTP GET fetcher.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::trace;

use super::{reject_invalid, PageFetcher};
use crate::config::HttpFetchConfig;
use crate::core::{FetchOutcome, PageRequest};
use crate::errors::{ConfigurationError, FailureReason};

/// Fetches pages with a shared `reqwest` client.
///
/// Connections come from the client's pool and go back to it when the
/// response body has been read or dropped, so nothing outlives one call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpFetchConfig,
}

impl HttpFetcher {
    /// Builds a fetcher from its configuration.
    pub fn new(config: HttpFetchConfig) -> Result<Self, ConfigurationError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigurationError::new("http.headers", format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ConfigurationError::new("http.headers", format!("invalid value for '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ConfigurationError::new("http", e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &HttpFetchConfig {
        &self.config
    }

    fn classify_status(&self, status: u16) -> FetchOutcome {
        let reason = FailureReason::http_status(status);
        if self.config.should_retry_status(status) {
            FetchOutcome::retryable(reason)
        } else {
            FetchOutcome::fatal(reason)
        }
    }
}

fn classify_error(err: &reqwest::Error, timeout: Duration) -> FetchOutcome {
    if err.is_timeout() {
        FetchOutcome::retryable(FailureReason::timeout(timeout.as_millis()))
    } else if err.is_builder() {
        FetchOutcome::fatal(FailureReason::invalid_request(err.to_string()))
    } else {
        FetchOutcome::retryable(FailureReason::transport(err.to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest, timeout: Duration) -> FetchOutcome {
        if let Some(rejected) = reject_invalid(request) {
            return rejected;
        }

        let response = match self.client.get(request.url()).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e, timeout),
        };

        let status = response.status();
        trace!(page = request.page_number(), status = status.as_u16(), "Response received");
        if !status.is_success() {
            return self.classify_status(status.as_u16());
        }

        match response.text().await {
            Ok(body) => FetchOutcome::success(body),
            Err(e) => classify_error(&e, timeout),
        }
    }
}

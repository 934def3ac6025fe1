//! Engine builder.

use std::sync::Arc;

use super::PaginationEngine;
use crate::cancellation::CancellationToken;
use crate::config::SweepConfig;
use crate::errors::ConfigurationError;
use crate::events::{NoOpObserver, SweepObserver};
use crate::extract::ExtractionStrategy;
use crate::fetch::PageFetcher;

/// Builder for [`PaginationEngine`].
///
/// The configuration is validated by [`build`](Self::build), so a bad
/// setting is reported before any page is requested.
pub struct PaginationEngineBuilder {
    config: SweepConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    extractor: Option<Arc<dyn ExtractionStrategy>>,
    observer: Arc<dyn SweepObserver>,
    cancellation: Arc<CancellationToken>,
}

impl PaginationEngineBuilder {
    /// Starts a builder from a configuration.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            fetcher: None,
            extractor: None,
            observer: Arc::new(NoOpObserver),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the page fetcher.
    #[must_use]
    pub fn fetcher(self, fetcher: impl PageFetcher + 'static) -> Self {
        self.shared_fetcher(Arc::new(fetcher))
    }

    /// Sets a page fetcher that the caller keeps a handle to.
    #[must_use]
    pub fn shared_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the extraction strategy.
    #[must_use]
    pub fn extractor(self, extractor: impl ExtractionStrategy + 'static) -> Self {
        self.shared_extractor(Arc::new(extractor))
    }

    /// Sets an extraction strategy that the caller keeps a handle to.
    #[must_use]
    pub fn shared_extractor(mut self, extractor: Arc<dyn ExtractionStrategy>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Sets the observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn SweepObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Validates the configuration and builds the engine.
    ///
    /// Without an explicit fetcher, an HTTP fetcher is built from the
    /// configuration's `http` section.
    pub fn build(self) -> Result<PaginationEngine, ConfigurationError> {
        let template = self.config.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => default_fetcher(&self.config)?,
        };
        let extractor = self.extractor.ok_or_else(|| {
            ConfigurationError::new("extractor", "no extraction strategy configured")
                .with_fix_hint("pass a CssExtractor, a preset's extractor, or a closure")
        })?;

        Ok(PaginationEngine {
            config: self.config,
            template,
            fetcher,
            extractor,
            observer: self.observer,
            cancellation: self.cancellation,
        })
    }
}

#[cfg(feature = "http")]
fn default_fetcher(config: &SweepConfig) -> Result<Arc<dyn PageFetcher>, ConfigurationError> {
    Ok(Arc::new(crate::fetch::HttpFetcher::new(config.http.clone())?))
}

#[cfg(not(feature = "http"))]
fn default_fetcher(_config: &SweepConfig) -> Result<Arc<dyn PageFetcher>, ConfigurationError> {
    Err(ConfigurationError::new("fetcher", "no page fetcher configured")
        .with_fix_hint("enable the `http` feature or pass a fetcher"))
}

impl std::fmt::Debug for PaginationEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationEngineBuilder")
            .field("config", &self.config)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("has_extractor", &self.extractor.is_some())
            .finish_non_exhaustive()
    }
}

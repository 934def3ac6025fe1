//! # Pagesweep
//!
//! A batched, concurrency-bounded pagination engine for scraping catalog
//! listings.
//!
//! Pagesweep walks a paginated listing whose URLs follow a template such as
//! `https://shop.example/catalog?page={}`. It provides:
//!
//! - **Batched sweeps**: pages are requested in fixed-size batches, and the
//!   first batch that yields no records ends the sweep
//! - **Bounded concurrency**: a run-wide limiter caps simultaneous fetches
//! - **Retry with backoff**: transient failures are retried with linear,
//!   exponential or constant delays, each attempt under a timeout
//! - **Pluggable fetching and extraction**: plain HTTP, a headless browser,
//!   CSS-selector extraction or any closure over the page markup
//! - **Cancellation and observability**: a shared token stops the sweep,
//!   observers see every batch, attempt and retry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagesweep::prelude::*;
//! use std::sync::Arc;
//!
//! let extractor = CssExtractor::new(
//!     "article.product_pod",
//!     vec!["title=h3 a@title".parse()?, "price=.price_color".parse()?],
//! )?;
//!
//! let engine = PaginationEngine::builder(SweepConfig::new(
//!     "https://books.toscrape.com/catalogue/page-{}.html",
//! ))
//! .extractor(extractor)
//! .observer(Arc::new(LoggingObserver::default()))
//! .build()?;
//!
//! let result = engine.run().await;
//! println!("{}", result.report);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod limiter;
pub mod retry;
pub mod sink;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        BackoffStrategy, BrowserFetchConfig, HttpFetchConfig, JitterStrategy,
        RetryConfig, SweepConfig,
    };
    pub use crate::core::{
        AggregateResult, Batch, FetchOutcome, PageRecords, PageRequest, Record,
        UrlTemplate,
    };
    pub use crate::engine::{
        PaginationEngine, PaginationEngineBuilder, StopReason, SweepProgress,
        SweepReport, SweepResult,
    };
    pub use crate::errors::{
        ConfigurationError, FailureKind, FailureReason, PagesweepError, SinkError,
    };
    pub use crate::events::{
        CollectingObserver, LoggingObserver, NoOpObserver, SweepEvent, SweepObserver,
    };
    pub use crate::extract::{
        CssExtractor, ExtractionStrategy, FieldSource, FieldSpec, SitePreset,
    };
    #[cfg(feature = "browser")]
    pub use crate::fetch::BrowserFetcher;
    #[cfg(feature = "http")]
    pub use crate::fetch::HttpFetcher;
    pub use crate::fetch::PageFetcher;
    pub use crate::limiter::ConcurrencyLimiter;
    pub use crate::retry::RetryPolicy;
    pub use crate::sink::{CsvSink, MemorySink, ResultSink, SinkReceipt};
}

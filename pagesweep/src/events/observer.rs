//! Sweep observer trait and implementations.

use parking_lot::RwLock;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn, Level};

use crate::core::{Batch, PageRequest};
use crate::engine::StopReason;
use crate::errors::FailureReason;

/// Observability callbacks for a sweep.
///
/// Callbacks run on the worker tasks and the coordinating flow, so they
/// must be cheap and must not block.
pub trait SweepObserver: Send + Sync {
    /// Called when a batch is about to be dispatched.
    fn on_batch_start(&self, batch: &Batch);

    /// Called before each fetch attempt; `attempt` starts at 1.
    fn on_fetch_attempt(&self, request: &PageRequest, attempt: u32);

    /// Called when a retryable failure will be retried after `delay`.
    fn on_retry_scheduled(
        &self,
        request: &PageRequest,
        attempt: u32,
        delay: Duration,
        reason: &FailureReason,
    );

    /// Called when a page was fetched and extracted.
    fn on_page_complete(&self, request: &PageRequest, records: usize);

    /// Called when a page contributes nothing because every attempt failed.
    fn on_page_failed(&self, request: &PageRequest, reason: &FailureReason, attempts: u32);

    /// Called after the batch barrier, with the batch's record count.
    fn on_batch_complete(&self, batch: &Batch, records: usize);

    /// Called once when the sweep reaches its terminal state.
    fn on_stop(&self, reason: StopReason);
}

/// No-op implementation of SweepObserver.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl SweepObserver for NoOpObserver {
    fn on_batch_start(&self, _batch: &Batch) {}
    fn on_fetch_attempt(&self, _request: &PageRequest, _attempt: u32) {}
    fn on_retry_scheduled(&self, _request: &PageRequest, _attempt: u32, _delay: Duration, _reason: &FailureReason) {}
    fn on_page_complete(&self, _request: &PageRequest, _records: usize) {}
    fn on_page_failed(&self, _request: &PageRequest, _reason: &FailureReason, _attempts: u32) {}
    fn on_batch_complete(&self, _batch: &Batch, _records: usize) {}
    fn on_stop(&self, _reason: StopReason) {}
}

/// An observer that logs sweep progress through `tracing`.
///
/// Batch-level events go out at the configured level, per-attempt events
/// at debug. Exhausted pages are always logged as warnings.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingObserver {
    /// Creates a new logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, message: &str, first_page: u32, last_page: u32, records: Option<usize>) {
        if self.level == Level::DEBUG {
            debug!(first_page, last_page, records, "{}", message);
        } else {
            info!(first_page, last_page, records, "{}", message);
        }
    }
}

impl SweepObserver for LoggingObserver {
    fn on_batch_start(&self, batch: &Batch) {
        let range = batch.page_range();
        self.log("Scraping batch", range.start, range.end.saturating_sub(1), None);
    }

    fn on_fetch_attempt(&self, request: &PageRequest, attempt: u32) {
        debug!(page = request.page_number(), url = %request.url(), attempt, "Fetching page");
    }

    fn on_retry_scheduled(
        &self,
        request: &PageRequest,
        attempt: u32,
        delay: Duration,
        reason: &FailureReason,
    ) {
        debug!(
            page = request.page_number(),
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            reason = %reason,
            "Retrying page"
        );
    }

    fn on_page_complete(&self, request: &PageRequest, records: usize) {
        debug!(page = request.page_number(), records, "Page extracted");
    }

    fn on_page_failed(&self, request: &PageRequest, reason: &FailureReason, attempts: u32) {
        warn!(
            page = request.page_number(),
            url = %request.url(),
            attempts,
            reason = %reason,
            "Page yielded no records after exhausting attempts"
        );
    }

    fn on_batch_complete(&self, batch: &Batch, records: usize) {
        let range = batch.page_range();
        self.log("Batch complete", range.start, range.end.saturating_sub(1), Some(records));
    }

    fn on_stop(&self, reason: StopReason) {
        info!(reason = %reason, "Sweep finished");
    }
}

/// A recorded observer callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SweepEvent {
    /// A batch was dispatched.
    BatchStarted {
        /// Batch index.
        index: usize,
        /// Page numbers in the batch.
        pages: Vec<u32>,
    },
    /// A fetch attempt began.
    FetchAttempt {
        /// Page number.
        page: u32,
        /// Attempt number, from 1.
        attempt: u32,
    },
    /// A retry was scheduled.
    RetryScheduled {
        /// Page number.
        page: u32,
        /// The attempt that failed.
        attempt: u32,
        /// Wait before the next attempt.
        delay: Duration,
    },
    /// A page was extracted.
    PageCompleted {
        /// Page number.
        page: u32,
        /// Records extracted.
        records: usize,
    },
    /// A page failed permanently.
    PageFailed {
        /// Page number.
        page: u32,
        /// Final failure.
        reason: FailureReason,
        /// Attempts made.
        attempts: u32,
    },
    /// A batch passed its barrier.
    BatchCompleted {
        /// Batch index.
        index: usize,
        /// Records the batch produced.
        records: usize,
    },
    /// The sweep stopped.
    Stopped {
        /// Why it stopped.
        reason: StopReason,
    },
}

/// An observer that keeps every event, for tests and progress displays.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RwLock<Vec<SweepEvent>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Retry delays scheduled for one page, in order.
    #[must_use]
    pub fn retry_delays(&self, page: u32) -> Vec<Duration> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                SweepEvent::RetryScheduled { page: p, delay, .. } if *p == page => Some(*delay),
                _ => None,
            })
            .collect()
    }

    /// Page lists of every dispatched batch, in dispatch order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<u32>> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                SweepEvent::BatchStarted { pages, .. } => Some(pages.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SweepEvent) {
        self.events.write().push(event);
    }
}

impl SweepObserver for CollectingObserver {
    fn on_batch_start(&self, batch: &Batch) {
        self.push(SweepEvent::BatchStarted {
            index: batch.index(),
            pages: batch.requests().iter().map(PageRequest::page_number).collect(),
        });
    }

    fn on_fetch_attempt(&self, request: &PageRequest, attempt: u32) {
        self.push(SweepEvent::FetchAttempt {
            page: request.page_number(),
            attempt,
        });
    }

    fn on_retry_scheduled(
        &self,
        request: &PageRequest,
        attempt: u32,
        delay: Duration,
        _reason: &FailureReason,
    ) {
        self.push(SweepEvent::RetryScheduled {
            page: request.page_number(),
            attempt,
            delay,
        });
    }

    fn on_page_complete(&self, request: &PageRequest, records: usize) {
        self.push(SweepEvent::PageCompleted {
            page: request.page_number(),
            records,
        });
    }

    fn on_page_failed(&self, request: &PageRequest, reason: &FailureReason, attempts: u32) {
        self.push(SweepEvent::PageFailed {
            page: request.page_number(),
            reason: reason.clone(),
            attempts,
        });
    }

    fn on_batch_complete(&self, batch: &Batch, records: usize) {
        self.push(SweepEvent::BatchCompleted {
            index: batch.index(),
            records,
        });
    }

    fn on_stop(&self, reason: StopReason) {
        self.push(SweepEvent::Stopped { reason });
    }
}

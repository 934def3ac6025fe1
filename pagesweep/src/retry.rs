//! Retry policy around a page fetcher.

use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::cancellation::CancellationToken;
use crate::config::RetryConfig;
use crate::core::{FetchOutcome, PageRequest};
use crate::errors::FailureReason;
use crate::events::{NoOpObserver, SweepObserver};
use crate::fetch::PageFetcher;

/// The final outcome of a page and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted {
    /// The last outcome observed.
    pub outcome: FetchOutcome,
    /// Fetch calls made, at least 1 unless the sweep was cancelled first.
    pub attempts: u32,
}

/// Retries retryable failures with backoff, and paces successful fetches.
///
/// Algorithm for one request:
/// 1. call the fetcher, bounded by the fetch timeout;
/// 2. on success, wait the post-success delay and return;
/// 3. on a fatal failure, return at once;
/// 4. on a retryable failure, wait the backoff for that attempt and go to 1,
///    unless this was the last attempt, in which case return the failure.
///
/// Cancellation cuts every wait short. An attempt already in progress is
/// allowed to finish within its timeout.
#[derive(Clone)]
pub struct RetryPolicy {
    fetcher: Arc<dyn PageFetcher>,
    config: RetryConfig,
    fetch_timeout: Duration,
    post_success_delay: Duration,
    observer: Arc<dyn SweepObserver>,
    cancellation: Option<Arc<CancellationToken>>,
}

impl RetryPolicy {
    /// Creates a policy with no post-success delay and no observer.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: RetryConfig, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            config,
            fetch_timeout,
            post_success_delay: Duration::ZERO,
            observer: Arc::new(NoOpObserver),
            cancellation: None,
        }
    }

    /// Sets the pause that follows every successful fetch.
    #[must_use]
    pub fn with_post_success_delay(mut self, delay: Duration) -> Self {
        self.post_success_delay = delay;
        self
    }

    /// Sets the observer notified of attempts and retries.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SweepObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the token that cuts waits short.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Gets the retry configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Fetches a page, retrying as configured.
    pub async fn execute(&self, request: &PageRequest) -> FetchOutcome {
        self.execute_counted(request).await.outcome
    }

    /// Like [`execute`](Self::execute), also reporting the attempt count.
    pub async fn execute_counted(&self, request: &PageRequest) -> Attempted {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if self.is_cancelled() {
                return Attempted {
                    outcome: FetchOutcome::retryable(FailureReason::cancelled(
                        "sweep cancelled before the next attempt",
                    )),
                    attempts: attempt,
                };
            }

            attempt += 1;
            self.observer.on_fetch_attempt(request, attempt);
            let outcome = self.attempt(request).await;

            match outcome {
                FetchOutcome::Success { .. } => {
                    self.pause(self.post_success_delay).await;
                    return Attempted {
                        outcome,
                        attempts: attempt,
                    };
                }
                FetchOutcome::FatalFailure { .. } => {
                    return Attempted {
                        outcome,
                        attempts: attempt,
                    };
                }
                FetchOutcome::RetryableFailure { ref reason } => {
                    if attempt >= max_attempts {
                        return Attempted {
                            outcome,
                            attempts: attempt,
                        };
                    }

                    let delay = self.config.delay_for_attempt(attempt);
                    self.observer.on_retry_scheduled(request, attempt, delay, reason);
                    if !self.pause(delay).await {
                        return Attempted {
                            outcome: FetchOutcome::retryable(FailureReason::cancelled(format!(
                                "sweep cancelled during backoff after: {reason}"
                            ))),
                            attempts: attempt,
                        };
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: &PageRequest) -> FetchOutcome {
        let timeout = self.fetch_timeout;
        // The fetcher is told its timeout, but a misbehaving one is still cut off here.
        match tokio::time::timeout(timeout, self.fetcher.fetch(request, timeout)).await {
            Ok(outcome) => {
                trace!(page = request.page_number(), outcome = outcome.label(), "Attempt finished");
                outcome
            }
            Err(_) => FetchOutcome::retryable(FailureReason::timeout(timeout.as_millis())),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Sleeps for `delay`. Returns false if cancellation interrupted it.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.is_cancelled();
        }
        match &self.cancellation {
            Some(token) => tokio::select! {
                () = tokio::time::sleep(delay) => true,
                () = token.cancelled() => false,
            },
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("post_success_delay", &self.post_success_delay)
            .finish_non_exhaustive()
    }
}

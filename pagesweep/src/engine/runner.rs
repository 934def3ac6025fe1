//! The pagination engine.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::state::{batch_had_failures, is_end_of_pagination, EngineState, PageOutcome};
use super::{PaginationEngineBuilder, StopReason, SweepProgress, SweepReport, SweepResult};
use crate::cancellation::CancellationToken;
use crate::config::SweepConfig;
use crate::core::{AggregateResult, Batch, FetchOutcome, PageRequest, UrlTemplate};
use crate::errors::{FailureKind, FailureReason, PagesweepError};
use crate::events::SweepObserver;
use crate::extract::ExtractionStrategy;
use crate::fetch::PageFetcher;
use crate::limiter::ConcurrencyLimiter;
use crate::retry::RetryPolicy;
use crate::sink::{ResultSink, SinkReceipt};

/// Drives a paginated listing in fixed-size batches until it runs dry.
///
/// Batches run strictly one after another. Within a batch every page is
/// its own task; a shared [`ConcurrencyLimiter`] caps how many of them
/// fetch at once. A batch that yields no records at all ends the sweep.
pub struct PaginationEngine {
    pub(super) config: SweepConfig,
    pub(super) template: UrlTemplate,
    pub(super) fetcher: Arc<dyn PageFetcher>,
    pub(super) extractor: Arc<dyn ExtractionStrategy>,
    pub(super) observer: Arc<dyn SweepObserver>,
    pub(super) cancellation: Arc<CancellationToken>,
}

/// Everything a page task needs, cloned once per page.
#[derive(Clone)]
struct PageWorker {
    limiter: ConcurrencyLimiter,
    retry: Arc<RetryPolicy>,
    extractor: Arc<dyn ExtractionStrategy>,
    observer: Arc<dyn SweepObserver>,
}

impl PageWorker {
    async fn run(self, request: PageRequest) -> PageOutcome {
        let Some(permit) = self.limiter.acquire().await else {
            debug!(page = request.page_number(), "Sweep cancelled before the page got a fetch slot");
            return PageOutcome::failed(
                request,
                FailureReason::cancelled("sweep cancelled while waiting for a fetch slot"),
                0,
            );
        };
        let attempted = self.retry.execute_counted(&request).await;
        permit.release();

        match attempted.outcome {
            FetchOutcome::Success { markup } => {
                let records = self.extractor.extract(&markup);
                self.observer.on_page_complete(&request, records.len());
                PageOutcome::extracted(request, records, attempted.attempts)
            }
            FetchOutcome::RetryableFailure { reason } | FetchOutcome::FatalFailure { reason } => {
                if reason.kind == FailureKind::Cancelled {
                    debug!(page = request.page_number(), "Page abandoned on cancellation");
                } else {
                    self.observer.on_page_failed(&request, &reason, attempted.attempts);
                }
                PageOutcome::failed(request, reason, attempted.attempts)
            }
        }
    }
}

fn transition(state: &mut EngineState, next: EngineState) {
    trace!(from = %state, to = %next, "Engine state");
    *state = next;
}

impl PaginationEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder(config: SweepConfig) -> PaginationEngineBuilder {
        PaginationEngineBuilder::new(config)
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Gets the parsed URL template.
    #[must_use]
    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// The token that stops this engine's sweeps.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Runs a sweep to completion.
    ///
    /// Never fails: page failures are absorbed and show up in the report.
    pub async fn run(&self) -> SweepResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            template = %self.template,
            batch_size = self.config.batch_size,
            max_concurrency = self.config.max_concurrency,
            "Sweep started"
        );

        let limiter = ConcurrencyLimiter::new(self.config.max_concurrency);
        let watcher = {
            let limiter = limiter.clone();
            let token = Arc::clone(&self.cancellation);
            tokio::spawn(async move {
                token.cancelled().await;
                limiter.close();
            })
        };

        let retry = RetryPolicy::new(
            Arc::clone(&self.fetcher),
            self.config.retry.clone(),
            self.config.fetch_timeout(),
        )
        .with_post_success_delay(self.config.post_success_delay())
        .with_observer(Arc::clone(&self.observer))
        .with_cancellation(Arc::clone(&self.cancellation));

        let worker = PageWorker {
            limiter: limiter.clone(),
            retry: Arc::new(retry),
            extractor: Arc::clone(&self.extractor),
            observer: Arc::clone(&self.observer),
        };

        let mut state = EngineState::initial();
        let mut aggregate = AggregateResult::new();
        let mut progress = SweepProgress {
            page_limit: self.config.max_pages,
            ..SweepProgress::default()
        };
        let mut empty_batch_had_failures = false;
        let mut batch_index = 0;
        let mut next_page: u32 = 1;

        let reason = loop {
            if self.cancellation.is_cancelled() {
                break StopReason::Cancelled;
            }

            let batch = Batch::new(
                batch_index,
                next_page,
                self.config.batch_size,
                self.config.max_pages,
                &self.template,
            );
            if batch.is_empty() {
                break StopReason::PageLimit;
            }

            transition(&mut state, EngineState::BatchInFlight { batch: batch_index });
            self.observer.on_batch_start(&batch);
            let outcomes = self.run_batch(&batch, &worker).await;

            transition(&mut state, EngineState::Draining { batch: batch_index });
            progress.batches += 1;
            progress.pages_requested += batch.len();
            for outcome in &outcomes {
                if outcome.is_abandoned() {
                    continue;
                }
                if outcome.is_failure() {
                    progress.pages_failed += 1;
                } else {
                    progress.pages_succeeded += 1;
                }
            }

            let finished = is_end_of_pagination(&outcomes);
            let had_failures = batch_had_failures(&outcomes);
            let merged = aggregate.merge_batch(
                outcomes
                    .into_iter()
                    .map(PageOutcome::into_page_records)
                    .collect(),
            );
            progress.records = aggregate.len();
            self.observer.on_batch_complete(&batch, merged);

            if self.cancellation.is_cancelled() {
                break StopReason::Cancelled;
            }
            if finished {
                empty_batch_had_failures = had_failures;
                if had_failures {
                    warn!(
                        batch = batch_index,
                        "Batch produced no records but had failed pages; stopping anyway"
                    );
                }
                break StopReason::EmptyBatch;
            }

            next_page = batch.page_range().end;
            if self.config.max_pages.is_some_and(|limit| next_page > limit) {
                break StopReason::PageLimit;
            }
            batch_index += 1;

            if !self.pause_between_batches().await {
                break StopReason::Cancelled;
            }
            transition(&mut state, EngineState::Running { next_page });
        };

        transition(&mut state, EngineState::Done { reason });
        watcher.abort();
        progress.peak_concurrency = limiter.high_water_mark();
        self.observer.on_stop(reason);

        let report = SweepReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            progress,
            stop_reason: reason,
            empty_batch_had_failures,
        };
        info!(%run_id, records = progress.records, batches = progress.batches, reason = %reason, "Sweep finished");

        SweepResult {
            records: aggregate,
            report,
        }
    }

    /// Runs a sweep and hands the records to `sink`.
    ///
    /// Only the export can fail; the sweep itself always completes.
    pub async fn run_into(
        &self,
        sink: &dyn ResultSink,
    ) -> Result<(SweepResult, SinkReceipt), PagesweepError> {
        let result = self.run().await;
        let receipt = sink.write(result.records.records()).await?;
        info!(
            records = receipt.records_written,
            destination = %receipt.destination,
            "Records exported"
        );
        Ok((result, receipt))
    }

    /// Spawns one task per page and waits for all of them.
    async fn run_batch(&self, batch: &Batch, worker: &PageWorker) -> Vec<PageOutcome> {
        let handles: Vec<_> = batch
            .requests()
            .iter()
            .cloned()
            .map(|request| tokio::spawn(worker.clone().run(request)))
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(batch.requests())
            .map(|(joined, request)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let reason = FailureReason::aborted(e.to_string());
                    warn!(page = request.page_number(), error = %e, "Page task died");
                    self.observer.on_page_failed(request, &reason, 0);
                    PageOutcome::failed(request.clone(), reason, 0)
                }
            })
            .collect()
    }

    /// Sleeps the inter-batch delay. Returns false if cancelled meanwhile.
    async fn pause_between_batches(&self) -> bool {
        let delay = self.config.inter_batch_delay();
        if delay.is_zero() {
            return !self.cancellation.is_cancelled();
        }
        debug!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "Pausing between batches");
        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            () = self.cancellation.cancelled() => false,
        }
    }
}

impl std::fmt::Debug for PaginationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationEngine")
            .field("config", &self.config)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

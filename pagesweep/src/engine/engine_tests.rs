//! Scenario tests for the pagination engine.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::{RetryConfig, SweepConfig};
    use crate::core::{FetchOutcome, Record};
    use crate::engine::{PaginationEngine, StopReason};
    use crate::errors::{FailureKind, FailureReason};
    use crate::events::{CollectingObserver, SweepEvent};
    use crate::extract::ExtractionStrategy;
    use crate::sink::MemorySink;
    use crate::testing::{fixed_records, listing_extractor, listing_markup, ScriptedFetcher};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const TEMPLATE: &str = "http://x/p{}.html";

    fn config(batch_size: usize) -> SweepConfig {
        SweepConfig::new(TEMPLATE)
            .with_batch_size(batch_size)
            .with_max_concurrency(batch_size)
    }

    fn engine(config: SweepConfig, fetcher: &Arc<ScriptedFetcher>) -> PaginationEngine {
        PaginationEngine::builder(config)
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .build()
            .unwrap()
    }

    fn catalog_records(pages: u32, per_page: usize) -> Vec<Record> {
        (1..=pages).flat_map(|p| fixed_records(p, per_page)).collect()
    }

    fn unavailable() -> FetchOutcome {
        FetchOutcome::retryable(FailureReason::http_status(503))
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_full_pages_batch_of_two() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(3, 2));
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        let result = engine.run().await;

        assert_eq!(observer.batches(), vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(result.records.len(), 6);
        assert_eq!(result.records.records(), catalog_records(3, 2).as_slice());
        assert_eq!(result.report.stop_reason, StopReason::EmptyBatch);
        assert_eq!(result.report.progress.batches, 3);
        assert_eq!(result.report.progress.pages_requested, 6);
        assert!(!result.report.empty_batch_had_failures);
        assert_eq!(
            observer.events().last(),
            Some(&SweepEvent::Stopped {
                reason: StopReason::EmptyBatch
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_batch_past_the_last_page() {
        for batch_size in 1..=4_usize {
            for last_page in 0..=7_u32 {
                let fetcher = Arc::new(ScriptedFetcher::catalog(last_page, 3));
                let result = engine(config(batch_size), &fetcher).run().await;

                assert_eq!(
                    result.records.records(),
                    catalog_records(last_page, 3).as_slice(),
                    "batch_size={batch_size} last_page={last_page}"
                );

                // The stopping batch is the first one starting after the last page.
                let size = u32::try_from(batch_size).unwrap();
                let stop_start = last_page.div_ceil(size) * size + 1;
                let last_requested = stop_start + size - 1;
                assert_eq!(result.records.pages_merged(), (1..=last_requested).collect::<Vec<_>>());
                for page in 1..=last_requested {
                    assert_eq!(fetcher.calls(page), 1, "page {page} fetched once");
                }
                assert_eq!(fetcher.calls(last_requested + 1), 0);
                assert_eq!(result.report.stop_reason, StopReason::EmptyBatch);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_is_identical() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(5, 2));
        let engine = engine(config(3), &fetcher);

        let first = engine.run().await;
        let second = engine.run().await;

        assert_eq!(first.records, second.records);
        assert_ne!(first.report.run_id, second.report.run_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_recovers_after_two_failures() {
        let fetcher = Arc::new(
            ScriptedFetcher::catalog(3, 2).failing_first(2, [unavailable(), unavailable()]),
        );
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        let result = engine.run().await;

        assert_eq!(fetcher.calls(2), 3);
        assert_eq!(result.records.records(), catalog_records(3, 2).as_slice());
        let page_two = result.records.records().iter().filter(|r| &r["page"] == "2").count();
        assert_eq!(page_two, 2);
        assert_eq!(
            observer.retry_delays(2),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(result.report.progress.pages_failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_page_yields_nothing_and_run_continues() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(4, 1).with_script(2, [unavailable()]));
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        let result = engine.run().await;

        assert_eq!(fetcher.calls(2), 3);
        let pages: Vec<&str> = result.records.records().iter().map(|r| &r["page"]).collect();
        assert_eq!(pages, vec!["1", "3", "4"]);
        assert_eq!(result.report.progress.pages_failed, 1);
        assert!(observer.events().iter().any(|e| matches!(
            e,
            SweepEvent::PageFailed { page: 2, attempts: 3, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_page_is_fetched_once() {
        let fetcher = Arc::new(
            ScriptedFetcher::catalog(2, 1)
                .with_script(2, [FetchOutcome::fatal(FailureReason::http_status(404))]),
        );
        let result = engine(config(2), &fetcher).run().await;

        assert_eq!(fetcher.calls(2), 1);
        assert_eq!(result.records.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_batch_stops_and_is_flagged() {
        let fetcher = Arc::new(
            ScriptedFetcher::catalog(6, 1)
                .with_script(1, [unavailable()])
                .with_script(2, [unavailable()]),
        );
        let result = engine(config(2), &fetcher).run().await;

        assert!(result.records.is_empty());
        assert_eq!(result.report.stop_reason, StopReason::EmptyBatch);
        assert!(result.report.empty_batch_had_failures);
        assert_eq!(fetcher.calls(3), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_limit() {
        let fetcher = Arc::new(
            ScriptedFetcher::catalog(12, 1).with_latency(Duration::from_millis(700)),
        );
        let config = SweepConfig::new(TEMPLATE)
            .with_batch_size(6)
            .with_max_concurrency(2);
        let result = engine(config, &fetcher).run().await;

        assert_eq!(result.records.len(), 12);
        assert_eq!(fetcher.peak_concurrency(), 2);
        assert!(result.report.progress.peak_concurrency <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_paced_sequentially() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(2, 1));
        let config = config(1)
            .with_post_success_delay(Duration::from_secs(1))
            .with_inter_batch_delay(Duration::from_secs(2));

        let start = Instant::now();
        let result = engine(config, &fetcher).run().await;

        // Three single-page batches, each followed by its courtesy delay,
        // with a pacing pause between consecutive batches.
        assert_eq!(result.report.progress.batches, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_limit_truncates_last_batch() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(10, 1));
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2).with_max_pages(5))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        let result = engine.run().await;

        assert_eq!(observer.batches(), vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.report.stop_reason, StopReason::PageLimit);
        assert_eq!(result.report.progress.percent(), Some(100.0));
        assert_eq!(fetcher.calls(6), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_fetches_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(3, 1));
        let token = Arc::new(CancellationToken::new());
        token.cancel("user abort");

        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .cancellation(token)
            .build()
            .unwrap();
        let result = engine.run().await;

        assert_eq!(result.report.stop_reason, StopReason::Cancelled);
        assert_eq!(fetcher.total_calls(), 0);
        assert!(result.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_records_and_starts_no_new_batch() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_fallback(FetchOutcome::success(listing_markup(0, 1)))
                .with_latency(Duration::from_secs(1)),
        );
        let config = config(2)
            .with_post_success_delay(Duration::ZERO)
            .with_inter_batch_delay(Duration::from_secs(10));
        let engine = engine(config, &fetcher);

        let token = Arc::clone(engine.cancellation());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            token.cancel("ctrl-c");
        });

        let start = Instant::now();
        let result = engine.run().await;

        assert_eq!(result.report.stop_reason, StopReason::Cancelled);
        assert_eq!(result.report.progress.batches, 1);
        assert_eq!(result.records.len(), 2);
        assert_eq!(fetcher.total_calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_is_not_a_page_failure() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(3, 1).with_script(2, [unavailable()]));
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        let token = Arc::clone(engine.cancellation());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel("ctrl-c");
        });

        let result = engine.run().await;

        assert_eq!(result.report.stop_reason, StopReason::Cancelled);
        assert_eq!(fetcher.calls(2), 1);
        assert_eq!(result.report.progress.pages_failed, 0);
        assert!(!observer
            .events()
            .iter()
            .any(|e| matches!(e, SweepEvent::PageFailed { .. })));
        let pages: Vec<&str> = result.records.records().iter().map(|r| &r["page"]).collect();
        assert_eq!(pages, vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_extractor_only_loses_its_page() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(3, 1));
        let extractor = listing_extractor();
        let engine = PaginationEngine::builder(config(3))
            .shared_fetcher(fetcher.clone())
            .extractor(move |markup: &str| {
                assert!(!markup.contains("item 2-1"), "malformed page");
                extractor.extract(markup)
            })
            .build()
            .unwrap();

        let result = engine.run().await;

        let pages: Vec<&str> = result.records.records().iter().map(|r| &r["page"]).collect();
        assert_eq!(pages, vec!["1", "3"]);
        assert_eq!(result.report.progress.pages_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_into_sink() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(2, 2));
        let sink = MemorySink::new();

        let (result, receipt) = engine(config(2), &fetcher).run_into(&sink).await.unwrap();

        assert_eq!(receipt.records_written, 4);
        assert_eq!(sink.records(), result.records.into_records());
    }

    #[tokio::test]
    async fn test_configuration_errors_before_any_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(3, 1));
        let cases = [
            (config(0), "batch_size"),
            (SweepConfig::new(TEMPLATE).with_max_concurrency(0), "max_concurrency"),
            (
                SweepConfig::new(TEMPLATE).with_retry(RetryConfig::new().with_max_attempts(0)),
                "max_attempts",
            ),
            (SweepConfig::new("http://x/list.html"), "url_template"),
        ];

        for (config, field) in cases {
            let err = PaginationEngine::builder(config)
                .shared_fetcher(fetcher.clone())
                .extractor(listing_extractor())
                .build()
                .unwrap_err();
            assert_eq!(err.field, field);
        }
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[test]
    fn test_missing_extractor_is_configuration_error() {
        let err = PaginationEngine::builder(config(2))
            .fetcher(ScriptedFetcher::new())
            .build()
            .unwrap_err();
        assert_eq!(err.field, "extractor");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_failure_kind_is_reported() {
        let fetcher = Arc::new(ScriptedFetcher::catalog(1, 1).with_script(
            2,
            [FetchOutcome::fatal(FailureReason::invalid_request("bad url"))],
        ));
        let observer = Arc::new(CollectingObserver::new());
        let engine = PaginationEngine::builder(config(2))
            .shared_fetcher(fetcher.clone())
            .extractor(listing_extractor())
            .observer(observer.clone())
            .build()
            .unwrap();

        engine.run().await;

        let failed: Vec<FailureKind> = observer
            .events()
            .iter()
            .filter_map(|e| match e {
                SweepEvent::PageFailed { reason, .. } => Some(reason.kind),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec![FailureKind::InvalidRequest]);
    }
}

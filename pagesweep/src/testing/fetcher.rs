//! A scripted page fetcher.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::fixtures::listing_markup;
use crate::core::{FetchOutcome, PageRequest};
use crate::fetch::{reject_invalid, PageFetcher};

/// A fetcher that replays per-page outcome scripts and records every call.
///
/// Each page has a queue of outcomes consumed one per call; the last one
/// repeats once the queue is down to it. Pages without a script get the
/// fallback outcome, an empty successful page unless changed.
#[derive(Debug)]
pub struct ScriptedFetcher {
    scripts: DashMap<u32, Mutex<VecDeque<FetchOutcome>>>,
    fallback: FetchOutcome,
    latency: Duration,
    calls: DashMap<u32, u32>,
    requested: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            scripts: DashMap::new(),
            fallback: FetchOutcome::success(listing_markup(0, 0)),
            latency: Duration::ZERO,
            calls: DashMap::new(),
            requested: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }
}

impl ScriptedFetcher {
    /// Creates a fetcher where every page is empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog whose pages `1..=pages` hold `per_page` items each, followed
    /// by empty pages.
    #[must_use]
    pub fn catalog(pages: u32, per_page: usize) -> Self {
        (1..=pages).fold(Self::new(), |fetcher, page| {
            fetcher.with_page(page, per_page)
        })
    }

    /// Scripts a page to succeed with `items` listing items.
    #[must_use]
    pub fn with_page(self, page: u32, items: usize) -> Self {
        self.with_script(page, [FetchOutcome::success(listing_markup(page, items))])
    }

    /// Scripts a page's outcomes, one per call.
    #[must_use]
    pub fn with_script(self, page: u32, outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
        self.scripts
            .insert(page, Mutex::new(outcomes.into_iter().collect()));
        self
    }

    /// Prepends outcomes to a page's existing script.
    #[must_use]
    pub fn failing_first(self, page: u32, failures: impl IntoIterator<Item = FetchOutcome>) -> Self {
        let failures: Vec<_> = failures.into_iter().collect();
        {
            let entry = self
                .scripts
                .entry(page)
                .or_insert_with(|| Mutex::new(VecDeque::from([self.fallback.clone()])));
            let mut script = entry.lock();
            for failure in failures.into_iter().rev() {
                script.push_front(failure);
            }
        }
        self
    }

    /// Sets the outcome for pages without a script.
    #[must_use]
    pub fn with_fallback(mut self, outcome: FetchOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Makes every call take `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Calls made for one page.
    #[must_use]
    pub fn calls(&self, page: u32) -> u32 {
        self.calls.get(&page).map_or(0, |c| *c)
    }

    /// Calls made in total.
    #[must_use]
    pub fn total_calls(&self) -> u32 {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    /// Page numbers in the order their first call started.
    #[must_use]
    pub fn pages_requested(&self) -> Vec<u32> {
        let mut seen = Vec::new();
        for page in self.requested.lock().iter() {
            if !seen.contains(page) {
                seen.push(*page);
            }
        }
        seen
    }

    /// Most calls in progress at the same time.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, page: u32) -> FetchOutcome {
        match self.scripts.get(&page) {
            Some(script) => {
                let mut script = script.lock();
                if script.len() > 1 {
                    script.pop_front().unwrap_or_else(|| self.fallback.clone())
                } else {
                    script.front().cloned().unwrap_or_else(|| self.fallback.clone())
                }
            }
            None => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest, _timeout: Duration) -> FetchOutcome {
        let page = request.page_number();
        *self.calls.entry(page).or_insert(0) += 1;
        self.requested.lock().push(page);

        if let Some(rejected) = reject_invalid(request) {
            return rejected;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self.next_outcome(page);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureReason;

    fn request(page: u32) -> PageRequest {
        PageRequest::with_url(page, format!("http://x/p{page}.html"))
    }

    #[tokio::test]
    async fn test_script_consumed_then_last_repeats() {
        let fetcher = ScriptedFetcher::new().with_script(
            2,
            [
                FetchOutcome::retryable(FailureReason::timeout(10)),
                FetchOutcome::success("ok"),
            ],
        );
        let timeout = Duration::from_secs(1);

        assert!(fetcher.fetch(&request(2), timeout).await.is_retryable());
        assert!(fetcher.fetch(&request(2), timeout).await.is_success());
        assert!(fetcher.fetch(&request(2), timeout).await.is_success());
        assert_eq!(fetcher.calls(2), 3);
        assert_eq!(fetcher.pages_requested(), vec![2]);
    }

    #[tokio::test]
    async fn test_failing_first_prepends() {
        let fetcher = ScriptedFetcher::catalog(3, 2)
            .failing_first(2, [FetchOutcome::retryable(FailureReason::transport("reset"))]);
        let timeout = Duration::from_secs(1);

        assert!(fetcher.fetch(&request(2), timeout).await.is_retryable());
        let outcome = fetcher.fetch(&request(2), timeout).await;
        assert_eq!(outcome.markup(), Some(listing_markup(2, 2).as_str()));
    }

    #[tokio::test]
    async fn test_unscripted_page_is_empty() {
        let fetcher = ScriptedFetcher::catalog(1, 1);
        let outcome = fetcher.fetch(&request(7), Duration::from_secs(1)).await;
        assert_eq!(outcome.markup(), Some(listing_markup(0, 0).as_str()));
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let fetcher = ScriptedFetcher::new();
        assert!(fetcher.fetch(&request(0), Duration::from_secs(1)).await.is_fatal());
        assert_eq!(fetcher.calls(0), 1);
    }
}

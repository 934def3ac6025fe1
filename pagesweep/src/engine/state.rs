//! Engine states and the end-of-pagination check.

use serde::Serialize;
use std::fmt;

use super::StopReason;
use crate::core::{PageRecords, PageRequest, Record};
use crate::errors::{FailureKind, FailureReason};

/// Where the coordinating flow is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    /// Ready to build the batch starting at `next_page`.
    Running {
        /// First page of the next batch.
        next_page: u32,
    },
    /// A batch's tasks are executing.
    BatchInFlight {
        /// Index of the batch.
        batch: usize,
    },
    /// The batch barrier has passed; results are being merged.
    Draining {
        /// Index of the batch.
        batch: usize,
    },
    /// Terminal.
    Done {
        /// Why the sweep ended.
        reason: StopReason,
    },
}

impl EngineState {
    /// The initial state: page 1, nothing dispatched.
    #[must_use]
    pub fn initial() -> Self {
        Self::Running { next_page: 1 }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { next_page } => write!(f, "running (next page {next_page})"),
            Self::BatchInFlight { batch } => write!(f, "batch {batch} in flight"),
            Self::Draining { batch } => write!(f, "draining batch {batch}"),
            Self::Done { reason } => write!(f, "done ({reason})"),
        }
    }
}

/// What one page task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// The page.
    pub request: PageRequest,
    /// Extracted records; empty when the page failed.
    pub records: Vec<Record>,
    /// The final failure, when no markup was obtained.
    pub failure: Option<FailureReason>,
    /// Fetch attempts made.
    pub attempts: u32,
}

impl PageOutcome {
    /// A page whose markup was fetched and extracted.
    #[must_use]
    pub fn extracted(request: PageRequest, records: Vec<Record>, attempts: u32) -> Self {
        Self {
            request,
            records,
            failure: None,
            attempts,
        }
    }

    /// A page that contributes nothing.
    #[must_use]
    pub fn failed(request: PageRequest, reason: FailureReason, attempts: u32) -> Self {
        Self {
            request,
            records: Vec::new(),
            failure: Some(reason),
            attempts,
        }
    }

    /// Whether the fetch failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Whether the page was dropped because the sweep was cancelled.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|reason| reason.kind == FailureKind::Cancelled)
    }

    /// Strips the outcome down to its page-tagged records.
    #[must_use]
    pub fn into_page_records(self) -> PageRecords {
        PageRecords {
            page_number: self.request.page_number(),
            records: self.records,
        }
    }
}

/// Whether a finished batch marks the end of the catalog.
///
/// The rule is deliberately blunt: a batch with zero records in total ends
/// pagination, whatever the reason the pages were empty. A batch in which
/// every page failed therefore also ends it; [`batch_had_failures`] lets
/// the caller tell the two apart afterwards.
#[must_use]
pub fn is_end_of_pagination(outcomes: &[PageOutcome]) -> bool {
    outcomes.iter().all(|o| o.records.is_empty())
}

/// Whether any page in the batch failed to fetch.
#[must_use]
pub fn batch_had_failures(outcomes: &[PageOutcome]) -> bool {
    outcomes.iter().any(PageOutcome::is_failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: u32) -> PageRequest {
        PageRequest::with_url(page, format!("http://x/p{page}.html"))
    }

    #[test]
    fn test_empty_batch_ends_pagination() {
        let outcomes = vec![
            PageOutcome::extracted(request(5), vec![], 1),
            PageOutcome::extracted(request(6), vec![], 1),
        ];
        assert!(is_end_of_pagination(&outcomes));
        assert!(!batch_had_failures(&outcomes));
    }

    #[test]
    fn test_one_record_keeps_going() {
        let outcomes = vec![
            PageOutcome::extracted(request(3), vec![Record::new().with("title", "a")], 1),
            PageOutcome::extracted(request(4), vec![], 1),
        ];
        assert!(!is_end_of_pagination(&outcomes));
    }

    #[test]
    fn test_all_failed_batch_is_indistinguishable_but_flagged() {
        let outcomes = vec![
            PageOutcome::failed(request(1), FailureReason::http_status(503), 3),
            PageOutcome::failed(request(2), FailureReason::timeout(30_000), 3),
        ];
        assert!(is_end_of_pagination(&outcomes));
        assert!(batch_had_failures(&outcomes));
    }

    #[test]
    fn test_cancelled_page_is_abandoned_not_failed_work() {
        let abandoned = PageOutcome::failed(request(2), FailureReason::cancelled("ctrl-c"), 1);
        let failed = PageOutcome::failed(request(3), FailureReason::http_status(503), 3);
        assert!(abandoned.is_abandoned());
        assert!(!failed.is_abandoned());
        assert!(!PageOutcome::extracted(request(1), vec![], 1).is_abandoned());
    }

    #[test]
    fn test_zero_length_batch_is_the_end() {
        assert!(is_end_of_pagination(&[]));
    }

    #[test]
    fn test_state_terminal() {
        assert!(!EngineState::initial().is_terminal());
        assert!(EngineState::Done {
            reason: StopReason::PageLimit
        }
        .is_terminal());
        assert_eq!(EngineState::initial().to_string(), "running (next page 1)");
    }
}

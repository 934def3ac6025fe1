//! Sweep results and run reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::core::AggregateResult;

/// Why a sweep stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A whole batch produced no records: the catalog ended.
    EmptyBatch,
    /// The configured page limit was reached.
    PageLimit,
    /// The cancellation token was raised.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "empty batch"),
            Self::PageLimit => write!(f, "page limit"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Running counters, updated by the coordinating flow after each batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepProgress {
    /// Batches that passed their barrier.
    pub batches: usize,
    /// Pages dispatched.
    pub pages_requested: usize,
    /// Pages whose fetch succeeded.
    pub pages_succeeded: usize,
    /// Pages that contributed nothing because every attempt failed.
    pub pages_failed: usize,
    /// Records gathered.
    pub records: usize,
    /// Most fetch permits held at once.
    pub peak_concurrency: usize,
    /// Page limit, if one was configured.
    pub page_limit: Option<u32>,
}

impl SweepProgress {
    /// Pages that have a final outcome.
    #[must_use]
    pub fn pages_completed(&self) -> usize {
        self.pages_succeeded + self.pages_failed
    }

    /// Share of the page limit done, when a limit is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        let limit = self.page_limit?;
        if limit == 0 {
            return None;
        }
        Some((self.pages_completed() as f64 / f64::from(limit) * 100.0).min(100.0))
    }
}

/// Summary of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run stopped.
    pub finished_at: DateTime<Utc>,
    /// Final counters.
    #[serde(flatten)]
    pub progress: SweepProgress,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Whether the final empty batch had failed pages.
    ///
    /// A batch in which every page failed looks exactly like the end of the
    /// catalog. When this is set the stop may have been premature.
    pub empty_batch_had_failures: bool,
}

impl SweepReport {
    /// Wall-clock duration of the run in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} records from {} pages ({} failed) in {} batches, stopped on {}",
            self.run_id,
            self.progress.records,
            self.progress.pages_succeeded,
            self.progress.pages_failed,
            self.progress.batches,
            self.stop_reason
        )?;
        if self.empty_batch_had_failures {
            write!(f, " (the final batch had failures)")?;
        }
        Ok(())
    }
}

/// Records and report of a finished sweep.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Every record gathered, in page order.
    pub records: AggregateResult,
    /// How the run went.
    pub report: SweepReport,
}

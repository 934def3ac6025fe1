//! Result sinks.
//!
//! A sink receives the aggregated records once, after the sweep has
//! finished, and reports where and how many it wrote.

mod csv;

pub use self::csv::{write_csv, CsvSink};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::core::Record;
use crate::errors::SinkError;

/// Confirmation of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReceipt {
    /// Records written.
    pub records_written: usize,
    /// Where they went (a path, or a description).
    pub destination: String,
}

/// Protocol for exporting aggregated records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Writes every record, in order.
    async fn write(&self, records: &[Record]) -> Result<SinkReceipt, SinkError>;
}

/// A sink that keeps the records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RwLock<Vec<Record>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far, across every call.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn write(&self, records: &[Record]) -> Result<SinkReceipt, SinkError> {
        self.records.write().extend_from_slice(records);
        Ok(SinkReceipt {
            records_written: records.len(),
            destination: "memory".to_string(),
        })
    }
}

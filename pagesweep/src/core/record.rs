//! Extracted records and the sweep's aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

/// One extracted item: field name to string value.
///
/// The engine never looks inside a record. Fields are kept in name order so
/// that serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns a field value, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns a field value, or the empty string when absent.
    #[must_use]
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl Index<&str> for Record {
    type Output = str;

    fn index(&self, name: &str) -> &str {
        self.get_or_empty(name)
    }
}

/// The records of one page, tagged with their page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecords {
    /// The page the records came from.
    pub page_number: u32,
    /// Records in the order the extractor produced them.
    pub records: Vec<Record>,
}

/// Append-only sequence of records gathered over a sweep.
///
/// Only the coordinating flow appends, once per batch, after the batch
/// barrier. Each merge appends pages in page-number order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    records: Vec<Record>,
    #[serde(skip)]
    pages_merged: Vec<u32>,
}

impl AggregateResult {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one batch worth of page records, sorted by page number.
    ///
    /// Returns the number of records appended.
    pub fn merge_batch(&mut self, mut pages: Vec<PageRecords>) -> usize {
        pages.sort_by_key(|p| p.page_number);

        let before = self.records.len();
        for page in pages {
            self.pages_merged.push(page.page_number);
            self.records.extend(page.records);
        }
        self.records.len() - before
    }

    /// The records gathered so far.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the aggregate, yielding its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Page numbers in the order they were merged.
    #[must_use]
    pub fn pages_merged(&self) -> &[u32] {
        &self.pages_merged
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records have been gathered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! CSV export.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ResultSink, SinkReceipt};
use crate::core::Record;
use crate::errors::SinkError;

/// Writes a header row and one row per record.
///
/// Cells follow `columns`; a field the record lacks becomes an empty cell
/// and fields not in `columns` are left out. Returns the rows written,
/// header excluded.
pub fn write_csv<W: Write>(
    writer: W,
    columns: &[String],
    records: &[Record],
) -> Result<usize, SinkError> {
    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(columns)?;
    for record in records {
        out.write_record(columns.iter().map(|c| record.get_or_empty(c)))?;
    }
    out.flush()?;
    Ok(records.len())
}

/// Sorted union of every field name in `records`.
fn union_of_fields(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(Record::field_names)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Exports records to a CSV file, replacing it if it exists.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    columns: Option<Vec<String>>,
}

impl CsvSink {
    /// Creates a sink for `path`. Columns default to the sorted union of
    /// field names across the records.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            columns: None,
        }
    }

    /// Fixes the column order.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// The output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The column order that will be used for `records`.
    #[must_use]
    pub fn columns_for(&self, records: &[Record]) -> Vec<String> {
        self.columns
            .clone()
            .unwrap_or_else(|| union_of_fields(records))
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn write(&self, records: &[Record]) -> Result<SinkReceipt, SinkError> {
        let columns = self.columns_for(records);
        let records = records.to_vec();
        let path = self.path.clone();
        debug!(path = %path.display(), columns = columns.len(), "Writing CSV");

        let written = tokio::task::spawn_blocking(move || {
            let file = BufWriter::new(File::create(&path)?);
            write_csv(file, &columns, &records)
        })
        .await
        .map_err(|e| SinkError::Task(e.to_string()))??;

        info!(path = %self.path.display(), records = written, "CSV written");
        Ok(SinkReceipt {
            records_written: written,
            destination: self.path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn books() -> Vec<Record> {
        vec![
            Record::new()
                .with("title", "A Light in the Attic")
                .with("price", "£51.77")
                .with("rating", "Three"),
            Record::new().with("title", "Sharp, \"Objects\"").with("price", "£47.82"),
        ]
    }

    #[test]
    fn test_write_csv_fixed_columns() {
        let mut out = Vec::new();
        let columns = vec!["title".to_string(), "price".to_string(), "rating".to_string()];
        let written = write_csv(&mut out, &columns, &books()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "title,price,rating\n\
             A Light in the Attic,£51.77,Three\n\
             \"Sharp, \"\"Objects\"\"\",£47.82,\n"
        );
    }

    #[test]
    fn test_default_columns_are_sorted_union() {
        let sink = CsvSink::new("unused.csv");
        assert_eq!(sink.columns_for(&books()), vec!["price", "rating", "title"]);

        let sink = sink.with_columns(["title", "price"]);
        assert_eq!(sink.columns_for(&books()), vec!["title", "price"]);
    }

    #[tokio::test]
    async fn test_csv_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.csv");

        let sink = CsvSink::new(&path).with_columns(["title", "price"]);
        let receipt = sink.write(&books()).await.unwrap();

        assert_eq!(receipt.records_written, 2);
        assert_eq!(receipt.destination, path.display().to_string());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "title,price");
        assert_eq!(lines[1], "A Light in the Attic,£51.77");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_csv_sink_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("missing").join("out.csv"));
        let err = sink.write(&books()).await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}

//! Performance log sinks.
//!
//! Every served invocation produces one [`OutcomeRecord`]: the function kind,
//! the logical time and whether it was a warm hit or a cold miss. Capacity
//! misses produce no record; they are counted by the scheduler instead.
//!
//! The scheduler only writes to the log. Analysis tools read the CSV form
//! back after the run:
//!
//! ```text
//! lambda,time,meta
//! a,0.0,miss
//! a,5000.0,hit
//! ```

use crate::error::LogError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// Header line of the CSV performance log.
pub const PERF_LOG_HEADER: [&str; 3] = ["lambda", "time", "meta"];

/// Whether an invocation found a warm container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Served by an idle container of the same kind.
    Hit,
    /// Served by a newly created container.
    Miss,
}

impl OutcomeKind {
    /// Log spelling of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Hit => "hit",
            OutcomeKind::Miss => "miss",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the performance log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Function kind.
    #[serde(rename = "lambda")]
    pub kind: String,
    /// Logical time of the invocation.
    pub time: f64,
    /// Hit or miss.
    #[serde(rename = "meta")]
    pub outcome: OutcomeKind,
}

/// Append-only sink for invocation outcomes.
pub trait PerformanceLog: fmt::Debug {
    /// Appends one record.
    fn record(&mut self, record: &OutcomeRecord) -> Result<(), LogError>;

    /// Flushes buffered records to the underlying storage.
    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    records: Vec<OutcomeRecord>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in the order they were written.
    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    /// Number of records with the given outcome.
    pub fn count(&self, outcome: OutcomeKind) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}

impl PerformanceLog for MemoryLog {
    fn record(&mut self, record: &OutcomeRecord) -> Result<(), LogError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes records as CSV with a `lambda,time,meta` header.
pub struct CsvPerformanceLog<W: io::Write> {
    writer: csv::Writer<W>,
    written: u64,
}

impl CsvPerformanceLog<BufWriter<File>> {
    /// Creates (or truncates) the file at `path` and writes the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: io::Write> CsvPerformanceLog<W> {
    /// Wraps an arbitrary writer and writes the header.
    pub fn from_writer(writer: W) -> Result<Self, LogError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(PERF_LOG_HEADER)?;
        Ok(Self { writer, written: 0 })
    }

    /// Number of records written, header excluded.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, LogError> {
        self.writer
            .into_inner()
            .map_err(|e| LogError::Io(e.into_error()))
    }
}

impl<W: io::Write> fmt::Debug for CsvPerformanceLog<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvPerformanceLog")
            .field("written", &self.written)
            .finish()
    }
}

impl<W: io::Write> PerformanceLog for CsvPerformanceLog<W> {
    fn record(&mut self, record: &OutcomeRecord) -> Result<(), LogError> {
        self.writer.serialize(record)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, time: f64, outcome: OutcomeKind) -> OutcomeRecord {
        OutcomeRecord {
            kind: kind.to_string(),
            time,
            outcome,
        }
    }

    #[test]
    fn test_memory_log_keeps_order() {
        let mut log = MemoryLog::new();
        log.record(&record("a", 0.0, OutcomeKind::Miss)).unwrap();
        log.record(&record("a", 5.0, OutcomeKind::Hit)).unwrap();
        log.record(&record("b", 6.0, OutcomeKind::Miss)).unwrap();

        assert_eq!(log.records().len(), 3);
        assert_eq!(log.records()[1].outcome, OutcomeKind::Hit);
        assert_eq!(log.count(OutcomeKind::Miss), 2);
        assert_eq!(log.count(OutcomeKind::Hit), 1);
    }

    #[test]
    fn test_csv_log_format() {
        let mut log = CsvPerformanceLog::from_writer(Vec::new()).unwrap();
        log.record(&record("a", 0.0, OutcomeKind::Miss)).unwrap();
        log.record(&record("a", 5000.0, OutcomeKind::Hit)).unwrap();
        assert_eq!(log.written(), 2);

        let bytes = log.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "lambda,time,meta\na,0.0,miss\na,5000.0,hit\n");
    }

    #[test]
    fn test_csv_log_header_only_when_empty() {
        let log = CsvPerformanceLog::from_writer(Vec::new()).unwrap();
        let text = String::from_utf8(log.into_inner().unwrap()).unwrap();
        assert_eq!(text, "lambda,time,meta\n");
    }

    #[test]
    fn test_csv_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.csv");
        let mut log = CsvPerformanceLog::create(&path).unwrap();
        log.record(&record("b", 1.5, OutcomeKind::Miss)).unwrap();
        log.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("lambda,time,meta\n"));
        assert!(text.contains("b,1.5,miss"));
    }
}

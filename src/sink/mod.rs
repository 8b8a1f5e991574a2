//! Downstream point contract plus built-in sinks.

pub mod export;

pub use export::{ExportFormat, FileExportSink};

use std::collections::BTreeMap;
use std::fmt;
use std::io;

/// Error returned by a sink. The driver treats it as fatal for the current
/// file and discards any in-flight buffer.
#[derive(Debug)]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink error: {}", self.message)
    }
}

impl std::error::Error for SinkError {}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::new(e.to_string())
    }
}

/// Downstream consumer of replayed points.
///
/// The driver calls `add_point` exactly once per (point, duplicate, pass)
/// and treats the call as synchronous: the next line is not read until the
/// call returns.
pub trait Sink {
    fn add_point(
        &mut self,
        metric: &str,
        timestamp: i64,
        value: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), SinkError>;
}

/// Counts points without storing them - the dry-run sink.
#[derive(Debug, Default)]
pub struct CountingSink {
    points: u64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> u64 {
        self.points
    }
}

impl Sink for CountingSink {
    fn add_point(
        &mut self,
        _metric: &str,
        _timestamp: i64,
        _value: &str,
        _tags: &BTreeMap<String, String>,
    ) -> Result<(), SinkError> {
        self.points += 1;
        Ok(())
    }
}

/// One emitted point, captured verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedPoint {
    pub metric: String,
    pub timestamp: i64,
    pub value: String,
    pub tags: BTreeMap<String, String>,
}

/// Collects every emitted point in memory. Intended for tests and small
/// inputs; buffered replay exists precisely to avoid this for large files.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub points: Vec<EmittedPoint>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for MemorySink {
    fn add_point(
        &mut self,
        metric: &str,
        timestamp: i64,
        value: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), SinkError> {
        self.points.push(EmittedPoint {
            metric: metric.to_string(),
            timestamp,
            value: value.to_string(),
            tags: tags.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink() {
        let mut sink = CountingSink::new();
        let tags = BTreeMap::new();
        sink.add_point("m", 1, "1", &tags).unwrap();
        sink.add_point("m", 2, "2", &tags).unwrap();
        assert_eq!(sink.points(), 2);
    }

    #[test]
    fn test_memory_sink_captures_points() {
        let mut sink = MemorySink::new();
        let mut tags = BTreeMap::new();
        tags.insert("host".to_string(), "web01".to_string());
        sink.add_point("sys.cpu", 100, "0.5", &tags).unwrap();

        assert_eq!(sink.points.len(), 1);
        assert_eq!(sink.points[0].metric, "sys.cpu");
        assert_eq!(sink.points[0].timestamp, 100);
        assert_eq!(sink.points[0].value, "0.5");
        assert_eq!(sink.points[0].tags["host"], "web01");
    }
}

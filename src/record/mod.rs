//! Input record model and line parser.
//!
//! One input line is `<metric> <timestamp> <value> [<tagkey>=<tagvalue> ...]`,
//! whitespace-separated. Parsing is fail-fast: the first malformed field
//! aborts the whole file, it is never skipped.

pub mod codec;
pub mod interner;

use std::collections::BTreeMap;
use std::fmt;

/// One data point parsed from an input line. Immutable after parse.
///
/// The value is kept as text until (and unless) the point is packed for
/// buffered replay; the sink contract is also text-based.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPoint {
    pub metric: String,
    /// Raw timestamp as written in the file; its unit (seconds or
    /// milliseconds) is only known once the file is profiled.
    pub timestamp: i64,
    pub value: String,
    pub tags: BTreeMap<String, String>,
}

/// A field that failed validation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub field: &'static str,
    pub reason: String,
}

impl RecordError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field: {}", self.field, self.reason)
    }
}

impl std::error::Error for RecordError {}

/// Parses one input line into a [`ParsedPoint`].
///
/// Field 0 is the metric (non-empty), field 1 the timestamp (positive
/// integer), field 2 the value (numeric text, integer or float), fields 3..
/// are `key=value` tag pairs with unique keys.
pub fn parse_line(line: &str) -> Result<ParsedPoint, RecordError> {
    let mut words = line.split_ascii_whitespace();

    let metric = words
        .next()
        .ok_or_else(|| RecordError::new("metric", "missing metric name"))?;

    let ts_text = words
        .next()
        .ok_or_else(|| RecordError::new("timestamp", "missing timestamp"))?;
    let timestamp: i64 = ts_text
        .parse()
        .map_err(|_| RecordError::new("timestamp", format!("not an integer: '{}'", ts_text)))?;
    if timestamp <= 0 {
        return Err(RecordError::new(
            "timestamp",
            format!("must be positive, got {}", timestamp),
        ));
    }

    let value = words
        .next()
        .ok_or_else(|| RecordError::new("value", "missing value"))?;
    if value.parse::<f64>().is_err() {
        return Err(RecordError::new(
            "value",
            format!("not a numeric value: '{}'", value),
        ));
    }

    let mut tags = BTreeMap::new();
    for word in words {
        let (key, val) = word
            .split_once('=')
            .ok_or_else(|| RecordError::new("tags", format!("expected key=value, got '{}'", word)))?;
        if key.is_empty() || val.is_empty() {
            return Err(RecordError::new(
                "tags",
                format!("empty tag key or value in '{}'", word),
            ));
        }
        if tags.insert(key.to_string(), val.to_string()).is_some() {
            return Err(RecordError::new(
                "tags",
                format!("duplicate tag key '{}'", key),
            ));
        }
    }

    Ok(ParsedPoint {
        metric: metric.to_string(),
        timestamp,
        value: value.to_string(),
        tags,
    })
}

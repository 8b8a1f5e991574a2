//! Single-pass file profiling: temporal envelope, point count, time unit.

use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MalformedRecord, ReplayError};
use crate::input;

/// Timestamps at or above this value are taken to be millisecond-epoch.
///
/// This is the second-mask test: a second-epoch value fits in 32 bits for
/// centuries to come, a millisecond-epoch value has not fit since 1970.
/// Epoch values near the threshold are ambiguous by construction; that is an
/// inherent limitation of unit inference, kept as one named constant rather
/// than scattered magnitude checks.
pub const MS_THRESHOLD: i64 = 1 << 32;

/// Unit of the timestamps within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Classifies a single timestamp with the [`MS_THRESHOLD`] magnitude test.
    pub fn classify(timestamp: i64) -> TimeUnit {
        if timestamp >= MS_THRESHOLD {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Seconds => write!(f, "seconds"),
            TimeUnit::Milliseconds => write!(f, "milliseconds"),
        }
    }
}

/// Temporal envelope of one input file.
///
/// Produced by a single full scan; only ever constructed for files with at
/// least two data points, so the sample interval is always defined.
#[derive(Debug, Clone, Serialize)]
pub struct FileProfile {
    pub path: PathBuf,
    /// Timestamp of the first record.
    pub t0: i64,
    /// Timestamp of the last record.
    pub t1: i64,
    pub point_count: u64,
    pub unit: TimeUnit,
}

impl FileProfile {
    /// Average spacing between consecutive samples, assumed as the gap
    /// between the last sample and the start of whatever follows the file.
    pub fn interval(&self) -> i64 {
        (self.t1 - self.t0) / (self.point_count as i64 - 1)
    }

    /// Span the file occupies on the virtual timeline, trailing gap included.
    pub fn duration(&self) -> i64 {
        (self.t1 - self.t0) + self.interval()
    }
}

/// Why a file was excluded from the stitched timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No data points at all.
    Empty,
    /// Exactly one data point: the sample interval is undefined.
    SinglePoint,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty file"),
            RejectReason::SinglePoint => write!(f, "single data point, interval undefined"),
        }
    }
}

/// Outcome of profiling one file. Rejection is not an error: the file is
/// skipped with a warning and the run continues.
#[derive(Debug)]
pub enum ProfileOutcome {
    Profiled(FileProfile),
    Rejected { path: PathBuf, reason: RejectReason },
}

/// Scans a file once: counts lines and reads the timestamp field of the
/// first and last line. Full record validation is deferred to replay.
pub fn profile_file(path: &Path) -> Result<ProfileOutcome, ReplayError> {
    let reader = input::open_lines(path)?;
    let mut count: u64 = 0;
    let mut first: Option<String> = None;
    let mut last: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        count += 1;
        if first.is_none() {
            first = Some(line);
        } else {
            last = Some(line);
        }
    }

    let (first_line, last_line) = match (first, last) {
        (None, _) => {
            return Ok(ProfileOutcome::Rejected {
                path: path.to_path_buf(),
                reason: RejectReason::Empty,
            });
        }
        (Some(_), None) => {
            return Ok(ProfileOutcome::Rejected {
                path: path.to_path_buf(),
                reason: RejectReason::SinglePoint,
            });
        }
        (Some(f), Some(l)) => (f, l),
    };

    let t0 = timestamp_field(&first_line)
        .map_err(|reason| MalformedRecord::new(path, 1, &first_line, reason))?;
    let t1 = timestamp_field(&last_line)
        .map_err(|reason| MalformedRecord::new(path, count, &last_line, reason))?;

    // Milliseconds if either endpoint looks like a millisecond epoch.
    let unit = if TimeUnit::classify(t0) == TimeUnit::Milliseconds
        || TimeUnit::classify(t1) == TimeUnit::Milliseconds
    {
        TimeUnit::Milliseconds
    } else {
        TimeUnit::Seconds
    };

    Ok(ProfileOutcome::Profiled(FileProfile {
        path: path.to_path_buf(),
        t0,
        t1,
        point_count: count,
        unit,
    }))
}

/// Extracts and validates only the timestamp field of one line.
fn timestamp_field(line: &str) -> Result<i64, String> {
    let mut words = line.split_ascii_whitespace();
    words.next().ok_or_else(|| "missing metric name".to_string())?;
    let ts_text = words
        .next()
        .ok_or_else(|| "missing timestamp".to_string())?;
    let timestamp: i64 = ts_text
        .parse()
        .map_err(|_| format!("timestamp is not an integer: '{}'", ts_text))?;
    if timestamp <= 0 {
        return Err(format!("timestamp must be positive, got {}", timestamp));
    }
    Ok(timestamp)
}

//! Error types for profiling and replay.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::record::codec::CodecError;
use crate::record::interner::MAX_SERIES_PER_FILE;
use crate::sink::SinkError;

/// A line that violates the input record format.
///
/// Carries the offending location and line text so the failure can be
/// diagnosed without re-reading the file.
#[derive(Debug)]
pub struct MalformedRecord {
    pub path: PathBuf,
    pub line_no: u64,
    pub line: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(
        path: &Path,
        line_no: u64,
        line: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            line_no,
            line: line.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: malformed record ({}): {}",
            self.path.display(),
            self.line_no,
            self.reason,
            self.line
        )
    }
}

/// Top-level error for a replay run.
///
/// Empty and single-record files are not errors; they are reported as
/// warnings and excluded from the timeline (see `profile::ProfileOutcome`).
#[derive(Debug)]
pub enum ReplayError {
    /// A line failed syntactic validation. Processing of the file is
    /// abandoned immediately; there is no skip-and-continue.
    Malformed(MalformedRecord),
    /// The downstream sink refused a point. Fatal; the in-flight buffer for
    /// the current file is discarded.
    Sink(SinkError),
    /// A single file holds more distinct (metric, tags) series than the
    /// packed form's 16-bit id can address.
    SeriesOverflow { path: PathBuf },
    /// Inconsistency in the packed in-memory buffer.
    Codec(CodecError),
    /// Underlying I/O failure.
    Io(io::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Malformed(m) => write!(f, "{}", m),
            ReplayError::Sink(e) => write!(f, "{}", e),
            ReplayError::SeriesOverflow { path } => write!(
                f,
                "{}: more than {} distinct series in one file",
                path.display(),
                MAX_SERIES_PER_FILE
            ),
            ReplayError::Codec(e) => write!(f, "packed buffer corrupted: {}", e),
            ReplayError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Sink(e) => Some(e),
            ReplayError::Codec(e) => Some(e),
            ReplayError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        ReplayError::Io(e)
    }
}

impl From<MalformedRecord> for ReplayError {
    fn from(m: MalformedRecord) -> Self {
        ReplayError::Malformed(m)
    }
}

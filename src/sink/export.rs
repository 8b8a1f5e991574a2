//! File export sink: replays into a new text file instead of a store.
//!
//! Timestamps are rendered as a fixed human-readable date-time, not raw
//! epoch values. The unit of each timestamp is re-derived with the same
//! magnitude test used while profiling.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::DateTime;

use super::{Sink, SinkError};
use crate::profile::TimeUnit;

/// Output shape of the export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// `<metric> <datetime> <value> [k=v ...]` - the native field layout with
    /// the epoch timestamp replaced by a datetime string. The `T` separator
    /// keeps the record whitespace-splittable.
    Line,
    /// `"metric","datetime","value","k1=v1 k2=v2"`.
    Csv,
}

/// Writes replayed records to a text file.
pub struct FileExportSink {
    writer: BufWriter<File>,
    format: ExportFormat,
    points: u64,
}

impl FileExportSink {
    pub fn create(path: &Path, format: ExportFormat) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            format,
            points: 0,
        })
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    /// Flushes buffered output. Call once after the replay completes.
    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Sink for FileExportSink {
    fn add_point(
        &mut self,
        metric: &str,
        timestamp: i64,
        value: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), SinkError> {
        let time = render_time(timestamp, self.format);
        match self.format {
            ExportFormat::Line => {
                write!(self.writer, "{} {} {}", metric, time, value)?;
                for (key, val) in tags {
                    write!(self.writer, " {}={}", key, val)?;
                }
                writeln!(self.writer)?;
            }
            ExportFormat::Csv => {
                let tag_text = tags
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(
                    self.writer,
                    "\"{}\",\"{}\",\"{}\",\"{}\"",
                    metric, time, value, tag_text
                )?;
            }
        }
        self.points += 1;
        Ok(())
    }
}

/// Renders an epoch timestamp in the fixed date-time form for the format.
/// Millisecond timestamps keep their fractional part.
fn render_time(timestamp: i64, format: ExportFormat) -> String {
    let (seconds_fmt, millis_fmt) = match format {
        ExportFormat::Line => ("%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.3f"),
        ExportFormat::Csv => ("%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.3f"),
    };
    match TimeUnit::classify(timestamp) {
        TimeUnit::Seconds => DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.format(seconds_fmt).to_string())
            .unwrap_or_else(|| timestamp.to_string()),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(timestamp)
            .map(|dt| dt.format(millis_fmt).to_string())
            .unwrap_or_else(|| timestamp.to_string()),
    }
}

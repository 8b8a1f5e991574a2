//! The replay driver: profile, stitch, buffer, emit.
//!
//! Strictly sequential: one file is profiled, then (optionally) buffered,
//! then replayed to completion before the next file begins. Per file the
//! lifecycle is `PROFILE -> (REJECTED | READY) -> [BUFFER] -> EMIT -> DONE`,
//! with EMIT repeated once per repetition pass when buffering.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{MalformedRecord, ReplayError};
use crate::input;
use crate::profile::{self, ProfileOutcome};
use crate::record;
use crate::record::codec::{CodecError, PackedPoint, PointBuffer, PointValue};
use crate::record::interner::SeriesInterner;
use crate::sink::Sink;
use crate::timeline::Timeline;

/// How often to log replay throughput, in emitted points.
const PROGRESS_EVERY: u64 = 1_000_000;

/// Duplicate fan-out: each logical point is emitted `count` times with `tag`
/// set to `"0"`..`"count-1"`, overwriting any existing value for that key.
#[derive(Debug, Clone)]
pub struct DuplicateSpec {
    pub tag: String,
    pub count: u32,
}

/// Configuration values consumed by the driver. Flag parsing lives in the
/// binaries; the driver only sees resolved values.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Number of repetition passes over the stitched timeline. Must be >= 1.
    pub repeat: u32,
    /// Optional duplicate expansion. A count of 1 emits points unchanged.
    pub duplicate: Option<DuplicateSpec>,
    /// Buffer each file into the packed in-memory form even when a single
    /// pass would not require it.
    pub buffer: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            repeat: 1,
            duplicate: None,
            buffer: false,
        }
    }
}

/// Totals reported after a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub files_replayed: usize,
    pub files_skipped: usize,
    pub points_emitted: u64,
}

/// Sequential replay of an ordered list of input files into one sink.
pub struct ReplayDriver {
    options: ReplayOptions,
}

impl ReplayDriver {
    pub fn new(options: ReplayOptions) -> Self {
        Self { options }
    }

    /// Profiles every file, stitches the accepted profiles into a timeline,
    /// and replays each file in order.
    pub fn run(&self, paths: &[PathBuf], sink: &mut dyn Sink) -> Result<ReplaySummary, ReplayError> {
        let mut summary = ReplaySummary::default();

        // Every envelope is needed up front: a file's start time depends on
        // all predecessors and the repetition span on the whole set.
        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            match profile::profile_file(path)? {
                ProfileOutcome::Profiled(profile) => {
                    debug!(
                        "profiled {}: t0={}, t1={}, points={}, unit={}",
                        profile.path.display(),
                        profile.t0,
                        profile.t1,
                        profile.point_count,
                        profile.unit
                    );
                    profiles.push(profile);
                }
                ProfileOutcome::Rejected { path, reason } => {
                    warn!("skipping {}: {}", path.display(), reason);
                    summary.files_skipped += 1;
                }
            }
        }

        if profiles.is_empty() {
            info!("no replayable files");
            return Ok(summary);
        }

        let timeline = Timeline::new(profiles);
        info!(
            "replay schedule: {} files, span {}, {} passes",
            timeline.len(),
            timeline.span(),
            self.options.repeat
        );

        let started = Instant::now();
        let mut emitted: u64 = 0;

        for index in 0..timeline.len() {
            let file_started = Instant::now();
            let before = emitted;

            if self.options.repeat == 1 && !self.options.buffer {
                self.replay_direct(&timeline, index, sink, &mut emitted, &started)?;
            } else {
                self.replay_buffered(&timeline, index, sink, &mut emitted, &started)?;
            }
            summary.files_replayed += 1;

            info!(
                "processed {} in {} ms, {} data points",
                timeline.files()[index].path.display(),
                file_started.elapsed().as_millis(),
                emitted - before
            );
        }

        summary.points_emitted = emitted;
        let elapsed = started.elapsed().as_secs_f64();
        info!(
            "replayed {} points from {} files in {:.3}s ({:.1} points/s)",
            emitted,
            summary.files_replayed,
            elapsed,
            emitted as f64 / elapsed.max(f64::EPSILON)
        );
        Ok(summary)
    }

    /// READY -> EMIT: parse and emit in one streaming pass, no buffering.
    fn replay_direct(
        &self,
        timeline: &Timeline,
        index: usize,
        sink: &mut dyn Sink,
        emitted: &mut u64,
        started: &Instant,
    ) -> Result<(), ReplayError> {
        let profile = &timeline.files()[index];
        let offset = timeline.offset_for(index, 0);

        let reader = input::open_lines(&profile.path)?;
        let mut line_no: u64 = 0;
        for line in reader.lines() {
            let line = line?;
            line_no += 1;
            let point = record::parse_line(&line)
                .map_err(|e| malformed(&profile.path, line_no, &line, e.to_string()))?;
            self.emit(
                sink,
                &point.metric,
                point.timestamp + offset,
                &point.value,
                &point.tags,
                emitted,
                started,
            )?;
        }
        Ok(())
    }

    /// READY -> BUFFER -> EMIT x repeat: parse once into interned packed
    /// records, then emit once per pass with that pass's offset.
    ///
    /// The interner and buffer live only for the duration of this call; DONE
    /// drops both, so the next file starts with an empty id space.
    fn replay_buffered(
        &self,
        timeline: &Timeline,
        index: usize,
        sink: &mut dyn Sink,
        emitted: &mut u64,
        started: &Instant,
    ) -> Result<(), ReplayError> {
        let profile = &timeline.files()[index];
        let mut interner = SeriesInterner::new();
        let mut buffer = PointBuffer::with_capacity(profile.point_count as usize);

        let reader = input::open_lines(&profile.path)?;
        let mut line_no: u64 = 0;
        for line in reader.lines() {
            let line = line?;
            line_no += 1;
            let point = record::parse_line(&line)
                .map_err(|e| malformed(&profile.path, line_no, &line, e.to_string()))?;
            let series_id = interner
                .intern(&point.metric, &point.tags)
                .map_err(|_| ReplayError::SeriesOverflow {
                    path: profile.path.clone(),
                })?;
            let value = PointValue::parse(&point.value)
                .map_err(|e| malformed(&profile.path, line_no, &line, e.to_string()))?;
            buffer.push(&PackedPoint {
                series_id,
                timestamp: point.timestamp,
                value,
            });
        }
        debug!(
            "buffered {}: {} points, {} series",
            profile.path.display(),
            buffer.len(),
            interner.len()
        );

        for pass in 0..self.options.repeat {
            let offset = timeline.offset_for(index, pass);
            for i in 0..buffer.len() {
                let packed = buffer.get(i).map_err(ReplayError::Codec)?;
                let series = interner.resolve(packed.series_id).ok_or_else(|| {
                    ReplayError::Codec(CodecError::new(format!(
                        "series id {} missing from table",
                        packed.series_id
                    )))
                })?;
                let value = packed.value.render();
                self.emit(
                    sink,
                    &series.metric,
                    packed.timestamp + offset,
                    &value,
                    &series.tags,
                    emitted,
                    started,
                )?;
            }
        }
        Ok(())
    }

    /// Emits one logical point, fanned out across duplicate tag variants.
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        sink: &mut dyn Sink,
        metric: &str,
        timestamp: i64,
        value: &str,
        tags: &BTreeMap<String, String>,
        emitted: &mut u64,
        started: &Instant,
    ) -> Result<(), ReplayError> {
        match &self.options.duplicate {
            Some(dup) if dup.count > 1 => {
                let mut expanded = tags.clone();
                for copy in 0..dup.count {
                    expanded.insert(dup.tag.clone(), copy.to_string());
                    sink.add_point(metric, timestamp, value, &expanded)
                        .map_err(ReplayError::Sink)?;
                    bump(emitted, started);
                }
            }
            _ => {
                sink.add_point(metric, timestamp, value, tags)
                    .map_err(ReplayError::Sink)?;
                bump(emitted, started);
            }
        }
        Ok(())
    }
}

fn bump(emitted: &mut u64, started: &Instant) {
    *emitted += 1;
    if emitted.is_multiple_of(PROGRESS_EVERY) {
        let elapsed = started.elapsed().as_secs_f64();
        info!(
            "... {} data points in {:.3}s ({:.1} points/s)",
            emitted,
            elapsed,
            *emitted as f64 / elapsed.max(f64::EPSILON)
        );
    }
}

fn malformed(path: &Path, line_no: u64, line: &str, reason: String) -> ReplayError {
    ReplayError::Malformed(MalformedRecord::new(path, line_no, line, reason))
}

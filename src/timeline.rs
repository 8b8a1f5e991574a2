//! Stitching independent file envelopes into one gap-free virtual timeline.

use crate::profile::{FileProfile, TimeUnit};

/// Precomputed replay schedule for an ordered list of file profiles.
///
/// The first file keeps its own `t0`; every subsequent file begins exactly
/// where its predecessor's duration ends, so the stitched timeline has no
/// gaps and no overlaps. One repetition of the whole concatenation spans
/// `span`, and pass `k` shifts every start time by `k * span`.
pub struct Timeline {
    files: Vec<FileProfile>,
    starts: Vec<i64>,
    span: i64,
}

impl Timeline {
    /// Builds the schedule. Profiles must already be filtered down to files
    /// with at least two points (the profiler guarantees this).
    pub fn new(files: Vec<FileProfile>) -> Self {
        let mut starts = Vec::with_capacity(files.len());
        let mut cursor = files.first().map(|f| f.t0).unwrap_or(0);
        let mut span: i64 = 0;
        for profile in &files {
            starts.push(cursor);
            let duration = profile.duration();
            cursor += duration;
            span += duration;
        }
        Self {
            files,
            starts,
            span,
        }
    }

    pub fn files(&self) -> &[FileProfile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total span of one repetition pass (sum of all file durations).
    pub fn span(&self) -> i64 {
        self.span
    }

    /// Target start time for file `index` during repetition `pass` (0-based).
    pub fn start_time(&self, index: usize, pass: u32) -> i64 {
        self.starts[index] + pass as i64 * self.span
    }

    /// Signed shift applied to every timestamp read from file `index` during
    /// repetition `pass`: `emit(t) = t + offset`.
    ///
    /// The target start time is first normalized to the file's own unit;
    /// mixing seconds and millisecond files naively would corrupt the
    /// stitched timeline.
    pub fn offset_for(&self, index: usize, pass: u32) -> i64 {
        let profile = &self.files[index];
        let target = normalize(self.start_time(index, pass), profile.unit);
        target - profile.t0
    }
}

/// Converts a target time into the given unit when their magnitudes disagree.
/// A millisecond target for a seconds file is rounded up to whole seconds, so
/// a stitched file never starts before its slot.
fn normalize(target: i64, unit: TimeUnit) -> i64 {
    match (TimeUnit::classify(target), unit) {
        (TimeUnit::Milliseconds, TimeUnit::Seconds) => (target + 999) / 1000,
        (TimeUnit::Seconds, TimeUnit::Milliseconds) => target * 1000,
        _ => target,
    }
}

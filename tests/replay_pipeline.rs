//! End-to-end replay pipeline tests: real files on disk, driven through the
//! full profile -> stitch -> buffer -> emit path.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::tempdir;

use tsdreplay::replay::{DuplicateSpec, ReplayDriver, ReplayOptions};
use tsdreplay::sink::{ExportFormat, FileExportSink, MemorySink, Sink, SinkError};

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn write_gz_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// The worked example: ten records, t0=1000, t1=1900, interval 100.
fn file_a_content() -> String {
    let mut content = String::new();
    for i in 0..10 {
        content.push_str(&format!("sys.cpu.user {} {} host=web01\n", 1000 + i * 100, i));
    }
    content
}

#[test]
fn stitched_files_form_one_continuous_timeline() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.tsd", &file_a_content());
    // Four records, t0=10, interval 5 (t1=25, duration 20).
    let b = write_file(
        dir.path(),
        "b.tsd",
        "sys.mem 10 1\nsys.mem 15 2\nsys.mem 20 3\nsys.mem 25 4\n",
    );

    let mut sink = MemorySink::new();
    let summary = ReplayDriver::new(ReplayOptions::default())
        .run(&[a, b], &mut sink)
        .unwrap();

    assert_eq!(summary.points_emitted, 14);
    // File a keeps its own timeline: [1000, 1900], duration 1000.
    assert_eq!(sink.points[0].timestamp, 1000);
    assert_eq!(sink.points[9].timestamp, 1900);
    // File b starts exactly at 2000 with no gap and no overlap.
    let b_timestamps: Vec<i64> = sink.points[10..].iter().map(|p| p.timestamp).collect();
    assert_eq!(b_timestamps, vec![2000, 2005, 2010, 2015]);
}

#[test]
fn repetition_passes_shift_by_exact_span() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.tsd", &file_a_content());

    let mut sink = MemorySink::new();
    let summary = ReplayDriver::new(ReplayOptions {
        repeat: 3,
        ..ReplayOptions::default()
    })
    .run(&[a], &mut sink)
    .unwrap();

    assert_eq!(summary.points_emitted, 30);
    let span = 1000; // duration of the single file
    for pass in 0..3usize {
        for i in 0..10 {
            let base = sink.points[i].timestamp;
            assert_eq!(sink.points[pass * 10 + i].timestamp, base + pass as i64 * span);
        }
    }
}

#[test]
fn gzipped_input_replays_identically_to_plain() {
    let dir = tempdir().unwrap();
    let plain = write_file(dir.path(), "a.tsd", &file_a_content());
    let gz = write_gz_file(dir.path(), "a.tsd.gz", &file_a_content());

    let mut plain_sink = MemorySink::new();
    ReplayDriver::new(ReplayOptions::default())
        .run(&[plain], &mut plain_sink)
        .unwrap();

    let mut gz_sink = MemorySink::new();
    ReplayDriver::new(ReplayOptions::default())
        .run(&[gz], &mut gz_sink)
        .unwrap();

    assert_eq!(plain_sink.points, gz_sink.points);
}

#[test]
fn empty_and_single_record_files_contribute_nothing() {
    let dir = tempdir().unwrap();
    let empty = write_file(dir.path(), "empty.tsd", "");
    let single = write_file(dir.path(), "single.tsd", "m 500 1\n");
    let a = write_file(dir.path(), "a.tsd", &file_a_content());

    let mut sink = MemorySink::new();
    let summary = ReplayDriver::new(ReplayOptions {
        repeat: 2,
        ..ReplayOptions::default()
    })
    .run(&[empty, a, single], &mut sink)
    .unwrap();

    assert_eq!(summary.files_skipped, 2);
    assert_eq!(summary.files_replayed, 1);
    assert_eq!(summary.points_emitted, 20);
    // The rejected files must not affect the surviving file's schedule.
    assert_eq!(sink.points[0].timestamp, 1000);
    assert_eq!(sink.points[10].timestamp, 2000);
}

#[test]
fn duplicate_expansion_multiplies_each_pass() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.tsd", "m 100 1 host=x\nm 200 2 host=x\n");

    let mut sink = MemorySink::new();
    let summary = ReplayDriver::new(ReplayOptions {
        repeat: 2,
        duplicate: Some(DuplicateSpec {
            tag: "dup".to_string(),
            count: 3,
        }),
        ..ReplayOptions::default()
    })
    .run(&[a], &mut sink)
    .unwrap();

    // 2 records x 2 passes x 3 duplicates.
    assert_eq!(summary.points_emitted, 12);

    // Each consecutive triple differs only in the duplicate tag value.
    for triple in sink.points.chunks(3) {
        for (i, point) in triple.iter().enumerate() {
            assert_eq!(point.tags["dup"], i.to_string());
            assert_eq!(point.tags["host"], "x");
            assert_eq!(point.timestamp, triple[0].timestamp);
            assert_eq!(point.value, triple[0].value);
        }
    }
}

#[test]
fn mixed_unit_files_are_normalized_per_file() {
    let dir = tempdir().unwrap();
    // Seconds file: [1000, 1900], duration 1000.
    let a = write_file(dir.path(), "a.tsd", &file_a_content());
    // Milliseconds file: two records 500ms apart.
    let b = write_file(
        dir.path(),
        "b.tsd",
        "ms.metric 1357002000000 1\nms.metric 1357002000500 2\n",
    );

    let mut sink = MemorySink::new();
    ReplayDriver::new(ReplayOptions::default())
        .run(&[a, b], &mut sink)
        .unwrap();

    // File b's target start (2000, a seconds-magnitude value) is scaled to
    // milliseconds before the offset is computed.
    let expected_offset = 2000 * 1000 - 1357002000000i64;
    assert_eq!(sink.points[10].timestamp, 1357002000000 + expected_offset);
    assert_eq!(sink.points[11].timestamp, 1357002000500 + expected_offset);
    // The 500ms spacing within the file is preserved.
    assert_eq!(sink.points[11].timestamp - sink.points[10].timestamp, 500);
}

#[test]
fn export_sink_receives_the_stitched_replay() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.tsd", "m 1357002000 42 host=web01\nm 1357002060 43 host=web01\n");
    let out = dir.path().join("export.tsd");

    let mut sink = FileExportSink::create(&out, ExportFormat::Line).unwrap();
    let summary = ReplayDriver::new(ReplayOptions::default())
        .run(&[a], &mut sink)
        .unwrap();
    assert_eq!(summary.points_emitted, 2);
    sink.finish().unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "m 2013-01-01T01:00:00 42 host=web01");
    assert_eq!(lines[1], "m 2013-01-01T01:01:00 43 host=web01");
}

#[test]
fn malformed_record_mid_file_aborts_the_run() {
    let dir = tempdir().unwrap();
    let bad = write_file(
        dir.path(),
        "bad.tsd",
        "m 100 1\nm 200 2\nm notatimestamp 3\nm 400 4\n",
    );

    let mut sink = MemorySink::new();
    let result = ReplayDriver::new(ReplayOptions::default()).run(&[bad], &mut sink);
    assert!(result.is_err());
}

/// Sink that fails on the first point of the second file.
struct FlakySink {
    accepted: u64,
    fail_after: u64,
}

impl Sink for FlakySink {
    fn add_point(
        &mut self,
        _metric: &str,
        _timestamp: i64,
        _value: &str,
        _tags: &BTreeMap<String, String>,
    ) -> Result<(), SinkError> {
        if self.accepted >= self.fail_after {
            return Err(SinkError::new("write refused"));
        }
        self.accepted += 1;
        Ok(())
    }
}

#[test]
fn sink_failure_propagates_as_fatal() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.tsd", &file_a_content());

    let mut sink = FlakySink {
        accepted: 0,
        fail_after: 5,
    };
    let result = ReplayDriver::new(ReplayOptions {
        repeat: 2,
        ..ReplayOptions::default()
    })
    .run(&[a], &mut sink);

    assert!(result.is_err());
    assert_eq!(sink.accepted, 5);
}

//! tsdreplay - timeline-stitching replay engine for line-oriented time-series files.
//!
//! This library provides the core functionality shared between:
//! - `tsdreplay` - replays text files into a downstream sink
//! - `tsdgen` - generates synthetic input files
//!
//! Modules:
//! - `record` - line parsing, series interning, fixed-size binary packing
//! - `profile` - single-pass file envelopes and time-unit inference
//! - `timeline` - gap-free stitching and repetition scheduling
//! - `replay` - the sequential replay driver
//! - `sink` - the downstream point contract plus counting/export sinks
//! - `input` - buffered line reading with transparent gzip decompression
//! - `generate` - synthetic data files for replay testing

pub mod error;
pub mod generate;
pub mod input;
pub mod profile;
pub mod record;
pub mod replay;
pub mod sink;
pub mod timeline;

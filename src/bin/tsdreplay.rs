//! tsdreplay - replays time-series text files into a sink.
//!
//! Profiles each input file, stitches the files into one continuous virtual
//! timeline, and replays them with optional repetition, duplicate tag
//! fan-out, and export to a new text file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use tsdreplay::profile::{self, ProfileOutcome};
use tsdreplay::replay::{DuplicateSpec, ReplayDriver, ReplayOptions};
use tsdreplay::sink::{CountingSink, ExportFormat, FileExportSink};

/// Replays time-series text files into a sink.
#[derive(Parser)]
#[command(name = "tsdreplay", about = "Replay time-series text files", version)]
struct Args {
    /// Input files, replayed in the order given. `.gz` files are
    /// decompressed transparently.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Number of repetition passes over the stitched timeline.
    #[arg(long, default_value = "1")]
    repeat: u32,

    /// Tag key used for duplicate expansion.
    #[arg(long)]
    dup_tag: Option<String>,

    /// Number of duplicate variants per point (requires --dup-tag when > 1).
    #[arg(long, default_value = "1")]
    dup_count: u32,

    /// Buffer each file into the packed in-memory form even for a single pass.
    #[arg(long)]
    buffer: bool,

    /// Only profile the inputs and print the profiles as JSON.
    #[arg(long)]
    profile_only: bool,

    /// Export replayed records to this file instead of counting them.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export file format.
    #[arg(long, value_enum, default_value = "line")]
    export_format: ExportFormatArg,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormatArg {
    Line,
    Csv,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Line => ExportFormat::Line,
            ExportFormatArg::Csv => ExportFormat::Csv,
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("tsdreplay={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    if args.repeat < 1 {
        error!("--repeat must be at least 1");
        return ExitCode::FAILURE;
    }
    if args.dup_count < 1 {
        error!("--dup-count must be at least 1");
        return ExitCode::FAILURE;
    }
    if args.dup_count > 1 && args.dup_tag.is_none() {
        error!("--dup-count > 1 requires --dup-tag");
        return ExitCode::FAILURE;
    }

    if args.profile_only {
        return profile_only(&args.files);
    }

    info!("tsdreplay {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: files={}, repeat={}, buffer={}, dup_count={}",
        args.files.len(),
        args.repeat,
        args.buffer,
        args.dup_count
    );

    let options = ReplayOptions {
        repeat: args.repeat,
        duplicate: args.dup_tag.map(|tag| DuplicateSpec {
            tag,
            count: args.dup_count,
        }),
        buffer: args.buffer,
    };
    let driver = ReplayDriver::new(options);

    let result = match &args.export {
        Some(path) => {
            let mut sink = match FileExportSink::create(path, args.export_format.into()) {
                Ok(sink) => sink,
                Err(e) => {
                    error!("Failed to create export file {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            match driver.run(&args.files, &mut sink) {
                Ok(summary) => {
                    if let Err(e) = sink.finish() {
                        error!("Failed to flush export file: {}", e);
                        return ExitCode::FAILURE;
                    }
                    info!(
                        "Exported {} points to {}",
                        summary.points_emitted,
                        path.display()
                    );
                    Ok(summary)
                }
                Err(e) => Err(e),
            }
        }
        None => {
            let mut sink = CountingSink::new();
            driver.run(&args.files, &mut sink)
        }
    };

    match result {
        Ok(summary) => {
            info!(
                "Done: {} files replayed, {} skipped, {} points",
                summary.files_replayed, summary.files_skipped, summary.points_emitted
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Profiles each input and prints the accepted profiles as a JSON array.
fn profile_only(files: &[PathBuf]) -> ExitCode {
    let mut profiles = Vec::new();
    for path in files {
        match profile::profile_file(path) {
            Ok(ProfileOutcome::Profiled(profile)) => profiles.push(profile),
            Ok(ProfileOutcome::Rejected { path, reason }) => {
                warn!("skipping {}: {}", path.display(), reason);
            }
            Err(e) => {
                error!("Failed to profile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    match serde_json::to_string_pretty(&profiles) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize profiles: {}", e);
            ExitCode::FAILURE
        }
    }
}

//! tsdgen - synthetic time-series file generator.
//!
//! Writes yearly files of well-formed replay input: one record per second
//! (or per millisecond), tagged with week and day, constant value.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use tsdreplay::generate::{GenerateConfig, generate_yearly_files};

/// Generates synthetic time-series files.
#[derive(Parser)]
#[command(name = "tsdgen", about = "Generate synthetic time-series files", version)]
struct Args {
    /// Metric name; also the output file name basis.
    #[arg(long)]
    metric: String,

    /// Starting year.
    #[arg(long)]
    year: i32,

    /// Number of years to generate.
    #[arg(long, default_value = "1")]
    num: u32,

    /// Gzip-compress the generated files.
    #[arg(long)]
    compress: bool,

    /// Use millisecond timestamps (one sample per millisecond).
    #[arg(long)]
    millis: bool,

    /// Output directory; one subdirectory per year is created beneath it.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
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
        .add_directive(format!("tsdreplay={}", level).parse().unwrap())
        .add_directive(format!("tsdgen={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!(
        "Generating {} years starting from year {}, for metric {}",
        args.num, args.year, args.metric
    );
    if args.millis {
        info!("Using millisecond timestamps");
    }
    if args.compress {
        info!("Files will be compressed");
    }

    let config = GenerateConfig {
        metric: args.metric,
        start_year: args.year,
        years: args.num,
        compress: args.compress,
        millis: args.millis,
        out_dir: args.out_dir,
    };

    match generate_yearly_files(&config) {
        Ok(count) => {
            info!("Wrote {} data points", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

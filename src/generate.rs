//! Synthetic data files for replay testing.
//!
//! Writes one file per year of `<metric> <timestamp> <value> week=W day=D`
//! records at a fixed sample rate (one per second, or one per millisecond),
//! optionally gzip-compressed. The output is well-formed input for the
//! replay engine and nothing more.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

/// Configuration values consumed by the generator.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Metric name; also the output file name basis.
    pub metric: String,
    pub start_year: i32,
    pub years: u32,
    /// Gzip-compress the generated files.
    pub compress: bool,
    /// Millisecond timestamps, one sample per millisecond.
    pub millis: bool,
    /// Output directory; one subdirectory per year is created beneath it.
    pub out_dir: PathBuf,
}

/// Samples per hour at the configured rate.
fn samples_per_hour(millis: bool) -> i64 {
    if millis { 3_600_000 } else { 3600 }
}

/// Writes one file per year under `<out_dir>/<year>/<metric>.tsd[.gz]`.
/// Returns the total number of records written.
pub fn generate_yearly_files(config: &GenerateConfig) -> io::Result<u64> {
    let extension = if config.compress { ".tsd.gz" } else { ".tsd" };
    let step = samples_per_hour(config.millis);
    let mut count: u64 = 0;

    for year in config.start_year..config.start_year + config.years as i32 {
        info!("generating year {}", year);

        let dir = config.out_dir.join(year.to_string());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}{}", config.metric, extension));
        let mut writer = open_output(&path, config.compress)?;

        let jan1 = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| io::Error::other(format!("invalid start year {}", year)))?;
        let mut time = if config.millis {
            jan1.timestamp_millis()
        } else {
            jan1.timestamp()
        };

        for week in 1..=52u32 {
            for day in 0..7u32 {
                for _hour in 0..24 {
                    for _ in 0..step {
                        write_record(&mut writer, &config.metric, time, week, day)?;
                        time += 1;
                        count += 1;
                    }
                }
            }
        }
        writer.flush()?;
    }

    Ok(count)
}

/// One output record in the native line format, constant value.
fn write_record(
    writer: &mut dyn Write,
    metric: &str,
    time: i64,
    week: u32,
    day: u32,
) -> io::Result<()> {
    writeln!(writer, "{} {} 1 week={} day={}", metric, time, week, day)
}

fn open_output(path: &Path, compress: bool) -> io::Result<Box<dyn Write>> {
    let file = fs::File::create(path)?;
    if compress {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

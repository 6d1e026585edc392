//! Adds coordinates to the address rows of a CSV file.
//!
//! Rows are read in file order, resolved one at a time against Nominatim with
//! Photon as the fallback, and appended to the output as soon as they are
//! resolved. Outbound requests are spaced by [`GeocoderConfig::min_interval`]
//! across both providers. An interrupted run can be continued with `--start`
//! (or `--resume`), which only appends when the output's cursor agrees.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    config::GeocoderConfig,
    error::RowError,
    model::{EnrichedRecord, GeocodeResult},
};

use self::{
    enricher::Enricher,
    progress::{Progress, Summary},
    sink::SinkWriter,
    source::{AddressColumns, RowSource},
};

mod enricher;
mod limiter;
mod nominatim;
mod photon;
mod progress;
mod sink;
mod source;
#[cfg(test)]
mod test_support;

const TEST_ROWS: u64 = 10;

#[derive(Debug, clap::Args)]
pub struct GeocodeArgs {
    /// Input CSV file
    pub input: PathBuf,

    /// Output CSV file [default: <input>_with_coordinates.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First data row to process (0-based). An existing output is appended to
    #[arg(short, long, conflicts_with = "resume")]
    pub start: Option<u64>,

    /// Maximum number of rows to process
    #[arg(short, long)]
    pub max: Option<u64>,

    /// Process only the first 10 rows
    #[arg(long)]
    pub test: bool,

    /// Continue from the last row in the existing output
    #[arg(long)]
    pub resume: bool,

    /// YAML file overriding the geocoder settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: Option<u64>,
    pub max: Option<u64>,
}

impl RunOptions {
    pub fn from_args(args: &GeocodeArgs) -> Result<Self> {
        let output = match &args.output {
            Some(x) => x.clone(),
            None if args.test => args.input.with_file_name("test_geocoding_results.csv"),
            None => default_output(&args.input),
        };

        let start = if args.resume {
            Some(sink::next_row(&output)?.unwrap_or(0))
        } else {
            args.start
        };

        Ok(Self {
            input: args.input.clone(),
            output,
            start,
            max: if args.test { Some(TEST_ROWS) } else { args.max },
        })
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_with_coordinates.csv"))
}

pub fn main(args: GeocodeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => GeocoderConfig::load(path)?,
        None => GeocoderConfig::default(),
    };
    let options = RunOptions::from_args(&args)?;
    if args.test {
        info!("Running in test mode, processing the first {TEST_ROWS} rows only");
    }

    let mut enricher = Enricher::from_config(&config);
    let summary = run(&options, &config, &mut enricher)?;

    info!(
        "Completed! {} rows: {} successful, {} failed, {} without address, {} skipped",
        summary.processed(),
        summary.success,
        summary.failed,
        summary.empty_address,
        summary.skipped
    );
    match summary.success_rate() {
        Some(rate) => info!("Success rate: {rate:.1}%"),
        None => info!("No addresses geocoded"),
    }
    Ok(())
}

/// Enriches rows `[start, start + max)` of the input into the output.
///
/// Per-row problems end up in the row's status; only input/output failures
/// abort, and every row written before that stays intact.
pub fn run(options: &RunOptions, config: &GeocoderConfig, enricher: &mut Enricher) -> Result<Summary> {
    let start = options.start.unwrap_or(0);
    let source = RowSource::open(&options.input, start, options.max)?;
    let columns = AddressColumns::resolve(source.headers(), &config.columns)?;
    let mut sink = SinkWriter::open(&options.output, &options.input, source.headers(), options.start)?;

    let available = RowSource::count_rows(&options.input)?.saturating_sub(start);
    let total = options.max.map_or(available, |max| max.min(available));
    info!(
        "Geocoding {total} rows of {} from row {start}",
        options.input.display()
    );

    let mut progress = Progress::new(total, config.report_every);
    for row in source {
        let (record, result) = match row {
            Ok(record) => {
                // a blank address is empty_address even on an excluded row
                let address = columns.raw_address(&record);
                let result = if !address.is_empty() && columns.is_excluded(&record) {
                    GeocodeResult::skipped()
                } else {
                    enricher.geocode(&address)
                };
                (record, result)
            }
            Err(RowError::Malformed { record, expected }) => {
                warn!(
                    "Row {} has {} columns instead of {expected}, marking it failed",
                    record.index,
                    record.fields.len()
                );
                (record, GeocodeResult::failed(""))
            }
            Err(err) => return Err(err.into()),
        };

        let status = result.status;
        sink.write(&EnrichedRecord { record, result })?;
        progress.record(status);
    }

    info!("Wrote {} rows to {}", sink.written(), options.output.display());
    Ok(progress.finish())
}

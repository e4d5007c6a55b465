//! `meter-ingest` command-line entry point.
//!
//! Ingests a directory of meter CSV exports, prints daily/weekly totals and a per-building
//! summary, and writes the cleaned dataset plus summaries to an output directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;

use meter_ingest::export::write_outputs;
use meter_ingest::ingestion::{
    CompositeObserver, DateOrder, DuplicateColumnPolicy, IngestionObserver, JsonLinesObserver,
    Pipeline, PipelineOptions, RowErrorPolicy, TracingObserver,
};
use meter_ingest::processing::{building_summary, daily_totals, weekly_totals};

#[derive(Parser, Debug)]
#[command(
    name = "meter-ingest",
    version,
    about = "Merge per-building energy meter CSV files into one dataset with summaries"
)]
struct Args {
    /// Directory containing `<prefix>_<building>_<suffix>.csv` files
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory for output files (created if missing)
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// JSON file with pipeline options; flags below override it
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// File extension to ingest (case-insensitive)
    #[arg(long = "extension", value_name = "EXT")]
    extension: Option<String>,

    /// Read numeric dates as day/month instead of month/day
    #[arg(long = "day-first")]
    day_first: bool,

    /// Scan subdirectories too
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Field delimiter
    #[arg(short = 'd', long = "delimiter", value_name = "C")]
    delimiter: Option<char>,

    /// Files processed concurrently
    #[arg(short = 'w', long = "workers", value_name = "N")]
    workers: Option<usize>,

    /// Fail the whole file on the first bad row instead of dropping the row
    #[arg(long = "fail-file-on-bad-row")]
    fail_file_on_bad_row: bool,

    /// Keep the last column when two headers normalize to the same name
    #[arg(long = "last-column-wins")]
    last_column_wins: bool,

    /// Append per-file events as JSON lines to this file
    #[arg(long = "events", value_name = "FILE")]
    events: Option<PathBuf>,

    /// Exit with an error if no records were ingested
    #[arg(long = "require-records")]
    require_records: bool,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Config file (or defaults) with command-line overrides applied.
    fn pipeline_options(&self) -> Result<PipelineOptions> {
        let mut opts = match &self.config {
            Some(path) => PipelineOptions::from_json_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PipelineOptions::default(),
        };

        if let Some(ext) = &self.extension {
            opts.extension = ext.clone();
        }
        if self.day_first {
            opts.date_order = DateOrder::DayFirst;
        }
        if self.recursive {
            opts.recursive = true;
        }
        if let Some(d) = self.delimiter {
            opts.delimiter = d;
        }
        if let Some(w) = self.workers {
            opts.workers = w;
        }
        if self.fail_file_on_bad_row {
            opts.row_errors = RowErrorPolicy::FailFile;
        }
        if self.last_column_wins {
            opts.duplicate_columns = DuplicateColumnPolicy::LastWins;
        }

        let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
        if let Some(path) = &self.events {
            observers.push(Arc::new(JsonLinesObserver::new(path)));
        }
        opts.observer = Some(Arc::new(CompositeObserver::new(observers)));

        Ok(opts)
    }
}

fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("meter_ingest={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let options = args.pipeline_options()?;
    debug!("pipeline options: {options:?}");

    let pipeline = Pipeline::new(options).context("invalid pipeline options")?;
    let out = pipeline
        .run(&args.input_dir)
        .with_context(|| format!("failed to ingest {}", args.input_dir.display()))?;

    println!("Daily totals:");
    for day in daily_totals(&out.dataset) {
        println!("  {}  {:>12.3}", day.label, day.kwh);
    }

    println!("\nWeekly totals:");
    for week in weekly_totals(&out.dataset) {
        println!("  {}  {:>12.3}", week.label, week.kwh);
    }

    println!("\nBuilding summary:");
    println!(
        "  {:<12} {:>12} {:>12} {:>12} {:>12}",
        "building", "mean", "min", "max", "sum"
    );
    for s in building_summary(&out.dataset) {
        println!(
            "  {:<12} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            s.building, s.mean, s.min, s.max, s.sum
        );
    }

    let files = write_outputs(&args.output, &out.dataset, &out.report)
        .with_context(|| format!("failed to write outputs to {}", args.output.display()))?;

    println!(
        "\nIngested {} of {} file(s), {} record(s); outputs in {}",
        out.report.ingested_count(),
        out.report.len(),
        out.dataset.row_count(),
        args.output.display()
    );
    debug!("wrote {files:?}");

    if args.require_records && out.dataset.is_empty() {
        bail!("no records ingested from {}", args.input_dir.display());
    }

    Ok(())
}

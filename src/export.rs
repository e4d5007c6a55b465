//! Writers for the cleaned dataset, aggregates and ingestion report.
//!
//! [`write_outputs`] produces the full set of files in one directory:
//!
//! - `cleaned_energy_data.csv`
//! - `building_summary.csv`
//! - `summary.txt`
//! - `ingestion_report.json`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use tracing::info;

use crate::error::IngestionResult;
use crate::processing::{building_summary, campus_summary};
use crate::report::IngestionReport;
use crate::types::{BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN, UnifiedDataset};

pub const CLEANED_DATA_FILE: &str = "cleaned_energy_data.csv";
pub const BUILDING_SUMMARY_FILE: &str = "building_summary.csv";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const REPORT_FILE: &str = "ingestion_report.json";

/// Paths of the files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub cleaned_data: PathBuf,
    pub building_summary: PathBuf,
    pub summary: PathBuf,
    pub report: PathBuf,
}

/// Write every output file into `out_dir`, creating it if needed.
pub fn write_outputs(
    out_dir: impl AsRef<Path>,
    dataset: &UnifiedDataset,
    report: &IngestionReport,
) -> IngestionResult<OutputFiles> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;

    let files = OutputFiles {
        cleaned_data: out_dir.join(CLEANED_DATA_FILE),
        building_summary: out_dir.join(BUILDING_SUMMARY_FILE),
        summary: out_dir.join(SUMMARY_FILE),
        report: out_dir.join(REPORT_FILE),
    };

    write_cleaned_data(fs::File::create(&files.cleaned_data)?, dataset)?;
    write_building_summary(fs::File::create(&files.building_summary)?, dataset)?;
    write_summary(fs::File::create(&files.summary)?, dataset)?;
    fs::write(&files.report, report.to_json_pretty()?)?;

    info!("outputs written to {}", out_dir.display());
    Ok(files)
}

/// Format a timestamp as `%Y-%m-%d %H:%M:%S`, adding fractional seconds only when non-zero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

/// Write the merged dataset as CSV: `timestamp,kwh,building` then passthrough columns.
///
/// Records lacking a passthrough column get an empty cell.
pub fn write_cleaned_data<W: Write>(out: W, dataset: &UnifiedDataset) -> IngestionResult<()> {
    let mut w = csv::Writer::from_writer(out);

    let mut header = vec![TIMESTAMP_COLUMN, KWH_COLUMN, BUILDING_COLUMN];
    header.extend(dataset.extra_columns.iter().map(String::as_str));
    w.write_record(&header)?;

    for r in &dataset.records {
        let mut row = vec![format_timestamp(&r.timestamp), r.kwh.to_string(), r.building.clone()];
        row.extend(
            dataset
                .extra_columns
                .iter()
                .map(|c| r.extra.get(c).cloned().unwrap_or_default()),
        );
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Write `building,mean,min,max,sum`, one row per building.
pub fn write_building_summary<W: Write>(out: W, dataset: &UnifiedDataset) -> IngestionResult<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(["building", "mean", "min", "max", "sum"])?;
    for s in building_summary(dataset) {
        w.write_record([
            s.building,
            s.mean.to_string(),
            s.min.to_string(),
            s.max.to_string(),
            s.sum.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write the three-line campus summary.
pub fn write_summary<W: Write>(mut out: W, dataset: &UnifiedDataset) -> io::Result<()> {
    let campus = campus_summary(dataset);
    writeln!(out, "Total Campus Consumption: {}", campus.total_kwh)?;
    writeln!(
        out,
        "Highest Consuming Building: {}",
        campus.highest_building.as_deref().unwrap_or("none")
    )?;
    match campus.peak {
        Some(p) => writeln!(out, "Peak Load Hour: {}", format_timestamp(&p.timestamp))?,
        None => writeln!(out, "Peak Load Hour: none")?,
    }
    out.flush()
}

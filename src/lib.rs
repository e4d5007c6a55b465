//! `meter-ingest` loads a directory of per-building energy-meter CSV exports into a single
//! in-memory [`types::UnifiedDataset`], alongside an [`report::IngestionReport`] describing what
//! happened to every file.
//!
//! The primary entrypoint is [`ingestion::ingest_directory`].
//!
//! ## Input layout
//!
//! Files are named `<prefix>_<building>_<suffix>.csv` (for example `elec_A_jan.csv`); the second
//! `_`-separated token of the stem becomes the record's building. Each file needs a `timestamp`
//! and a `kwh` column. Header labels are trimmed and lowercased, so ` Timestamp ` and `KWH` work
//! too. Any other columns are carried through untouched.
//!
//! ## Failure model
//!
//! - A run either returns `Err(`[`IngestionError`]`)` (it could not start: missing directory,
//!   invalid options) or an [`ingestion::IngestionOutput`].
//! - A bad file never aborts the run. It is recorded as [`report::FileStatus::Failed`] with a
//!   [`FileError`] and the remaining files are still ingested.
//! - Row-level problems (unparseable timestamp, non-numeric kWh) drop the row and add an
//!   [`IngestionWarning`] by default; see [`ingestion::RowErrorPolicy`].
//!
//! ## Quick example
//!
//! ```no_run
//! use meter_ingest::ingestion::{ingest_directory, PipelineOptions};
//! use meter_ingest::processing::{building_summary, daily_totals};
//!
//! # fn main() -> Result<(), meter_ingest::IngestionError> {
//! let out = ingest_directory("data", &PipelineOptions::default())?;
//! println!(
//!     "rows={} ingested={} failed={}",
//!     out.dataset.row_count(),
//!     out.report.ingested_count(),
//!     out.report.failed_count()
//! );
//! for day in daily_totals(&out.dataset) {
//!     println!("{} {:.2}", day.label, day.kwh);
//! }
//! for s in building_summary(&out.dataset) {
//!     println!("{} sum={:.2}", s.building, s.sum);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: discovery, parsing, normalization, timestamp coercion and merging
//! - [`execution`]: bounded worker pool used when `workers > 1`
//! - [`processing`]: daily/weekly totals and building/campus summaries
//! - [`export`]: CSV, text and JSON output files
//! - [`report`]: per-file outcomes
//! - [`types`]: record and dataset types
//! - [`error`]: run-level errors, per-file errors and warnings

pub mod error;
pub mod execution;
pub mod export;
pub mod ingestion;
pub mod processing;
pub mod report;
pub mod types;

pub use error::{FileError, FileResult, IngestionError, IngestionResult, IngestionWarning};
pub use report::{FileReport, FileStatus, IngestionReport};
pub use types::{MeterRecord, UnifiedDataset};

//! Aggregations over a [`crate::types::UnifiedDataset`].
//!
//! The processing layer only reads the dataset produced by ingestion; nothing here feeds back
//! into it.
//!
//! - [`reduce()`]: count/sum/min/max/mean of kWh
//! - [`daily_totals`] / [`weekly_totals`]: calendar resampling (weeks end on Sunday)
//! - [`building_summary`] / [`campus_summary`]: headline statistics
//!
//! ## Example
//!
//! ```rust
//! use meter_ingest::processing::{daily_totals, campus_summary};
//! use meter_ingest::types::{MeterRecord, UnifiedDataset};
//! use chrono::NaiveDate;
//!
//! let at = |h| NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, 0, 0).unwrap();
//! let ds = UnifiedDataset {
//!     records: vec![
//!         MeterRecord { timestamp: at(0), building: "A".into(), kwh: 1.5, extra: Default::default() },
//!         MeterRecord { timestamp: at(1), building: "B".into(), kwh: 2.5, extra: Default::default() },
//!     ],
//!     extra_columns: vec![],
//! };
//!
//! assert_eq!(daily_totals(&ds)[0].kwh, 4.0);
//! assert_eq!(campus_summary(&ds).highest_building.as_deref(), Some("B"));
//! ```

pub mod reduce;
pub mod resample;
pub mod summary;

pub use reduce::{ReduceOp, reduce};
pub use resample::{Bucket, Frequency, daily_totals, resample_sum, totals_by_building, weekly_totals};
pub use summary::{BuildingSummary, CampusSummary, PeakReading, building_summary, campus_summary};

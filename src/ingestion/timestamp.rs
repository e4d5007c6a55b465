//! Timestamp and kWh coercion: [`NormalizedRecordBatch`] → typed [`MeterRecord`]s.
//!
//! Numeric day/month dates are read in one configured [`DateOrder`] for the whole run. A value
//! that only parses in the other order (`13/01/2024` under month-first) is rejected, never
//! reinterpreted, so the same text always maps to the same instant.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{FileError, FileResult, IngestionWarning};
use crate::types::{
    BUILDING_COLUMN, KWH_COLUMN, MeterRecord, NormalizedRecordBatch, TIMESTAMP_COLUMN,
};

/// Field order for numeric dates such as `01/02/2024`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY` (January 2nd above).
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY` (February 1st above).
    DayFirst,
}

/// What to do with a row whose timestamp or kWh value cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Drop the row and record an [`IngestionWarning`].
    #[default]
    DropRow,
    /// Fail the whole file on the first bad row.
    FailFile,
}

/// Year-first layouts; unambiguous, tried before the order-dependent ones.
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];
const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_SUFFIXES: &[&str] = &[" %H:%M:%S%.f", " %H:%M", " %I:%M:%S %p", " %I:%M %p"];
const DATE_SEPARATORS: &[char] = &['/', '-', '.'];

/// Parses textual timestamps under a fixed [`DateOrder`].
#[derive(Debug, Clone)]
pub struct TimestampParser {
    order: DateOrder,
    datetime_formats: Vec<String>,
    date_formats: Vec<String>,
}

impl TimestampParser {
    /// Build the format table for `order`.
    pub fn new(order: DateOrder) -> Self {
        let mut datetime_formats: Vec<String> =
            ISO_DATETIME_FORMATS.iter().map(|f| f.to_string()).collect();
        let mut date_formats: Vec<String> = ISO_DATE_FORMATS.iter().map(|f| f.to_string()).collect();

        for sep in DATE_SEPARATORS {
            let date = match order {
                DateOrder::MonthFirst => format!("%m{sep}%d{sep}%Y"),
                DateOrder::DayFirst => format!("%d{sep}%m{sep}%Y"),
            };
            for time in TIME_SUFFIXES {
                datetime_formats.push(format!("{date}{time}"));
            }
            date_formats.push(date);
        }

        Self {
            order,
            datetime_formats,
            date_formats,
        }
    }

    /// Configured date order.
    pub fn order(&self) -> DateOrder {
        self.order
    }

    /// Parse `raw` into a timezone-naive instant.
    ///
    /// Values carrying an explicit UTC offset (RFC 3339) are converted to UTC first. Date-only
    /// values map to midnight.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        if let Some(dt) = self
            .datetime_formats
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        {
            return Some(dt);
        }
        self.date_formats
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
            .map(|d| d.and_time(NaiveTime::MIN))
    }
}

/// Records produced from one file, with any rows dropped along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedBatch {
    /// File the records came from.
    pub source: PathBuf,
    /// Building identifier of every record.
    pub building: String,
    /// Passthrough column names in file order.
    pub extra_columns: Vec<String>,
    /// Typed records in file order.
    pub records: Vec<MeterRecord>,
    /// Row-level advisories (dropped rows).
    pub warnings: Vec<IngestionWarning>,
}

/// Converts normalized rows into [`MeterRecord`]s.
#[derive(Debug, Clone)]
pub struct TimestampCoercer {
    parser: TimestampParser,
    policy: RowErrorPolicy,
}

impl TimestampCoercer {
    /// Coercer for `order` and `policy`.
    pub fn new(order: DateOrder, policy: RowErrorPolicy) -> Self {
        Self {
            parser: TimestampParser::new(order),
            policy,
        }
    }

    /// The underlying timestamp parser.
    pub fn parser(&self) -> &TimestampParser {
        &self.parser
    }

    /// Parse the `timestamp` and `kwh` column of every row.
    ///
    /// Non-finite kWh values (`NaN`, `inf`) are treated as invalid.
    pub fn coerce(&self, batch: NormalizedRecordBatch) -> FileResult<CoercedBatch> {
        let ts_idx = batch
            .index_of(TIMESTAMP_COLUMN)
            .ok_or_else(|| FileError::MissingTimestampColumn {
                columns: batch.columns.clone(),
            })?;
        let kwh_idx = batch
            .index_of(KWH_COLUMN)
            .ok_or_else(|| FileError::MissingRequiredColumn {
                column: KWH_COLUMN.to_string(),
                columns: batch.columns.clone(),
            })?;

        let extra: Vec<(usize, String)> = batch
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.as_str() != TIMESTAMP_COLUMN && c.as_str() != KWH_COLUMN && c.as_str() != BUILDING_COLUMN
            })
            .map(|(i, c)| (i, c.clone()))
            .collect();

        let mut records = Vec::with_capacity(batch.rows.len());
        let mut warnings = Vec::new();

        for row in batch.rows {
            let raw_ts = row.values.get(ts_idx).map(String::as_str).unwrap_or("");
            let Some(timestamp) = self.parser.parse(raw_ts) else {
                let (line, raw) = (row.line, raw_ts.to_string());
                match self.policy {
                    RowErrorPolicy::DropRow => {
                        warnings.push(IngestionWarning::UnparseableTimestamp { line, raw });
                        continue;
                    }
                    RowErrorPolicy::FailFile => {
                        return Err(FileError::UnparseableTimestamp { line, raw });
                    }
                }
            };

            let raw_kwh = row.values.get(kwh_idx).map(String::as_str).unwrap_or("");
            let kwh = match raw_kwh.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    let (line, raw) = (row.line, raw_kwh.to_string());
                    match self.policy {
                        RowErrorPolicy::DropRow => {
                            warnings.push(IngestionWarning::InvalidKwh { line, raw });
                            continue;
                        }
                        RowErrorPolicy::FailFile => return Err(FileError::InvalidKwh { line, raw }),
                    }
                }
            };

            let extra_values: BTreeMap<String, String> = extra
                .iter()
                .map(|(i, name)| (name.clone(), row.values.get(*i).cloned().unwrap_or_default()))
                .collect();

            records.push(MeterRecord {
                timestamp,
                building: batch.building.clone(),
                kwh,
                extra: extra_values,
            });
        }

        Ok(CoercedBatch {
            source: batch.source,
            building: batch.building,
            extra_columns: extra.into_iter().map(|(_, name)| name).collect(),
            records,
            warnings,
        })
    }
}

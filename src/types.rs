//! Core data model types for meter ingestion.
//!
//! A file moves through three shapes: [`RawRecordBatch`] (as parsed), [`NormalizedRecordBatch`]
//! (canonical keys + `building`), and finally [`MeterRecord`]s collected into a
//! [`UnifiedDataset`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Canonical name of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Canonical name of the consumption column.
pub const KWH_COLUMN: &str = "kwh";
/// Canonical name of the derived building column.
pub const BUILDING_COLUMN: &str = "building";

/// Parsed content of one source file before normalization.
///
/// `headers` are raw labels exactly as they appeared (minus any BOM); each row holds raw string
/// values aligned with `headers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordBatch {
    /// File the batch was read from.
    pub source: PathBuf,
    /// Raw header labels.
    pub headers: Vec<String>,
    /// Data rows with their 1-based line number in the source file.
    pub rows: Vec<RawRow>,
}

/// One raw data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number (the header is line 1).
    pub line: u64,
    /// Values aligned with [`RawRecordBatch::headers`].
    pub values: Vec<String>,
}

impl RawRecordBatch {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate a row as `(raw label, raw value)` pairs.
    pub fn row_pairs(&self, idx: usize) -> Option<impl Iterator<Item = (&str, &str)>> {
        let row = self.rows.get(idx)?;
        Some(
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.values.iter().map(String::as_str)),
        )
    }
}

/// A batch with canonical column keys and a `building` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecordBatch {
    /// File the batch was read from.
    pub source: PathBuf,
    /// Building identifier derived from the file name.
    pub building: String,
    /// Canonical column keys; always contains `timestamp`, `kwh` and `building`.
    pub columns: Vec<String>,
    /// Rows aligned with `columns`.
    pub rows: Vec<RawRow>,
}

impl NormalizedRecordBatch {
    /// Returns the index of a column by canonical key, if present.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The atomic unit of the unified dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterRecord {
    /// Timezone-naive point in time.
    pub timestamp: NaiveDateTime,
    /// Building identifier.
    pub building: String,
    /// Consumption in kWh. Not range-checked.
    pub kwh: f64,
    /// Any other columns, keyed by canonical name, values untouched.
    pub extra: BTreeMap<String, String>,
}

/// Ordered, merged dataset of all successfully ingested files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnifiedDataset {
    /// Records in discovery order, file-internal order preserved.
    pub records: Vec<MeterRecord>,
    /// Union of passthrough column names in first-seen order.
    pub extra_columns: Vec<String>,
}

impl UnifiedDataset {
    /// Number of records.
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct building identifiers, sorted.
    pub fn buildings(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.records.iter().map(|r| r.building.as_str()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(building: &str, kwh: f64) -> MeterRecord {
        MeterRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            building: building.to_string(),
            kwh,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn buildings_are_sorted_and_deduplicated() {
        let ds = UnifiedDataset {
            records: vec![record("B", 1.0), record("A", 2.0), record("B", 3.0)],
            extra_columns: Vec::new(),
        };
        assert_eq!(ds.buildings(), vec!["A", "B"]);
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn row_pairs_zip_headers_with_values() {
        let batch = RawRecordBatch {
            source: PathBuf::from("x_A_y.csv"),
            headers: vec!["Timestamp ".to_string(), "kWh".to_string()],
            rows: vec![RawRow {
                line: 2,
                values: vec!["2024-01-01".to_string(), "1.5".to_string()],
            }],
        };
        let pairs: Vec<_> = batch.row_pairs(0).unwrap().collect();
        assert_eq!(pairs, vec![("Timestamp ", "2024-01-01"), ("kWh", "1.5")]);
        assert!(batch.row_pairs(1).is_none());
    }
}

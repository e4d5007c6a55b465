//! Column canonicalization, required-columns contract and building tagging.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FileError, FileResult};
use crate::types::{
    BUILDING_COLUMN, KWH_COLUMN, NormalizedRecordBatch, RawRecordBatch, TIMESTAMP_COLUMN,
};

/// How to resolve two header labels that canonicalize to the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateColumnPolicy {
    /// Fail the file with [`FileError::DuplicateColumnAfterNormalization`].
    #[default]
    Reject,
    /// Keep one column; values from the later (rightmost) label win.
    LastWins,
}

/// Canonicalize a column label: trim surrounding whitespace, lowercase.
pub fn canonical_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Derive the building identifier from a file name: second `_`-delimited token of the stem.
///
/// `readings_A_january.csv` → `A`.
pub fn building_from_path(path: &Path) -> FileResult<String> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    match stem.split('_').nth(1) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(FileError::BuildingNameUnparseable { file_name }),
    }
}

/// Turns a [`RawRecordBatch`] into a [`NormalizedRecordBatch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNormalizer {
    duplicates: DuplicateColumnPolicy,
}

impl SchemaNormalizer {
    /// Normalizer with an explicit duplicate-column policy.
    pub fn new(duplicates: DuplicateColumnPolicy) -> Self {
        Self { duplicates }
    }

    /// Canonicalize labels, enforce required columns and attach `building` to every row.
    ///
    /// The building is derived from `batch.source`. A `building` column already present in the
    /// file is overwritten by the derived value.
    pub fn normalize(&self, batch: RawRecordBatch) -> FileResult<NormalizedRecordBatch> {
        let building = building_from_path(&batch.source)?;

        // For each raw column index, the output slot it writes to.
        let mut columns: Vec<String> = Vec::with_capacity(batch.headers.len() + 1);
        let mut slots: Vec<usize> = Vec::with_capacity(batch.headers.len());
        for raw in &batch.headers {
            let key = canonical_label(raw);
            match columns.iter().position(|c| *c == key) {
                Some(existing) => match self.duplicates {
                    DuplicateColumnPolicy::Reject => {
                        return Err(FileError::DuplicateColumnAfterNormalization { column: key });
                    }
                    DuplicateColumnPolicy::LastWins => slots.push(existing),
                },
                None => {
                    slots.push(columns.len());
                    columns.push(key);
                }
            }
        }

        if !columns.iter().any(|c| c == TIMESTAMP_COLUMN) {
            return Err(FileError::MissingTimestampColumn { columns });
        }
        if !columns.iter().any(|c| c == KWH_COLUMN) {
            return Err(FileError::MissingRequiredColumn {
                column: KWH_COLUMN.to_string(),
                columns,
            });
        }

        let building_slot = match columns.iter().position(|c| c == BUILDING_COLUMN) {
            Some(idx) => {
                warn!(
                    "{}: 'building' column overwritten with '{building}' derived from file name",
                    batch.source.display()
                );
                idx
            }
            None => {
                columns.push(BUILDING_COLUMN.to_string());
                columns.len() - 1
            }
        };

        let width = columns.len();
        let rows = batch
            .rows
            .into_iter()
            .map(|mut row| {
                let mut values = vec![String::new(); width];
                for (raw_idx, value) in row.values.drain(..).enumerate() {
                    values[slots[raw_idx]] = value;
                }
                values[building_slot] = building.clone();
                row.values = values;
                row
            })
            .collect();

        Ok(NormalizedRecordBatch {
            source: batch.source,
            building,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRow;
    use std::path::PathBuf;

    fn raw(file: &str, headers: &[&str], rows: &[&[&str]]) -> RawRecordBatch {
        RawRecordBatch {
            source: PathBuf::from(file),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, r)| RawRow {
                    line: i as u64 + 2,
                    values: r.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn header_variants_canonicalize_to_same_key() {
        for h in [" Timestamp ", "TIMESTAMP", "timestamp", "\tTimeStamp"] {
            assert_eq!(canonical_label(h), "timestamp");
        }
    }

    #[test]
    fn building_is_second_underscore_token() {
        assert_eq!(building_from_path(Path::new("usage_B_2024.csv")).unwrap(), "B");
        assert_eq!(
            building_from_path(Path::new("data/readings_A_january.csv")).unwrap(),
            "A"
        );
        assert_eq!(building_from_path(Path::new("elec_Library.csv")).unwrap(), "Library");
    }

    #[test]
    fn building_unparseable_without_underscore() {
        let err = building_from_path(Path::new("readings.csv")).unwrap_err();
        assert_eq!(
            err,
            FileError::BuildingNameUnparseable {
                file_name: "readings.csv".to_string()
            }
        );
        assert!(building_from_path(Path::new("readings__x.csv")).is_err());
    }

    #[test]
    fn normalize_adds_building_column_to_every_row() {
        let batch = raw(
            "elec_A_jan.csv",
            &[" Timestamp", "KWH ", "Meter"],
            &[&["2024-01-01", "1", "m1"], &["2024-01-02", "2", "m1"]],
        );
        let out = SchemaNormalizer::default().normalize(batch).unwrap();
        assert_eq!(out.columns, vec!["timestamp", "kwh", "meter", "building"]);
        assert_eq!(out.building, "A");
        assert!(out.rows.iter().all(|r| r.values[3] == "A"));
        assert_eq!(out.rows[1].line, 3);
    }

    #[test]
    fn missing_timestamp_is_reported_by_name() {
        let batch = raw("elec_A_jan.csv", &["time", "kwh"], &[]);
        let err = SchemaNormalizer::default().normalize(batch).unwrap_err();
        assert!(matches!(err, FileError::MissingTimestampColumn { .. }));
    }

    #[test]
    fn missing_kwh_is_reported() {
        let batch = raw("elec_A_jan.csv", &["timestamp", "energy"], &[]);
        let err = SchemaNormalizer::default().normalize(batch).unwrap_err();
        assert_eq!(
            err,
            FileError::MissingRequiredColumn {
                column: "kwh".to_string(),
                columns: vec!["timestamp".to_string(), "energy".to_string()],
            }
        );
    }

    #[test]
    fn duplicate_columns_rejected_by_default() {
        let batch = raw(
            "elec_A_jan.csv",
            &["timestamp", "kwh", " KWH"],
            &[&["2024-01-01", "1", "2"]],
        );
        let err = SchemaNormalizer::default().normalize(batch).unwrap_err();
        assert_eq!(
            err,
            FileError::DuplicateColumnAfterNormalization {
                column: "kwh".to_string()
            }
        );
    }

    #[test]
    fn duplicate_columns_last_wins_when_configured() {
        let batch = raw(
            "elec_A_jan.csv",
            &["timestamp", "kwh", " KWH"],
            &[&["2024-01-01", "1", "2"]],
        );
        let out = SchemaNormalizer::new(DuplicateColumnPolicy::LastWins)
            .normalize(batch)
            .unwrap();
        assert_eq!(out.columns, vec!["timestamp", "kwh", "building"]);
        assert_eq!(out.rows[0].values, vec!["2024-01-01", "2", "A"]);
    }

    #[test]
    fn existing_building_column_is_overwritten() {
        let batch = raw(
            "elec_A_jan.csv",
            &["Building", "timestamp", "kwh"],
            &[&["Z", "2024-01-01", "1"]],
        );
        let out = SchemaNormalizer::default().normalize(batch).unwrap();
        assert_eq!(out.columns, vec!["building", "timestamp", "kwh"]);
        assert_eq!(out.rows[0].values[0], "A");
    }
}

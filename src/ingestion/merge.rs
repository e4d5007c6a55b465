//! Ordered concatenation of per-file results.

use std::path::PathBuf;

use crate::error::FileError;
use crate::report::{FileStatus, IngestionReport};
use crate::types::UnifiedDataset;

use super::timestamp::CoercedBatch;

/// Result of running the per-file stages on one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// All stages succeeded (the batch may hold zero records).
    Parsed(CoercedBatch),
    /// A stage failed; nothing from the file is kept.
    Failed(FileError),
    /// Not attempted because the run was cancelled.
    Skipped,
}

/// Append-only accumulator for the dataset and the report.
///
/// Rows are appended in the order outcomes are pushed; the merger never sorts.
#[derive(Debug, Default)]
pub struct DatasetMerger {
    dataset: UnifiedDataset,
    report: IngestionReport,
}

impl DatasetMerger {
    /// Empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `path` and append its records, if any.
    pub fn push(&mut self, path: PathBuf, outcome: FileOutcome) {
        let status = match outcome {
            FileOutcome::Parsed(batch) => {
                for col in batch.extra_columns {
                    if !self.dataset.extra_columns.contains(&col) {
                        self.dataset.extra_columns.push(col);
                    }
                }
                let rows = batch.records.len();
                self.dataset.records.extend(batch.records);
                FileStatus::Ingested {
                    rows,
                    warnings: batch.warnings,
                }
            }
            FileOutcome::Failed(error) => FileStatus::Failed { error },
            FileOutcome::Skipped => {
                self.report.cancelled = true;
                FileStatus::Skipped
            }
        };
        self.report.push(path, status);
    }

    /// Rows merged so far.
    pub fn row_count(&self) -> usize {
        self.dataset.row_count()
    }

    /// Consume the merger.
    pub fn finish(self) -> (UnifiedDataset, IngestionReport) {
        (self.dataset, self.report)
    }

    /// Merge a complete, discovery-ordered sequence of outcomes.
    pub fn merge<I>(outcomes: I) -> (UnifiedDataset, IngestionReport)
    where
        I: IntoIterator<Item = (PathBuf, FileOutcome)>,
    {
        let mut merger = Self::new();
        for (path, outcome) in outcomes {
            merger.push(path, outcome);
        }
        merger.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionWarning;
    use crate::types::MeterRecord;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn record(building: &str, hour: u32, kwh: f64) -> MeterRecord {
        MeterRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            building: building.to_string(),
            kwh,
            extra: BTreeMap::new(),
        }
    }

    fn parsed(building: &str, records: Vec<MeterRecord>, extra: &[&str]) -> FileOutcome {
        FileOutcome::Parsed(CoercedBatch {
            source: PathBuf::from(format!("elec_{building}_jan.csv")),
            building: building.to_string(),
            extra_columns: extra.iter().map(|s| s.to_string()).collect(),
            records,
            warnings: Vec::new(),
        })
    }

    #[test]
    fn preserves_file_order_then_row_order_without_sorting() {
        let (ds, report) = DatasetMerger::merge(vec![
            (
                PathBuf::from("elec_B_jan.csv"),
                parsed("B", vec![record("B", 5, 1.0), record("B", 1, 2.0)], &["meter"]),
            ),
            (
                PathBuf::from("elec_A_jan.csv"),
                parsed("A", vec![record("A", 0, 3.0)], &["zone", "meter"]),
            ),
        ]);
        let seq: Vec<_> = ds.records.iter().map(|r| (r.building.as_str(), r.kwh)).collect();
        assert_eq!(seq, vec![("B", 1.0), ("B", 2.0), ("A", 3.0)]);
        assert_eq!(ds.extra_columns, vec!["meter", "zone"]);
        assert_eq!(report.total_rows(), ds.row_count());
    }

    #[test]
    fn all_failures_give_empty_dataset_and_full_report() {
        let err = FileError::MissingTimestampColumn { columns: vec![] };
        let (ds, report) = DatasetMerger::merge(vec![
            (PathBuf::from("a_A_x.csv"), FileOutcome::Failed(err.clone())),
            (PathBuf::from("b_B_x.csv"), FileOutcome::Failed(err)),
        ]);
        assert!(ds.is_empty());
        assert_eq!(report.failed_count(), 2);
        assert!(!report.cancelled);
    }

    #[test]
    fn skipped_marks_report_cancelled() {
        let mut merger = DatasetMerger::new();
        merger.push(
            PathBuf::from("elec_A_jan.csv"),
            FileOutcome::Parsed(CoercedBatch {
                source: PathBuf::from("elec_A_jan.csv"),
                building: "A".to_string(),
                extra_columns: vec![],
                records: vec![],
                warnings: vec![IngestionWarning::EmptyFile],
            }),
        );
        merger.push(PathBuf::from("elec_B_jan.csv"), FileOutcome::Skipped);
        let (ds, report) = merger.finish();
        assert!(ds.is_empty());
        assert!(report.cancelled);
        assert_eq!(report.ingested_count(), 1);
        assert_eq!(report.skipped_count(), 1);
    }
}

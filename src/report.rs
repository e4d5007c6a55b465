//! Per-file ingestion outcomes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{FileError, IngestionWarning};

/// Outcome of processing one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Rows from the file are part of the dataset (possibly zero rows).
    Ingested {
        rows: usize,
        warnings: Vec<IngestionWarning>,
    },
    /// The file was excluded from the dataset.
    Failed { error: FileError },
    /// The run was cancelled before this file was started.
    Skipped,
}

/// Outcome record for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Path as discovered.
    pub path: PathBuf,
    /// What happened to it.
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    /// File name component, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether the file contributed to the dataset.
    pub fn is_ingested(&self) -> bool {
        matches!(self.status, FileStatus::Ingested { .. })
    }

    /// Whether the file failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Every discovered file's outcome, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// One entry per discovered file.
    pub files: Vec<FileReport>,
    /// Whether the run was cancelled before all files were processed.
    pub cancelled: bool,
}

impl IngestionReport {
    /// Append an outcome.
    pub fn push(&mut self, path: impl AsRef<Path>, status: FileStatus) {
        self.files.push(FileReport {
            path: path.as_ref().to_path_buf(),
            status,
        });
    }

    /// Number of files recorded.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files were recorded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of files whose rows made it into the dataset.
    pub fn ingested_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_ingested()).count()
    }

    /// Number of files that failed.
    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }

    /// Number of files never started because of cancellation.
    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Skipped))
            .count()
    }

    /// Total rows contributed by ingested files.
    pub fn total_rows(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.status {
                FileStatus::Ingested { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    /// Failed files with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &FileError)> {
        self.files.iter().filter_map(|f| match &f.status {
            FileStatus::Failed { error } => Some((f.path.as_path(), error)),
            _ => None,
        })
    }

    /// Every advisory raised against an ingested file.
    pub fn warnings(&self) -> impl Iterator<Item = (&Path, &IngestionWarning)> {
        self.files.iter().flat_map(|f| {
            let ws: &[IngestionWarning] = match &f.status {
                FileStatus::Ingested { warnings, .. } => warnings,
                _ => &[],
            };
            ws.iter().map(move |w| (f.path.as_path(), w))
        })
    }

    /// Pretty JSON rendering of the report.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IngestionReport {
        let mut r = IngestionReport::default();
        r.push(
            "data/elec_A_jan.csv",
            FileStatus::Ingested {
                rows: 20,
                warnings: vec![],
            },
        );
        r.push(
            "data/elec_B_feb.csv",
            FileStatus::Ingested {
                rows: 0,
                warnings: vec![IngestionWarning::EmptyFile],
            },
        );
        r.push(
            "data/readings.csv",
            FileStatus::Failed {
                error: FileError::BuildingNameUnparseable {
                    file_name: "readings.csv".to_string(),
                },
            },
        );
        r
    }

    #[test]
    fn counts_partition_the_files() {
        let r = sample();
        assert_eq!(r.len(), 3);
        assert_eq!(r.ingested_count() + r.failed_count() + r.skipped_count(), r.len());
        assert_eq!(r.failed_count(), 1);
        assert_eq!(r.total_rows(), 20);
    }

    #[test]
    fn failures_and_warnings_are_enumerable() {
        let r = sample();
        let failures: Vec<_> = r.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].0.ends_with("readings.csv"));

        let warnings: Vec<_> = r.warnings().collect();
        assert_eq!(warnings, vec![(Path::new("data/elec_B_feb.csv"), &IngestionWarning::EmptyFile)]);
    }

    #[test]
    fn json_shape_is_flat_per_file() {
        let v: serde_json::Value = serde_json::from_str(&sample().to_json_pretty().unwrap()).unwrap();
        assert_eq!(v["files"][0]["status"], "ingested");
        assert_eq!(v["files"][0]["rows"], 20);
        assert_eq!(v["files"][2]["status"], "failed");
        assert_eq!(v["files"][2]["error"]["kind"], "building_name_unparseable");
        assert_eq!(v["cancelled"], false);
    }
}

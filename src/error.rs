use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenience result type for run-level ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for a single file's parse/normalize/coerce stages.
pub type FileResult<T> = Result<T, FileError>;

/// Error that prevents a whole ingestion run from starting or completing.
///
/// Per-file problems never surface here; they are recorded as [`FileError`]s in the
/// [`crate::report::IngestionReport`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The input directory does not exist or is not a directory.
    #[error("input directory not found: {}", path.display())]
    InputDirectoryNotFound { path: PathBuf },

    /// Underlying I/O error while scanning the input directory or writing outputs.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The discovery glob pattern could not be built.
    #[error("invalid discovery pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// CSV output error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (config or report) error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Options are inconsistent or out of range.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

/// Error that excludes one file from the unified dataset.
///
/// Carries messages rather than source errors so reports stay cloneable and comparable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileError {
    /// The file could not be read.
    #[error("file unreadable: {message}")]
    FileUnreadable { message: String },

    /// The file is not well-formed delimited text.
    #[error("malformed delimited text{}: {message}", line_suffix(*line))]
    MalformedDelimitedText { line: Option<u64>, message: String },

    /// The building identifier could not be derived from the file name.
    #[error("cannot derive building from file name '{file_name}' (expected '<prefix>_<building>_...')")]
    BuildingNameUnparseable { file_name: String },

    /// Two header labels collapse to the same key after normalization.
    #[error("duplicate column '{column}' after normalization")]
    DuplicateColumnAfterNormalization { column: String },

    /// No `timestamp` column after normalization.
    #[error("missing required column 'timestamp'. columns={columns:?}")]
    MissingTimestampColumn { columns: Vec<String> },

    /// Another required column is missing after normalization.
    #[error("missing required column '{column}'. columns={columns:?}")]
    MissingRequiredColumn { column: String, columns: Vec<String> },

    /// A timestamp value could not be parsed (file-level under `RowErrorPolicy::FailFile`).
    #[error("unparseable timestamp at line {line}: '{raw}'")]
    UnparseableTimestamp { line: u64, raw: String },

    /// A kWh value is not numeric (file-level under `RowErrorPolicy::FailFile`).
    #[error("invalid kwh value at line {line}: '{raw}'")]
    InvalidKwh { line: u64, raw: String },
}

fn line_suffix(line: Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Non-fatal condition recorded against a file that was still ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestionWarning {
    /// The file has no data rows.
    EmptyFile,
    /// A row was dropped because its timestamp could not be parsed.
    UnparseableTimestamp { line: u64, raw: String },
    /// A row was dropped because its kWh value is not numeric.
    InvalidKwh { line: u64, raw: String },
}

impl std::fmt::Display for IngestionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFile => write!(f, "empty file (no data rows)"),
            Self::UnparseableTimestamp { line, raw } => {
                write!(f, "dropped row at line {line}: unparseable timestamp '{raw}'")
            }
            Self::InvalidKwh { line, raw } => {
                write!(f, "dropped row at line {line}: invalid kwh value '{raw}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileError, IngestionWarning};

    #[test]
    fn malformed_message_includes_line_only_when_known() {
        let with_line = FileError::MalformedDelimitedText {
            line: Some(4),
            message: "found record with 2 fields".to_string(),
        };
        assert!(with_line.to_string().contains("at line 4"));

        let without = FileError::MalformedDelimitedText {
            line: None,
            message: "invalid utf-8".to_string(),
        };
        assert_eq!(without.to_string(), "malformed delimited text: invalid utf-8");
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let err = FileError::BuildingNameUnparseable {
            file_name: "readings.csv".to_string(),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["kind"], "building_name_unparseable");
        assert_eq!(v["file_name"], "readings.csv");

        let w = serde_json::to_value(IngestionWarning::EmptyFile).unwrap();
        assert_eq!(w["kind"], "empty_file");
    }
}

//! Directory-level ingestion entrypoint.
//!
//! Most callers should use [`ingest_directory`], which scans a directory and runs every file
//! through parse → normalize → coerce, then merges the results in discovery order.
//!
//! - Per-file failures are recorded in the [`IngestionReport`]; they never fail the call.
//! - Only run-level problems (missing directory, bad options) return `Err`.
//! - If an [`IngestionObserver`] is configured, per-file outcomes are reported to it in
//!   discovery order after the files are processed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{FileResult, IngestionError, IngestionResult, IngestionWarning};
use crate::execution::{
    CancellationToken, ExecutionEngine, ExecutionOptions, TracingExecutionObserver,
};
use crate::report::{FileStatus, IngestionReport};
use crate::types::UnifiedDataset;

use super::csv::RecordParser;
use super::discovery::{DEFAULT_EXTENSION, FileDiscovery};
use super::merge::{DatasetMerger, FileOutcome};
use super::normalize::{DuplicateColumnPolicy, SchemaNormalizer, building_from_path};
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::timestamp::{CoercedBatch, DateOrder, RowErrorPolicy, TimestampCoercer};

/// Options controlling directory ingestion.
///
/// Use [`Default`] for common cases. Every field except `observer` can be loaded from JSON
/// (missing fields take their defaults).
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Extension filter for discovery (case-insensitive).
    pub extension: String,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,
    /// How numeric day/month dates are read, for the whole run.
    pub date_order: DateOrder,
    /// Drop bad rows or fail the file.
    pub row_errors: RowErrorPolicy,
    /// Resolution for labels that collide after canonicalization.
    pub duplicate_columns: DuplicateColumnPolicy,
    /// Files processed concurrently. `1` runs sequentially on the calling thread.
    pub workers: usize,
    /// Extra cap on files in flight when `workers > 1`. Defaults to `workers`.
    pub max_in_flight: Option<usize>,
    /// Optional observer for logging/alerts.
    #[serde(skip)]
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("extension", &self.extension)
            .field("recursive", &self.recursive)
            .field("delimiter", &self.delimiter)
            .field("date_order", &self.date_order)
            .field("row_errors", &self.row_errors)
            .field("duplicate_columns", &self.duplicate_columns)
            .field("workers", &self.workers)
            .field("max_in_flight", &self.max_in_flight)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            recursive: false,
            delimiter: ',',
            date_order: DateOrder::MonthFirst,
            row_errors: RowErrorPolicy::DropRow,
            duplicate_columns: DuplicateColumnPolicy::Reject,
            workers: 1,
            max_in_flight: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl PipelineOptions {
    /// Load options from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check option consistency.
    pub fn validate(&self) -> IngestionResult<()> {
        if !self.delimiter.is_ascii() {
            return Err(IngestionError::Configuration {
                message: format!("delimiter must be a single ASCII character, got {:?}", self.delimiter),
            });
        }
        if self.workers == 0 {
            return Err(IngestionError::Configuration {
                message: "workers must be > 0".to_string(),
            });
        }
        if self.max_in_flight == Some(0) {
            return Err(IngestionError::Configuration {
                message: "max_in_flight must be > 0 when set".to_string(),
            });
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(IngestionError::Configuration {
                message: "extension must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// The merged dataset together with the per-file report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionOutput {
    pub dataset: UnifiedDataset,
    pub report: IngestionReport,
}

/// A configured ingestion pipeline, reusable across runs.
pub struct Pipeline {
    options: PipelineOptions,
    parser: RecordParser,
    normalizer: SchemaNormalizer,
    coercer: TimestampCoercer,
    engine: Option<ExecutionEngine>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("parallel", &self.engine.is_some())
            .finish()
    }
}

impl Pipeline {
    /// Validate `options` and build the per-file stages (and worker pool, if `workers > 1`).
    pub fn new(options: PipelineOptions) -> IngestionResult<Self> {
        options.validate()?;

        let engine = if options.workers > 1 {
            let engine = ExecutionEngine::new(ExecutionOptions {
                num_threads: Some(options.workers),
                max_in_flight: options.max_in_flight.unwrap_or(options.workers),
            })?;
            Some(engine.with_observer(Arc::new(TracingExecutionObserver)))
        } else {
            None
        };

        Ok(Self {
            parser: RecordParser::with_delimiter(options.delimiter as u8),
            normalizer: SchemaNormalizer::new(options.duplicate_columns),
            coercer: TimestampCoercer::new(options.date_order, options.row_errors),
            engine,
            options,
        })
    }

    /// Options the pipeline was built with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Ingest every matching file under `dir`.
    pub fn run(&self, dir: impl AsRef<Path>) -> IngestionResult<IngestionOutput> {
        self.run_with_cancellation(dir, &CancellationToken::new())
    }

    /// Like [`Self::run`], but files not yet started when `cancel` fires are recorded as
    /// skipped. Files already processed stay in the output.
    pub fn run_with_cancellation(
        &self,
        dir: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> IngestionResult<IngestionOutput> {
        let dir = dir.as_ref();
        let files = FileDiscovery::new(dir)
            .with_extension(&self.options.extension)
            .recursive(self.options.recursive)
            .discover()?;
        info!("ingesting {} file(s) from {}", files.len(), dir.display());

        let outcomes: Vec<FileOutcome> = match &self.engine {
            Some(engine) => engine
                .run_ordered(&files, cancel, |path| self.process_file(path))
                .into_iter()
                .map(|o| o.unwrap_or(FileOutcome::Skipped))
                .collect(),
            None => files
                .iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        FileOutcome::Skipped
                    } else {
                        self.process_file(path)
                    }
                })
                .collect(),
        };

        let (dataset, report) = DatasetMerger::merge(files.into_iter().zip(outcomes));

        self.notify(&report);
        info!(
            "ingested {} of {} file(s): {} row(s), {} failed, {} skipped",
            report.ingested_count(),
            report.len(),
            dataset.row_count(),
            report.failed_count(),
            report.skipped_count()
        );

        Ok(IngestionOutput { dataset, report })
    }

    /// Run parse → normalize → coerce on one file.
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        match self.process_file_inner(path) {
            Ok(batch) => FileOutcome::Parsed(batch),
            Err(error) => {
                debug!("{}: {error}", path.display());
                FileOutcome::Failed(error)
            }
        }
    }

    fn process_file_inner(&self, path: &Path) -> FileResult<CoercedBatch> {
        let raw = self.parser.parse_path(path)?;
        // A zero-byte file has no header to check; its name must still yield a building.
        if raw.headers.is_empty() {
            return Ok(CoercedBatch {
                source: path.to_path_buf(),
                building: building_from_path(path)?,
                extra_columns: Vec::new(),
                records: Vec::new(),
                warnings: vec![IngestionWarning::EmptyFile],
            });
        }

        let normalized = self.normalizer.normalize(raw)?;
        let no_rows = normalized.row_count() == 0;
        let mut batch = self.coercer.coerce(normalized)?;
        if no_rows {
            batch.warnings.push(IngestionWarning::EmptyFile);
        }
        Ok(batch)
    }

    fn notify(&self, report: &IngestionReport) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        for file in &report.files {
            let ctx = IngestionContext {
                path: file.path.clone(),
            };
            match &file.status {
                FileStatus::Ingested { rows, warnings } => {
                    for w in warnings {
                        obs.on_warning(&ctx, w);
                    }
                    obs.on_success(
                        &ctx,
                        IngestionStats {
                            rows: *rows,
                            warnings: warnings.len(),
                        },
                    );
                }
                FileStatus::Failed { error } => {
                    let sev = IngestionSeverity::for_error(error);
                    obs.on_failure(&ctx, sev, error);
                    if sev >= self.options.alert_at_or_above {
                        obs.on_alert(&ctx, sev, error);
                    }
                }
                FileStatus::Skipped => {}
            }
        }
    }
}

/// Ingest every matching file in `dir` into one [`UnifiedDataset`].
///
/// # Examples
///
/// ```no_run
/// use meter_ingest::ingestion::{ingest_directory, PipelineOptions};
///
/// # fn main() -> Result<(), meter_ingest::IngestionError> {
/// let out = ingest_directory("data", &PipelineOptions::default())?;
/// println!(
///     "rows={} files={}/{}",
///     out.dataset.row_count(),
///     out.report.ingested_count(),
///     out.report.len()
/// );
/// for (path, err) in out.report.failures() {
///     eprintln!("skipped {}: {err}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
///
/// ## Day-first dates, parallel workers
///
/// ```no_run
/// use meter_ingest::ingestion::{ingest_directory, DateOrder, PipelineOptions};
///
/// # fn main() -> Result<(), meter_ingest::IngestionError> {
/// let opts = PipelineOptions {
///     date_order: DateOrder::DayFirst,
///     workers: 4,
///     ..Default::default()
/// };
/// let out = ingest_directory("data", &opts)?;
/// # let _ = out;
/// # Ok(())
/// # }
/// ```
pub fn ingest_directory(
    dir: impl AsRef<Path>,
    options: &PipelineOptions,
) -> IngestionResult<IngestionOutput> {
    Pipeline::new(options.clone())?.run(dir)
}

/// Convenience helper for callers that want an owned request object.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    /// Directory to scan.
    pub dir: PathBuf,
    /// Options controlling ingestion.
    pub options: PipelineOptions,
}

impl IngestionRequest {
    /// Execute the request by calling [`ingest_directory`].
    pub fn run(&self) -> IngestionResult<IngestionOutput> {
        ingest_directory(&self.dir, &self.options)
    }
}

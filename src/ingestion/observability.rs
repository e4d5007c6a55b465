use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{FileError, IngestionWarning};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Non-fatal event (a dropped row, an empty file).
    Warning,
    /// The file was excluded from the dataset.
    Error,
    /// Infrastructure failure (the file could not be read at all).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a per-file error.
    pub fn for_error(e: &FileError) -> Self {
        match e {
            FileError::FileUnreadable { .. } => Self::Critical,
            _ => Self::Error,
        }
    }
}

/// The file an event refers to.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Discovered path.
    pub path: PathBuf,
}

/// Stats reported when a file is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Records kept.
    pub rows: usize,
    /// Advisories raised (dropped rows, empty file).
    pub warnings: usize,
}

/// Observer interface for per-file ingestion outcomes.
///
/// Callbacks are delivered on the calling thread, in discovery order, once all files are done.
pub trait IngestionObserver: Send + Sync {
    /// Called when a file is ingested.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called once per advisory raised against an ingested file.
    fn on_warning(&self, _ctx: &IngestionContext, _warning: &IngestionWarning) {}

    /// Called when a file fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &FileError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_warning(&self, ctx: &IngestionContext, warning: &IngestionWarning) {
        for o in &self.observers {
            o.on_warning(ctx, warning);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            path = %ctx.path.display(),
            rows = stats.rows,
            warnings = stats.warnings,
            "file ingested"
        );
    }

    fn on_warning(&self, ctx: &IngestionContext, warning: &IngestionWarning) {
        warn!(path = %ctx.path.display(), "{warning}");
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        warn!(path = %ctx.path.display(), ?severity, "file skipped: {error}");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        error!(path = %ctx.path.display(), ?severity, "ALERT file skipped: {error}");
    }
}

/// Appends one JSON object per event to a local log file.
#[derive(Debug)]
pub struct JsonLinesObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesObserver {
    /// Create an observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, event: serde_json::Value) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{event}");
        }
    }
}

impl IngestionObserver for JsonLinesObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append(json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": "ingested",
            "path": ctx.path,
            "rows": stats.rows,
            "warnings": stats.warnings,
        }));
    }

    fn on_warning(&self, ctx: &IngestionContext, warning: &IngestionWarning) {
        self.append(json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": "warning",
            "path": ctx.path,
            "warning": warning,
        }));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        self.append(json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": "failed",
            "severity": severity,
            "path": ctx.path,
            "error": error,
            "message": error.to_string(),
        }));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &FileError) {
        self.append(json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": "alert",
            "severity": severity,
            "path": ctx.path,
            "error": error,
            "message": error.to_string(),
        }));
    }
}

use std::fs;
use std::sync::{Arc, Mutex};

use meter_ingest::ingestion::{
    IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, JsonLinesObserver,
    PipelineOptions, ingest_directory,
};
use meter_ingest::{FileError, IngestionWarning};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(String, usize)>>,
    warnings: Mutex<Vec<IngestionWarning>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

fn name(ctx: &IngestionContext) -> String {
    ctx.path.file_name().unwrap().to_string_lossy().into_owned()
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push((name(ctx), stats.rows));
    }

    fn on_warning(&self, _ctx: &IngestionContext, warning: &IngestionWarning) {
        self.warnings.lock().unwrap().push(warning.clone());
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &FileError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &FileError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn malformed_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("elec_A_jan.csv"), "timestamp,kwh\n2024-01-01,1\n").unwrap();
    fs::write(tmp.path().join("elec_B_jan.csv"), b"timestamp,kwh\n2024-01-01,\xFF\xFE\n").unwrap();
    tmp
}

#[test]
fn observer_sees_successes_and_warnings_in_discovery_order() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = PipelineOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };
    ingest_directory("tests/fixtures/scenario", &opts).unwrap();

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![("elec_A_jan.csv".to_string(), 20), ("elec_B_feb.csv".to_string(), 0)]
    );
    assert_eq!(
        *obs.warnings.lock().unwrap(),
        vec![IngestionWarning::UnparseableTimestamp {
            line: 2,
            raw: "13/45/2024".to_string(),
        }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn non_critical_failure_does_not_alert_by_default() {
    let tmp = malformed_dir();
    let obs = Arc::new(RecordingObserver::default());
    let opts = PipelineOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };
    let out = ingest_directory(tmp.path(), &opts).unwrap();

    assert_eq!(out.report.failed_count(), 1);
    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lowered_threshold_alerts_on_error_severity() {
    let tmp = malformed_dir();
    let obs = Arc::new(RecordingObserver::default());
    let opts = PipelineOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };
    ingest_directory(tmp.path(), &opts).unwrap();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn json_lines_observer_appends_one_event_per_callback() {
    let tmp = malformed_dir();
    let log = tmp.path().join("events.jsonl");
    let opts = PipelineOptions {
        observer: Some(Arc::new(JsonLinesObserver::new(&log))),
        ..Default::default()
    };
    ingest_directory(tmp.path(), &opts).unwrap();

    let text = fs::read_to_string(&log).unwrap();
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "ingested");
    assert_eq!(events[0]["rows"], 1);
    assert_eq!(events[1]["event"], "failed");
    assert_eq!(events[1]["severity"], "error");
    assert_eq!(events[1]["error"]["kind"], "malformed_delimited_text");
}

#[cfg(unix)]
#[test]
fn unreadable_file_alerts_at_default_threshold() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("elec_A_jan.csv"), "timestamp,kwh\n2024-01-01,1\n").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("moved.dat"), tmp.path().join("elec_B_jan.csv"))
        .unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let opts = PipelineOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };
    let out = ingest_directory(tmp.path(), &opts).unwrap();

    assert_eq!(out.report.ingested_count(), 1);
    let (path, err) = out.report.failures().next().unwrap();
    assert!(path.ends_with("elec_B_jan.csv"));
    assert!(matches!(err, FileError::FileUnreadable { .. }));
    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
}

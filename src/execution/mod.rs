//! Bounded parallel execution of independent per-file tasks.
//!
//! Tasks run on a dedicated `rayon` pool, throttled by a semaphore, and results come back in
//! input order no matter which task finished first. A [`CancellationToken`] stops tasks that
//! have not started yet; finished results are kept.

mod observer;
mod semaphore;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver,
    TracingExecutionObserver,
};

use semaphore::InFlightLimit;

/// Shared flag used to stop a run early.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Tasks already running complete normally.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently executing tasks, on top of `num_threads`.
    pub max_in_flight: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            num_threads: None,
            max_in_flight: available_parallelism(),
        }
    }
}

/// Runs per-file work on a worker pool with ordered results.
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create a new engine.
    ///
    /// Fails if `max_in_flight == 0`, `num_threads == Some(0)`, or the pool cannot be built.
    pub fn new(opts: ExecutionOptions) -> IngestionResult<Self> {
        if opts.max_in_flight == 0 {
            return Err(IngestionError::Configuration {
                message: "max_in_flight must be > 0".to_string(),
            });
        }
        if opts.num_threads == Some(0) {
            return Err(IngestionError::Configuration {
                message: "num_threads must be > 0 when set".to_string(),
            });
        }

        let n_threads = opts.num_threads.unwrap_or_else(available_parallelism).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("meter-ingest-{i}"))
            .build()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle to live execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Apply `task` to every item, returning results in input order.
    ///
    /// Items whose task had not started when `cancel` was set yield `None`.
    pub fn run_ordered<I, T, F>(&self, items: &[I], cancel: &CancellationToken, task: F) -> Vec<Option<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Send + Sync,
    {
        self.pool.install(|| self.run_ordered_impl(items, cancel, &task))
    }

    fn run_ordered_impl<I, T, F>(&self, items: &[I], cancel: &CancellationToken, task: &F) -> Vec<Option<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync,
    {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted { tasks: items.len() });

        let limit = InFlightLimit::new(self.opts.max_in_flight);

        // Indexed collect keeps input order regardless of completion order.
        let out: Vec<Option<T>> = items
            .par_iter()
            .enumerate()
            .map(|(index, item)| {
                if cancel.is_cancelled() {
                    return self.skip(index);
                }

                let (_permit, waited) = limit.enter();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }
                if cancel.is_cancelled() {
                    return self.skip(index);
                }

                self.metrics.on_task_start();
                self.emit(ExecutionEvent::TaskStarted { index });

                let result = task(item);

                self.emit(ExecutionEvent::TaskFinished { index });
                self.metrics.on_task_end();
                Some(result)
            })
            .collect();

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        out
    }

    fn skip<T>(&self, index: usize) -> Option<T> {
        self.metrics.on_task_skipped();
        self.emit(ExecutionEvent::TaskSkipped { index });
        None
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

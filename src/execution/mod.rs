//! Parallel execution of the per-sheet pipeline.
//!
//! This module sits "above" [`crate::ingestion`] and [`crate::processing`] and provides:
//!
//! - one task per (source, sheet), run on a fixed-size `rayon` pool
//! - an in-flight read throttle on top of the pool size
//! - isolation: errors and panics become that sheet's failure entry, siblings are untouched
//! - deterministic report order, independent of completion order
//! - real-time metrics + observer hooks for monitoring

mod observer;
mod semaphore;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::EngineConfig;
use crate::error::{FailureEntry, NormalizeError, NormalizeResult, Severity};
use crate::ingestion::{ResolvedSource, SourceLocator, WorkbookReader};
use crate::processing::SheetPipeline;
use crate::report::{RunReport, SheetEntry, SheetOutcome, SourceReport};

pub use observer::{
    CompositeObserver, ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot,
    ExecutionObserver, FileExecutionObserver, TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`Engine`]'s scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently executing sheet reads. If `None`, one per worker thread.
    pub max_in_flight_reads: Option<usize>,
    /// How long [`Engine::run`] waits for outstanding tasks. Tasks still running at the deadline
    /// are reported as timed out; they are not stopped.
    pub timeout: Option<Duration>,
    /// Failures at or above this severity also trigger [`ExecutionObserver::on_alert`].
    pub alert_at_or_above: Severity,
}

impl ExecutionOptions {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            num_threads: cfg.workers,
            max_in_flight_reads: cfg.max_in_flight_reads,
            timeout: cfg.run_timeout_secs.map(Duration::from_secs),
            alert_at_or_above: cfg.alert_severity,
        }
    }

    fn threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1)
    }

    fn read_limit(&self) -> usize {
        self.max_in_flight_reads.unwrap_or_else(|| self.threads()).max(1)
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Runs the whole pipeline over every configured source.
///
/// ```no_run
/// use workbook_normalizer::config::EngineConfig;
/// use workbook_normalizer::execution::Engine;
///
/// # fn main() -> Result<(), workbook_normalizer::NormalizeError> {
/// let engine = Engine::new(EngineConfig::from_json_path("normalizer.json")?)?;
/// let report = engine.run()?;
/// println!("{}", report.to_json_pretty()?);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    cfg: Arc<EngineConfig>,
    reader: Arc<WorkbookReader>,
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl Engine {
    /// Validate `cfg` and build the worker pool it describes.
    pub fn new(cfg: EngineConfig) -> NormalizeResult<Self> {
        let opts = ExecutionOptions::from_config(&cfg);
        Self::with_options(cfg, opts)
    }

    /// Like [`Self::new`], with scheduling options overriding the ones in `cfg`.
    pub fn with_options(cfg: EngineConfig, opts: ExecutionOptions) -> NormalizeResult<Self> {
        cfg.validate()?;
        if opts.num_threads == Some(0) {
            return Err(NormalizeError::InvalidConfig {
                message: "num_threads must be > 0 when set".to_string(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.threads())
            .thread_name(|i| format!("normalizer-{i}"))
            .panic_handler(|payload| {
                tracing::error!(panic = %panic_message(payload.as_ref()), "worker task panicked");
            })
            .build()?;

        Ok(Self {
            cfg: Arc::new(cfg),
            reader: Arc::new(WorkbookReader::default()),
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Replace the default read strategies.
    pub fn with_reader(mut self, reader: WorkbookReader) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Locate the configured sources and process them.
    pub fn run(&self) -> NormalizeResult<RunReport> {
        let resolved = SourceLocator::from_config(&self.cfg).resolve(&self.cfg.sources);
        self.run_sources(resolved)
    }

    /// Process already-located sources.
    ///
    /// Fails only when none of `sources` has a path; every other failure is recorded in the
    /// report.
    pub fn run_sources(&self, sources: Vec<ResolvedSource>) -> NormalizeResult<RunReport> {
        let attempted = sources.len();
        if !sources.iter().any(|s| s.path.is_ok()) {
            tracing::error!(attempted, "no sources resolved");
            return Err(NormalizeError::NoSourcesResolved { attempted });
        }

        let start = Instant::now();
        self.metrics.begin_run();
        let notifier = Notifier {
            observer: self.observer.clone(),
            alert_at: self.opts.alert_at_or_above,
        };

        let plans = self.plan(sources, &notifier);
        let tasks: Vec<SheetTask> = plans
            .iter()
            .filter_map(|plan| match plan {
                SourcePlan::Ready {
                    source,
                    path,
                    sheets,
                    ..
                } => Some((source, path, sheets)),
                SourcePlan::Failed(_) => None,
            })
            .flat_map(|(source, path, sheets)| {
                sheets.iter().map(move |sheet| (source.clone(), Arc::clone(path), sheet.clone()))
            })
            .enumerate()
            .map(|(slot, (source, path, sheet))| SheetTask {
                slot,
                source,
                path,
                sheet,
            })
            .collect();

        notifier.emit(&ExecutionEvent::RunStarted {
            sources: plans.len(),
            sheets: tasks.len(),
        });

        let worker = Worker {
            cfg: Arc::clone(&self.cfg),
            reader: Arc::clone(&self.reader),
            metrics: Arc::clone(&self.metrics),
            sem: Arc::new(Semaphore::new(self.opts.read_limit())),
            notifier: notifier.clone(),
        };
        let (tx, rx) = mpsc::channel();
        for task in &tasks {
            let task = task.clone();
            let worker = worker.clone();
            let tx = tx.clone();
            self.pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker.run(&task)))
                    .unwrap_or_else(|payload| escaped_panic(&task, payload.as_ref()));
                // The receiver is gone only after a timeout; the late result is dropped.
                let _ = tx.send((task.slot, outcome));
            });
        }
        drop(tx);

        let (slots, timed_out) = self.collect(rx, tasks.len());
        let mut slots = slots.into_iter();
        let reports = plans
            .into_iter()
            .map(|plan| match plan {
                SourcePlan::Failed(report) => report,
                SourcePlan::Ready {
                    source,
                    path,
                    skipped,
                    sheets,
                } => {
                    let entries = sheets
                        .into_iter()
                        .map(|sheet| {
                            let outcome = match slots.next().flatten() {
                                Some(outcome) => outcome,
                                None => unreported(&source, &sheet, timed_out, &notifier),
                            };
                            SheetEntry { sheet, outcome }
                        })
                        .collect();
                    SourceReport::new(source, Some(PathBuf::clone(&path)), skipped, entries)
                }
            })
            .collect();

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        notifier.emit(&ExecutionEvent::RunFinished {
            elapsed,
            metrics: self.metrics.snapshot(),
        });
        Ok(RunReport::new(reports))
    }

    /// Enumerate and filter the sheets of every resolved source, before any fan-out.
    fn plan(&self, sources: Vec<ResolvedSource>, notifier: &Notifier) -> Vec<SourcePlan> {
        sources
            .into_iter()
            .map(|ResolvedSource { name, path }| {
                let path = match path {
                    Ok(path) => path,
                    Err(err) => return source_failed(name, None, &err, notifier),
                };
                match self.reader.sheet_names(&path) {
                    Err(err) => source_failed(name, Some(path), &err, notifier),
                    Ok(all) => {
                        let (skipped, sheets): (Vec<String>, Vec<String>) =
                            all.into_iter().partition(|s| self.cfg.is_skipped_sheet(s));
                        if !skipped.is_empty() {
                            tracing::info!(source = %name, ?skipped, "sheets skipped");
                        }
                        SourcePlan::Ready {
                            source: name,
                            path: Arc::new(path),
                            skipped,
                            sheets,
                        }
                    }
                }
            })
            .collect()
    }

    /// Single writer of the result slots. Stops at the deadline, if any.
    fn collect(
        &self,
        rx: Receiver<(usize, SheetOutcome)>,
        total: usize,
    ) -> (Vec<Option<SheetOutcome>>, bool) {
        let mut slots: Vec<Option<SheetOutcome>> = (0..total).map(|_| None).collect();
        let deadline = self.opts.timeout.map(|t| Instant::now() + t);
        let mut pending = total;
        let mut timed_out = false;

        while pending > 0 {
            let received = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(left) {
                        Ok(msg) => msg,
                        Err(RecvTimeoutError::Timeout) => {
                            timed_out = true;
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            let (slot, outcome) = received;
            if slots[slot].is_none() {
                pending -= 1;
            }
            slots[slot] = Some(outcome);
        }
        if timed_out {
            tracing::warn!(pending, "run timeout elapsed with tasks outstanding");
        }
        (slots, timed_out)
    }
}

enum SourcePlan {
    Failed(SourceReport),
    Ready {
        source: String,
        path: Arc<PathBuf>,
        skipped: Vec<String>,
        sheets: Vec<String>,
    },
}

#[derive(Debug, Clone)]
struct SheetTask {
    slot: usize,
    source: String,
    path: Arc<PathBuf>,
    sheet: String,
}

#[derive(Clone)]
struct Notifier {
    observer: Option<Arc<dyn ExecutionObserver>>,
    alert_at: Severity,
}

impl Notifier {
    /// A panicking observer is logged and otherwise ignored; the event stream and the run go on.
    fn emit(&self, event: &ExecutionEvent) {
        let Some(obs) = &self.observer else {
            return;
        };
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
            obs.on_event(event);
            if event.severity().is_some_and(|s| s >= self.alert_at) {
                obs.on_alert(event);
            }
        }));
        if let Err(payload) = delivered {
            tracing::error!(
                event = %event,
                panic = %panic_message(payload.as_ref()),
                "execution observer panicked"
            );
        }
    }
}

/// Everything a task needs, shared by all tasks of a run.
#[derive(Clone)]
struct Worker {
    cfg: Arc<EngineConfig>,
    reader: Arc<WorkbookReader>,
    metrics: Arc<ExecutionMetrics>,
    sem: Arc<Semaphore>,
    notifier: Notifier,
}

impl Worker {
    fn run(&self, task: &SheetTask) -> SheetOutcome {
        let (permit, waited) = self.sem.acquire();
        if waited > Duration::ZERO {
            self.metrics.on_throttle_wait(waited);
            self.notifier.emit(&ExecutionEvent::ThrottleWaited { duration: waited });
        }

        self.metrics.on_sheet_start();
        self.notifier.emit(&ExecutionEvent::SheetStarted {
            source: task.source.clone(),
            sheet: task.sheet.clone(),
        });

        let span = tracing::info_span!("sheet", source = %task.source, sheet = %task.sheet);
        let result = span.in_scope(|| {
            panic::catch_unwind(AssertUnwindSafe(|| {
                SheetPipeline::new(&self.cfg, &self.reader).run(&task.path, &task.sheet)
            }))
        });
        let result = result.unwrap_or_else(|payload| {
            Err(NormalizeError::TaskPanicked {
                sheet: task.sheet.clone(),
                message: panic_message(payload.as_ref()),
            })
        });

        // The permit is held until the end events are out, so observers never see more
        // sheets in flight than the limit.
        let outcome = match result {
            Ok(report) => {
                self.metrics.on_sheet_end(Some(report.record_count));
                self.notifier.emit(&ExecutionEvent::SheetFinished {
                    source: task.source.clone(),
                    sheet: task.sheet.clone(),
                    records: report.record_count,
                    warnings: report.warnings.len(),
                });
                SheetOutcome::Normalized(report)
            }
            Err(err) => {
                self.metrics.on_sheet_end(None);
                let entry = FailureEntry::from(&err);
                self.notifier.emit(&ExecutionEvent::SheetFailed {
                    source: task.source.clone(),
                    sheet: task.sheet.clone(),
                    severity: entry.severity,
                    message: entry.message.clone(),
                });
                SheetOutcome::Failed(entry)
            }
        };
        drop(permit);
        outcome
    }
}

fn source_failed(
    name: String,
    path: Option<PathBuf>,
    err: &NormalizeError,
    notifier: &Notifier,
) -> SourcePlan {
    let entry = FailureEntry::from(err);
    notifier.emit(&ExecutionEvent::SourceFailed {
        source: name.clone(),
        severity: entry.severity,
        message: entry.message.clone(),
    });
    SourcePlan::Failed(SourceReport::failed(name, path, entry))
}

/// Outcome of a task whose bookkeeping outside the sheet pipeline panicked.
fn escaped_panic(task: &SheetTask, payload: &(dyn Any + Send)) -> SheetOutcome {
    let message = panic_message(payload);
    tracing::error!(
        source = %task.source,
        sheet = %task.sheet,
        panic = %message,
        "sheet task panicked"
    );
    SheetOutcome::Failed(FailureEntry::from(&NormalizeError::TaskPanicked {
        sheet: task.sheet.clone(),
        message,
    }))
}

/// Outcome of a task that never reported back.
fn unreported(source: &str, sheet: &str, timed_out: bool, notifier: &Notifier) -> SheetOutcome {
    let err = if timed_out {
        NormalizeError::TimedOut {
            sheet: sheet.to_string(),
        }
    } else {
        NormalizeError::TaskPanicked {
            sheet: sheet.to_string(),
            message: "worker exited without reporting a result".to_string(),
        }
    };
    let entry = FailureEntry::from(&err);
    notifier.emit(&ExecutionEvent::SheetFailed {
        source: source.to_string(),
        sheet: sheet.to_string(),
        severity: entry.severity,
        message: entry.message.clone(),
    });
    SheetOutcome::Failed(entry)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Severity;

/// Events emitted by the engine while a run progresses.
///
/// Sheet events come from worker threads, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    RunStarted {
        sources: usize,
        sheets: usize,
    },
    SourceFailed {
        source: String,
        severity: Severity,
        message: String,
    },
    ThrottleWaited {
        duration: Duration,
    },
    SheetStarted {
        source: String,
        sheet: String,
    },
    SheetFinished {
        source: String,
        sheet: String,
        records: usize,
        warnings: usize,
    },
    SheetFailed {
        source: String,
        sheet: String,
        severity: Severity,
        message: String,
    },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

impl ExecutionEvent {
    /// Severity of failure events; `None` for progress events.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            ExecutionEvent::SourceFailed { severity, .. }
            | ExecutionEvent::SheetFailed { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::RunStarted { sources, sheets } => {
                write!(f, "run started sources={sources} sheets={sheets}")
            }
            ExecutionEvent::SourceFailed {
                source,
                severity,
                message,
            } => write!(f, "source failed source={source} severity={severity:?} err={message}"),
            ExecutionEvent::ThrottleWaited { duration } => {
                write!(f, "throttle waited {duration:?}")
            }
            ExecutionEvent::SheetStarted { source, sheet } => {
                write!(f, "sheet started source={source} sheet={sheet}")
            }
            ExecutionEvent::SheetFinished {
                source,
                sheet,
                records,
                warnings,
            } => write!(
                f,
                "sheet ok source={source} sheet={sheet} records={records} warnings={warnings}"
            ),
            ExecutionEvent::SheetFailed {
                source,
                sheet,
                severity,
                message,
            } => write!(
                f,
                "sheet failed source={source} sheet={sheet} severity={severity:?} err={message}"
            ),
            ExecutionEvent::RunFinished { elapsed, metrics } => {
                write!(f, "run finished elapsed={elapsed:?} {metrics}")
            }
        }
    }
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);

    /// Called, in addition to [`Self::on_event`], for failures at or above the alert threshold.
    ///
    /// Default behavior does nothing.
    fn on_alert(&self, _event: &ExecutionEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingExecutionObserver;

impl ExecutionObserver for TracingExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::SourceFailed { .. } | ExecutionEvent::SheetFailed { .. } => {
                tracing::warn!(target: "workbook_normalizer::execution", "{event}")
            }
            ExecutionEvent::RunStarted { .. } | ExecutionEvent::RunFinished { .. } => {
                tracing::info!(target: "workbook_normalizer::execution", "{event}")
            }
            _ => tracing::debug!(target: "workbook_normalizer::execution", "{event}"),
        }
    }

    fn on_alert(&self, event: &ExecutionEvent) {
        tracing::error!(target: "workbook_normalizer::execution", "ALERT {event}");
    }
}

/// Appends one line per event to a local log file.
///
/// Safe to share between workers: appends are serialized by a mutex. Writes are best-effort;
/// failures to open or write the file are ignored.
#[derive(Debug)]
pub struct FileExecutionObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileExecutionObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ExecutionObserver for FileExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        self.append_line(&format!("{} {event}", unix_ts()));
    }

    fn on_alert(&self, event: &ExecutionEvent) {
        self.append_line(&format!("{} ALERT {event}", unix_ts()));
    }
}

/// Fans events out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ExecutionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ExecutionObserver>>) -> Self {
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

impl ExecutionObserver for CompositeObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }

    fn on_alert(&self, event: &ExecutionEvent) {
        for o in &self.observers {
            o.on_alert(event);
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Live counters for a run.
///
/// The engine updates these while tasks execute; callers can snapshot them at any time, also
/// from another thread.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    sheets_started: AtomicU64,
    sheets_finished: AtomicU64,
    sheets_failed: AtomicU64,
    records_normalized: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_reads: AtomicUsize,
    max_active_reads: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            sheets_started: AtomicU64::new(0),
            sheets_finished: AtomicU64::new(0),
            sheets_failed: AtomicU64::new(0),
            records_normalized: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_reads: AtomicUsize::new(0),
            max_active_reads: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.sheets_started.store(0, Ordering::SeqCst);
        self.sheets_finished.store(0, Ordering::SeqCst);
        self.sheets_failed.store(0, Ordering::SeqCst);
        self.records_normalized.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_reads.store(0, Ordering::SeqCst);
        self.max_active_reads.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_ns(elapsed), Ordering::SeqCst);
    }

    pub fn on_sheet_start(&self) {
        self.sheets_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_reads.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_reads.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_sheet_end(&self, records: Option<usize>) {
        match records {
            Some(n) => {
                self.sheets_finished.fetch_add(1, Ordering::SeqCst);
                self.records_normalized.fetch_add(n as u64, Ordering::SeqCst);
            }
            None => {
                self.sheets_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.active_reads.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns.fetch_add(saturating_ns(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            sheets_started: self.sheets_started.load(Ordering::SeqCst),
            sheets_finished: self.sheets_finished.load(Ordering::SeqCst),
            sheets_failed: self.sheets_failed.load(Ordering::SeqCst),
            records_normalized: self.records_normalized.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_reads: self.max_active_reads.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExecutionMetrics").field(&self.snapshot()).finish()
    }
}

fn saturating_ns(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub sheets_started: u64,
    pub sheets_finished: u64,
    pub sheets_failed: u64,
    pub records_normalized: u64,
    pub throttle_wait: Duration,
    pub max_active_reads: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, sheets={}/{} failed={}, records={}, max_active_reads={}, \
             throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.sheets_finished,
            self.sheets_started,
            self.sheets_failed,
            self.records_normalized,
            self.max_active_reads,
            self.throttle_wait,
            self.elapsed
        )
    }
}

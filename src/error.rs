use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CanonicalField;

/// Convenience result type used across the crate.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Error type returned by locating, reading and normalizing workbooks.
///
/// Most variants describe the failure of a single unit (a source or a sheet). The orchestrator
/// catches them at the unit boundary and records them in the report; only
/// [`NormalizeError::NoSourcesResolved`] fails a whole run.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook error from the auto-detecting reader.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Error from the streaming `.xlsx` reader.
    #[error("xlsx error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    /// Error from the legacy `.xls` reader.
    #[error("xls error: {0}")]
    Xls(#[from] calamine::XlsError),

    /// Delimited-text read error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but holds values the engine cannot run with.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The expected file of a logical source is absent from every search directory.
    #[error("source '{name}' not found: '{file_name}' is absent from {searched:?}")]
    SourceNotFound {
        name: String,
        file_name: String,
        searched: Vec<PathBuf>,
    },

    /// The sheet list of a workbook could not be read.
    #[error("cannot enumerate sheets of {}: {message}", path.display())]
    SheetEnumeration { path: PathBuf, message: String },

    /// A read strategy does not handle this kind of file.
    #[error("unsupported file type for this strategy: {}", path.display())]
    UnsupportedFile { path: PathBuf },

    /// The workbook has no sheet with this name.
    #[error("sheet '{sheet}' not present in workbook")]
    SheetMissing { sheet: String },

    /// A strategy read the sheet but found no non-empty cell.
    #[error("sheet '{sheet}' is empty")]
    EmptyGrid { sheet: String },

    /// Every read strategy failed or returned an empty grid.
    #[error("sheet '{sheet}' unreadable: {} strategies failed", attempts.len())]
    UnreadableSheet {
        sheet: String,
        attempts: Vec<StrategyFailure>,
    },

    /// No row within the scan depth holds enough known column labels.
    #[error("no header row found in the first {scanned_rows} rows of sheet '{sheet}'")]
    HeaderNotFound { sheet: String, scanned_rows: usize },

    /// A sheet task panicked; sibling tasks are unaffected.
    #[error("task for sheet '{sheet}' panicked: {message}")]
    TaskPanicked { sheet: String, message: String },

    /// The run-level timeout elapsed before the task reported back.
    #[error("task for sheet '{sheet}' did not finish within the run timeout")]
    TimedOut { sheet: String },

    /// Not a single configured source could be resolved.
    #[error("no sources resolved ({attempted} attempted)")]
    NoSourcesResolved { attempted: usize },
}

impl NormalizeError {
    /// Short, stable classification used in reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            NormalizeError::SourceNotFound { .. } => FailureKind::SourceNotFound,
            NormalizeError::SheetEnumeration { .. } => FailureKind::SheetEnumeration,
            NormalizeError::UnreadableSheet { .. }
            | NormalizeError::SheetMissing { .. }
            | NormalizeError::EmptyGrid { .. }
            | NormalizeError::UnsupportedFile { .. } => FailureKind::UnreadableSheet,
            NormalizeError::HeaderNotFound { .. } => FailureKind::HeaderNotFound,
            NormalizeError::TaskPanicked { .. } => FailureKind::TaskPanicked,
            NormalizeError::TimedOut { .. } => FailureKind::TimedOut,
            NormalizeError::InvalidConfig { .. } | NormalizeError::ConfigParse(_) => {
                FailureKind::InvalidConfig
            }
            NormalizeError::NoSourcesResolved { .. } => FailureKind::NoSourcesResolved,
            NormalizeError::Io(_)
            | NormalizeError::Excel(_)
            | NormalizeError::Xlsx(_)
            | NormalizeError::Xls(_)
            | NormalizeError::Csv(_)
            | NormalizeError::ThreadPool(_) => FailureKind::Io,
        }
    }

    /// Severity used for observer callbacks and report entries.
    pub fn severity(&self) -> Severity {
        match self {
            NormalizeError::Io(_) | NormalizeError::ThreadPool(_) => Severity::Critical,
            NormalizeError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Severity::Critical,
                _ => Severity::Error,
            },
            NormalizeError::NoSourcesResolved { .. } => Severity::Critical,
            NormalizeError::TaskPanicked { .. } => Severity::Critical,
            _ => Severity::Error,
        }
    }
}

/// Severity classification for failures and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Non-fatal finding.
    Warning,
    /// The unit failed.
    Error,
    /// Infrastructure failure (I/O, panics, thread pool).
    Critical,
}

/// Report-facing classification of a unit failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    SourceNotFound,
    SheetEnumeration,
    UnreadableSheet,
    HeaderNotFound,
    TaskPanicked,
    TimedOut,
    InvalidConfig,
    NoSourcesResolved,
    Io,
}

/// The recorded outcome of a single failed read strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    /// Strategy name (e.g. `workbook`, `xlsx-cells`).
    pub strategy: String,
    /// Rendered error.
    pub message: String,
}

impl StrategyFailure {
    pub fn new(strategy: impl Into<String>, error: &NormalizeError) -> Self {
        Self {
            strategy: strategy.into(),
            message: error.to_string(),
        }
    }
}

/// A failure attached to a source or sheet entry of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub kind: FailureKind,
    pub severity: Severity,
    pub message: String,
    /// Per-strategy messages when the failure came from the reader.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<StrategyFailure>,
}

impl From<&NormalizeError> for FailureEntry {
    fn from(err: &NormalizeError) -> Self {
        let diagnostics = match err {
            NormalizeError::UnreadableSheet { attempts, .. } => attempts.clone(),
            _ => Vec::new(),
        };
        Self {
            kind: err.kind(),
            severity: err.severity(),
            message: err.to_string(),
            diagnostics,
        }
    }
}

/// Non-fatal findings recorded on a sheet while it is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetWarning {
    /// No column matched any alias of this field; its values are absent.
    #[error("no column resolved for field {field}")]
    UnresolvedField { field: CanonicalField },

    /// A status value is not in the taxonomy and was tagged out-of-taxonomy.
    #[error("row {row}: status '{raw}' is not in the taxonomy")]
    OutOfTaxonomyValue { row: usize, raw: String },

    /// A non-empty date cell could not be coerced; the value is "no date".
    #[error("row {row}: cannot parse {field} from '{raw}'")]
    DateParseFailure {
        row: usize,
        field: CanonicalField,
        raw: String,
    },
}

//! `workbook-normalizer` turns a set of inconsistently laid-out spreadsheets into one normalized,
//! comparable dataset with per-sheet and per-group metrics.
//!
//! The entrypoint is [`execution::Engine`]: it locates the configured sources, enumerates their
//! sheets and normalizes every sheet in parallel. A failing sheet never stops its siblings; it is
//! recorded in the [`report::RunReport`] next to the sheets that succeeded.
//!
//! ## What a sheet goes through
//!
//! 1. **Read** ([`ingestion::WorkbookReader`]): ordered read strategies, first non-empty grid wins:
//!    - `workbook`: `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.xla`, `.ods` via auto-detection
//!    - `xlsx-cells`: cell-by-cell streaming `.xlsx` reader
//!    - `xls-legacy`: legacy binary `.xls` reader
//!    - `delimited`: `.csv`, `.tsv`, `.txt` (one sheet, named after the file stem)
//! 2. **Header detection** ([`ingestion::HeaderDetector`]): the first row within the scan depth
//!    holding enough known column labels.
//! 3. **Column resolution** ([`processing::resolve_columns`]): raw labels to
//!    [`types::CanonicalField`]s through the configured alias sets.
//! 4. **Value normalization** ([`processing::ValueNormalizer`]): dates (typed cells, serial
//!    numbers, text), statuses (folded against the taxonomy, `OUT_OF_TAXONOMY` otherwise), text.
//! 5. **Metrics** ([`processing::SheetMetrics`]): counts per status, rates, resolution times;
//!    aggregated per source and across all sources.
//!
//! ## Quick example
//!
//! ```no_run
//! use workbook_normalizer::config::{EngineConfig, SourceSpec};
//! use workbook_normalizer::Engine;
//!
//! # fn main() -> Result<(), workbook_normalizer::NormalizeError> {
//! workbook_normalizer::logging::init();
//!
//! let mut cfg = EngineConfig::default();
//! cfg.search_paths = vec!["data".into()];
//! cfg.sources = vec![SourceSpec::new("north", "north team.xlsx")];
//!
//! let report = Engine::new(cfg)?.run()?;
//! for source in &report.sources {
//!     println!("{}: {:.1}% resolved", source.source, source.metrics.resolution_rate * 100.0);
//! }
//! report.write_json("report.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: engine configuration (aliases, status taxonomy, sources, limits)
//! - [`ingestion`]: source location, read strategies, header detection
//! - [`processing`]: column resolution, value coercion, metrics
//! - [`execution`]: the parallel orchestrator and its observers
//! - [`report`]: the serializable run report
//! - [`types`]: canonical fields, statuses, grids and records
//! - [`error`]: error, failure and warning types
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod logging;
pub mod processing;
pub mod report;
pub mod types;

pub use config::EngineConfig;
pub use error::{NormalizeError, NormalizeResult};
pub use execution::Engine;
pub use report::RunReport;

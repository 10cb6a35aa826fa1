//! From raw grids to normalized records and metrics.
//!
//! - [`columns`]: raw labels -> canonical fields
//! - [`values`]: date, status and text coercion
//! - [`metrics`]: per-sheet and per-group metrics, ranking
//! - [`pipeline`]: the stages chained for one sheet
//! - [`text`]: diacritic and case folding shared by the above
//!
//! ## Example
//!
//! ```rust
//! use workbook_normalizer::config::EngineConfig;
//! use workbook_normalizer::processing::metrics::{MetricsPolicy, SheetMetrics};
//! use workbook_normalizer::processing::normalize_grid;
//! use workbook_normalizer::types::{CellValue, RawGrid};
//!
//! let t = |s: &str| CellValue::Text(s.to_string());
//! let grid = RawGrid::new(vec![
//!     vec![t("Data"), t("Situação")],
//!     vec![CellValue::Number(45000.0), t("Concluído")],
//!     vec![t("15/03/2023"), t("pendente")],
//! ]);
//!
//! let cfg = EngineConfig::default();
//! let sheet = normalize_grid("Ana", &grid, &cfg).unwrap();
//! let metrics = SheetMetrics::compute(&sheet.records, &MetricsPolicy::from_config(&cfg));
//! assert_eq!(metrics.total_records, 2);
//! assert_eq!(metrics.pendency_rate, 0.5);
//! ```

pub mod columns;
pub mod metrics;
pub mod pipeline;
pub mod text;
pub mod values;

pub use columns::{resolve_columns, ColumnResolution};
pub use metrics::{
    efficiency_score, rank_sheets, Efficiency, GroupMetrics, MetricsPolicy, RankedSheet,
    SheetMetrics,
};
pub use pipeline::{normalize_grid, SheetPipeline};
pub use values::ValueNormalizer;

//! The per-sheet pipeline: read, detect header, resolve columns, normalize, measure.

use std::path::Path;

use crate::config::EngineConfig;
use crate::error::NormalizeResult;
use crate::ingestion::{HeaderDetector, SheetGrid, WorkbookReader};
use crate::processing::columns::{resolve_columns, ColumnResolution};
use crate::processing::metrics::{MetricsPolicy, SheetMetrics};
use crate::processing::values::ValueNormalizer;
use crate::report::SheetReport;
use crate::types::{CellValue, RawGrid, SheetResult};

/// Normalize an already-read grid.
///
/// Rows above the header are dropped. Fully blank rows below it are not records; every other
/// row becomes exactly one record.
pub fn normalize_grid(
    sheet: &str,
    grid: &RawGrid,
    cfg: &EngineConfig,
) -> NormalizeResult<SheetResult> {
    let header_idx = HeaderDetector::from_config(cfg).detect(sheet, grid)?;
    let ColumnResolution {
        bindings,
        mut warnings,
    } = resolve_columns(&grid.rows[header_idx], &cfg.aliases);

    let unresolved = warnings.len();
    if unresolved > 0 {
        tracing::debug!(sheet, unresolved, "fields without a matching column");
    }

    let normalizer = ValueNormalizer::from_config(cfg);
    let records = grid
        .rows
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .filter(|(_, row)| !row.iter().all(CellValue::is_blank))
        .map(|(idx, row)| {
            normalizer.normalize_row(row, grid.user_row(idx), &bindings, &mut warnings)
        })
        .collect();

    Ok(SheetResult {
        sheet: sheet.to_string(),
        header_row: grid.user_row(header_idx),
        bindings,
        records,
        warnings,
        diagnostics: Vec::new(),
    })
}

/// Runs every per-sheet stage against one shared configuration and reader.
pub struct SheetPipeline<'a> {
    cfg: &'a EngineConfig,
    reader: &'a WorkbookReader,
    policy: MetricsPolicy,
}

impl<'a> SheetPipeline<'a> {
    pub fn new(cfg: &'a EngineConfig, reader: &'a WorkbookReader) -> Self {
        Self {
            cfg,
            reader,
            policy: MetricsPolicy::from_config(cfg),
        }
    }

    /// Read `sheet` of `path` and produce its report entry.
    pub fn run(&self, path: &Path, sheet: &str) -> NormalizeResult<SheetReport> {
        let SheetGrid {
            grid,
            strategy,
            diagnostics,
        } = self.reader.read_sheet(path, sheet)?;
        let mut result = normalize_grid(sheet, &grid, self.cfg)?;
        result.diagnostics = diagnostics;
        Ok(self.report(result, strategy))
    }

    /// Measure a normalized sheet and wrap it for the report.
    pub fn report(&self, result: SheetResult, strategy: &str) -> SheetReport {
        let metrics = SheetMetrics::compute(&result.records, &self.policy);
        SheetReport::new(result, strategy, metrics, self.cfg.keep_records)
    }
}

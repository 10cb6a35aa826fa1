//! The run report: every attempted source and sheet, with a result or a failure.
//!
//! This is the only output of the engine. It is `Serialize` and renders to JSON with
//! [`RunReport::to_json_pretty`]; presentation (HTML, spreadsheets, charts) belongs to consumers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{FailureEntry, NormalizeResult, SheetWarning, StrategyFailure};
use crate::processing::metrics::{rank_sheets, GroupMetrics, RankedSheet, SheetMetrics};
use crate::types::{CanonicalField, FieldBinding, NormalizedRecord, SheetResult};

/// A successfully normalized sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    /// 1-based spreadsheet row of the header.
    pub header_row: usize,
    /// Read strategy that produced the grid.
    pub read_strategy: String,
    pub bindings: BTreeMap<CanonicalField, FieldBinding>,
    pub record_count: usize,
    pub metrics: SheetMetrics,
    pub warnings: Vec<SheetWarning>,
    /// Read strategies that failed before `read_strategy` succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<StrategyFailure>,
    /// Present only when records are kept.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<NormalizedRecord>,
}

impl SheetReport {
    pub fn new(
        result: SheetResult,
        strategy: &str,
        metrics: SheetMetrics,
        keep_records: bool,
    ) -> Self {
        Self {
            header_row: result.header_row,
            read_strategy: strategy.to_string(),
            record_count: result.records.len(),
            bindings: result.bindings,
            metrics,
            warnings: result.warnings,
            diagnostics: result.diagnostics,
            records: if keep_records { result.records } else { Vec::new() },
        }
    }
}

/// Outcome of one sheet task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SheetOutcome {
    Normalized(SheetReport),
    Failed(FailureEntry),
}

/// One sheet of a source, in workbook order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetEntry {
    pub sheet: String,
    #[serde(flatten)]
    pub outcome: SheetOutcome,
}

impl SheetEntry {
    pub fn report(&self) -> Option<&SheetReport> {
        match &self.outcome {
            SheetOutcome::Normalized(r) => Some(r),
            SheetOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureEntry> {
        match &self.outcome {
            SheetOutcome::Normalized(_) => None,
            SheetOutcome::Failed(f) => Some(f),
        }
    }
}

/// Everything known about one logical source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    /// Resolved file, when found.
    pub path: Option<PathBuf>,
    /// Source-level failure (file not found, sheets not enumerable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureEntry>,
    /// Sheets excluded by the skip list.
    pub skipped_sheets: Vec<String>,
    pub sheets: Vec<SheetEntry>,
    /// Group metrics over the successfully normalized sheets.
    pub metrics: GroupMetrics,
}

impl SourceReport {
    pub fn new(
        source: String,
        path: Option<PathBuf>,
        skipped_sheets: Vec<String>,
        sheets: Vec<SheetEntry>,
    ) -> Self {
        let metrics =
            GroupMetrics::from_sheets(sheets.iter().filter_map(|e| e.report()).map(|r| &r.metrics));
        Self {
            source,
            path,
            error: None,
            skipped_sheets,
            sheets,
            metrics,
        }
    }

    /// A source that produced no sheets at all.
    pub fn failed(source: String, path: Option<PathBuf>, error: FailureEntry) -> Self {
        let mut report = Self::new(source, path, Vec::new(), Vec::new());
        report.error = Some(error);
        report
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetEntry> {
        self.sheets.iter().find(|e| e.sheet == name)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &SheetReport)> {
        self.sheets
            .iter()
            .filter_map(|e| e.report().map(|r| (e.sheet.as_str(), r)))
    }

    pub fn failed_sheets(&self) -> impl Iterator<Item = (&str, &FailureEntry)> {
        self.sheets
            .iter()
            .filter_map(|e| e.failure().map(|f| (e.sheet.as_str(), f)))
    }
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Sources in configuration (or discovery) order.
    pub sources: Vec<SourceReport>,
    /// Group metrics over every normalized sheet of every source.
    pub consolidated: GroupMetrics,
    /// Normalized sheets, best resolution rate first.
    pub ranking: Vec<RankedSheet>,
}

impl RunReport {
    pub fn new(sources: Vec<SourceReport>) -> Self {
        let consolidated = GroupMetrics::from_sheets(
            sources
                .iter()
                .flat_map(|s| s.succeeded())
                .map(|(_, r)| &r.metrics),
        );
        let ranking = rank_sheets(
            sources
                .iter()
                .flat_map(|s| {
                    s.succeeded()
                        .map(|(sheet, r)| RankedSheet::new(s.source.clone(), sheet, &r.metrics))
                })
                .collect(),
        );
        Self {
            sources,
            consolidated,
            ranking,
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == name)
    }

    /// Number of sheets normalized and number failed, across all sources.
    pub fn sheet_totals(&self) -> (usize, usize) {
        self.sources.iter().fold((0, 0), |(ok, failed), s| {
            (ok + s.succeeded().count(), failed + s.failed_sheets().count())
        })
    }

    pub fn to_json_pretty(&self) -> NormalizeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> NormalizeResult<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, NormalizeError};
    use crate::processing::metrics::MetricsPolicy;
    use crate::types::{CanonicalStatus, FieldValue, StatusValue};

    fn normalized(sheet: &str, statuses: &[CanonicalStatus]) -> SheetEntry {
        let records: Vec<NormalizedRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r = NormalizedRecord::new(i + 2);
                r.set(CanonicalField::Status, FieldValue::Status(StatusValue::Canonical(*s)));
                r
            })
            .collect();
        let metrics = SheetMetrics::compute(&records, &MetricsPolicy::default());
        let result = SheetResult {
            sheet: sheet.to_string(),
            header_row: 1,
            bindings: BTreeMap::new(),
            records,
            warnings: Vec::new(),
            diagnostics: Vec::new(),
        };
        SheetEntry {
            sheet: sheet.to_string(),
            outcome: SheetOutcome::Normalized(SheetReport::new(result, "workbook", metrics, false)),
        }
    }

    fn failed(sheet: &str) -> SheetEntry {
        let err = NormalizeError::HeaderNotFound {
            sheet: sheet.to_string(),
            scanned_rows: 10,
        };
        SheetEntry {
            sheet: sheet.to_string(),
            outcome: SheetOutcome::Failed(FailureEntry::from(&err)),
        }
    }

    #[test]
    fn consolidated_and_ranking_cover_all_sources() {
        let a = SourceReport::new(
            "a".into(),
            None,
            vec!["TESTE".into()],
            vec![
                normalized("s1", &[CanonicalStatus::Aprovado, CanonicalStatus::Pendente]),
                failed("s2"),
            ],
        );
        let b = SourceReport::new(
            "b".into(),
            None,
            Vec::new(),
            vec![normalized("s1", &[CanonicalStatus::Quitado])],
        );
        let missing = SourceReport::failed(
            "c".into(),
            None,
            FailureEntry::from(&NormalizeError::SourceNotFound {
                name: "c".into(),
                file_name: "c.xlsx".into(),
                searched: vec![],
            }),
        );
        let run = RunReport::new(vec![a, b, missing]);

        assert_eq!(run.sheet_totals(), (2, 1));
        assert_eq!(run.consolidated.sheet_count, 2);
        assert_eq!(run.consolidated.total_records, 3);
        assert!((run.consolidated.resolution_rate - 0.75).abs() < 1e-12);
        assert_eq!(run.ranking[0].source, "b");
        assert_eq!(run.ranking[1].source, "a");
        assert_eq!(
            run.source("c").unwrap().error.as_ref().unwrap().kind,
            FailureKind::SourceNotFound
        );
        assert_eq!(run.source("a").unwrap().metrics.sheet_count, 1);
    }

    #[test]
    fn json_shape() {
        let run = RunReport::new(vec![SourceReport::new(
            "a".into(),
            Some(PathBuf::from("a.xlsx")),
            Vec::new(),
            vec![normalized("s1", &[CanonicalStatus::Aprovado]), failed("s2")],
        )]);
        let json: serde_json::Value = serde_json::from_str(&run.to_json_pretty().unwrap()).unwrap();
        let sheets = &json["sources"][0]["sheets"];
        assert_eq!(sheets[0]["sheet"], "s1");
        assert_eq!(sheets[0]["status"], "normalized");
        assert_eq!(sheets[0]["record_count"], 1);
        assert_eq!(sheets[0]["metrics"]["status_counts"]["APROVADO"], 1);
        assert!(sheets[0].get("records").is_none());
        assert_eq!(sheets[1]["status"], "failed");
        assert_eq!(sheets[1]["kind"], "HEADER_NOT_FOUND");
        assert_eq!(sheets[1]["severity"], "error");
    }
}

//! Strategy-fallback sheet reading.
//!
//! [`WorkbookReader`] holds an ordered list of [`ReadStrategy`] backends. For each sheet it tries
//! the strategies that handle the file's extension, in order, and keeps the first non-empty grid.
//! Every failure along the way is kept as a [`StrategyFailure`] diagnostic.

use std::path::Path;

use crate::error::{NormalizeError, NormalizeResult, StrategyFailure};
use crate::ingestion::csv::DelimitedStrategy;
use crate::ingestion::excel::{CellStreamStrategy, LegacyXlsStrategy, WorkbookStrategy};
use crate::types::RawGrid;

/// One way of turning a (file, sheet) pair into a [`RawGrid`].
pub trait ReadStrategy: Send + Sync {
    /// Stable name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this strategy should be attempted for `path`.
    fn supports(&self, path: &Path) -> bool;

    /// Sheet names of `path`, in workbook order.
    fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>>;

    /// Read one sheet. Must not modify the file.
    fn read(&self, path: &Path, sheet: &str) -> NormalizeResult<RawGrid>;
}

/// A successfully read sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    pub grid: RawGrid,
    /// Name of the strategy that produced `grid`.
    pub strategy: &'static str,
    /// Failures of strategies tried before it.
    pub diagnostics: Vec<StrategyFailure>,
}

/// Reads sheets by trying each configured strategy in order.
pub struct WorkbookReader {
    strategies: Vec<Box<dyn ReadStrategy>>,
}

impl WorkbookReader {
    pub fn new(strategies: Vec<Box<dyn ReadStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy names, in attempt order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Sheet names of `path`, from the first supporting strategy able to list them.
    pub fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>> {
        let mut messages = Vec::new();
        for strategy in self.strategies.iter().filter(|s| s.supports(path)) {
            match strategy.sheet_names(path) {
                Ok(names) => return Ok(names),
                Err(err) => messages.push(format!("{}: {err}", strategy.name())),
            }
        }
        if messages.is_empty() {
            return Err(NormalizeError::UnsupportedFile {
                path: path.to_path_buf(),
            });
        }
        Err(NormalizeError::SheetEnumeration {
            path: path.to_path_buf(),
            message: messages.join("; "),
        })
    }

    /// Read `sheet` of `path`, falling back through the strategies.
    pub fn read_sheet(&self, path: &Path, sheet: &str) -> NormalizeResult<SheetGrid> {
        let mut diagnostics = Vec::new();
        let mut attempted = false;

        for strategy in self.strategies.iter().filter(|s| s.supports(path)) {
            attempted = true;
            let outcome = strategy.read(path, sheet).and_then(|grid| {
                if grid.is_empty() {
                    Err(NormalizeError::EmptyGrid {
                        sheet: sheet.to_string(),
                    })
                } else {
                    Ok(grid)
                }
            });
            match outcome {
                Ok(grid) => {
                    if !diagnostics.is_empty() {
                        tracing::info!(
                            sheet,
                            strategy = strategy.name(),
                            failed = diagnostics.len(),
                            "sheet read after fallback"
                        );
                    }
                    return Ok(SheetGrid {
                        grid,
                        strategy: strategy.name(),
                        diagnostics,
                    });
                }
                Err(err) => {
                    tracing::debug!(
                        sheet,
                        strategy = strategy.name(),
                        error = %err,
                        "read strategy failed"
                    );
                    diagnostics.push(StrategyFailure::new(strategy.name(), &err));
                }
            }
        }

        if !attempted {
            return Err(NormalizeError::UnsupportedFile {
                path: path.to_path_buf(),
            });
        }
        Err(NormalizeError::UnreadableSheet {
            sheet: sheet.to_string(),
            attempts: diagnostics,
        })
    }
}

impl Default for WorkbookReader {
    /// `workbook`, `xlsx-cells`, `xls-legacy`, `delimited`.
    fn default() -> Self {
        Self::new(vec![
            Box::new(WorkbookStrategy),
            Box::new(CellStreamStrategy),
            Box::new(LegacyXlsStrategy),
            Box::new(DelimitedStrategy),
        ])
    }
}

impl std::fmt::Debug for WorkbookReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookReader")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    struct Fixed {
        name: &'static str,
        result: fn(&str) -> NormalizeResult<RawGrid>,
    }

    impl ReadStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }
        fn supports(&self, _path: &Path) -> bool {
            true
        }
        fn sheet_names(&self, _path: &Path) -> NormalizeResult<Vec<String>> {
            match (self.result)("S") {
                Ok(_) => Ok(vec![self.name.to_string()]),
                Err(err) => Err(err),
            }
        }
        fn read(&self, _path: &Path, sheet: &str) -> NormalizeResult<RawGrid> {
            (self.result)(sheet)
        }
    }

    fn failing(sheet: &str) -> NormalizeResult<RawGrid> {
        Err(NormalizeError::SheetMissing {
            sheet: sheet.to_string(),
        })
    }

    fn empty(_sheet: &str) -> NormalizeResult<RawGrid> {
        Ok(RawGrid::new(vec![vec![CellValue::Empty]]))
    }

    fn one_cell(_sheet: &str) -> NormalizeResult<RawGrid> {
        Ok(RawGrid::new(vec![vec![CellValue::Text("x".into())]]))
    }

    #[test]
    fn first_non_empty_grid_wins_and_earlier_failures_are_kept() {
        let reader = WorkbookReader::new(vec![
            Box::new(Fixed { name: "a", result: failing }),
            Box::new(Fixed { name: "b", result: empty }),
            Box::new(Fixed { name: "c", result: one_cell }),
            Box::new(Fixed { name: "d", result: failing }),
        ]);
        let out = reader.read_sheet(Path::new("x.xlsx"), "S").unwrap();
        assert_eq!(out.strategy, "c");
        let names: Vec<&str> = out.diagnostics.iter().map(|d| d.strategy.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(out.diagnostics[1].message.contains("empty"));
    }

    #[test]
    fn all_failures_give_unreadable_sheet_with_every_attempt() {
        let reader = WorkbookReader::new(vec![
            Box::new(Fixed { name: "a", result: failing }),
            Box::new(Fixed { name: "b", result: empty }),
        ]);
        match reader.read_sheet(Path::new("x.xlsx"), "S").unwrap_err() {
            NormalizeError::UnreadableSheet { sheet, attempts } => {
                assert_eq!(sheet, "S");
                assert_eq!(attempts.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_supporting_strategy_is_unsupported_file() {
        let reader = WorkbookReader::default();
        let err = reader.read_sheet(Path::new("notes.pdf"), "S").unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFile { .. }));
    }

    #[test]
    fn sheet_names_fall_back_and_collect_messages() {
        let reader = WorkbookReader::new(vec![
            Box::new(Fixed { name: "a", result: failing }),
            Box::new(Fixed { name: "b", result: one_cell }),
        ]);
        assert_eq!(reader.sheet_names(Path::new("x.xlsx")).unwrap(), vec!["b".to_string()]);

        let reader = WorkbookReader::new(vec![
            Box::new(Fixed { name: "a", result: failing }),
            Box::new(Fixed { name: "c", result: failing }),
        ]);
        match reader.sheet_names(Path::new("x.xlsx")).unwrap_err() {
            NormalizeError::SheetEnumeration { message, .. } => {
                assert!(message.starts_with("a: "));
                assert!(message.contains("; c: "));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn delimited_files_have_one_sheet_named_after_the_stem() {
        let reader = WorkbookReader::default();
        assert_eq!(
            reader.sheet_names(Path::new("some/dir/equipe.csv")).unwrap(),
            vec!["equipe".to_string()]
        );
    }

    #[test]
    fn default_order() {
        assert_eq!(
            WorkbookReader::default().strategy_names(),
            vec!["workbook", "xlsx-cells", "xls-legacy", "delimited"]
        );
    }
}

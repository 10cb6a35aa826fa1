//! Workbook read strategies backed by `calamine`.

use std::path::Path;

use calamine::{open_workbook, open_workbook_auto, Data, Range, Reader, Xls, Xlsx};

use crate::error::{NormalizeError, NormalizeResult};
use crate::ingestion::reader::ReadStrategy;
use crate::types::{CellValue, RawGrid};

/// Extensions opened by the auto-detecting reader.
pub const WORKBOOK_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xls", "xla", "ods"];

/// Extensions the format-specific readers attempt. Both try all of them so a file whose
/// extension does not match its real format still gets a chance.
const ZIP_OR_CFB_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "xla"];

/// Tabular read through `open_workbook_auto` + `worksheet_range`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookStrategy;

impl ReadStrategy for WorkbookStrategy {
    fn name(&self) -> &'static str {
        "workbook"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &WORKBOOK_EXTENSIONS)
    }

    fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>> {
        Ok(open_workbook_auto(path)?.sheet_names())
    }

    fn read(&self, path: &Path, sheet: &str) -> NormalizeResult<RawGrid> {
        let mut workbook = open_workbook_auto(path)?;
        ensure_sheet(&workbook.sheet_names(), sheet)?;
        let range = workbook.worksheet_range(sheet)?;
        Ok(grid_from_range(&range))
    }
}

/// Cell-by-cell read through the streaming `.xlsx` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellStreamStrategy;

impl ReadStrategy for CellStreamStrategy {
    fn name(&self) -> &'static str {
        "xlsx-cells"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &ZIP_OR_CFB_EXTENSIONS)
    }

    fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>> {
        let workbook: Xlsx<_> = open_workbook(path)?;
        Ok(workbook.sheet_names())
    }

    fn read(&self, path: &Path, sheet: &str) -> NormalizeResult<RawGrid> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        ensure_sheet(&workbook.sheet_names(), sheet)?;

        let mut cells: Vec<(u32, u32, CellValue)> = Vec::new();
        let mut reader = workbook.worksheet_cells_reader(sheet)?;
        while let Some(cell) = reader.next_cell()? {
            let value = cell_value(&Data::from(cell.get_value().clone()));
            if !value.is_blank() {
                let (row, col) = cell.get_position();
                cells.push((row, col, value));
            }
        }
        Ok(grid_from_cells(cells))
    }
}

/// Read through the legacy binary `.xls` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyXlsStrategy;

impl ReadStrategy for LegacyXlsStrategy {
    fn name(&self) -> &'static str {
        "xls-legacy"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &ZIP_OR_CFB_EXTENSIONS)
    }

    fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>> {
        let workbook: Xls<_> = open_workbook(path)?;
        Ok(workbook.sheet_names())
    }

    fn read(&self, path: &Path, sheet: &str) -> NormalizeResult<RawGrid> {
        let mut workbook: Xls<_> = open_workbook(path)?;
        ensure_sheet(&workbook.sheet_names(), sheet)?;
        let range = workbook.worksheet_range(sheet)?;
        Ok(grid_from_range(&range))
    }
}

/// Whether `path` has one of `extensions` (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn ensure_sheet(names: &[String], sheet: &str) -> NormalizeResult<()> {
    if names.iter().any(|n| n == sheet) {
        Ok(())
    } else {
        Err(NormalizeError::SheetMissing {
            sheet: sheet.to_string(),
        })
    }
}

/// Convert a calamine cell. Typed date-times keep their serial value.
pub fn cell_value(c: &Data) -> CellValue {
    match c {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

fn grid_from_range(range: &Range<Data>) -> RawGrid {
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    RawGrid::new(rows).with_first_row(first_row)
}

/// Assemble sparse cells into a grid anchored at the top-left used cell.
fn grid_from_cells(cells: Vec<(u32, u32, CellValue)>) -> RawGrid {
    let (Some(min_row), Some(min_col)) = (
        cells.iter().map(|(r, _, _)| *r).min(),
        cells.iter().map(|(_, c, _)| *c).min(),
    ) else {
        return RawGrid::default();
    };
    let max_row = cells.iter().map(|(r, _, _)| *r).max().unwrap_or(min_row);

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); (max_row - min_row) as usize + 1];
    for (r, c, value) in cells {
        let row = &mut rows[(r - min_row) as usize];
        let col = (c - min_col) as usize;
        if row.len() <= col {
            row.resize(col + 1, CellValue::Empty);
        }
        row[col] = value;
    }
    RawGrid::new(rows).with_first_row(min_row as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_extension(Path::new("a/B.XLSX"), &WORKBOOK_EXTENSIONS));
        assert!(has_extension(Path::new("b.ods"), &WORKBOOK_EXTENSIONS));
        assert!(!has_extension(Path::new("b.csv"), &WORKBOOK_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), &WORKBOOK_EXTENSIONS));
    }

    #[test]
    fn sparse_cells_become_a_dense_grid() {
        let grid = grid_from_cells(vec![
            (3, 2, CellValue::Text("DATA".into())),
            (3, 4, CellValue::Text("STATUS".into())),
            (5, 3, CellValue::Number(1.0)),
        ]);
        assert_eq!(grid.first_row, 3);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(
            grid.rows[0],
            vec![
                CellValue::Text("DATA".into()),
                CellValue::Empty,
                CellValue::Text("STATUS".into())
            ]
        );
        assert!(grid.rows[1].is_empty());
        assert_eq!(grid.rows[2], vec![CellValue::Empty, CellValue::Number(1.0)]);
    }

    #[test]
    fn no_cells_is_an_empty_grid() {
        assert!(grid_from_cells(Vec::new()).is_empty());
    }

    #[test]
    fn calamine_cells_convert() {
        assert_eq!(cell_value(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(cell_value(&Data::String("a".into())), CellValue::Text("a".into()));
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-05".into())),
            CellValue::Text("2024-01-05".into())
        );
    }
}

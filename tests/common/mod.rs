#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_xlsxwriter::{Workbook, Worksheet};

pub fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("workbook-normalizer-{name}-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A cell to write: text or number.
pub enum Cell<'a> {
    T(&'a str),
    N(f64),
}

pub fn write_rows(ws: &mut Worksheet, first_row: u32, rows: &[&[Cell]]) {
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (first_row + r as u32, c as u16);
            match cell {
                Cell::T("") => {}
                Cell::T(s) => {
                    ws.write_string(r, c, *s).unwrap();
                }
                Cell::N(n) => {
                    ws.write_number(r, c, *n).unwrap();
                }
            }
        }
    }
}

/// Team workbook with a title block, a clean sheet, two skip-listed sheets and one without any
/// recognizable header.
pub fn write_north_xlsx(path: &Path) {
    use Cell::*;

    let mut wb = Workbook::new();

    let ws = wb.add_worksheet();
    ws.set_name("Ana").unwrap();
    write_rows(ws, 0, &[&[T("Relatório de contratos")]]);
    write_rows(
        ws,
        2,
        &[
            &[T("Data"), T("Situação"), T("Resolução"), T("Contrato")],
            &[N(45000.0), T("APROVADO"), T("20/03/2023"), T("C-1")],
            &[T("15/03/2023"), T("aprovado "), T(""), T("C-2")],
            &[T("2023-03-16"), T("PENDENTE"), T(""), T("C-3")],
            &[T("16/03/2023"), T("xyz"), T(""), T("C-4")],
        ],
    );

    let ws = wb.add_worksheet();
    ws.set_name("TESTE").unwrap();
    write_rows(ws, 0, &[&[T("DATA"), T("STATUS")], &[T("01/01/2024"), T("APROVADO")]]);

    let ws = wb.add_worksheet();
    ws.set_name("Bruno").unwrap();
    write_rows(
        ws,
        0,
        &[
            &[T("DT"), T("STATUS")],
            &[T("2024-01-05"), T("Concluído")],
            &[T("05/01/2024"), T("em análise")],
        ],
    );

    let ws = wb.add_worksheet();
    ws.set_name("Quebrada").unwrap();
    write_rows(ws, 0, &[&[T("nada"), T("aqui")], &[T("1"), T("2")]]);

    let ws = wb.add_worksheet();
    ws.set_name("Relatório Geral").unwrap();
    write_rows(ws, 0, &[&[T("DATA"), T("SITUACAO")], &[T("01/01/2024"), T("PENDENTE")]]);

    wb.save(path).unwrap();
}

/// Single-sheet workbook where every record is approved.
pub fn write_south_xlsx(path: &Path) {
    use Cell::*;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Carla").unwrap();
    write_rows(
        ws,
        0,
        &[
            &[T("DATA"), T("SITUACAO"), T("DT_RESOLUCAO")],
            &[T("01/02/2024"), T("Aprovado"), T("03/02/2024")],
            &[T("02/02/2024"), T("APROVADO"), T("")],
            &[T("03/02/2024"), T("aprovado"), T("04/02/2024")],
        ],
    );
    wb.save(path).unwrap();
}

pub fn write_east_csv(path: &Path) {
    std::fs::write(path, "DATA;SITUACAO\n15/03/2023;QUITADO\n16/03/2023;PENDENTE\n").unwrap();
}

//! Delimited-text read strategy.
//!
//! A delimited export has exactly one sheet, named after the file stem. There is no header
//! assumption: every line is a grid row, and the header detector finds the labels later.

use std::path::Path;

use crate::error::{NormalizeError, NormalizeResult};
use crate::ingestion::excel::has_extension;
use crate::ingestion::reader::ReadStrategy;
use crate::types::{CellValue, RawGrid};

/// Extensions read as delimited text.
pub const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

const CANDIDATE_DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// `csv`-crate reader with delimiter sniffing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedStrategy;

impl DelimitedStrategy {
    pub fn handles(path: &Path) -> bool {
        has_extension(path, &DELIMITED_EXTENSIONS)
    }

    /// The single sheet name of a delimited file.
    pub fn sheet_name(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl ReadStrategy for DelimitedStrategy {
    fn name(&self) -> &'static str {
        "delimited"
    }

    fn supports(&self, path: &Path) -> bool {
        Self::handles(path)
    }

    fn sheet_names(&self, path: &Path) -> NormalizeResult<Vec<String>> {
        Ok(vec![Self::sheet_name(path)])
    }

    fn read(&self, path: &Path, sheet: &str) -> NormalizeResult<RawGrid> {
        if Self::sheet_name(path) != sheet {
            return Err(NormalizeError::SheetMissing {
                sheet: sheet.to_string(),
            });
        }
        let data = std::fs::read(path)?;
        grid_from_bytes(&data)
    }
}

/// Parse delimited bytes into a grid. Invalid UTF-8 is replaced rather than rejected.
pub fn grid_from_bytes(data: &[u8]) -> NormalizeResult<RawGrid> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(data))
        .from_reader(data);

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                let text = String::from_utf8_lossy(field);
                if text.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(text.into_owned())
                }
            })
            .collect();
        rows.push(row);
    }
    Ok(RawGrid::new(rows))
}

/// Pick the candidate delimiter occurring most often in the first line; `,` when none occurs.
pub fn sniff_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|b| *b == b'\n').next().unwrap_or(&[]);
    CANDIDATE_DELIMITERS
        .iter()
        .map(|d| (*d, first_line.iter().filter(|b| *b == d).count()))
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

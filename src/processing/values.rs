//! Coercion of raw cells into canonical dates, statuses and text.
//!
//! Nothing in here fails: a cell that cannot be coerced becomes [`FieldValue::Absent`] and, when
//! it was not empty, a [`SheetWarning`] is recorded for its row.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime};

use crate::config::{EngineConfig, StatusTaxonomy};
use crate::error::SheetWarning;
use crate::types::{
    CanonicalField, CanonicalStatus, CellValue, FieldBinding, FieldKind, FieldValue,
    NormalizedRecord, StatusValue,
};

/// Largest accepted serial day count (9999-12-31).
pub const MAX_SERIAL: f64 = 2_958_465.0;

const ISO_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DAY_FIRST_SHORT_FORMATS: [&str; 3] = ["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Spreadsheet serial epoch: serial `0` is 1899-12-30.
pub fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Convert a serial day count to a date, dropping any time-of-day fraction.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial.floor() > MAX_SERIAL {
        return None;
    }
    serial_epoch()?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Parse free-text dates.
///
/// Tried in order: RFC 3339, ISO (`2024-01-05`, optional time), compact `20240105`,
/// day-first (`05/01/2024`, `05-01-24`, optional time), then plain numbers as serials.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let (date_part, time_part) = match s.find([' ', 'T']) {
        Some(idx) => (&s[..idx], s[idx + 1..].trim()),
        None => (s, ""),
    };
    if !time_part.is_empty()
        && !TIME_FORMATS
            .iter()
            .any(|f| NaiveTime::parse_from_str(time_part, f).is_ok())
    {
        return parse_serial_text(s);
    }

    let pieces: Vec<&str> = date_part.split(['-', '/', '.']).collect();
    let numeric = pieces
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));

    let formats: &[&str] = match (numeric, pieces.as_slice()) {
        (true, [year, _, _]) if year.len() == 4 => &ISO_FORMATS,
        (true, [_, _, year]) if year.len() == 4 => &DAY_FIRST_FORMATS,
        (true, [_, _, year]) if year.len() == 2 => &DAY_FIRST_SHORT_FORMATS,
        (true, [compact]) if compact.len() == 8 && time_part.is_empty() => &["%Y%m%d"],
        _ => &[],
    };
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())
        .or_else(|| parse_serial_text(s))
}

fn parse_serial_text(s: &str) -> Option<NaiveDate> {
    s.parse::<f64>().ok().and_then(serial_to_date)
}

/// Outcome of coercing one date cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateCoercion {
    /// The cell was empty.
    Empty,
    Date(NaiveDate),
    /// Non-empty input that is not a date; holds the raw text.
    Invalid(String),
}

/// Coerce a cell holding a serial, a typed date-time or free text into a date.
pub fn coerce_date(cell: &CellValue) -> DateCoercion {
    if cell.is_blank() {
        return DateCoercion::Empty;
    }
    let parsed = match cell {
        CellValue::Number(f) | CellValue::DateTime(f) => serial_to_date(*f),
        CellValue::Text(s) => parse_date_text(s),
        _ => None,
    };
    match parsed {
        Some(d) => DateCoercion::Date(d),
        None => DateCoercion::Invalid(cell.as_text()),
    }
}

/// Outcome of coercing one status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCoercion {
    /// Empty cell and no default configured.
    Empty,
    Status(StatusValue),
    /// Not in the taxonomy; holds the trimmed raw text.
    OutOfTaxonomy(String),
}

/// Coerce a status cell against `taxonomy`, substituting `default` for empty cells.
pub fn coerce_status(
    cell: &CellValue,
    taxonomy: &StatusTaxonomy,
    default: Option<CanonicalStatus>,
) -> StatusCoercion {
    let raw = cell.as_text();
    let raw = raw.trim();
    if raw.is_empty() {
        return match default {
            Some(s) => StatusCoercion::Status(StatusValue::Canonical(s)),
            None => StatusCoercion::Empty,
        };
    }
    match taxonomy.lookup(raw) {
        Some(s) => StatusCoercion::Status(StatusValue::Canonical(s)),
        None => StatusCoercion::OutOfTaxonomy(raw.to_string()),
    }
}

/// Trimmed text; empty text is absent.
pub fn coerce_text(cell: &CellValue) -> FieldValue {
    let text = cell.as_text();
    let text = text.trim();
    if text.is_empty() {
        FieldValue::Absent
    } else {
        FieldValue::Text(text.to_string())
    }
}

/// Turns data rows into [`NormalizedRecord`]s for one set of column bindings.
#[derive(Debug, Clone, Copy)]
pub struct ValueNormalizer<'a> {
    taxonomy: &'a StatusTaxonomy,
    default_status: Option<CanonicalStatus>,
}

impl<'a> ValueNormalizer<'a> {
    pub fn new(taxonomy: &'a StatusTaxonomy, default_status: Option<CanonicalStatus>) -> Self {
        Self {
            taxonomy,
            default_status,
        }
    }

    pub fn from_config(cfg: &'a EngineConfig) -> Self {
        Self::new(&cfg.status_taxonomy, cfg.default_status)
    }

    /// Normalize one data row. `row_number` is the 1-based spreadsheet row used in warnings.
    pub fn normalize_row(
        &self,
        cells: &[CellValue],
        row_number: usize,
        bindings: &BTreeMap<CanonicalField, FieldBinding>,
        warnings: &mut Vec<SheetWarning>,
    ) -> NormalizedRecord {
        let mut record = NormalizedRecord::new(row_number);
        for (field, binding) in bindings {
            let Some(column) = binding.column() else {
                continue;
            };
            let cell = cells.get(column).unwrap_or(&CellValue::Empty);
            let value = match field.kind() {
                FieldKind::Date => match coerce_date(cell) {
                    DateCoercion::Date(d) => FieldValue::Date(d),
                    DateCoercion::Empty => FieldValue::Absent,
                    DateCoercion::Invalid(raw) => {
                        tracing::debug!(
                            row = row_number,
                            field = %field,
                            raw = %raw,
                            "unparseable date"
                        );
                        warnings.push(SheetWarning::DateParseFailure {
                            row: row_number,
                            field: *field,
                            raw,
                        });
                        FieldValue::Absent
                    }
                },
                FieldKind::Status => match coerce_status(cell, self.taxonomy, self.default_status) {
                    StatusCoercion::Status(s) => FieldValue::Status(s),
                    StatusCoercion::Empty => FieldValue::Absent,
                    StatusCoercion::OutOfTaxonomy(raw) => {
                        tracing::warn!(row = row_number, raw = %raw, "status not in taxonomy");
                        warnings.push(SheetWarning::OutOfTaxonomyValue { row: row_number, raw });
                        FieldValue::Status(StatusValue::OutOfTaxonomy)
                    }
                },
                FieldKind::Text => coerce_text(cell),
            };
            record.set(*field, value);
        }
        record
    }
}

//! Core data model: canonical fields and statuses, raw grids and normalized records.
//!
//! A sheet starts life as a [`RawGrid`] of untyped [`CellValue`]s and ends as a list of
//! [`NormalizedRecord`]s keyed by [`CanonicalField`]. Fields without a bound column hold
//! [`FieldValue::Absent`] rather than being left out.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SheetWarning, StrategyFailure};

/// Normalized semantic column, independent of its raw spreadsheet label.
///
/// The declaration order is the field-priority order used when resolving columns: an ambiguous
/// raw column is claimed by the earliest field that lists a matching alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalField {
    Date,
    ResolutionDate,
    ContractId,
    NegotiationDate,
    Status,
    Priority,
    Responsible,
    Category,
}

/// How values of a [`CanonicalField`] are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Calendar date (serial, free text or typed timestamp).
    Date,
    /// Canonical status from the taxonomy.
    Status,
    /// Trimmed free text.
    Text,
}

impl CanonicalField {
    /// Every field, in priority order.
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::Date,
        CanonicalField::ResolutionDate,
        CanonicalField::ContractId,
        CanonicalField::NegotiationDate,
        CanonicalField::Status,
        CanonicalField::Priority,
        CanonicalField::Responsible,
        CanonicalField::Category,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalField::Date
            | CanonicalField::ResolutionDate
            | CanonicalField::NegotiationDate => {
                FieldKind::Date
            }
            CanonicalField::Status => FieldKind::Status,
            CanonicalField::ContractId
            | CanonicalField::Priority
            | CanonicalField::Responsible
            | CanonicalField::Category => FieldKind::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Date => "DATE",
            CanonicalField::ResolutionDate => "RESOLUTION_DATE",
            CanonicalField::ContractId => "CONTRACT_ID",
            CanonicalField::NegotiationDate => "NEGOTIATION_DATE",
            CanonicalField::Status => "STATUS",
            CanonicalField::Priority => "PRIORITY",
            CanonicalField::Responsible => "RESPONSIBLE",
            CanonicalField::Category => "CATEGORY",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member of the fixed status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Verificado,
    Analise,
    Pendente,
    Prioridade,
    PrioridadeTotal,
    Aprovado,
    Quitado,
    Apreendido,
    Cancelado,
    Concluido,
    EmAndamento,
}

impl CanonicalStatus {
    /// Every taxonomy member, in report order.
    pub const ALL: [CanonicalStatus; 11] = [
        CanonicalStatus::Verificado,
        CanonicalStatus::Analise,
        CanonicalStatus::Pendente,
        CanonicalStatus::Prioridade,
        CanonicalStatus::PrioridadeTotal,
        CanonicalStatus::Aprovado,
        CanonicalStatus::Quitado,
        CanonicalStatus::Apreendido,
        CanonicalStatus::Cancelado,
        CanonicalStatus::Concluido,
        CanonicalStatus::EmAndamento,
    ];

    /// Canonical label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            CanonicalStatus::Verificado => "VERIFICADO",
            CanonicalStatus::Analise => "ANALISE",
            CanonicalStatus::Pendente => "PENDENTE",
            CanonicalStatus::Prioridade => "PRIORIDADE",
            CanonicalStatus::PrioridadeTotal => "PRIORIDADE_TOTAL",
            CanonicalStatus::Aprovado => "APROVADO",
            CanonicalStatus::Quitado => "QUITADO",
            CanonicalStatus::Apreendido => "APREENDIDO",
            CanonicalStatus::Cancelado => "CANCELADO",
            CanonicalStatus::Concluido => "CONCLUIDO",
            CanonicalStatus::EmAndamento => "EM_ANDAMENTO",
        }
    }

    /// Inverse of [`Self::label`]; exact match only.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serialized label of [`StatusValue::OutOfTaxonomy`].
pub const OUT_OF_TAXONOMY: &str = "OUT_OF_TAXONOMY";

/// A normalized status: a taxonomy member or the out-of-taxonomy sentinel.
///
/// Serializes as the bare label (`"APROVADO"`, `"OUT_OF_TAXONOMY"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StatusValue {
    Canonical(CanonicalStatus),
    OutOfTaxonomy,
}

impl StatusValue {
    pub fn label(self) -> &'static str {
        match self {
            StatusValue::Canonical(s) => s.label(),
            StatusValue::OutOfTaxonomy => OUT_OF_TAXONOMY,
        }
    }
}

impl From<StatusValue> for String {
    fn from(value: StatusValue) -> Self {
        value.label().to_string()
    }
}

impl TryFrom<String> for StatusValue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == OUT_OF_TAXONOMY {
            return Ok(StatusValue::OutOfTaxonomy);
        }
        CanonicalStatus::from_label(&value)
            .map(StatusValue::Canonical)
            .ok_or_else(|| format!("unknown status label '{value}'"))
    }
}

/// A single untyped cell read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Typed date-time cell, stored as a spreadsheet serial day count.
    DateTime(f64),
    /// Cell error such as `#N/A`, rendered as text.
    Error(String),
}

impl CellValue {
    /// Empty cells and whitespace-only text count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for labels, text fields and status lookups.
    ///
    /// Integral numbers render without a fractional part (`12.0` -> `"12"`).
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(f) | CellValue::DateTime(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

/// Raw tabular content of one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGrid {
    /// Row-major cells; rows may have different lengths.
    pub rows: Vec<Vec<CellValue>>,
    /// Zero-based spreadsheet row of `rows[0]`.
    pub first_row: usize,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows, first_row: 0 }
    }

    pub fn with_first_row(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when no cell holds a value.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_blank))
    }

    /// 1-based spreadsheet row number of grid row `idx`.
    pub fn user_row(&self, idx: usize) -> usize {
        self.first_row + idx + 1
    }
}

/// Typed value of one canonical field in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Unresolved column, empty cell, or failed coercion.
    Absent,
    Date(NaiveDate),
    Text(String),
    Status(StatusValue),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<StatusValue> {
        match self {
            FieldValue::Status(s) => Some(*s),
            _ => None,
        }
    }
}

/// One data row expressed over the canonical field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// 1-based spreadsheet row this record came from.
    pub row: usize,
    values: BTreeMap<CanonicalField, FieldValue>,
}

impl NormalizedRecord {
    /// A record with every field absent.
    pub fn new(row: usize) -> Self {
        let values = CanonicalField::ALL
            .iter()
            .map(|f| (*f, FieldValue::Absent))
            .collect();
        Self { row, values }
    }

    pub fn set(&mut self, field: CanonicalField, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: CanonicalField) -> &FieldValue {
        self.values.get(&field).unwrap_or(&FieldValue::Absent)
    }

    pub fn status(&self) -> Option<StatusValue> {
        self.get(CanonicalField::Status).as_status()
    }

    pub fn date(&self, field: CanonicalField) -> Option<NaiveDate> {
        self.get(field).as_date()
    }
}

/// Where a canonical field's values come from in one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FieldBinding {
    Bound { column: usize, label: String },
    Unresolved,
}

impl FieldBinding {
    pub fn column(&self) -> Option<usize> {
        match self {
            FieldBinding::Bound { column, .. } => Some(*column),
            FieldBinding::Unresolved => None,
        }
    }
}

/// Output of the per-sheet pipeline, before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetResult {
    pub sheet: String,
    /// 1-based spreadsheet row of the detected header.
    pub header_row: usize,
    pub bindings: BTreeMap<CanonicalField, FieldBinding>,
    pub records: Vec<NormalizedRecord>,
    pub warnings: Vec<SheetWarning>,
    /// Failures of read strategies tried before the one that succeeded.
    pub diagnostics: Vec<StrategyFailure>,
}

impl SheetResult {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn unresolved_fields(&self) -> Vec<CanonicalField> {
        self.bindings
            .iter()
            .filter(|(_, b)| matches!(b, FieldBinding::Unresolved))
            .map(|(f, _)| *f)
            .collect()
    }
}

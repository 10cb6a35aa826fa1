//! Binding of raw column labels to canonical fields.

use std::collections::BTreeMap;

use crate::config::AliasSet;
use crate::error::SheetWarning;
use crate::processing::text::label_key;
use crate::types::{CanonicalField, CellValue, FieldBinding};

/// Result of resolving one header row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResolution {
    /// One entry per canonical field, bound or unresolved.
    pub bindings: BTreeMap<CanonicalField, FieldBinding>,
    /// One [`SheetWarning::UnresolvedField`] per unresolved field, in field order.
    pub warnings: Vec<SheetWarning>,
}

/// Resolve `labels` (the header row cells) against `aliases`.
///
/// Fields are processed in [`CanonicalField::ALL`] order. Each field scans the labels left to
/// right and binds the first one not yet claimed whose folded form matches one of its aliases.
pub fn resolve_columns(labels: &[CellValue], aliases: &AliasSet) -> ColumnResolution {
    let keys: Vec<String> = labels.iter().map(|c| label_key(&c.as_text())).collect();
    let mut claimed = vec![false; keys.len()];
    let mut bindings = BTreeMap::new();
    let mut warnings = Vec::new();

    for field in CanonicalField::ALL {
        let hit = keys
            .iter()
            .enumerate()
            .find(|(idx, key)| !claimed[*idx] && !key.is_empty() && aliases.matches(field, key));

        let binding = match hit {
            Some((idx, _)) => {
                claimed[idx] = true;
                FieldBinding::Bound {
                    column: idx,
                    label: labels[idx].as_text().trim().to_string(),
                }
            }
            None => {
                warnings.push(SheetWarning::UnresolvedField { field });
                FieldBinding::Unresolved
            }
        };
        bindings.insert(field, binding);
    }

    ColumnResolution { bindings, warnings }
}

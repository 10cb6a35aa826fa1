//! Header row detection.

use std::collections::BTreeSet;

use crate::config::{AliasSet, EngineConfig};
use crate::error::{NormalizeError, NormalizeResult};
use crate::processing::text::header_key;
use crate::types::{CellValue, RawGrid};

/// Finds the header row among the first rows of a grid.
///
/// A row qualifies when its non-empty cells contain at least `min_matches` distinct known
/// aliases. The earliest qualifying row wins.
#[derive(Debug, Clone, Copy)]
pub struct HeaderDetector<'a> {
    aliases: &'a AliasSet,
    scan_depth: usize,
    min_matches: usize,
}

impl<'a> HeaderDetector<'a> {
    pub fn new(aliases: &'a AliasSet, scan_depth: usize, min_matches: usize) -> Self {
        Self {
            aliases,
            scan_depth,
            min_matches,
        }
    }

    pub fn from_config(cfg: &'a EngineConfig) -> Self {
        Self::new(&cfg.aliases, cfg.header_scan_depth, cfg.header_min_matches)
    }

    /// Number of distinct known aliases in `row`.
    pub fn matches_in_row(&self, row: &[CellValue]) -> usize {
        let known = self.aliases.header_keys();
        row.iter()
            .filter(|c| !c.is_blank())
            .map(|c| header_key(&c.as_text()))
            .filter(|k| known.contains(k))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Zero-based grid index of the header row.
    pub fn detect(&self, sheet: &str, grid: &RawGrid) -> NormalizeResult<usize> {
        let scanned = grid.row_count().min(self.scan_depth);
        grid.rows
            .iter()
            .take(scanned)
            .position(|row| self.matches_in_row(row) >= self.min_matches)
            .ok_or_else(|| NormalizeError::HeaderNotFound {
                sheet: sheet.to_string(),
                scanned_rows: scanned,
            })
    }
}

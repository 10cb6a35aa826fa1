//! Text folding used to compare labels and status values.
//!
//! Three comparison keys exist, one per consumer:
//!
//! - [`header_key`]: header detection (diacritics stripped, uppercased, trimmed)
//! - [`label_key`]: column resolution (as above, plus all whitespace and `_` removed)
//! - [`status_key`]: status lookup (as `header_key`, with whitespace runs collapsed)

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Decompose and drop combining marks (`"SITUAÇÃO"` -> `"SITUACAO"`).
pub fn strip_diacritics(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Key used to intersect header-row cells with the known aliases.
pub fn header_key(s: &str) -> String {
    strip_diacritics(s.trim()).to_uppercase()
}

/// Key used to match raw column labels against aliases.
pub fn label_key(s: &str) -> String {
    strip_diacritics(s)
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

/// Key used to look a raw status up in the taxonomy.
pub fn status_key(s: &str) -> String {
    strip_diacritics(s)
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

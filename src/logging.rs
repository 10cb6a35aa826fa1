//! `tracing` subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` (default: `info`).
///
/// ```no_run
/// workbook_normalizer::logging::init();
/// ```
///
/// Panics if a global subscriber is already set; use [`try_init`] when that can happen.
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Like [`init`], but returns `false` instead of panicking when a subscriber is already set.
pub fn try_init() -> bool {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}

/// Debug-level logging captured by the test harness. Repeated calls are no-ops.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

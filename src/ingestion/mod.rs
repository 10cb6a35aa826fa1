//! Getting raw grids out of files.
//!
//! - [`locator`]: logical source -> file path, across prioritized search directories
//! - [`reader`]: strategy-fallback sheet reading ([`WorkbookReader`])
//! - [`excel`] / [`csv`]: the `calamine` and delimited-text strategies
//! - [`header`]: header row detection within the first rows of a grid

pub mod csv;
pub mod excel;
pub mod header;
pub mod locator;
pub mod reader;

pub use excel::{CellStreamStrategy, LegacyXlsStrategy, WorkbookStrategy};
pub use header::HeaderDetector;
pub use locator::{ResolvedSource, SourceLocator};
pub use reader::{ReadStrategy, SheetGrid, WorkbookReader};
pub use self::csv::DelimitedStrategy;

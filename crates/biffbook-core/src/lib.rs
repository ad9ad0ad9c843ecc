//! # biffbook-core
//!
//! In-memory document model for BIFF8 (`.xls`) workbooks.
//!
//! This crate provides the types a BIFF8 reader or writer works against:
//! - [`Workbook`], [`Worksheet`], [`Row`] - The document structure
//! - [`CellRecord`] with [`Cell`] / [`CellMut`] views - Typed cell values
//! - [`SharedStringTable`] - Interned cell text, shared by index
//! - [`StyleTable`], [`FontTable`], [`FormatTable`] - Formatting tables
//! - [`FormulaEngine`] - The seam a formula parser plugs into
//!
//! ## Example
//!
//! ```rust
//! use biffbook_core::{ShiftOptions, Workbook};
//!
//! let mut workbook = Workbook::new();
//! workbook.cell_mut(0, 0, 0).unwrap().set_string("Total").unwrap();
//! workbook.cell_mut(0, 1, 0).unwrap().set_number(3.5).unwrap();
//! workbook.cell_mut(0, 2, 0).unwrap().set_formula("A2*2").unwrap();
//!
//! // Insert a row above the data; the formula follows it
//! workbook.shift_rows(0, 1, 2, 1, ShiftOptions::default()).unwrap();
//! let cell = workbook.cell(0, 3, 0).unwrap().unwrap();
//! assert_eq!(cell.formula_text().unwrap(), "A3*2");
//! ```

pub mod array_formula;
pub mod cell;
pub mod comment;
pub mod error;
pub mod formula;
pub mod hyperlink;
pub mod index;
pub mod merge;
pub mod names;
pub mod row;
pub mod shift;
pub mod strings;
pub mod style;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use array_formula::ArrayFormulaRegistry;
pub use cell::{
    CachedResult, Cell, CellAddress, CellError, CellKind, CellMut, CellRange, CellRecord,
};
pub use comment::{CellComment, CommentRegistry};
pub use error::{Error, Result};
pub use formula::{FormulaEngine, FormulaHost, RowShift, TextFormulaEngine, TokenHandle};
pub use hyperlink::{Hyperlink, HyperlinkKind, HyperlinkRegistry};
pub use merge::MergedRegionSet;
pub use names::{DefinedName, DefinedNames, NameScope};
pub use row::{MissingCellPolicy, Row};
pub use shift::{ShiftOptions, ShiftOutcome};
pub use strings::{FormatRun, SharedStringTable, UnicodeString};
pub use workbook::{Workbook, WorkbookSettings};
pub use worksheet::Worksheet;

// Re-export all style types for convenience
pub use style::{
    Alignment, BorderEdge, Borders, ExtendedFormat, Fill, Font, FontTable, FormatTable,
    HorizontalAlignment, Protection, ResolvedStyle, StyleHandle, StyleTable, VerticalAlignment,
};

/// Maximum number of rows in a worksheet (BIFF8 limit)
pub const MAX_ROWS: u32 = 65_536;

/// Maximum number of columns in a worksheet (BIFF8 limit)
pub const MAX_COLS: u16 = 256;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Maximum number of entries in a style table
pub const MAX_STYLES: usize = 4_000;

/// Index of the first style entry after the built-in ones
pub const FIRST_USER_STYLE: u16 = 21;

/// Index of the first font after the four built-in ones
pub const FIRST_USER_FONT: u16 = 4;

/// First id available for custom number formats
pub const FIRST_USER_FORMAT: u16 = 164;

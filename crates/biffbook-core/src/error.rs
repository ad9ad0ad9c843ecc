//! Error types for biffbook-core

use thiserror::Error;

use crate::cell::CellKind;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing a workbook
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// A value accessor was used on a cell of another kind
    #[error("Cannot get a {expected} value from a {actual} {}cell", formula_label(.formula_cell))]
    TypeMismatch {
        expected: CellKind,
        actual: CellKind,
        formula_cell: bool,
    },

    /// Part of a multi-cell array formula was edited on its own
    #[error("Cell {0} is part of a multi-cell array formula; change the whole group instead")]
    ArrayFormulaPartial(String),

    /// A merged region overlaps another merged region or an array formula
    #[error("Region {region} intersects existing region {existing}")]
    IntersectingRegion { region: String, existing: String },

    /// Malformed row/column bounds
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// A style handle from another workbook was applied without cloning it
    #[error("Style belongs to a different workbook; clone it first")]
    ForeignStyle,

    /// Text could not be converted into the requested form
    #[error("Cannot convert '{text}' to {target}")]
    NotConvertible { text: String, target: &'static str },

    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid style index
    #[error("Invalid style index: {0}")]
    InvalidStyleIndex(u16),

    /// The style table reached the format limit
    #[error("Style table is full ({0} entries)")]
    TooManyStyles(usize),

    /// Invalid font index
    #[error("Invalid font index: {0}")]
    InvalidFontIndex(u16),

    /// Invalid shared string index
    #[error("Invalid shared string index: {0}")]
    InvalidStringIndex(u32),

    /// The cell is not a member of any array formula
    #[error("Cell {0} is not part of an array formula")]
    NotArrayFormula(String),

    /// Formula parse error
    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    /// Invalid defined name
    #[error("Invalid defined name: {0}")]
    InvalidName(String),
}

fn formula_label(formula_cell: &bool) -> &'static str {
    if *formula_cell {
        "formula "
    } else {
        ""
    }
}

impl Error {
    pub(crate) fn not_convertible(text: impl Into<String>, target: &'static str) -> Self {
        Error::NotConvertible {
            text: text.into(),
            target,
        }
    }
}

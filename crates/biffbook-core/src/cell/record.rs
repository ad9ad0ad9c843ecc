//! Type-specific cell records
//!
//! Each cell kind is bound to exactly one record shape, mirroring the BLANK,
//! NUMBER, LABELSST, BOOLERR and FORMULA records of the binary format. The
//! byte encoding lives outside this crate; these are the decoded fields.

use super::{CachedResult, CellError, CellKind, CellRange};
use crate::formula::TokenHandle;

/// Fields shared by every cell record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHeader {
    pub row: u32,
    pub col: u16,
    /// Index into the workbook's style table
    pub xf_index: u16,
}

impl CellHeader {
    pub fn new(row: u32, col: u16, xf_index: u16) -> Self {
        Self { row, col, xf_index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlankRecord {
    pub header: CellHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberRecord {
    pub header: CellHeader,
    pub value: f64,
}

/// A text cell pointing into the shared string table
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSstRecord {
    pub header: CellHeader,
    pub sst_index: u32,
}

/// Boolean or error cell: `value` is 0/1 or an error code depending on `is_error`
#[derive(Debug, Clone, PartialEq)]
pub struct BoolErrRecord {
    pub header: CellHeader,
    pub value: u8,
    pub is_error: bool,
}

impl BoolErrRecord {
    pub fn boolean(header: CellHeader, value: bool) -> Self {
        Self {
            header,
            value: value as u8,
            is_error: false,
        }
    }

    pub fn error(header: CellHeader, error: CellError) -> Self {
        Self {
            header,
            value: error.code(),
            is_error: true,
        }
    }

    pub fn boolean_value(&self) -> Option<bool> {
        (!self.is_error).then_some(self.value != 0)
    }

    pub fn error_value(&self) -> Option<CellError> {
        if self.is_error {
            CellError::from_code(self.value)
        } else {
            None
        }
    }
}

/// How a formula record holds its expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaBody {
    /// Ordinary formula owning its parsed tokens
    Tokens(TokenHandle),
    /// Top-left cell of an array formula; owns the group's tokens
    ArrayAnchor { range: CellRange, tokens: TokenHandle },
    /// Any other cell of an array formula; refers back to the group
    ArrayMember { range: CellRange },
}

impl FormulaBody {
    /// Tokens this record owns and must release before being discarded
    pub fn owned_tokens(&self) -> Option<TokenHandle> {
        match self {
            FormulaBody::Tokens(t) | FormulaBody::ArrayAnchor { tokens: t, .. } => Some(*t),
            FormulaBody::ArrayMember { .. } => None,
        }
    }

    pub fn array_range(&self) -> Option<CellRange> {
        match self {
            FormulaBody::Tokens(_) => None,
            FormulaBody::ArrayAnchor { range, .. } | FormulaBody::ArrayMember { range } => {
                Some(*range)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaRecord {
    pub header: CellHeader,
    pub body: FormulaBody,
    pub cached: CachedResult,
}

/// The record bound to a cell; the variant is the cell's kind
///
/// Cloning copies token handles, not the tokens behind them.
#[derive(Debug, Clone, PartialEq)]
pub enum CellRecord {
    Blank(BlankRecord),
    Number(NumberRecord),
    LabelSst(LabelSstRecord),
    BoolErr(BoolErrRecord),
    Formula(FormulaRecord),
}

impl CellRecord {
    pub fn blank(row: u32, col: u16, xf_index: u16) -> Self {
        CellRecord::Blank(BlankRecord {
            header: CellHeader::new(row, col, xf_index),
        })
    }

    pub fn kind(&self) -> CellKind {
        match self {
            CellRecord::Blank(_) => CellKind::Blank,
            CellRecord::Number(_) => CellKind::Numeric,
            CellRecord::LabelSst(_) => CellKind::String,
            CellRecord::Formula(_) => CellKind::Formula,
            CellRecord::BoolErr(r) if r.is_error => CellKind::Error,
            CellRecord::BoolErr(_) => CellKind::Boolean,
        }
    }

    pub fn header(&self) -> &CellHeader {
        match self {
            CellRecord::Blank(r) => &r.header,
            CellRecord::Number(r) => &r.header,
            CellRecord::LabelSst(r) => &r.header,
            CellRecord::BoolErr(r) => &r.header,
            CellRecord::Formula(r) => &r.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut CellHeader {
        match self {
            CellRecord::Blank(r) => &mut r.header,
            CellRecord::Number(r) => &mut r.header,
            CellRecord::LabelSst(r) => &mut r.header,
            CellRecord::BoolErr(r) => &mut r.header,
            CellRecord::Formula(r) => &mut r.header,
        }
    }

    pub fn row(&self) -> u32 {
        self.header().row
    }

    pub fn col(&self) -> u16 {
        self.header().col
    }

    pub fn xf_index(&self) -> u16 {
        self.header().xf_index
    }

    pub fn formula(&self) -> Option<&FormulaRecord> {
        match self {
            CellRecord::Formula(f) => Some(f),
            _ => None,
        }
    }

    pub fn formula_mut(&mut self) -> Option<&mut FormulaRecord> {
        match self {
            CellRecord::Formula(f) => Some(f),
            _ => None,
        }
    }

    /// Array formula group this cell belongs to, if any
    pub fn array_range(&self) -> Option<CellRange> {
        self.formula().and_then(|f| f.body.array_range())
    }
}

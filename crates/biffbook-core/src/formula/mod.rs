//! The formula collaborator seam
//!
//! The document model never parses or evaluates formulas itself. Formula cells
//! and defined names hold opaque [`TokenHandle`]s issued by a
//! [`FormulaEngine`]; the model tells the engine when tokens are discarded and
//! when rows move so that references can be rewritten.

mod text;

use std::fmt;

use crate::error::Result;

pub use text::{shift_formula_text, TextFormulaEngine};

/// Opaque handle to parsed formula tokens held by a [`FormulaEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenHandle(pub(crate) u32);

impl TokenHandle {
    pub fn new(id: u32) -> Self {
        TokenHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Where a set of formula tokens lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaHost {
    /// Cell formulas (or sheet-scoped names) of the sheet at this index
    Sheet(usize),
    /// Workbook-scoped defined names
    Workbook,
}

/// A bulk row move, as seen by formula references
#[derive(Debug, Clone, Copy)]
pub struct RowShift<'a> {
    /// Index of the sheet whose rows move
    pub sheet: usize,
    pub first_row: u32,
    pub last_row: u32,
    pub delta: i64,
    /// Names of every sheet, by index
    pub sheet_names: &'a [String],
}

impl RowShift<'_> {
    pub fn sheet_name(&self) -> &str {
        self.sheet_names
            .get(self.sheet)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Whether `row` is part of the moved block
    pub fn moves_row(&self, row: u32) -> bool {
        row >= self.first_row && row <= self.last_row
    }

    /// Whether `row` receives moved content without being moved itself
    pub fn overwrites_row(&self, row: u32) -> bool {
        let dest_first = self.first_row as i64 + self.delta;
        let dest_last = self.last_row as i64 + self.delta;
        let row = row as i64;
        row >= dest_first && row <= dest_last && !self.moves_row(row as u32)
    }
}

/// Parser/rewriter for formula tokens
///
/// Implementations own the tokens behind every handle they issue.
pub trait FormulaEngine: fmt::Debug {
    /// Parse formula text (with or without a leading `=`)
    fn parse(&mut self, text: &str) -> Result<TokenHandle>;

    /// Render tokens back to formula text, without the leading `=`
    fn to_text(&self, tokens: TokenHandle) -> Result<String>;

    /// The owner of `tokens` is about to discard them
    fn formula_changing(&mut self, tokens: TokenHandle);

    /// Rewrite references in `tokens` for a row shift; returns how many changed
    fn adjust_row_shift(
        &mut self,
        host: FormulaHost,
        tokens: &[TokenHandle],
        shift: &RowShift<'_>,
    ) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_shift_regions() {
        let names = vec!["Sheet1".to_string()];
        let shift = RowShift {
            sheet: 0,
            first_row: 2,
            last_row: 4,
            delta: 2,
            sheet_names: &names,
        };
        assert!(shift.moves_row(2));
        assert!(!shift.overwrites_row(4));
        assert!(shift.overwrites_row(5));
        assert!(shift.overwrites_row(6));
        assert!(!shift.overwrites_row(7));
        assert_eq!(shift.sheet_name(), "Sheet1");
    }
}

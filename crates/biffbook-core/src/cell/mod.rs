//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] / [`CellRange`] - A cell's location (e.g., "A1") and ranges
//! - [`CellRecord`] - The record bound to a cell, one variant per [`CellKind`]
//! - [`Cell`] / [`CellMut`] - Views computed on demand over a record
//!
//! A view borrows the record together with the workbook tables the record
//! refers to, so reading text resolves the shared string and writing a formula
//! goes through the formula engine.

mod address;
mod date;
mod kind;
mod record;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use date::{date_to_serial, parse_date_text, serial_to_date};
pub(crate) use kind::bool_to_text;
pub use kind::{number_to_text, CachedResult, CellError, CellKind};
pub use record::{
    BlankRecord, BoolErrRecord, CellHeader, CellRecord, FormulaBody, FormulaRecord, LabelSstRecord,
    NumberRecord,
};

use chrono::NaiveDateTime;

use crate::array_formula::ArrayFormulaRegistry;
use crate::error::{Error, Result};
use crate::formula::{FormulaEngine, TokenHandle};
use crate::strings::{SharedStringTable, UnicodeString};
use crate::style::{FontTable, StyleHandle, StyleTable};

/// The value a cell presents to accessors
///
/// Formula cells present their cached result.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    Blank,
    Number(f64),
    Text(&'a str),
    Boolean(bool),
    Error(CellError),
}

impl Scalar<'_> {
    fn to_text(self) -> String {
        match self {
            Scalar::Blank => String::new(),
            Scalar::Number(n) => number_to_text(n),
            Scalar::Text(s) => s.to_string(),
            Scalar::Boolean(b) => bool_to_text(b).to_string(),
            Scalar::Error(e) => e.as_str().to_string(),
        }
    }

    fn to_number(self) -> Result<f64> {
        match self {
            Scalar::Blank => Ok(0.0),
            Scalar::Number(n) => Ok(n),
            Scalar::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| Error::not_convertible(s, "number")),
            Scalar::Error(e) => Err(Error::not_convertible(e.as_str(), "number")),
        }
    }

    fn to_bool(self) -> Result<bool> {
        match self {
            Scalar::Blank => Ok(false),
            Scalar::Number(n) => Ok(n != 0.0),
            Scalar::Boolean(b) => Ok(b),
            Scalar::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(Error::not_convertible(s, "boolean"))
                }
            }
            Scalar::Error(e) => Err(Error::not_convertible(e.as_str(), "boolean")),
        }
    }

    fn to_error(self) -> CellError {
        match self {
            Scalar::Error(e) => e,
            Scalar::Text(s) => CellError::from_text(s).unwrap_or(CellError::Value),
            _ => CellError::Value,
        }
    }

    fn to_cached(self) -> CachedResult {
        match self {
            Scalar::Blank => CachedResult::String(String::new()),
            Scalar::Number(n) => CachedResult::Number(n),
            Scalar::Text(s) => CachedResult::String(s.to_string()),
            Scalar::Boolean(b) => CachedResult::Boolean(b),
            Scalar::Error(e) => CachedResult::Error(e),
        }
    }

    /// Formula text evaluating to this constant
    fn to_formula_literal(self) -> String {
        match self {
            Scalar::Blank => "\"\"".to_string(),
            Scalar::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            other => other.to_text(),
        }
    }
}

/// Infinities and NaN have no numeric representation in a cell
fn degrade_number(value: f64) -> std::result::Result<f64, CellError> {
    if value.is_nan() {
        Err(CellError::Num)
    } else if value.is_infinite() {
        Err(CellError::Div0)
    } else {
        Ok(value)
    }
}

/// Read-only view of a cell
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    record: &'a CellRecord,
    /// Tokens of the owning array group's anchor, for array member cells
    anchor_tokens: Option<TokenHandle>,
    strings: &'a SharedStringTable,
    engine: &'a dyn FormulaEngine,
    date_1904: bool,
}

impl<'a> Cell<'a> {
    pub(crate) fn new(
        record: &'a CellRecord,
        anchor_tokens: Option<TokenHandle>,
        strings: &'a SharedStringTable,
        engine: &'a dyn FormulaEngine,
        date_1904: bool,
    ) -> Self {
        Self {
            record,
            anchor_tokens,
            strings,
            engine,
            date_1904,
        }
    }

    pub fn record(&self) -> &'a CellRecord {
        self.record
    }

    pub fn row(&self) -> u32 {
        self.record.row()
    }

    pub fn col(&self) -> u16 {
        self.record.col()
    }

    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row(), self.col())
    }

    pub fn kind(&self) -> CellKind {
        self.record.kind()
    }

    /// Kind of the cached result, for formula cells only
    pub fn cached_kind(&self) -> Option<CellKind> {
        self.record.formula().map(|f| f.cached.kind())
    }

    pub fn style_index(&self) -> u16 {
        self.record.xf_index()
    }

    /// Range of the array formula this cell belongs to
    pub fn array_formula_range(&self) -> Option<CellRange> {
        self.record.array_range()
    }

    pub fn is_formula(&self) -> bool {
        self.kind() == CellKind::Formula
    }

    fn scalar(&self) -> Result<Scalar<'a>> {
        let record: &'a CellRecord = self.record;
        Ok(match record {
            CellRecord::Blank(_) => Scalar::Blank,
            CellRecord::Number(r) => Scalar::Number(r.value),
            CellRecord::LabelSst(r) => Scalar::Text(self.strings.resolve(r.sst_index)?),
            CellRecord::BoolErr(r) => match (r.boolean_value(), r.error_value()) {
                (Some(b), _) => Scalar::Boolean(b),
                (None, Some(e)) => Scalar::Error(e),
                (None, None) => Scalar::Error(CellError::Value),
            },
            CellRecord::Formula(f) => match &f.cached {
                CachedResult::Number(n) => Scalar::Number(*n),
                CachedResult::String(s) => Scalar::Text(s.as_str()),
                CachedResult::Boolean(b) => Scalar::Boolean(*b),
                CachedResult::Error(e) => Scalar::Error(*e),
            },
        })
    }

    fn mismatch(&self, expected: CellKind) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.cached_kind().unwrap_or_else(|| self.kind()),
            formula_cell: self.is_formula(),
        }
    }

    pub fn number_value(&self) -> Result<f64> {
        match self.record {
            CellRecord::Number(r) => Ok(r.value),
            CellRecord::Formula(FormulaRecord {
                cached: CachedResult::Number(n),
                ..
            }) => Ok(*n),
            _ => Err(self.mismatch(CellKind::Numeric)),
        }
    }

    pub fn string_value(&self) -> Result<&'a str> {
        let record: &'a CellRecord = self.record;
        match record {
            CellRecord::LabelSst(r) => self.strings.resolve(r.sst_index),
            CellRecord::Formula(FormulaRecord {
                cached: CachedResult::String(s),
                ..
            }) => Ok(s.as_str()),
            _ => Err(self.mismatch(CellKind::String)),
        }
    }

    /// Text with its formatting runs; formula results carry no runs
    pub fn rich_string_value(&self) -> Result<UnicodeString> {
        match self.record {
            CellRecord::LabelSst(r) => self
                .strings
                .get(r.sst_index)
                .cloned()
                .ok_or(Error::InvalidStringIndex(r.sst_index)),
            CellRecord::Formula(FormulaRecord {
                cached: CachedResult::String(s),
                ..
            }) => Ok(UnicodeString::new(s)),
            _ => Err(self.mismatch(CellKind::String)),
        }
    }

    pub fn bool_value(&self) -> Result<bool> {
        match self.record {
            CellRecord::BoolErr(r) if !r.is_error => Ok(r.value != 0),
            CellRecord::Formula(FormulaRecord {
                cached: CachedResult::Boolean(b),
                ..
            }) => Ok(*b),
            _ => Err(self.mismatch(CellKind::Boolean)),
        }
    }

    pub fn error_value(&self) -> Result<CellError> {
        match self.record {
            CellRecord::BoolErr(r) if r.is_error => {
                Ok(r.error_value().unwrap_or(CellError::Value))
            }
            CellRecord::Formula(FormulaRecord {
                cached: CachedResult::Error(e),
                ..
            }) => Ok(*e),
            _ => Err(self.mismatch(CellKind::Error)),
        }
    }

    /// Numeric value read as a date in the workbook's date system
    pub fn date_value(&self) -> Result<NaiveDateTime> {
        let serial = self.number_value()?;
        serial_to_date(serial, self.date_1904)
            .ok_or_else(|| Error::not_convertible(number_to_text(serial), "date"))
    }

    fn tokens(&self) -> Option<TokenHandle> {
        let body = self.record.formula()?.body;
        body.owned_tokens().or(self.anchor_tokens)
    }

    /// Formula text without the leading `=`
    ///
    /// Array member cells report the formula of their group.
    pub fn formula_text(&self) -> Result<String> {
        if !self.is_formula() {
            return Err(Error::TypeMismatch {
                expected: CellKind::Formula,
                actual: self.kind(),
                formula_cell: false,
            });
        }
        let tokens = self
            .tokens()
            .ok_or_else(|| Error::NotArrayFormula(self.address().to_a1_string()))?;
        self.engine.to_text(tokens)
    }

    /// Display text of the value, never evaluating formulas
    ///
    /// Blank gives `""`, booleans `TRUE`/`FALSE`, errors their symbol and
    /// formulas the text of their cached result.
    pub fn convert_to_string(&self) -> Result<String> {
        Ok(self.scalar()?.to_text())
    }
}

/// Workbook tables a [`CellMut`] writes through
pub(crate) struct CellContext<'a> {
    pub strings: &'a mut SharedStringTable,
    pub engine: &'a mut dyn FormulaEngine,
    pub styles: &'a StyleTable,
    pub fonts: &'a FontTable,
    pub date_1904: bool,
}

/// Mutable view of a cell
///
/// Every setter either commits fully or leaves the old record bound.
pub struct CellMut<'a> {
    record: &'a mut CellRecord,
    arrays: &'a mut ArrayFormulaRegistry,
    anchor_tokens: Option<TokenHandle>,
    ctx: CellContext<'a>,
}

impl<'a> CellMut<'a> {
    pub(crate) fn new(
        record: &'a mut CellRecord,
        arrays: &'a mut ArrayFormulaRegistry,
        anchor_tokens: Option<TokenHandle>,
        ctx: CellContext<'a>,
    ) -> Self {
        Self {
            record,
            arrays,
            anchor_tokens,
            ctx,
        }
    }

    /// Read-only view of the same cell
    pub fn as_cell(&self) -> Cell<'_> {
        Cell::new(
            &*self.record,
            self.anchor_tokens,
            &*self.ctx.strings,
            &*self.ctx.engine,
            self.ctx.date_1904,
        )
    }

    pub fn row(&self) -> u32 {
        self.record.row()
    }

    pub fn col(&self) -> u16 {
        self.record.col()
    }

    pub fn kind(&self) -> CellKind {
        self.record.kind()
    }

    pub fn style_index(&self) -> u16 {
        self.record.xf_index()
    }

    fn header(&self) -> CellHeader {
        *self.record.header()
    }

    fn check_not_partial(&self) -> Result<()> {
        match self.record.array_range() {
            Some(range) if !range.is_single_cell() => Err(Error::ArrayFormulaPartial(
                CellAddress::new(self.row(), self.col()).to_a1_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Release what the current record owns before it is replaced
    fn release(&mut self) {
        let Some(formula) = self.record.formula() else {
            return;
        };
        if let Some(tokens) = formula.body.owned_tokens() {
            self.ctx.engine.formula_changing(tokens);
        }
        if let Some(range) = formula.body.array_range() {
            self.arrays.deregister(&range);
        }
    }

    fn replace(&mut self, record: CellRecord) {
        self.release();
        *self.record = record;
    }

    fn current(&self) -> Result<Scalar<'_>> {
        self.as_cell().scalar()
    }

    /// Change the cell's kind
    ///
    /// With `preserve_value` the current value (a formula's cached result) is
    /// converted to the new kind; otherwise the new kind's empty value is
    /// stored. A cell already of `kind` is left untouched.
    pub fn set_kind(&mut self, kind: CellKind, preserve_value: bool) -> Result<()> {
        if self.kind() == kind {
            return Ok(());
        }
        self.check_not_partial()?;
        let header = self.header();

        let record = match kind {
            CellKind::Blank => CellRecord::Blank(BlankRecord { header }),
            CellKind::Numeric => {
                let value = if preserve_value {
                    self.current()?.to_number()?
                } else {
                    0.0
                };
                CellRecord::Number(NumberRecord { header, value })
            }
            CellKind::String => {
                let text = if preserve_value {
                    self.current()?.to_text()
                } else {
                    String::new()
                };
                let sst_index = self.ctx.strings.intern(text);
                CellRecord::LabelSst(LabelSstRecord { header, sst_index })
            }
            CellKind::Boolean => {
                let value = if preserve_value {
                    self.current()?.to_bool()?
                } else {
                    false
                };
                CellRecord::BoolErr(BoolErrRecord::boolean(header, value))
            }
            CellKind::Error => {
                let error = if preserve_value {
                    self.current()?.to_error()
                } else {
                    CellError::Value
                };
                CellRecord::BoolErr(BoolErrRecord::error(header, error))
            }
            CellKind::Formula => {
                let current = if preserve_value {
                    self.current()?
                } else {
                    Scalar::Blank
                };
                let literal = current.to_formula_literal();
                let cached = current.to_cached();
                let tokens = self.ctx.engine.parse(&literal)?;
                CellRecord::Formula(FormulaRecord {
                    header,
                    body: FormulaBody::Tokens(tokens),
                    cached,
                })
            }
        };
        self.replace(record);
        Ok(())
    }

    /// Store a number; infinities become `#DIV/0!` and NaN becomes `#NUM!`
    pub fn set_number(&mut self, value: f64) -> Result<()> {
        let value = match degrade_number(value) {
            Ok(v) => v,
            Err(e) => return self.set_error(e),
        };
        if let CellRecord::Number(r) = &mut *self.record {
            r.value = value;
            return Ok(());
        }
        self.check_not_partial()?;
        let header = self.header();
        self.replace(CellRecord::Number(NumberRecord { header, value }));
        Ok(())
    }

    pub fn set_string<S: AsRef<str>>(&mut self, text: S) -> Result<()> {
        self.check_not_partial()?;
        let sst_index = self.ctx.strings.intern(text);
        self.bind_string(sst_index);
        Ok(())
    }

    /// Store formatted text; every run must name an existing font
    pub fn set_rich_string(&mut self, value: UnicodeString) -> Result<()> {
        self.check_not_partial()?;
        for run in value.runs() {
            self.ctx.fonts.check(run.font_index)?;
        }
        let sst_index = self.ctx.strings.intern_rich(value);
        self.bind_string(sst_index);
        Ok(())
    }

    fn bind_string(&mut self, sst_index: u32) {
        if let CellRecord::LabelSst(r) = &mut *self.record {
            r.sst_index = sst_index;
            return;
        }
        let header = self.header();
        self.replace(CellRecord::LabelSst(LabelSstRecord { header, sst_index }));
    }

    pub fn set_bool(&mut self, value: bool) -> Result<()> {
        self.check_not_partial()?;
        let header = self.header();
        self.replace(CellRecord::BoolErr(BoolErrRecord::boolean(header, value)));
        Ok(())
    }

    pub fn set_error(&mut self, error: CellError) -> Result<()> {
        self.check_not_partial()?;
        let header = self.header();
        self.replace(CellRecord::BoolErr(BoolErrRecord::error(header, error)));
        Ok(())
    }

    pub fn set_blank(&mut self) -> Result<()> {
        if self.kind() == CellKind::Blank {
            return Ok(());
        }
        self.check_not_partial()?;
        let header = self.header();
        self.replace(CellRecord::Blank(BlankRecord { header }));
        Ok(())
    }

    /// Bind a formula, keeping the cached result of a previous formula
    ///
    /// The text is parsed before anything changes, so a parse error leaves the
    /// cell as it was.
    pub fn set_formula(&mut self, text: &str) -> Result<()> {
        self.check_not_partial()?;
        let cached = match self.record.formula() {
            Some(f) => f.cached.clone(),
            None => self.current()?.to_cached(),
        };
        let tokens = self.ctx.engine.parse(text)?;
        let header = self.header();
        self.replace(CellRecord::Formula(FormulaRecord {
            header,
            body: FormulaBody::Tokens(tokens),
            cached,
        }));
        Ok(())
    }

    /// Set the last evaluated result of a formula cell
    pub fn set_cached_result(&mut self, result: CachedResult) -> Result<()> {
        let result = match result {
            CachedResult::Number(n) => match degrade_number(n) {
                Ok(n) => CachedResult::Number(n),
                Err(e) => CachedResult::Error(e),
            },
            other => other,
        };
        let kind = self.kind();
        match self.record.formula_mut() {
            Some(f) => {
                f.cached = result;
                Ok(())
            }
            None => Err(Error::TypeMismatch {
                expected: CellKind::Formula,
                actual: kind,
                formula_cell: false,
            }),
        }
    }

    /// Store a date as a serial number in the workbook's date system
    pub fn set_date(&mut self, value: NaiveDateTime) -> Result<()> {
        let serial = date_to_serial(value, self.ctx.date_1904)
            .ok_or_else(|| Error::not_convertible(value.to_string(), "date"))?;
        self.set_number(serial)
    }

    /// Parse an ISO date, date-time or time and store it as a serial number
    pub fn set_date_from_text(&mut self, text: &str) -> Result<()> {
        let serial = parse_date_text(text, self.ctx.date_1904)?;
        self.set_number(serial)
    }

    /// Apply a style from this workbook's table
    pub fn set_style(&mut self, style: StyleHandle) -> Result<()> {
        let index = self.ctx.styles.check_handle(style)?;
        self.record.header_mut().xf_index = index;
        Ok(())
    }

    pub fn set_style_index(&mut self, index: u16) -> Result<()> {
        self.ctx.styles.check_index(index)?;
        self.record.header_mut().xf_index = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::TextFormulaEngine;
    use crate::strings::FormatRun;
    use pretty_assertions::assert_eq;

    struct Fixture {
        record: CellRecord,
        arrays: ArrayFormulaRegistry,
        strings: SharedStringTable,
        engine: TextFormulaEngine,
        styles: StyleTable,
        fonts: FontTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                record: CellRecord::blank(3, 2, 15),
                arrays: ArrayFormulaRegistry::new(),
                strings: SharedStringTable::new(),
                engine: TextFormulaEngine::new(),
                styles: StyleTable::new(),
                fonts: FontTable::new(),
            }
        }

        fn cell_mut(&mut self) -> CellMut<'_> {
            CellMut::new(
                &mut self.record,
                &mut self.arrays,
                None,
                CellContext {
                    strings: &mut self.strings,
                    engine: &mut self.engine,
                    styles: &self.styles,
                    fonts: &self.fonts,
                    date_1904: false,
                },
            )
        }

        fn cell(&self) -> Cell<'_> {
            Cell::new(&self.record, None, &self.strings, &self.engine, false)
        }
    }

    fn successful_accessors(cell: &Cell<'_>) -> usize {
        [
            cell.number_value().is_ok(),
            cell.string_value().is_ok(),
            cell.bool_value().is_ok(),
            cell.error_value().is_ok(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }

    #[test]
    fn test_kind_exclusivity() {
        let mut fx = Fixture::new();
        assert_eq!(successful_accessors(&fx.cell()), 0);

        fx.cell_mut().set_number(1.5).unwrap();
        assert_eq!(successful_accessors(&fx.cell()), 1);
        fx.cell_mut().set_string("x").unwrap();
        assert_eq!(successful_accessors(&fx.cell()), 1);
        fx.cell_mut().set_bool(true).unwrap();
        assert_eq!(successful_accessors(&fx.cell()), 1);
        fx.cell_mut().set_error(CellError::Na).unwrap();
        assert_eq!(successful_accessors(&fx.cell()), 1);
        fx.cell_mut().set_formula("=A1+1").unwrap();
        assert_eq!(successful_accessors(&fx.cell()), 1);
    }

    #[test]
    fn test_type_mismatch_reports_kinds() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_formula("SUM(A1:A3)").unwrap();
        fx.cell_mut()
            .set_cached_result(CachedResult::String("total".into()))
            .unwrap();

        assert_eq!(
            fx.cell().number_value(),
            Err(Error::TypeMismatch {
                expected: CellKind::Numeric,
                actual: CellKind::String,
                formula_cell: true,
            })
        );
        assert_eq!(fx.cell().string_value(), Ok("total"));
        assert_eq!(fx.cell().formula_text().unwrap(), "SUM(A1:A3)");
    }

    #[test]
    fn test_special_values_degrade() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_number(f64::INFINITY).unwrap();
        assert_eq!(fx.cell().error_value(), Ok(CellError::Div0));
        fx.cell_mut().set_number(f64::NEG_INFINITY).unwrap();
        assert_eq!(fx.cell().error_value(), Ok(CellError::Div0));
        fx.cell_mut().set_number(f64::NAN).unwrap();
        assert_eq!(fx.cell().error_value(), Ok(CellError::Num));

        fx.cell_mut().set_formula("1/0").unwrap();
        fx.cell_mut()
            .set_cached_result(CachedResult::Number(f64::INFINITY))
            .unwrap();
        assert_eq!(fx.cell().error_value(), Ok(CellError::Div0));
    }

    #[test]
    fn test_set_kind_preserving() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_kind(CellKind::Numeric, true).unwrap();
        assert_eq!(fx.cell().number_value(), Ok(0.0));

        fx.cell_mut().set_number(42.5).unwrap();
        fx.cell_mut().set_kind(CellKind::String, true).unwrap();
        assert_eq!(fx.cell().string_value(), Ok("42.5"));

        fx.cell_mut().set_kind(CellKind::Numeric, true).unwrap();
        assert_eq!(fx.cell().number_value(), Ok(42.5));

        fx.cell_mut().set_kind(CellKind::Boolean, true).unwrap();
        assert_eq!(fx.cell().bool_value(), Ok(true));
        fx.cell_mut().set_kind(CellKind::String, true).unwrap();
        assert_eq!(fx.cell().string_value(), Ok("TRUE"));
    }

    #[test]
    fn test_failed_conversion_keeps_record() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_string("abc").unwrap();
        let before = fx.record.clone();
        assert_eq!(
            fx.cell_mut().set_kind(CellKind::Numeric, true),
            Err(Error::not_convertible("abc", "number"))
        );
        assert_eq!(fx.record, before);
    }

    #[test]
    fn test_formula_from_value() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_string("say \"hi\"").unwrap();
        fx.cell_mut().set_kind(CellKind::Formula, true).unwrap();
        assert_eq!(fx.cell().formula_text().unwrap(), "\"say \"\"hi\"\"\"");
        assert_eq!(fx.cell().string_value(), Ok("say \"hi\""));
    }

    #[test]
    fn test_leaving_formula_releases_tokens() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_formula("A1*2").unwrap();
        assert_eq!(fx.engine.live_count(), 1);
        fx.cell_mut().set_formula("A1*3").unwrap();
        assert_eq!(fx.engine.live_count(), 1);
        fx.cell_mut().set_blank().unwrap();
        assert_eq!(fx.engine.live_count(), 0);
    }

    #[test]
    fn test_bad_formula_leaves_cell() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_number(7.0).unwrap();
        assert!(fx.cell_mut().set_formula("SUM(A1").is_err());
        assert_eq!(fx.cell().number_value(), Ok(7.0));
    }

    #[test]
    fn test_array_member_rejects_edits() {
        let mut fx = Fixture::new();
        let range = CellRange::from_indices(3, 2, 4, 2);
        fx.arrays.register(range);
        fx.record = CellRecord::Formula(FormulaRecord {
            header: CellHeader::new(3, 2, 0),
            body: FormulaBody::ArrayMember { range },
            cached: CachedResult::default(),
        });

        let err = Error::ArrayFormulaPartial("C4".into());
        assert_eq!(fx.cell_mut().set_blank(), Err(err.clone()));
        assert_eq!(fx.cell_mut().set_number(1.0), Err(err.clone()));
        assert_eq!(fx.cell_mut().set_kind(CellKind::String, false), Err(err));
        assert!(fx.cell_mut().set_cached_result(CachedResult::Number(2.0)).is_ok());
        assert_eq!(fx.cell().array_formula_range(), Some(range));
    }

    #[test]
    fn test_style_survives_transitions() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_style_index(16).unwrap();
        fx.cell_mut().set_number(1.0).unwrap();
        fx.cell_mut().set_string("s").unwrap();
        fx.cell_mut().set_formula("1").unwrap();
        assert_eq!(fx.cell().style_index(), 16);
        assert_eq!(
            fx.cell_mut().set_style_index(999),
            Err(Error::InvalidStyleIndex(999))
        );
    }

    #[test]
    fn test_foreign_style_rejected() {
        let mut fx = Fixture::new();
        let mut other = StyleTable::new();
        let handle = other.create_style().unwrap();
        assert_eq!(fx.cell_mut().set_style(handle), Err(Error::ForeignStyle));
    }

    #[test]
    fn test_rich_string_checks_fonts() {
        let mut fx = Fixture::new();
        let bad = UnicodeString::with_runs("ab", vec![FormatRun::new(1, 40)]);
        assert_eq!(
            fx.cell_mut().set_rich_string(bad),
            Err(Error::InvalidFontIndex(40))
        );
        let good = UnicodeString::with_runs("ab", vec![FormatRun::new(1, 1)]);
        fx.cell_mut().set_rich_string(good.clone()).unwrap();
        assert_eq!(fx.cell().rich_string_value(), Ok(good));
    }

    #[test]
    fn test_dates() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_date_from_text("2024-03-15").unwrap();
        let date = fx.cell().date_value().unwrap();
        assert_eq!(date.to_string(), "2024-03-15 00:00:00");
        assert!(matches!(
            fx.cell_mut().set_date_from_text("next tuesday"),
            Err(Error::NotConvertible { target: "date", .. })
        ));
    }

    #[test]
    fn test_date_past_year_9999_is_not_convertible() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_number(1e20).unwrap();
        assert!(matches!(
            fx.cell().date_value(),
            Err(Error::NotConvertible { target: "date", .. })
        ));
        fx.cell_mut().set_number(2_958_465.5).unwrap();
        assert_eq!(
            fx.cell().date_value().unwrap().to_string(),
            "9999-12-31 12:00:00"
        );
    }

    #[test]
    fn test_error_does_not_become_boolean() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_error(CellError::Na).unwrap();
        let before = fx.record.clone();
        assert_eq!(
            fx.cell_mut().set_kind(CellKind::Boolean, true),
            Err(Error::not_convertible("#N/A", "boolean"))
        );
        assert_eq!(fx.record, before);
    }

    #[test]
    fn test_fresh_formula_agrees_with_cached_result() {
        let mut fx = Fixture::new();
        fx.cell_mut().set_number(42.0).unwrap();
        fx.cell_mut().set_kind(CellKind::Formula, false).unwrap();
        assert_eq!(fx.cell().formula_text().unwrap(), "\"\"");
        assert_eq!(fx.cell().cached_kind(), Some(CellKind::String));
        assert_eq!(fx.cell().string_value(), Ok(""));
    }

    #[test]
    fn test_convert_to_string() {
        let mut fx = Fixture::new();
        assert_eq!(fx.cell().convert_to_string().unwrap(), "");
        fx.cell_mut().set_error(CellError::Ref).unwrap();
        assert_eq!(fx.cell().convert_to_string().unwrap(), "#REF!");
        fx.cell_mut().set_formula("A1").unwrap();
        fx.cell_mut()
            .set_cached_result(CachedResult::Boolean(false))
            .unwrap();
        assert_eq!(fx.cell().convert_to_string().unwrap(), "FALSE");
    }
}

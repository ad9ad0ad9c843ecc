//! Workbook type - the main document structure

use std::cell::RefCell;

use crate::cell::{
    CachedResult, Cell, CellAddress, CellContext, CellHeader, CellKind, CellMut, CellRange,
    CellRecord, FormulaBody, FormulaRecord,
};
use crate::error::{Error, Result};
use crate::formula::{FormulaEngine, TextFormulaEngine};
use crate::names::{validate_name, DefinedName, DefinedNames, NameScope};
use crate::row::MissingCellPolicy;
use crate::shift::{RowShifter, ShiftOptions, ShiftOutcome};
use crate::strings::SharedStringTable;
use crate::style::optimise::{optimise_fonts, optimise_styles, style_usage};
use crate::style::{
    builtin_format, ExtendedFormat, Font, FontTable, FormatTable, StyleHandle, StyleTable,
    MAX_PARENT_DEPTH,
};
use crate::worksheet::{check_bounds, check_range, discard_record, Worksheet};
use crate::{FIRST_USER_FORMAT, FIRST_USER_STYLE, MAX_SHEET_NAME_LEN};

/// A workbook (spreadsheet document)
///
/// A workbook contains one or more worksheets and the tables their cells
/// refer to: shared strings, styles, fonts, number formats and defined names.
#[derive(Debug)]
pub struct Workbook {
    /// Worksheets in the workbook
    worksheets: Vec<Worksheet>,
    /// Workbook settings
    settings: WorkbookSettings,
    /// Active sheet index
    active_sheet: usize,
    strings: SharedStringTable,
    styles: StyleTable,
    fonts: FontTable,
    formats: FormatTable,
    /// Defined names
    names: DefinedNames,
    engine: Box<dyn FormulaEngine>,
    /// Last format index looked up by `data_format_string`, with its text
    format_cache: RefCell<Option<(u16, String)>>,
}

impl Workbook {
    /// Create a new empty workbook with one worksheet
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.worksheets.push(Worksheet::new("Sheet1"));
        wb
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self::with_engine(Box::new(TextFormulaEngine::new()))
    }

    /// Create an empty workbook whose formulas are handled by `engine`
    pub fn with_engine(engine: Box<dyn FormulaEngine>) -> Self {
        Self {
            worksheets: Vec::new(),
            settings: WorkbookSettings::default(),
            active_sheet: 0,
            strings: SharedStringTable::new(),
            styles: StyleTable::new(),
            fonts: FontTable::new(),
            formats: FormatTable::new(),
            names: DefinedNames::new(),
            engine,
            format_cache: RefCell::new(None),
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Get a mutable worksheet by name
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    /// Get the index of a worksheet by name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    fn sheet(&self, index: usize) -> Result<&Worksheet> {
        self.worksheets
            .get(index)
            .ok_or(Error::SheetOutOfBounds(index, self.worksheets.len()))
    }

    fn sheet_mut(&mut self, index: usize) -> Result<&mut Worksheet> {
        let count = self.worksheets.len();
        self.worksheets
            .get_mut(index)
            .ok_or(Error::SheetOutOfBounds(index, count))
    }

    /// A sheet together with the formula engine, borrowed apart
    fn sheet_and_engine(&mut self, index: usize) -> Result<(&mut Worksheet, &mut dyn FormulaEngine)> {
        let count = self.worksheets.len();
        let ws = self
            .worksheets
            .get_mut(index)
            .ok_or(Error::SheetOutOfBounds(index, count))?;
        let engine: &mut dyn FormulaEngine = self.engine.as_mut();
        Ok((ws, engine))
    }

    /// Add a new worksheet with default name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a new worksheet with specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;

        let index = self.worksheets.len();
        self.worksheets.push(Worksheet::new(name));

        Ok(index)
    }

    /// Insert a worksheet at a specific index
    pub fn insert_worksheet(&mut self, index: usize, name: &str) -> Result<()> {
        if index > self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }

        self.validate_sheet_name(name)?;

        self.worksheets.insert(index, Worksheet::new(name));
        self.names.sheet_inserted(index);

        // Adjust active sheet index if needed
        if self.active_sheet >= index && self.worksheets.len() > 1 {
            self.active_sheet += 1;
        }

        Ok(())
    }

    /// Remove a worksheet by index
    ///
    /// The sheet's formulas and sheet-scoped names are released.
    pub fn remove_worksheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }

        let worksheet = self.worksheets.remove(index);
        for tokens in worksheet.formula_tokens() {
            self.engine.formula_changing(tokens);
        }
        for name in self.names.sheet_removed(index) {
            self.engine.formula_changing(name.tokens);
        }

        // Adjust active sheet index
        if self.worksheets.is_empty() {
            self.active_sheet = 0;
        } else if self.active_sheet > index || self.active_sheet >= self.worksheets.len() {
            self.active_sheet -= 1;
        }

        Ok(())
    }

    /// Move a worksheet to a new position
    pub fn move_worksheet(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(from, self.worksheets.len()));
        }
        if to >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(to, self.worksheets.len()));
        }

        let worksheet = self.worksheets.remove(from);
        self.worksheets.insert(to, worksheet);
        self.names.sheet_moved(from, to);
        self.active_sheet = crate::names::moved_position(self.active_sheet, from, to);

        Ok(())
    }

    /// Rename a worksheet
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        // Check index first
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }

        // Validate the new name (excluding current sheet from duplicate check)
        self.validate_sheet_name_excluding(new_name, Some(index))?;

        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    /// Get the active sheet index
    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet index
    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    /// Get workbook settings
    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    /// Get mutable workbook settings
    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    pub fn engine(&self) -> &dyn FormulaEngine {
        self.engine.as_ref()
    }

    // ==================== Cells ====================

    /// The cell at a position, or `None` if it does not exist
    pub fn cell(&self, sheet: usize, row: u32, col: u16) -> Result<Option<Cell<'_>>> {
        let ws = self.sheet(sheet)?;
        Ok(ws.cell_record(row, col).map(|record| {
            Cell::new(
                record,
                ws.anchor_tokens(row, col),
                &self.strings,
                self.engine.as_ref(),
                self.settings.date_1904,
            )
        }))
    }

    /// Read a cell by A1 address (e.g., "B3")
    pub fn cell_by_address(&self, sheet: usize, address: &str) -> Result<Option<Cell<'_>>> {
        let addr = CellAddress::parse(address)?;
        self.cell(sheet, addr.row, addr.col)
    }

    /// Read a cell through the workbook's [`MissingCellPolicy`]
    pub fn get_cell(&mut self, sheet: usize, row: u32, col: u16) -> Result<Option<Cell<'_>>> {
        let policy = self.settings.missing_cell_policy;
        if policy == MissingCellPolicy::CreateNullAsBlank {
            self.sheet_mut(sheet)?.cell_entry(row, col)?;
        }
        let cell = self.cell(sheet, row, col)?;
        Ok(match policy {
            MissingCellPolicy::ReturnBlankAsNull => cell.filter(|c| c.kind() != CellKind::Blank),
            _ => cell,
        })
    }

    /// Writable view of a cell, creating a blank cell if none exists
    ///
    /// New cells take the row's style, or the default style.
    pub fn cell_mut(&mut self, sheet: usize, row: u32, col: u16) -> Result<CellMut<'_>> {
        let count = self.worksheets.len();
        let Self {
            worksheets,
            settings,
            strings,
            styles,
            fonts,
            engine,
            ..
        } = self;
        let ws = worksheets
            .get_mut(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, count))?;
        let anchor = ws.anchor_tokens(row, col);
        let (record, arrays) = ws.cell_entry(row, col)?;
        Ok(CellMut::new(
            record,
            arrays,
            anchor,
            CellContext {
                strings,
                engine: engine.as_mut(),
                styles,
                fonts,
                date_1904: settings.date_1904,
            },
        ))
    }

    /// Writable view of a cell by A1 address
    pub fn cell_mut_by_address(&mut self, sheet: usize, address: &str) -> Result<CellMut<'_>> {
        let addr = CellAddress::parse(address)?;
        self.cell_mut(sheet, addr.row, addr.col)
    }

    /// Replace whatever is at a position with a fresh cell of `kind`
    pub fn create_cell(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        kind: CellKind,
    ) -> Result<CellMut<'_>> {
        check_bounds(row, col)?;
        self.remove_cell(sheet, row, col)?;
        let mut cell = self.cell_mut(sheet, row, col)?;
        cell.set_kind(kind, false)?;
        Ok(cell)
    }

    /// Remove a cell; returns whether one existed
    ///
    /// The row itself stays, even when it has no cells left.
    pub fn remove_cell(&mut self, sheet: usize, row: u32, col: u16) -> Result<bool> {
        let (ws, engine) = self.sheet_and_engine(sheet)?;
        if let Some(range) = ws.cell_record(row, col).and_then(CellRecord::array_range) {
            if !range.is_single_cell() {
                return Err(Error::ArrayFormulaPartial(
                    CellAddress::new(row, col).to_a1_string(),
                ));
            }
        }
        let Some(record) = ws.take_cell(row, col) else {
            return Ok(false);
        };
        discard_record(&record, ws.arrays_mut(), engine);
        Ok(true)
    }

    /// Remove a row and all of its cells; returns whether it existed
    pub fn remove_row(&mut self, sheet: usize, row: u32) -> Result<bool> {
        let (ws, engine) = self.sheet_and_engine(sheet)?;
        if let Some(group) = ws.array_formulas().multi_cell_in_rows(row, row) {
            return Err(Error::ArrayFormulaPartial(group.to_a1_string()));
        }
        let Some(mut removed) = ws.take_row(row) else {
            return Ok(false);
        };
        for record in removed.take_cells() {
            discard_record(&record, ws.arrays_mut(), engine);
        }
        Ok(true)
    }

    /// Apply a style to a whole row (`None` clears it)
    pub fn set_row_style(&mut self, sheet: usize, row: u32, style: Option<StyleHandle>) -> Result<()> {
        let index = style.map(|h| self.styles.check_handle(h)).transpose()?;
        self.sheet_mut(sheet)?.create_row(row)?.style_index = index;
        Ok(())
    }

    // ==================== Array formulas ====================

    /// Bind one formula to every cell of `range`
    ///
    /// The top-left cell becomes the anchor holding the formula. An existing
    /// group with exactly this range is replaced; overlapping any other group
    /// fails with [`Error::ArrayFormulaPartial`].
    pub fn set_array_formula(&mut self, sheet: usize, range: CellRange, formula: &str) -> Result<()> {
        check_range(&range)?;
        let ws = self.sheet(sheet)?;
        if let Some(group) = ws.array_formulas().intersecting_multi_cell(&range) {
            if group != range {
                return Err(Error::ArrayFormulaPartial(group.to_a1_string()));
            }
        }
        if !range.is_single_cell() {
            if let Some(existing) = ws.merged_regions().intersecting(&range) {
                return Err(Error::IntersectingRegion {
                    region: range.to_a1_string(),
                    existing: existing.to_a1_string(),
                });
            }
        }

        let tokens = self.engine.parse(formula)?;
        let (ws, engine) = self.sheet_and_engine(sheet)?;
        for addr in range.cells() {
            let previous = ws.take_cell(addr.row, addr.col);
            if let Some(record) = &previous {
                discard_record(record, ws.arrays_mut(), engine);
            }
            let xf_index = match &previous {
                Some(record) => record.xf_index(),
                None => ws.row(addr.row).and_then(|r| r.style_index).unwrap_or(0),
            };
            let body = if addr.row == range.first_row() && addr.col == range.first_col() {
                FormulaBody::ArrayAnchor { range, tokens }
            } else {
                FormulaBody::ArrayMember { range }
            };
            ws.insert_cell(CellRecord::Formula(FormulaRecord {
                header: CellHeader::new(addr.row, addr.col, xf_index),
                body,
                cached: CachedResult::default(),
            }))?;
        }
        ws.arrays_mut().register(range);
        log::debug!("array formula {range} bound on '{}'", ws.name());
        Ok(())
    }

    /// Remove the array formula containing a cell, blanking the whole group
    ///
    /// Returns the range of the removed group. Cell styles are kept.
    pub fn remove_array_formula(&mut self, sheet: usize, row: u32, col: u16) -> Result<CellRange> {
        let (ws, engine) = self.sheet_and_engine(sheet)?;
        let range = ws
            .cell_record(row, col)
            .and_then(CellRecord::array_range)
            .ok_or_else(|| Error::NotArrayFormula(CellAddress::new(row, col).to_a1_string()))?;

        for addr in range.cells() {
            let Some(record) = ws.take_cell(addr.row, addr.col) else {
                continue;
            };
            if let Some(tokens) = record.formula().and_then(|f| f.body.owned_tokens()) {
                engine.formula_changing(tokens);
            }
            ws.insert_cell(CellRecord::blank(addr.row, addr.col, record.xf_index()))?;
        }
        ws.arrays_mut().deregister(&range);
        Ok(range)
    }

    // ==================== Row shifting ====================

    /// Move rows `first..=last` of a sheet by `delta` rows
    ///
    /// Formulas anywhere in the workbook, and defined names, follow the moved
    /// rows. Fails without changing anything if the moved or overwritten rows
    /// cut through a multi-cell array formula.
    pub fn shift_rows(
        &mut self,
        sheet: usize,
        first: u32,
        last: u32,
        delta: i64,
        options: ShiftOptions,
    ) -> Result<ShiftOutcome> {
        let Self {
            worksheets,
            engine,
            names,
            ..
        } = self;
        RowShifter::new(sheet, worksheets.as_mut_slice(), engine.as_mut(), names)
            .shift(first, last, delta, options)
    }

    // ==================== Shared strings ====================

    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.strings
    }

    pub fn shared_strings_mut(&mut self) -> &mut SharedStringTable {
        &mut self.strings
    }

    // ==================== Styles ====================

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleTable {
        &mut self.styles
    }

    /// Create a new style inheriting from the default style
    pub fn create_style(&mut self) -> Result<StyleHandle> {
        self.styles.create_style()
    }

    /// Add a style after checking its font and format references
    pub fn add_style(&mut self, xf: ExtendedFormat) -> Result<StyleHandle> {
        if let Some(font) = xf.font_index {
            self.fonts.check(font)?;
        }
        self.styles.add(xf)
    }

    pub fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontTable {
        &mut self.fonts
    }

    pub fn add_font(&mut self, font: Font) -> u16 {
        self.fonts.add(font)
    }

    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }

    /// Index of a number format, adding it as a custom format if new
    pub fn add_format(&mut self, code: &str) -> u16 {
        self.invalidate_format_cache();
        self.formats.get_or_add(code)
    }

    /// Bind a format index to a format string (used when loading)
    pub fn insert_format(&mut self, id: u16, code: &str) {
        self.invalidate_format_cache();
        self.formats.insert(id, code);
    }

    /// Set the number format of a style
    pub fn set_format(&mut self, style: StyleHandle, format_index: u16) -> Result<()> {
        let index = self.styles.check_handle(style)?;
        self.styles.get_mut(index)?.format_index = Some(format_index);
        self.invalidate_format_cache();
        Ok(())
    }

    /// Number format string of a style, resolved through its parents
    ///
    /// Unknown format indices read as `General`.
    pub fn data_format_string(&self, style_index: u16) -> Result<String> {
        let format = self.styles.resolve(style_index)?.format_index;
        if let Some((cached, text)) = self.format_cache.borrow().as_ref() {
            if *cached == format {
                return Ok(text.clone());
            }
        }
        let text = self
            .formats
            .format_string(format)
            .unwrap_or("General")
            .to_string();
        *self.format_cache.borrow_mut() = Some((format, text.clone()));
        Ok(text)
    }

    /// Forget the last looked-up format string
    pub fn invalidate_format_cache(&self) {
        self.format_cache.borrow_mut().take();
    }

    /// How many cells and rows refer to each style index
    pub fn style_usage(&self) -> Vec<usize> {
        style_usage(self.styles.len(), &self.worksheets)
    }

    /// Merge equal styles and drop unused user styles; returns how many went
    pub fn optimise_styles(&mut self) -> usize {
        self.invalidate_format_cache();
        optimise_styles(&mut self.styles, &mut self.worksheets)
    }

    /// Merge equal fonts and drop unused user fonts; returns how many went
    pub fn optimise_fonts(&mut self) -> usize {
        optimise_fonts(
            &mut self.fonts,
            &mut self.styles,
            &mut self.strings,
            &self.worksheets,
        )
    }

    /// Copy a style of another workbook into this one
    ///
    /// The style's user-defined parents come along, root first. Fonts are
    /// matched or added, custom formats re-registered, and a named style that
    /// already exists here by name is reused.
    pub fn clone_style_from(&mut self, other: &Workbook, style: StyleHandle) -> Result<StyleHandle> {
        let index = other.styles.check_handle(style)?;

        let mut chain = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            if chain.len() == MAX_PARENT_DEPTH || chain.contains(&i) {
                break;
            }
            chain.push(i);
            if i < FIRST_USER_STYLE {
                break;
            }
            current = other.styles.get(i).and_then(|xf| xf.parent);
        }

        let mut imported: Option<u16> = None;
        for &i in chain.iter().rev() {
            let mapped = if i < FIRST_USER_STYLE {
                i
            } else {
                self.import_style(other, i, imported)?
            };
            imported = Some(mapped);
        }
        let mapped = imported.ok_or(Error::InvalidStyleIndex(index))?;
        self.invalidate_format_cache();
        self.styles.handle(mapped)
    }

    fn import_style(&mut self, other: &Workbook, index: u16, parent: Option<u16>) -> Result<u16> {
        let source = other
            .styles
            .get(index)
            .ok_or(Error::InvalidStyleIndex(index))?;
        if let Some(existing) = source.name.as_deref().and_then(|n| self.styles.find_named(n)) {
            return Ok(existing);
        }

        let mut xf = source.clone();
        xf.parent = xf.parent.map(|_| parent.unwrap_or(0));
        if let Some(font_index) = xf.font_index {
            let font = other
                .fonts
                .get(font_index)
                .ok_or(Error::InvalidFontIndex(font_index))?;
            let local = match self.fonts.find(font) {
                Some(found) => found,
                None => self.fonts.add(font.clone()),
            };
            xf.font_index = Some(local);
        }
        if let Some(format) = xf.format_index {
            if format >= FIRST_USER_FORMAT || builtin_format(format).is_none() {
                if let Some(code) = other.formats.format_string(format) {
                    xf.format_index = Some(self.formats.get_or_add(code));
                }
            }
        }
        Ok(self.styles.add(xf)?.index())
    }

    // ==================== Defined names ====================

    /// Define a name referring to a formula
    ///
    /// # Example
    /// ```
    /// use biffbook_core::{NameScope, Workbook};
    ///
    /// let mut wb = Workbook::new();
    /// wb.define_name("TaxRate", "Sheet1!$B$1", NameScope::Workbook).unwrap();
    /// ```
    pub fn define_name(&mut self, name: &str, formula: &str, scope: NameScope) -> Result<()> {
        validate_name(name)?;
        if let NameScope::Sheet(i) = scope {
            self.sheet(i)?;
        }
        let tokens = self.engine.parse(formula)?;
        if let Err(e) = self.names.define(DefinedName::new(name, scope, tokens)) {
            self.engine.formula_changing(tokens);
            return Err(e);
        }
        Ok(())
    }

    /// Look up a name as seen from `current_sheet`
    pub fn defined_name(&self, name: &str, current_sheet: usize) -> Option<&DefinedName> {
        self.names.get(name, current_sheet)
    }

    /// Formula text of a name as seen from `current_sheet`
    pub fn name_formula(&self, name: &str, current_sheet: usize) -> Result<Option<String>> {
        self.names
            .get(name, current_sheet)
            .map(|n| self.engine.to_text(n.tokens))
            .transpose()
    }

    /// Remove a name; returns whether it existed
    pub fn remove_name(&mut self, name: &str, scope: NameScope) -> bool {
        match self.names.remove(name, scope) {
            Some(removed) => {
                self.engine.formula_changing(removed.tokens);
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> &DefinedNames {
        &self.names
    }

    /// Validate a sheet name
    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        self.validate_sheet_name_excluding(name, None)
    }

    /// Validate a sheet name, optionally excluding a sheet from duplicate check
    fn validate_sheet_name_excluding(
        &self,
        name: &str,
        exclude_index: Option<usize>,
    ) -> Result<()> {
        // Check length
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        // Check for invalid characters
        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = INVALID_CHARS.iter().find(|c| name.contains(**c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }

        // Check for duplicate names (case-insensitive)
        let name_lower = name.to_lowercase();
        for (i, ws) in self.worksheets.iter().enumerate() {
            if Some(i) != exclude_index && ws.name().to_lowercase() == name_lower {
                return Err(Error::DuplicateSheetName(name.into()));
            }
        }

        Ok(())
    }

    /// Generate a unique sheet name
    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.validate_sheet_name(&name).is_ok() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac)
    pub date_1904: bool,
    /// How [`Workbook::get_cell`] treats absent and blank cells
    pub missing_cell_policy: MissingCellPolicy,
    /// Calculate formulas on open
    pub calc_on_open: bool,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            date_1904: false,
            missing_cell_policy: MissingCellPolicy::default(),
            calc_on_open: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Fill;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.styles().len(), FIRST_USER_STYLE as usize);
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();

        let idx = wb.add_worksheet().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheet_count(), 2);

        let idx = wb.add_worksheet_with_name("Data").unwrap();
        assert_eq!(idx, 2);
        assert_eq!(wb.worksheet(2).unwrap().name(), "Data");
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();

        // Case-insensitive duplicate check
        assert!(wb.add_worksheet_with_name("SHEET1").is_err());
        assert!(wb.add_worksheet_with_name("sheet1").is_err());
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();

        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("Sheet/1").is_err());
        assert!(wb.add_worksheet_with_name("Sheet:1").is_err());
        assert!(wb.add_worksheet_with_name("Sheet[1]").is_err());
        assert!(wb.add_worksheet_with_name("'Quoted").is_err());

        // Too long
        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_worksheet_with_name(&long_name).is_err());
    }

    #[test]
    fn test_move_worksheet() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("A").unwrap();
        wb.add_worksheet_with_name("B").unwrap();
        wb.add_worksheet_with_name("C").unwrap();
        wb.define_name("Local", "C!A1", NameScope::Sheet(3)).unwrap();

        // Move C to position 1
        wb.move_worksheet(3, 1).unwrap();

        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.worksheet(1).unwrap().name(), "C");
        assert_eq!(wb.worksheet(2).unwrap().name(), "A");
        assert_eq!(wb.worksheet(3).unwrap().name(), "B");
        assert_eq!(wb.defined_name("Local", 1).map(|n| n.scope), Some(NameScope::Sheet(1)));
    }

    #[test]
    fn test_remove_worksheet_releases_formulas() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb.cell_mut(1, 0, 0).unwrap().set_formula("A2*2").unwrap();
        wb.define_name("Rows", "Data!A1:A9", NameScope::Sheet(1)).unwrap();
        wb.set_active_sheet(1).unwrap();

        wb.remove_worksheet(1).unwrap();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.active_sheet(), 0);
        assert!(wb.names().is_empty());
        assert!(wb.engine().to_text(crate::formula::TokenHandle::new(0)).is_err());
    }

    #[test]
    fn test_worksheet_by_name() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();

        assert!(wb.worksheet_by_name("Data").is_some());
        assert!(wb.worksheet_by_name("NonExistent").is_none());
        assert_eq!(wb.sheet_index("Data"), Some(1));
    }

    #[test]
    fn test_missing_cell_policy() {
        let mut wb = Workbook::new();
        wb.cell_mut(0, 0, 0).unwrap();
        assert_eq!(wb.get_cell(0, 0, 0).unwrap().map(|c| c.kind()), Some(CellKind::Blank));
        assert!(wb.get_cell(0, 5, 5).unwrap().is_none());

        wb.settings_mut().missing_cell_policy = MissingCellPolicy::ReturnBlankAsNull;
        assert!(wb.get_cell(0, 0, 0).unwrap().is_none());

        wb.settings_mut().missing_cell_policy = MissingCellPolicy::CreateNullAsBlank;
        assert_eq!(wb.get_cell(0, 5, 5).unwrap().map(|c| c.kind()), Some(CellKind::Blank));
        assert_eq!(wb.worksheet(0).unwrap().cell_count(), 2);
    }

    #[test]
    fn test_strings_are_shared() {
        let mut wb = Workbook::new();
        wb.cell_mut(0, 0, 0).unwrap().set_string("same").unwrap();
        wb.cell_mut(0, 1, 0).unwrap().set_string("same").unwrap();
        assert_eq!(wb.shared_strings().len(), 1);
        assert_eq!(
            wb.cell_by_address(0, "A2").unwrap().unwrap().string_value(),
            Ok("same")
        );
    }

    #[test]
    fn test_new_cells_take_row_style() {
        let mut wb = Workbook::new();
        let style = wb.create_style().unwrap();
        wb.set_row_style(0, 2, Some(style)).unwrap();
        assert_eq!(wb.cell_mut(0, 2, 4).unwrap().style_index(), style.index());
        assert_eq!(wb.cell_mut(0, 3, 4).unwrap().style_index(), 0);
    }

    #[test]
    fn test_create_cell_replaces() {
        let mut wb = Workbook::new();
        wb.cell_mut(0, 0, 0).unwrap().set_formula("B1").unwrap();
        let cell = wb.create_cell(0, 0, 0, CellKind::Numeric).unwrap();
        assert_eq!(cell.as_cell().number_value(), Ok(0.0));
        assert!(wb.remove_cell(0, 0, 0).unwrap());
        assert!(!wb.remove_cell(0, 0, 0).unwrap());
        assert!(wb.worksheet(0).unwrap().row(0).is_some());
    }

    #[test]
    fn test_array_formula_lifecycle() {
        let mut wb = Workbook::new();
        let range = CellRange::parse("A4:A5").unwrap();
        wb.set_array_formula(0, range, "B4:B5*2").unwrap();

        let member = wb.cell(0, 4, 0).unwrap().unwrap();
        assert_eq!(member.array_formula_range(), Some(range));
        assert_eq!(member.formula_text().unwrap(), "B4:B5*2");

        assert_eq!(
            wb.cell_mut(0, 3, 0).unwrap().set_blank(),
            Err(Error::ArrayFormulaPartial("A4".into()))
        );
        assert!(wb.remove_cell(0, 4, 0).is_err());
        assert!(wb.remove_row(0, 3).is_err());
        assert!(wb
            .set_array_formula(0, CellRange::parse("A5:B5").unwrap(), "1")
            .is_err());

        assert_eq!(wb.remove_array_formula(0, 4, 0), Ok(range));
        for row in [3, 4] {
            assert_eq!(wb.cell(0, row, 0).unwrap().map(|c| c.kind()), Some(CellKind::Blank));
        }
        assert!(wb.worksheet(0).unwrap().array_formulas().is_empty());
        assert!(matches!(
            wb.remove_array_formula(0, 4, 0),
            Err(Error::NotArrayFormula(_))
        ));
    }

    #[test]
    fn test_public_row_edits_leave_array_group_intact() {
        let mut wb = Workbook::new();
        let range = CellRange::parse("A4:A5").unwrap();
        wb.set_array_formula(0, range, "B4:B5*2").unwrap();

        let row = wb.worksheet_mut(0).unwrap().row_mut(3).unwrap();
        row.set_height(Some(480));
        row.set_hidden(true);
        row.set_outline_level(2);
        assert_eq!(row.index(), 3);

        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.row_height(3), 480);
        assert!(sheet.row(3).unwrap().is_hidden());
        assert_eq!(sheet.array_formulas().len(), 1);
        for row in [3, 4] {
            let cell = wb.cell(0, row, 0).unwrap().unwrap();
            assert_eq!(cell.array_formula_range(), Some(range));
        }
    }

    #[test]
    fn test_array_formula_against_merge() {
        let mut wb = Workbook::new();
        wb.worksheet_mut(0)
            .unwrap()
            .add_merged_region(CellRange::parse("B2:C2").unwrap())
            .unwrap();
        assert!(matches!(
            wb.set_array_formula(0, CellRange::parse("C1:C3").unwrap(), "1"),
            Err(Error::IntersectingRegion { .. })
        ));

        wb.set_array_formula(0, CellRange::parse("E1:E3").unwrap(), "1")
            .unwrap();
        assert!(matches!(
            wb.worksheet_mut(0)
                .unwrap()
                .add_merged_region(CellRange::parse("D2:E2").unwrap()),
            Err(Error::ArrayFormulaPartial(_))
        ));
    }

    #[test]
    fn test_format_cache() {
        let mut wb = Workbook::new();
        let style = wb.create_style().unwrap();
        assert_eq!(wb.data_format_string(style.index()).unwrap(), "General");

        let custom = wb.add_format("0.000");
        assert_eq!(custom, FIRST_USER_FORMAT);
        wb.set_format(style, custom).unwrap();
        assert_eq!(wb.data_format_string(style.index()).unwrap(), "0.000");

        wb.insert_format(custom, "#,##0.0");
        assert_eq!(wb.data_format_string(style.index()).unwrap(), "#,##0.0");
    }

    #[test]
    fn test_clone_style_from() {
        let mut source = Workbook::new();
        let font = source.add_font(Font::new().with_name("Courier New").with_bold(true));
        let format = source.add_format("0.0%");
        let parent = source
            .add_style(ExtendedFormat::child_of(0).with_font(font))
            .unwrap();
        let child = source
            .add_style(
                ExtendedFormat::child_of(parent.index())
                    .with_format(format)
                    .with_fill(Fill::solid(10)),
            )
            .unwrap();

        let mut target = Workbook::new();
        assert_eq!(target.cell_mut(0, 0, 0).unwrap().set_style(child), Err(Error::ForeignStyle));

        let cloned = target.clone_style_from(&source, child).unwrap();
        target.cell_mut(0, 0, 0).unwrap().set_style(cloned).unwrap();

        let resolved = target.styles().resolve(cloned.index()).unwrap();
        let cloned_font = target.fonts().get(resolved.font_index).unwrap();
        assert_eq!(cloned_font.name, "Courier New");
        assert_eq!(target.data_format_string(cloned.index()).unwrap(), "0.0%");
        assert_eq!(target.styles().len(), FIRST_USER_STYLE as usize + 2);
    }

    #[test]
    fn test_names() {
        let mut wb = Workbook::new();
        wb.define_name("TaxRate", "Sheet1!$B$1", NameScope::Workbook).unwrap();
        assert!(wb.define_name("B1", "1", NameScope::Workbook).is_err());
        assert!(wb.define_name("Other", "1", NameScope::Sheet(4)).is_err());
        assert!(wb.define_name("taxrate", "2", NameScope::Workbook).is_err());

        assert_eq!(wb.name_formula("TAXRATE", 0).unwrap().as_deref(), Some("Sheet1!$B$1"));
        assert!(wb.remove_name("TaxRate", NameScope::Workbook));
        assert_eq!(wb.name_formula("TaxRate", 0).unwrap(), None);
    }
}

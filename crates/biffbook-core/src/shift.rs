//! Bulk row moves
//!
//! A shift relocates the rows `first..=last` of one sheet by `delta` rows and
//! rewrites everything that depends on row positions: cell records, merged
//! regions, hyperlinks, comments and formula references across the workbook.

use crate::array_formula::ArrayFormulaRegistry;
use crate::cell::{CellRange, CellRecord, FormulaBody};
use crate::error::{Error, Result};
use crate::formula::{FormulaEngine, FormulaHost, RowShift};
use crate::names::DefinedNames;
use crate::row::Row;
use crate::worksheet::{discard_record, Worksheet};
use crate::MAX_ROWS;

/// Options for [`Workbook::shift_rows`](crate::Workbook::shift_rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOptions {
    /// Give each destination row the height of its source row
    pub copy_row_height: bool,
    /// Reset the height of every vacated source row to the default
    pub reset_original_row_height: bool,
    /// Move comments anchored in the shifted rows
    pub move_comments: bool,
}

impl Default for ShiftOptions {
    fn default() -> Self {
        Self {
            copy_row_height: false,
            reset_original_row_height: false,
            move_comments: true,
        }
    }
}

/// What a row shift changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftOutcome {
    /// Source rows that existed and were moved
    pub rows_moved: usize,
    /// New positions of the merged regions that moved with the rows
    pub merged_regions_moved: Vec<CellRange>,
    /// Regions dropped because moved regions landed on them
    pub merged_regions_removed: Vec<CellRange>,
    /// Regions crossing the edge of the shifted rows, left where they were
    pub straddling_regions: Vec<CellRange>,
    pub hyperlinks_moved: usize,
    /// Hyperlinks lying wholly in overwritten rows
    pub hyperlinks_removed: usize,
    pub comments_moved: usize,
    /// Formulas (cells and names) whose references were rewritten
    pub formulas_adjusted: usize,
}

pub(crate) struct RowShifter<'a> {
    sheet_index: usize,
    sheets: &'a mut [Worksheet],
    engine: &'a mut dyn FormulaEngine,
    names: &'a DefinedNames,
}

/// Row range a shift writes into
#[derive(Debug, Clone, Copy)]
struct Span {
    first: u32,
    last: u32,
    dest_first: u32,
    dest_last: u32,
}

impl Span {
    /// Whether every row of `range` receives moved content without moving
    fn overwrites(&self, range: &CellRange) -> bool {
        range.first_row() >= self.dest_first
            && range.last_row() <= self.dest_last
            && (range.last_row() < self.first || range.first_row() > self.last)
    }

    fn contains_rows_of(&self, range: &CellRange) -> bool {
        range.first_row() >= self.first && range.last_row() <= self.last
    }

    fn touches_rows_of(&self, range: &CellRange) -> bool {
        range.first_row() <= self.last && range.last_row() >= self.first
    }
}

fn clip_row(row: i64) -> u32 {
    row.clamp(0, MAX_ROWS as i64 - 1) as u32
}

impl<'a> RowShifter<'a> {
    pub(crate) fn new(
        sheet_index: usize,
        sheets: &'a mut [Worksheet],
        engine: &'a mut dyn FormulaEngine,
        names: &'a DefinedNames,
    ) -> Self {
        Self {
            sheet_index,
            sheets,
            engine,
            names,
        }
    }

    /// Move rows `first..=last` by `delta`
    ///
    /// Fails before changing anything if the rows touch a multi-cell array
    /// formula, either moving or being overwritten.
    pub(crate) fn shift(
        &mut self,
        first: u32,
        last: u32,
        delta: i64,
        options: ShiftOptions,
    ) -> Result<ShiftOutcome> {
        if last < first {
            return Err(Error::InvalidRange(format!(
                "last row {last} is before first row {first}"
            )));
        }
        if last >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(last, MAX_ROWS - 1));
        }
        let count = self.sheets.len();
        if self.sheet_index >= count {
            return Err(Error::SheetOutOfBounds(self.sheet_index, count));
        }
        if delta == 0 {
            return Ok(ShiftOutcome::default());
        }
        let dest_first = first as i64 + delta;
        let dest_last = last as i64 + delta;
        if dest_first < 0 || dest_last >= MAX_ROWS as i64 {
            return Err(Error::InvalidRange(format!(
                "rows {first}..={last} shifted by {delta} leave the sheet"
            )));
        }
        let span = Span {
            first,
            last,
            dest_first: dest_first as u32,
            dest_last: dest_last as u32,
        };

        let sheet = &mut self.sheets[self.sheet_index];
        let arrays = sheet.array_formulas();
        if let Some(group) = arrays
            .multi_cell_in_rows(first, last)
            .or_else(|| arrays.multi_cell_in_rows(span.dest_first, span.dest_last))
        {
            return Err(Error::ArrayFormulaPartial(group.to_a1_string()));
        }

        log::debug!(
            "shifting rows {first}..={last} of '{}' by {delta}",
            sheet.name()
        );
        let mut outcome = ShiftOutcome::default();

        if options.move_comments {
            outcome.comments_moved = move_comments(sheet, &span, delta);
        }
        move_merged_regions(sheet, &span, delta, &mut outcome);
        move_hyperlinks(sheet, &span, delta, &mut outcome);
        outcome.rows_moved = move_rows(sheet, &span, delta, options, &mut *self.engine);

        outcome.formulas_adjusted = self.adjust_formulas(first, last, delta);
        log::debug!(
            "shift done: {} rows, {} merged regions, {} formulas rewritten",
            outcome.rows_moved,
            outcome.merged_regions_moved.len(),
            outcome.formulas_adjusted
        );
        Ok(outcome)
    }

    /// Rewrite references in every sheet's formulas and in defined names
    fn adjust_formulas(&mut self, first: u32, last: u32, delta: i64) -> usize {
        let sheet_names: Vec<String> = self.sheets.iter().map(|s| s.name().to_string()).collect();
        let shift = RowShift {
            sheet: self.sheet_index,
            first_row: first,
            last_row: last,
            delta,
            sheet_names: &sheet_names,
        };

        let mut adjusted = 0;
        for (i, sheet) in self.sheets.iter().enumerate() {
            let tokens = sheet.formula_tokens();
            if !tokens.is_empty() {
                adjusted += self
                    .engine
                    .adjust_row_shift(FormulaHost::Sheet(i), &tokens, &shift);
            }
        }
        for host in self.names.hosts() {
            let tokens = self.names.tokens_for(host);
            adjusted += self.engine.adjust_row_shift(host, &tokens, &shift);
        }
        adjusted
    }
}

fn move_comments(sheet: &mut Worksheet, span: &Span, delta: i64) -> usize {
    let comments = sheet.comments_mut();
    let taken = comments.take_rows(span.first, span.last);
    let moved = taken.len();
    for ((row, col), comment) in taken {
        comments.set(clip_row(row as i64 + delta), col, comment);
    }
    moved
}

fn move_merged_regions(sheet: &mut Worksheet, span: &Span, delta: i64, outcome: &mut ShiftOutcome) {
    let merged = sheet.merged_mut();
    let mut moved: Vec<(usize, CellRange)> = Vec::new();
    let mut straddling: Vec<(usize, CellRange)> = Vec::new();
    for (i, region) in merged.iter().enumerate() {
        if span.contains_rows_of(region) {
            if let Some(target) = region.translate_rows(delta) {
                moved.push((i, target));
            }
        } else if span.touches_rows_of(region) {
            straddling.push((i, *region));
        }
    }

    let removed: Vec<usize> = merged
        .iter()
        .enumerate()
        .filter(|(i, region)| {
            !moved.iter().any(|(m, _)| m == i)
                && moved.iter().any(|(_, target)| target.intersects(region))
        })
        .map(|(i, _)| i)
        .collect();

    for (i, target) in &moved {
        merged.set(*i, *target);
    }
    for (i, region) in straddling {
        if !removed.contains(&i) {
            log::warn!(
                "merged region {region} crosses the edge of rows {}..={} and was left in place",
                span.first,
                span.last
            );
            outcome.straddling_regions.push(region);
        }
    }
    outcome.merged_regions_moved = moved.into_iter().map(|(_, r)| r).collect();
    outcome.merged_regions_removed = merged.remove_many(&removed);
}

fn move_hyperlinks(sheet: &mut Worksheet, span: &Span, delta: i64, outcome: &mut ShiftOutcome) {
    let links = sheet.hyperlinks_mut();
    outcome.hyperlinks_removed = links.remove_where(|l| span.overwrites(&l.range));
    for i in links.anchored_in_rows(span.first, span.last) {
        if let Some(link) = links.get_mut(i) {
            if let Some(moved) = link.range.translate_rows(delta) {
                link.range = moved;
                outcome.hyperlinks_moved += 1;
            }
        }
    }
}

fn move_rows(
    sheet: &mut Worksheet,
    span: &Span,
    delta: i64,
    options: ShiftOptions,
    engine: &mut dyn FormulaEngine,
) -> usize {
    let order: Vec<u32> = if delta > 0 {
        (span.first..=span.last).rev().collect()
    } else {
        (span.first..=span.last).collect()
    };

    let mut moved = 0;
    for source in order {
        let dest = (source as i64 + delta) as u32;

        let cleared = sheet.row_mut(dest).map(Row::take_cells).unwrap_or_default();
        for record in &cleared {
            discard_record(record, sheet.arrays_mut(), engine);
        }

        let Some(mut source_row) = sheet.take_row(source) else {
            drop_if_unused(sheet, dest);
            continue;
        };
        let mut dest_row = sheet.take_row(dest).unwrap_or_else(|| Row::new(dest));
        if options.copy_row_height {
            dest_row.height = source_row.height;
        }
        if options.reset_original_row_height {
            source_row.height = None;
        }

        for mut record in source_row.take_cells() {
            record.header_mut().row = dest;
            retarget_single_cell_array(&mut record, sheet.arrays_mut());
            dest_row.insert_cell(record);
        }
        moved += 1;

        // Row settings stay with the row number; only cells move.
        if source_row.has_custom_settings() {
            sheet.insert_row(source_row);
        }
        if !dest_row.is_empty() || dest_row.has_custom_settings() {
            sheet.insert_row(dest_row);
        }
    }
    moved
}

/// Point a one-cell array group at the cell's new position
fn retarget_single_cell_array(record: &mut CellRecord, arrays: &mut ArrayFormulaRegistry) {
    let Some(formula) = record.formula_mut() else {
        return;
    };
    if let FormulaBody::ArrayAnchor { range, tokens } = formula.body {
        let target = CellRange::single(formula.header.row, formula.header.col);
        arrays.retarget(&range, target);
        formula.body = FormulaBody::ArrayAnchor {
            range: target,
            tokens,
        };
    }
}

fn drop_if_unused(sheet: &mut Worksheet, row: u32) {
    let unused = sheet
        .row(row)
        .is_some_and(|r| r.is_empty() && !r.has_custom_settings());
    if unused {
        sheet.take_row(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellHeader, NumberRecord};
    use crate::formula::TextFormulaEngine;
    use crate::hyperlink::Hyperlink;
    use crate::CellComment;
    use pretty_assertions::assert_eq;

    fn number(row: u32, col: u16, value: f64) -> CellRecord {
        CellRecord::Number(NumberRecord {
            header: CellHeader::new(row, col, 0),
            value,
        })
    }

    fn value_at(sheet: &Worksheet, row: u32, col: u16) -> Option<f64> {
        match sheet.cell_record(row, col) {
            Some(CellRecord::Number(r)) => Some(r.value),
            _ => None,
        }
    }

    fn shift(sheets: &mut [Worksheet], first: u32, last: u32, delta: i64) -> Result<ShiftOutcome> {
        let mut engine = TextFormulaEngine::new();
        let names = DefinedNames::new();
        RowShifter::new(0, sheets, &mut engine, &names).shift(
            first,
            last,
            delta,
            ShiftOptions::default(),
        )
    }

    #[test]
    fn test_overlapping_shift_down_keeps_data() {
        let mut sheets = vec![Worksheet::new("S")];
        for row in 2..=6 {
            sheets[0].insert_cell(number(row, 0, row as f64)).unwrap();
        }
        let outcome = shift(&mut sheets, 2, 6, 2).unwrap();
        assert_eq!(outcome.rows_moved, 5);

        let sheet = &sheets[0];
        assert_eq!(value_at(sheet, 2, 0), None);
        assert_eq!(value_at(sheet, 3, 0), None);
        for row in 4..=8 {
            assert_eq!(value_at(sheet, row, 0), Some((row - 2) as f64));
            assert_eq!(sheet.cell_record(row, 0).map(CellRecord::row), Some(row));
        }
        assert_eq!((sheet.first_row(), sheet.last_row()), (Some(4), Some(8)));
    }

    #[test]
    fn test_overlapping_shift_up_keeps_data() {
        let mut sheets = vec![Worksheet::new("S")];
        for row in 4..=8 {
            sheets[0].insert_cell(number(row, 1, row as f64)).unwrap();
        }
        shift(&mut sheets, 4, 8, -3).unwrap();
        for row in 1..=5 {
            assert_eq!(value_at(&sheets[0], row, 1), Some((row + 3) as f64));
        }
        assert_eq!(sheets[0].last_row(), Some(5));
    }

    #[test]
    fn test_destination_cells_are_cleared() {
        let mut sheets = vec![Worksheet::new("S")];
        sheets[0].insert_cell(number(0, 0, 1.0)).unwrap();
        sheets[0].insert_cell(number(5, 3, 99.0)).unwrap();
        shift(&mut sheets, 0, 0, 5).unwrap();
        assert_eq!(value_at(&sheets[0], 5, 0), Some(1.0));
        assert_eq!(value_at(&sheets[0], 5, 3), None);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let mut sheets = vec![Worksheet::new("S")];
        assert!(matches!(shift(&mut sheets, 4, 2, 1), Err(Error::InvalidRange(_))));
        assert!(matches!(shift(&mut sheets, 0, 2, -1), Err(Error::InvalidRange(_))));
        assert_eq!(shift(&mut sheets, 3, 4, 0), Ok(ShiftOutcome::default()));
    }

    #[test]
    fn test_merged_regions() {
        let mut sheets = vec![Worksheet::new("S")];
        let inside = CellRange::parse("A3:B4").unwrap();
        let straddling = CellRange::parse("D4:D8").unwrap();
        let landed_on = CellRange::parse("A7:C7").unwrap();
        for region in [inside, straddling, landed_on] {
            sheets[0].add_merged_region(region).unwrap();
        }

        let outcome = shift(&mut sheets, 2, 4, 4).unwrap();
        let moved = CellRange::parse("A7:B8").unwrap();
        assert_eq!(outcome.merged_regions_moved, vec![moved]);
        assert_eq!(outcome.merged_regions_removed, vec![landed_on]);
        assert_eq!(outcome.straddling_regions, vec![straddling]);
        let regions: Vec<_> = sheets[0].merged_regions().iter().copied().collect();
        assert_eq!(regions, vec![moved, straddling]);
    }

    #[test]
    fn test_hyperlinks_and_comments() {
        let mut sheets = vec![Worksheet::new("S")];
        let sheet = &mut sheets[0];
        sheet
            .add_hyperlink(Hyperlink::url(CellRange::single(1, 0), "https://a.example"))
            .unwrap();
        sheet
            .add_hyperlink(Hyperlink::url(CellRange::single(4, 0), "https://b.example"))
            .unwrap();
        sheet.set_comment("A2", CellComment::new("Ann", "moves")).unwrap();

        let outcome = shift(&mut sheets, 1, 1, 3).unwrap();
        assert_eq!((outcome.hyperlinks_removed, outcome.hyperlinks_moved), (1, 1));
        assert_eq!(outcome.comments_moved, 1);

        let sheet = &sheets[0];
        assert_eq!(
            sheet.hyperlink(4, 0).map(|l| l.address.as_str()),
            Some("https://a.example")
        );
        assert!(sheet.hyperlink(1, 0).is_none());
        assert_eq!(sheet.comment_at(4, 0).map(|c| c.text.as_str()), Some("moves"));
    }

    #[test]
    fn test_row_heights() {
        let mut sheets = vec![Worksheet::new("S")];
        sheets[0].insert_cell(number(0, 0, 1.0)).unwrap();
        sheets[0].set_row_height(0, Some(500)).unwrap();

        let mut engine = TextFormulaEngine::new();
        let names = DefinedNames::new();
        let options = ShiftOptions {
            copy_row_height: true,
            reset_original_row_height: true,
            move_comments: true,
        };
        RowShifter::new(0, &mut sheets, &mut engine, &names)
            .shift(0, 0, 2, options)
            .unwrap();
        assert_eq!(sheets[0].row(2).and_then(|r| r.height), Some(500));
        assert!(sheets[0].row(0).is_none());
    }
}

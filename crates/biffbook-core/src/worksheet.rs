//! Worksheet type

use crate::array_formula::ArrayFormulaRegistry;
use crate::cell::{CellAddress, CellRange, CellRecord};
use crate::comment::{CellComment, CommentRegistry};
use crate::error::{Error, Result};
use crate::formula::{FormulaEngine, TokenHandle};
use crate::hyperlink::{Hyperlink, HyperlinkRegistry};
use crate::index::SparseIndex;
use crate::merge::MergedRegionSet;
use crate::row::Row;
use crate::{MAX_COLS, MAX_ROWS};

/// Default row height in twips (12.75pt)
pub const DEFAULT_ROW_HEIGHT: u16 = 255;

/// A worksheet (single sheet in a workbook)
///
/// Sheets are named and ordered by their [`Workbook`](crate::Workbook); cell
/// content is edited through the workbook so shared tables stay consistent.
#[derive(Debug)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Sheet is visible
    visible: bool,
    /// Sheet is selected
    selected: bool,
    /// Height of rows without a custom height, in twips
    default_row_height: u16,
    rows: SparseIndex<u32, Row>,
    merged: MergedRegionSet,
    arrays: ArrayFormulaRegistry,
    hyperlinks: HyperlinkRegistry,
    comments: CommentRegistry,
}

pub(crate) fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}

/// Release what a discarded record owns
pub(crate) fn discard_record(
    record: &CellRecord,
    arrays: &mut ArrayFormulaRegistry,
    engine: &mut dyn FormulaEngine,
) {
    let Some(formula) = record.formula() else {
        return;
    };
    if let Some(tokens) = formula.body.owned_tokens() {
        engine.formula_changing(tokens);
    }
    if let Some(range) = formula.body.array_range() {
        arrays.deregister(&range);
    }
}

pub(crate) fn check_range(range: &CellRange) -> Result<()> {
    check_bounds(range.first_row(), range.first_col())?;
    check_bounds(range.last_row(), range.last_col())
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            visible: true,
            selected: false,
            default_row_height: DEFAULT_ROW_HEIGHT,
            rows: SparseIndex::new(),
            merged: MergedRegionSet::new(),
            arrays: ArrayFormulaRegistry::new(),
            hyperlinks: HyperlinkRegistry::new(),
            comments: CommentRegistry::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Check if the sheet is visible
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set sheet visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Check if the sheet is selected
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Set sheet selected state
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn default_row_height(&self) -> u16 {
        self.default_row_height
    }

    pub fn set_default_row_height(&mut self, twips: u16) {
        self.default_row_height = twips;
    }

    // === Rows ===

    pub fn row(&self, row: u32) -> Option<&Row> {
        self.rows.get(&row)
    }

    pub fn row_mut(&mut self, row: u32) -> Option<&mut Row> {
        self.rows.get_mut(&row)
    }

    /// Get a row, creating an empty one if needed
    pub fn create_row(&mut self, row: u32) -> Result<&mut Row> {
        check_bounds(row, 0)?;
        Ok(self.rows.get_or_insert_with(row, || Row::new(row)))
    }

    /// Rows in ascending order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.values_mut()
    }

    /// Number of rows that exist, with or without cells
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Lowest existing row, `None` for an empty sheet
    pub fn first_row(&self) -> Option<u32> {
        self.rows.first()
    }

    /// Highest existing row (inclusive), `None` for an empty sheet
    pub fn last_row(&self) -> Option<u32> {
        self.rows.last()
    }

    /// Row height in twips, falling back to the sheet default
    pub fn row_height(&self, row: u32) -> u16 {
        self.row(row)
            .and_then(|r| r.height)
            .unwrap_or(self.default_row_height)
    }

    pub fn set_row_height(&mut self, row: u32, twips: Option<u16>) -> Result<()> {
        self.create_row(row)?.height = twips;
        Ok(())
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.row(row).is_some_and(|r| r.hidden)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) -> Result<()> {
        self.create_row(row)?.hidden = hidden;
        Ok(())
    }

    // === Cells ===

    /// Record bound to a cell, `None` when the cell does not exist
    pub fn cell_record(&self, row: u32, col: u16) -> Option<&CellRecord> {
        self.rows.get(&row).and_then(|r| r.cell(col))
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(Row::cell_count).sum()
    }

    /// Check if the sheet has no cells
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(Row::is_empty)
    }

    /// Iterate over all cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = &CellRecord> {
        self.rows.values().flat_map(|r| r.cells().map(|(_, c)| c))
    }

    /// Smallest range covering every cell
    pub fn used_range(&self) -> Option<CellRange> {
        let mut bounds: Option<(u32, u16, u32, u16)> = None;
        for row in self.rows.values() {
            let (Some(first), Some(end)) = (row.first_col(), row.last_col()) else {
                continue;
            };
            let last = end - 1;
            bounds = Some(match bounds {
                None => (row.index, first, row.index, last),
                Some((r0, c0, _, c1)) => (r0, c0.min(first), row.index, c1.max(last)),
            });
        }
        bounds.map(|(r0, c0, r1, c1)| CellRange::from_indices(r0, c0, r1, c1))
    }

    /// Tokens owned by every formula cell of the sheet
    pub(crate) fn formula_tokens(&self) -> Vec<TokenHandle> {
        self.iter_cells()
            .filter_map(|c| c.formula().and_then(|f| f.body.owned_tokens()))
            .collect()
    }

    /// Token handle of the anchor of the array group containing the cell
    pub(crate) fn anchor_tokens(&self, row: u32, col: u16) -> Option<TokenHandle> {
        let range = self.cell_record(row, col)?.array_range()?;
        self.cell_record(range.first_row(), range.first_col())?
            .formula()?
            .body
            .owned_tokens()
    }

    /// Cell record plus the array registry, creating a blank cell if needed
    pub(crate) fn cell_entry(
        &mut self,
        row: u32,
        col: u16,
    ) -> Result<(&mut CellRecord, &mut ArrayFormulaRegistry)> {
        check_bounds(row, col)?;
        let row_ref = self.rows.get_or_insert_with(row, || Row::new(row));
        let xf = row_ref.style_index.unwrap_or(0);
        let record = row_ref.cell_or_insert_with(col, || CellRecord::blank(row, col, xf));
        Ok((record, &mut self.arrays))
    }

    pub(crate) fn take_cell(&mut self, row: u32, col: u16) -> Option<CellRecord> {
        self.rows.get_mut(&row)?.remove_cell(col)
    }

    pub(crate) fn insert_cell(&mut self, record: CellRecord) -> Result<Option<CellRecord>> {
        check_bounds(record.row(), record.col())?;
        Ok(self.create_row(record.row())?.insert_cell(record))
    }

    pub(crate) fn take_row(&mut self, row: u32) -> Option<Row> {
        self.rows.remove(&row)
    }

    pub(crate) fn insert_row(&mut self, row: Row) {
        self.rows.insert(row.index, row);
    }

    // === Merged regions ===

    pub fn merged_regions(&self) -> &MergedRegionSet {
        &self.merged
    }

    /// Merge a range, rejecting overlaps with other merges and array groups
    pub fn add_merged_region(&mut self, range: CellRange) -> Result<usize> {
        check_range(&range)?;
        self.merged.add(range, &self.arrays)
    }

    /// Merge a range without overlap checks (bulk loading)
    pub fn add_merged_region_unchecked(&mut self, range: CellRange) -> Result<usize> {
        check_range(&range)?;
        self.merged.add_unchecked(range)
    }

    pub fn validate_merged_regions(&self) -> Result<()> {
        self.merged.validate_all(&self.arrays)
    }

    pub fn remove_merged_region(&mut self, index: usize) -> Option<CellRange> {
        self.merged.remove(index)
    }

    pub fn remove_merged_regions(&mut self, indices: &[usize]) -> Vec<CellRange> {
        self.merged.remove_many(indices)
    }

    pub(crate) fn merged_mut(&mut self) -> &mut MergedRegionSet {
        &mut self.merged
    }

    // === Array formulas ===

    pub fn array_formulas(&self) -> &ArrayFormulaRegistry {
        &self.arrays
    }

    pub(crate) fn arrays_mut(&mut self) -> &mut ArrayFormulaRegistry {
        &mut self.arrays
    }

    // === Hyperlinks ===

    pub fn hyperlinks(&self) -> &HyperlinkRegistry {
        &self.hyperlinks
    }

    pub fn add_hyperlink(&mut self, link: Hyperlink) -> Result<()> {
        check_range(&link.range)?;
        self.hyperlinks.add(link);
        Ok(())
    }

    pub fn hyperlink(&self, row: u32, col: u16) -> Option<&Hyperlink> {
        self.hyperlinks.get(row, col)
    }

    pub fn remove_hyperlink(&mut self, row: u32, col: u16) -> Option<Hyperlink> {
        self.hyperlinks.remove(row, col)
    }

    pub(crate) fn hyperlinks_mut(&mut self) -> &mut HyperlinkRegistry {
        &mut self.hyperlinks
    }

    // === Comments ===

    pub fn comments(&self) -> &CommentRegistry {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut CommentRegistry {
        &mut self.comments
    }

    /// Set a comment on a cell by address string (e.g., "A1")
    pub fn set_comment(&mut self, address: &str, comment: CellComment) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.comments.set(addr.row, addr.col, comment);
        Ok(())
    }

    /// Get the comment on a cell by address string
    pub fn comment(&self, address: &str) -> Result<Option<&CellComment>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.comments.get(addr.row, addr.col))
    }

    pub fn comment_at(&self, row: u32, col: u16) -> Option<&CellComment> {
        self.comments.get(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperlink::HyperlinkKind;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_visible());
        assert!(ws.is_empty());
        assert_eq!((ws.first_row(), ws.last_row()), (None, None));
    }

    #[test]
    fn test_row_bounds_follow_removal() {
        let mut ws = Worksheet::new("Test");
        for row in [2, 5, 9] {
            ws.insert_cell(CellRecord::blank(row, 0, 0)).unwrap();
        }
        assert_eq!((ws.first_row(), ws.last_row()), (Some(2), Some(9)));

        ws.take_row(9);
        assert_eq!(ws.last_row(), Some(5));
        ws.take_row(5);
        ws.take_row(2);
        assert_eq!(ws.last_row(), None);
    }

    #[test]
    fn test_rows_exist_without_cells() {
        let mut ws = Worksheet::new("Test");
        ws.set_row_height(4, Some(600)).unwrap();
        assert_eq!(ws.row_count(), 1);
        assert_eq!(ws.cell_count(), 0);
        assert_eq!(ws.row_height(4), 600);
        assert_eq!(ws.row_height(5), DEFAULT_ROW_HEIGHT);
    }

    #[test]
    fn test_used_range() {
        let mut ws = Worksheet::new("Test");
        assert_eq!(ws.used_range(), None);
        ws.insert_cell(CellRecord::blank(1, 3, 0)).unwrap();
        ws.insert_cell(CellRecord::blank(4, 1, 0)).unwrap();
        assert_eq!(ws.used_range(), Some(CellRange::from_indices(1, 1, 4, 3)));
    }

    #[test]
    fn test_bounds_checked() {
        let mut ws = Worksheet::new("Test");
        assert_eq!(
            ws.insert_cell(CellRecord::blank(MAX_ROWS, 0, 0)),
            Err(Error::RowOutOfBounds(MAX_ROWS, MAX_ROWS - 1))
        );
        assert!(ws.cell_entry(0, MAX_COLS).is_err());
    }

    #[test]
    fn test_comments_and_links() {
        let mut ws = Worksheet::new("Test");
        ws.set_comment("B3", CellComment::new("Ann", "check")).unwrap();
        assert_eq!(ws.comment_at(2, 1).map(|c| c.text.as_str()), Some("check"));

        let range = CellRange::parse("A1:A2").unwrap();
        ws.add_hyperlink(Hyperlink::new(range, HyperlinkKind::Document, "'Data'!A1"))
            .unwrap();
        assert!(ws.hyperlink(1, 0).is_some());
        assert!(ws.remove_hyperlink(0, 0).is_some());
    }
}

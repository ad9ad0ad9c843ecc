//! Row types

use crate::cell::CellRecord;
use crate::index::SparseIndex;

/// How the workbook accessor treats cells that are absent or blank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCellPolicy {
    /// Absent cells read as `None`; blank cells are returned
    #[default]
    ReturnNull,
    /// Absent and blank cells both read as `None`
    ReturnBlankAsNull,
    /// Absent cells are created as blank cells on read
    CreateNullAsBlank,
}

/// A row and the cells it owns
///
/// Rows exist independently of their cells: a row may carry formatting with no
/// cells at all. Cells are edited through the workbook's cell views, and the
/// row style through [`Workbook::set_row_style`](crate::Workbook::set_row_style).
#[derive(Debug, Clone)]
pub struct Row {
    /// Row index (0-based); also the row's key in its sheet
    pub(crate) index: u32,
    /// Custom height in twips (None = default)
    pub(crate) height: Option<u16>,
    pub(crate) hidden: bool,
    /// Outline/grouping level (0-7)
    pub(crate) outline_level: u8,
    /// Row-level style index (None = no row style)
    pub(crate) style_index: Option<u16>,
    /// Row is collapsed (in outline)
    pub(crate) collapsed: bool,
    cells: SparseIndex<u16, CellRecord>,
}

/// Deepest outline level a row can have
pub const MAX_OUTLINE_LEVEL: u8 = 7;

impl Row {
    /// Create a new row with default settings
    pub fn new(index: u32) -> Self {
        Self {
            index,
            height: None,
            hidden: false,
            outline_level: 0,
            style_index: None,
            collapsed: false,
            cells: SparseIndex::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Custom height in twips, `None` for the sheet default
    pub fn height(&self) -> Option<u16> {
        self.height
    }

    pub fn set_height(&mut self, twips: Option<u16>) {
        self.height = twips;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn outline_level(&self) -> u8 {
        self.outline_level
    }

    /// Set the outline level, saturating at [`MAX_OUTLINE_LEVEL`]
    pub fn set_outline_level(&mut self, level: u8) {
        self.outline_level = level.min(MAX_OUTLINE_LEVEL);
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn style_index(&self) -> Option<u16> {
        self.style_index
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some()
            || self.hidden
            || self.outline_level > 0
            || self.style_index.is_some()
            || self.collapsed
    }

    /// First occupied column, `None` when the row has no cells
    pub fn first_col(&self) -> Option<u16> {
        self.cells.first()
    }

    /// One past the last occupied column, so `first_col()..last_col()` covers
    /// every cell; `None` when the row has no cells
    pub fn last_col(&self) -> Option<u16> {
        self.cells.last().map(|c| c + 1)
    }

    pub fn cell(&self, col: u16) -> Option<&CellRecord> {
        self.cells.get(&col)
    }

    pub(crate) fn cell_mut(&mut self, col: u16) -> Option<&mut CellRecord> {
        self.cells.get_mut(&col)
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (u16, &CellRecord)> {
        self.cells.iter().map(|(c, r)| (*c, r))
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = (u16, &mut CellRecord)> {
        self.cells.iter_mut().map(|(c, r)| (*c, r))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn insert_cell(&mut self, record: CellRecord) -> Option<CellRecord> {
        self.cells.insert(record.col(), record)
    }

    pub(crate) fn cell_or_insert_with<F>(&mut self, col: u16, make: F) -> &mut CellRecord
    where
        F: FnOnce() -> CellRecord,
    {
        self.cells.get_or_insert_with(col, make)
    }

    pub(crate) fn remove_cell(&mut self, col: u16) -> Option<CellRecord> {
        self.cells.remove(&col)
    }

    pub(crate) fn take_cells(&mut self) -> Vec<CellRecord> {
        self.cells.take_all().into_iter().map(|(_, r)| r).collect()
    }
}

//! Registry of array formula groups on a sheet
//!
//! The tokens of a group live in its anchor cell's record; the registry only
//! remembers which rectangles are bound so that edits and merges can be checked
//! without walking cells.

use crate::cell::CellRange;

#[derive(Debug, Clone, Default)]
pub struct ArrayFormulaRegistry {
    groups: Vec<CellRange>,
}

impl ArrayFormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRange> {
        self.groups.iter()
    }

    /// Groups spanning more than one cell
    pub fn multi_cell(&self) -> impl Iterator<Item = &CellRange> {
        self.groups.iter().filter(|g| !g.is_single_cell())
    }

    /// Group containing the cell, if any
    pub fn find(&self, row: u32, col: u16) -> Option<CellRange> {
        self.groups.iter().copied().find(|g| g.contains(row, col))
    }

    /// First group overlapping `range`
    pub fn intersecting(&self, range: &CellRange) -> Option<CellRange> {
        self.groups.iter().copied().find(|g| g.intersects(range))
    }

    /// First multi-cell group overlapping `range`
    pub fn intersecting_multi_cell(&self, range: &CellRange) -> Option<CellRange> {
        self.multi_cell().copied().find(|g| g.intersects(range))
    }

    /// First multi-cell group touching any row in `first..=last`
    pub fn multi_cell_in_rows(&self, first: u32, last: u32) -> Option<CellRange> {
        self.multi_cell()
            .copied()
            .find(|g| g.first_row() <= last && g.last_row() >= first)
    }

    pub fn contains(&self, range: &CellRange) -> bool {
        self.groups.contains(range)
    }

    pub(crate) fn register(&mut self, range: CellRange) {
        if !self.groups.contains(&range) {
            self.groups.push(range);
        }
    }

    pub(crate) fn deregister(&mut self, range: &CellRange) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g != range);
        self.groups.len() != before
    }

    /// Replace one registered range by another
    pub(crate) fn retarget(&mut self, old: &CellRange, new: CellRange) {
        if let Some(group) = self.groups.iter_mut().find(|g| **g == *old) {
            *group = new;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_and_multi_cell() {
        let mut registry = ArrayFormulaRegistry::new();
        let tall = CellRange::from_indices(3, 0, 4, 0);
        registry.register(tall);
        registry.register(CellRange::single(8, 2));

        assert_eq!(registry.find(4, 0), Some(tall));
        assert_eq!(registry.find(5, 0), None);
        assert_eq!(registry.multi_cell().count(), 1);
        assert_eq!(registry.multi_cell_in_rows(4, 10), Some(tall));
        assert_eq!(registry.multi_cell_in_rows(5, 10), None);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ArrayFormulaRegistry::new();
        let range = CellRange::from_indices(0, 0, 1, 1);
        registry.register(range);
        registry.register(range);
        assert_eq!(registry.len(), 1);
        assert!(registry.deregister(&range));
        assert!(!registry.deregister(&range));
    }
}

//! Merged cell regions
//!
//! No two regions of a set intersect, and no region intersects a multi-cell
//! array formula group. Positions are not stable across removals: remove from
//! the highest position down.

use crate::array_formula::ArrayFormulaRegistry;
use crate::cell::CellRange;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct MergedRegionSet {
    regions: Vec<CellRange>,
}

impl MergedRegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region after checking it against existing regions and array groups
    pub fn add(&mut self, region: CellRange, arrays: &ArrayFormulaRegistry) -> Result<usize> {
        check_size(&region)?;
        if let Some(existing) = self.regions.iter().find(|r| r.intersects(&region)) {
            return Err(Error::IntersectingRegion {
                region: region.to_a1_string(),
                existing: existing.to_a1_string(),
            });
        }
        if let Some(group) = arrays.intersecting_multi_cell(&region) {
            return Err(Error::ArrayFormulaPartial(group.to_a1_string()));
        }
        self.regions.push(region);
        Ok(self.regions.len() - 1)
    }

    /// Add a region without overlap checks
    ///
    /// Call [`validate_all`](Self::validate_all) once bulk loading is done.
    pub fn add_unchecked(&mut self, region: CellRange) -> Result<usize> {
        check_size(&region)?;
        self.regions.push(region);
        Ok(self.regions.len() - 1)
    }

    /// Check every pair of regions, and every region against the array groups
    pub fn validate_all(&self, arrays: &ArrayFormulaRegistry) -> Result<()> {
        for (i, a) in self.regions.iter().enumerate() {
            if let Some(b) = self.regions[i + 1..].iter().find(|b| a.intersects(b)) {
                return Err(Error::IntersectingRegion {
                    region: b.to_a1_string(),
                    existing: a.to_a1_string(),
                });
            }
            if let Some(group) = arrays.intersecting_multi_cell(a) {
                return Err(Error::ArrayFormulaPartial(group.to_a1_string()));
            }
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&CellRange> {
        self.regions.get(index)
    }

    /// Remove the region at `index`; later positions shift down by one
    pub fn remove(&mut self, index: usize) -> Option<CellRange> {
        (index < self.regions.len()).then(|| self.regions.remove(index))
    }

    /// Remove several positions at once, highest first
    pub fn remove_many(&mut self, indices: &[usize]) -> Vec<CellRange> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted.into_iter().filter_map(|i| self.remove(i)).collect()
    }

    /// Position of the region containing the cell
    pub fn find(&self, row: u32, col: u16) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(row, col))
    }

    pub fn position(&self, region: &CellRange) -> Option<usize> {
        self.regions.iter().position(|r| r == region)
    }

    /// First region overlapping `range`
    pub fn intersecting(&self, range: &CellRange) -> Option<&CellRange> {
        self.regions.iter().find(|r| r.intersects(range))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRange> {
        self.regions.iter()
    }

    pub(crate) fn set(&mut self, index: usize, region: CellRange) {
        if let Some(slot) = self.regions.get_mut(index) {
            *slot = region;
        }
    }
}

fn check_size(region: &CellRange) -> Result<()> {
    if region.cell_count() < 2 {
        return Err(Error::InvalidRange(format!(
            "merged region {} must span at least two cells",
            region.to_a1_string()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    #[test]
    fn test_rejects_single_cell() {
        let mut set = MergedRegionSet::new();
        let arrays = ArrayFormulaRegistry::new();
        assert!(matches!(
            set.add(range("B2"), &arrays),
            Err(Error::InvalidRange(_))
        ));
        assert!(set.add_unchecked(range("B2")).is_err());
    }

    #[test]
    fn test_rejects_intersection_and_leaves_set_unchanged() {
        let mut set = MergedRegionSet::new();
        let arrays = ArrayFormulaRegistry::new();
        set.add(range("A1:B2"), &arrays).unwrap();

        let err = set.add(range("B2:C3"), &arrays).unwrap_err();
        assert_eq!(
            err,
            Error::IntersectingRegion {
                region: "B2:C3".into(),
                existing: "A1:B2".into()
            }
        );
        assert_eq!(set.len(), 1);
        set.add(range("C1:D2"), &arrays).unwrap();
    }

    #[test]
    fn test_rejects_array_group() {
        let mut set = MergedRegionSet::new();
        let mut arrays = ArrayFormulaRegistry::new();
        arrays.register(range("A4:A5"));
        assert!(matches!(
            set.add(range("A5:B5"), &arrays),
            Err(Error::ArrayFormulaPartial(_))
        ));
    }

    #[test]
    fn test_validate_all_after_bulk_load() {
        let mut set = MergedRegionSet::new();
        let arrays = ArrayFormulaRegistry::new();
        set.add_unchecked(range("A1:C3")).unwrap();
        set.add_unchecked(range("E1:F1")).unwrap();
        assert!(set.validate_all(&arrays).is_ok());
        set.add_unchecked(range("B2:B9")).unwrap();
        assert!(set.validate_all(&arrays).is_err());
    }

    #[test]
    fn test_remove_many_goes_high_to_low() {
        let mut set = MergedRegionSet::new();
        for r in ["A1:A2", "B1:B2", "C1:C2", "D1:D2"] {
            set.add_unchecked(range(r)).unwrap();
        }
        let removed = set.remove_many(&[0, 2]);
        assert_eq!(removed, vec![range("C1:C2"), range("A1:A2")]);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![range("B1:B2"), range("D1:D2")]);
    }
}

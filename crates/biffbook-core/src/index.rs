//! Ordered sparse index with cached bounds
//!
//! Rows key their cells by column and sheets key their rows by row number.
//! Absent keys are a normal state, distinct from a stored blank value.

use std::collections::btree_map::{self, BTreeMap};
use std::ops::RangeBounds;

/// Sparse ordered map that keeps its first and last occupied key at hand
///
/// An empty index reports `None` for both bounds.
#[derive(Debug, Clone)]
pub struct SparseIndex<K, V> {
    entries: BTreeMap<K, V>,
    first: Option<K>,
    last: Option<K>,
}

impl<K: Ord + Copy, V> SparseIndex<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            first: None,
            last: None,
        }
    }

    /// Insert or replace the value at `key`, returning the previous value
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.extend_bounds(key);
        self.entries.insert(key, value)
    }

    /// Remove the value at `key`
    ///
    /// When the removed key was a bound, the bound moves to the nearest
    /// remaining key.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        if self.entries.is_empty() {
            self.first = None;
            self.last = None;
            return Some(removed);
        }
        if self.first == Some(*key) {
            self.first = self.entries.range(*key..).next().map(|(k, _)| *k);
        }
        if self.last == Some(*key) {
            self.last = self.entries.range(..*key).next_back().map(|(k, _)| *k);
        }
        Some(removed)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Value at `key`, inserting `make()` if absent
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V {
        self.extend_bounds(key);
        self.entries.entry(key).or_insert_with(make)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Lowest occupied key
    pub fn first(&self) -> Option<K> {
        self.first
    }

    /// Highest occupied key
    pub fn last(&self) -> Option<K> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, K, V> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = K> + '_ {
        self.entries.keys().copied()
    }

    pub fn values(&self) -> btree_map::Values<'_, K, V> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> btree_map::ValuesMut<'_, K, V> {
        self.entries.values_mut()
    }

    pub fn range<R: RangeBounds<K>>(&self, range: R) -> btree_map::Range<'_, K, V> {
        self.entries.range(range)
    }

    /// Remove every entry, handing them back in key order
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        self.first = None;
        self.last = None;
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    fn extend_bounds(&mut self, key: K) {
        if self.first.map_or(true, |f| key < f) {
            self.first = Some(key);
        }
        if self.last.map_or(true, |l| key > l) {
            self.last = Some(key);
        }
    }
}

impl<K: Ord + Copy, V> Default for SparseIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_follow_inserts() {
        let mut index = SparseIndex::new();
        assert_eq!(index.first(), None);
        index.insert(5u32, "e");
        index.insert(2, "b");
        index.insert(9, "i");
        assert_eq!((index.first(), index.last()), (Some(2), Some(9)));
        assert_eq!(index.get(&3), None);
    }

    #[test]
    fn test_bounds_recomputed_on_remove() {
        let mut index = SparseIndex::new();
        for k in [1u32, 4, 10] {
            index.insert(k, ());
        }
        index.remove(&10);
        assert_eq!(index.last(), Some(4));
        index.remove(&1);
        assert_eq!(index.first(), Some(4));
        index.remove(&4);
        assert_eq!((index.first(), index.last()), (None, None));
        assert!(index.remove(&4).is_none());
    }

    #[test]
    fn test_interior_remove_keeps_bounds() {
        let mut index = SparseIndex::new();
        for k in [1u16, 2, 3] {
            index.insert(k, k);
        }
        index.remove(&2);
        assert_eq!((index.first(), index.last()), (Some(1), Some(3)));
        assert_eq!(index.take_all(), vec![(1, 1), (3, 3)]);
        assert!(index.is_empty());
    }
}

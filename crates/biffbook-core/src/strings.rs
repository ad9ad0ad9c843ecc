//! Shared string table
//!
//! Text cells never embed their text: they hold an index into the workbook's
//! table, and equal strings share one entry. Entries are never removed
//! individually, so an index stays valid for the life of the workbook.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{Error, Result};

/// Rich-text run: from `char_pos` onwards the text uses `font_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatRun {
    pub char_pos: u16,
    pub font_index: u16,
}

impl FormatRun {
    pub fn new(char_pos: u16, font_index: u16) -> Self {
        Self {
            char_pos,
            font_index,
        }
    }
}

/// A string entry, with optional rich-text formatting runs
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UnicodeString {
    text: Arc<str>,
    runs: Vec<FormatRun>,
}

impl UnicodeString {
    pub fn new<S: AsRef<str>>(text: S) -> Self {
        Self {
            text: Arc::from(text.as_ref()),
            runs: Vec::new(),
        }
    }

    /// Create a rich string; runs are kept sorted by position
    pub fn with_runs<S: AsRef<str>>(text: S, mut runs: Vec<FormatRun>) -> Self {
        runs.sort_by_key(|r| r.char_pos);
        runs.dedup_by_key(|r| r.char_pos);
        Self {
            text: Arc::from(text.as_ref()),
            runs,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[FormatRun] {
        &self.runs
    }

    pub fn is_rich(&self) -> bool {
        !self.runs.is_empty()
    }

    pub(crate) fn runs_mut(&mut self) -> &mut Vec<FormatRun> {
        &mut self.runs
    }
}

impl fmt::Debug for UnicodeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.runs.is_empty() {
            write!(f, "{:?}", self.text)
        } else {
            write!(f, "{:?} {:?}", self.text, self.runs)
        }
    }
}

impl fmt::Display for UnicodeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for UnicodeString {
    fn from(s: &str) -> Self {
        UnicodeString::new(s)
    }
}

/// Interning pool backing every text cell of a workbook
#[derive(Debug, Default, Clone)]
pub struct SharedStringTable {
    entries: Vec<UnicodeString>,
    lookup: AHashMap<UnicodeString, u32>,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `text`, adding it if it was never seen
    pub fn intern<S: AsRef<str>>(&mut self, text: S) -> u32 {
        self.intern_rich(UnicodeString::new(text))
    }

    /// Intern a string including its formatting runs
    ///
    /// Two strings with the same text but different runs are distinct entries.
    pub fn intern_rich(&mut self, value: UnicodeString) -> u32 {
        if let Some(&idx) = self.lookup.get(&value) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.lookup.insert(value.clone(), idx);
        self.entries.push(value);
        idx
    }

    /// Text of the entry at `index`
    pub fn resolve(&self, index: u32) -> Result<&str> {
        self.get(index)
            .map(UnicodeString::as_str)
            .ok_or(Error::InvalidStringIndex(index))
    }

    pub fn get(&self, index: u32) -> Option<&UnicodeString> {
        self.entries.get(index as usize)
    }

    /// Index of an already-interned plain string, without adding it
    pub fn find(&self, text: &str) -> Option<u32> {
        self.lookup.get(&UnicodeString::new(text)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &UnicodeString)> {
        self.entries.iter().enumerate().map(|(i, s)| (i as u32, s))
    }

    /// Rewrite one entry's font runs in place
    ///
    /// Changing runs changes the entry's identity, so the lookup is rebuilt for
    /// that entry. If another entry becomes identical, both keep their index.
    pub(crate) fn remap_runs<F>(&mut self, index: u32, mut remap: F)
    where
        F: FnMut(u16) -> u16,
    {
        let Some(entry) = self.entries.get_mut(index as usize) else {
            return;
        };
        if !entry.is_rich() {
            return;
        }
        let old = entry.clone();
        for run in entry.runs_mut() {
            run.font_index = remap(run.font_index);
        }
        if *entry == old {
            return;
        }
        if self.lookup.get(&old) == Some(&index) {
            self.lookup.remove(&old);
        }
        self.lookup.entry(entry.clone()).or_insert(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SharedStringTable::new();
        let a = table.intern("Yes");
        let b = table.intern("No");
        assert_eq!(table.intern("Yes"), a);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(b).unwrap(), "No");
    }

    #[test]
    fn test_rich_strings_are_distinct() {
        let mut table = SharedStringTable::new();
        let plain = table.intern("Total");
        let rich = table.intern_rich(UnicodeString::with_runs("Total", vec![FormatRun::new(0, 5)]));
        assert_ne!(plain, rich);
        assert_eq!(table.find("Total"), Some(plain));
        assert!(table.get(rich).unwrap().is_rich());
    }

    #[test]
    fn test_resolve_out_of_range() {
        let table = SharedStringTable::new();
        assert_eq!(table.resolve(3), Err(Error::InvalidStringIndex(3)));
    }

    #[test]
    fn test_remap_runs_updates_lookup() {
        let mut table = SharedStringTable::new();
        let idx = table.intern_rich(UnicodeString::with_runs("ab", vec![FormatRun::new(1, 7)]));
        table.remap_runs(idx, |f| if f == 7 { 5 } else { f });

        assert_eq!(table.get(idx).unwrap().runs(), &[FormatRun::new(1, 5)]);
        let again = table.intern_rich(UnicodeString::with_runs("ab", vec![FormatRun::new(1, 5)]));
        assert_eq!(again, idx);
    }
}

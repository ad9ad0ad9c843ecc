//! Hyperlinks anchored on cell ranges
//!
//! Links are looked up by position and are not owned by cells: clearing a cell
//! leaves its hyperlink in place.

use crate::cell::CellRange;

/// What a hyperlink points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HyperlinkKind {
    /// Web address
    Url,
    /// Location inside this workbook (e.g. `'Sheet 2'!A1`)
    Document,
    /// `mailto:` address
    Email,
    /// File on disk or on a share
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub range: CellRange,
    pub kind: HyperlinkKind,
    pub address: String,
    /// Display text
    pub label: Option<String>,
}

impl Hyperlink {
    pub fn new(range: CellRange, kind: HyperlinkKind, address: impl Into<String>) -> Self {
        Self {
            range,
            kind,
            address: address.into(),
            label: None,
        }
    }

    pub fn url(range: CellRange, address: impl Into<String>) -> Self {
        Self::new(range, HyperlinkKind::Url, address)
    }

    /// Email link; a missing `mailto:` prefix is added
    pub fn email(range: CellRange, address: impl Into<String>) -> Self {
        let address = address.into();
        let address = if address.to_ascii_lowercase().starts_with("mailto:") {
            address
        } else {
            format!("mailto:{address}")
        };
        Self::new(range, HyperlinkKind::Email, address)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Hyperlinks of one sheet
#[derive(Debug, Clone, Default)]
pub struct HyperlinkRegistry {
    links: Vec<Hyperlink>,
}

impl HyperlinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, link: Hyperlink) {
        self.links.push(link);
    }

    /// Link whose range contains the cell
    pub fn get(&self, row: u32, col: u16) -> Option<&Hyperlink> {
        self.links.iter().find(|l| l.range.contains(row, col))
    }

    /// Link anchored exactly at the cell (its top-left corner)
    pub fn anchored_at(&self, row: u32, col: u16) -> Option<&Hyperlink> {
        self.links
            .iter()
            .find(|l| l.range.first_row() == row && l.range.first_col() == col)
    }

    /// Remove the link whose range contains the cell
    pub fn remove(&mut self, row: u32, col: u16) -> Option<Hyperlink> {
        let pos = self.links.iter().position(|l| l.range.contains(row, col))?;
        Some(self.links.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hyperlink> {
        self.links.iter()
    }

    /// Indices of links whose top row lies in `first..=last`
    pub(crate) fn anchored_in_rows(&self, first: u32, last: u32) -> Vec<usize> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| (first..=last).contains(&l.range.first_row()))
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Hyperlink> {
        self.links.get_mut(index)
    }

    /// Drop links matching `doomed`; returns how many were removed
    pub(crate) fn remove_where<F>(&mut self, mut doomed: F) -> usize
    where
        F: FnMut(&Hyperlink) -> bool,
    {
        let before = self.links.len();
        self.links.retain(|l| !doomed(l));
        before - self.links.len()
    }
}

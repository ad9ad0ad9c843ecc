//! Cell styling types
//!
//! Cells and rows refer to styles by index into the workbook's [`StyleTable`].
//! Each entry is an extended format ([`ExtendedFormat`]) whose attribute groups
//! are optional: an unset group is inherited from the entry's parent.
//!
//! - [`ExtendedFormat`] - One style entry
//! - [`StyleTable`] - The indexed table, with built-in entries 0..=20
//! - [`Font`] / [`FontTable`] - Fonts referenced by styles and rich text
//! - [`FormatTable`] - Number format strings

mod font;
mod format;
pub(crate) mod optimise;
mod xf;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::{FIRST_USER_STYLE, MAX_STYLES};

pub use font::{Font, FontTable, FontVerticalAlign, Underline, COLOR_AUTOMATIC};
pub use format::{builtin_format, FormatTable};
pub use xf::{
    Alignment, BorderEdge, Borders, DiagonalDirection, Fill, HorizontalAlignment, Protection,
    VerticalAlignment,
};

/// Longest parent chain followed when resolving attributes
pub const MAX_PARENT_DEPTH: usize = 32;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// One style entry
///
/// Two entries are equal when every attribute, including the parent, is equal;
/// the entry's own index takes no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExtendedFormat {
    /// Style inherited from for every unset attribute group
    pub parent: Option<u16>,
    /// Name of a named (cell) style
    pub name: Option<String>,
    pub font_index: Option<u16>,
    pub format_index: Option<u16>,
    pub alignment: Option<Alignment>,
    pub borders: Option<Borders>,
    pub fill: Option<Fill>,
    pub protection: Option<Protection>,
}

impl ExtendedFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// An entry with every group unset, inheriting everything from `parent`
    pub fn child_of(parent: u16) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }

    /// The default style: every group set to its default
    pub fn default_style() -> Self {
        Self {
            parent: None,
            name: None,
            font_index: Some(0),
            format_index: Some(0),
            alignment: Some(Alignment::default()),
            borders: Some(Borders::default()),
            fill: Some(Fill::default()),
            protection: Some(Protection::default()),
        }
    }

    pub fn with_font(mut self, font_index: u16) -> Self {
        self.font_index = Some(font_index);
        self
    }

    pub fn with_format(mut self, format_index: u16) -> Self {
        self.format_index = Some(format_index);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = Some(borders);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = Some(protection);
        self
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

/// Fully resolved attributes of a style
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedStyle {
    pub font_index: u16,
    pub format_index: u16,
    pub alignment: Alignment,
    pub borders: Borders,
    pub fill: Fill,
    pub protection: Protection,
}

/// Reference to a style entry of one particular table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleHandle {
    table_id: u64,
    index: u16,
}

impl StyleHandle {
    pub fn index(&self) -> u16 {
        self.index
    }
}

/// Indexed table of extended formats
#[derive(Debug, Clone)]
pub struct StyleTable {
    id: u64,
    entries: Vec<ExtendedFormat>,
}

impl StyleTable {
    /// Create a table holding the built-in entries
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(64);
        entries.push(ExtendedFormat::default_style());
        for i in 1..15u16 {
            let font = match i {
                1 | 2 => 1,
                3 | 4 => 2,
                _ => 0,
            };
            entries.push(ExtendedFormat::new().with_font(font));
        }
        entries.push(ExtendedFormat::child_of(0));
        // Comma, Comma [0], Currency, Currency [0], Percent
        for format in [43u16, 41, 44, 42, 9] {
            entries.push(ExtendedFormat::new().with_font(1).with_format(format));
        }
        debug_assert_eq!(entries.len(), FIRST_USER_STYLE as usize);

        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            entries,
        }
    }

    /// Identity of this table, shared by every handle it issues
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&ExtendedFormat> {
        self.entries.get(index as usize)
    }

    /// Mutable access to a user style; built-in entries are read-only
    pub fn get_mut(&mut self, index: u16) -> Result<&mut ExtendedFormat> {
        if index < FIRST_USER_STYLE {
            return Err(Error::InvalidStyleIndex(index));
        }
        self.entries
            .get_mut(index as usize)
            .ok_or(Error::InvalidStyleIndex(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ExtendedFormat)> {
        self.entries.iter().enumerate().map(|(i, x)| (i as u16, x))
    }

    /// Append a new style inheriting everything from the default style
    pub fn create_style(&mut self) -> Result<StyleHandle> {
        self.add(ExtendedFormat::child_of(0))
    }

    /// Append an entry
    ///
    /// Identical entries are not merged here; see `Workbook::optimise_styles`.
    pub fn add(&mut self, xf: ExtendedFormat) -> Result<StyleHandle> {
        if self.entries.len() >= MAX_STYLES {
            return Err(Error::TooManyStyles(MAX_STYLES));
        }
        if let Some(parent) = xf.parent {
            self.check_index(parent)?;
        }
        self.entries.push(xf);
        Ok(self.handle_unchecked((self.entries.len() - 1) as u16))
    }

    /// Deep copy of an entry of this table, appended as a new entry
    pub fn clone_style(&mut self, handle: StyleHandle) -> Result<StyleHandle> {
        let index = self.check_handle(handle)?;
        let mut copy = self.entries[index as usize].clone();
        copy.name = None;
        self.add(copy)
    }

    /// Handle for an existing index
    pub fn handle(&self, index: u16) -> Result<StyleHandle> {
        self.check_index(index)?;
        Ok(self.handle_unchecked(index))
    }

    fn handle_unchecked(&self, index: u16) -> StyleHandle {
        StyleHandle {
            table_id: self.id,
            index,
        }
    }

    /// Index behind a handle, refusing handles issued by another table
    pub fn check_handle(&self, handle: StyleHandle) -> Result<u16> {
        if handle.table_id != self.id {
            return Err(Error::ForeignStyle);
        }
        self.check_index(handle.index)?;
        Ok(handle.index)
    }

    pub fn check_index(&self, index: u16) -> Result<()> {
        if (index as usize) < self.entries.len() {
            Ok(())
        } else {
            Err(Error::InvalidStyleIndex(index))
        }
    }

    /// Change the parent of a user style
    pub fn set_parent(&mut self, index: u16, parent: Option<u16>) -> Result<()> {
        if index < FIRST_USER_STYLE {
            return Err(Error::InvalidStyleIndex(index));
        }
        if let Some(p) = parent {
            self.check_index(p)?;
            if p == index {
                return Err(Error::InvalidStyleIndex(p));
            }
        }
        self.get_mut(index)?.parent = parent;
        Ok(())
    }

    /// Name a user style, making it a named style
    pub fn set_style_name(&mut self, index: u16, name: Option<String>) -> Result<()> {
        if index < FIRST_USER_STYLE {
            return Err(Error::InvalidStyleIndex(index));
        }
        self.get_mut(index)?.name = name;
        Ok(())
    }

    /// Index of the named style called `name` (case-insensitive)
    pub fn find_named(&self, name: &str) -> Option<u16> {
        self.entries
            .iter()
            .position(|x| x.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|i| i as u16)
    }

    /// Resolve every attribute group through the parent chain
    ///
    /// Groups unset along the whole chain take their defaults. A chain longer
    /// than [`MAX_PARENT_DEPTH`] (or a cycle) stops being followed.
    pub fn resolve(&self, index: u16) -> Result<ResolvedStyle> {
        self.check_index(index)?;

        let mut font_index = None;
        let mut format_index = None;
        let mut alignment = None;
        let mut borders = None;
        let mut fill = None;
        let mut protection = None;

        let mut current = Some(index);
        let mut depth = 0;
        while let Some(i) = current {
            let Some(xf) = self.get(i) else {
                break;
            };
            if depth == MAX_PARENT_DEPTH {
                log::warn!("style {index}: parent chain longer than {MAX_PARENT_DEPTH}, truncated");
                break;
            }
            font_index = font_index.or(xf.font_index);
            format_index = format_index.or(xf.format_index);
            alignment = alignment.or_else(|| xf.alignment.clone());
            borders = borders.or_else(|| xf.borders.clone());
            fill = fill.or(xf.fill);
            protection = protection.or(xf.protection);
            current = xf.parent;
            depth += 1;
        }

        Ok(ResolvedStyle {
            font_index: font_index.unwrap_or(0),
            format_index: format_index.unwrap_or(0),
            alignment: alignment.unwrap_or_default(),
            borders: borders.unwrap_or_default(),
            fill: fill.unwrap_or_default(),
            protection: protection.unwrap_or_default(),
        })
    }

    pub(crate) fn entries(&self) -> &[ExtendedFormat] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ExtendedFormat] {
        &mut self.entries
    }

    /// Remove the given indices, highest first
    pub(crate) fn remove_sorted_desc(&mut self, indices: &[u16]) {
        for &i in indices {
            debug_assert!(i >= FIRST_USER_STYLE, "built-in style {i} removed");
            self.entries.remove(i as usize);
        }
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_entries() {
        let table = StyleTable::new();
        assert_eq!(table.len(), FIRST_USER_STYLE as usize);
        assert_eq!(table.get(0), Some(&ExtendedFormat::default_style()));
        assert_eq!(table.resolve(18).unwrap().format_index, 44);
    }

    #[test]
    fn test_create_style_twice_gives_distinct_indices() {
        let mut table = StyleTable::new();
        let a = table.create_style().unwrap();
        let b = table.create_style().unwrap();
        assert_ne!(a.index(), b.index());
        assert_eq!(table.get(a.index()), table.get(b.index()));
    }

    #[test]
    fn test_resolve_inherits_from_parent() {
        let mut table = StyleTable::new();
        let parent = table
            .add(ExtendedFormat::child_of(0).with_fill(Fill::solid(10)).with_font(2))
            .unwrap();
        let child = table
            .add(ExtendedFormat::child_of(parent.index()).with_font(3))
            .unwrap();

        let resolved = table.resolve(child.index()).unwrap();
        assert_eq!(resolved.font_index, 3);
        assert_eq!(resolved.fill, Fill::solid(10));
        assert_eq!(resolved.protection, Protection::default());
    }

    #[test]
    fn test_resolve_survives_cycle() {
        let mut table = StyleTable::new();
        let a = table.create_style().unwrap().index();
        let b = table.add(ExtendedFormat::child_of(a).with_format(14)).unwrap().index();
        table.set_parent(a, Some(b)).unwrap();

        assert_eq!(table.resolve(a).unwrap().format_index, 14);
        assert_eq!(table.resolve(a).unwrap().font_index, 0);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut ours = StyleTable::new();
        let mut theirs = StyleTable::new();
        let handle = theirs.create_style().unwrap();
        assert_eq!(ours.check_handle(handle), Err(Error::ForeignStyle));
        assert!(ours.clone_style(handle).is_err());
    }

    #[test]
    fn test_builtin_styles_cannot_be_renamed() {
        let mut table = StyleTable::new();
        assert!(table.set_style_name(3, Some("Heading".into())).is_err());
        let idx = table.create_style().unwrap().index();
        table.set_style_name(idx, Some("Heading".into())).unwrap();
        assert_eq!(table.find_named("heading"), Some(idx));
    }

    #[test]
    fn test_builtin_styles_are_read_only() {
        let mut table = StyleTable::new();
        assert_eq!(
            table.get_mut(15).map(|xf| xf.clone()),
            Err(Error::InvalidStyleIndex(15))
        );
        assert!(table.get_mut(0).is_err());
        let idx = table.create_style().unwrap().index();
        table.get_mut(idx).unwrap().format_index = Some(14);
        assert_eq!(table.resolve(idx).unwrap().format_index, 14);
        assert_eq!(table.get(15), Some(&ExtendedFormat::child_of(0)));
    }
}

//! Font records and the workbook font table

use crate::error::{Error, Result};
use crate::FIRST_USER_FONT;

/// Palette index meaning "automatic colour"
pub const COLOR_AUTOMATIC: u16 = 0x7FFF;

/// A FONT entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Font {
    /// Font family name (e.g., "Arial")
    pub name: String,
    /// Font height in twips (1/20 of a point)
    pub height: u16,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strikethrough: bool,
    /// Palette colour index
    pub color_index: u16,
    /// Superscript/subscript
    pub vertical_align: FontVerticalAlign,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Arial".to_string(),
            height: 200,
            bold: false,
            italic: false,
            underline: Underline::None,
            strikethrough: false,
            color_index: COLOR_AUTOMATIC,
            vertical_align: FontVerticalAlign::Baseline,
        }
    }
}

impl Font {
    /// Create a new default font
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set font size in points
    pub fn with_points(mut self, points: u16) -> Self {
        self.height = points.saturating_mul(20);
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_underline(mut self, underline: Underline) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_color(mut self, color_index: u16) -> Self {
        self.color_index = color_index;
        self
    }

    /// Font size in points
    pub fn points(&self) -> f64 {
        self.height as f64 / 20.0
    }
}

/// Underline style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Underline {
    /// No underline
    #[default]
    None,
    /// Single underline
    Single,
    /// Double underline
    Double,
    /// Single accounting underline (extends to cell width)
    SingleAccounting,
    /// Double accounting underline
    DoubleAccounting,
}

/// Font vertical alignment (superscript/subscript)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontVerticalAlign {
    /// Normal baseline
    #[default]
    Baseline,
    /// Superscript
    Superscript,
    /// Subscript
    Subscript,
}

/// Indexed font table; entries below [`FIRST_USER_FONT`] are built in
#[derive(Debug, Clone)]
pub struct FontTable {
    fonts: Vec<Font>,
}

impl FontTable {
    pub fn new() -> Self {
        let base = Font::default();
        Self {
            fonts: vec![
                base.clone(),
                base.clone().with_bold(true),
                base.clone().with_italic(true),
                base.with_bold(true).with_italic(true),
            ],
        }
    }

    /// Append a font, returning its index
    ///
    /// Equal fonts are not merged here; see `Workbook::optimise_fonts`.
    pub fn add(&mut self, font: Font) -> u16 {
        self.fonts.push(font);
        (self.fonts.len() - 1) as u16
    }

    /// Index of the first font equal to `font`
    pub fn find(&self, font: &Font) -> Option<u16> {
        self.fonts.iter().position(|f| f == font).map(|i| i as u16)
    }

    pub fn get(&self, index: u16) -> Option<&Font> {
        self.fonts.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut Font> {
        self.fonts.get_mut(index as usize)
    }

    pub(crate) fn check(&self, index: u16) -> Result<()> {
        if (index as usize) < self.fonts.len() {
            Ok(())
        } else {
            Err(Error::InvalidFontIndex(index))
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Index of the first user-defined font
    pub fn first_user_index(&self) -> u16 {
        FIRST_USER_FONT
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Font)> {
        self.fonts.iter().enumerate().map(|(i, f)| (i as u16, f))
    }

    pub(crate) fn entries(&self) -> &[Font] {
        &self.fonts
    }

    /// Remove the given indices, highest first
    pub(crate) fn remove_sorted_desc(&mut self, indices: &[u16]) {
        for &i in indices {
            debug_assert!(i >= FIRST_USER_FONT, "built-in font {i} removed");
            self.fonts.remove(i as usize);
        }
    }
}

impl Default for FontTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_fonts() {
        let table = FontTable::new();
        assert_eq!(table.len(), FIRST_USER_FONT as usize);
        assert!(table.get(1).unwrap().bold);
        assert_eq!(table.get(0).unwrap().points(), 10.0);
    }

    #[test]
    fn test_add_and_find() {
        let mut table = FontTable::new();
        let font = Font::new().with_name("Courier New").with_points(12);
        let idx = table.add(font.clone());
        assert_eq!(idx, FIRST_USER_FONT);
        assert_eq!(table.find(&font), Some(idx));
        assert_eq!(table.check(idx + 1), Err(Error::InvalidFontIndex(idx + 1)));
    }
}

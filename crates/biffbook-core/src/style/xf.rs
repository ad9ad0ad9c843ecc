//! Attribute groups of an extended format (XF) entry
//!
//! Values stay in their record-level form: line styles and patterns are the
//! BIFF codes, colours are palette indices.

use super::font::COLOR_AUTOMATIC;

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcrossSelection,
    Distributed,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

/// Text alignment settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    /// Indent level (0-15)
    pub indent: u8,
    /// Rotation as stored: 0-90 up, 91-180 down, 255 stacked
    pub rotation: u8,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_horizontal(mut self, align: HorizontalAlignment) -> Self {
        self.horizontal = align;
        self
    }

    pub fn with_vertical(mut self, align: VerticalAlignment) -> Self {
        self.vertical = align;
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent.min(15);
        self
    }
}

/// One border edge: BIFF line style code (0 = none) and colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    pub line_style: u8,
    pub color_index: u16,
}

impl BorderEdge {
    pub const NONE: BorderEdge = BorderEdge {
        line_style: 0,
        color_index: COLOR_AUTOMATIC,
    };

    pub fn new(line_style: u8, color_index: u16) -> Self {
        Self {
            line_style,
            color_index,
        }
    }

    pub fn is_none(&self) -> bool {
        self.line_style == 0
    }
}

impl Default for BorderEdge {
    fn default() -> Self {
        Self::NONE
    }
}

/// Diagonal border direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagonalDirection {
    #[default]
    None,
    Down,
    Up,
    Both,
}

/// Cell borders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Borders {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
    pub diagonal: BorderEdge,
    pub diagonal_direction: DiagonalDirection,
}

impl Borders {
    /// Same edge on all four sides
    pub fn all(edge: BorderEdge) -> Self {
        Self {
            left: edge,
            right: edge,
            top: edge,
            bottom: edge,
            ..Default::default()
        }
    }
}

/// Background fill: BIFF pattern code (0 = none, 1 = solid) and colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fill {
    pub pattern: u8,
    pub foreground_index: u16,
    pub background_index: u16,
}

impl Fill {
    pub const NONE: Fill = Fill {
        pattern: 0,
        foreground_index: 0x40,
        background_index: 0x41,
    };

    /// Solid fill in one palette colour
    pub fn solid(color_index: u16) -> Self {
        Self {
            pattern: 1,
            foreground_index: color_index,
            background_index: 0x41,
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Self::NONE
    }
}

/// Cell protection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    /// Cell is locked (protected when sheet is protected)
    pub locked: bool,
    /// Formula is hidden when sheet is protected
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

impl Protection {
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            hidden: false,
        }
    }
}

//! Terminal cell
//!
//! Represents a single cell in the terminal grid: a character plus its
//! colors, attribute flags, and optional hyperlink and image references.
//! Wide characters occupy two cells, the second carrying the spacer flag.

use bitflags::bitflags;

use super::color::{Color, NamedColor};

bitflags! {
    /// Cell rendering attributes, including the wide-character markers and
    /// the dirty-tracking bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const DOUBLE_UNDERLINE = 1 << 4;
        const CURLY_UNDERLINE  = 1 << 5;
        const DOTTED_UNDERLINE = 1 << 6;
        const DASHED_UNDERLINE = 1 << 7;
        const BLINK_SLOW       = 1 << 8;
        const BLINK_FAST       = 1 << 9;
        const REVERSE          = 1 << 10;
        const HIDDEN           = 1 << 11;
        const STRIKE           = 1 << 12;
        const WIDE_CHAR        = 1 << 13;
        const WIDE_CHAR_SPACER = 1 << 14;
        const DIRTY            = 1 << 15;
    }
}

impl CellFlags {
    /// Union of the five mutually exclusive underline styles.
    pub const ANY_UNDERLINE: CellFlags = CellFlags::UNDERLINE
        .union(CellFlags::DOUBLE_UNDERLINE)
        .union(CellFlags::CURLY_UNDERLINE)
        .union(CellFlags::DOTTED_UNDERLINE)
        .union(CellFlags::DASHED_UNDERLINE);

    /// Union of both blink speeds.
    pub const ANY_BLINK: CellFlags = CellFlags::BLINK_SLOW.union(CellFlags::BLINK_FAST);
}

/// Hyperlink attached to a cell (OSC 8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    /// The `id=` parameter, empty when absent.
    pub id: String,
    /// Target URI.
    pub uri: String,
}

/// Lightweight image reference stored in a cell.
///
/// Carries normalized UV coordinates selecting the slice of the image that
/// this cell displays; the pixel data lives in the image store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellImage {
    pub placement_id: u32,
    pub image_id: u32,
    /// Top-left texture coordinate.
    pub u0: f32,
    pub v0: f32,
    /// Bottom-right texture coordinate.
    pub u1: f32,
    pub v1: f32,
    pub z_index: i32,
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The character in this cell. Spacer cells keep a space here.
    pub ch: char,
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Underline color override, `None` for the foreground color.
    pub underline_color: Option<Color>,
    /// Attribute flags.
    pub flags: CellFlags,
    /// Hyperlink, if any.
    pub hyperlink: Option<Hyperlink>,
    /// Image reference, if any.
    pub image: Option<CellImage>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    /// Create a cell with a space character and default role colors.
    pub fn new() -> Self {
        Self {
            ch: ' ',
            fg: Color::Named(NamedColor::Foreground),
            bg: Color::Named(NamedColor::Background),
            underline_color: None,
            flags: CellFlags::empty(),
            hyperlink: None,
            image: None,
        }
    }

    /// Reset the cell to the default state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn has_flag(&self, flag: CellFlags) -> bool {
        self.flags.intersects(flag)
    }

    pub fn set_flag(&mut self, flag: CellFlags) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.flags.remove(flag);
    }

    /// Modified since the last dirty sweep.
    pub fn is_dirty(&self) -> bool {
        self.has_flag(CellFlags::DIRTY)
    }

    pub fn mark_dirty(&mut self) {
        self.set_flag(CellFlags::DIRTY);
    }

    pub fn clear_dirty(&mut self) {
        self.clear_flag(CellFlags::DIRTY);
    }

    /// True if this cell holds a two-column character.
    pub fn is_wide(&self) -> bool {
        self.has_flag(CellFlags::WIDE_CHAR)
    }

    /// True for the second cell of a wide character; skipped when reading
    /// text back out of the grid.
    pub fn is_wide_spacer(&self) -> bool {
        self.has_flag(CellFlags::WIDE_CHAR_SPACER)
    }

    /// True if an image placement covers this cell.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

//! Cursor state and the SGR cell template
//!
//! The cursor tracks position, visibility, and rendering style. Save/restore
//! (DECSC/DECRC) snapshots position, template attributes, origin mode, and
//! the charset configuration, which is also what the alternate-screen swap
//! uses.

use serde::{Deserialize, Serialize};

use super::cell::Cell;

/// Cursor rendering style (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyle {
    /// Style name used in snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            CursorStyle::BlinkingBlock | CursorStyle::SteadyBlock => "block",
            CursorStyle::BlinkingUnderline | CursorStyle::SteadyUnderline => "underline",
            CursorStyle::BlinkingBar | CursorStyle::SteadyBar => "bar",
        }
    }
}

/// Cursor position and presentation (0-based coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub style: CursorStyle,
    pub visible: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    /// Cursor at (0, 0), visible, blinking block.
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            style: CursorStyle::BlinkingBlock,
            visible: true,
        }
    }
}

/// Default attributes applied to newly written characters.
///
/// SGR sequences edit this template; `Input` stamps it onto cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellTemplate {
    pub cell: Cell,
}

impl CellTemplate {
    pub fn new() -> Self {
        Self { cell: Cell::new() }
    }
}

/// Character set selected into one of the G0-G3 slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    Ascii,
    /// DEC special graphics: lowercase letters map to box-drawing glyphs.
    LineDrawing,
}

/// One of the four charset slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharsetIndex {
    G0,
    G1,
    G2,
    G3,
}

impl CharsetIndex {
    pub fn as_usize(self) -> usize {
        match self {
            CharsetIndex::G0 => 0,
            CharsetIndex::G1 => 1,
            CharsetIndex::G2 => 2,
            CharsetIndex::G3 => 3,
        }
    }
}

/// Saved cursor state (DECSC/DECRC and the alternate-screen swap).
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub template: CellTemplate,
    pub origin_mode: bool,
    pub active_charset: usize,
    pub charsets: [Charset; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = Cursor::new();
        assert_eq!(cursor.row, 0);
        assert_eq!(cursor.col, 0);
        assert!(cursor.visible);
        assert_eq!(cursor.style, CursorStyle::BlinkingBlock);
    }

    #[test]
    fn test_cursor_style_names() {
        assert_eq!(CursorStyle::BlinkingBlock.as_str(), "block");
        assert_eq!(CursorStyle::SteadyUnderline.as_str(), "underline");
        assert_eq!(CursorStyle::BlinkingBar.as_str(), "bar");
    }

    #[test]
    fn test_template_default_is_blank_cell() {
        let template = CellTemplate::new();
        assert_eq!(template.cell, Cell::new());
    }

    #[test]
    fn test_charset_index() {
        assert_eq!(CharsetIndex::G0.as_usize(), 0);
        assert_eq!(CharsetIndex::G3.as_usize(), 3);
    }
}

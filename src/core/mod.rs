//! Terminal core model
//!
//! Platform-independent building blocks of the emulator:
//! - Cells, colors, and attribute flags
//! - Cursor state and the SGR template
//! - The buffer (grid, wrapped lines, tab stops, dirty tracking)
//! - Scrollback storage

pub mod buffer;
pub mod cell;
pub mod color;
pub mod cursor;
pub mod scrollback;

pub use buffer::{cells_to_string, Buffer, Position};
pub use cell::{Cell, CellFlags, CellImage, Hyperlink};
pub use color::{
    default_palette, resolve_color, Color, NamedColor, Rgba, DEFAULT_BACKGROUND, DEFAULT_CURSOR,
    DEFAULT_FOREGROUND,
};
pub use cursor::{CellTemplate, Charset, CharsetIndex, Cursor, CursorStyle, SavedCursor};
pub use scrollback::{
    MemoryScrollback, NoopScrollback, ScrollbackProvider, DEFAULT_SCROLLBACK_LINES,
};

//! Headless VT220-compatible terminal emulator
//!
//! `headless-vt` consumes a stream of raw terminal output (text interleaved
//! with control sequences) and maintains an in-memory model of what a real
//! terminal would display: a grid of styled cells, a cursor, scroll regions,
//! alternate-screen state, scrollback history, attached images, and
//! shell-integration annotations. Nothing is rendered; the model is there to
//! be queried.
//!
//! # Architecture
//!
//! - `core`: platform-independent screen model (cells, colors, buffer,
//!   cursor, scrollback)
//! - `parser`: escape-sequence state machine (CSI, OSC, DCS, APC, ...)
//! - `term`: the [`Terminal`] - handler surface, middleware, providers,
//!   snapshots, shell integration
//! - `graphics`: image store, sixel decoder, Kitty graphics protocol
//!
//! # Example
//!
//! ```
//! use headless_vt::Terminal;
//!
//! let term = Terminal::new();
//! term.write(b"Hello, \x1b[31mWorld\x1b[0m!");
//!
//! assert_eq!(term.line_content(0), "Hello, World!");
//! assert_eq!(term.cursor_pos(), (0, 13));
//! ```

pub mod core;
pub mod graphics;
pub mod parser;
pub mod term;

pub use crate::core::{
    Cell, CellFlags, CellImage, Color, Hyperlink, MemoryScrollback, NamedColor, NoopScrollback,
    Position, Rgba, ScrollbackProvider,
};
pub use crate::core::cursor::{Charset, CharsetIndex, Cursor, CursorStyle};
pub use graphics::{ImageData, ImagePlacement, ImageStore};
pub use parser::{Action, Parser};
pub use term::middleware::Middleware;
pub use term::providers::{
    ApcProvider, BellProvider, BufferResponse, ClipboardProvider, FixedSize, MemoryRecording,
    NotificationPayload, NotificationProvider, PmProvider, RecordingProvider, ResponseProvider,
    ShellIntegrationProvider, SizeProvider, SosProvider, TitleProvider,
};
pub use term::shell::{PromptMark, PromptMarkKind};
pub use term::snapshot::{ImageSnapshot, Snapshot, SnapshotDetail};
pub use term::{
    CharAttribute, KeyboardMode, KeyboardModeBehavior, LineClearMode, Mode, ScreenClearMode,
    Selection, TabClearMode, Terminal, TerminalOptions, DEFAULT_COLS, DEFAULT_ROWS,
};

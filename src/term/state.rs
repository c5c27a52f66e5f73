//! Terminal state
//!
//! The single mutable state record guarded by the terminal's lock: both
//! buffers, cursor, template, charsets, scroll region, modes, stacks, and
//! annotations. Methods here are pure state transitions; provider calls and
//! response writes happen a layer up.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use crate::core::buffer::{Buffer, Position};
use crate::core::cell::{CellFlags, Hyperlink};
use crate::core::color::{Color, NamedColor, Rgba};
use crate::core::cursor::{CellTemplate, Charset, CharsetIndex, Cursor, CursorStyle, SavedCursor};
use crate::core::scrollback::ScrollbackProvider;

use super::shell::PromptMark;

/// Default terminal height in rows.
pub const DEFAULT_ROWS: usize = 24;
/// Default terminal width in columns.
pub const DEFAULT_COLS: usize = 80;

bitflags! {
    /// Active terminal behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TerminalMode: u32 {
        const CURSOR_KEYS             = 1 << 0;
        const COLUMN_MODE             = 1 << 1;
        const INSERT                  = 1 << 2;
        const ORIGIN                  = 1 << 3;
        const LINE_WRAP               = 1 << 4;
        const BLINKING_CURSOR         = 1 << 5;
        const LINE_FEED_NEW_LINE      = 1 << 6;
        const SHOW_CURSOR             = 1 << 7;
        const REPORT_MOUSE_CLICKS     = 1 << 8;
        const REPORT_CELL_MOUSE_MOTION = 1 << 9;
        const REPORT_ALL_MOUSE_MOTION = 1 << 10;
        const REPORT_FOCUS_IN_OUT     = 1 << 11;
        const UTF8_MOUSE              = 1 << 12;
        const SGR_MOUSE               = 1 << 13;
        const ALTERNATE_SCROLL        = 1 << 14;
        const URGENCY_HINTS           = 1 << 15;
        const SWAP_SCREEN_AND_SET_RESTORE_CURSOR = 1 << 16;
        const BRACKETED_PASTE         = 1 << 17;
        const KEYPAD_APPLICATION      = 1 << 18;
    }
}

/// A settable terminal mode (DEC private and ANSI modes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    CursorKeys,
    ColumnMode,
    Insert,
    Origin,
    LineWrap,
    BlinkingCursor,
    LineFeedNewLine,
    ShowCursor,
    ReportMouseClicks,
    ReportCellMouseMotion,
    ReportAllMouseMotion,
    ReportFocusInOut,
    Utf8Mouse,
    SgrMouse,
    AlternateScroll,
    UrgencyHints,
    SwapScreenAndSetRestoreCursor,
    BracketedPaste,
    KeypadApplication,
}

impl Mode {
    pub(crate) fn flag(self) -> TerminalMode {
        match self {
            Mode::CursorKeys => TerminalMode::CURSOR_KEYS,
            Mode::ColumnMode => TerminalMode::COLUMN_MODE,
            Mode::Insert => TerminalMode::INSERT,
            Mode::Origin => TerminalMode::ORIGIN,
            Mode::LineWrap => TerminalMode::LINE_WRAP,
            Mode::BlinkingCursor => TerminalMode::BLINKING_CURSOR,
            Mode::LineFeedNewLine => TerminalMode::LINE_FEED_NEW_LINE,
            Mode::ShowCursor => TerminalMode::SHOW_CURSOR,
            Mode::ReportMouseClicks => TerminalMode::REPORT_MOUSE_CLICKS,
            Mode::ReportCellMouseMotion => TerminalMode::REPORT_CELL_MOUSE_MOTION,
            Mode::ReportAllMouseMotion => TerminalMode::REPORT_ALL_MOUSE_MOTION,
            Mode::ReportFocusInOut => TerminalMode::REPORT_FOCUS_IN_OUT,
            Mode::Utf8Mouse => TerminalMode::UTF8_MOUSE,
            Mode::SgrMouse => TerminalMode::SGR_MOUSE,
            Mode::AlternateScroll => TerminalMode::ALTERNATE_SCROLL,
            Mode::UrgencyHints => TerminalMode::URGENCY_HINTS,
            Mode::SwapScreenAndSetRestoreCursor => {
                TerminalMode::SWAP_SCREEN_AND_SET_RESTORE_CURSOR
            }
            Mode::BracketedPaste => TerminalMode::BRACKETED_PASTE,
            Mode::KeypadApplication => TerminalMode::KEYPAD_APPLICATION,
        }
    }

    /// Map a DEC private mode number (CSI ? Pm h/l) to a mode.
    pub fn from_private(param: u16) -> Option<Self> {
        match param {
            1 => Some(Mode::CursorKeys),
            3 => Some(Mode::ColumnMode),
            6 => Some(Mode::Origin),
            7 => Some(Mode::LineWrap),
            12 => Some(Mode::BlinkingCursor),
            25 => Some(Mode::ShowCursor),
            1000 => Some(Mode::ReportMouseClicks),
            1002 => Some(Mode::ReportCellMouseMotion),
            1003 => Some(Mode::ReportAllMouseMotion),
            1004 => Some(Mode::ReportFocusInOut),
            1005 => Some(Mode::Utf8Mouse),
            1006 => Some(Mode::SgrMouse),
            1007 => Some(Mode::AlternateScroll),
            1042 => Some(Mode::UrgencyHints),
            1049 => Some(Mode::SwapScreenAndSetRestoreCursor),
            2004 => Some(Mode::BracketedPaste),
            _ => None,
        }
    }

    /// Map an ANSI mode number (CSI Pm h/l) to a mode.
    pub fn from_ansi(param: u16) -> Option<Self> {
        match param {
            4 => Some(Mode::Insert),
            20 => Some(Mode::LineFeedNewLine),
            _ => None,
        }
    }
}

/// EL (erase in line) scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClearMode {
    /// Cursor to end of line.
    Right,
    /// Start of line through the cursor.
    Left,
    /// Whole line.
    All,
}

/// ED (erase in display) scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenClearMode {
    /// Cursor to end of screen.
    Below,
    /// Start of screen through the cursor.
    Above,
    /// Whole screen.
    All,
    /// Whole screen plus saved lines.
    Saved,
}

/// TBC (tab clear) scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabClearMode {
    /// Tab stop at the cursor column.
    Current,
    /// All tab stops.
    All,
}

/// One SGR attribute as dispatched to the template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharAttribute {
    Reset,
    Bold,
    Dim,
    Italic,
    Underline,
    DoubleUnderline,
    CurlyUnderline,
    DottedUnderline,
    DashedUnderline,
    BlinkSlow,
    BlinkFast,
    Reverse,
    Hidden,
    Strike,
    CancelBold,
    CancelBoldDim,
    CancelItalic,
    CancelUnderline,
    CancelBlink,
    CancelReverse,
    CancelHidden,
    CancelStrike,
    /// `None` selects the default foreground.
    Foreground(Option<Color>),
    /// `None` selects the default background.
    Background(Option<Color>),
    /// `None` clears the underline color.
    UnderlineColor(Option<Color>),
}

bitflags! {
    /// Progressive keyboard enhancement flags (kitty keyboard protocol).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyboardMode: u8 {
        const DISAMBIGUATE_ESC_CODES  = 1 << 0;
        const REPORT_EVENT_TYPES      = 1 << 1;
        const REPORT_ALTERNATE_KEYS   = 1 << 2;
        const REPORT_ALL_KEYS_AS_ESC  = 1 << 3;
        const REPORT_ASSOCIATED_TEXT  = 1 << 4;
    }
}

/// How a keyboard-mode set applies to the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardModeBehavior {
    Replace,
    Union,
    Difference,
}

/// Which buffer receives writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveBuffer {
    #[default]
    Primary,
    Alternate,
}

/// A rectangular text selection, normalized so `start` <= `end`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
    pub active: bool,
}

/// The complete mutable terminal state.
pub(crate) struct TermState {
    pub rows: usize,
    pub cols: usize,

    pub primary: Buffer,
    pub alternate: Buffer,
    pub active: ActiveBuffer,

    pub cursor: Cursor,
    pub saved_cursor: Option<SavedCursor>,
    pub template: CellTemplate,

    pub charsets: [Charset; 4],
    pub active_charset: usize,

    /// Scroll region `[top, bottom)`, bottom exclusive.
    pub scroll_top: usize,
    pub scroll_bottom: usize,

    pub modes: TerminalMode,

    pub title: String,
    pub title_stack: Vec<String>,

    /// Palette redefinitions from OSC 4/10/11/12. Indices 256-258 hold the
    /// dynamic foreground/background/cursor colors.
    pub palette_overrides: HashMap<usize, Rgba>,

    pub current_hyperlink: Option<Hyperlink>,

    pub keyboard_modes: Vec<KeyboardMode>,
    pub modify_other_keys: u8,

    pub selection: Selection,
    pub prompt_marks: Vec<PromptMark>,
    pub working_dir: String,
    pub user_vars: HashMap<String, String>,

    pub auto_resize: bool,
    pub sixel_enabled: bool,
    pub kitty_enabled: bool,
}

impl TermState {
    pub fn new(
        rows: usize,
        cols: usize,
        scrollback: Arc<dyn ScrollbackProvider>,
        auto_resize: bool,
    ) -> Self {
        Self {
            rows,
            cols,
            primary: Buffer::with_scrollback(rows, cols, scrollback),
            alternate: Buffer::new(rows, cols),
            active: ActiveBuffer::Primary,
            cursor: Cursor::new(),
            saved_cursor: None,
            template: CellTemplate::new(),
            charsets: [Charset::Ascii; 4],
            active_charset: 0,
            scroll_top: 0,
            scroll_bottom: rows,
            modes: TerminalMode::LINE_WRAP | TerminalMode::SHOW_CURSOR,
            title: String::new(),
            title_stack: Vec::new(),
            palette_overrides: HashMap::new(),
            current_hyperlink: None,
            keyboard_modes: Vec::new(),
            modify_other_keys: 0,
            selection: Selection::default(),
            prompt_marks: Vec::new(),
            working_dir: String::new(),
            user_vars: HashMap::new(),
            auto_resize,
            sixel_enabled: true,
            kitty_enabled: true,
        }
    }

    pub fn active(&self) -> &Buffer {
        match self.active {
            ActiveBuffer::Primary => &self.primary,
            ActiveBuffer::Alternate => &self.alternate,
        }
    }

    pub fn active_mut(&mut self) -> &mut Buffer {
        match self.active {
            ActiveBuffer::Primary => &mut self.primary,
            ActiveBuffer::Alternate => &mut self.alternate,
        }
    }

    pub fn is_alternate(&self) -> bool {
        self.active == ActiveBuffer::Alternate
    }

    fn effective_row(&self, row: usize) -> usize {
        if self.modes.contains(TerminalMode::ORIGIN) {
            row + self.scroll_top
        } else {
            row
        }
    }

    /// Write one character at the cursor, handling charset translation,
    /// width classes, wrapping/growth, insert mode, and wide spacers.
    pub fn input(&mut self, c: char) {
        let c = if self
            .charsets
            .get(self.active_charset)
            .copied()
            .unwrap_or(Charset::Ascii)
            == Charset::LineDrawing
        {
            translate_line_drawing(c)
        } else {
            c
        };

        let width = UnicodeWidthChar::width(c).unwrap_or(0);

        // Zero-width characters (combining marks) are dropped; combining
        // them onto the previous cell is not supported.
        if width == 0 {
            return;
        }

        if self.cursor.col + width > self.cols {
            if self.auto_resize {
                let row = self.cursor.row;
                let min = self.cursor.col + width;
                self.active_mut().grow_cols(row, min);
                self.cols = self.active().cols();
                if self.cursor.col >= self.cols {
                    self.cursor.col = self.cols - 1;
                }
            } else if self.modes.contains(TerminalMode::LINE_WRAP) {
                let row = self.cursor.row;
                self.active_mut().set_wrapped(row, true);
                self.cursor.col = 0;
                self.cursor.row += 1;
                if self.cursor.row >= self.rows {
                    self.scroll_if_needed();
                }
            } else {
                // A wide character that cannot fit is dropped entirely
                if width == 2 {
                    return;
                }
                self.cursor.col = self.cols - 1;
            }
        }

        if self.modes.contains(TerminalMode::INSERT) {
            let (row, col) = (self.cursor.row, self.cursor.col);
            self.active_mut().insert_blanks(row, col, width);
        }

        if self.cursor.row >= self.rows {
            return;
        }

        let write_row = self.cursor.row;

        if self.cursor.col < self.cols {
            let template = self.template.cell.clone();
            let hyperlink = self.current_hyperlink.clone();
            let (row, col) = (self.cursor.row, self.cursor.col);
            if let Some(cell) = self.active_mut().cell_mut(row, col) {
                cell.ch = c;
                cell.fg = template.fg;
                cell.bg = template.bg;
                cell.underline_color = template.underline_color;
                cell.flags = template.flags;
                cell.hyperlink = hyperlink;
                cell.image = None;

                if width == 2 {
                    cell.set_flag(CellFlags::WIDE_CHAR);
                } else {
                    cell.clear_flag(CellFlags::WIDE_CHAR | CellFlags::WIDE_CHAR_SPACER);
                }
            }
            self.active_mut().mark_dirty(row, col);
        }

        self.cursor.col += 1;

        if width == 2 && self.cursor.col < self.cols {
            let template = self.template.cell.clone();
            let (row, col) = (self.cursor.row, self.cursor.col);
            if let Some(spacer) = self.active_mut().cell_mut(row, col) {
                spacer.reset();
                spacer.fg = template.fg;
                spacer.bg = template.bg;
                spacer.set_flag(CellFlags::WIDE_CHAR_SPACER);
            }
            self.active_mut().mark_dirty(row, col);
            self.cursor.col += 1;
        }

        // Overwriting half of an existing wide pair blanks the other half
        self.active_mut().repair_wide_pairs(write_row);

        // Post-write clamps: wrap/growth paths handle overflow themselves
        if self.cursor.col >= self.cols
            && !self.auto_resize
            && !self.modes.contains(TerminalMode::LINE_WRAP)
        {
            self.cursor.col = self.cols - 1;
        }
        if self.cursor.row >= self.rows && !self.auto_resize {
            let max = self.active().rows();
            if self.cursor.row >= max {
                self.cursor.row = max.saturating_sub(1);
            }
        }
    }

    /// Scroll or grow so the cursor lands back inside the scroll region.
    pub fn scroll_if_needed(&mut self) {
        if self.cursor.row >= self.scroll_bottom {
            if self.auto_resize {
                let add = self.cursor.row - self.scroll_bottom + 1;
                self.active_mut().grow_rows(add);
                self.rows = self.active().rows();
                self.scroll_bottom = self.rows;
            } else {
                let n = self.cursor.row - self.scroll_bottom + 1;
                let (top, bottom) = (self.scroll_top, self.scroll_bottom);
                self.active_mut().scroll_up(top, bottom, n);
                self.cursor.row = self.scroll_bottom - 1;
            }
        } else if self.cursor.row < self.scroll_top {
            let n = self.scroll_top - self.cursor.row;
            let (top, bottom) = (self.scroll_top, self.scroll_bottom);
            self.active_mut().scroll_down(top, bottom, n);
            self.cursor.row = self.scroll_top;
        }
    }

    pub fn line_feed(&mut self) {
        // An explicit line feed means the current row did not wrap
        let row = self.cursor.row;
        self.active_mut().set_wrapped(row, false);

        if self.modes.contains(TerminalMode::LINE_FEED_NEW_LINE) {
            self.cursor.col = 0;
        }
        self.cursor.row += 1;
        self.scroll_if_needed();
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    pub fn tab(&mut self, n: usize) {
        for _ in 0..n {
            self.cursor.col = self.active().next_tab_stop(self.cursor.col);
        }
    }

    pub fn backward_tabs(&mut self, n: usize) {
        for _ in 0..n {
            self.cursor.col = self.active().prev_tab_stop(self.cursor.col);
        }
    }

    pub fn reverse_index(&mut self) {
        if self.cursor.row == self.scroll_top {
            let (top, bottom) = (self.scroll_top, self.scroll_bottom);
            self.active_mut().scroll_down(top, bottom, 1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn goto(&mut self, row: usize, col: usize) {
        let row = self.effective_row(row);
        self.cursor.row = row.min(self.rows.saturating_sub(1));
        self.cursor.col = col.min(self.cols.saturating_sub(1));
    }

    pub fn goto_line(&mut self, row: usize) {
        let row = self.effective_row(row);
        self.cursor.row = row.min(self.rows.saturating_sub(1));
    }

    pub fn goto_col(&mut self, col: usize) {
        self.cursor.col = col.min(self.cols.saturating_sub(1));
    }

    pub fn move_up(&mut self, n: usize) {
        self.cursor.row = self.cursor.row.saturating_sub(n);
    }

    pub fn move_down(&mut self, n: usize) {
        self.cursor.row = (self.cursor.row + n).min(self.rows.saturating_sub(1));
    }

    pub fn move_forward(&mut self, n: usize) {
        self.cursor.col = (self.cursor.col + n).min(self.cols.saturating_sub(1));
    }

    pub fn move_backward(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(n);
    }

    pub fn clear_line(&mut self, mode: LineClearMode) {
        let (row, col, cols) = (self.cursor.row, self.cursor.col, self.cols);
        match mode {
            LineClearMode::Right => self.active_mut().clear_row_range(row, col, cols),
            LineClearMode::Left => self.active_mut().clear_row_range(row, 0, col + 1),
            LineClearMode::All => self.active_mut().clear_row(row),
        }
    }

    pub fn clear_screen(&mut self, mode: ScreenClearMode) {
        let (row, col, rows, cols) = (self.cursor.row, self.cursor.col, self.rows, self.cols);
        match mode {
            ScreenClearMode::Below => {
                self.active_mut().clear_row_range(row, col, cols);
                for r in row + 1..rows {
                    self.active_mut().clear_row(r);
                }
            }
            ScreenClearMode::Above => {
                for r in 0..row {
                    self.active_mut().clear_row(r);
                }
                self.active_mut().clear_row_range(row, 0, col + 1);
            }
            ScreenClearMode::All => self.active_mut().clear_all(),
            ScreenClearMode::Saved => {
                // TODO: also clear scrollback once ED 3 semantics are
                // nailed down; today this only clears the screen.
                self.active_mut().clear_all();
            }
        }
    }

    pub fn clear_tabs(&mut self, mode: TabClearMode) {
        match mode {
            TabClearMode::Current => {
                let col = self.cursor.col;
                self.active_mut().clear_tab_stop(col);
            }
            TabClearMode::All => self.active_mut().clear_all_tab_stops(),
        }
    }

    pub fn insert_blank(&mut self, n: usize) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.active_mut().insert_blanks(row, col, n);
    }

    pub fn insert_blank_lines(&mut self, n: usize) {
        if self.cursor.row >= self.scroll_top && self.cursor.row < self.scroll_bottom {
            let (row, bottom) = (self.cursor.row, self.scroll_bottom);
            self.active_mut().insert_lines(row, n, bottom);
        }
    }

    pub fn delete_lines(&mut self, n: usize) {
        if self.cursor.row >= self.scroll_top && self.cursor.row < self.scroll_bottom {
            let (row, bottom) = (self.cursor.row, self.scroll_bottom);
            self.active_mut().delete_lines(row, n, bottom);
        }
    }

    pub fn delete_chars(&mut self, n: usize) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.active_mut().delete_chars(row, col, n);
    }

    pub fn erase_chars(&mut self, n: usize) {
        let (row, col, cols) = (self.cursor.row, self.cursor.col, self.cols);
        for i in 0..n {
            if col + i >= cols {
                break;
            }
            if let Some(cell) = self.active_mut().cell_mut(row, col + i) {
                cell.reset();
            }
            self.active_mut().mark_dirty(row, col + i);
        }
        self.active_mut().repair_wide_pairs(row);
    }

    pub fn scroll_up_region(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        self.active_mut().scroll_up(top, bottom, n);
    }

    pub fn scroll_down_region(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        self.active_mut().scroll_down(top, bottom, n);
    }

    /// DECSTBM with 1-based inclusive arguments.
    pub fn set_scrolling_region(&mut self, top: usize, bottom: usize) {
        let top = top.saturating_sub(1);
        let bottom = if bottom == 0 || bottom > self.rows {
            self.rows
        } else {
            bottom
        };
        if top >= bottom {
            return;
        }

        self.scroll_top = top;
        self.scroll_bottom = bottom;

        self.cursor.row = if self.modes.contains(TerminalMode::ORIGIN) {
            self.scroll_top
        } else {
            0
        };
        self.cursor.col = 0;
    }

    /// Apply one SGR attribute to the template.
    pub fn apply_char_attribute(&mut self, attr: CharAttribute) {
        let cell = &mut self.template.cell;
        match attr {
            CharAttribute::Reset => self.template = CellTemplate::new(),
            CharAttribute::Bold => cell.set_flag(CellFlags::BOLD),
            CharAttribute::Dim => cell.set_flag(CellFlags::DIM),
            CharAttribute::Italic => cell.set_flag(CellFlags::ITALIC),
            CharAttribute::Underline => {
                cell.clear_flag(CellFlags::ANY_UNDERLINE);
                cell.set_flag(CellFlags::UNDERLINE);
            }
            CharAttribute::DoubleUnderline => {
                cell.clear_flag(CellFlags::ANY_UNDERLINE);
                cell.set_flag(CellFlags::DOUBLE_UNDERLINE);
            }
            CharAttribute::CurlyUnderline => {
                cell.clear_flag(CellFlags::ANY_UNDERLINE);
                cell.set_flag(CellFlags::CURLY_UNDERLINE);
            }
            CharAttribute::DottedUnderline => {
                cell.clear_flag(CellFlags::ANY_UNDERLINE);
                cell.set_flag(CellFlags::DOTTED_UNDERLINE);
            }
            CharAttribute::DashedUnderline => {
                cell.clear_flag(CellFlags::ANY_UNDERLINE);
                cell.set_flag(CellFlags::DASHED_UNDERLINE);
            }
            CharAttribute::BlinkSlow => cell.set_flag(CellFlags::BLINK_SLOW),
            CharAttribute::BlinkFast => cell.set_flag(CellFlags::BLINK_FAST),
            CharAttribute::Reverse => cell.set_flag(CellFlags::REVERSE),
            CharAttribute::Hidden => cell.set_flag(CellFlags::HIDDEN),
            CharAttribute::Strike => cell.set_flag(CellFlags::STRIKE),
            CharAttribute::CancelBold => cell.clear_flag(CellFlags::BOLD),
            CharAttribute::CancelBoldDim => cell.clear_flag(CellFlags::BOLD | CellFlags::DIM),
            CharAttribute::CancelItalic => cell.clear_flag(CellFlags::ITALIC),
            CharAttribute::CancelUnderline => cell.clear_flag(CellFlags::ANY_UNDERLINE),
            CharAttribute::CancelBlink => cell.clear_flag(CellFlags::ANY_BLINK),
            CharAttribute::CancelReverse => cell.clear_flag(CellFlags::REVERSE),
            CharAttribute::CancelHidden => cell.clear_flag(CellFlags::HIDDEN),
            CharAttribute::CancelStrike => cell.clear_flag(CellFlags::STRIKE),
            CharAttribute::Foreground(color) => {
                cell.fg = color.unwrap_or(Color::Named(NamedColor::Foreground));
            }
            CharAttribute::Background(color) => {
                cell.bg = color.unwrap_or(Color::Named(NamedColor::Background));
            }
            CharAttribute::UnderlineColor(color) => cell.underline_color = color,
        }
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            template: self.template.clone(),
            origin_mode: self.modes.contains(TerminalMode::ORIGIN),
            active_charset: self.active_charset,
            charsets: self.charsets,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.clone() {
            self.cursor.row = saved.row.min(self.rows.saturating_sub(1));
            self.cursor.col = saved.col.min(self.cols.saturating_sub(1));
            self.template = saved.template;
            self.modes.set(TerminalMode::ORIGIN, saved.origin_mode);
            self.active_charset = saved.active_charset;
            self.charsets = saved.charsets;
        }
    }

    /// Set or clear a mode flag, applying side effects. The
    /// alternate-screen swap's placement clearing happens in the terminal
    /// layer, which owns the image store.
    pub fn set_mode_flag(&mut self, mode: Mode, set: bool) {
        match mode {
            Mode::Origin if set => {
                self.cursor.row = self.scroll_top;
                self.cursor.col = 0;
            }
            Mode::ShowCursor => self.cursor.visible = set,
            Mode::SwapScreenAndSetRestoreCursor => {
                if set {
                    self.save_cursor();
                    self.active = ActiveBuffer::Alternate;
                    self.alternate.clear_all();
                } else {
                    self.active = ActiveBuffer::Primary;
                    self.restore_cursor();
                }
            }
            _ => {}
        }
        self.modes.set(mode.flag(), set);
    }

    /// RIS: restore the power-on state of the active screen.
    pub fn reset_state(&mut self) {
        self.active_mut().clear_all();
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.cursor.visible = true;
        self.cursor.style = CursorStyle::BlinkingBlock;

        self.template = CellTemplate::new();
        self.scroll_top = 0;
        self.scroll_bottom = self.rows;
        self.modes = TerminalMode::LINE_WRAP | TerminalMode::SHOW_CURSOR;

        self.charsets = [Charset::Ascii; 4];
        self.active_charset = 0;

        self.palette_overrides.clear();
        self.keyboard_modes.clear();
        self.current_hyperlink = None;
    }

    pub fn configure_charset(&mut self, index: CharsetIndex, charset: Charset) {
        self.charsets[index.as_usize()] = charset;
    }

    pub fn set_active_charset(&mut self, n: usize) {
        if n < 4 {
            self.active_charset = n;
        }
    }

    pub fn substitute(&mut self) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        if let Some(cell) = self.active_mut().cell_mut(row, col) {
            cell.ch = '?';
        }
    }

    /// Resize both buffers, preserving the top-left corner.
    ///
    /// Shrinking rows on the primary screen scrolls displaced rows into
    /// scrollback when the cursor would otherwise fall outside the screen;
    /// growing rows pulls the most recent scrollback lines back in.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if rows == 0 || cols == 0 {
            return;
        }

        let old_rows = self.rows;

        if rows < old_rows && self.active == ActiveBuffer::Primary && self.cursor.row >= rows {
            let n = old_rows - rows;
            self.primary.scroll_up(0, old_rows, n);
            self.cursor.row = self.cursor.row.saturating_sub(n);
        }

        self.rows = rows;
        self.cols = cols;
        self.primary.resize(rows, cols);
        self.alternate.resize(rows, cols);

        if rows > old_rows && self.active == ActiveBuffer::Primary {
            let pull = (rows - old_rows).min(self.primary.scrollback_len());
            if pull > 0 {
                self.primary.scroll_down(0, rows, pull);
                for i in 0..pull {
                    let Some(line) = self.primary.scrollback_pop() else {
                        break;
                    };
                    let target = pull - 1 - i;
                    for (col, cell) in line.into_iter().take(cols).enumerate() {
                        self.primary.set_cell(target, col, cell);
                    }
                }
                self.cursor.row = (self.cursor.row + pull).min(rows - 1);
            }
        }

        self.cursor.row = self.cursor.row.min(rows - 1);
        self.cursor.col = self.cursor.col.min(cols - 1);

        self.scroll_top = 0;
        self.scroll_bottom = rows;
    }
}

/// DEC special graphics translation for the line-drawing charset.
fn translate_line_drawing(c: char) -> char {
    match c {
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'q' => '─',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scrollback::NoopScrollback;

    fn state(rows: usize, cols: usize) -> TermState {
        TermState::new(rows, cols, Arc::new(NoopScrollback), false)
    }

    #[test]
    fn test_input_basic() {
        let mut st = state(24, 80);
        st.input('H');
        st.input('i');
        assert_eq!(st.active().cell(0, 0).unwrap().ch, 'H');
        assert_eq!(st.active().cell(0, 1).unwrap().ch, 'i');
        assert_eq!(st.cursor.col, 2);
    }

    #[test]
    fn test_input_wide_char_pairs() {
        let mut st = state(24, 80);
        st.input('中');
        assert!(st.active().cell(0, 0).unwrap().is_wide());
        assert!(st.active().cell(0, 1).unwrap().is_wide_spacer());
        assert_eq!(st.cursor.col, 2);
    }

    #[test]
    fn test_input_zero_width_dropped() {
        let mut st = state(24, 80);
        st.input('a');
        st.input('\u{0301}'); // combining acute accent
        assert_eq!(st.cursor.col, 1);
        assert_eq!(st.active().cell(0, 0).unwrap().ch, 'a');
    }

    #[test]
    fn test_input_wraps_and_flags() {
        let mut st = state(24, 10);
        for _ in 0..10 {
            st.input('x');
        }
        assert_eq!(st.cursor.col, 10);
        st.input('y');
        assert_eq!(st.cursor.row, 1);
        assert_eq!(st.cursor.col, 1);
        assert!(st.active().is_wrapped(0));
    }

    #[test]
    fn test_input_no_wrap_overwrites_last_cell() {
        let mut st = state(24, 10);
        st.set_mode_flag(Mode::LineWrap, false);
        for c in "abcdefghij".chars() {
            st.input(c);
        }
        st.input('Z');
        assert_eq!(st.cursor.row, 0);
        assert_eq!(st.cursor.col, 9);
        assert_eq!(st.active().cell(0, 9).unwrap().ch, 'Z');
    }

    #[test]
    fn test_input_wide_dropped_at_edge_without_wrap() {
        let mut st = state(24, 10);
        st.set_mode_flag(Mode::LineWrap, false);
        st.goto(0, 9);
        st.input('中');
        assert_eq!(st.active().cell(0, 9).unwrap().ch, ' ');
    }

    #[test]
    fn test_input_insert_mode_shifts() {
        let mut st = state(24, 10);
        for c in "abc".chars() {
            st.input(c);
        }
        st.goto(0, 0);
        st.set_mode_flag(Mode::Insert, true);
        st.input('X');
        assert_eq!(st.active().line_content(0), "Xabc");
    }

    #[test]
    fn test_line_feed_scrolls_at_bottom() {
        let mut st = state(3, 10);
        st.input('A');
        st.cursor.row = 2;
        st.line_feed();
        assert_eq!(st.cursor.row, 2);
        assert_eq!(st.active().line_content(0), "");
    }

    #[test]
    fn test_line_feed_clears_wrapped() {
        let mut st = state(24, 10);
        st.active_mut().set_wrapped(0, true);
        st.line_feed();
        assert!(!st.active().is_wrapped(0));
    }

    #[test]
    fn test_reverse_index_at_top_scrolls_down() {
        let mut st = state(5, 10);
        st.input('A');
        st.cursor.row = 0;
        st.cursor.col = 0;
        st.reverse_index();
        assert_eq!(st.active().line_content(1), "A");
        assert_eq!(st.cursor.row, 0);
    }

    #[test]
    fn test_goto_origin_mode() {
        let mut st = state(24, 80);
        st.set_scrolling_region(5, 20);
        st.set_mode_flag(Mode::Origin, true);
        st.goto(0, 0);
        assert_eq!(st.cursor.row, 4);
        st.goto(2, 3);
        assert_eq!(st.cursor.row, 6);
        assert_eq!(st.cursor.col, 3);
    }

    #[test]
    fn test_goto_clamps() {
        let mut st = state(24, 80);
        st.goto(100, 200);
        assert_eq!(st.cursor.row, 23);
        assert_eq!(st.cursor.col, 79);
    }

    #[test]
    fn test_set_scrolling_region_rejects_inverted() {
        let mut st = state(24, 80);
        st.set_scrolling_region(10, 5);
        assert_eq!(st.scroll_top, 0);
        assert_eq!(st.scroll_bottom, 24);
    }

    #[test]
    fn test_clear_screen_below() {
        let mut st = state(3, 5);
        for row in 0..3 {
            for col in 0..5 {
                st.active_mut().cell_mut(row, col).unwrap().ch = 'X';
            }
        }
        st.cursor.row = 1;
        st.cursor.col = 2;
        st.clear_screen(ScreenClearMode::Below);
        assert_eq!(st.active().line_content(0), "XXXXX");
        assert_eq!(st.active().line_content(1), "XX");
        assert_eq!(st.active().line_content(2), "");
    }

    #[test]
    fn test_clear_screen_above() {
        let mut st = state(3, 5);
        for row in 0..3 {
            for col in 0..5 {
                st.active_mut().cell_mut(row, col).unwrap().ch = 'X';
            }
        }
        st.cursor.row = 1;
        st.cursor.col = 2;
        st.clear_screen(ScreenClearMode::Above);
        assert_eq!(st.active().line_content(0), "");
        assert_eq!(st.active().line_content(1), "   XX");
        assert_eq!(st.active().line_content(2), "XXXXX");
    }

    #[test]
    fn test_underline_exclusivity() {
        let mut st = state(24, 80);
        st.apply_char_attribute(CharAttribute::Underline);
        st.apply_char_attribute(CharAttribute::CurlyUnderline);
        let flags = st.template.cell.flags;
        assert!(flags.contains(CellFlags::CURLY_UNDERLINE));
        assert!(!flags.contains(CellFlags::UNDERLINE));
        st.apply_char_attribute(CharAttribute::CancelUnderline);
        assert!(!st.template.cell.has_flag(CellFlags::ANY_UNDERLINE));
    }

    #[test]
    fn test_sgr_default_colors() {
        let mut st = state(24, 80);
        st.apply_char_attribute(CharAttribute::Foreground(Some(Color::Indexed(1))));
        assert_eq!(st.template.cell.fg, Color::Indexed(1));
        st.apply_char_attribute(CharAttribute::Foreground(None));
        assert_eq!(st.template.cell.fg, Color::Named(NamedColor::Foreground));

        st.apply_char_attribute(CharAttribute::UnderlineColor(Some(Color::Indexed(3))));
        assert_eq!(st.template.cell.underline_color, Some(Color::Indexed(3)));
        st.apply_char_attribute(CharAttribute::UnderlineColor(None));
        assert_eq!(st.template.cell.underline_color, None);
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut st = state(24, 80);
        st.goto(5, 10);
        st.apply_char_attribute(CharAttribute::Bold);
        st.configure_charset(CharsetIndex::G1, Charset::LineDrawing);
        st.set_active_charset(1);
        st.save_cursor();

        st.goto(0, 0);
        st.apply_char_attribute(CharAttribute::Reset);
        st.set_active_charset(0);

        st.restore_cursor();
        assert_eq!((st.cursor.row, st.cursor.col), (5, 10));
        assert!(st.template.cell.has_flag(CellFlags::BOLD));
        assert_eq!(st.active_charset, 1);
        assert_eq!(st.charsets[1], Charset::LineDrawing);
    }

    #[test]
    fn test_alternate_swap_preserves_primary() {
        let mut st = state(24, 80);
        st.input('M');
        st.set_mode_flag(Mode::SwapScreenAndSetRestoreCursor, true);
        assert!(st.is_alternate());
        assert_eq!(st.active().line_content(0), "");
        st.input('A');
        st.set_mode_flag(Mode::SwapScreenAndSetRestoreCursor, false);
        assert!(!st.is_alternate());
        assert_eq!(st.active().line_content(0), "M");
    }

    #[test]
    fn test_reset_state() {
        let mut st = state(24, 80);
        st.input('X');
        st.apply_char_attribute(CharAttribute::Bold);
        st.set_scrolling_region(5, 10);
        st.keyboard_modes.push(KeyboardMode::DISAMBIGUATE_ESC_CODES);
        st.reset_state();

        assert_eq!(st.active().line_content(0), "");
        assert_eq!((st.cursor.row, st.cursor.col), (0, 0));
        assert_eq!(st.modes, TerminalMode::LINE_WRAP | TerminalMode::SHOW_CURSOR);
        assert_eq!(st.scroll_bottom, 24);
        assert!(st.keyboard_modes.is_empty());
        assert!(!st.template.cell.has_flag(CellFlags::BOLD));
    }

    #[test]
    fn test_line_drawing_translation() {
        let mut st = state(24, 80);
        st.configure_charset(CharsetIndex::G0, Charset::LineDrawing);
        st.input('q');
        st.input('Z');
        assert_eq!(st.active().cell(0, 0).unwrap().ch, '─');
        assert_eq!(st.active().cell(0, 1).unwrap().ch, 'Z');
    }

    #[test]
    fn test_auto_resize_grows_rows() {
        let mut st = TermState::new(3, 10, Arc::new(NoopScrollback), true);
        st.cursor.row = 2;
        st.line_feed();
        assert_eq!(st.rows, 4);
        assert_eq!(st.cursor.row, 3);
    }

    #[test]
    fn test_auto_resize_grows_cols() {
        let mut st = TermState::new(3, 5, Arc::new(NoopScrollback), true);
        for c in "abcdefg".chars() {
            st.input(c);
        }
        assert!(st.cols >= 7);
        assert_eq!(st.active().line_content(0), "abcdefg");
        assert_eq!(st.cursor.row, 0);
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut st = state(24, 80);
        st.resize(0, 80);
        st.resize(24, 0);
        assert_eq!((st.rows, st.cols), (24, 80));
    }
}

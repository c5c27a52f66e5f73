//! Handler surface
//!
//! One public method per VT event. Each method routes through its
//! middleware slot when installed, otherwise straight to the internal
//! implementation. Internals take the state lock, call providers, and emit
//! responses; grid-level work lives on `TermState`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::core::cell::{CellImage, Hyperlink};
use crate::core::color::{default_palette, Rgba, DEFAULT_BACKGROUND, DEFAULT_CURSOR, DEFAULT_FOREGROUND};
use crate::core::cursor::{Charset, CharsetIndex, CursorStyle};
use crate::graphics::kitty::{self, KittyAction, KittyCommand, KittyDelete};
use crate::graphics::sixel::decode_sixel;
use crate::graphics::ImagePlacement;

use super::providers::NotificationPayload;
use super::shell::PromptMarkKind;
use super::state::{
    CharAttribute, KeyboardMode, KeyboardModeBehavior, LineClearMode, Mode, ScreenClearMode,
    TabClearMode,
};
use super::Terminal;

fn ceil_div(a: u32, b: u32) -> u32 {
    if b == 0 {
        return 0;
    }
    (a + b - 1) / b
}

impl Terminal {
    // --- Character input ---

    /// Write a character at the cursor.
    ///
    /// Zero-width characters (combining marks) are dropped; attaching them
    /// to the preceding cell is not supported.
    pub fn input(&self, c: char) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.input {
            hook(c, &mut |c| self.input_internal(c));
            return;
        }
        drop(mw);
        self.input_internal(c);
    }

    fn input_internal(&self, c: char) {
        self.state().write().input(c);
    }

    // --- Simple cursor motion ---

    pub fn bell(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.bell {
            hook(&mut || self.bell_internal());
            return;
        }
        drop(mw);
        self.bell_internal();
    }

    fn bell_internal(&self) {
        self.bell_provider().ring();
    }

    pub fn backspace(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.backspace {
            hook(&mut || self.backspace_internal());
            return;
        }
        drop(mw);
        self.backspace_internal();
    }

    fn backspace_internal(&self) {
        self.state().write().backspace();
    }

    pub fn carriage_return(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.carriage_return {
            hook(&mut || self.carriage_return_internal());
            return;
        }
        drop(mw);
        self.carriage_return_internal();
    }

    fn carriage_return_internal(&self) {
        self.state().write().carriage_return();
    }

    pub fn line_feed(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.line_feed {
            hook(&mut || self.line_feed_internal());
            return;
        }
        drop(mw);
        self.line_feed_internal();
    }

    fn line_feed_internal(&self) {
        self.state().write().line_feed();
    }

    /// Advance to the next `n` tab stops.
    pub fn tab(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.tab {
            hook(n, &mut |n| self.tab_internal(n));
            return;
        }
        drop(mw);
        self.tab_internal(n);
    }

    fn tab_internal(&self, n: usize) {
        self.state().write().tab(n);
    }

    pub fn horizontal_tab_set(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.horizontal_tab_set {
            hook(&mut || self.horizontal_tab_set_internal());
            return;
        }
        drop(mw);
        self.horizontal_tab_set_internal();
    }

    fn horizontal_tab_set_internal(&self) {
        let mut st = self.state().write();
        let col = st.cursor.col;
        st.active_mut().set_tab_stop(col);
    }

    // --- Clears ---

    pub fn clear_line(&self, mode: LineClearMode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.clear_line {
            hook(mode, &mut |mode| self.clear_line_internal(mode));
            return;
        }
        drop(mw);
        self.clear_line_internal(mode);
    }

    fn clear_line_internal(&self, mode: LineClearMode) {
        self.state().write().clear_line(mode);
    }

    pub fn clear_screen(&self, mode: ScreenClearMode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.clear_screen {
            hook(mode, &mut |mode| self.clear_screen_internal(mode));
            return;
        }
        drop(mw);
        self.clear_screen_internal(mode);
    }

    fn clear_screen_internal(&self, mode: ScreenClearMode) {
        self.state().write().clear_screen(mode);
    }

    pub fn clear_tabs(&self, mode: TabClearMode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.clear_tabs {
            hook(mode, &mut |mode| self.clear_tabs_internal(mode));
            return;
        }
        drop(mw);
        self.clear_tabs_internal(mode);
    }

    fn clear_tabs_internal(&self, mode: TabClearMode) {
        self.state().write().clear_tabs(mode);
    }

    // --- Absolute positioning ---

    /// Move to (row, col), 0-based, honoring origin mode.
    pub fn goto(&self, row: usize, col: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.goto {
            hook(row, col, &mut |row, col| self.goto_internal(row, col));
            return;
        }
        drop(mw);
        self.goto_internal(row, col);
    }

    fn goto_internal(&self, row: usize, col: usize) {
        self.state().write().goto(row, col);
    }

    pub fn goto_line(&self, row: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.goto_line {
            hook(row, &mut |row| self.goto_line_internal(row));
            return;
        }
        drop(mw);
        self.goto_line_internal(row);
    }

    fn goto_line_internal(&self, row: usize) {
        self.state().write().goto_line(row);
    }

    pub fn goto_col(&self, col: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.goto_col {
            hook(col, &mut |col| self.goto_col_internal(col));
            return;
        }
        drop(mw);
        self.goto_col_internal(col);
    }

    fn goto_col_internal(&self, col: usize) {
        self.state().write().goto_col(col);
    }

    // --- Relative motion ---

    pub fn move_up(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_up {
            hook(n, &mut |n| self.move_up_internal(n));
            return;
        }
        drop(mw);
        self.move_up_internal(n);
    }

    fn move_up_internal(&self, n: usize) {
        self.state().write().move_up(n);
    }

    pub fn move_down(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_down {
            hook(n, &mut |n| self.move_down_internal(n));
            return;
        }
        drop(mw);
        self.move_down_internal(n);
    }

    fn move_down_internal(&self, n: usize) {
        self.state().write().move_down(n);
    }

    pub fn move_forward(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_forward {
            hook(n, &mut |n| self.move_forward_internal(n));
            return;
        }
        drop(mw);
        self.move_forward_internal(n);
    }

    fn move_forward_internal(&self, n: usize) {
        self.state().write().move_forward(n);
    }

    pub fn move_backward(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_backward {
            hook(n, &mut |n| self.move_backward_internal(n));
            return;
        }
        drop(mw);
        self.move_backward_internal(n);
    }

    fn move_backward_internal(&self, n: usize) {
        self.state().write().move_backward(n);
    }

    /// Move down `n` rows and return to column 0.
    pub fn move_down_cr(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_down_cr {
            hook(n, &mut |n| self.move_down_cr_internal(n));
            return;
        }
        drop(mw);
        self.move_down_cr_internal(n);
    }

    fn move_down_cr_internal(&self, n: usize) {
        let mut st = self.state().write();
        st.move_down(n);
        st.cursor.col = 0;
    }

    /// Move up `n` rows and return to column 0.
    pub fn move_up_cr(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_up_cr {
            hook(n, &mut |n| self.move_up_cr_internal(n));
            return;
        }
        drop(mw);
        self.move_up_cr_internal(n);
    }

    fn move_up_cr_internal(&self, n: usize) {
        let mut st = self.state().write();
        st.move_up(n);
        st.cursor.col = 0;
    }

    pub fn move_forward_tabs(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_forward_tabs {
            hook(n, &mut |n| self.tab_internal(n));
            return;
        }
        drop(mw);
        self.tab_internal(n);
    }

    pub fn move_backward_tabs(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.move_backward_tabs {
            hook(n, &mut |n| self.move_backward_tabs_internal(n));
            return;
        }
        drop(mw);
        self.move_backward_tabs_internal(n);
    }

    fn move_backward_tabs_internal(&self, n: usize) {
        self.state().write().backward_tabs(n);
    }

    // --- Inserts, deletes, scrolls ---

    pub fn insert_blank(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.insert_blank {
            hook(n, &mut |n| self.insert_blank_internal(n));
            return;
        }
        drop(mw);
        self.insert_blank_internal(n);
    }

    fn insert_blank_internal(&self, n: usize) {
        self.state().write().insert_blank(n);
    }

    pub fn insert_blank_lines(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.insert_blank_lines {
            hook(n, &mut |n| self.insert_blank_lines_internal(n));
            return;
        }
        drop(mw);
        self.insert_blank_lines_internal(n);
    }

    fn insert_blank_lines_internal(&self, n: usize) {
        self.state().write().insert_blank_lines(n);
    }

    pub fn delete_chars(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.delete_chars {
            hook(n, &mut |n| self.delete_chars_internal(n));
            return;
        }
        drop(mw);
        self.delete_chars_internal(n);
    }

    fn delete_chars_internal(&self, n: usize) {
        self.state().write().delete_chars(n);
    }

    pub fn delete_lines(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.delete_lines {
            hook(n, &mut |n| self.delete_lines_internal(n));
            return;
        }
        drop(mw);
        self.delete_lines_internal(n);
    }

    fn delete_lines_internal(&self, n: usize) {
        self.state().write().delete_lines(n);
    }

    pub fn erase_chars(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.erase_chars {
            hook(n, &mut |n| self.erase_chars_internal(n));
            return;
        }
        drop(mw);
        self.erase_chars_internal(n);
    }

    fn erase_chars_internal(&self, n: usize) {
        self.state().write().erase_chars(n);
    }

    pub fn scroll_up(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.scroll_up {
            hook(n, &mut |n| self.scroll_up_internal(n));
            return;
        }
        drop(mw);
        self.scroll_up_internal(n);
    }

    fn scroll_up_internal(&self, n: usize) {
        self.state().write().scroll_up_region(n);
    }

    pub fn scroll_down(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.scroll_down {
            hook(n, &mut |n| self.scroll_down_internal(n));
            return;
        }
        drop(mw);
        self.scroll_down_internal(n);
    }

    fn scroll_down_internal(&self, n: usize) {
        self.state().write().scroll_down_region(n);
    }

    /// DECSTBM: set the scroll region with 1-based inclusive bounds.
    /// `bottom` of zero selects the last row.
    pub fn set_scrolling_region(&self, top: usize, bottom: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_scrolling_region {
            hook(top, bottom, &mut |top, bottom| {
                self.set_scrolling_region_internal(top, bottom)
            });
            return;
        }
        drop(mw);
        self.set_scrolling_region_internal(top, bottom);
    }

    fn set_scrolling_region_internal(&self, top: usize, bottom: usize) {
        self.state().write().set_scrolling_region(top, bottom);
    }

    // --- Modes ---

    pub fn set_mode(&self, mode: Mode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_mode {
            hook(mode, &mut |mode| self.set_mode_internal(mode, true));
            return;
        }
        drop(mw);
        self.set_mode_internal(mode, true);
    }

    pub fn unset_mode(&self, mode: Mode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.unset_mode {
            hook(mode, &mut |mode| self.set_mode_internal(mode, false));
            return;
        }
        drop(mw);
        self.set_mode_internal(mode, false);
    }

    fn set_mode_internal(&self, mode: Mode, set: bool) {
        self.state().write().set_mode_flag(mode, set);
        // Entering or leaving the alternate screen drops every placement;
        // image data survives the swap.
        if mode == Mode::SwapScreenAndSetRestoreCursor {
            self.images().clear_placements();
        }
    }

    // --- SGR ---

    pub fn set_terminal_char_attribute(&self, attr: CharAttribute) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_terminal_char_attribute {
            hook(attr, &mut |attr| {
                self.set_terminal_char_attribute_internal(attr)
            });
            return;
        }
        drop(mw);
        self.set_terminal_char_attribute_internal(attr);
    }

    fn set_terminal_char_attribute_internal(&self, attr: CharAttribute) {
        self.state().write().apply_char_attribute(attr);
    }

    // --- Title ---

    pub fn set_title(&self, title: String) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_title {
            hook(title, &mut |title| self.set_title_internal(title));
            return;
        }
        drop(mw);
        self.set_title_internal(title);
    }

    fn set_title_internal(&self, title: String) {
        let title: String = title.chars().take(256).collect();
        self.state().write().title = title.clone();
        self.title_provider().set_title(&title);
    }

    pub fn push_title(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.push_title {
            hook(&mut || self.push_title_internal());
            return;
        }
        drop(mw);
        self.push_title_internal();
    }

    fn push_title_internal(&self) {
        let mut st = self.state().write();
        let title = st.title.clone();
        st.title_stack.push(title);
        drop(st);
        self.title_provider().push_title();
    }

    pub fn pop_title(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.pop_title {
            hook(&mut || self.pop_title_internal());
            return;
        }
        drop(mw);
        self.pop_title_internal();
    }

    fn pop_title_internal(&self) {
        let mut st = self.state().write();
        if let Some(title) = st.title_stack.pop() {
            st.title = title;
        }
        drop(st);
        self.title_provider().pop_title();
    }

    // --- Cursor save/restore and style ---

    pub fn save_cursor_position(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.save_cursor_position {
            hook(&mut || self.save_cursor_position_internal());
            return;
        }
        drop(mw);
        self.save_cursor_position_internal();
    }

    fn save_cursor_position_internal(&self) {
        self.state().write().save_cursor();
    }

    pub fn restore_cursor_position(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.restore_cursor_position {
            hook(&mut || self.restore_cursor_position_internal());
            return;
        }
        drop(mw);
        self.restore_cursor_position_internal();
    }

    fn restore_cursor_position_internal(&self) {
        self.state().write().restore_cursor();
    }

    pub fn set_cursor_style(&self, style: CursorStyle) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_cursor_style {
            hook(style, &mut |style| self.set_cursor_style_internal(style));
            return;
        }
        drop(mw);
        self.set_cursor_style_internal(style);
    }

    fn set_cursor_style_internal(&self, style: CursorStyle) {
        self.state().write().cursor.style = style;
    }

    // --- Index, reset, alignment ---

    pub fn reverse_index(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.reverse_index {
            hook(&mut || self.reverse_index_internal());
            return;
        }
        drop(mw);
        self.reverse_index_internal();
    }

    fn reverse_index_internal(&self) {
        self.state().write().reverse_index();
    }

    /// RIS: full reset. Also drops all images and placements.
    pub fn reset_state(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.reset_state {
            hook(&mut || self.reset_state_internal());
            return;
        }
        drop(mw);
        self.reset_state_internal();
    }

    fn reset_state_internal(&self) {
        self.state().write().reset_state();
        self.images().clear();
    }

    pub fn substitute(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.substitute {
            hook(&mut || self.substitute_internal());
            return;
        }
        drop(mw);
        self.substitute_internal();
    }

    fn substitute_internal(&self) {
        self.state().write().substitute();
    }

    pub fn decaln(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.decaln {
            hook(&mut || self.decaln_internal());
            return;
        }
        drop(mw);
        self.decaln_internal();
    }

    fn decaln_internal(&self) {
        self.state().write().active_mut().fill_with_e();
    }

    // --- Reports ---

    /// DSR: `n == 5` reports ready, `n == 6` reports the cursor position.
    pub fn device_status(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.device_status {
            hook(n, &mut |n| self.device_status_internal(n));
            return;
        }
        drop(mw);
        self.device_status_internal(n);
    }

    fn device_status_internal(&self, n: usize) {
        let response = match n {
            5 => "\x1b[0n".to_string(),
            6 => {
                let (row, col) = {
                    let st = self.state().read();
                    (st.cursor.row, st.cursor.col)
                };
                format!("\x1b[{};{}R", row + 1, col + 1)
            }
            _ => return,
        };
        self.write_response_str(&response);
    }

    /// DA: always identifies as a VT220.
    pub fn identify_terminal(&self, b: u8) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.identify_terminal {
            hook(b, &mut |b| self.identify_terminal_internal(b));
            return;
        }
        drop(mw);
        self.identify_terminal_internal(b);
    }

    fn identify_terminal_internal(&self, _b: u8) {
        self.write_response_str("\x1b[?62;c");
    }

    /// CSI 18 t: report the text area size in characters.
    pub fn text_area_size_chars(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.text_area_size_chars {
            hook(&mut || self.text_area_size_chars_internal());
            return;
        }
        drop(mw);
        self.text_area_size_chars_internal();
    }

    fn text_area_size_chars_internal(&self) {
        let (rows, cols) = {
            let st = self.state().read();
            (st.rows, st.cols)
        };
        self.write_response_str(&format!("\x1b[8;{rows};{cols}t"));
    }

    /// CSI 14 t: report the text area size in pixels.
    pub fn text_area_size_pixels(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.text_area_size_pixels {
            hook(&mut || self.text_area_size_pixels_internal());
            return;
        }
        drop(mw);
        self.text_area_size_pixels_internal();
    }

    fn text_area_size_pixels_internal(&self) {
        let (rows, cols) = {
            let st = self.state().read();
            (st.rows, st.cols)
        };
        let (cell_w, cell_h) = self.cell_size_pixels();
        self.write_response_str(&format!("\x1b[4;{};{}t", rows * cell_h, cols * cell_w));
    }

    /// CSI 16 t: report the cell size in pixels.
    pub fn report_cell_size_pixels(&self) {
        let (cell_w, cell_h) = self.cell_size_pixels();
        self.write_response_str(&format!("\x1b[6;{cell_h};{cell_w}t"));
    }

    // --- Charsets ---

    pub fn configure_charset(&self, index: CharsetIndex, charset: Charset) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.configure_charset {
            hook(index, charset, &mut |index, charset| {
                self.configure_charset_internal(index, charset)
            });
            return;
        }
        drop(mw);
        self.configure_charset_internal(index, charset);
    }

    fn configure_charset_internal(&self, index: CharsetIndex, charset: Charset) {
        self.state().write().configure_charset(index, charset);
    }

    pub fn set_active_charset(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_active_charset {
            hook(n, &mut |n| self.set_active_charset_internal(n));
            return;
        }
        drop(mw);
        self.set_active_charset_internal(n);
    }

    fn set_active_charset_internal(&self, n: usize) {
        self.state().write().set_active_charset(n);
    }

    // --- Keypad ---

    pub fn set_keypad_application_mode(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_keypad_application_mode {
            hook(&mut || self.set_keypad_application_mode_internal());
            return;
        }
        drop(mw);
        self.set_keypad_application_mode_internal();
    }

    fn set_keypad_application_mode_internal(&self) {
        self.state().write().set_mode_flag(Mode::KeypadApplication, true);
    }

    pub fn unset_keypad_application_mode(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.unset_keypad_application_mode {
            hook(&mut || self.unset_keypad_application_mode_internal());
            return;
        }
        drop(mw);
        self.unset_keypad_application_mode_internal();
    }

    fn unset_keypad_application_mode_internal(&self) {
        self.state().write().set_mode_flag(Mode::KeypadApplication, false);
    }

    // --- Palette ---

    /// Redefine a palette entry (OSC 4). Indices 256-258 are the dynamic
    /// foreground, background, and cursor colors.
    pub fn set_color(&self, index: usize, color: Rgba) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_color {
            hook(index, color, &mut |index, color| {
                self.set_color_internal(index, color)
            });
            return;
        }
        drop(mw);
        self.set_color_internal(index, color);
    }

    fn set_color_internal(&self, index: usize, color: Rgba) {
        self.state().write().palette_overrides.insert(index, color);
    }

    pub fn reset_color(&self, index: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.reset_color {
            hook(index, &mut |index| self.reset_color_internal(index));
            return;
        }
        drop(mw);
        self.reset_color_internal(index);
    }

    fn reset_color_internal(&self, index: usize) {
        self.state().write().palette_overrides.remove(&index);
    }

    /// Answer an OSC 10/11/12 color query, echoing back the query's
    /// terminator.
    pub fn set_dynamic_color(&self, prefix: String, index: usize, terminator: String) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_dynamic_color {
            hook(prefix, index, terminator, &mut |prefix, index, terminator| {
                self.set_dynamic_color_internal(prefix, index, terminator)
            });
            return;
        }
        drop(mw);
        self.set_dynamic_color_internal(prefix, index, terminator);
    }

    fn set_dynamic_color_internal(&self, prefix: String, index: usize, terminator: String) {
        let override_color = self.state().read().palette_overrides.get(&index).copied();
        let color = override_color.or_else(|| match index {
            0..=255 => Some(default_palette()[index]),
            256 => Some(DEFAULT_FOREGROUND),
            257 => Some(DEFAULT_BACKGROUND),
            258 => Some(DEFAULT_CURSOR),
            _ => None,
        });

        if let Some(c) = color {
            self.write_response_str(&format!(
                "\x1b]{};rgb:{:02x}/{:02x}/{:02x}{}",
                prefix, c.r, c.g, c.b, terminator
            ));
        }
    }

    // --- Clipboard (OSC 52) ---

    /// Read the clipboard and reply with its base64 content.
    pub fn clipboard_load(&self, clipboard: u8, terminator: String) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.clipboard_load {
            hook(clipboard, terminator, &mut |clipboard, terminator| {
                self.clipboard_load_internal(clipboard, terminator)
            });
            return;
        }
        drop(mw);
        self.clipboard_load_internal(clipboard, terminator);
    }

    fn clipboard_load_internal(&self, clipboard: u8, terminator: String) {
        let content = self.clipboard_provider().read(clipboard);
        if !content.is_empty() {
            let encoded = STANDARD.encode(content.as_bytes());
            self.write_response_str(&format!(
                "\x1b]52;{};{}{}",
                clipboard as char, encoded, terminator
            ));
        }
    }

    /// Store decoded OSC 52 data to the clipboard.
    pub fn clipboard_store(&self, clipboard: u8, data: Vec<u8>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.clipboard_store {
            hook(clipboard, data, &mut |clipboard, data| {
                self.clipboard_store_internal(clipboard, data)
            });
            return;
        }
        drop(mw);
        self.clipboard_store_internal(clipboard, data);
    }

    fn clipboard_store_internal(&self, clipboard: u8, data: Vec<u8>) {
        self.clipboard_provider().write(clipboard, &data);
    }

    // --- Hyperlink (OSC 8) ---

    /// Set the hyperlink applied to subsequent characters; `None` clears.
    pub fn set_hyperlink(&self, hyperlink: Option<Hyperlink>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_hyperlink {
            hook(hyperlink, &mut |hyperlink| {
                self.set_hyperlink_internal(hyperlink)
            });
            return;
        }
        drop(mw);
        self.set_hyperlink_internal(hyperlink);
    }

    fn set_hyperlink_internal(&self, hyperlink: Option<Hyperlink>) {
        self.state().write().current_hyperlink = hyperlink;
    }

    // --- Keyboard modes ---

    pub fn set_keyboard_mode(&self, mode: KeyboardMode, behavior: KeyboardModeBehavior) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_keyboard_mode {
            hook(mode, behavior, &mut |mode, behavior| {
                self.set_keyboard_mode_internal(mode, behavior)
            });
            return;
        }
        drop(mw);
        self.set_keyboard_mode_internal(mode, behavior);
    }

    fn set_keyboard_mode_internal(&self, mode: KeyboardMode, behavior: KeyboardModeBehavior) {
        let mut st = self.state().write();
        let current = st.keyboard_modes.last().copied().unwrap_or_default();
        let new_mode = match behavior {
            KeyboardModeBehavior::Replace => mode,
            KeyboardModeBehavior::Union => current | mode,
            KeyboardModeBehavior::Difference => current - mode,
        };
        if let Some(top) = st.keyboard_modes.last_mut() {
            *top = new_mode;
        } else {
            st.keyboard_modes.push(new_mode);
        }
    }

    pub fn push_keyboard_mode(&self, mode: KeyboardMode) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.push_keyboard_mode {
            hook(mode, &mut |mode| self.push_keyboard_mode_internal(mode));
            return;
        }
        drop(mw);
        self.push_keyboard_mode_internal(mode);
    }

    fn push_keyboard_mode_internal(&self, mode: KeyboardMode) {
        self.state().write().keyboard_modes.push(mode);
    }

    pub fn pop_keyboard_mode(&self, n: usize) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.pop_keyboard_mode {
            hook(n, &mut |n| self.pop_keyboard_mode_internal(n));
            return;
        }
        drop(mw);
        self.pop_keyboard_mode_internal(n);
    }

    fn pop_keyboard_mode_internal(&self, n: usize) {
        let mut st = self.state().write();
        for _ in 0..n {
            if st.keyboard_modes.pop().is_none() {
                break;
            }
        }
    }

    pub fn report_keyboard_mode(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.report_keyboard_mode {
            hook(&mut || self.report_keyboard_mode_internal());
            return;
        }
        drop(mw);
        self.report_keyboard_mode_internal();
    }

    fn report_keyboard_mode_internal(&self) {
        let mode = self
            .state()
            .read()
            .keyboard_modes
            .last()
            .copied()
            .unwrap_or_default();
        self.write_response_str(&format!("\x1b[?{}u", mode.bits()));
    }

    pub fn set_modify_other_keys(&self, modify: u8) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_modify_other_keys {
            hook(modify, &mut |modify| {
                self.set_modify_other_keys_internal(modify)
            });
            return;
        }
        drop(mw);
        self.set_modify_other_keys_internal(modify);
    }

    fn set_modify_other_keys_internal(&self, modify: u8) {
        self.state().write().modify_other_keys = modify;
    }

    pub fn report_modify_other_keys(&self) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.report_modify_other_keys {
            hook(&mut || self.report_modify_other_keys_internal());
            return;
        }
        drop(mw);
        self.report_modify_other_keys_internal();
    }

    fn report_modify_other_keys_internal(&self) {
        let modify = self.state().read().modify_other_keys;
        self.write_response_str(&format!("\x1b[>4;{modify}m"));
    }

    // --- Shell integration (OSC 133) ---

    pub fn semantic_prompt_mark(&self, mark: PromptMarkKind, exit_code: Option<i32>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.semantic_prompt_mark {
            hook(mark, exit_code, &mut |mark, exit_code| {
                self.semantic_prompt_mark_internal(mark, exit_code)
            });
            return;
        }
        drop(mw);
        self.semantic_prompt_mark_internal(mark, exit_code);
    }

    fn semantic_prompt_mark_internal(&self, mark: PromptMarkKind, exit_code: Option<i32>) {
        self.state().write().add_prompt_mark(mark, exit_code);
        self.shell_integration_provider().on_mark(mark, exit_code);
    }

    // --- Working directory (OSC 7) ---

    pub fn set_working_directory(&self, uri: String) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_working_directory {
            hook(uri, &mut |uri| self.set_working_directory_internal(uri));
            return;
        }
        drop(mw);
        self.set_working_directory_internal(uri);
    }

    fn set_working_directory_internal(&self, uri: String) {
        self.state().write().working_dir = uri;
    }

    // --- User vars (OSC 1337) ---

    pub fn set_user_var(&self, name: String, value: String) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.set_user_var {
            hook(name, value, &mut |name, value| {
                self.set_user_var_internal(name, value)
            });
            return;
        }
        drop(mw);
        self.set_user_var_internal(name, value);
    }

    fn set_user_var_internal(&self, name: String, value: String) {
        self.state().write().user_vars.insert(name, value);
    }

    // --- Desktop notifications (OSC 99) ---

    pub fn desktop_notification(&self, payload: NotificationPayload) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.desktop_notification {
            hook(payload, &mut |payload| {
                self.desktop_notification_internal(payload)
            });
            return;
        }
        drop(mw);
        self.desktop_notification_internal(payload);
    }

    fn desktop_notification_internal(&self, payload: NotificationPayload) {
        let reply = self.notification_provider().notify(&payload);
        if !reply.is_empty() {
            self.write_response_str(&reply);
        }
    }

    // --- String command catch-alls ---

    /// APC payload: Kitty graphics when it starts with `G`, otherwise the
    /// APC provider.
    pub fn application_command_received(&self, data: Vec<u8>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.application_command_received {
            hook(data, &mut |data| {
                self.application_command_received_internal(data)
            });
            return;
        }
        drop(mw);
        self.application_command_received_internal(data);
    }

    fn application_command_received_internal(&self, data: Vec<u8>) {
        if data.first() == Some(&b'G') {
            if self.state().read().kitty_enabled {
                self.handle_kitty(&data);
            }
            return;
        }
        self.apc_provider().receive(&data);
    }

    pub fn privacy_message_received(&self, data: Vec<u8>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.privacy_message_received {
            hook(data, &mut |data| self.privacy_message_received_internal(data));
            return;
        }
        drop(mw);
        self.privacy_message_received_internal(data);
    }

    fn privacy_message_received_internal(&self, data: Vec<u8>) {
        self.pm_provider().receive(&data);
    }

    pub fn start_of_string_received(&self, data: Vec<u8>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.start_of_string_received {
            hook(data, &mut |data| self.start_of_string_received_internal(data));
            return;
        }
        drop(mw);
        self.start_of_string_received_internal(data);
    }

    fn start_of_string_received_internal(&self, data: Vec<u8>) {
        self.sos_provider().receive(&data);
    }

    // --- Sixel ---

    /// DCS sixel payload: decode, store, and place at the cursor.
    pub fn sixel_received(&self, params: Vec<u16>, data: Vec<u8>) {
        let mw = self.middleware_table().read();
        if let Some(hook) = &mw.sixel_received {
            hook(params, data, &mut |params, data| {
                self.sixel_received_internal(params, data)
            });
            return;
        }
        drop(mw);
        self.sixel_received_internal(params, data);
    }

    fn sixel_received_internal(&self, params: Vec<u16>, data: Vec<u8>) {
        if !self.state().read().sixel_enabled {
            return;
        }

        let img = decode_sixel(&params, &data);
        if img.width == 0 || img.height == 0 {
            return;
        }

        let (img_w, img_h) = (img.width, img.height);
        let image_id = self.images().store(img_w, img_h, img.data);

        let (cell_w, cell_h) = self.cell_size_pixels();
        let cols = ceil_div(img_w, cell_w as u32) as usize;
        let rows = ceil_div(img_h, cell_h as u32) as usize;

        let (cur_row, cur_col) = {
            let st = self.state().read();
            (st.cursor.row, st.cursor.col)
        };

        let placement = ImagePlacement {
            id: 0,
            image_id,
            row: cur_row,
            col: cur_col,
            rows,
            cols,
            src_x: 0,
            src_y: 0,
            src_w: img_w,
            src_h: img_h,
            // Sixel images render in front of text
            z_index: 0,
            offset_x: 0,
            offset_y: 0,
        };
        let placement_id = self.images().place(placement);
        self.assign_image_to_cells(&placement, placement_id, img_w, img_h, cell_w, cell_h);

        let mut st = self.state().write();
        st.cursor.row += rows;
        if st.cursor.row >= st.rows {
            st.cursor.row = st.rows - 1;
        }
    }

    // --- Kitty graphics ---

    fn handle_kitty(&self, data: &[u8]) {
        let Ok(mut cmd) = KittyCommand::parse(data) else {
            return;
        };

        match cmd.action {
            KittyAction::Query => {
                if cmd.quiet < 2 {
                    self.write_response_str(&kitty::format_response(cmd.image_id, "", false));
                }
            }
            KittyAction::Transmit => {
                self.kitty_transmit(&mut cmd);
            }
            KittyAction::TransmitAndDisplay => {
                self.kitty_transmit(&mut cmd);
                if !cmd.more {
                    self.kitty_display(&cmd);
                }
            }
            KittyAction::Display => {
                self.kitty_display(&cmd);
            }
            KittyAction::Delete => {
                self.kitty_delete(&cmd);
            }
            KittyAction::Frame | KittyAction::Animate | KittyAction::Compose => {
                // Animation is not stored; acknowledge and move on
                if cmd.quiet < 1 {
                    self.write_response_str(&kitty::format_response(cmd.image_id, "", false));
                }
            }
        }
    }

    fn kitty_transmit(&self, cmd: &mut KittyCommand) {
        if cmd.more {
            self.images().push_chunk(
                cmd.image_id,
                &cmd.payload,
                cmd.format,
                cmd.width,
                cmd.height,
                cmd.compression,
            );
            return;
        }

        // Reassemble a chunked transfer, preferring metadata latched from
        // its first chunk.
        let (payload, format, width, height, compression) =
            match self.images().flush_chunk(&cmd.payload) {
                Some(done) => {
                    if cmd.image_id == 0 {
                        cmd.image_id = done.image_id;
                    }
                    let width = if done.width != 0 { done.width } else { cmd.width };
                    let height = if done.height != 0 { done.height } else { cmd.height };
                    let compression = if done.compression != 0 {
                        done.compression
                    } else {
                        cmd.compression
                    };
                    (done.data, done.format, width, height, compression)
                }
                None => (
                    std::mem::take(&mut cmd.payload),
                    cmd.format,
                    cmd.width,
                    cmd.height,
                    cmd.compression,
                ),
            };

        let decoded = kitty::decode_payload(&payload, format, compression, width, height);
        let (rgba, w, h) = match decoded {
            Ok(ok) => ok,
            Err(err) => {
                tracing::debug!("kitty transmit rejected: {err}");
                if cmd.quiet < 2 {
                    self.write_response_str(&kitty::format_response(cmd.image_id, "ENODATA", true));
                }
                return;
            }
        };
        if w == 0 || h == 0 {
            if cmd.quiet < 2 {
                self.write_response_str(&kitty::format_response(cmd.image_id, "ENODATA", true));
            }
            return;
        }

        if cmd.image_id > 0 {
            self.images().store_with_id(cmd.image_id, w, h, rgba);
        } else {
            cmd.image_id = self.images().store(w, h, rgba);
        }

        if cmd.quiet < 1 {
            self.write_response_str(&kitty::format_response(cmd.image_id, "", false));
        }
    }

    fn kitty_display(&self, cmd: &KittyCommand) {
        let Some((img_w, img_h)) = self.images().image_size(cmd.image_id) else {
            if cmd.quiet < 2 {
                self.write_response_str(&kitty::format_response(cmd.image_id, "ENOENT", true));
            }
            return;
        };

        let (cell_w, cell_h) = self.cell_size_pixels();

        let src_w = if cmd.src_w == 0 {
            img_w.saturating_sub(cmd.src_x)
        } else {
            cmd.src_w
        };
        let src_h = if cmd.src_h == 0 {
            img_h.saturating_sub(cmd.src_y)
        } else {
            cmd.src_h
        };

        let cols = if cmd.cols == 0 {
            ceil_div(src_w, cell_w as u32) as usize
        } else {
            cmd.cols as usize
        };
        let rows = if cmd.rows == 0 {
            ceil_div(src_h, cell_h as u32) as usize
        } else {
            cmd.rows as usize
        };

        let (cur_row, cur_col) = {
            let st = self.state().read();
            (st.cursor.row, st.cursor.col)
        };

        let placement = ImagePlacement {
            id: 0,
            image_id: cmd.image_id,
            row: cur_row,
            col: cur_col,
            rows,
            cols,
            src_x: cmd.src_x,
            src_y: cmd.src_y,
            src_w,
            src_h,
            z_index: cmd.z_index,
            offset_x: cmd.cell_offset_x,
            offset_y: cmd.cell_offset_y,
        };
        let placement_id = self.images().place(placement);
        self.assign_image_to_cells(&placement, placement_id, img_w, img_h, cell_w, cell_h);

        if !cmd.do_not_move_cursor {
            let mut st = self.state().write();
            st.cursor.col += cols;
            if st.cursor.col >= st.cols {
                st.cursor.col = 0;
                st.cursor.row += 1;
                if st.cursor.row >= st.rows {
                    st.cursor.row = st.rows - 1;
                }
            }
        }

        if cmd.quiet < 1 {
            self.write_response_str(&kitty::format_response(cmd.image_id, "", false));
        }
    }

    fn kitty_delete(&self, cmd: &KittyCommand) {
        let (cur_row, cur_col) = {
            let st = self.state().read();
            (st.cursor.row, st.cursor.col)
        };

        match cmd.delete {
            KittyDelete::All | KittyDelete::AllWithData => self.images().clear(),
            KittyDelete::ById => self.images().remove_placements_for_image(cmd.image_id),
            KittyDelete::ByIdWithData => self.images().delete_image(cmd.image_id),
            KittyDelete::AtCursor | KittyDelete::AtCursorWithData => {
                self.images().delete_placements_at(cur_row, cur_col)
            }
            KittyDelete::ByColumn | KittyDelete::ByColumnWithData => {
                self.images().delete_placements_in_column(cur_col)
            }
            KittyDelete::ByRow | KittyDelete::ByRowWithData => {
                self.images().delete_placements_in_row(cur_row)
            }
            KittyDelete::ByZIndex | KittyDelete::ByZIndexWithData => {
                self.images().delete_placements_by_z(cmd.z_index)
            }
        }
    }

    /// Stamp `CellImage` references with per-cell UV coordinates onto every
    /// grid cell a placement covers.
    fn assign_image_to_cells(
        &self,
        placement: &ImagePlacement,
        placement_id: u32,
        img_w: u32,
        img_h: u32,
        cell_w: usize,
        cell_h: usize,
    ) {
        if img_w == 0 || img_h == 0 {
            return;
        }
        let mut st = self.state().write();
        let (rows, cols) = (st.rows, st.cols);

        for i in 0..placement.rows {
            for j in 0..placement.cols {
                let cell_row = placement.row + i;
                let cell_col = placement.col + j;
                if cell_row >= rows || cell_col >= cols {
                    continue;
                }

                let u0 = (j * cell_w) as f32 / img_w as f32;
                let v0 = (i * cell_h) as f32 / img_h as f32;
                let u1 = (((j + 1) * cell_w) as f32 / img_w as f32).min(1.0);
                let v1 = (((i + 1) * cell_h) as f32 / img_h as f32).min(1.0);

                if let Some(cell) = st.active_mut().cell_mut(cell_row, cell_col) {
                    cell.image = Some(CellImage {
                        placement_id,
                        image_id: placement.image_id,
                        u0,
                        v0,
                        u1,
                        v1,
                        z_index: placement.z_index,
                    });
                }
                st.active_mut().mark_dirty(cell_row, cell_col);
            }
        }
    }
}

//! Handler middleware
//!
//! Every handler on the terminal has a corresponding optional interception
//! slot. An installed middleware receives the original arguments and a
//! `next` closure invoking the internal implementation; calling `next` with
//! modified arguments rewrites the action, not calling it suppresses the
//! action entirely.
//!
//! Middleware runs while internal locks are held: do not call back into the
//! `Terminal` from inside a middleware.

use crate::core::cursor::{Charset, CharsetIndex, CursorStyle};
use crate::core::{Hyperlink, Rgba};

use super::providers::NotificationPayload;
use super::shell::PromptMarkKind;
use super::state::{
    CharAttribute, KeyboardMode, KeyboardModeBehavior, LineClearMode, Mode, ScreenClearMode,
    TabClearMode,
};

/// Middleware slot with no arguments.
pub type Hook0 = Box<dyn Fn(&mut dyn FnMut()) + Send + Sync>;
/// Middleware slot with one argument.
pub type Hook1<A> = Box<dyn Fn(A, &mut dyn FnMut(A)) + Send + Sync>;
/// Middleware slot with two arguments.
pub type Hook2<A, B> = Box<dyn Fn(A, B, &mut dyn FnMut(A, B)) + Send + Sync>;
/// Middleware slot with three arguments.
pub type Hook3<A, B, C> = Box<dyn Fn(A, B, C, &mut dyn FnMut(A, B, C)) + Send + Sync>;

/// Interception table for the handler surface.
///
/// Slots left as `None` fall straight through to the internal
/// implementation. Tables combine with [`Middleware::merge`], last writer
/// winning per slot.
#[derive(Default)]
pub struct Middleware {
    pub input: Option<Hook1<char>>,
    pub bell: Option<Hook0>,
    pub backspace: Option<Hook0>,
    pub carriage_return: Option<Hook0>,
    pub line_feed: Option<Hook0>,
    pub tab: Option<Hook1<usize>>,
    pub horizontal_tab_set: Option<Hook0>,
    pub clear_line: Option<Hook1<LineClearMode>>,
    pub clear_screen: Option<Hook1<ScreenClearMode>>,
    pub clear_tabs: Option<Hook1<TabClearMode>>,
    pub goto: Option<Hook2<usize, usize>>,
    pub goto_line: Option<Hook1<usize>>,
    pub goto_col: Option<Hook1<usize>>,
    pub move_up: Option<Hook1<usize>>,
    pub move_down: Option<Hook1<usize>>,
    pub move_forward: Option<Hook1<usize>>,
    pub move_backward: Option<Hook1<usize>>,
    pub move_up_cr: Option<Hook1<usize>>,
    pub move_down_cr: Option<Hook1<usize>>,
    pub move_forward_tabs: Option<Hook1<usize>>,
    pub move_backward_tabs: Option<Hook1<usize>>,
    pub insert_blank: Option<Hook1<usize>>,
    pub insert_blank_lines: Option<Hook1<usize>>,
    pub delete_chars: Option<Hook1<usize>>,
    pub delete_lines: Option<Hook1<usize>>,
    pub erase_chars: Option<Hook1<usize>>,
    pub scroll_up: Option<Hook1<usize>>,
    pub scroll_down: Option<Hook1<usize>>,
    pub set_scrolling_region: Option<Hook2<usize, usize>>,
    pub set_mode: Option<Hook1<Mode>>,
    pub unset_mode: Option<Hook1<Mode>>,
    pub set_terminal_char_attribute: Option<Hook1<CharAttribute>>,
    pub set_title: Option<Hook1<String>>,
    pub set_cursor_style: Option<Hook1<CursorStyle>>,
    pub save_cursor_position: Option<Hook0>,
    pub restore_cursor_position: Option<Hook0>,
    pub reverse_index: Option<Hook0>,
    pub reset_state: Option<Hook0>,
    pub substitute: Option<Hook0>,
    pub decaln: Option<Hook0>,
    pub device_status: Option<Hook1<usize>>,
    pub identify_terminal: Option<Hook1<u8>>,
    pub configure_charset: Option<Hook2<CharsetIndex, Charset>>,
    pub set_active_charset: Option<Hook1<usize>>,
    pub set_keypad_application_mode: Option<Hook0>,
    pub unset_keypad_application_mode: Option<Hook0>,
    pub set_color: Option<Hook2<usize, Rgba>>,
    pub reset_color: Option<Hook1<usize>>,
    pub set_dynamic_color: Option<Hook3<String, usize, String>>,
    pub clipboard_load: Option<Hook2<u8, String>>,
    pub clipboard_store: Option<Hook2<u8, Vec<u8>>>,
    pub set_hyperlink: Option<Hook1<Option<Hyperlink>>>,
    pub push_title: Option<Hook0>,
    pub pop_title: Option<Hook0>,
    pub text_area_size_chars: Option<Hook0>,
    pub text_area_size_pixels: Option<Hook0>,
    pub set_keyboard_mode: Option<Hook2<KeyboardMode, KeyboardModeBehavior>>,
    pub push_keyboard_mode: Option<Hook1<KeyboardMode>>,
    pub pop_keyboard_mode: Option<Hook1<usize>>,
    pub report_keyboard_mode: Option<Hook0>,
    pub set_modify_other_keys: Option<Hook1<u8>>,
    pub report_modify_other_keys: Option<Hook0>,
    pub application_command_received: Option<Hook1<Vec<u8>>>,
    pub privacy_message_received: Option<Hook1<Vec<u8>>>,
    pub start_of_string_received: Option<Hook1<Vec<u8>>>,
    pub semantic_prompt_mark: Option<Hook2<PromptMarkKind, Option<i32>>>,
    pub set_working_directory: Option<Hook1<String>>,
    pub sixel_received: Option<Hook2<Vec<u16>, Vec<u8>>>,
    pub desktop_notification: Option<Hook1<NotificationPayload>>,
    pub set_user_var: Option<Hook2<String, String>>,
}

macro_rules! merge_slots {
    ($self:ident, $other:ident, $($field:ident),* $(,)?) => {
        $(
            if $other.$field.is_some() {
                $self.$field = $other.$field;
            }
        )*
    };
}

impl Middleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every installed slot from `other` into `self`, overwriting
    /// existing slots.
    pub fn merge(&mut self, other: Middleware) {
        merge_slots!(
            self,
            other,
            input,
            bell,
            backspace,
            carriage_return,
            line_feed,
            tab,
            horizontal_tab_set,
            clear_line,
            clear_screen,
            clear_tabs,
            goto,
            goto_line,
            goto_col,
            move_up,
            move_down,
            move_forward,
            move_backward,
            move_up_cr,
            move_down_cr,
            move_forward_tabs,
            move_backward_tabs,
            insert_blank,
            insert_blank_lines,
            delete_chars,
            delete_lines,
            erase_chars,
            scroll_up,
            scroll_down,
            set_scrolling_region,
            set_mode,
            unset_mode,
            set_terminal_char_attribute,
            set_title,
            set_cursor_style,
            save_cursor_position,
            restore_cursor_position,
            reverse_index,
            reset_state,
            substitute,
            decaln,
            device_status,
            identify_terminal,
            configure_charset,
            set_active_charset,
            set_keypad_application_mode,
            unset_keypad_application_mode,
            set_color,
            reset_color,
            set_dynamic_color,
            clipboard_load,
            clipboard_store,
            set_hyperlink,
            push_title,
            pop_title,
            text_area_size_chars,
            text_area_size_pixels,
            set_keyboard_mode,
            push_keyboard_mode,
            pop_keyboard_mode,
            report_keyboard_mode,
            set_modify_other_keys,
            report_modify_other_keys,
            application_command_received,
            privacy_message_received,
            start_of_string_received,
            semantic_prompt_mark,
            set_working_directory,
            sixel_received,
            desktop_notification,
            set_user_var,
        );
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

//! Action dispatch
//!
//! Maps parser [`Action`]s onto the terminal's handler surface: CSI final
//! bytes to cursor/edit handlers, ESC dispatches to charset and cursor
//! state, OSC commands to their string handlers, DCS `q` to sixel, and
//! APC/PM/SOS payloads to their catch-alls. Unrecognized sequences are
//! logged at debug level and dropped.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::core::cell::Hyperlink;
use crate::core::color::{Color, NamedColor, Rgba};
use crate::core::cursor::{Charset, CharsetIndex, CursorStyle};
use crate::parser::{Action, StringTerminator};

use super::providers::NotificationPayload;
use super::shell::PromptMarkKind;
use super::state::{
    CharAttribute, KeyboardMode, KeyboardModeBehavior, LineClearMode, Mode, ScreenClearMode,
    TabClearMode,
};
use super::Terminal;

impl Terminal {
    pub(crate) fn apply_action(&self, action: Action) {
        match action {
            Action::Print(c) => self.input(c),
            Action::Execute(byte) => self.execute(byte),
            Action::CsiDispatch {
                params,
                subparams,
                prefix,
                intermediates,
                final_byte,
            } => self.dispatch_csi(&params, &subparams, prefix, &intermediates, final_byte),
            Action::EscDispatch {
                intermediates,
                final_byte,
            } => self.dispatch_esc(&intermediates, final_byte),
            Action::OscDispatch {
                command,
                payload,
                terminator,
            } => self.dispatch_osc(command, &payload, terminator),
            Action::DcsDispatch {
                params,
                intermediates,
                final_byte,
                data,
            } => match final_byte {
                b'q' => self.sixel_received(params, data),
                _ => debug!(
                    "unhandled DCS: params={params:?} intermediates={intermediates:?} final={}",
                    final_byte as char
                ),
            },
            Action::ApcDispatch(data) => self.application_command_received(data),
            Action::PmDispatch(data) => self.privacy_message_received(data),
            Action::SosDispatch(data) => self.start_of_string_received(data),
        }
    }

    fn execute(&self, byte: u8) {
        match byte {
            0x07 => self.bell(),
            0x08 => self.backspace(),
            0x09 => self.tab(1),
            0x0A..=0x0C => self.line_feed(),
            0x0D => self.carriage_return(),
            0x0E => self.set_active_charset(1),
            0x0F => self.set_active_charset(0),
            0x1A => self.substitute(),
            _ => {}
        }
    }

    fn dispatch_esc(&self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => self.save_cursor_position(),
            ([], b'8') => self.restore_cursor_position(),
            ([], b'D') => self.line_feed(),
            ([], b'E') => {
                self.carriage_return();
                self.line_feed();
            }
            ([], b'H') => self.horizontal_tab_set(),
            ([], b'M') => self.reverse_index(),
            ([], b'Z') => self.identify_terminal(0),
            ([], b'c') => self.reset_state(),
            ([], b'=') => self.set_keypad_application_mode(),
            ([], b'>') => self.unset_keypad_application_mode(),
            ([], b'n') => self.set_active_charset(2),
            ([], b'o') => self.set_active_charset(3),
            ([b'('], c) => self.configure_charset(CharsetIndex::G0, charset_from_byte(c)),
            ([b')'], c) => self.configure_charset(CharsetIndex::G1, charset_from_byte(c)),
            ([b'*'], c) => self.configure_charset(CharsetIndex::G2, charset_from_byte(c)),
            ([b'+'], c) => self.configure_charset(CharsetIndex::G3, charset_from_byte(c)),
            ([b'#'], b'8') => self.decaln(),
            _ => debug!(
                "unhandled ESC: intermediates={intermediates:?} final={}",
                final_byte as char
            ),
        }
    }

    fn dispatch_csi(
        &self,
        params: &[u16],
        subparams: &[bool],
        prefix: Option<u8>,
        intermediates: &[u8],
        final_byte: u8,
    ) {
        let arg = |i: usize, default: u16| params.get(i).copied().unwrap_or(default);
        // Most motions treat 0 as 1
        let count = |i: usize| arg(i, 1).max(1) as usize;

        match (prefix, intermediates, final_byte) {
            (None, [], b'A') => self.move_up(count(0)),
            (None, [], b'B') | (None, [], b'e') => self.move_down(count(0)),
            (None, [], b'C') | (None, [], b'a') => self.move_forward(count(0)),
            (None, [], b'D') => self.move_backward(count(0)),
            (None, [], b'E') => self.move_down_cr(count(0)),
            (None, [], b'F') => self.move_up_cr(count(0)),
            (None, [], b'G') | (None, [], b'`') => self.goto_col(count(0) - 1),
            (None, [], b'H') | (None, [], b'f') => self.goto(count(0) - 1, count(1) - 1),
            (None, [], b'I') => self.move_forward_tabs(count(0)),
            (None, [], b'J') | (Some(b'?'), [], b'J') => {
                let mode = match arg(0, 0) {
                    0 => ScreenClearMode::Below,
                    1 => ScreenClearMode::Above,
                    2 => ScreenClearMode::All,
                    3 => ScreenClearMode::Saved,
                    other => {
                        debug!("unhandled ED mode {other}");
                        return;
                    }
                };
                self.clear_screen(mode);
            }
            (None, [], b'K') | (Some(b'?'), [], b'K') => {
                let mode = match arg(0, 0) {
                    0 => LineClearMode::Right,
                    1 => LineClearMode::Left,
                    2 => LineClearMode::All,
                    other => {
                        debug!("unhandled EL mode {other}");
                        return;
                    }
                };
                self.clear_line(mode);
            }
            (None, [], b'L') => self.insert_blank_lines(count(0)),
            (None, [], b'M') => self.delete_lines(count(0)),
            (None, [], b'P') => self.delete_chars(count(0)),
            (None, [], b'S') => self.scroll_up(count(0)),
            (None, [], b'T') => self.scroll_down(count(0)),
            (None, [], b'X') => self.erase_chars(count(0)),
            (None, [], b'Z') => self.move_backward_tabs(count(0)),
            (None, [], b'@') => self.insert_blank(count(0)),
            (None, [], b'd') => self.goto_line(count(0) - 1),
            (None, [], b'g') => {
                let mode = match arg(0, 0) {
                    0 => TabClearMode::Current,
                    3 => TabClearMode::All,
                    other => {
                        debug!("unhandled TBC mode {other}");
                        return;
                    }
                };
                self.clear_tabs(mode);
            }
            (None, [], b'h') | (Some(b'?'), [], b'h') => {
                self.dispatch_modes(params, prefix.is_some(), true)
            }
            (None, [], b'l') | (Some(b'?'), [], b'l') => {
                self.dispatch_modes(params, prefix.is_some(), false)
            }
            (None, [], b'm') => {
                for attr in parse_sgr(params, subparams) {
                    self.set_terminal_char_attribute(attr);
                }
            }
            (Some(b'>'), [], b'm') => {
                // XTMODKEYS: CSI > 4 ; Pv m
                if arg(0, 0) == 4 {
                    self.set_modify_other_keys(arg(1, 0) as u8);
                }
            }
            (Some(b'?'), [], b'm') => {
                // XTQMODKEYS: CSI ? 4 m
                if arg(0, 0) == 4 {
                    self.report_modify_other_keys();
                }
            }
            (None, [], b'n') => self.device_status(arg(0, 0) as usize),
            (None, [], b'r') => self.set_scrolling_region(arg(0, 1) as usize, arg(1, 0) as usize),
            (None, [], b's') => self.save_cursor_position(),
            (None, [], b'u') => self.restore_cursor_position(),
            (Some(b'?'), [], b'u') => self.report_keyboard_mode(),
            (Some(b'='), [], b'u') => {
                let mode = KeyboardMode::from_bits_truncate(arg(0, 0) as u8);
                let behavior = match arg(1, 1) {
                    3 => KeyboardModeBehavior::Difference,
                    2 => KeyboardModeBehavior::Union,
                    _ => KeyboardModeBehavior::Replace,
                };
                self.set_keyboard_mode(mode, behavior);
            }
            (Some(b'>'), [], b'u') => {
                self.push_keyboard_mode(KeyboardMode::from_bits_truncate(arg(0, 0) as u8))
            }
            (Some(b'<'), [], b'u') => self.pop_keyboard_mode(count(0)),
            (None, [], b'c') | (Some(b'>'), [], b'c') | (Some(b'?'), [], b'c') => {
                self.identify_terminal(prefix.unwrap_or(0))
            }
            (None, [b' '], b'q') => {
                let style = match arg(0, 0) {
                    0 | 1 => CursorStyle::BlinkingBlock,
                    2 => CursorStyle::SteadyBlock,
                    3 => CursorStyle::BlinkingUnderline,
                    4 => CursorStyle::SteadyUnderline,
                    5 => CursorStyle::BlinkingBar,
                    6 => CursorStyle::SteadyBar,
                    other => {
                        debug!("unhandled DECSCUSR style {other}");
                        return;
                    }
                };
                self.set_cursor_style(style);
            }
            (None, [], b't') => match arg(0, 0) {
                14 => self.text_area_size_pixels(),
                16 => self.report_cell_size_pixels(),
                18 => self.text_area_size_chars(),
                22 => self.push_title(),
                23 => self.pop_title(),
                op => debug!("unhandled window op {op}"),
            },
            _ => debug!(
                "unhandled CSI: prefix={prefix:?} params={params:?} intermediates={intermediates:?} final={}",
                final_byte as char
            ),
        }
    }

    fn dispatch_modes(&self, params: &[u16], private: bool, set: bool) {
        for &param in params {
            let mode = if private {
                Mode::from_private(param)
            } else {
                Mode::from_ansi(param)
            };
            match mode {
                Some(mode) if set => self.set_mode(mode),
                Some(mode) => self.unset_mode(mode),
                None => debug!(
                    "unhandled {} mode {param}",
                    if private { "private" } else { "ANSI" }
                ),
            }
        }
    }

    fn dispatch_osc(&self, command: u16, payload: &[u8], terminator: StringTerminator) {
        let text = String::from_utf8_lossy(payload).to_string();
        match command {
            0 | 1 | 2 => self.set_title(text),
            4 => {
                // OSC 4 ; index ; spec [; index ; spec ...]
                let parts: Vec<&str> = text.split(';').collect();
                for pair in parts.chunks(2) {
                    let [index, spec] = pair else { continue };
                    let Ok(index) = index.parse::<usize>() else {
                        continue;
                    };
                    if let Some(color) = parse_color_spec(spec) {
                        self.set_color(index, color);
                    }
                }
            }
            7 => self.set_working_directory(text),
            8 => {
                let (params, uri) = match text.split_once(';') {
                    Some((params, uri)) => (params, uri),
                    None => ("", text.as_str()),
                };
                if uri.is_empty() {
                    self.set_hyperlink(None);
                } else {
                    let id = params
                        .split(':')
                        .find_map(|p| p.strip_prefix("id="))
                        .unwrap_or("")
                        .to_string();
                    self.set_hyperlink(Some(Hyperlink {
                        id,
                        uri: uri.to_string(),
                    }));
                }
            }
            10 | 11 | 12 => {
                let index = 256 + (command as usize - 10);
                if text == "?" {
                    self.set_dynamic_color(
                        command.to_string(),
                        index,
                        terminator.as_str().to_string(),
                    );
                } else if let Some(color) = parse_color_spec(&text) {
                    self.set_color(index, color);
                }
            }
            52 => {
                let (selection, data) = match text.split_once(';') {
                    Some((selection, data)) => (selection, data),
                    None => ("c", text.as_str()),
                };
                let clipboard = selection.bytes().next().unwrap_or(b'c');
                if data == "?" {
                    self.clipboard_load(clipboard, terminator.as_str().to_string());
                } else {
                    match STANDARD.decode(data.as_bytes()) {
                        Ok(decoded) => self.clipboard_store(clipboard, decoded),
                        Err(_) => debug!("OSC 52 payload is not valid base64"),
                    }
                }
            }
            99 => self.desktop_notification(parse_notification(payload)),
            104 => {
                if text.is_empty() {
                    for index in 0..256 {
                        self.reset_color(index);
                    }
                } else {
                    for part in text.split(';') {
                        if let Ok(index) = part.parse::<usize>() {
                            self.reset_color(index);
                        }
                    }
                }
            }
            110 => self.reset_color(256),
            111 => self.reset_color(257),
            112 => self.reset_color(258),
            133 => {
                let mut parts = text.splitn(2, ';');
                let kind = match parts.next().unwrap_or("") {
                    "A" => PromptMarkKind::PromptStart,
                    "B" => PromptMarkKind::CommandStart,
                    "C" => PromptMarkKind::CommandExecuted,
                    "D" => PromptMarkKind::CommandFinished,
                    other => {
                        debug!("unhandled OSC 133 mark {other:?}");
                        return;
                    }
                };
                let exit_code = parts.next().and_then(|code| code.parse().ok());
                self.semantic_prompt_mark(kind, exit_code);
            }
            1337 => {
                // OSC 1337 ; SetUserVar=NAME=<base64> ST
                let Some(rest) = text.strip_prefix("SetUserVar=") else {
                    debug!("unhandled OSC 1337 payload {text:?}");
                    return;
                };
                let Some((name, encoded)) = rest.split_once('=') else {
                    return;
                };
                match STANDARD.decode(encoded.as_bytes()) {
                    Ok(decoded) => self.set_user_var(
                        name.to_string(),
                        String::from_utf8_lossy(&decoded).to_string(),
                    ),
                    Err(_) => debug!("OSC 1337 value is not valid base64"),
                }
            }
            other => debug!("unhandled OSC {other}"),
        }
    }
}

fn charset_from_byte(b: u8) -> Charset {
    match b {
        b'0' => Charset::LineDrawing,
        _ => Charset::Ascii,
    }
}

/// Parse an SGR parameter list into template edits. An empty list means
/// reset.
fn parse_sgr(params: &[u16], subparams: &[bool]) -> Vec<CharAttribute> {
    use CharAttribute::*;

    if params.is_empty() {
        return vec![Reset];
    }

    let is_sub = |i: usize| subparams.get(i).copied().unwrap_or(false);
    let mut attrs = Vec::new();
    let mut i = 0;
    while i < params.len() {
        match params[i] {
            0 => attrs.push(Reset),
            1 => attrs.push(Bold),
            2 => attrs.push(Dim),
            3 => attrs.push(Italic),
            4 => {
                // 4:x selects an underline style, 4:0 cancels
                if is_sub(i + 1) {
                    i += 1;
                    attrs.push(match params[i] {
                        0 => CancelUnderline,
                        2 => DoubleUnderline,
                        3 => CurlyUnderline,
                        4 => DottedUnderline,
                        5 => DashedUnderline,
                        _ => Underline,
                    });
                } else {
                    attrs.push(Underline);
                }
            }
            5 => attrs.push(BlinkSlow),
            6 => attrs.push(BlinkFast),
            7 => attrs.push(Reverse),
            8 => attrs.push(Hidden),
            9 => attrs.push(Strike),
            21 => attrs.push(DoubleUnderline),
            22 => attrs.push(CancelBoldDim),
            23 => attrs.push(CancelItalic),
            24 => attrs.push(CancelUnderline),
            25 => attrs.push(CancelBlink),
            27 => attrs.push(CancelReverse),
            28 => attrs.push(CancelHidden),
            29 => attrs.push(CancelStrike),
            30..=37 => attrs.push(Foreground(named_color(params[i] - 30))),
            38 => {
                let (color, consumed) = parse_extended_color(&params[i..]);
                i += consumed;
                if let Some(color) = color {
                    attrs.push(Foreground(Some(color)));
                }
            }
            39 => attrs.push(Foreground(None)),
            40..=47 => attrs.push(Background(named_color(params[i] - 40))),
            48 => {
                let (color, consumed) = parse_extended_color(&params[i..]);
                i += consumed;
                if let Some(color) = color {
                    attrs.push(Background(Some(color)));
                }
            }
            49 => attrs.push(Background(None)),
            58 => {
                let (color, consumed) = parse_extended_color(&params[i..]);
                i += consumed;
                if let Some(color) = color {
                    attrs.push(UnderlineColor(Some(color)));
                }
            }
            59 => attrs.push(UnderlineColor(None)),
            90..=97 => attrs.push(Foreground(named_color(params[i] - 90 + 8))),
            100..=107 => attrs.push(Background(named_color(params[i] - 100 + 8))),
            other => debug!("unhandled SGR parameter {other}"),
        }
        i += 1;
    }
    attrs
}

fn named_color(index: u16) -> Option<Color> {
    NamedColor::from_index(index as u8).map(Color::Named)
}

/// Parse `38;5;N` / `38;2;R;G;B` (and the colon-separated forms) starting
/// at the introducer. Returns the color and the number of extra parameters
/// consumed.
fn parse_extended_color(params: &[u16]) -> (Option<Color>, usize) {
    match params.get(1) {
        Some(5) => match params.get(2) {
            Some(&index) => (Some(Color::Indexed(index as u8)), 2),
            None => (None, 1),
        },
        Some(2) => {
            if params.len() >= 5 {
                let color = Color::Rgb(Rgba::opaque(
                    params[2] as u8,
                    params[3] as u8,
                    params[4] as u8,
                ));
                (Some(color), 4)
            } else {
                (None, params.len().saturating_sub(1))
            }
        }
        _ => (None, 0),
    }
}

/// Parse an X11-style color spec: `rgb:RR/GG/BB` (1-4 hex digits per
/// component) or `#rrggbb`.
fn parse_color_spec(spec: &str) -> Option<Rgba> {
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut channels = rest.split('/');
        let r = parse_scaled_hex(channels.next()?)?;
        let g = parse_scaled_hex(channels.next()?)?;
        let b = parse_scaled_hex(channels.next()?)?;
        return Some(Rgba::opaque(r, g, b));
    }
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Rgba::opaque(r, g, b));
        }
    }
    None
}

/// Scale a 1-4 digit hex component to 8 bits.
fn parse_scaled_hex(component: &str) -> Option<u8> {
    let value = u32::from_str_radix(component, 16).ok()?;
    let scaled = match component.len() {
        1 => value * 17,
        2 => value,
        3 => value >> 4,
        4 => value >> 8,
        _ => return None,
    };
    Some(scaled.min(255) as u8)
}

/// Parse an OSC 99 payload: colon-separated `k=v` metadata, `;`, data.
fn parse_notification(payload: &[u8]) -> NotificationPayload {
    let (metadata, data) = match payload.iter().position(|&b| b == b';') {
        Some(i) => (&payload[..i], &payload[i + 1..]),
        None => (payload, &payload[..0]),
    };

    let mut notification = NotificationPayload {
        done: true,
        data: data.to_vec(),
        ..NotificationPayload::default()
    };

    for entry in metadata.split(|&b| b == b':') {
        let Some(eq) = entry.iter().position(|&b| b == b'=') else {
            continue;
        };
        let key = &entry[..eq];
        let value = String::from_utf8_lossy(&entry[eq + 1..]).to_string();
        match key {
            b"i" => notification.id = value,
            b"p" => notification.payload_type = value,
            b"d" => notification.done = value != "0",
            _ => {}
        }
    }

    notification
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sgr_empty_is_reset() {
        assert_eq!(parse_sgr(&[], &[]), vec![CharAttribute::Reset]);
    }

    #[test]
    fn test_parse_sgr_basic() {
        let attrs = parse_sgr(&[1, 31], &[false, false]);
        assert_eq!(
            attrs,
            vec![
                CharAttribute::Bold,
                CharAttribute::Foreground(Some(Color::Named(NamedColor::Red))),
            ]
        );
    }

    #[test]
    fn test_parse_sgr_256_color() {
        let attrs = parse_sgr(&[38, 5, 129], &[false, false, false]);
        assert_eq!(
            attrs,
            vec![CharAttribute::Foreground(Some(Color::Indexed(129)))]
        );
    }

    #[test]
    fn test_parse_sgr_truecolor_background() {
        let attrs = parse_sgr(&[48, 2, 255, 128, 0], &[false; 5]);
        assert_eq!(
            attrs,
            vec![CharAttribute::Background(Some(Color::Rgb(Rgba::opaque(
                255, 128, 0
            ))))]
        );
    }

    #[test]
    fn test_parse_sgr_curly_underline_subparam() {
        let attrs = parse_sgr(&[4, 3], &[false, true]);
        assert_eq!(attrs, vec![CharAttribute::CurlyUnderline]);
        // Without the colon marker, 4;3 is underline then italic
        let attrs = parse_sgr(&[4, 3], &[false, false]);
        assert_eq!(attrs, vec![CharAttribute::Underline, CharAttribute::Italic]);
    }

    #[test]
    fn test_parse_sgr_underline_color() {
        let attrs = parse_sgr(&[58, 5, 42, 59], &[false; 4]);
        assert_eq!(
            attrs,
            vec![
                CharAttribute::UnderlineColor(Some(Color::Indexed(42))),
                CharAttribute::UnderlineColor(None),
            ]
        );
    }

    #[test]
    fn test_parse_color_spec() {
        assert_eq!(parse_color_spec("rgb:cd/31/31"), Some(Rgba::opaque(0xCD, 0x31, 0x31)));
        assert_eq!(parse_color_spec("rgb:c/3/3"), Some(Rgba::opaque(0xCC, 0x33, 0x33)));
        assert_eq!(
            parse_color_spec("rgb:cdcd/3131/3131"),
            Some(Rgba::opaque(0xCD, 0x31, 0x31))
        );
        assert_eq!(parse_color_spec("#cd3131"), Some(Rgba::opaque(0xCD, 0x31, 0x31)));
        assert_eq!(parse_color_spec("bogus"), None);
    }

    #[test]
    fn test_parse_notification() {
        let n = parse_notification(b"i=test-1:d=0:p=body;Hello");
        assert_eq!(n.id, "test-1");
        assert_eq!(n.payload_type, "body");
        assert!(!n.done);
        assert_eq!(n.data, b"Hello");

        let n = parse_notification(b";Just data");
        assert!(n.done);
        assert_eq!(n.data, b"Just data");
    }
}

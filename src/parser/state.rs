//! Parser state machine
//!
//! A VT500-series compatible parser. Bytes go in, semantic [`Action`]s come
//! out; arbitrary chunk boundaries are handled, including UTF-8 sequences
//! and escape sequences split across calls.
//!
//! The state machine follows the model described in
//! "A parser for DEC's ANSI-compatible video terminals" (vt100.net), with
//! string-command states for OSC, DCS, and the SOS/PM/APC family. DCS
//! sequences keep their parameters and final byte so device control payloads
//! (sixel) can be routed; SOS, PM, and APC are distinguished by their
//! introducer.

use super::actions::{Action, StringTerminator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    StringCapture,
}

/// Which introducer opened the current SOS/PM/APC string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Sos,
    Pm,
    Apc,
}

/// The terminal byte parser.
#[derive(Debug)]
pub struct Parser {
    state: State,
    intermediates: Vec<u8>,
    params: Vec<u16>,
    subparams: Vec<bool>,
    current_param: u16,
    param_has_digit: bool,
    current_is_sub: bool,
    prefix: Option<u8>,
    osc_command: u16,
    osc_command_done: bool,
    osc_payload: Vec<u8>,
    dcs_final: u8,
    string_kind: StringKind,
    string_data: Vec<u8>,
    /// ESC seen inside a string command; the next byte decides between ST
    /// (`\`) and aborting into a fresh escape sequence.
    string_escape: bool,
    utf8_buffer: Vec<u8>,
    utf8_remaining: u8,
    /// Byte to reprocess after an invalid UTF-8 continuation.
    replay_byte: Option<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ground state.
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            intermediates: Vec::with_capacity(4),
            params: Vec::with_capacity(16),
            subparams: Vec::with_capacity(16),
            current_param: 0,
            param_has_digit: false,
            current_is_sub: false,
            prefix: None,
            osc_command: 0,
            osc_command_done: false,
            osc_payload: Vec::with_capacity(256),
            dcs_final: 0,
            string_kind: StringKind::Apc,
            string_data: Vec::with_capacity(256),
            string_escape: false,
            utf8_buffer: Vec::with_capacity(4),
            utf8_remaining: 0,
            replay_byte: None,
        }
    }

    /// Reset to the ground state, dropping any partial sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_params();
        self.osc_payload.clear();
        self.string_data.clear();
        self.string_escape = false;
        self.utf8_buffer.clear();
        self.utf8_remaining = 0;
        self.replay_byte = None;
    }

    fn clear_params(&mut self) {
        self.intermediates.clear();
        self.params.clear();
        self.subparams.clear();
        self.current_param = 0;
        self.param_has_digit = false;
        self.current_is_sub = false;
        self.prefix = None;
    }

    /// Process a chunk of bytes, returning the resulting actions.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        for &byte in data {
            if let Some(action) = self.process_byte(byte) {
                actions.push(action);
            }
            // A byte that broke a UTF-8 sequence is reprocessed on its own
            if let Some(replay) = self.replay_byte.take() {
                if let Some(action) = self.process_byte(replay) {
                    actions.push(action);
                }
            }
        }
        actions
    }

    fn process_byte(&mut self, byte: u8) -> Option<Action> {
        // ESC inside a string command: `ESC \` is ST, anything else aborts
        // the string and is reprocessed as a fresh escape sequence.
        if self.string_escape {
            self.string_escape = false;
            if byte == b'\\' {
                return self.terminate_string(StringTerminator::St);
            }
            self.osc_payload.clear();
            self.string_data.clear();
            self.state = State::Escape;
            self.clear_params();
            return self.process_byte(byte);
        }

        // UTF-8 continuation in ground state takes priority over C1 checks.
        if self.state == State::Ground && self.utf8_remaining > 0 {
            return self.process_utf8_continuation(byte);
        }

        if byte < 0x20 {
            return self.process_c0(byte);
        }

        // DEL is ignored everywhere except DCS passthrough data.
        if byte == 0x7F && self.state != State::DcsPassthrough {
            return None;
        }

        if (0x80..=0x9F).contains(&byte) {
            return self.process_c1(byte);
        }

        match self.state {
            State::Ground => self.process_ground(byte),
            State::Escape => self.process_escape(byte),
            State::EscapeIntermediate => self.process_escape_intermediate(byte),
            State::CsiEntry => self.process_csi_entry(byte),
            State::CsiParam => self.process_csi_param(byte),
            State::CsiIntermediate => self.process_csi_intermediate(byte),
            State::CsiIgnore => self.process_csi_ignore(byte),
            State::OscString => self.process_osc_string(byte),
            State::DcsEntry => self.process_dcs_entry(byte),
            State::DcsParam => self.process_dcs_param(byte),
            State::DcsIntermediate => self.process_dcs_intermediate(byte),
            State::DcsPassthrough => self.process_dcs_passthrough(byte),
            State::DcsIgnore => None,
            State::StringCapture => self.process_string_capture(byte),
        }
    }

    fn in_string_state(&self) -> bool {
        matches!(
            self.state,
            State::OscString | State::DcsPassthrough | State::DcsIgnore | State::StringCapture
        )
    }

    fn process_c0(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x18 => {
                // CAN cancels any sequence in progress
                self.abort_sequence();
                None
            }
            0x1A => {
                // SUB cancels and is executed (prints a substitute marker)
                self.abort_sequence();
                Some(Action::Execute(0x1A))
            }
            0x1B => {
                if self.in_string_state() {
                    self.string_escape = true;
                } else {
                    self.state = State::Escape;
                    self.clear_params();
                }
                None
            }
            0x07 if self.state == State::OscString => self.terminate_osc(StringTerminator::Bell),
            _ => {
                if self.in_string_state() {
                    // Other C0 controls are ignored inside string commands
                    None
                } else {
                    Some(Action::Execute(byte))
                }
            }
        }
    }

    fn abort_sequence(&mut self) {
        self.state = State::Ground;
        self.osc_payload.clear();
        self.string_data.clear();
        self.string_escape = false;
    }

    fn process_c1(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x90 => {
                self.enter_dcs();
                None
            }
            0x98 => {
                self.enter_string(StringKind::Sos);
                None
            }
            0x9B => {
                self.state = State::CsiEntry;
                self.clear_params();
                None
            }
            0x9C => self.terminate_string(StringTerminator::St),
            0x9D => {
                self.enter_osc();
                None
            }
            0x9E => {
                self.enter_string(StringKind::Pm);
                None
            }
            0x9F => {
                self.enter_string(StringKind::Apc);
                None
            }
            _ => None,
        }
    }

    fn enter_osc(&mut self) {
        self.state = State::OscString;
        self.osc_command = 0;
        self.osc_command_done = false;
        self.osc_payload.clear();
    }

    fn enter_dcs(&mut self) {
        self.state = State::DcsEntry;
        self.clear_params();
        self.dcs_final = 0;
        self.string_data.clear();
    }

    fn enter_string(&mut self, kind: StringKind) {
        self.state = State::StringCapture;
        self.string_kind = kind;
        self.string_data.clear();
    }

    fn process_ground(&mut self, byte: u8) -> Option<Action> {
        if byte >= 0xC0 {
            return self.start_utf8(byte);
        }
        Some(Action::Print(byte as char))
    }

    fn start_utf8(&mut self, byte: u8) -> Option<Action> {
        self.utf8_buffer.clear();
        self.utf8_buffer.push(byte);

        if byte < 0xE0 {
            self.utf8_remaining = 1;
        } else if byte < 0xF0 {
            self.utf8_remaining = 2;
        } else if byte < 0xF8 {
            self.utf8_remaining = 3;
        } else {
            self.utf8_buffer.clear();
            return Some(Action::Print('\u{FFFD}'));
        }
        None
    }

    fn process_utf8_continuation(&mut self, byte: u8) -> Option<Action> {
        if (0x80..=0xBF).contains(&byte) {
            self.utf8_buffer.push(byte);
            self.utf8_remaining -= 1;
            if self.utf8_remaining == 0 {
                let s = String::from_utf8_lossy(&self.utf8_buffer);
                let c = s.chars().next().unwrap_or('\u{FFFD}');
                self.utf8_buffer.clear();
                return Some(Action::Print(c));
            }
            None
        } else {
            // Invalid continuation: emit a replacement for the broken
            // sequence, then let the byte be reprocessed on its own.
            self.utf8_buffer.clear();
            self.utf8_remaining = 0;
            self.replay_byte = Some(byte);
            Some(Action::Print('\u{FFFD}'))
        }
    }

    fn process_escape(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::EscapeIntermediate;
                None
            }
            0x5B => {
                self.state = State::CsiEntry;
                self.clear_params();
                None
            }
            0x5D => {
                self.enter_osc();
                None
            }
            0x50 => {
                self.enter_dcs();
                None
            }
            0x58 => {
                self.enter_string(StringKind::Sos);
                None
            }
            0x5E => {
                self.enter_string(StringKind::Pm);
                None
            }
            0x5F => {
                self.enter_string(StringKind::Apc);
                None
            }
            0x30..=0x7E => {
                self.state = State::Ground;
                Some(Action::EscDispatch {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                })
            }
            _ => {
                self.state = State::Ground;
                None
            }
        }
    }

    fn process_escape_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F => {
                self.intermediates.push(byte);
                None
            }
            0x30..=0x7E => {
                self.state = State::Ground;
                Some(Action::EscDispatch {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                })
            }
            _ => {
                self.state = State::Ground;
                None
            }
        }
    }

    fn push_param(&mut self) {
        self.params.push(self.current_param);
        self.subparams.push(self.current_is_sub);
        self.current_param = 0;
        self.param_has_digit = false;
    }

    fn accumulate_digit(&mut self, byte: u8) {
        self.current_param = self
            .current_param
            .saturating_mul(10)
            .saturating_add(u16::from(byte - b'0'));
        self.param_has_digit = true;
    }

    fn process_csi_entry(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x30..=0x39 => {
                self.accumulate_digit(byte);
                self.state = State::CsiParam;
                None
            }
            b';' => {
                self.push_param();
                self.current_is_sub = false;
                self.state = State::CsiParam;
                None
            }
            b':' => {
                self.push_param();
                self.current_is_sub = true;
                self.state = State::CsiParam;
                None
            }
            b'?' | b'>' | b'<' | b'=' => {
                self.prefix = Some(byte);
                self.state = State::CsiParam;
                None
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
                None
            }
            0x40..=0x7E => {
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    fn process_csi_param(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x30..=0x39 => {
                self.accumulate_digit(byte);
                None
            }
            b';' => {
                self.push_param();
                self.current_is_sub = false;
                None
            }
            b':' => {
                self.push_param();
                self.current_is_sub = true;
                None
            }
            0x20..=0x2F => {
                if self.param_has_digit || !self.params.is_empty() {
                    self.push_param();
                }
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
                None
            }
            0x40..=0x7E => {
                if self.param_has_digit || !self.params.is_empty() {
                    self.push_param();
                }
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    fn process_csi_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F => {
                self.intermediates.push(byte);
                None
            }
            0x40..=0x7E => {
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    fn process_csi_ignore(&mut self, byte: u8) -> Option<Action> {
        if (0x40..=0x7E).contains(&byte) {
            self.state = State::Ground;
        }
        None
    }

    fn dispatch_csi(&mut self, final_byte: u8) -> Option<Action> {
        Some(Action::CsiDispatch {
            params: std::mem::take(&mut self.params),
            subparams: std::mem::take(&mut self.subparams),
            prefix: self.prefix.take(),
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
        })
    }

    fn process_osc_string(&mut self, byte: u8) -> Option<Action> {
        if !self.osc_command_done {
            if byte.is_ascii_digit() {
                self.osc_command = self
                    .osc_command
                    .saturating_mul(10)
                    .saturating_add(u16::from(byte - b'0'));
                return None;
            }
            if byte == b';' {
                self.osc_command_done = true;
                return None;
            }
            // Commands without a numeric prefix fall through as payload
            self.osc_command_done = true;
        }
        self.osc_payload.push(byte);
        None
    }

    fn terminate_osc(&mut self, terminator: StringTerminator) -> Option<Action> {
        self.state = State::Ground;
        Some(Action::OscDispatch {
            command: self.osc_command,
            payload: std::mem::take(&mut self.osc_payload),
            terminator,
        })
    }

    fn process_dcs_entry(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x30..=0x39 => {
                self.accumulate_digit(byte);
                self.state = State::DcsParam;
                None
            }
            b';' => {
                self.push_param();
                self.state = State::DcsParam;
                None
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::DcsIntermediate;
                None
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.state = State::DcsPassthrough;
                None
            }
            b':' | b'<' | b'=' | b'>' | b'?' => {
                self.state = State::DcsParam;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    fn process_dcs_param(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x30..=0x39 => {
                self.accumulate_digit(byte);
                None
            }
            b';' => {
                self.push_param();
                None
            }
            0x20..=0x2F => {
                if self.param_has_digit || !self.params.is_empty() {
                    self.push_param();
                }
                self.intermediates.push(byte);
                self.state = State::DcsIntermediate;
                None
            }
            0x40..=0x7E => {
                if self.param_has_digit || !self.params.is_empty() {
                    self.push_param();
                }
                self.dcs_final = byte;
                self.state = State::DcsPassthrough;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    fn process_dcs_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F => {
                self.intermediates.push(byte);
                None
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.state = State::DcsPassthrough;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    fn process_dcs_passthrough(&mut self, byte: u8) -> Option<Action> {
        self.string_data.push(byte);
        None
    }

    fn process_string_capture(&mut self, byte: u8) -> Option<Action> {
        self.string_data.push(byte);
        None
    }

    fn terminate_string(&mut self, terminator: StringTerminator) -> Option<Action> {
        let action = match self.state {
            State::OscString => return self.terminate_osc(terminator),
            State::DcsPassthrough => Some(Action::DcsDispatch {
                params: std::mem::take(&mut self.params),
                intermediates: std::mem::take(&mut self.intermediates),
                final_byte: self.dcs_final,
                data: std::mem::take(&mut self.string_data),
            }),
            State::StringCapture => {
                let data = std::mem::take(&mut self.string_data);
                Some(match self.string_kind {
                    StringKind::Sos => Action::SosDispatch(data),
                    StringKind::Pm => Action::PmDispatch(data),
                    StringKind::Apc => Action::ApcDispatch(data),
                })
            }
            State::DcsIgnore => {
                self.string_data.clear();
                None
            }
            _ => None,
        };
        self.state = State::Ground;
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"Hello");
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], Action::Print('H'));
        assert_eq!(actions[4], Action::Print('o'));
    }

    #[test]
    fn test_c0_controls() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"A\nB\rC");
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[1], Action::Execute(b'\n'));
        assert_eq!(actions[3], Action::Execute(b'\r'));
    }

    #[test]
    fn test_csi_cursor_up() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[5A");
        assert_eq!(actions.len(), 1);
        let Action::CsiDispatch {
            params, final_byte, prefix, ..
        } = &actions[0]
        else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[5]);
        assert_eq!(*final_byte, b'A');
        assert_eq!(*prefix, None);
    }

    #[test]
    fn test_csi_cup() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[10;20H");
        let Action::CsiDispatch { params, final_byte, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[10, 20]);
        assert_eq!(*final_byte, b'H');
    }

    #[test]
    fn test_csi_private_prefix() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[?25h");
        let Action::CsiDispatch { params, prefix, final_byte, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[25]);
        assert_eq!(*prefix, Some(b'?'));
        assert_eq!(*final_byte, b'h');
    }

    #[test]
    fn test_csi_gt_prefix() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[>4;2m");
        let Action::CsiDispatch { params, prefix, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[4, 2]);
        assert_eq!(*prefix, Some(b'>'));
    }

    #[test]
    fn test_csi_sgr_truecolor() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[1;31;48;2;255;128;0m");
        let Action::CsiDispatch { params, final_byte, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[1, 31, 48, 2, 255, 128, 0]);
        assert_eq!(*final_byte, b'm');
    }

    #[test]
    fn test_csi_colon_subparams() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[4:3m");
        let Action::CsiDispatch { params, subparams, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[4, 3]);
        assert_eq!(subparams, &[false, true]);
    }

    #[test]
    fn test_esc_save_restore() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b7\x1b8");
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::EscDispatch { intermediates: vec![], final_byte: b'7' }
        );
        assert_eq!(
            actions[1],
            Action::EscDispatch { intermediates: vec![], final_byte: b'8' }
        );
    }

    #[test]
    fn test_esc_designate_charset() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b(B\x1b)0");
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::EscDispatch { intermediates: vec![b'('], final_byte: b'B' }
        );
        assert_eq!(
            actions[1],
            Action::EscDispatch { intermediates: vec![b')'], final_byte: b'0' }
        );
    }

    #[test]
    fn test_osc_title_bel() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b]0;My Title\x07");
        assert_eq!(
            actions[0],
            Action::OscDispatch {
                command: 0,
                payload: b"My Title".to_vec(),
                terminator: StringTerminator::Bell,
            }
        );
    }

    #[test]
    fn test_osc_title_st() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b]2;hi\x1b\\");
        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0],
            Action::OscDispatch {
                command: 2,
                payload: b"hi".to_vec(),
                terminator: StringTerminator::St,
            }
        );
    }

    #[test]
    fn test_osc_payload_keeps_inner_semicolons() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b]8;id=x;https://example.com\x07");
        assert_eq!(
            actions[0],
            Action::OscDispatch {
                command: 8,
                payload: b"id=x;https://example.com".to_vec(),
                terminator: StringTerminator::Bell,
            }
        );
    }

    #[test]
    fn test_osc_numeric_payload_not_eaten() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b]133;A\x07");
        assert_eq!(
            actions[0],
            Action::OscDispatch {
                command: 133,
                payload: b"A".to_vec(),
                terminator: StringTerminator::Bell,
            }
        );
    }

    #[test]
    fn test_dcs_sixel_keeps_params_and_final() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1bP0;1;0q#0;2;100;0;0#0~~\x1b\\");
        assert_eq!(actions.len(), 1);
        let Action::DcsDispatch { params, final_byte, data, .. } = &actions[0] else {
            panic!("expected DcsDispatch");
        };
        assert_eq!(params, &[0, 1, 0]);
        assert_eq!(*final_byte, b'q');
        assert_eq!(data, b"#0;2;100;0;0#0~~");
    }

    #[test]
    fn test_apc_kitty() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b_Ga=q,i=1;\x1b\\");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0], Action::ApcDispatch(b"Ga=q,i=1;".to_vec()));
    }

    #[test]
    fn test_pm_and_sos() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b^secret\x1b\\\x1bXstart\x1b\\");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Action::PmDispatch(b"secret".to_vec()));
        assert_eq!(actions[1], Action::SosDispatch(b"start".to_vec()));
    }

    #[test]
    fn test_utf8() {
        let mut parser = Parser::new();
        let actions = parser.feed("Hello 世界".as_bytes());
        assert_eq!(actions.len(), 8);
        assert_eq!(actions[6], Action::Print('世'));
        assert_eq!(actions[7], Action::Print('界'));
    }

    #[test]
    fn test_chunk_boundary_csi() {
        let mut parser = Parser::new();
        assert!(parser.feed(b"\x1b[").is_empty());
        assert!(parser.feed(b"5").is_empty());
        let actions = parser.feed(b"A");
        assert_eq!(actions.len(), 1);
        let Action::CsiDispatch { params, final_byte, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[5]);
        assert_eq!(*final_byte, b'A');
    }

    #[test]
    fn test_chunk_boundary_utf8() {
        let mut parser = Parser::new();
        assert!(parser.feed(&[0xE4]).is_empty());
        assert!(parser.feed(&[0xB8]).is_empty());
        let actions = parser.feed(&[0x96]);
        assert_eq!(actions, vec![Action::Print('世')]);
    }

    #[test]
    fn test_chunk_boundary_st() {
        let mut parser = Parser::new();
        assert!(parser.feed(b"\x1b]0;title\x1b").is_empty());
        let actions = parser.feed(b"\\");
        assert_eq!(actions.len(), 1);
        assert!(actions[0].is_osc());
    }

    #[test]
    fn test_cancel_sequence() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[5\x18A");
        assert_eq!(actions, vec![Action::Print('A')]);
    }

    #[test]
    fn test_sub_cancels_and_executes() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[5\x1aA");
        assert_eq!(actions, vec![Action::Execute(0x1A), Action::Print('A')]);
    }

    #[test]
    fn test_empty_params() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[H");
        let Action::CsiDispatch { params, final_byte, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert!(params.is_empty());
        assert_eq!(*final_byte, b'H');
    }

    #[test]
    fn test_param_overflow_saturates() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\x1b[99999999A");
        let Action::CsiDispatch { params, .. } = &actions[0] else {
            panic!("expected CsiDispatch");
        };
        assert_eq!(params, &[u16::MAX]);
    }
}

//! Parser actions
//!
//! Semantic events produced by the byte-level state machine. Each action
//! corresponds to exactly one control sequence or one printable codepoint.

use serde::{Deserialize, Serialize};

/// How an OSC string was terminated. Replies to OSC queries echo the same
/// terminator back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringTerminator {
    /// BEL (0x07), the xterm shorthand.
    Bell,
    /// ST (ESC \ or 0x9C).
    St,
}

impl StringTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            StringTerminator::Bell => "\x07",
            StringTerminator::St => "\x1b\\",
        }
    }
}

/// Actions produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Print a character at the cursor.
    Print(char),

    /// Execute a C0 control character (0x00-0x1F except ESC).
    Execute(u8),

    /// CSI sequence: ESC [ [prefix] [params] [intermediates] final
    CsiDispatch {
        /// Numeric parameters. Empty parameters arrive as 0.
        params: Vec<u16>,
        /// `subparams[i]` is true when parameter `i` was introduced by a
        /// colon, i.e. it refines the preceding parameter (SGR 4:3, 38:5:n).
        subparams: Vec<bool>,
        /// Private/prefix marker (`?`, `>`, `<`, `=`), if any.
        prefix: Option<u8>,
        /// Intermediate bytes (0x20-0x2F).
        intermediates: Vec<u8>,
        /// Final byte (0x40-0x7E).
        final_byte: u8,
    },

    /// Non-CSI escape sequence: ESC [intermediates] final
    EscDispatch {
        intermediates: Vec<u8>,
        final_byte: u8,
    },

    /// OSC string: ESC ] command ; payload (BEL | ST)
    OscDispatch {
        /// Leading numeric command (0 when absent).
        command: u16,
        /// Bytes after the first `;`, inner semicolons preserved.
        payload: Vec<u8>,
        terminator: StringTerminator,
    },

    /// DCS string: ESC P params final data ST
    DcsDispatch {
        params: Vec<u16>,
        intermediates: Vec<u8>,
        final_byte: u8,
        data: Vec<u8>,
    },

    /// APC string payload (ESC _ ... ST).
    ApcDispatch(Vec<u8>),

    /// PM string payload (ESC ^ ... ST).
    PmDispatch(Vec<u8>),

    /// SOS string payload (ESC X ... ST).
    SosDispatch(Vec<u8>),
}

impl Action {
    pub fn is_print(&self) -> bool {
        matches!(self, Action::Print(_))
    }

    pub fn is_execute(&self) -> bool {
        matches!(self, Action::Execute(_))
    }

    pub fn is_csi(&self) -> bool {
        matches!(self, Action::CsiDispatch { .. })
    }

    pub fn is_osc(&self) -> bool {
        matches!(self, Action::OscDispatch { .. })
    }

    pub fn is_esc(&self) -> bool {
        matches!(self, Action::EscDispatch { .. })
    }
}

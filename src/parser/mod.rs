//! Escape sequence parser
//!
//! Byte-level tokenizer for the terminal input stream. The parser owns
//! tokenization only: it turns bytes into [`Action`]s and never inspects
//! terminal state. The terminal dispatches actions onto its handler surface.

mod actions;
mod state;

pub use actions::{Action, StringTerminator};
pub use state::Parser;

//! Shell integration (OSC 133)
//!
//! Shells that emit semantic prompt marks let clients navigate between
//! prompts and extract command output without guessing at prompt strings.
//! Marks are recorded with absolute rows (scrollback offset included) so
//! they stay valid as content scrolls off screen.

use serde::{Deserialize, Serialize};

use crate::core::buffer::cells_to_string;

use super::state::TermState;

/// The four OSC 133 mark types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptMarkKind {
    /// `A` - start of a prompt.
    PromptStart,
    /// `B` - start of the command being typed.
    CommandStart,
    /// `C` - command execution began; output follows.
    CommandExecuted,
    /// `D[;exit]` - command finished.
    CommandFinished,
}

/// A recorded semantic prompt mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMark {
    pub kind: PromptMarkKind,
    /// Absolute row: scrollback length at record time plus cursor row.
    pub row: usize,
    /// Exit code carried by `CommandFinished` marks.
    pub exit_code: Option<i32>,
}

impl TermState {
    /// Record a mark at the cursor's absolute row.
    pub fn add_prompt_mark(&mut self, kind: PromptMarkKind, exit_code: Option<i32>) {
        let row = self.cursor.row + self.primary.scrollback_len();
        self.prompt_marks.push(PromptMark { kind, row, exit_code });
    }

    /// Absolute row of the first mark strictly after `abs_row`, optionally
    /// filtered by kind.
    pub fn next_prompt_row(&self, abs_row: usize, kind: Option<PromptMarkKind>) -> Option<usize> {
        self.prompt_marks
            .iter()
            .find(|m| m.row > abs_row && kind.map_or(true, |k| m.kind == k))
            .map(|m| m.row)
    }

    /// Absolute row of the last mark strictly before `abs_row`, optionally
    /// filtered by kind.
    pub fn prev_prompt_row(&self, abs_row: usize, kind: Option<PromptMarkKind>) -> Option<usize> {
        self.prompt_marks
            .iter()
            .rev()
            .find(|m| m.row < abs_row && kind.map_or(true, |k| m.kind == k))
            .map(|m| m.row)
    }

    /// The mark recorded at `abs_row`, if any.
    pub fn prompt_mark_at(&self, abs_row: usize) -> Option<PromptMark> {
        self.prompt_marks.iter().find(|m| m.row == abs_row).copied()
    }

    /// Convert a viewport row to an absolute row.
    pub fn viewport_to_absolute(&self, viewport_row: usize) -> usize {
        viewport_row + self.primary.scrollback_len()
    }

    /// Convert an absolute row back to a viewport row; `None` when the row
    /// has scrolled out of the viewport.
    pub fn absolute_to_viewport(&self, abs_row: usize) -> Option<usize> {
        let scrollback = self.primary.scrollback_len();
        let viewport = abs_row.checked_sub(scrollback)?;
        (viewport < self.rows).then_some(viewport)
    }

    /// Output of the most recent completed command: the text between the
    /// latest `CommandExecuted` mark and the latest `CommandFinished` mark
    /// that follows it. Empty when no such pair exists.
    pub fn last_command_output(&self) -> String {
        if self.prompt_marks.is_empty() {
            return String::new();
        }

        let mut finished: Option<&PromptMark> = None;
        let mut executed: Option<&PromptMark> = None;
        for mark in self.prompt_marks.iter().rev() {
            if finished.is_none() && mark.kind == PromptMarkKind::CommandFinished {
                finished = Some(mark);
            }
            if executed.is_none() && mark.kind == PromptMarkKind::CommandExecuted {
                executed = Some(mark);
            }
            if let (Some(e), Some(f)) = (executed, finished) {
                if e.row < f.row {
                    break;
                }
                // Mismatched pair; keep scanning backwards
                executed = None;
                finished = None;
            }
        }

        match (executed, finished) {
            (Some(e), Some(f)) => self.text_between_rows(e.row, f.row),
            _ => String::new(),
        }
    }

    /// Text from `start_row` (inclusive) to `end_row` (exclusive), both
    /// absolute. Trailing empty lines are trimmed.
    fn text_between_rows(&self, start_row: usize, end_row: usize) -> String {
        let scrollback_len = self.primary.scrollback_len();

        let mut lines = Vec::new();
        for abs_row in start_row..end_row {
            let content = if abs_row < scrollback_len {
                self.primary
                    .scrollback_line(abs_row)
                    .map(|cells| cells_to_string(&cells))
                    .unwrap_or_default()
            } else {
                let viewport_row = abs_row - scrollback_len;
                if viewport_row < self.rows {
                    self.active().line_content(viewport_row)
                } else {
                    String::new()
                }
            };
            lines.push(content);
        }

        let last_non_empty = lines.iter().rposition(|l| !l.is_empty());
        match last_non_empty {
            Some(last) => lines[..=last].join("\n"),
            None => String::new(),
        }
    }
}

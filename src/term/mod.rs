//! The terminal
//!
//! [`Terminal`] is the public entry point: feed it bytes with
//! [`Terminal::write`], query the resulting screen model, and register
//! providers for the side channels (responses, bell, title, clipboard, ...).
//!
//! Concurrency: one reader/writer lock guards the terminal state. `write`
//! serializes callers through the parser lock; queries take the read side
//! and may run concurrently. Recording happens before decoding, outside the
//! state lock, and responses are emitted through a provider handle that is
//! snapshot-read rather than held.

mod dispatch;
mod handler;
pub mod middleware;
pub mod providers;
pub mod shell;
pub mod snapshot;
mod state;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::buffer::{cells_to_string, Position};
use crate::core::cell::Cell;
use crate::core::cursor::CursorStyle;
use crate::core::scrollback::{NoopScrollback, ScrollbackProvider};
use crate::graphics::{ImageData, ImagePlacement, ImageStore};
use crate::parser::Parser;

use middleware::Middleware;
use providers::{
    ApcProvider, BellProvider, ClipboardProvider, NoopApc, NoopBell, NoopClipboard,
    NoopNotification, NoopPm, NoopRecording, NoopResponse, NoopShellIntegration, NoopSos,
    NoopTitle, NotificationProvider, PmProvider, RecordingProvider, ResponseProvider,
    ShellIntegrationProvider, SizeProvider, SosProvider, TitleProvider,
};
use shell::{PromptMark, PromptMarkKind};
use snapshot::{ImageSnapshot, Snapshot, SnapshotDetail};
use state::TermState;

pub use state::{
    ActiveBuffer, CharAttribute, KeyboardMode, KeyboardModeBehavior, LineClearMode, Mode,
    ScreenClearMode, Selection, TabClearMode, TerminalMode, DEFAULT_COLS, DEFAULT_ROWS,
};

/// Construction-time configuration. Every field has a sensible default;
/// `rows`/`cols` of zero fall back to 24x80.
pub struct TerminalOptions {
    pub rows: usize,
    pub cols: usize,
    /// Scrollback storage for the primary buffer. `None` disables
    /// scrollback.
    pub scrollback: Option<Arc<dyn ScrollbackProvider>>,
    /// Grow the buffer instead of scrolling or wrapping. Useful for
    /// capturing complete output without truncation.
    pub auto_resize: bool,
    pub sixel_enabled: bool,
    pub kitty_enabled: bool,
    /// Image memory budget in bytes. `None` keeps the default (320 MB).
    pub image_max_memory: Option<usize>,
    pub middleware: Option<Middleware>,
    pub response: Option<Arc<dyn ResponseProvider>>,
    pub bell: Option<Arc<dyn BellProvider>>,
    pub title: Option<Arc<dyn TitleProvider>>,
    pub apc: Option<Arc<dyn ApcProvider>>,
    pub pm: Option<Arc<dyn PmProvider>>,
    pub sos: Option<Arc<dyn SosProvider>>,
    pub clipboard: Option<Arc<dyn ClipboardProvider>>,
    pub recording: Option<Arc<dyn RecordingProvider>>,
    pub size: Option<Arc<dyn SizeProvider>>,
    pub shell_integration: Option<Arc<dyn ShellIntegrationProvider>>,
    pub notification: Option<Arc<dyn NotificationProvider>>,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            scrollback: None,
            auto_resize: false,
            sixel_enabled: true,
            kitty_enabled: true,
            image_max_memory: None,
            middleware: None,
            response: None,
            bell: None,
            title: None,
            apc: None,
            pm: None,
            sos: None,
            clipboard: None,
            recording: None,
            size: None,
            shell_integration: None,
            notification: None,
        }
    }
}

impl TerminalOptions {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }
}

/// A headless VT220-compatible terminal.
pub struct Terminal {
    state: RwLock<TermState>,
    images: ImageStore,
    parser: Mutex<Parser>,
    middleware: RwLock<Middleware>,

    response: RwLock<Arc<dyn ResponseProvider>>,
    bell: RwLock<Arc<dyn BellProvider>>,
    title: RwLock<Arc<dyn TitleProvider>>,
    apc: RwLock<Arc<dyn ApcProvider>>,
    pm: RwLock<Arc<dyn PmProvider>>,
    sos: RwLock<Arc<dyn SosProvider>>,
    clipboard: RwLock<Arc<dyn ClipboardProvider>>,
    recording: RwLock<Arc<dyn RecordingProvider>>,
    size: RwLock<Option<Arc<dyn SizeProvider>>>,
    shell_integration: RwLock<Arc<dyn ShellIntegrationProvider>>,
    notification: RwLock<Arc<dyn NotificationProvider>>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    /// A 24x80 terminal with no scrollback and default providers.
    pub fn new() -> Self {
        Self::with_options(TerminalOptions::default())
    }

    pub fn with_options(options: TerminalOptions) -> Self {
        let rows = if options.rows == 0 { DEFAULT_ROWS } else { options.rows };
        let cols = if options.cols == 0 { DEFAULT_COLS } else { options.cols };

        let scrollback = options
            .scrollback
            .unwrap_or_else(|| Arc::new(NoopScrollback));

        let mut state = TermState::new(rows, cols, scrollback, options.auto_resize);
        state.sixel_enabled = options.sixel_enabled;
        state.kitty_enabled = options.kitty_enabled;

        let images = ImageStore::new();
        if let Some(bytes) = options.image_max_memory {
            images.set_max_memory(bytes);
        }

        Self {
            state: RwLock::new(state),
            images,
            parser: Mutex::new(Parser::new()),
            middleware: RwLock::new(options.middleware.unwrap_or_default()),
            response: RwLock::new(
                options.response.unwrap_or_else(|| Arc::new(NoopResponse)),
            ),
            bell: RwLock::new(options.bell.unwrap_or_else(|| Arc::new(NoopBell))),
            title: RwLock::new(options.title.unwrap_or_else(|| Arc::new(NoopTitle))),
            apc: RwLock::new(options.apc.unwrap_or_else(|| Arc::new(NoopApc))),
            pm: RwLock::new(options.pm.unwrap_or_else(|| Arc::new(NoopPm))),
            sos: RwLock::new(options.sos.unwrap_or_else(|| Arc::new(NoopSos))),
            clipboard: RwLock::new(
                options.clipboard.unwrap_or_else(|| Arc::new(NoopClipboard)),
            ),
            recording: RwLock::new(
                options.recording.unwrap_or_else(|| Arc::new(NoopRecording)),
            ),
            size: RwLock::new(options.size),
            shell_integration: RwLock::new(
                options
                    .shell_integration
                    .unwrap_or_else(|| Arc::new(NoopShellIntegration)),
            ),
            notification: RwLock::new(
                options
                    .notification
                    .unwrap_or_else(|| Arc::new(NoopNotification)),
            ),
        }
    }

    /// Process raw terminal output bytes. Returns the number of bytes
    /// consumed (always all of them).
    ///
    /// Safe to call from any thread; concurrent writers are serialized.
    pub fn write(&self, data: &[u8]) -> usize {
        let recording = self.recording.read().clone();
        recording.record(data);

        let mut parser = self.parser.lock();
        let actions = parser.feed(data);
        for action in actions {
            self.apply_action(action);
        }
        data.len()
    }

    /// Convenience wrapper over [`Terminal::write`].
    pub fn write_str(&self, s: &str) -> usize {
        self.write(s.as_bytes())
    }

    // --- Dimension and cursor queries ---

    pub fn rows(&self) -> usize {
        self.state.read().rows
    }

    pub fn cols(&self) -> usize {
        self.state.read().cols
    }

    /// Cursor position (row, col), 0-based.
    pub fn cursor_pos(&self) -> (usize, usize) {
        let st = self.state.read();
        (st.cursor.row, st.cursor.col)
    }

    pub fn cursor_visible(&self) -> bool {
        self.state.read().cursor.visible
    }

    pub fn cursor_style(&self) -> CursorStyle {
        self.state.read().cursor.style
    }

    pub fn title(&self) -> String {
        self.state.read().title.clone()
    }

    pub fn has_mode(&self, mode: Mode) -> bool {
        self.state.read().modes.contains(mode.flag())
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.state.read().is_alternate()
    }

    /// Scroll region `[top, bottom)`, 0-based with exclusive bottom.
    pub fn scroll_region(&self) -> (usize, usize) {
        let st = self.state.read();
        (st.scroll_top, st.scroll_bottom)
    }

    pub fn auto_resize(&self) -> bool {
        self.state.read().auto_resize
    }

    pub fn sixel_enabled(&self) -> bool {
        self.state.read().sixel_enabled
    }

    pub fn kitty_enabled(&self) -> bool {
        self.state.read().kitty_enabled
    }

    // --- Content queries ---

    /// Copy of the cell at (row, col) in the active buffer.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.state.read().active().cell(row, col).cloned()
    }

    /// Text content of a row, trailing blanks trimmed.
    pub fn line_content(&self, row: usize) -> String {
        self.state.read().active().line_content(row)
    }

    /// Visible screen text: rows joined with newlines, trailing empty rows
    /// dropped.
    pub fn screen_text(&self) -> String {
        let st = self.state.read();
        let lines: Vec<String> = (0..st.rows).map(|r| st.active().line_content(r)).collect();
        match lines.iter().rposition(|l| !l.is_empty()) {
            Some(last) => lines[..=last].join("\n"),
            None => String::new(),
        }
    }

    /// Positions of every occurrence of `pattern` in the visible screen.
    pub fn search(&self, pattern: &str) -> Vec<Position> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let st = self.state.read();
        let needle: Vec<char> = pattern.chars().collect();
        let mut matches = Vec::new();
        for row in 0..st.rows {
            let line: Vec<char> = st.active().line_content(row).chars().collect();
            find_in_line(&line, &needle, row as isize, &mut matches);
        }
        matches
    }

    /// Positions of every occurrence of `pattern` in scrollback. Rows are
    /// negative: `-1` is the most recent scrollback line.
    pub fn search_scrollback(&self, pattern: &str) -> Vec<Position> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let st = self.state.read();
        let needle: Vec<char> = pattern.chars().collect();
        let len = st.primary.scrollback_len();
        let mut matches = Vec::new();
        for i in 0..len {
            let Some(cells) = st.primary.scrollback_line(i) else {
                continue;
            };
            let line: Vec<char> = cells_to_string(&cells).chars().collect();
            let row = -((len - i) as isize);
            find_in_line(&line, &needle, row, &mut matches);
        }
        matches
    }

    // --- Scrollback ---

    pub fn scrollback_len(&self) -> usize {
        self.state.read().primary.scrollback_len()
    }

    /// Scrollback line at `index` (0 = oldest).
    pub fn scrollback_line(&self, index: usize) -> Option<Vec<Cell>> {
        self.state.read().primary.scrollback_line(index)
    }

    pub fn clear_scrollback(&self) {
        self.state.read().primary.clear_scrollback();
    }

    pub fn set_max_scrollback(&self, max: usize) {
        self.state.read().primary.set_max_scrollback(max);
    }

    pub fn max_scrollback(&self) -> usize {
        self.state.read().primary.max_scrollback()
    }

    pub fn set_scrollback_provider(&self, provider: Arc<dyn ScrollbackProvider>) {
        self.state.write().primary.set_scrollback_provider(provider);
    }

    // --- Dirty tracking ---

    pub fn has_dirty(&self) -> bool {
        self.state.read().active().has_dirty()
    }

    pub fn dirty_cells(&self) -> Vec<Position> {
        self.state.read().active().dirty_cells()
    }

    pub fn clear_dirty(&self) {
        self.state.write().active_mut().clear_all_dirty();
    }

    // --- Wrapped line tracking ---

    pub fn is_wrapped(&self, row: usize) -> bool {
        self.state.read().active().is_wrapped(row)
    }

    pub fn set_wrapped(&self, row: usize, wrapped: bool) {
        self.state.write().active_mut().set_wrapped(row, wrapped);
    }

    // --- Resize ---

    /// Resize to (rows, cols). Zero in either dimension is ignored.
    pub fn resize(&self, rows: usize, cols: usize) {
        if rows == 0 || cols == 0 {
            return;
        }
        self.state.write().resize(rows, cols);
    }

    // --- Selection ---

    /// Set the selection. Endpoints are normalized so start <= end.
    pub fn set_selection(&self, start: Position, end: Position) {
        let (start, end) = if end.before(&start) {
            (end, start)
        } else {
            (start, end)
        };
        self.state.write().selection = Selection {
            start,
            end,
            active: true,
        };
    }

    pub fn clear_selection(&self) {
        self.state.write().selection.active = false;
    }

    pub fn selection(&self) -> Selection {
        self.state.read().selection
    }

    pub fn has_selection(&self) -> bool {
        self.state.read().selection.active
    }

    /// True when (row, col) falls inside the active selection.
    pub fn is_selected(&self, row: usize, col: usize) -> bool {
        let st = self.state.read();
        if !st.selection.active {
            return false;
        }
        let pos = Position::new(row as isize, col);
        !pos.before(&st.selection.start) && !st.selection.end.before(&pos)
    }

    /// Text inside the active selection, rows joined with newlines.
    pub fn selected_text(&self) -> String {
        let st = self.state.read();
        if !st.selection.active {
            return String::new();
        }

        let start = st.selection.start;
        let end = st.selection.end;
        let mut out = String::new();

        let first_row = start.row.max(0) as usize;
        let last_row = end.row.max(0) as usize;
        for row in first_row..=last_row.min(st.rows.saturating_sub(1)) {
            let start_col = if row as isize == start.row { start.col } else { 0 };
            let end_col = if row as isize == end.row {
                (end.col + 1).min(st.cols)
            } else {
                st.cols
            };

            for col in start_col..end_col {
                if let Some(cell) = st.active().cell(row, col) {
                    if cell.is_wide_spacer() {
                        continue;
                    }
                    out.push(if cell.ch == '\0' { ' ' } else { cell.ch });
                }
            }
            if (row as isize) < end.row {
                out.push('\n');
            }
        }
        out
    }

    // --- Shell integration queries ---

    pub fn prompt_marks(&self) -> Vec<PromptMark> {
        self.state.read().prompt_marks.clone()
    }

    pub fn prompt_mark_count(&self) -> usize {
        self.state.read().prompt_marks.len()
    }

    pub fn clear_prompt_marks(&self) {
        self.state.write().prompt_marks.clear();
    }

    /// Absolute row of the first mark strictly after `abs_row`.
    pub fn next_prompt_row(&self, abs_row: usize, kind: Option<PromptMarkKind>) -> Option<usize> {
        self.state.read().next_prompt_row(abs_row, kind)
    }

    /// Absolute row of the last mark strictly before `abs_row`.
    pub fn prev_prompt_row(&self, abs_row: usize, kind: Option<PromptMarkKind>) -> Option<usize> {
        self.state.read().prev_prompt_row(abs_row, kind)
    }

    pub fn prompt_mark_at(&self, abs_row: usize) -> Option<PromptMark> {
        self.state.read().prompt_mark_at(abs_row)
    }

    /// Output of the most recent completed command (OSC 133 C..D span).
    pub fn last_command_output(&self) -> String {
        self.state.read().last_command_output()
    }

    pub fn viewport_to_absolute(&self, viewport_row: usize) -> usize {
        self.state.read().viewport_to_absolute(viewport_row)
    }

    pub fn absolute_to_viewport(&self, abs_row: usize) -> Option<usize> {
        self.state.read().absolute_to_viewport(abs_row)
    }

    // --- Working directory ---

    /// The OSC 7 working directory URI, empty when never reported.
    pub fn working_directory(&self) -> String {
        self.state.read().working_dir.clone()
    }

    /// Path component of the working directory URI. Empty unless the URI
    /// has the `file://host/path` shape.
    pub fn working_directory_path(&self) -> String {
        let uri = self.working_directory();
        let Some(rest) = uri.strip_prefix("file://") else {
            return String::new();
        };
        match rest.find('/') {
            Some(idx) => rest[idx..].to_string(),
            None => String::new(),
        }
    }

    // --- User vars ---

    pub fn user_var(&self, name: &str) -> String {
        self.state
            .read()
            .user_vars
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Copy of all user variables.
    pub fn user_vars(&self) -> std::collections::HashMap<String, String> {
        self.state.read().user_vars.clone()
    }

    pub fn clear_user_vars(&self) {
        self.state.write().user_vars.clear();
    }

    // --- Snapshots ---

    pub fn snapshot(&self, detail: SnapshotDetail) -> Snapshot {
        Snapshot::capture(&self.state.read(), &self.images, detail)
    }

    /// Full pixel export of a stored image.
    pub fn image_snapshot(&self, id: u32) -> Option<ImageSnapshot> {
        ImageSnapshot::from_store(&self.images, id)
    }

    // --- Images ---

    pub fn image(&self, id: u32) -> Option<ImageData> {
        self.images.image(id)
    }

    pub fn image_placements(&self) -> Vec<ImagePlacement> {
        self.images.placements()
    }

    pub fn image_count(&self) -> usize {
        self.images.image_count()
    }

    pub fn image_placement_count(&self) -> usize {
        self.images.placement_count()
    }

    pub fn image_used_memory(&self) -> usize {
        self.images.used_memory()
    }

    pub fn set_image_max_memory(&self, bytes: usize) {
        self.images.set_max_memory(bytes);
    }

    pub fn clear_images(&self) {
        self.images.clear();
    }

    // --- Recording ---

    /// Raw bytes captured by the recording provider since the last clear.
    pub fn recorded_data(&self) -> Vec<u8> {
        self.recording.read().data()
    }

    pub fn clear_recording(&self) {
        self.recording.read().clear();
    }

    // --- Providers and middleware ---

    pub fn set_response_provider(&self, provider: Arc<dyn ResponseProvider>) {
        *self.response.write() = provider;
    }

    pub fn set_bell_provider(&self, provider: Arc<dyn BellProvider>) {
        *self.bell.write() = provider;
    }

    pub fn set_title_provider(&self, provider: Arc<dyn TitleProvider>) {
        *self.title.write() = provider;
    }

    pub fn set_apc_provider(&self, provider: Arc<dyn ApcProvider>) {
        *self.apc.write() = provider;
    }

    pub fn set_pm_provider(&self, provider: Arc<dyn PmProvider>) {
        *self.pm.write() = provider;
    }

    pub fn set_sos_provider(&self, provider: Arc<dyn SosProvider>) {
        *self.sos.write() = provider;
    }

    pub fn set_clipboard_provider(&self, provider: Arc<dyn ClipboardProvider>) {
        *self.clipboard.write() = provider;
    }

    pub fn set_recording_provider(&self, provider: Arc<dyn RecordingProvider>) {
        *self.recording.write() = provider;
    }

    pub fn set_size_provider(&self, provider: Arc<dyn SizeProvider>) {
        *self.size.write() = Some(provider);
    }

    pub fn set_shell_integration_provider(&self, provider: Arc<dyn ShellIntegrationProvider>) {
        *self.shell_integration.write() = provider;
    }

    pub fn set_notification_provider(&self, provider: Arc<dyn NotificationProvider>) {
        *self.notification.write() = provider;
    }

    /// Replace the middleware table wholesale.
    pub fn set_middleware(&self, middleware: Middleware) {
        *self.middleware.write() = middleware;
    }

    /// Merge additional middleware slots into the installed table.
    pub fn merge_middleware(&self, middleware: Middleware) {
        self.middleware.write().merge(middleware);
    }

    // --- Internal plumbing shared by the handler layer ---

    pub(crate) fn state(&self) -> &RwLock<TermState> {
        &self.state
    }

    pub(crate) fn images(&self) -> &ImageStore {
        &self.images
    }

    pub(crate) fn write_response(&self, data: &[u8]) {
        let provider = self.response.read().clone();
        provider.write(data);
    }

    pub(crate) fn write_response_str(&self, s: &str) {
        self.write_response(s.as_bytes());
    }

    /// Cell pixel geometry: the size provider when present and sane, a
    /// 10x20 fallback otherwise.
    pub(crate) fn cell_size_pixels(&self) -> (usize, usize) {
        if let Some(provider) = self.size.read().clone() {
            let (w, h) = provider.cell_size_pixels();
            if w > 0 && h > 0 {
                return (w, h);
            }
        }
        (10, 20)
    }

    pub(crate) fn bell_provider(&self) -> Arc<dyn BellProvider> {
        self.bell.read().clone()
    }

    pub(crate) fn title_provider(&self) -> Arc<dyn TitleProvider> {
        self.title.read().clone()
    }

    pub(crate) fn apc_provider(&self) -> Arc<dyn ApcProvider> {
        self.apc.read().clone()
    }

    pub(crate) fn pm_provider(&self) -> Arc<dyn PmProvider> {
        self.pm.read().clone()
    }

    pub(crate) fn sos_provider(&self) -> Arc<dyn SosProvider> {
        self.sos.read().clone()
    }

    pub(crate) fn clipboard_provider(&self) -> Arc<dyn ClipboardProvider> {
        self.clipboard.read().clone()
    }

    pub(crate) fn shell_integration_provider(&self) -> Arc<dyn ShellIntegrationProvider> {
        self.shell_integration.read().clone()
    }

    pub(crate) fn notification_provider(&self) -> Arc<dyn NotificationProvider> {
        self.notification.read().clone()
    }

    pub(crate) fn middleware_table(&self) -> &RwLock<Middleware> {
        &self.middleware
    }
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.screen_text())
    }
}

fn find_in_line(line: &[char], needle: &[char], row: isize, matches: &mut Vec<Position>) {
    if line.len() < needle.len() {
        return;
    }
    for col in 0..=line.len() - needle.len() {
        if line[col..col + needle.len()] == *needle {
            matches.push(Position { row, col });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let term = Terminal::new();
        assert_eq!(term.rows(), 24);
        assert_eq!(term.cols(), 80);
        assert_eq!(term.cursor_pos(), (0, 0));
        assert!(term.cursor_visible());
        assert!(term.has_mode(Mode::LineWrap));
        assert!(term.has_mode(Mode::ShowCursor));
        assert!(!term.is_alternate_screen());
    }

    #[test]
    fn test_zero_size_falls_back() {
        let term = Terminal::with_options(TerminalOptions::new(0, 0));
        assert_eq!(term.rows(), 24);
        assert_eq!(term.cols(), 80);
    }

    #[test]
    fn test_write_returns_consumed() {
        let term = Terminal::new();
        assert_eq!(term.write(b"hello"), 5);
        assert_eq!(term.line_content(0), "hello");
    }

    #[test]
    fn test_screen_text_trims_trailing_lines() {
        let term = Terminal::new();
        term.write_str("one\r\ntwo");
        assert_eq!(term.screen_text(), "one\ntwo");
        assert_eq!(term.to_string(), "one\ntwo");
    }

    #[test]
    fn test_search_visible() {
        let term = Terminal::new();
        term.write_str("foo bar foo");
        let matches = term.search("foo");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0], Position { row: 0, col: 0 });
        assert_eq!(matches[1], Position { row: 0, col: 8 });
        assert!(term.search("").is_empty());
    }

    #[test]
    fn test_search_scrollback_negative_rows() {
        let term = Terminal::with_options(TerminalOptions {
            rows: 3,
            cols: 20,
            scrollback: Some(Arc::new(crate::core::MemoryScrollback::new(100))),
            ..TerminalOptions::default()
        });
        for i in 0..6 {
            term.write_str(&format!("line{i}\r\n"));
        }
        let matches = term.search_scrollback("line0");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].row < 0);
        // line0 is the oldest scrollback entry
        let len = term.scrollback_len() as isize;
        assert_eq!(matches[0].row, -len);
    }

    #[test]
    fn test_selection_round_trip() {
        let term = Terminal::new();
        term.write_str("Hello World");
        term.set_selection(Position::new(0, 6), Position::new(0, 10));
        assert!(term.has_selection());
        assert!(term.is_selected(0, 8));
        assert!(!term.is_selected(0, 2));
        assert_eq!(term.selected_text(), "World");

        term.clear_selection();
        assert!(!term.has_selection());
        assert_eq!(term.selected_text(), "");
    }

    #[test]
    fn test_selection_normalizes() {
        let term = Terminal::new();
        term.write_str("abc");
        term.set_selection(Position::new(0, 2), Position::new(0, 0));
        let sel = term.selection();
        assert_eq!(sel.start.col, 0);
        assert_eq!(sel.end.col, 2);
        assert_eq!(term.selected_text(), "abc");
    }

    #[test]
    fn test_working_directory_path() {
        let term = Terminal::new();
        term.write_str("\x1b]7;file://myhost/home/user\x07");
        assert_eq!(term.working_directory(), "file://myhost/home/user");
        assert_eq!(term.working_directory_path(), "/home/user");
    }

    #[test]
    fn test_resize_ignores_zero() {
        let term = Terminal::new();
        term.resize(0, 100);
        term.resize(100, 0);
        assert_eq!(term.rows(), 24);
        assert_eq!(term.cols(), 80);
    }
}

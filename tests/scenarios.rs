//! End-to-end scenarios
//!
//! Byte-level tests: raw terminal output goes in through `write`, the
//! resulting screen model is asserted through the query surface.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;

use headless_vt::{
    BufferResponse, CellFlags, ClipboardProvider, Color, FixedSize, MemoryRecording,
    MemoryScrollback, Middleware, Mode, NamedColor, PromptMarkKind, RecordingProvider,
    SnapshotDetail, Terminal, TerminalOptions,
};

fn terminal(rows: usize, cols: usize) -> Terminal {
    Terminal::with_options(TerminalOptions::new(rows, cols))
}

#[test]
fn colored_text_and_reset() {
    let term = terminal(24, 80);
    term.write(b"\x1b[31mHello \x1b[32mWorld\x1b[0m!\r\n");

    assert_eq!(term.line_content(0), "Hello World!");
    assert_eq!(
        term.cell(0, 0).unwrap().fg,
        Color::Named(NamedColor::Red)
    );
    assert_eq!(
        term.cell(0, 6).unwrap().fg,
        Color::Named(NamedColor::Green)
    );
    assert_eq!(
        term.cell(0, 11).unwrap().fg,
        Color::Named(NamedColor::Foreground)
    );
    assert_eq!(term.cursor_pos(), (1, 0));
}

#[test]
fn alternate_screen_swap() {
    let term = terminal(24, 80);
    term.write(b"Main");
    assert!(!term.is_alternate_screen());

    term.write(b"\x1b[?1049h");
    assert!(term.is_alternate_screen());
    term.write(b"Alt");
    assert_eq!(term.line_content(0), "Alt");

    term.write(b"\x1b[?1049l");
    assert!(!term.is_alternate_screen());
    assert_eq!(term.line_content(0), "Main");
}

#[test]
fn wide_character_occupies_two_cells() {
    let term = terminal(24, 80);
    term.write("中".as_bytes());

    let base = term.cell(0, 0).unwrap();
    assert_eq!(base.ch, '中');
    assert!(base.is_wide());
    assert!(term.cell(0, 1).unwrap().is_wide_spacer());
    assert_eq!(term.cursor_pos(), (0, 2));
}

#[test]
fn scroll_into_scrollback() {
    let term = Terminal::with_options(TerminalOptions {
        rows: 5,
        cols: 80,
        scrollback: Some(Arc::new(MemoryScrollback::new(100))),
        ..TerminalOptions::default()
    });

    for _ in 0..10 {
        term.write(b"Line\r\n");
    }

    assert!(term.scrollback_len() >= 5);
    let len = term.scrollback_len();
    for i in len - 5..len {
        let cells = term.scrollback_line(i).unwrap();
        let text: String = cells
            .iter()
            .filter(|c| !c.is_wide_spacer())
            .map(|c| c.ch)
            .collect();
        assert_eq!(text.trim_end(), "Line");
    }
}

#[test]
fn dsr_cursor_position_report() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        rows: 24,
        cols: 80,
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b[3;6H");
    assert_eq!(term.cursor_pos(), (2, 5));
    term.write(b"\x1b[6n");

    assert_eq!(response.take(), b"\x1b[3;6R");
}

#[test]
fn dsr_ready_report() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });
    term.write(b"\x1b[5n");
    assert_eq!(response.take(), b"\x1b[0n");
}

#[test]
fn identify_terminal_as_vt220() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });
    term.write(b"\x1b[c");
    assert_eq!(response.take(), b"\x1b[?62;c");
}

#[derive(Default)]
struct CapturingClipboard {
    stored: Mutex<Vec<(u8, Vec<u8>)>>,
    content: Mutex<String>,
}

impl ClipboardProvider for CapturingClipboard {
    fn read(&self, _clipboard: u8) -> String {
        self.content.lock().clone()
    }

    fn write(&self, clipboard: u8, data: &[u8]) {
        self.stored.lock().push((clipboard, data.to_vec()));
    }
}

#[test]
fn osc52_clipboard_store() {
    let clipboard = Arc::new(CapturingClipboard::default());
    let term = Terminal::with_options(TerminalOptions {
        clipboard: Some(clipboard.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b]52;c;SGVsbG8=\x07");

    let stored = clipboard.stored.lock();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, b'c');
    assert_eq!(stored[0].1, b"Hello");
}

#[test]
fn osc52_clipboard_query_replies_base64() {
    let clipboard = Arc::new(CapturingClipboard::default());
    *clipboard.content.lock() = "World".to_string();
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        clipboard: Some(clipboard),
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b]52;c;?\x07");
    assert_eq!(response.take(), b"\x1b]52;c;V29ybGQ=\x07");
}

fn kitty_terminal() -> (Terminal, Arc<BufferResponse>) {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        rows: 24,
        cols: 80,
        response: Some(response.clone()),
        size: Some(Arc::new(FixedSize {
            cell_width: 10,
            cell_height: 10,
            cols: 80,
            rows: 24,
        })),
        ..TerminalOptions::default()
    });
    (term, response)
}

#[test]
fn kitty_transmit_and_display() {
    let (term, response) = kitty_terminal();

    let payload = STANDARD.encode([0xFFu8; 16]);
    term.write(format!("\x1b_Ga=T,f=32,s=2,v=2;{payload}\x1b\\").as_bytes());

    assert_eq!(term.image_count(), 1);
    assert_eq!(term.image_placement_count(), 1);
    assert!(term.cell(0, 0).unwrap().has_image());

    let replies = response.take();
    assert!(String::from_utf8_lossy(&replies).contains("OK"));
}

#[test]
fn kitty_chunked_transfer() {
    let (term, _response) = kitty_terminal();

    let encoded = STANDARD.encode([0xFFu8; 16]);
    let (first, second) = encoded.split_at(8);

    term.write(format!("\x1b_Ga=T,f=32,s=2,v=2,m=1;{first}\x1b\\").as_bytes());
    assert_eq!(term.image_count(), 0);

    term.write(format!("\x1b_Gm=0;{second}\x1b\\").as_bytes());
    assert_eq!(term.image_count(), 1);

    let placements = term.image_placements();
    let image = term.image(placements[0].image_id).unwrap();
    assert_eq!((image.width, image.height), (2, 2));
}

#[test]
fn kitty_query_and_errors() {
    let (term, response) = kitty_terminal();

    term.write(b"\x1b_Ga=q,i=7;\x1b\\");
    assert_eq!(response.take(), b"\x1b_Gi=7;OK\x1b\\");

    // Display of an unknown image reports ENOENT
    term.write(b"\x1b_Ga=p,i=99;\x1b\\");
    assert_eq!(response.take(), b"\x1b_Gi=99;ENOENT\x1b\\");

    // Quiet level 2 silences errors
    term.write(b"\x1b_Ga=p,i=99,q=2;\x1b\\");
    assert!(response.take().is_empty());
}

#[test]
fn kitty_delete_by_id_keeps_or_frees_data() {
    let (term, _response) = kitty_terminal();

    let payload = STANDARD.encode([0xABu8; 16]);
    term.write(format!("\x1b_Ga=T,f=32,s=2,v=2,i=3;{payload}\x1b\\").as_bytes());
    assert_eq!(term.image_count(), 1);
    assert_eq!(term.image_placement_count(), 1);

    term.write(b"\x1b_Ga=d,d=i,i=3;\x1b\\");
    assert_eq!(term.image_placement_count(), 0);
    assert_eq!(term.image_count(), 1);

    term.write(b"\x1b_Ga=d,d=I,i=3;\x1b\\");
    assert_eq!(term.image_count(), 0);
}

#[test]
fn alternate_screen_clears_placements_keeps_images() {
    let (term, _response) = kitty_terminal();

    let payload = STANDARD.encode([0x55u8; 16]);
    term.write(format!("\x1b_Ga=T,f=32,s=2,v=2;{payload}\x1b\\").as_bytes());
    assert_eq!(term.image_placement_count(), 1);

    term.write(b"\x1b[?1049h");
    assert_eq!(term.image_placement_count(), 0);
    assert_eq!(term.image_count(), 1);
}

#[test]
fn sixel_image_is_stored_and_placed() {
    let (term, _response) = kitty_terminal();

    // Red 10x6 bar: color 1 = 100% red, repeated full columns
    term.write(b"\x1bP0;0;0q#1;2;100;0;0#1!10~\x1b\\");

    assert_eq!(term.image_count(), 1);
    assert_eq!(term.image_placement_count(), 1);
    let image = term.image(term.image_placements()[0].image_id).unwrap();
    assert_eq!((image.width, image.height), (10, 6));
    // Cursor advanced past the one covered row
    assert_eq!(term.cursor_pos().0, 1);
}

#[test]
fn shell_integration_marks_and_output() {
    let term = terminal(24, 80);
    term.write(b"\x1b]133;A\x07$ \x1b]133;B\x07echo hi\r\n\x1b]133;C\x07hi\r\n\x1b]133;D;0\x07");

    let marks = term.prompt_marks();
    assert_eq!(marks.len(), 4);
    assert_eq!(marks[0].kind, PromptMarkKind::PromptStart);
    assert_eq!(marks[3].kind, PromptMarkKind::CommandFinished);
    assert_eq!(marks[3].exit_code, Some(0));

    assert_eq!(term.last_command_output(), "hi");
}

#[test]
fn resize_preserves_top_left() {
    let term = terminal(24, 80);
    term.write(b"Hello");
    term.resize(10, 40);

    assert_eq!(term.rows(), 10);
    assert_eq!(term.cols(), 40);
    assert_eq!(term.line_content(0), "Hello");
}

#[test]
fn resize_shrink_pushes_scrollback_and_grow_pulls_back() {
    let term = Terminal::with_options(TerminalOptions {
        rows: 10,
        cols: 80,
        scrollback: Some(Arc::new(MemoryScrollback::new(100))),
        ..TerminalOptions::default()
    });

    for i in 0..10 {
        if i < 9 {
            term.write(format!("Line{i}\r\n").as_bytes());
        } else {
            term.write(b"Line9");
        }
    }
    assert_eq!(term.cursor_pos().0, 9);

    term.resize(5, 80);
    let after_shrink = term.scrollback_len();
    assert!(after_shrink >= 5);
    assert_eq!(term.line_content(4), "Line9");

    term.resize(10, 80);
    assert!(term.scrollback_len() < after_shrink);
    let restored = (0..10).any(|row| term.line_content(row) == "Line0");
    assert!(restored, "expected Line0 restored from scrollback");
}

#[test]
fn recording_round_trip_reproduces_screen() {
    let recording = Arc::new(MemoryRecording::new());
    let a = Terminal::with_options(TerminalOptions {
        rows: 24,
        cols: 80,
        recording: Some(recording.clone()),
        ..TerminalOptions::default()
    });

    a.write(b"\x1b[2J\x1b[1;1HHeader\r\n\x1b[1;34mBlue\x1b[0m text\r\n");
    a.write("wide: 世界\r\n".as_bytes());
    a.write(b"\x1b[5;10HMoved\x1b[m\x1b[4mu\x1b[24m");

    let b = Terminal::with_options(TerminalOptions::new(24, 80));
    b.write(&recording.data());

    assert_eq!(a.screen_text(), b.screen_text());
    assert_eq!(a.cursor_pos(), b.cursor_pos());
}

#[test]
fn snapshot_text_matches_line_content() {
    let term = terminal(5, 40);
    term.write(b"one\r\ntwo\r\n\x1b[7mthree\x1b[0m");

    let snap = term.snapshot(SnapshotDetail::Text);
    for row in 0..5 {
        assert_eq!(snap.lines[row].text, term.line_content(row));
    }
    assert_eq!(snap.cursor.row, 2);
    assert_eq!(snap.cursor.col, 5);
}

#[test]
fn snapshot_styled_segments() {
    let term = terminal(5, 40);
    term.write(b"\x1b[31mred\x1b[0m plain");

    let snap = term.snapshot(SnapshotDetail::Styled);
    let segments = &snap.lines[0].segments;
    assert!(segments.len() >= 2);
    assert_eq!(segments[0].text, "red");
    assert_eq!(segments[0].fg, "#cd3131");
}

#[test]
fn snapshot_full_cells_and_json() {
    let term = terminal(3, 10);
    term.write(b"\x1b[1mB");

    let snap = term.snapshot(SnapshotDetail::Full);
    let cell = &snap.lines[0].cells[0];
    assert_eq!(cell.char, "B");
    assert!(cell.attrs.bold);

    let json = snap.to_json().unwrap();
    let restored = headless_vt::Snapshot::from_json(&json).unwrap();
    assert_eq!(restored.lines[0].cells[0].char, "B");
    assert_eq!(restored.size.rows, 3);
}

#[test]
fn middleware_can_suppress_and_rewrite() {
    let mut mw = Middleware::new();
    // Uppercase every input character, and swallow bells entirely
    mw.input = Some(Box::new(|c, next| {
        next(c.to_ascii_uppercase());
    }));
    mw.bell = Some(Box::new(|_next| {}));

    let term = Terminal::with_options(TerminalOptions {
        middleware: Some(mw),
        ..TerminalOptions::default()
    });

    term.write(b"hi\x07");
    assert_eq!(term.line_content(0), "HI");
}

#[test]
fn middleware_merge_last_writer_wins() {
    let term = Terminal::new();

    let mut first = Middleware::new();
    first.input = Some(Box::new(|_c, next| next('a')));
    term.set_middleware(first);

    let mut second = Middleware::new();
    second.input = Some(Box::new(|_c, next| next('b')));
    term.merge_middleware(second);

    term.write(b"x");
    assert_eq!(term.line_content(0), "b");
}

#[test]
fn osc1337_user_vars() {
    let term = Terminal::new();
    term.write(b"\x1b]1337;SetUserVar=SESSION=ZGFuaWVs\x07");
    assert_eq!(term.user_var("SESSION"), "daniel");

    // Invalid base64 is ignored
    term.write(b"\x1b]1337;SetUserVar=BAD=!!!\x07");
    assert_eq!(term.user_var("BAD"), "");

    assert_eq!(term.user_vars().len(), 1);
    term.clear_user_vars();
    assert!(term.user_vars().is_empty());
}

#[test]
fn osc99_notification_query_reply() {
    use headless_vt::NotificationProvider;

    struct QueryReply;
    impl NotificationProvider for QueryReply {
        fn notify(&self, payload: &headless_vt::NotificationPayload) -> String {
            if payload.payload_type == "?" {
                "\x1b]99;;\x1b\\".to_string()
            } else {
                String::new()
            }
        }
    }

    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        response: Some(response.clone()),
        notification: Some(Arc::new(QueryReply)),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b]99;p=?;\x07");
    assert_eq!(response.take(), b"\x1b]99;;\x1b\\");

    term.write(b"\x1b]99;i=1;Hello\x07");
    assert!(response.take().is_empty());
}

#[test]
fn mode_set_and_reset() {
    let term = Terminal::new();
    assert!(term.has_mode(Mode::LineWrap));

    term.write(b"\x1b[?7l");
    assert!(!term.has_mode(Mode::LineWrap));
    term.write(b"\x1b[?7h");
    assert!(term.has_mode(Mode::LineWrap));

    term.write(b"\x1b[4h");
    assert!(term.has_mode(Mode::Insert));
    term.write(b"\x1b[4l");
    assert!(!term.has_mode(Mode::Insert));

    term.write(b"\x1b[?25l");
    assert!(!term.cursor_visible());
    term.write(b"\x1b[?25h");
    assert!(term.cursor_visible());

    // Unknown modes are ignored without effect
    term.write(b"\x1b[?12345h");
}

#[test]
fn scroll_region_bounds_scrolling() {
    let term = terminal(10, 20);
    for i in 0..10 {
        term.write(format!("\x1b[{};1Hrow{i}", i + 1).as_bytes());
    }

    term.write(b"\x1b[3;6r"); // region rows 2..6 (0-based)
    assert_eq!(term.scroll_region(), (2, 6));
    term.write(b"\x1b[S"); // scroll region up once

    assert_eq!(term.line_content(0), "row0");
    assert_eq!(term.line_content(2), "row3");
    assert_eq!(term.line_content(5), "");
    assert_eq!(term.line_content(6), "row6");
}

#[test]
fn tabs_and_tab_stops() {
    let term = terminal(5, 40);
    term.write(b"\tX");
    assert_eq!(term.cell(0, 8).unwrap().ch, 'X');

    // Clear all stops, set a custom one at column 20
    term.write(b"\x1b[3g");
    term.write(b"\x1b[1;21H\x1bH\x1b[1;1H");
    term.write(b"\tY");
    assert_eq!(term.cell(0, 20).unwrap().ch, 'Y');
}

#[test]
fn decaln_fills_screen() {
    let term = terminal(3, 5);
    term.write(b"\x1b#8");
    for row in 0..3 {
        assert_eq!(term.line_content(row), "EEEEE");
    }
}

#[test]
fn line_drawing_charset() {
    let term = terminal(5, 40);
    term.write(b"\x1b(0qqq\x1b(Bq");
    assert_eq!(term.line_content(0), "───q");
}

#[test]
fn hyperlinked_text() {
    let term = terminal(5, 80);
    term.write(b"\x1b]8;;https://example.com\x07link\x1b]8;;\x07plain");

    let cell = term.cell(0, 0).unwrap();
    let link = cell.hyperlink.as_ref().unwrap();
    assert_eq!(link.uri, "https://example.com");
    assert!(term.cell(0, 4).unwrap().hyperlink.is_none());
}

#[test]
fn dirty_tracking_sweep() {
    let term = terminal(5, 20);
    term.write(b"ab");
    assert!(term.has_dirty());
    assert!(!term.dirty_cells().is_empty());

    term.clear_dirty();
    assert!(!term.has_dirty());
    assert!(term.dirty_cells().is_empty());

    term.write(b"c");
    assert!(term.has_dirty());
}

#[test]
fn wrapped_line_tracking() {
    let term = terminal(5, 10);
    term.write(b"0123456789abc");
    assert!(term.is_wrapped(0));
    assert!(!term.is_wrapped(1));
    assert_eq!(term.line_content(1), "abc");

    let term = terminal(5, 10);
    term.write(b"short\r\nnext");
    assert!(!term.is_wrapped(0));
}

#[test]
fn title_stack() {
    let term = Terminal::new();
    term.write(b"\x1b]2;first\x07");
    assert_eq!(term.title(), "first");

    term.write(b"\x1b[22t");
    term.write(b"\x1b]2;second\x07");
    assert_eq!(term.title(), "second");

    term.write(b"\x1b[23t");
    assert_eq!(term.title(), "first");
}

#[test]
fn keyboard_mode_stack_and_report() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b[>1u"); // push flags=1
    term.write(b"\x1b[=2;2u"); // union flags=2 into top
    term.write(b"\x1b[?u");
    assert_eq!(response.take(), b"\x1b[?3u");

    term.write(b"\x1b[<1u"); // pop
    term.write(b"\x1b[?u");
    assert_eq!(response.take(), b"\x1b[?0u");
}

#[test]
fn concurrent_writers_and_readers() {
    let term = Arc::new(terminal(24, 80));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let term = term.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                term.write(b"abc\x1b[31mdef\x1b[0m\r\n");
            }
        }));
    }
    for _ in 0..2 {
        let term = term.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                let _ = term.screen_text();
                let _ = term.cursor_pos();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn reset_state_clears_screen_and_images() {
    let (term, _response) = kitty_terminal();
    let payload = STANDARD.encode([0x11u8; 16]);
    term.write(format!("\x1b_Ga=T,f=32,s=2,v=2;{payload}\x1b\\").as_bytes());
    term.write(b"text\x1b[31m");
    assert_eq!(term.image_count(), 1);

    term.write(b"\x1bc");
    assert_eq!(term.line_content(0), "");
    assert_eq!(term.image_count(), 0);
    assert_eq!(term.image_placement_count(), 0);
    assert_eq!(term.cursor_pos(), (0, 0));
    // Template was reset: new text takes default colors
    term.write(b"x");
    assert_eq!(
        term.cell(0, 0).unwrap().fg,
        Color::Named(NamedColor::Foreground)
    );
}

#[test]
fn insert_and_delete_editing() {
    let term = terminal(5, 20);
    term.write(b"abcdef\x1b[1;1H\x1b[2@");
    assert_eq!(term.line_content(0), "  abcdef");

    term.write(b"\x1b[3P");
    assert_eq!(term.line_content(0), "bcdef");

    term.write(b"\x1b[2X");
    assert_eq!(term.line_content(0), "  def");
}

#[test]
fn erase_in_line_variants() {
    let term = terminal(3, 10);
    term.write(b"ABCDEFGHIJ\x1b[1;5H\x1b[K");
    assert_eq!(term.line_content(0), "ABCD");

    let term = terminal(3, 10);
    term.write(b"ABCDEFGHIJ\x1b[1;5H\x1b[1K");
    assert_eq!(term.line_content(0), "     FGHIJ");

    let term = terminal(3, 10);
    term.write(b"ABCDEFGHIJ\x1b[2K");
    assert_eq!(term.line_content(0), "");
}

#[test]
fn underline_styles_are_exclusive() {
    let term = terminal(3, 20);
    term.write(b"\x1b[4ma\x1b[4:3mb\x1b[21mc");

    assert!(term.cell(0, 0).unwrap().has_flag(CellFlags::UNDERLINE));
    let b = term.cell(0, 1).unwrap();
    assert!(b.has_flag(CellFlags::CURLY_UNDERLINE));
    assert!(!b.has_flag(CellFlags::UNDERLINE));
    let c = term.cell(0, 2).unwrap();
    assert!(c.has_flag(CellFlags::DOUBLE_UNDERLINE));
    assert!(!c.has_flag(CellFlags::CURLY_UNDERLINE));
}

#[test]
fn cursor_style_changes() {
    use headless_vt::CursorStyle;

    let term = Terminal::new();
    assert_eq!(term.cursor_style(), CursorStyle::BlinkingBlock);
    term.write(b"\x1b[6 q");
    assert_eq!(term.cursor_style(), CursorStyle::SteadyBar);
    term.write(b"\x1b[0 q");
    assert_eq!(term.cursor_style(), CursorStyle::BlinkingBlock);
}

#[test]
fn dynamic_color_query() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b]10;?\x07");
    assert_eq!(response.take(), b"\x1b]10;rgb:e5/e5/e5\x07");

    // Redefine, query again with ST terminator
    term.write(b"\x1b]10;rgb:12/34/56\x07");
    term.write(b"\x1b]10;?\x1b\\");
    assert_eq!(response.take(), b"\x1b]10;rgb:12/34/56\x1b\\");
}

#[test]
fn origin_mode_positions_relative_to_region() {
    let term = terminal(24, 80);
    term.write(b"\x1b[5;20r\x1b[?6h");
    assert_eq!(term.cursor_pos(), (4, 0));

    term.write(b"\x1b[3;4H");
    assert_eq!(term.cursor_pos(), (6, 3));
}

#[test]
fn text_area_reports() {
    let response = Arc::new(BufferResponse::new());
    let term = Terminal::with_options(TerminalOptions {
        rows: 24,
        cols: 80,
        response: Some(response.clone()),
        ..TerminalOptions::default()
    });

    term.write(b"\x1b[18t");
    assert_eq!(response.take(), b"\x1b[8;24;80t");

    // Without a size provider the 10x20 cell default applies
    term.write(b"\x1b[14t");
    assert_eq!(response.take(), b"\x1b[4;480;800t");
    term.write(b"\x1b[16t");
    assert_eq!(response.take(), b"\x1b[6;20;10t");
}

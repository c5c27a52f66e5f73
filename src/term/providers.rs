//! Provider interfaces
//!
//! External collaborators the terminal calls out to: response bytes, bell,
//! title, clipboard, string-command catch-alls, recording, pixel sizes,
//! shell integration, and desktop notifications. Every provider has a no-op
//! default so the terminal works standalone.
//!
//! Providers may be invoked while internal locks are held; implementations
//! must not call back into the `Terminal`.

use parking_lot::Mutex;

use super::shell::PromptMarkKind;

/// Sink for terminal responses (cursor position reports, graphics ACKs,
/// OSC query replies). Typically connected to the PTY input.
pub trait ResponseProvider: Send + Sync {
    fn write(&self, data: &[u8]);
}

/// Discards all responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResponse;

impl ResponseProvider for NoopResponse {
    fn write(&self, _data: &[u8]) {}
}

/// Response sink that appends to an internal buffer. Useful in tests and
/// for polling replies out-of-band.
#[derive(Debug, Default)]
pub struct BufferResponse {
    data: Mutex<Vec<u8>>,
}

impl BufferResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.data.lock())
    }

    /// Copy of everything written so far.
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl ResponseProvider for BufferResponse {
    fn write(&self, data: &[u8]) {
        self.data.lock().extend_from_slice(data);
    }
}

/// Handles BEL (0x07).
pub trait BellProvider: Send + Sync {
    fn ring(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBell;

impl BellProvider for NoopBell {
    fn ring(&self) {}
}

/// Handles window title changes (OSC 0/1/2) and the title stack
/// (CSI 22/23 t).
pub trait TitleProvider: Send + Sync {
    fn set_title(&self, title: &str);
    fn push_title(&self);
    fn pop_title(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTitle;

impl TitleProvider for NoopTitle {
    fn set_title(&self, _title: &str) {}
    fn push_title(&self) {}
    fn pop_title(&self) {}
}

/// Receives APC payloads that are not Kitty graphics commands.
pub trait ApcProvider: Send + Sync {
    fn receive(&self, data: &[u8]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopApc;

impl ApcProvider for NoopApc {
    fn receive(&self, _data: &[u8]) {}
}

/// Receives Privacy Message payloads.
pub trait PmProvider: Send + Sync {
    fn receive(&self, data: &[u8]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPm;

impl PmProvider for NoopPm {
    fn receive(&self, _data: &[u8]) {}
}

/// Receives Start-of-String payloads.
pub trait SosProvider: Send + Sync {
    fn receive(&self, data: &[u8]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSos;

impl SosProvider for NoopSos {
    fn receive(&self, _data: &[u8]) {}
}

/// Clipboard access for OSC 52. `clipboard` selects the target: `c` for
/// the clipboard, `p` for the primary selection.
pub trait ClipboardProvider: Send + Sync {
    /// Content of the clipboard, empty when unavailable.
    fn read(&self, clipboard: u8) -> String;
    /// Store content to the clipboard.
    fn write(&self, clipboard: u8, data: &[u8]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClipboard;

impl ClipboardProvider for NoopClipboard {
    fn read(&self, _clipboard: u8) -> String {
        String::new()
    }
    fn write(&self, _clipboard: u8, _data: &[u8]) {}
}

/// Captures raw input bytes before decoding, for replay and regression
/// testing.
pub trait RecordingProvider: Send + Sync {
    fn record(&self, data: &[u8]);
    /// All bytes captured since the last `clear`.
    fn data(&self) -> Vec<u8>;
    fn clear(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecording;

impl RecordingProvider for NoopRecording {
    fn record(&self, _data: &[u8]) {}
    fn data(&self) -> Vec<u8> {
        Vec::new()
    }
    fn clear(&self) {}
}

/// In-memory recording of the raw input stream.
#[derive(Debug, Default)]
pub struct MemoryRecording {
    data: Mutex<Vec<u8>>,
}

impl MemoryRecording {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordingProvider for MemoryRecording {
    fn record(&self, data: &[u8]) {
        self.data.lock().extend_from_slice(data);
    }

    fn data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    fn clear(&self) {
        self.data.lock().clear();
    }
}

/// Pixel dimensions for size reports and image cell coverage.
pub trait SizeProvider: Send + Sync {
    /// Window size in pixels (width, height).
    fn window_size_pixels(&self) -> (usize, usize);
    /// Cell size in pixels (width, height).
    fn cell_size_pixels(&self) -> (usize, usize);
}

/// Fixed cell geometry; window size derives from the cell size at
/// construction-time dimensions.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize {
    pub cell_width: usize,
    pub cell_height: usize,
    pub cols: usize,
    pub rows: usize,
}

impl SizeProvider for FixedSize {
    fn window_size_pixels(&self) -> (usize, usize) {
        (self.cols * self.cell_width, self.rows * self.cell_height)
    }

    fn cell_size_pixels(&self) -> (usize, usize) {
        (self.cell_width, self.cell_height)
    }
}

/// Callback for shell integration marks (OSC 133).
pub trait ShellIntegrationProvider: Send + Sync {
    fn on_mark(&self, mark: PromptMarkKind, exit_code: Option<i32>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopShellIntegration;

impl ShellIntegrationProvider for NoopShellIntegration {
    fn on_mark(&self, _mark: PromptMarkKind, _exit_code: Option<i32>) {}
}

/// A desktop notification request (OSC 99).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPayload {
    /// The `i=` metadata key, empty when absent.
    pub id: String,
    /// The `p=` metadata key; `?` marks a capability query.
    pub payload_type: String,
    /// Payload bytes after the second `;`.
    pub data: Vec<u8>,
    /// False while `d=0` announces more payload chunks.
    pub done: bool,
}

/// Handles desktop notifications. A non-empty return value is written to
/// the response sink (used to answer `p=?` queries).
pub trait NotificationProvider: Send + Sync {
    fn notify(&self, payload: &NotificationPayload) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotification;

impl NotificationProvider for NoopNotification {
    fn notify(&self, _payload: &NotificationPayload) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_recording() {
        let rec = MemoryRecording::new();
        rec.record(b"abc");
        rec.record(b"def");
        assert_eq!(rec.data(), b"abcdef");
        rec.clear();
        assert!(rec.data().is_empty());
    }

    #[test]
    fn test_buffer_response_take() {
        let resp = BufferResponse::new();
        resp.write(b"\x1b[0n");
        assert_eq!(resp.data(), b"\x1b[0n");
        assert_eq!(resp.take(), b"\x1b[0n");
        assert!(resp.data().is_empty());
    }

    #[test]
    fn test_fixed_size() {
        let size = FixedSize {
            cell_width: 10,
            cell_height: 20,
            cols: 80,
            rows: 24,
        };
        assert_eq!(size.cell_size_pixels(), (10, 20));
        assert_eq!(size.window_size_pixels(), (800, 480));
    }

    #[test]
    fn test_noop_providers() {
        NoopBell.ring();
        NoopTitle.set_title("x");
        NoopApc.receive(b"data");
        assert_eq!(NoopClipboard.read(b'c'), "");
        assert!(NoopRecording.data().is_empty());
        assert_eq!(
            NoopNotification.notify(&NotificationPayload::default()),
            ""
        );
    }
}

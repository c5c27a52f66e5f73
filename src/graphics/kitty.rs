//! Kitty graphics protocol
//!
//! Parses the control data of APC `G` sequences (`key=value,...;payload`)
//! and decodes image payloads. Payloads arrive base64-encoded, optionally
//! zlib-compressed, in raw RGB/RGBA or PNG form; everything is normalized to
//! RGBA for storage.

use std::io::Read;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use thiserror::Error;

/// Errors produced while decoding graphics payloads.
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("invalid base64 payload")]
    Base64,
    #[error("zlib inflate failed: {0}")]
    Zlib(#[from] std::io::Error),
    #[error("png decode failed: {0}")]
    Png(String),
    #[error("missing image dimensions")]
    MissingDimensions,
    #[error("payload too short: expected {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },
    #[error("unsupported image format {0}")]
    UnsupportedFormat(u32),
}

/// The action requested by a graphics command (`a=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KittyAction {
    /// Transmit image data only.
    Transmit,
    /// Transmit and display immediately (default).
    #[default]
    TransmitAndDisplay,
    /// Query protocol support.
    Query,
    /// Display a previously transmitted image.
    Display,
    /// Delete images or placements.
    Delete,
    /// Animation frame transmission (acknowledged, not stored).
    Frame,
    /// Animation control (acknowledged, not stored).
    Animate,
    /// Animation composition (acknowledged, not stored).
    Compose,
}

impl KittyAction {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b't' => Self::Transmit,
            b'T' => Self::TransmitAndDisplay,
            b'q' => Self::Query,
            b'p' => Self::Display,
            b'd' => Self::Delete,
            b'f' => Self::Frame,
            b'a' => Self::Animate,
            b'c' => Self::Compose,
            _ => Self::TransmitAndDisplay,
        }
    }
}

/// Payload format (`f=`): 24 = RGB, 32 = RGBA, 100 = PNG.
pub const KITTY_FORMAT_RGB: u32 = 24;
pub const KITTY_FORMAT_RGBA: u32 = 32;
pub const KITTY_FORMAT_PNG: u32 = 100;

/// What a delete command (`d=`) targets. Uppercase variants also free
/// image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KittyDelete {
    /// All visible placements.
    #[default]
    All,
    AllWithData,
    /// Placements of a specific image ID.
    ById,
    ByIdWithData,
    /// Placements intersecting the cursor position.
    AtCursor,
    AtCursorWithData,
    /// Placements intersecting the cursor's column.
    ByColumn,
    ByColumnWithData,
    /// Placements intersecting the cursor's row.
    ByRow,
    ByRowWithData,
    /// Placements with a specific z-index.
    ByZIndex,
    ByZIndexWithData,
}

impl KittyDelete {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'a' => Self::All,
            b'A' => Self::AllWithData,
            b'i' => Self::ById,
            b'I' => Self::ByIdWithData,
            b'c' => Self::AtCursor,
            b'C' => Self::AtCursorWithData,
            b'x' => Self::ByColumn,
            b'X' => Self::ByColumnWithData,
            b'y' => Self::ByRow,
            b'Y' => Self::ByRowWithData,
            b'z' => Self::ByZIndex,
            b'Z' => Self::ByZIndexWithData,
            _ => Self::All,
        }
    }
}

/// A parsed Kitty graphics command.
#[derive(Debug, Clone, Default)]
pub struct KittyCommand {
    pub action: KittyAction,
    /// Format value from `f=` (24, 32, or 100). Defaults to RGBA.
    pub format: u32,
    /// Compression flag from `o=` (`z` for zlib, 0 for none).
    pub compression: u8,

    /// Image ID (`i=`), 0 when unassigned.
    pub image_id: u32,
    /// Image number (`I=`), parsed but unused.
    pub image_number: u32,
    /// Placement ID (`p=`), parsed but unused.
    pub placement_id: u32,

    /// Pixel dimensions of raw payloads (`s=`, `v=`).
    pub width: u32,
    pub height: u32,
    /// More chunks follow (`m=1`).
    pub more: bool,

    /// Source crop region (`x=`, `y=`, `w=`, `h=`).
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    /// Target cell coverage (`c=`, `r=`).
    pub cols: u32,
    pub rows: u32,
    /// Sub-cell pixel offsets (`X=`, `Y=`).
    pub cell_offset_x: u32,
    pub cell_offset_y: u32,
    /// Layering (`z=`).
    pub z_index: i32,
    /// `C=1` keeps the cursor in place after display.
    pub do_not_move_cursor: bool,

    pub delete: KittyDelete,

    /// Response verbosity (`q=`): 0 normal, 1 suppress OK, 2 suppress all.
    pub quiet: u32,

    /// Base64-decoded payload.
    pub payload: Vec<u8>,
}

impl KittyCommand {
    fn new() -> Self {
        Self {
            format: KITTY_FORMAT_RGBA,
            ..Self::default()
        }
    }

    /// Parse an APC `G` sequence body: control data, `;`, base64 payload.
    pub fn parse(data: &[u8]) -> Result<Self, GraphicsError> {
        let mut cmd = Self::new();

        let data = match data.first() {
            Some(&b'G') => &data[1..],
            _ => data,
        };

        let (control, payload) = match data.iter().position(|&b| b == b';') {
            Some(i) => (&data[..i], &data[i + 1..]),
            None => (data, &data[..0]),
        };

        for pair in control.split(|&b| b == b',') {
            let Some(eq) = pair.iter().position(|&b| b == b'=') else {
                continue;
            };
            if eq == 0 {
                continue;
            }
            let key = pair[0];
            let value = &pair[eq + 1..];

            match key {
                b'a' => {
                    if let Some(&b) = value.first() {
                        cmd.action = KittyAction::from_byte(b);
                    }
                }
                b't' => {
                    // Transmission medium: only direct (inline) payloads are
                    // supported; file/shm values are parsed and ignored.
                }
                b'f' => cmd.format = parse_u32(value),
                b'o' => {
                    if let Some(&b) = value.first() {
                        cmd.compression = b;
                    }
                }
                b'i' => cmd.image_id = parse_u32(value),
                b'I' => cmd.image_number = parse_u32(value),
                b'p' => cmd.placement_id = parse_u32(value),
                b's' => cmd.width = parse_u32(value),
                b'v' => cmd.height = parse_u32(value),
                b'm' => cmd.more = parse_u32(value) == 1,
                b'x' => cmd.src_x = parse_u32(value),
                b'y' => cmd.src_y = parse_u32(value),
                b'w' => cmd.src_w = parse_u32(value),
                b'h' => cmd.src_h = parse_u32(value),
                b'c' => cmd.cols = parse_u32(value),
                b'r' => cmd.rows = parse_u32(value),
                b'X' => cmd.cell_offset_x = parse_u32(value),
                b'Y' => cmd.cell_offset_y = parse_u32(value),
                b'z' => cmd.z_index = parse_i32(value),
                b'C' => cmd.do_not_move_cursor = parse_u32(value) == 1,
                b'd' => {
                    if let Some(&b) = value.first() {
                        cmd.delete = KittyDelete::from_byte(b);
                    }
                }
                b'q' => cmd.quiet = parse_u32(value),
                _ => {}
            }
        }

        if !payload.is_empty() {
            cmd.payload = decode_base64(payload)?;
        }

        Ok(cmd)
    }

    /// Decode the payload to RGBA pixels based on format and compression.
    /// Returns (rgba, width, height).
    pub fn decode_image_data(&self) -> Result<(Vec<u8>, u32, u32), GraphicsError> {
        decode_payload(&self.payload, self.format, self.compression, self.width, self.height)
    }
}

/// Decode a (possibly compressed) payload to RGBA pixels.
pub fn decode_payload(
    payload: &[u8],
    format: u32,
    compression: u8,
    width: u32,
    height: u32,
) -> Result<(Vec<u8>, u32, u32), GraphicsError> {
    let mut data = std::borrow::Cow::Borrowed(payload);

    if compression == b'z' && !data.is_empty() {
        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(&data[..]).read_to_end(&mut inflated)?;
        data = std::borrow::Cow::Owned(inflated);
    }

    match format {
        KITTY_FORMAT_PNG => decode_png(&data),
        KITTY_FORMAT_RGB => {
            if width == 0 || height == 0 {
                return Err(GraphicsError::MissingDimensions);
            }
            let pixels = width as usize * height as usize;
            let expected = pixels * 3;
            if data.len() < expected {
                return Err(GraphicsError::TooShort { expected, got: data.len() });
            }
            let mut rgba = Vec::with_capacity(pixels * 4);
            for chunk in data[..expected].chunks_exact(3) {
                rgba.extend_from_slice(chunk);
                rgba.push(255);
            }
            Ok((rgba, width, height))
        }
        KITTY_FORMAT_RGBA => {
            if width == 0 || height == 0 {
                return Err(GraphicsError::MissingDimensions);
            }
            let expected = width as usize * height as usize * 4;
            if data.len() < expected {
                return Err(GraphicsError::TooShort { expected, got: data.len() });
            }
            Ok((data[..expected].to_vec(), width, height))
        }
        other => Err(GraphicsError::UnsupportedFormat(other)),
    }
}

/// Decode PNG data to RGBA pixels. Returns (rgba, width, height).
fn decode_png(data: &[u8]) -> Result<(Vec<u8>, u32, u32), GraphicsError> {
    let mut decoder = png::Decoder::new(std::io::Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| GraphicsError::Png(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| GraphicsError::Png(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => {
            let mut rgba = Vec::with_capacity(buf.len() / 3 * 4);
            for chunk in buf.chunks_exact(3) {
                rgba.extend_from_slice(chunk);
                rgba.push(255);
            }
            rgba
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgba = Vec::with_capacity(buf.len() * 2);
            for chunk in buf.chunks_exact(2) {
                rgba.extend_from_slice(&[chunk[0], chunk[0], chunk[0], chunk[1]]);
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = Vec::with_capacity(buf.len() * 4);
            for &gray in &buf {
                rgba.extend_from_slice(&[gray, gray, gray, 255]);
            }
            rgba
        }
        other => return Err(GraphicsError::Png(format!("unexpected color type {other:?}"))),
    };

    Ok((rgba, info.width, info.height))
}

fn decode_base64(payload: &[u8]) -> Result<Vec<u8>, GraphicsError> {
    STANDARD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|_| GraphicsError::Base64)
}

fn parse_u32(value: &[u8]) -> u32 {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn parse_i32(value: &[u8]) -> i32 {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Format a graphics response: `ESC _ G [i=<id>] ; <OK|error> ESC \`.
pub fn format_response(image_id: u32, message: &str, is_error: bool) -> String {
    let mut out = String::from("\x1b_G");
    if image_id > 0 {
        out.push_str(&format!("i={image_id}"));
    }
    out.push(';');
    out.push_str(if is_error { message } else { "OK" });
    out.push_str("\x1b\\");
    out
}

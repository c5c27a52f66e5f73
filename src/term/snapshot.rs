//! Snapshots
//!
//! Read-only structured captures of the display at three detail levels:
//! plain text per line, styled segments (runs of identical style), or full
//! cell-by-cell data. Snapshots serialize to JSON for golden tests and
//! out-of-process consumers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::core::cell::{Cell, CellFlags};
use crate::graphics::ImageStore;

use super::state::TermState;

/// How much detail a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotDetail {
    /// Line text only.
    Text,
    /// Text plus styled segments per line.
    Styled,
    /// Full cell-by-cell data.
    Full,
}

/// A complete capture of the visible screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub size: SnapshotSize,
    pub cursor: SnapshotCursor,
    pub lines: Vec<SnapshotLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<SnapshotImage>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SnapshotSize {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCursor {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
    pub style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SnapshotSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<SnapshotCell>,
}

/// A run of characters sharing one style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSegment {
    pub text: String,
    pub fg: String,
    pub bg: String,
    #[serde(default)]
    pub attrs: SnapshotAttrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<SnapshotLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCell {
    pub char: String,
    pub fg: String,
    pub bg: String,
    #[serde(default)]
    pub attrs: SnapshotAttrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<SnapshotLink>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wide: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wide_spacer: bool,
}

/// Boolean style attributes. Underline and blink collapse their variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAttrs {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dim: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLink {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub uri: String,
}

/// Image placement metadata included in snapshots (no pixel data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub id: u32,
    pub placement_id: u32,
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub z_index: i32,
}

/// Full image export: base64-encoded RGBA pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSnapshot {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    /// Always `"rgba"`.
    pub format: String,
    /// Base64-encoded pixel data.
    pub data: String,
}

impl ImageSnapshot {
    pub(crate) fn from_store(images: &ImageStore, id: u32) -> Option<Self> {
        let img = images.image(id)?;
        Some(Self {
            id: img.id,
            width: img.width,
            height: img.height,
            format: "rgba".to_string(),
            data: STANDARD.encode(&img.data),
        })
    }
}

impl Snapshot {
    pub(crate) fn capture(st: &TermState, images: &ImageStore, detail: SnapshotDetail) -> Self {
        let lines = (0..st.rows).map(|row| snapshot_line(st, row, detail)).collect();

        Self {
            size: SnapshotSize {
                rows: st.rows,
                cols: st.cols,
            },
            cursor: SnapshotCursor {
                row: st.cursor.row,
                col: st.cursor.col,
                visible: st.cursor.visible,
                style: st.cursor.style.as_str().to_string(),
            },
            lines,
            images: snapshot_images(images),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Screen text: line texts joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn snapshot_images(images: &ImageStore) -> Vec<SnapshotImage> {
    let mut out = Vec::new();
    for p in images.placements() {
        let Some((width, height)) = images.image_size(p.image_id) else {
            continue;
        };
        out.push(SnapshotImage {
            id: p.image_id,
            placement_id: p.id,
            row: p.row,
            col: p.col,
            rows: p.rows,
            cols: p.cols,
            pixel_width: width,
            pixel_height: height,
            z_index: p.z_index,
        });
    }
    out.sort_by_key(|img| img.placement_id);
    out
}

fn snapshot_line(st: &TermState, row: usize, detail: SnapshotDetail) -> SnapshotLine {
    let mut line = SnapshotLine {
        text: st.active().line_content(row),
        segments: Vec::new(),
        cells: Vec::new(),
    };

    match detail {
        SnapshotDetail::Text => {}
        SnapshotDetail::Styled => line.segments = line_segments(st, row),
        SnapshotDetail::Full => line.cells = line_cells(st, row),
    }

    line
}

fn line_segments(st: &TermState, row: usize) -> Vec<SnapshotSegment> {
    let mut segments: Vec<SnapshotSegment> = Vec::new();
    let mut current: Option<SnapshotSegment> = None;
    let mut chars = String::new();

    for col in 0..st.cols {
        let Some(cell) = st.active().cell(row, col) else {
            continue;
        };
        if cell.is_wide_spacer() {
            continue;
        }

        let fg = cell.fg.resolve(true).to_hex();
        let bg = cell.bg.resolve(false).to_hex();
        let attrs = cell_attrs(cell);
        let link = cell_link(cell);

        let matches = current.as_ref().is_some_and(|seg| {
            seg.fg == fg && seg.bg == bg && seg.attrs == attrs && seg.hyperlink == link
        });

        if !matches {
            if let Some(mut seg) = current.take() {
                if !chars.is_empty() {
                    seg.text = std::mem::take(&mut chars);
                    segments.push(seg);
                }
            }
            chars.clear();
            current = Some(SnapshotSegment {
                text: String::new(),
                fg,
                bg,
                attrs,
                hyperlink: link,
            });
        }

        chars.push(if cell.ch == '\0' { ' ' } else { cell.ch });
    }

    if let Some(mut seg) = current {
        if !chars.is_empty() {
            seg.text = chars;
            segments.push(seg);
        }
    }

    segments
}

fn line_cells(st: &TermState, row: usize) -> Vec<SnapshotCell> {
    let mut cells = Vec::with_capacity(st.cols);
    for col in 0..st.cols {
        let Some(cell) = st.active().cell(row, col) else {
            cells.push(SnapshotCell {
                char: " ".to_string(),
                fg: crate::core::color::DEFAULT_FOREGROUND.to_hex(),
                bg: crate::core::color::DEFAULT_BACKGROUND.to_hex(),
                attrs: SnapshotAttrs::default(),
                hyperlink: None,
                wide: false,
                wide_spacer: false,
            });
            continue;
        };

        let ch = if cell.ch == '\0' { ' ' } else { cell.ch };
        cells.push(SnapshotCell {
            char: ch.to_string(),
            fg: cell.fg.resolve(true).to_hex(),
            bg: cell.bg.resolve(false).to_hex(),
            attrs: cell_attrs(cell),
            hyperlink: cell_link(cell),
            wide: cell.is_wide(),
            wide_spacer: cell.is_wide_spacer(),
        });
    }
    cells
}

fn cell_attrs(cell: &Cell) -> SnapshotAttrs {
    SnapshotAttrs {
        bold: cell.has_flag(CellFlags::BOLD),
        dim: cell.has_flag(CellFlags::DIM),
        italic: cell.has_flag(CellFlags::ITALIC),
        underline: cell.has_flag(CellFlags::ANY_UNDERLINE),
        blink: cell.has_flag(CellFlags::ANY_BLINK),
        reverse: cell.has_flag(CellFlags::REVERSE),
        hidden: cell.has_flag(CellFlags::HIDDEN),
        strikethrough: cell.has_flag(CellFlags::STRIKE),
    }
}

fn cell_link(cell: &Cell) -> Option<SnapshotLink> {
    cell.hyperlink.as_ref().map(|link| SnapshotLink {
        id: link.id.clone(),
        uri: link.uri.clone(),
    })
}

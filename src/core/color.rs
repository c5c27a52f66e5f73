//! Terminal colors
//!
//! Cells reference colors symbolically: a palette index, a semantic name
//! (default foreground, cursor, ...), or a literal RGBA value. Resolution to
//! concrete RGBA happens at query/snapshot time against the default 256-color
//! palette, so palette redefinitions never require touching the grid.

use serde::{Deserialize, Serialize};

/// A concrete 8-bit-per-channel RGBA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Hex representation without alpha, e.g. `#cd3131`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn dimmed(self) -> Self {
        Self {
            r: (f64::from(self.r) * 0.66) as u8,
            g: (f64::from(self.g) * 0.66) as u8,
            b: (f64::from(self.b) * 0.66) as u8,
            a: 255,
        }
    }
}

/// Default foreground text color (light gray).
pub const DEFAULT_FOREGROUND: Rgba = Rgba::opaque(229, 229, 229);

/// Default background color (black).
pub const DEFAULT_BACKGROUND: Rgba = Rgba::opaque(0, 0, 0);

/// Default cursor rendering color (light gray).
pub const DEFAULT_CURSOR: Rgba = Rgba::opaque(229, 229, 229);

/// Semantic color names that resolve against the palette and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    Foreground,
    Background,
    Cursor,
    DimBlack,
    DimRed,
    DimGreen,
    DimYellow,
    DimBlue,
    DimMagenta,
    DimCyan,
    DimWhite,
    BrightForeground,
    DimForeground,
}

impl NamedColor {
    /// Map an ANSI color index (0-15) to its named variant.
    pub fn from_index(index: u8) -> Option<Self> {
        use NamedColor::*;
        const ANSI: [NamedColor; 16] = [
            Black,
            Red,
            Green,
            Yellow,
            Blue,
            Magenta,
            Cyan,
            White,
            BrightBlack,
            BrightRed,
            BrightGreen,
            BrightYellow,
            BrightBlue,
            BrightMagenta,
            BrightCyan,
            BrightWhite,
        ];
        ANSI.get(index as usize).copied()
    }

    /// Palette index for the 16 ANSI variants, `None` for semantic ones.
    pub fn palette_index(self) -> Option<usize> {
        use NamedColor::*;
        match self {
            Black => Some(0),
            Red => Some(1),
            Green => Some(2),
            Yellow => Some(3),
            Blue => Some(4),
            Magenta => Some(5),
            Cyan => Some(6),
            White => Some(7),
            BrightBlack => Some(8),
            BrightRed => Some(9),
            BrightGreen => Some(10),
            BrightYellow => Some(11),
            BrightBlue => Some(12),
            BrightMagenta => Some(13),
            BrightCyan => Some(14),
            BrightWhite => Some(15),
            _ => None,
        }
    }
}

/// Color representation stored in cells and the SGR template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// A semantic color (ANSI 0-15 or a default-role color).
    Named(NamedColor),
    /// Index into the 256-color palette.
    Indexed(u8),
    /// Literal RGBA value.
    Rgb(Rgba),
}

impl Color {
    /// Resolve to concrete RGBA using the default palette.
    ///
    /// `fg` selects the fallback role for out-of-range values.
    pub fn resolve(self, fg: bool) -> Rgba {
        match self {
            Color::Rgb(rgba) => rgba,
            Color::Indexed(i) => default_palette()[i as usize],
            Color::Named(name) => resolve_named(name, fg),
        }
    }
}

/// Resolve an optional color, falling back to the default fg/bg role.
pub fn resolve_color(c: Option<Color>, fg: bool) -> Rgba {
    match c {
        Some(c) => c.resolve(fg),
        None => {
            if fg {
                DEFAULT_FOREGROUND
            } else {
                DEFAULT_BACKGROUND
            }
        }
    }
}

fn resolve_named(name: NamedColor, fg: bool) -> Rgba {
    use NamedColor::*;
    if let Some(i) = name.palette_index() {
        return default_palette()[i];
    }
    match name {
        Foreground => DEFAULT_FOREGROUND,
        Background => DEFAULT_BACKGROUND,
        Cursor => DEFAULT_CURSOR,
        DimBlack => default_palette()[0].dimmed(),
        DimRed => default_palette()[1].dimmed(),
        DimGreen => default_palette()[2].dimmed(),
        DimYellow => default_palette()[3].dimmed(),
        DimBlue => default_palette()[4].dimmed(),
        DimMagenta => default_palette()[5].dimmed(),
        DimCyan => default_palette()[6].dimmed(),
        DimWhite => default_palette()[7].dimmed(),
        BrightForeground => default_palette()[15],
        DimForeground => DEFAULT_FOREGROUND.dimmed(),
        _ => {
            if fg {
                DEFAULT_FOREGROUND
            } else {
                DEFAULT_BACKGROUND
            }
        }
    }
}

/// The standard 256-color palette: 16 ANSI colors, the 6x6x6 color cube
/// (16-231, stride 51), and 24 grays (232-255).
pub fn default_palette() -> &'static [Rgba; 256] {
    use std::sync::OnceLock;
    static PALETTE: OnceLock<[Rgba; 256]> = OnceLock::new();
    PALETTE.get_or_init(build_palette)
}

fn build_palette() -> [Rgba; 256] {
    let mut p = [Rgba::default(); 256];

    // Standard colors (0-7)
    p[0] = Rgba::opaque(0, 0, 0);
    p[1] = Rgba::opaque(205, 49, 49);
    p[2] = Rgba::opaque(13, 188, 121);
    p[3] = Rgba::opaque(229, 229, 16);
    p[4] = Rgba::opaque(36, 114, 200);
    p[5] = Rgba::opaque(188, 63, 188);
    p[6] = Rgba::opaque(17, 168, 205);
    p[7] = Rgba::opaque(229, 229, 229);

    // Bright colors (8-15)
    p[8] = Rgba::opaque(102, 102, 102);
    p[9] = Rgba::opaque(241, 76, 76);
    p[10] = Rgba::opaque(35, 209, 139);
    p[11] = Rgba::opaque(245, 245, 67);
    p[12] = Rgba::opaque(59, 142, 234);
    p[13] = Rgba::opaque(214, 112, 214);
    p[14] = Rgba::opaque(41, 184, 219);
    p[15] = Rgba::opaque(255, 255, 255);

    // 216 color cube (16-231)
    let mut i = 16;
    for r in 0..6u16 {
        for g in 0..6u16 {
            for b in 0..6u16 {
                p[i] = Rgba::opaque((r * 51) as u8, (g * 51) as u8, (b * 51) as u8);
                i += 1;
            }
        }
    }

    // Grayscale ramp (232-255)
    for j in 0..24u16 {
        let gray = (8 + j * 10) as u8;
        p[232 + j as usize] = Rgba::opaque(gray, gray, gray);
    }

    p
}

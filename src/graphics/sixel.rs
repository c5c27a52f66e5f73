//! Sixel decoder
//!
//! Sixel encodes bitmap graphics in a DCS string: each data byte in
//! `?`..=`~` carries a vertical column of six pixels. The stream also
//! carries color register definitions (`#`), repeats (`!`), a graphics
//! carriage return (`$`), a graphics newline (`-`), and raster attributes
//! (`"`). The decoder produces an RGBA raster plus a transparency flag.

use crate::core::color::Rgba;

/// Dimension cap guarding against hostile repeat counts.
pub const SIXEL_MAX_DIMENSION: usize = 10_000;

/// A decoded sixel image.
#[derive(Debug, Clone)]
pub struct SixelImage {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel. Empty when nothing was drawn.
    pub data: Vec<u8>,
    /// True when the DCS background-select parameter asked for a
    /// transparent background.
    pub transparent: bool,
}

struct SixelParser {
    palette: [Rgba; 256],
    color_index: usize,
    x: usize,
    y: usize,
    max_x: usize,
    max_y: usize,
    pixels: std::collections::HashMap<(usize, usize), Rgba>,
    transparent: bool,
}

/// Decode a sixel payload.
///
/// `params` are the DCS parameters (`P1;P2;P3`): P2 == 1 selects a
/// transparent background. `data` is everything after the `q` final byte.
pub fn decode_sixel(params: &[u16], data: &[u8]) -> SixelImage {
    let mut parser = SixelParser {
        palette: default_sixel_palette(),
        color_index: 0,
        x: 0,
        y: 0,
        max_x: 0,
        max_y: 0,
        pixels: std::collections::HashMap::new(),
        transparent: params.get(1).copied() == Some(1),
    };
    parser.parse(data);
    parser.into_image()
}

/// Default VGA-style 16-color palette, grayscale for the remaining
/// registers.
fn default_sixel_palette() -> [Rgba; 256] {
    let mut palette = [Rgba::opaque(0, 0, 0); 256];
    let vga = [
        Rgba::opaque(0, 0, 0),
        Rgba::opaque(0, 0, 205),
        Rgba::opaque(205, 0, 0),
        Rgba::opaque(205, 0, 205),
        Rgba::opaque(0, 205, 0),
        Rgba::opaque(0, 205, 205),
        Rgba::opaque(205, 205, 0),
        Rgba::opaque(205, 205, 205),
        Rgba::opaque(0, 0, 0),
        Rgba::opaque(0, 0, 255),
        Rgba::opaque(255, 0, 0),
        Rgba::opaque(255, 0, 255),
        Rgba::opaque(0, 255, 0),
        Rgba::opaque(0, 255, 255),
        Rgba::opaque(255, 255, 0),
        Rgba::opaque(255, 255, 255),
    ];
    palette[..16].copy_from_slice(&vga);
    for (i, slot) in palette.iter_mut().enumerate().skip(16) {
        let gray = ((i - 16) * 255 / 239) as u8;
        *slot = Rgba::opaque(gray, gray, gray);
    }
    palette
}

impl SixelParser {
    fn parse(&mut self, data: &[u8]) {
        let mut i = 0;
        while i < data.len() {
            let b = data[i];
            i += 1;

            match b {
                b'$' => {
                    // Graphics carriage return
                    self.x = 0;
                }
                b'-' => {
                    // Graphics newline: down one sixel row
                    self.x = 0;
                    self.y += 6;
                }
                b'!' => {
                    // Repeat introducer: !<count><sixel>
                    let (count, next) = parse_number(data, i);
                    i = next;
                    if let Some(&sixel) = data.get(i) {
                        i += 1;
                        if (b'?'..=b'~').contains(&sixel) {
                            self.draw_sixel(sixel, count as usize);
                        }
                    }
                }
                b'#' => {
                    i = self.parse_color(data, i);
                }
                b'"' => {
                    // Raster attributes: "<Pan>;<Pad>;<Ph>;<Pv> - aspect
                    // ratio and advisory dimensions, skipped
                    while let Some(&next) = data.get(i) {
                        if matches!(next, b'0'..=b'9' | b';') {
                            i += 1;
                        } else {
                            break;
                        }
                    }
                }
                b'?'..=b'~' => {
                    self.draw_sixel(b, 1);
                }
                _ => {}
            }
        }
    }

    /// Parse `#<reg>` or `#<reg>;<type>;<v1>;<v2>;<v3>` starting after `#`.
    fn parse_color(&mut self, data: &[u8], mut i: usize) -> usize {
        let (register, next) = parse_number(data, i);
        i = next;

        if data.get(i) == Some(&b';') {
            let mut values = [0u32; 4];
            let mut count = 0;
            while count < 4 && data.get(i) == Some(&b';') {
                i += 1;
                let (v, next) = parse_number(data, i);
                values[count] = v;
                count += 1;
                i = next;
            }

            if count == 4 && register < 256 {
                let (ty, v1, v2, v3) = (values[0], values[1], values[2], values[3]);
                self.palette[register as usize] = if ty == 1 {
                    hls_to_rgb(v1, v2, v3)
                } else {
                    // RGB, components are 0-100 percentages
                    Rgba::opaque(
                        (v1.min(100) * 255 / 100) as u8,
                        (v2.min(100) * 255 / 100) as u8,
                        (v3.min(100) * 255 / 100) as u8,
                    )
                };
            }
        }

        if register < 256 {
            self.color_index = register as usize;
        }
        i
    }

    /// Draw one sixel character `count` times. Each bit is a vertical
    /// pixel, bit 0 on top.
    fn draw_sixel(&mut self, b: u8, count: usize) {
        let count = count.max(1).min(SIXEL_MAX_DIMENSION);
        let bits = b - b'?';
        let color = self.palette[self.color_index];

        for _ in 0..count {
            if self.x >= SIXEL_MAX_DIMENSION {
                break;
            }
            for bit in 0..6 {
                if bits & (1 << bit) != 0 {
                    let py = self.y + bit;
                    if py >= SIXEL_MAX_DIMENSION {
                        continue;
                    }
                    self.pixels.insert((self.x, py), color);
                    self.max_x = self.max_x.max(self.x);
                    self.max_y = self.max_y.max(py);
                }
            }
            self.x += 1;
        }
    }

    fn into_image(self) -> SixelImage {
        if self.pixels.is_empty() {
            return SixelImage {
                width: 0,
                height: 0,
                data: Vec::new(),
                transparent: self.transparent,
            };
        }

        let width = self.max_x + 1;
        let height = self.max_y + 1;
        let mut data = vec![0u8; width * height * 4];

        if !self.transparent {
            let bg = self.palette[0];
            for pixel in data.chunks_exact_mut(4) {
                pixel.copy_from_slice(&[bg.r, bg.g, bg.b, bg.a]);
            }
        }

        for (&(x, y), color) in &self.pixels {
            if x < width && y < height {
                let offset = (y * width + x) * 4;
                data[offset..offset + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
            }
        }

        SixelImage {
            width: width as u32,
            height: height as u32,
            data,
            transparent: self.transparent,
        }
    }
}

fn parse_number(data: &[u8], mut i: usize) -> (u32, usize) {
    let mut n: u32 = 0;
    while let Some(&b) = data.get(i) {
        if b.is_ascii_digit() {
            n = n.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            i += 1;
        } else {
            break;
        }
    }
    (n, i)
}

/// Convert sixel HLS to RGB.
///
/// Sixel hue is rotated relative to the standard wheel: blue sits at 0,
/// red at 120, green at 240, so the standard formula applies after a
/// 240-degree shift. Lightness and saturation are 0-100.
fn hls_to_rgb(h: u32, l: u32, s: u32) -> Rgba {
    if s == 0 {
        let v = (l.min(100) * 255 / 100) as u8;
        return Rgba::opaque(v, v, v);
    }

    let h_norm = f64::from((h + 240) % 360) / 360.0;
    let l_norm = f64::from(l.min(100)) / 100.0;
    let s_norm = f64::from(s.min(100)) / 100.0;

    let q = if l_norm < 0.5 {
        l_norm * (1.0 + s_norm)
    } else {
        l_norm + s_norm - l_norm * s_norm
    };
    let p = 2.0 * l_norm - q;

    let r = hue_to_rgb(p, q, h_norm + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h_norm);
    let b = hue_to_rgb(p, q, h_norm - 1.0 / 3.0);

    Rgba::opaque((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(img: &SixelImage, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * img.width + x) * 4) as usize;
        img.data[offset..offset + 4].try_into().unwrap()
    }

    #[test]
    fn test_empty_input() {
        let img = decode_sixel(&[], b"");
        assert_eq!(img.width, 0);
        assert_eq!(img.height, 0);
        assert!(img.data.is_empty());
    }

    #[test]
    fn test_single_full_column() {
        // '~' = 0b111111: six pixels in one column
        let img = decode_sixel(&[], b"~");
        assert_eq!(img.width, 1);
        assert_eq!(img.height, 6);
    }

    #[test]
    fn test_repeat_introducer() {
        let img = decode_sixel(&[], b"!10~");
        assert_eq!(img.width, 10);
        assert_eq!(img.height, 6);
    }

    #[test]
    fn test_color_definition_rgb() {
        // Register 1 = 100% red, then draw one column with it
        let img = decode_sixel(&[], b"#1;2;100;0;0#1~");
        assert_eq!(pixel(&img, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn test_graphics_newline_advances_six_rows() {
        let img = decode_sixel(&[], b"~-~");
        assert_eq!(img.width, 1);
        assert_eq!(img.height, 12);
    }

    #[test]
    fn test_carriage_return_overstrikes() {
        // Draw a column, return, draw another color over it
        let img = decode_sixel(&[], b"#1;2;100;0;0#1~$#2;2;0;100;0#2~");
        assert_eq!(img.width, 1);
        assert_eq!(pixel(&img, 0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn test_transparent_background() {
        // P2 == 1: untouched pixels stay fully transparent
        let img = decode_sixel(&[0, 1, 0], b"@"); // '@' = bit 0 only
        assert!(img.transparent);
        assert_eq!(img.height, 1);
    }

    #[test]
    fn test_opaque_background_fill() {
        // Without transparency, untouched pixels take color 0
        let img = decode_sixel(&[], b"#1;2;100;0;0#1@$");
        assert!(!img.transparent);
        assert_eq!(pixel(&img, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn test_raster_attributes_skipped() {
        let img = decode_sixel(&[], b"\"1;1;4;6~~");
        assert_eq!(img.width, 2);
        assert_eq!(img.height, 6);
    }

    #[test]
    fn test_hls_gray() {
        let c = hls_to_rgb(0, 50, 0);
        assert_eq!((c.r, c.g, c.b), (127, 127, 127));
    }

    #[test]
    fn test_hls_hue_rotation() {
        // Sixel hue 120 is red
        let c = hls_to_rgb(120, 50, 100);
        assert!(c.r > 200 && c.g < 60 && c.b < 60, "expected red, got {c:?}");
    }
}

//! 1-bit canvas composition — drawing primitives and PNG serialization.
//!
//! One canvas per render call: created white, drawn, serialized, dropped.

use image::error::{EncodingError, ImageFormatHint};
use image::{ImageError, ImageFormat};

use crate::font::{ResolvedFont, builtin};

/// Fixed raster width for every scenario.
pub const WIDTH: u32 = 296;

/// Fixed raster height for every scenario.
pub const HEIGHT: u32 = 152;

const WHITE: u8 = 1;
const BLACK: u8 = 0;

/// A fixed-size 1-bit raster. `1` is white (the e-ink background).
pub struct Canvas {
    pixels: Vec<u8>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// A white canvas of the fixed display size.
    pub fn new() -> Self {
        Self { pixels: vec![WHITE; (WIDTH * HEIGHT) as usize] }
    }

    /// Set a single pixel. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: i32, y: i32, black: bool) {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return;
        }
        self.pixels[(y as u32 * WIDTH + x as u32) as usize] = if black { BLACK } else { WHITE };
    }

    /// Whether the pixel at (x, y) is black. Out of bounds reads as white.
    pub fn is_black(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return false;
        }
        self.pixels[(y as u32 * WIDTH + x as u32) as usize] == BLACK
    }

    /// Number of black pixels on the canvas.
    pub fn black_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p == BLACK).count()
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, black: bool) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                self.set(x + dx, y + dy, black);
            }
        }
    }

    pub fn outline_rect(&mut self, x: i32, y: i32, w: u32, h: u32) {
        let (w, h) = (w as i32, h as i32);
        for dx in 0..w {
            self.set(x + dx, y, true);
            self.set(x + dx, y + h - 1, true);
        }
        for dy in 0..h {
            self.set(x, y + dy, true);
            self.set(x + w - 1, y + dy, true);
        }
    }

    /// Horizontal separator line spanning `[x, x + len)`.
    pub fn hline(&mut self, x: i32, y: i32, len: u32) {
        for dx in 0..len as i32 {
            self.set(x + dx, y, true);
        }
    }

    pub fn vline(&mut self, x: i32, y: i32, len: u32) {
        for dy in 0..len as i32 {
            self.set(x, y + dy, true);
        }
    }

    /// Draw one line of text with its top-left corner at (x, y).
    pub fn draw_text(&mut self, font: &ResolvedFont, x: i32, y: i32, text: &str) {
        self.draw_text_offsets(font, x, y, text, &[(0, 0)]);
    }

    /// Draw text repeatedly at small pixel offsets (synthetic bold for the
    /// builtin font, which has no weight variants).
    pub fn draw_text_offsets(
        &mut self,
        font: &ResolvedFont,
        x: i32,
        y: i32,
        text: &str,
        offsets: &[(i32, i32)],
    ) {
        for &(dx, dy) in offsets {
            self.draw_text_pass(font, x + dx, y + dy, text);
        }
    }

    fn draw_text_pass(&mut self, font: &ResolvedFont, x: i32, y: i32, text: &str) {
        match font.raster() {
            Some(raster) => {
                let baseline = y + font.ascent();
                let mut pen = x as f32;
                for ch in text.chars() {
                    let (metrics, bitmap) = raster.rasterize(ch, font.px());
                    let left = pen.round() as i32 + metrics.xmin;
                    let top = baseline - metrics.height as i32 - metrics.ymin;
                    for gy in 0..metrics.height {
                        for gx in 0..metrics.width {
                            if bitmap[gy * metrics.width + gx] >= 128 {
                                self.set(left + gx as i32, top + gy as i32, true);
                            }
                        }
                    }
                    pen += metrics.advance_width;
                }
            }
            None => {
                let mut pen = x;
                for ch in text.chars() {
                    let rows = builtin::glyph(ch).unwrap_or(&builtin::NOTDEF);
                    for (gy, row) in rows.iter().enumerate() {
                        for gx in 0..builtin::GLYPH_WIDTH {
                            if row & (1 << (builtin::GLYPH_WIDTH - 1 - gx)) != 0 {
                                self.set(pen + gx as i32, y + 1 + gy as i32, true);
                            }
                        }
                    }
                    pen += builtin::ADVANCE as i32;
                }
            }
        }
    }

    /// Draw text horizontally centered over the full canvas width.
    pub fn draw_text_centered(&mut self, font: &ResolvedFont, y: i32, text: &str) {
        self.draw_text_centered_in(font, 0, WIDTH, y, text);
    }

    /// Draw text horizontally centered within a column `[x, x + w)`.
    pub fn draw_text_centered_in(&mut self, font: &ResolvedFont, x: i32, w: u32, y: i32, text: &str) {
        let (text_width, _) = font.measure(text);
        let offset = (w.saturating_sub(text_width) / 2) as i32;
        self.draw_text(font, x + offset, y, text);
    }

    /// Draw one contribution cell. The fill pattern encodes the level:
    /// 0 solid white, 1 sparse dots, 2 checkerboard, 3 solid black.
    pub fn contribution_cell(&mut self, x: i32, y: i32, size: u32, level: u8) {
        match level {
            0 => {
                self.fill_rect(x, y, size, size, false);
                self.outline_rect(x, y, size, size);
            }
            1 => {
                self.fill_rect(x, y, size, size, false);
                self.outline_rect(x, y, size, size);
                let mut dx = 0;
                while dx < size as i32 {
                    let mut dy = 0;
                    while dy < size as i32 {
                        if (dx + dy) % 4 == 0 {
                            self.set(x + dx, y + dy, true);
                        }
                        dy += 3;
                    }
                    dx += 3;
                }
            }
            2 => {
                self.fill_rect(x, y, size, size, false);
                self.outline_rect(x, y, size, size);
                for dx in 0..size as i32 {
                    for dy in 0..size as i32 {
                        if (dx + dy) % 2 == 0 {
                            self.set(x + dx, y + dy, true);
                        }
                    }
                }
            }
            _ => self.fill_rect(x, y, size, size, true),
        }
    }

    /// Serialize to a 1-bit grayscale PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let row_bytes = (WIDTH as usize).div_ceil(8);
        let mut packed = vec![0u8; row_bytes * HEIGHT as usize];
        for y in 0..HEIGHT as usize {
            for x in 0..WIDTH as usize {
                if self.pixels[y * WIDTH as usize + x] == WHITE {
                    packed[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
                }
            }
        }

        // `image`'s PNG encoder cannot write sub-byte depths, so drive the
        // `png` crate (its backend) directly for the 1-bit output.
        let encode = |out: &mut Vec<u8>| -> Result<(), png::EncodingError> {
            let mut encoder = png::Encoder::new(out, WIDTH, HEIGHT);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::One);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&packed)?;
            writer.finish()
        };

        let mut out = Vec::new();
        encode(&mut out).map_err(|err| {
            ImageError::Encoding(EncodingError::new(ImageFormatHint::Exact(ImageFormat::Png), err))
        })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontQuery, FontService};
    use std::path::PathBuf;

    fn builtin_font() -> ResolvedFont {
        let fonts = FontService::with_search_paths(PathBuf::from("/nonexistent"), Vec::new());
        fonts.resolve(&FontQuery::sized(16))
    }

    /// PNG IHDR: bit depth at byte 24, color type at byte 25.
    fn assert_one_bit_png(png: &[u8]) {
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']);
        assert_eq!(png[24], 1, "bit depth");
        assert_eq!(png[25], 0, "color type (grayscale)");
    }

    #[test]
    fn new_canvas_is_white() {
        let canvas = Canvas::new();
        assert_eq!(canvas.black_count(), 0);
    }

    #[test]
    fn png_is_one_bit_and_fixed_size() {
        let canvas = Canvas::new();
        let png = canvas.to_png().unwrap();
        assert_one_bit_png(&png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn set_out_of_bounds_is_ignored() {
        let mut canvas = Canvas::new();
        canvas.set(-1, 0, true);
        canvas.set(0, -5, true);
        canvas.set(WIDTH as i32, 0, true);
        canvas.set(0, HEIGHT as i32, true);
        assert_eq!(canvas.black_count(), 0);
    }

    #[test]
    fn rect_and_line_primitives() {
        let mut canvas = Canvas::new();
        canvas.fill_rect(10, 10, 4, 3, true);
        assert_eq!(canvas.black_count(), 12);
        canvas.hline(0, 60, WIDTH);
        assert!(canvas.is_black(0, 60));
        assert!(canvas.is_black(WIDTH as i32 - 1, 60));
    }

    #[test]
    fn text_marks_pixels() {
        let mut canvas = Canvas::new();
        canvas.draw_text(&builtin_font(), 10, 10, "Hi");
        assert!(canvas.black_count() > 0);
    }

    #[test]
    fn centered_text_lands_mid_canvas() {
        let mut canvas = Canvas::new();
        canvas.draw_text_centered(&builtin_font(), 40, "X");
        // The lone glyph must sit near the horizontal midpoint.
        let mid = WIDTH as i32 / 2;
        let mut found = false;
        for x in mid - 8..mid + 8 {
            for y in 40..52 {
                found |= canvas.is_black(x, y);
            }
        }
        assert!(found);
    }

    #[test]
    fn contribution_levels_darken_monotonically() {
        let mut counts = Vec::new();
        for level in 0..4u8 {
            let mut canvas = Canvas::new();
            canvas.contribution_cell(0, 0, 10, level);
            counts.push(canvas.black_count());
        }
        assert!(counts[0] < counts[1], "dots add to outline: {counts:?}");
        assert!(counts[1] < counts[2], "checkerboard beats dots: {counts:?}");
        assert!(counts[2] < counts[3], "solid is darkest: {counts:?}");
    }

    #[test]
    fn level_three_cell_is_solid() {
        let mut canvas = Canvas::new();
        canvas.contribution_cell(5, 5, 6, 3);
        for dx in 0..6 {
            for dy in 0..6 {
                assert!(canvas.is_black(5 + dx, 5 + dy));
            }
        }
    }
}

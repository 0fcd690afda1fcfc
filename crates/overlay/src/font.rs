//! Fixed 5x7 bitmap font for frame overlays
//!
//! Covers only the glyphs the counter label uses; anything else renders as
//! a blank cell. Rendering a handful of HUD characters this way avoids a
//! font-file dependency in the video path.

use image::{Rgb, RgbImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// One blank column between glyphs
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row-major 5x7 glyph bitmaps, one byte per row, low 5 bits used.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'r' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10000, 0b10000, 0b10000],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'm' => [0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10001, 0b10001],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        _ => [0; 7],
    }
}

/// Draw a label at pixel position `(x, y)`, clipped to the frame bounds.
pub(crate) fn draw_label(
    frame: &mut RgbImage,
    text: &str,
    x: u32,
    y: u32,
    scale: u32,
    color: Rgb<u8>,
) {
    let scale = scale.max(1);
    let mut cursor_x = x;

    for ch in text.chars() {
        let bitmap = glyph(ch);
        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col * scale;
                let py = y + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let fx = px + dx;
                        let fy = py + dy;
                        if fx < frame.width() && fy < frame.height() {
                            frame.put_pixel(fx, fy, color);
                        }
                    }
                }
            }
        }
        cursor_x += GLYPH_ADVANCE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

    #[test]
    fn test_digit_one_renders_vertical_stroke() {
        let mut frame = RgbImage::new(32, 32);
        draw_label(&mut frame, "1", 0, 0, 1, GREEN);
        // Center column of the '1' glyph
        assert_eq!(*frame.get_pixel(2, 1), GREEN);
        assert_eq!(*frame.get_pixel(2, 5), GREEN);
    }

    #[test]
    fn test_unknown_glyph_is_blank() {
        let mut frame = RgbImage::new(32, 32);
        draw_label(&mut frame, "?", 0, 0, 1, GREEN);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_scale_multiplies_footprint() {
        let mut small = RgbImage::new(64, 64);
        let mut large = RgbImage::new(64, 64);
        draw_label(&mut small, "8", 0, 0, 1, GREEN);
        draw_label(&mut large, "8", 0, 0, 2, GREEN);
        let count = |img: &RgbImage| img.pixels().filter(|p| **p == GREEN).count();
        assert_eq!(count(&large), 4 * count(&small));
    }

    #[test]
    fn test_label_clips_at_frame_border() {
        let mut frame = RgbImage::new(8, 4);
        draw_label(&mut frame, "Frame: 10", 0, 0, 2, GREEN);
    }
}

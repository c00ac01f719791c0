use image::{Rgba, RgbaImage};

/// 5x7 digit glyphs, one row per byte, 5 low bits used, MSB-left.
/// Enough for the mask-value readout, which only ever prints part ids.
const DIGIT_GLYPHS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111], // 2
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110], // 3
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110], // 5
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000], // 7
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100], // 9
];

/// Pixel size of one glyph cell at the given scale, including one cell of
/// inter-glyph spacing.
pub const GLYPH_ADVANCE: i32 = 6;

/// Draw a decimal number at `(x, y)` (top-left of the first glyph),
/// magnified by `scale`. Writes outside the buffer are clipped, so the
/// label can hug or cross the surface edge without issue.
pub fn draw_number(image: &mut RgbaImage, x: i32, y: i32, value: u8, scale: i32, color: Rgba<u8>) {
    let mut pen_x = x;
    for digit in value.to_string().bytes() {
        draw_glyph(image, pen_x, y, (digit - b'0') as usize, scale, color);
        pen_x += GLYPH_ADVANCE * scale;
    }
}

fn draw_glyph(image: &mut RgbaImage, x: i32, y: i32, digit: usize, scale: i32, color: Rgba<u8>) {
    let glyph = &DIGIT_GLYPHS[digit];
    let (width, height) = image.dimensions();

    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..5 {
            if bits & (0b10000 >> col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + col as i32 * scale + dx;
                    let py = y + row as i32 * scale + dy;
                    if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                        image.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn draws_within_glyph_cell() {
        let mut image = RgbaImage::new(20, 20);
        draw_number(&mut image, 2, 3, 1, 1, WHITE);

        // "1" has its stem at column 2 of the glyph
        assert_eq!(image.get_pixel(4, 3), &WHITE);
        // Nothing outside the 5x7 cell
        for y in 0..20u32 {
            for x in 0..20u32 {
                if !(2..7).contains(&x) || !(3..10).contains(&y) {
                    assert_eq!(image.get_pixel(x, y), &Rgba([0, 0, 0, 0]));
                }
            }
        }
    }

    #[test]
    fn two_digit_numbers_advance_the_pen() {
        let mut image = RgbaImage::new(40, 10);
        draw_number(&mut image, 0, 0, 11, 1, WHITE);

        // Both stems present, one advance apart
        assert_eq!(image.get_pixel(2, 0), &WHITE);
        assert_eq!(image.get_pixel(2 + GLYPH_ADVANCE as u32, 0), &WHITE);
    }

    #[test]
    fn clips_at_surface_edges() {
        let mut image = RgbaImage::new(4, 4);
        // Mostly off-surface: must not panic
        draw_number(&mut image, -3, -3, 8, 2, WHITE);
        draw_number(&mut image, 3, 3, 8, 2, WHITE);
    }
}

/// Debug overlay: outlines every element on a copy of the screenshot and
/// stamps its numeric id above the top-left corner, so a saved image can be
/// matched against the element listing.
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::perception::types::Element;

/// Outline colours cycled by element id.
const PALETTE: [[u8; 3]; 6] = [
    [255, 68, 68],  // red
    [68, 200, 68],  // green
    [68, 68, 255],  // blue
    [255, 170, 0],  // orange
    [255, 68, 255], // magenta
    [0, 200, 220],  // cyan
];

fn colour_for(id: usize) -> Rgb<u8> {
    Rgb(PALETTE[id % PALETTE.len()])
}

pub fn annotate(image: &RgbImage, elements: &[Element]) -> RgbImage {
    let mut canvas = image.clone();
    if canvas.width() == 0 || canvas.height() == 0 {
        return canvas;
    }
    let scale: u32 = if canvas.width() > 1600 { 2 } else { 1 };
    let thickness: u32 = scale + 1;

    for elem in elements {
        let b = elem.bounds;
        let col = colour_for(elem.id);
        // Concentric outlines give a thicker border.
        for t in 0..thickness {
            if b.width <= 2 * t || b.height <= 2 * t {
                break;
            }
            let rect = Rect::at((b.x + t) as i32, (b.y + t) as i32)
                .of_size(b.width - 2 * t, b.height - 2 * t);
            draw_hollow_rect_mut(&mut canvas, rect, col);
        }

        let label = elem.id.to_string();
        let label_h = GLYPH_SIZE * scale + 4;
        draw_label(&mut canvas, b.x, b.y.saturating_sub(label_h), &label, col, scale);
    }
    canvas
}

const GLYPH_SIZE: u32 = 5;

/// Darkened box with the id drawn in the element colour.
fn draw_label(canvas: &mut RgbImage, x: u32, y: u32, text: &str, col: Rgb<u8>, scale: u32) {
    let (w, h) = canvas.dimensions();
    let step = GLYPH_SIZE * scale + 1;
    let pad = 2 * scale;
    let label_w = text.len() as u32 * step + pad * 2;
    let label_h = GLYPH_SIZE * scale + pad * 2;

    for dy in 0..label_h {
        for dx in 0..label_w {
            let (px, py) = (x + dx, y + dy);
            if px < w && py < h {
                let p = canvas.get_pixel_mut(px, py);
                for c in p.0.iter_mut() {
                    *c /= 5;
                }
            }
        }
    }

    for (i, c) in text.chars().enumerate() {
        let Some(digit) = c.to_digit(10) else { continue };
        let gx = x + pad + i as u32 * step;
        draw_digit(canvas, DIGITS[digit as usize], gx, y + pad, col, scale);
    }
}

fn draw_digit(canvas: &mut RgbImage, glyph: [u8; 5], px: u32, py: u32, col: Rgb<u8>, scale: u32) {
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..GLYPH_SIZE {
            if (bits >> (GLYPH_SIZE - 1 - bit)) & 1 == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        canvas.put_pixel(x, y, col);
                    }
                }
            }
        }
    }
}

/// 5×5 bitmap digits.
const DIGITS: [[u8; 5]; 10] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110],
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110],
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100],
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110],
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::Region;

    fn element(id: usize, bounds: Region) -> Element {
        Element { id, bounds, text: String::new() }
    }

    #[test]
    fn outline_is_drawn_and_interior_untouched() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let out = annotate(&img, &[element(0, Region::new(20, 30, 40, 40))]);

        assert_eq!(out.get_pixel(20, 50), &colour_for(0));
        assert_eq!(out.get_pixel(59, 50), &colour_for(0));
        assert_eq!(out.get_pixel(40, 50), &Rgb([255, 255, 255]));
        // Source image is left alone.
        assert_eq!(img.get_pixel(20, 50), &Rgb([255, 255, 255]));
    }

    #[test]
    fn label_sits_above_the_box() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let out = annotate(&img, &[element(7, Region::new(20, 40, 30, 30))]);
        // Label background darkens the area just above the box.
        let label_px = out.get_pixel(20, 40 - 2);
        assert!(label_px[0] < 255);
    }

    #[test]
    fn boxes_at_the_image_edge_do_not_panic() {
        let img = RgbImage::new(50, 50);
        let elems = [
            element(0, Region::new(0, 0, 50, 50)),
            element(12, Region::new(45, 45, 5, 5)),
            element(3, Region::new(0, 0, 1, 1)),
        ];
        let out = annotate(&img, &elems);
        assert_eq!(out.dimensions(), (50, 50));
    }

    #[test]
    fn empty_image_is_returned_as_is() {
        let out = annotate(&RgbImage::new(0, 0), &[element(0, Region::new(0, 0, 5, 5))]);
        assert_eq!(out.dimensions(), (0, 0));
    }
}

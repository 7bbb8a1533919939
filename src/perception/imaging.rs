/// Pixel-level helpers shared by the region detectors.
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::map::map_colors2;
use imageproc::morphology::{grayscale_dilate, Mask};
use imageproc::point::Point;

use crate::perception::types::Region;

/// Aspect-ratio window every detector enforces on its output.
pub const MIN_ASPECT: f64 = 0.1;
pub const MAX_ASPECT: f64 = 15.0;

pub const MASK_ON: u8 = 255;

pub fn is_empty(image: &RgbImage) -> bool {
    image.width() == 0 || image.height() == 0
}

pub fn aspect_in_bounds(region: &Region) -> bool {
    if region.width == 0 || region.height == 0 {
        return false;
    }
    let ratio = region.aspect_ratio();
    (MIN_ASPECT..=MAX_ASPECT).contains(&ratio)
}

/// RGB → HSV on the 8-bit scale used by most vision toolkits:
/// hue in `0..180` (degrees halved), saturation and value in `0..=255`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round().min(255.0) as u8,
        v.round().min(255.0) as u8,
    ]
}

/// Inclusive HSV band.
#[derive(Debug, Clone, Copy)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Union of the masks of every band.
pub fn hsv_mask(image: &RgbImage, bands: &[HsvBand]) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        if bands.iter().any(|b| b.contains(hsv)) {
            mask.put_pixel(x, y, Luma([MASK_ON]));
        }
    }
    mask
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAxis {
    Horizontal,
    Vertical,
}

/// Dilate with a `1×len` (horizontal) or `len×1` (vertical) structuring
/// element anchored at its centre.
pub fn dilate_line(mask: &GrayImage, axis: LineAxis, len: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 || len == 0 {
        return GrayImage::new(w, h);
    }
    // Masks are limited to 511 pixels per side.
    let len = len.min(511);
    let centre = ((len - 1) / 2) as u8;
    let (kernel, cx, cy) = match axis {
        LineAxis::Horizontal => (GrayImage::from_pixel(len, 1, Luma([MASK_ON])), centre, 0),
        LineAxis::Vertical => (GrayImage::from_pixel(1, len, Luma([MASK_ON])), 0, centre),
    };
    grayscale_dilate(mask, &Mask::from_image(&kernel, cx, cy))
}

/// Pixel-wise maximum of two equally sized masks.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p, q| Luma([p[0].max(q[0])]))
}

/// Outermost contours only: nested borders and holes are discarded.
pub fn external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Smallest upright rectangle containing every point (pixel-inclusive).
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Region> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if min_x < 0 || min_y < 0 {
        return None;
    }
    Some(Region::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Area enclosed by the polygon through `points` (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice.abs() as f64) / 2.0
}

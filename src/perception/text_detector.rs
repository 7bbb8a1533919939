/// Text-line detector.
///
/// Binarises the screenshot with a local (Gaussian-weighted) threshold so dark
/// glyphs on any background light up, smears the result along horizontal and
/// vertical line elements and boxes the outer contours of the union. This
/// catches labels and text blocks that have no border or fill of their own.
use image::{GrayImage, Luma, RgbImage};

use crate::perception::imaging::{self, LineAxis, MASK_ON};
use crate::perception::traits::RegionDetector;
use crate::perception::types::{DetectionSource, Region};

/// Sigma of an 11-pixel Gaussian window.
const LOCAL_WINDOW_SIGMA: f32 = 2.0;
/// Offset subtracted from the local mean before comparing.
const THRESHOLD_OFFSET: f32 = 2.0;
const LINE_KERNEL_LEN: u32 = 15;
const MIN_BOX_AREA: u64 = 200;
const MAX_BOX_AREA: u64 = 50_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextLineDetector;

impl TextLineDetector {
    pub fn new() -> Self {
        Self
    }
}

/// Inverted adaptive threshold: pixels darker than their neighbourhood
/// (by more than the offset) become foreground.
fn adaptive_threshold_inv(gray: &GrayImage) -> GrayImage {
    let local_mean = imageproc::filter::gaussian_blur_f32(gray, LOCAL_WINDOW_SIGMA);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, px) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as f32 - THRESHOLD_OFFSET;
        if (px[0] as f32) <= threshold {
            out.put_pixel(x, y, Luma([MASK_ON]));
        }
    }
    out
}

impl RegionDetector for TextLineDetector {
    fn source(&self) -> DetectionSource {
        DetectionSource::Text
    }

    fn detect(&self, image: &RgbImage) -> Vec<Region> {
        if imaging::is_empty(image) {
            return Vec::new();
        }

        let gray = image::imageops::grayscale(image);
        let binary = adaptive_threshold_inv(&gray);
        let horizontal = imaging::dilate_line(&binary, LineAxis::Horizontal, LINE_KERNEL_LEN);
        let vertical = imaging::dilate_line(&binary, LineAxis::Vertical, LINE_KERNEL_LEN);
        let combined = imaging::union(&horizontal, &vertical);

        let regions: Vec<Region> = imaging::external_contours(&combined)
            .iter()
            .filter_map(|c| imaging::bounding_rect(&c.points))
            .filter(|r| (MIN_BOX_AREA..=MAX_BOX_AREA).contains(&r.area()))
            .filter(imaging::aspect_in_bounds)
            .collect();

        tracing::debug!(count = regions.len(), "text-line candidates");
        regions
    }
}

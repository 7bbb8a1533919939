/// Colour-segmentation detector.
///
/// Thresholds the screenshot in HSV space against a fixed palette of colours
/// typical for widgets (light fields and dialogs, blue buttons and links,
/// grey panels), then boxes the outer contours of the combined mask.
use image::RgbImage;

use crate::perception::imaging::{self, HsvBand};
use crate::perception::traits::RegionDetector;
use crate::perception::types::{DetectionSource, Region};

/// Light grey / white: input fields, dialogs.
const WHITE: HsvBand = HsvBand::new([0, 0, 200], [180, 30, 255]);
/// Blue: buttons, links.
const BLUE: HsvBand = HsvBand::new([100, 50, 50], [140, 255, 255]);
/// Mid grey: buttons, panels.
const GRAY: HsvBand = HsvBand::new([0, 0, 100], [180, 30, 190]);

/// Minimum enclosed contour area in px².
const MIN_CONTOUR_AREA: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorDetector;

impl ColorDetector {
    pub fn new() -> Self {
        Self
    }
}

impl RegionDetector for ColorDetector {
    fn source(&self) -> DetectionSource {
        DetectionSource::Color
    }

    fn detect(&self, image: &RgbImage) -> Vec<Region> {
        if imaging::is_empty(image) {
            return Vec::new();
        }

        let mask = imaging::hsv_mask(image, &[WHITE, BLUE, GRAY]);

        let regions: Vec<Region> = imaging::external_contours(&mask)
            .iter()
            .filter(|c| imaging::polygon_area(&c.points) >= MIN_CONTOUR_AREA)
            .filter_map(|c| imaging::bounding_rect(&c.points))
            .filter(imaging::aspect_in_bounds)
            .collect();

        tracing::debug!(count = regions.len(), "colour candidates");
        regions
    }
}

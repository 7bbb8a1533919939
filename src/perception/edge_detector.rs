/// Edge-contour detector.
///
/// Grayscale → Gaussian blur → Canny → 3×3 dilation, then keeps the outer
/// contours whose Douglas-Peucker approximation has 4 to 6 vertices, i.e.
/// shapes that read as (rounded) rectangles.
use image::RgbImage;
use imageproc::distance_transform::Norm;
use imageproc::geometry::{approximate_polygon_dp, arc_length};

use crate::perception::imaging;
use crate::perception::traits::RegionDetector;
use crate::perception::types::{DetectionSource, Region};

/// Equivalent of a 5×5 Gaussian kernel with derived sigma.
const BLUR_SIGMA: f32 = 1.1;
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 100.0;
/// Approximation tolerance as a fraction of the contour perimeter.
const APPROX_EPSILON_RATIO: f64 = 0.02;
const MIN_VERTICES: usize = 4;
const MAX_VERTICES: usize = 6;
const MIN_BOX_AREA: u64 = 200;

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector;

impl EdgeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl RegionDetector for EdgeDetector {
    fn source(&self) -> DetectionSource {
        DetectionSource::Edge
    }

    fn detect(&self, image: &RgbImage) -> Vec<Region> {
        if imaging::is_empty(image) {
            return Vec::new();
        }

        let gray = image::imageops::grayscale(image);
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, BLUR_SIGMA);
        let edges = imageproc::edges::canny(&blurred, CANNY_LOW, CANNY_HIGH);
        let dilated = imageproc::morphology::dilate(&edges, Norm::LInf, 1);

        let mut regions = Vec::new();
        for contour in imaging::external_contours(&dilated) {
            let epsilon = APPROX_EPSILON_RATIO * arc_length(&contour.points, true);
            let mut approx = approximate_polygon_dp(&contour.points, epsilon, true);
            // Closed approximations may repeat the start point at the end.
            if approx.len() > 1 && approx.first() == approx.last() {
                approx.pop();
            }
            if !(MIN_VERTICES..=MAX_VERTICES).contains(&approx.len()) {
                continue;
            }

            let Some(rect) = imaging::bounding_rect(&contour.points) else { continue };
            if rect.area() < MIN_BOX_AREA || !imaging::aspect_in_bounds(&rect) {
                continue;
            }
            regions.push(rect);
        }

        tracing::debug!(count = regions.len(), "edge candidates");
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn empty_image_yields_nothing() {
        assert!(EdgeDetector::new().detect(&RgbImage::new(0, 0)).is_empty());
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = RgbImage::from_pixel(160, 120, Rgb([200, 200, 200]));
        assert!(EdgeDetector::new().detect(&img).is_empty());
    }

    #[test]
    fn dark_panel_on_light_background_is_found() {
        let mut img = RgbImage::from_pixel(240, 160, Rgb([235, 235, 235]));
        let panel = Region::new(60, 50, 100, 50);
        draw_filled_rect_mut(
            &mut img,
            Rect::at(panel.x as i32, panel.y as i32).of_size(panel.width, panel.height),
            Rgb([40, 40, 40]),
        );

        let regions = EdgeDetector::new().detect(&img);
        assert!(!regions.is_empty());
        let best = regions
            .iter()
            .map(|r| r.intersection_area(&panel) as f64 / r.area().max(panel.area()) as f64)
            .fold(0.0, f64::max);
        assert!(best > 0.8, "no candidate tracks the panel: {regions:?}");
    }

    #[test]
    fn every_region_respects_size_and_aspect_bounds() {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([250, 250, 250]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(120, 40), Rgb([30, 30, 30]));
        draw_filled_rect_mut(&mut img, Rect::at(180, 20).of_size(40, 150), Rgb([90, 90, 160]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 180).of_size(8, 8), Rgb([0, 0, 0]));

        for r in EdgeDetector::new().detect(&img) {
            assert!(r.width > 0 && r.height > 0);
            assert!(r.area() >= MIN_BOX_AREA);
            assert!(imaging::aspect_in_bounds(&r));
        }
    }
}

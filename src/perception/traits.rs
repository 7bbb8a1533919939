use async_trait::async_trait;
use image::RgbImage;

use crate::errors::DeskPilotResult;
use crate::perception::types::{DetectionSource, Region};

/// Strategy trait for candidate-region detection.
/// Three implementations: colour segmentation, edge contours, text lines.
///
/// Implementations are pure: the same image always yields the same regions,
/// and an empty image yields an empty list instead of an error.
pub trait RegionDetector: Send + Sync {
    fn source(&self) -> DetectionSource;

    fn detect(&self, image: &RgbImage) -> Vec<Region>;
}

/// Produces a raw pixel buffer of the screen, or of `region` of it.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, region: Option<Region>) -> DeskPilotResult<RgbImage>;
}

/// Maps a pixel region to the text printed in it.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &RgbImage) -> DeskPilotResult<String>;
}

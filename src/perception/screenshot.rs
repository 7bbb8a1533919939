// Screen capture through xcap.
use async_trait::async_trait;
use image::{RgbImage, RgbaImage};

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::perception::traits::ScreenCapture;
use crate::perception::types::Region;

/// Captures the primary (first enumerated) monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct XcapCapture;

impl XcapCapture {
    pub fn new() -> Self {
        Self
    }
}

fn capture_primary_blocking() -> DeskPilotResult<RgbImage> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| DeskPilotError::Capture(format!("monitor enumeration failed: {e}")))?;
    let monitor = monitors
        .first()
        .ok_or_else(|| DeskPilotError::Capture("no monitors found".into()))?;
    let shot = monitor
        .capture_image()
        .map_err(|e| DeskPilotError::Capture(format!("capture failed: {e}")))?;

    let (w, h) = (shot.width(), shot.height());
    let rgba = RgbaImage::from_raw(w, h, shot.into_raw())
        .ok_or_else(|| DeskPilotError::Capture("capture buffer has unexpected size".into()))?;
    Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
}

/// Crop to `region`, clamped to the image. A region fully outside the image
/// is an error rather than an empty buffer.
pub(crate) fn crop_to_region(image: RgbImage, region: Option<Region>) -> DeskPilotResult<RgbImage> {
    let Some(region) = region else {
        return Ok(image);
    };
    let clamped = region
        .clamp_to(image.width(), image.height())
        .ok_or_else(|| DeskPilotError::Capture(format!("region {region:?} is off screen")))?;
    Ok(image::imageops::crop_imm(&image, clamped.x, clamped.y, clamped.width, clamped.height).to_image())
}

#[async_trait]
impl ScreenCapture for XcapCapture {
    async fn capture(&self, region: Option<Region>) -> DeskPilotResult<RgbImage> {
        let full = tokio::task::spawn_blocking(capture_primary_blocking)
            .await
            .map_err(|e| DeskPilotError::Capture(format!("capture task failed: {e}")))??;
        tracing::debug!(width = full.width(), height = full.height(), "screen captured");
        crop_to_region(full, region)
    }
}

/// Screen analysis pipeline: capture → three region detectors → aggregation
/// → text materialisation → element table.
///
/// Every stage recovers locally: a failed capture yields an empty table, a
/// panicked detector contributes no regions and a failed extraction leaves
/// the element's text empty.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use tokio::sync::RwLock;

use crate::config::PerceptionConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::perception::aggregator::RegionAggregator;
use crate::perception::annotator;
use crate::perception::color_detector::ColorDetector;
use crate::perception::edge_detector::EdgeDetector;
use crate::perception::materializer::ElementMaterializer;
use crate::perception::text_detector::TextLineDetector;
use crate::perception::traits::{RegionDetector, ScreenCapture, TextExtractor};
use crate::perception::types::{Element, ElementTable, Region};

pub const RAW_SCREENSHOT_FILE: &str = "screen_raw.png";
pub const ANNOTATED_SCREENSHOT_FILE: &str = "screen_annotated.png";

pub struct ScreenAnalyzer {
    capture: Arc<dyn ScreenCapture>,
    color: Arc<dyn RegionDetector>,
    edge: Arc<dyn RegionDetector>,
    text: Arc<dyn RegionDetector>,
    aggregator: RegionAggregator,
    materializer: ElementMaterializer,
    debug_dir: Option<PathBuf>,
}

impl ScreenAnalyzer {
    pub fn new(
        capture: Arc<dyn ScreenCapture>,
        extractor: Arc<dyn TextExtractor>,
        config: &PerceptionConfig,
    ) -> Self {
        Self {
            capture,
            color: Arc::new(ColorDetector::new()),
            edge: Arc::new(EdgeDetector::new()),
            text: Arc::new(TextLineDetector::new()),
            aggregator: RegionAggregator::new(config.overlap_threshold),
            materializer: ElementMaterializer::new(extractor),
            debug_dir: config.debug_dir.clone(),
        }
    }

    /// Capture the screen and build a fresh element table.
    pub async fn analyze(&self) -> ElementTable {
        let image = match self.capture.capture(None).await {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("screen capture failed, no elements this pass: {e}");
                return ElementTable::new(Vec::new(), (0, 0));
            }
        };
        self.analyze_image(image).await
    }

    /// Run detection and materialisation on an already captured image.
    pub async fn analyze_image(&self, image: RgbImage) -> ElementTable {
        let resolution = image.dimensions();
        let image = Arc::new(image);

        let regions = self.detect_regions(Arc::clone(&image)).await;
        let elements = self.materializer.materialize(&image, &regions).await;

        if let Some(dir) = &self.debug_dir {
            self.write_debug_images(dir, Arc::clone(&image), elements.clone()).await;
        }

        tracing::info!(
            elements = elements.len(),
            width = resolution.0,
            height = resolution.1,
            "screen analysed"
        );
        ElementTable::new(elements, resolution)
    }

    /// Detectors run concurrently on blocking threads; results are combined
    /// in colour, edge, text order.
    pub async fn detect_regions(&self, image: Arc<RgbImage>) -> Vec<Region> {
        let (color, edge, text) = tokio::join!(
            run_detector(Arc::clone(&self.color), Arc::clone(&image)),
            run_detector(Arc::clone(&self.edge), Arc::clone(&image)),
            run_detector(Arc::clone(&self.text), Arc::clone(&image)),
        );
        tracing::debug!(
            color = color.len(),
            edge = edge.len(),
            text = text.len(),
            "raw candidates"
        );
        self.aggregator.aggregate(color, edge, text)
    }

    async fn write_debug_images(&self, dir: &Path, image: Arc<RgbImage>, elements: Vec<Element>) {
        let dir = dir.to_path_buf();
        let result = tokio::task::spawn_blocking(move || save_debug_images(&dir, &image, &elements))
            .await
            .map_err(|e| DeskPilotError::Perception(format!("debug image task failed: {e}")))
            .and_then(|r| r);
        if let Err(e) = result {
            tracing::warn!("could not write debug screenshots: {e}");
        }
    }
}

async fn run_detector(detector: Arc<dyn RegionDetector>, image: Arc<RgbImage>) -> Vec<Region> {
    let source = detector.source();
    match tokio::task::spawn_blocking(move || detector.detect(&image)).await {
        Ok(regions) => regions,
        Err(e) => {
            tracing::warn!(?source, "detector task failed: {e}");
            Vec::new()
        }
    }
}

fn save_debug_images(dir: &Path, image: &RgbImage, elements: &[Element]) -> DeskPilotResult<()> {
    std::fs::create_dir_all(dir)?;
    let to_err = |e: image::ImageError| DeskPilotError::Perception(format!("save: {e}"));
    image.save(dir.join(RAW_SCREENSHOT_FILE)).map_err(to_err)?;
    annotator::annotate(image, elements)
        .save(dir.join(ANNOTATED_SCREENSHOT_FILE))
        .map_err(to_err)?;
    tracing::debug!(dir = %dir.display(), "debug screenshots written");
    Ok(())
}

/// Latest element table, shared between the dispatcher and its handlers.
///
/// Each analysis swaps in a whole new `Arc`; readers keep the snapshot they
/// cloned and never see a partially updated table.
pub struct ScreenState {
    analyzer: Arc<ScreenAnalyzer>,
    latest: RwLock<Arc<ElementTable>>,
}

impl ScreenState {
    pub fn new(analyzer: Arc<ScreenAnalyzer>) -> Self {
        Self {
            analyzer,
            latest: RwLock::new(Arc::new(ElementTable::default())),
        }
    }

    pub async fn snapshot(&self) -> Arc<ElementTable> {
        Arc::clone(&*self.latest.read().await)
    }

    /// Replace the latest snapshot wholesale.
    pub async fn publish(&self, table: ElementTable) -> Arc<ElementTable> {
        let table = Arc::new(table);
        *self.latest.write().await = Arc::clone(&table);
        table
    }

    /// Re-analyse the screen and publish the result.
    pub async fn refresh(&self) -> Arc<ElementTable> {
        let table = self.analyzer.analyze().await;
        self.publish(table).await
    }

    /// Look `needle` up in the latest snapshot; on a miss, re-analyse once
    /// and look again.
    pub async fn find_or_refresh(&self, needle: &str) -> Option<Element> {
        if let Some(found) = self.snapshot().await.find_by_text(needle) {
            return Some(found.clone());
        }
        tracing::debug!(needle, "not in snapshot, re-analysing screen");
        self.refresh().await.find_by_text(needle).cloned()
    }
}

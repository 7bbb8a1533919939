/// Element materialisation: attaches extracted text to every deduplicated
/// region and assigns the per-analysis ids.
use std::sync::Arc;

use image::RgbImage;

use crate::perception::traits::TextExtractor;
use crate::perception::types::{Element, Region};

pub struct ElementMaterializer {
    extractor: Arc<dyn TextExtractor>,
}

impl ElementMaterializer {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// One element per region, `id` = position in `regions`.
    ///
    /// Regions are clamped to the image before cropping. A region that lies
    /// entirely outside the image, or whose extraction fails, still gets an
    /// element with empty text.
    pub async fn materialize(&self, image: &RgbImage, regions: &[Region]) -> Vec<Element> {
        let mut elements = Vec::with_capacity(regions.len());
        for (id, region) in regions.iter().enumerate() {
            let text = self.text_for(image, region).await;
            elements.push(Element {
                id,
                bounds: *region,
                text,
            });
        }
        tracing::debug!(
            count = elements.len(),
            with_text = elements.iter().filter(|e| e.has_text()).count(),
            "elements materialised"
        );
        elements
    }

    async fn text_for(&self, image: &RgbImage, region: &Region) -> String {
        let Some(clamped) = region.clamp_to(image.width(), image.height()) else {
            return String::new();
        };
        let crop =
            image::imageops::crop_imm(image, clamped.x, clamped.y, clamped.width, clamped.height)
                .to_image();

        match self.extractor.extract_text(&crop).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(?region, "text extraction failed: {e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedExtractor;

    #[tokio::test]
    async fn ids_follow_input_order_and_text_is_trimmed() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![
            Ok("  Submit \n".into()),
            Ok("Cancel".into()),
            Ok(String::new()),
        ]));
        let materializer = ElementMaterializer::new(extractor.clone());
        let image = RgbImage::new(200, 100);
        let regions = [
            Region::new(0, 0, 50, 20),
            Region::new(60, 0, 50, 20),
            Region::new(120, 0, 50, 20),
        ];

        let elements = materializer.materialize(&image, &regions).await;

        let ids: Vec<usize> = elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(elements[0].text, "Submit");
        assert_eq!(elements[1].text, "Cancel");
        assert_eq!(elements[2].text, "");
        assert_eq!(elements[1].bounds, regions[1]);
        assert_eq!(extractor.crop_sizes(), vec![(50, 20), (50, 20), (50, 20)]);
    }

    #[tokio::test]
    async fn failed_extraction_leaves_empty_text_and_continues() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![
            Ok("First".into()),
            Err("engine crashed".into()),
            Ok("Third".into()),
        ]));
        let materializer = ElementMaterializer::new(extractor);
        let image = RgbImage::new(100, 100);
        let regions = [
            Region::new(0, 0, 10, 10),
            Region::new(20, 0, 10, 10),
            Region::new(40, 0, 10, 10),
        ];

        let elements = materializer.materialize(&image, &regions).await;

        let texts: Vec<&str> = elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["First", "", "Third"]);
    }

    #[tokio::test]
    async fn regions_past_the_edge_are_clamped_or_skipped() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Ok("edge".into())]));
        let materializer = ElementMaterializer::new(extractor.clone());
        let image = RgbImage::new(100, 50);
        let regions = [Region::new(90, 40, 30, 30), Region::new(150, 0, 10, 10)];

        let elements = materializer.materialize(&image, &regions).await;

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text, "edge");
        assert_eq!(elements[1].text, "");
        // Only the clamped crop reached the extractor.
        assert_eq!(extractor.crop_sizes(), vec![(10, 10)]);
    }

    #[tokio::test]
    async fn no_regions_no_elements() {
        let materializer = ElementMaterializer::new(Arc::new(ScriptedExtractor::new(Vec::new())));
        assert!(materializer.materialize(&RgbImage::new(10, 10), &[]).await.is_empty());
    }
}

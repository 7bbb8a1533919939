pub mod aggregator;
pub mod annotator;
pub mod color_detector;
pub mod edge_detector;
pub mod imaging;
pub mod materializer;
pub mod ocr;
pub mod pipeline;
pub mod screenshot;
pub mod text_detector;
pub mod traits;
pub mod types;

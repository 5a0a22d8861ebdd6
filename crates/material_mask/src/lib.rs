//! # Material Mask
//!
//! Turns instance segmentation predictions for furniture photos into compact
//! polygon payloads and human-review overlays.
//!
//! ## Core Features
//!
//! - **Polygon extraction**: rasterize each predicted instance, trace its outer
//!   boundaries and simplify them with a perimeter-relative Douglas-Peucker tolerance
//! - **Result payloads**: per-instance mask records plus the detected material
//!   categories, serializable as JSON or GeoJSON
//! - **Review overlays**: translucent class-colored masks, boxes and confidence labels
//! - **Model boundary**: any backend behind [`SegmentationModel`], shared once per process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use material_mask::{ProcessorConfig, RecordedModel, Segmenter, SharedModel};
//!
//! let model = SharedModel::load(|| RecordedModel::from_file("predictions.json"));
//! let segmenter = Segmenter::new(model, ProcessorConfig::default())?;
//!
//! let payload = segmenter.segment_file("chair.jpg")?;
//! payload.save_json("chair.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Review Overlay
//!
//! ```rust,no_run
//! use material_mask::{Prediction, ProcessorConfig, ResultAggregator};
//!
//! let aggregator = ResultAggregator::new(&ProcessorConfig::default())?;
//! let image = image::open("chair.jpg")?.to_rgb8();
//! let predictions = vec![
//!     Prediction::new("wood", 0.92).with_points(vec![[10.0, 10.0], [120.0, 10.0], [120.0, 90.0]]),
//! ];
//!
//! let annotation = aggregator.annotate(&image, &predictions);
//! annotation.save(std::path::Path::new("out"), "chair", aggregator.catalog())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod algorithms;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod error;
pub mod io;
pub mod mask;
pub mod model;
pub mod rasterize;
pub mod traits;
pub mod types;
pub mod yolo;

pub use aggregator::{Annotation, AnnotationFiles, ResultAggregator, Segmenter};
pub use algorithms::{extract_polygons, DefaultPolygonExtractor, PolygonExtractor};
pub use catalog::{MaterialCatalog, MaterialInfo};
pub use compositor::{Compositor, OverlayElement};
pub use config::{DebugMaskConfig, DebugMaskNaming, ProcessorConfig};
pub use error::{MaskError, Result};
pub use mask::{BinaryMask, ClassMasks};
pub use model::{ChannelOrder, CommandModel, RecordedModel, SharedModel};
pub use rasterize::rasterize_instance;
pub use traits::*;
pub use types::{
    BoundingBox, ClassLabel, MaskRecord, MaterialCategory, Polygon, Prediction, PredictionGroup,
    ResultPayload,
};
pub use yolo::{read_yolo_seg_file, YoloDataset};

use image::RgbImage;
use crate::{
    error::Result,
    mask::BinaryMask,
    types::{Polygon, PredictionGroup},
};

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract closed contours (pixel positions, no repeated closing point) from a mask
    fn extract_contours(&self, mask: &BinaryMask) -> Vec<Vec<[i32; 2]>>;
}

/// Trait for contour simplification algorithms
pub trait PolygonSimplifier: Send + Sync {
    /// Reduce the point count of one closed contour
    fn simplify(&self, contour: &[[i32; 2]]) -> Polygon;
}

/// An already-loaded instance segmentation backend.
///
/// Implementations normalize whatever their backend returns into
/// [`crate::types::Prediction`]s. The model is shared read-only between calls.
pub trait SegmentationModel: Send + Sync {
    /// Run inference on an RGB image
    fn infer(&self, image: &RgbImage) -> Result<Vec<PredictionGroup>>;

    /// Human readable backend name, used in logs
    fn name(&self) -> &str;
}

use std::path::Path;

use image::RgbImage;

use crate::{
    error::{MaskError, Result},
    model::raw::parse_inference,
    traits::SegmentationModel,
    types::PredictionGroup,
};

/// Replays predictions captured from a hosted inference endpoint.
#[derive(Debug, Clone)]
pub struct RecordedModel {
    name: String,
    groups: Vec<PredictionGroup>,
    normalized: bool,
}

impl RecordedModel {
    pub fn new(groups: Vec<PredictionGroup>) -> Self {
        Self {
            name: "recorded".to_string(),
            groups,
            normalized: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(parse_inference(json)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MaskError::FileNotFound { path: path.to_path_buf() });
        }
        let mut model = Self::from_json(&std::fs::read_to_string(path)?)?;
        model.name = format!("recorded:{}", path.display());
        Ok(model)
    }

    /// Treat point coordinates as fractions of the image size
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }
}

impl SegmentationModel for RecordedModel {
    fn infer(&self, image: &RgbImage) -> Result<Vec<PredictionGroup>> {
        if !self.normalized {
            return Ok(self.groups.clone());
        }
        let (width, height) = image.dimensions();
        Ok(self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .cloned()
                    .map(|prediction| prediction.denormalized(width, height))
                    .collect()
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_groups() {
        let model = RecordedModel::from_json(
            r#"{"predictions": [{"class": "wood", "points": [{"x": 1, "y": 2}]}]}"#,
        )
        .unwrap();
        let groups = model.infer(&RgbImage::new(10, 10)).unwrap();
        assert_eq!(groups[0][0].points, vec![[1.0, 2.0]]);
    }

    #[test]
    fn test_normalized_points_scale_with_image() {
        let model = RecordedModel::from_json(
            r#"[{"class": "wood", "points": [{"x": 0.5, "y": 0.5}]}]"#,
        )
        .unwrap()
        .normalized(true);
        let groups = model.infer(&RgbImage::new(200, 100)).unwrap();
        assert_eq!(groups[0][0].points, vec![[100.0, 50.0]]);
    }

    #[test]
    fn test_missing_file() {
        let err = RecordedModel::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, MaskError::FileNotFound { .. }));
    }
}

//! Wire shapes of hosted-inference responses and their normalization into
//! [`Prediction`]s. Every field is optional on the wire.

use serde::Deserialize;

use crate::{
    error::{MaskError, Result},
    types::{BoundingBox, ClassLabel, Prediction, PredictionGroup},
};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrediction {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub class_id: Option<u32>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub points: Option<Vec<RawPoint>>,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub bbox: Option<Vec<f32>>,
}

impl RawPrediction {
    pub fn into_prediction(self) -> Result<Prediction> {
        let class = match (self.class.or(self.class_name), self.class_id) {
            (Some(name), _) => ClassLabel::Name(name),
            (None, Some(id)) => ClassLabel::Id(id),
            (None, None) => {
                return Err(MaskError::InvalidPrediction(
                    "prediction has neither a class name nor a class id".to_string(),
                ))
            }
        };

        let bbox = match (self.x, self.y, self.width, self.height) {
            (Some(x), Some(y), Some(width), Some(height)) => {
                Some(BoundingBox::Center { x, y, width, height })
            }
            _ => self.bbox.as_deref().and_then(|values| match values {
                &[a, b, c, d] => Some(BoundingBox::Raw { values: [a, b, c, d] }),
                _ => None,
            }),
        };

        Ok(Prediction {
            class,
            confidence: self.confidence,
            points: self
                .points
                .unwrap_or_default()
                .into_iter()
                .map(|p| [p.x, p.y])
                .collect(),
            bbox,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawGroup {
    Response { predictions: Vec<RawPrediction> },
    List(Vec<RawPrediction>),
}

impl RawGroup {
    pub fn into_group(self) -> Result<PredictionGroup> {
        let predictions = match self {
            Self::Response { predictions } | Self::List(predictions) => predictions,
        };
        predictions.into_iter().map(RawPrediction::into_prediction).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawInference {
    Many(Vec<RawGroup>),
    One(RawGroup),
}

/// Parse one inference result: a response object, a list of predictions, or a
/// list of either.
pub fn parse_inference(json: &str) -> Result<Vec<PredictionGroup>> {
    let groups = match serde_json::from_str::<RawInference>(json)? {
        RawInference::Many(groups) => groups,
        RawInference::One(group) => vec![group],
    };
    groups.into_iter().map(RawGroup::into_group).collect()
}

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use geo_types::{Coord, LineString, Polygon as GeoPolygon};

/// Ordered, implicitly closed ring of integer pixel positions (at least 3 points).
pub type Polygon = Vec<[i32; 2]>;

/// Class identifier as reported by a model: a name, or a bare numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Name(String),
    Id(u32),
}

impl ClassLabel {
    /// Lower-cased key used for palette and category lookups
    pub fn key(&self) -> String {
        match self {
            Self::Name(name) => name.to_lowercase(),
            Self::Id(id) => id.to_string(),
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for ClassLabel {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Box fields as they arrive from a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum BoundingBox {
    /// Center point plus extent
    Center { x: f32, y: f32, width: f32, height: f32 },
    /// Either `[x1, y1, x2, y2]` or `[x, y, w, h]`
    Raw { values: [f32; 4] },
}

impl BoundingBox {
    /// Resolve to integer corners.
    ///
    /// A raw box is read as corners when its third value exceeds the first and
    /// its fourth exceeds the second; otherwise as origin plus width/height.
    pub fn corners(&self) -> PixelBox {
        match *self {
            Self::Center { x, y, width, height } => PixelBox {
                x1: (x - width / 2.0) as i32,
                y1: (y - height / 2.0) as i32,
                x2: (x + width / 2.0) as i32,
                y2: (y + height / 2.0) as i32,
            },
            Self::Raw { values: [a, b, c, d] } => {
                if c > a && d > b {
                    PixelBox { x1: a as i32, y1: b as i32, x2: c as i32, y2: d as i32 }
                } else {
                    let (x1, y1) = (a as i32, b as i32);
                    PixelBox { x1, y1, x2: x1.saturating_add(c as i32), y2: y1.saturating_add(d as i32) }
                }
            }
        }
    }
}

/// Integer corner-form rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Normalized model output for one detected instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: ClassLabel,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Polygon vertices in absolute pixel coordinates; empty for box-only detections
    #[serde(default)]
    pub points: Vec<[f32; 2]>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

/// What a prediction can contribute to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionShape {
    Polygon,
    BoxOnly,
    Unrecognized,
}

impl Prediction {
    pub fn new(class: impl Into<ClassLabel>, confidence: f32) -> Self {
        Self {
            class: class.into(),
            confidence: Some(confidence),
            points: Vec::new(),
            bbox: None,
        }
    }

    pub fn with_points(mut self, points: Vec<[f32; 2]>) -> Self {
        self.points = points;
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Confidence, 1.0 when the model did not report one
    pub fn confidence(&self) -> f32 {
        self.confidence.unwrap_or(1.0)
    }

    pub fn shape(&self) -> PredictionShape {
        if !self.points.is_empty() {
            PredictionShape::Polygon
        } else if self.bbox.is_some() {
            PredictionShape::BoxOnly
        } else {
            PredictionShape::Unrecognized
        }
    }

    /// Scale normalized `[0, 1]` coordinates into pixel space.
    pub fn denormalized(mut self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        for point in &mut self.points {
            point[0] *= w;
            point[1] *= h;
        }
        self
    }
}

/// One batch of predictions returned by a single model call.
pub type PredictionGroup = Vec<Prediction>;

/// One exported polygon with its class, confidence and display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MaskRecord {
    pub class: String,
    pub confidence: f32,
    pub points: Polygon,
    pub rgb_color: [u8; 3],
}

impl MaskRecord {
    pub fn to_geo_polygon(&self) -> GeoPolygon<f64> {
        let coords: Vec<Coord<f64>> = self.points
            .iter()
            .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
            .collect();
        GeoPolygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area in square pixels
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MaterialCategory {
    pub id: u32,
    pub name: String,
}

/// The externally consumed result of processing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResultPayload {
    pub width: u32,
    pub height: u32,
    pub masks: Vec<MaskRecord>,
    pub material_categories: Vec<MaterialCategory>,
}

impl ResultPayload {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            masks: Vec::new(),
            material_categories: Vec::new(),
        }
    }
}

use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    error::Result,
    types::{MaskRecord, ResultPayload},
};

fn ring(points: &[[i32; 2]]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = points.iter().map(|&[x, y]| vec![x as f64, y as f64]).collect();
    // GeoJSON rings repeat their first position
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}

fn number(value: f64) -> JsonValue {
    Number::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null)
}

impl MaskRecord {
    /// Polygon feature in pixel coordinates, carrying class, confidence and color
    pub fn to_feature(&self, id: usize) -> Feature {
        let mut properties = Map::new();
        properties.insert("class".to_string(), JsonValue::String(self.class.clone()));
        properties.insert("confidence".to_string(), number(self.confidence as f64));
        properties.insert(
            "rgb_color".to_string(),
            JsonValue::Array(self.rgb_color.iter().map(|&c| JsonValue::from(c)).collect()),
        );
        properties.insert("area".to_string(), number(self.area()));

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring(&self.points)]))),
            id: Some(geojson::feature::Id::Number(Number::from(id))),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

impl ResultPayload {
    /// Every mask as a feature; image size and categories ride along as foreign members
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let features = self
            .masks
            .iter()
            .enumerate()
            .map(|(i, record)| record.to_feature(i))
            .collect();

        let mut foreign_members = Map::new();
        foreign_members.insert("image_width".to_string(), JsonValue::from(self.width));
        foreign_members.insert("image_height".to_string(), JsonValue::from(self.height));
        foreign_members.insert(
            "material_categories".to_string(),
            serde_json::to_value(&self.material_categories)?,
        );

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson()?)?)
    }

    pub fn save_geojson(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    /// The payload itself as pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

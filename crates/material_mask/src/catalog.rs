use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::MaterialCategory;

/// Color used for classes missing from the catalog (yellow)
pub const DEFAULT_COLOR: [u8; 3] = [255, 255, 0];

/// Stable id, canonical display name and RGB color of one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MaterialInfo {
    pub id: u32,
    pub name: String,
    pub color: [u8; 3],
}

impl MaterialInfo {
    fn new(id: u32, name: &str, color: [u8; 3]) -> Self {
        Self { id, name: name.to_string(), color }
    }
}

/// Lookup table from lower-cased material name to its [`MaterialInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaterialCatalog {
    entries: IndexMap<String, MaterialInfo>,
    #[serde(default = "default_color")]
    fallback_color: [u8; 3],
}

fn default_color() -> [u8; 3] {
    DEFAULT_COLOR
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        let entries = [
            ("fabric", MaterialInfo::new(1, "Fabric", [0, 0, 255])),
            ("upholstery", MaterialInfo::new(2, "Upholstery", [0, 0, 255])),
            ("wood", MaterialInfo::new(3, "Wood", [139, 69, 19])),
            ("metal", MaterialInfo::new(4, "Metal", [255, 0, 0])),
            ("glass", MaterialInfo::new(5, "Glass", [0, 191, 255])),
            ("stone", MaterialInfo::new(6, "Stone", [128, 128, 128])),
            ("plastic", MaterialInfo::new(7, "Plastic", [0, 255, 0])),
        ]
        .into_iter()
        .map(|(key, info)| (key.to_string(), info))
        .collect();

        Self {
            entries,
            fallback_color: DEFAULT_COLOR,
        }
    }
}

impl MaterialCatalog {
    /// Add or replace an entry. The key is lower-cased.
    pub fn insert(&mut self, key: &str, info: MaterialInfo) {
        self.entries.insert(key.to_lowercase(), info);
    }

    /// Apply overrides on top of the current entries
    pub fn extend(&mut self, overrides: &IndexMap<String, MaterialInfo>) {
        for (key, info) in overrides {
            self.insert(key, info.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&MaterialInfo> {
        self.entries.get(key)
    }

    /// Display color for a normalized class key
    pub fn color_for(&self, key: &str) -> [u8; 3] {
        self.get(key).map_or(self.fallback_color, |info| info.color)
    }

    /// Summary entry for a known material, `None` for anything else
    pub fn category_for(&self, key: &str) -> Option<MaterialCategory> {
        self.get(key).map(|info| MaterialCategory {
            id: info.id,
            name: info.name.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let catalog = MaterialCatalog::default();
        assert_eq!(catalog.color_for("metal"), [255, 0, 0]);
        assert_eq!(catalog.color_for("plastic"), [0, 255, 0]);
        assert_eq!(catalog.color_for("upholstery"), [0, 0, 255]);
        assert_eq!(catalog.color_for("wood"), [139, 69, 19]);
        assert_eq!(catalog.color_for("velvet"), DEFAULT_COLOR);
    }

    #[test]
    fn test_categories_only_for_known_materials() {
        let catalog = MaterialCatalog::default();
        assert_eq!(
            catalog.category_for("metal"),
            Some(MaterialCategory { id: 4, name: "Metal".to_string() })
        );
        assert_eq!(catalog.category_for("velvet"), None);
    }

    #[test]
    fn test_overrides_are_lowercased() {
        let mut catalog = MaterialCatalog::default();
        let mut overrides = IndexMap::new();
        overrides.insert("Leather".to_string(), MaterialInfo::new(8, "Leather", [90, 50, 20]));
        catalog.extend(&overrides);

        assert_eq!(catalog.color_for("leather"), [90, 50, 20]);
        assert_eq!(catalog.len(), 8);
    }
}

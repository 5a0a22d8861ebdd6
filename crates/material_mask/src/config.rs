use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::catalog::{MaterialCatalog, MaterialInfo};

/// How per-instance debug masks are named on disk.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DebugMaskNaming {
    /// `{base}_{class}_mask.png`; a later instance of a class replaces the earlier file
    #[default]
    PerClass,
    /// `{base}_{class}_{index}_mask.png`; one file per instance
    PerInstance,
}

impl DebugMaskNaming {
    pub fn file_name(&self, base: &str, class_key: &str, index: usize) -> String {
        let class_key = sanitize(class_key);
        match self {
            Self::PerClass => format!("{base}_{class_key}_mask.png"),
            Self::PerInstance => format!("{base}_{class_key}_{index}_mask.png"),
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// File name up to its first dot: `chair.v2.jpg` gives `chair`
pub fn base_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Where and how debug masks are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DebugMaskConfig {
    /// Directory receiving the PNGs
    pub dir: PathBuf,
    /// File stem shared by every mask of one source image
    pub base_filename: String,
    #[serde(default)]
    pub naming: DebugMaskNaming,
}

impl DebugMaskConfig {
    /// Masks next to `image` (or in `dir` when given), named after its base name
    pub fn for_image(image: &Path, dir: Option<&Path>, naming: DebugMaskNaming) -> Self {
        let dir = dir
            .map(Path::to_path_buf)
            .or_else(|| image.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self {
            dir,
            base_filename: base_filename(image),
            naming,
        }
    }

    pub fn path_for(&self, class_key: &str, index: usize) -> PathBuf {
        self.dir.join(self.naming.file_name(&self.base_filename, class_key, index))
    }
}

/// Tunables for polygon extraction and visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Douglas-Peucker tolerance as a fraction of each contour's perimeter
    #[schemars(range(min = 0.0, max = 0.5))]
    pub simplify_ratio: f64,
    /// Simplified contours with fewer points are dropped (never below 3)
    #[schemars(range(min = 3))]
    pub min_polygon_points: usize,
    /// Weight of the class color added onto masked pixels
    #[schemars(range(min = 0.0, max = 1.0))]
    pub mask_alpha: f32,
    /// Bounding box stroke width in pixels
    pub box_thickness: u32,
    /// Label glyph height in pixels
    pub label_font_size: f32,
    /// TrueType font file for box labels; the bundled DejaVu Sans when unset
    pub font_path: Option<PathBuf>,
    /// Write every instance mask as a PNG; disabled when unset
    pub debug_masks: Option<DebugMaskNaming>,
    /// Directory for debug masks; defaults to the source image's directory
    pub debug_dir: Option<PathBuf>,
    /// Extra or replacement catalog entries keyed by material name
    pub catalog_overrides: IndexMap<String, MaterialInfo>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            simplify_ratio: 0.005,
            min_polygon_points: 3,
            mask_alpha: 0.5,
            box_thickness: 3,
            label_font_size: 32.0,
            font_path: None,
            debug_masks: None,
            debug_dir: None,
            catalog_overrides: IndexMap::new(),
        }
    }
}

impl ProcessorConfig {
    /// Default catalog with this config's overrides applied
    pub fn catalog(&self) -> MaterialCatalog {
        let mut catalog = MaterialCatalog::default();
        catalog.extend(&self.catalog_overrides);
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_debug_naming() {
        assert_eq!(DebugMaskNaming::PerClass.file_name("chair", "metal", 2), "chair_metal_mask.png");
        assert_eq!(DebugMaskNaming::PerInstance.file_name("chair", "metal", 2), "chair_metal_2_mask.png");
        assert_eq!(DebugMaskNaming::from_str("per_instance").unwrap(), DebugMaskNaming::PerInstance);
    }

    #[test]
    fn test_class_keys_are_sanitized() {
        assert_eq!(DebugMaskNaming::PerClass.file_name("a", "steel/chrome", 0), "a_steel_chrome_mask.png");
    }

    #[test]
    fn test_debug_config_for_image() {
        let config = DebugMaskConfig::for_image(Path::new("/uploads/chair.v2.jpg"), None, DebugMaskNaming::PerClass);
        assert_eq!(config.base_filename, "chair");
        assert_eq!(config.path_for("metal", 0), Path::new("/uploads/chair_metal_mask.png"));

        let elsewhere = DebugMaskConfig::for_image(
            Path::new("/uploads/chair.jpg"),
            Some(Path::new("/tmp/debug")),
            DebugMaskNaming::PerInstance,
        );
        assert_eq!(elsewhere.path_for("wood", 1), Path::new("/tmp/debug/chair_wood_1_mask.png"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ProcessorConfig = serde_json::from_str(r#"{ "mask_alpha": 0.3 }"#).unwrap();
        assert_eq!(config.mask_alpha, 0.3);
        assert_eq!(config.simplify_ratio, 0.005);
        assert_eq!(config.box_thickness, 3);
    }
}

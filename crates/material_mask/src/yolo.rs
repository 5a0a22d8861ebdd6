//! Ground-truth reading for YOLO segmentation datasets.
//!
//! A label file holds one instance per line: a class id followed by normalized
//! `x y` pairs. Class ids resolve to names through the dataset's `data.yaml`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::{MaskError, Result},
    types::{ClassLabel, Prediction},
};

/// Class id plus absolute polygon points for one label line.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloInstance {
    pub class_id: u32,
    pub points: Vec<[f32; 2]>,
}

fn parse_line(line: &str, width: u32, height: u32) -> Option<YoloInstance> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    // class id and at least two coordinates
    if parts.len() < 5 {
        return None;
    }
    let class_id = parts[0].parse().ok()?;
    let coords: Vec<f32> = parts[1..]
        .iter()
        .map(|value| value.parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    let points = coords
        .chunks_exact(2)
        .map(|pair| [pair[0] * width as f32, pair[1] * height as f32])
        .collect();
    Some(YoloInstance { class_id, points })
}

/// Read every usable instance of a label file, scaled to `width` x `height`
pub fn read_yolo_seg_file(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Vec<YoloInstance>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MaskError::FileNotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path)?;

    let mut instances = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        match parse_line(line, width, height) {
            Some(instance) => instances.push(instance),
            None if !line.trim().is_empty() => {
                warn!(file = %path.display(), line = number + 1, "skipping unusable label line");
            }
            None => {}
        }
    }
    Ok(instances)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<u32, String>),
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    #[serde(default)]
    names: Option<ClassNames>,
}

/// A YOLO dataset root with its class names.
#[derive(Debug, Clone)]
pub struct YoloDataset {
    root: PathBuf,
    names: BTreeMap<u32, String>,
}

impl YoloDataset {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(MaskError::FileNotFound { path: root.to_path_buf() });
        }

        let yaml_path = root.join("data.yaml");
        let names = if yaml_path.exists() {
            let data: DataYaml = serde_yaml::from_str(&std::fs::read_to_string(&yaml_path)?)?;
            match data.names {
                Some(ClassNames::List(names)) => (0..).zip(names).collect(),
                Some(ClassNames::Map(names)) => names,
                None => BTreeMap::new(),
            }
        } else {
            warn!(root = %root.display(), "data.yaml not found; classes will be shown by id");
            BTreeMap::new()
        };
        debug!(root = %root.display(), classes = names.len(), "opened dataset");

        Ok(Self {
            root: root.to_path_buf(),
            names,
        })
    }

    /// Display name for a class id, `class_{id}` when unnamed
    pub fn class_name(&self, class_id: u32) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// Label file for `image`: beside it, in a sibling `labels` dir, or under the dataset root
    pub fn label_path_for(&self, image: &Path) -> Result<PathBuf> {
        let stem = image.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        let mut file_name = stem;
        file_name.push(".txt");

        let image_dir = image.parent().unwrap_or_else(|| Path::new(""));
        let candidates = [
            image_dir.join(&file_name),
            image_dir.join("..").join("labels").join(&file_name),
            self.root.join("labels").join(&file_name),
        ];

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| MaskError::MissingLabelSource { image: image.to_path_buf() })
    }

    /// Labelled instances of `image` as full-confidence polygon predictions
    pub fn predictions_for(&self, image: &Path, width: u32, height: u32) -> Result<Vec<Prediction>> {
        let label_path = self.label_path_for(image)?;
        let instances = read_yolo_seg_file(&label_path, width, height)?;
        Ok(instances
            .into_iter()
            .map(|instance| {
                Prediction::new(ClassLabel::Name(self.class_name(instance.class_id)), 1.0)
                    .with_points(instance.points)
            })
            .collect())
    }
}

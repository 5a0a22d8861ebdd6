use material_mask::{
    ChannelOrder, CommandModel, MaskError, ProcessorConfig, RecordedModel, SharedModel,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    MaskError(#[from] MaskError),
    #[error("No images listed in job file")]
    NoImages,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Where predictions come from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// Predictions captured earlier, replayed for every image
    Recorded {
        path: PathBuf,
        #[serde(default)]
        normalized: bool,
    },
    /// External program called once per image with the image path appended
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        channel_order: ChannelOrder,
        #[serde(default)]
        normalized: bool,
    },
}

impl ModelSource {
    /// Construct the process-wide model. A failure leaves it permanently unavailable.
    pub fn load(&self) -> SharedModel {
        match self {
            Self::Recorded { path, normalized } => {
                SharedModel::load(|| RecordedModel::from_file(path).map(|m| m.normalized(*normalized)))
            }
            Self::Command { program, args, channel_order, normalized } => {
                let model = CommandModel::new(program.clone())
                    .args(args.iter().cloned())
                    .channel_order(*channel_order)
                    .normalized(*normalized);
                SharedModel::new(model)
            }
        }
    }
}

/// One image of a batch job
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ImageEntry {
    pub path: PathBuf,
    /// Also render the review overlay and per-class masks
    #[serde(default)]
    pub overlay: bool,
}

/// Batch job definition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SegmentJob {
    pub output_dir: PathBuf,
    pub model: ModelSource,
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Also write each payload as GeoJSON
    #[serde(default)]
    pub geojson: bool,
    pub images: Vec<ImageEntry>,
}

impl SegmentJob {
    /// Load SegmentJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load SegmentJob configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let job: SegmentJob = toml::from_str(content)?;
        job.validate()
    }

    /// Load SegmentJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load SegmentJob configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let job: SegmentJob = serde_json::from_str(content)?;
        job.validate()
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    fn validate(self) -> Result<Self, CliError> {
        if self.images.is_empty() {
            return Err(CliError::NoImages);
        }
        Ok(self)
    }

    /// Convert SegmentJob to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert SegmentJob to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// JSON schema of the job file
    pub fn schema_json() -> Result<String, CliError> {
        let schema = schemars::schema_for!(SegmentJob);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use material_mask::DebugMaskNaming;

    const JOB_TOML: &str = r#"
output_dir = "out"
geojson = true

[model]
kind = "command"
program = "python"
args = ["infer.py", "--weights", "best.pt"]
channel_order = "bgr"

[processor]
mask_alpha = 0.4
debug_masks = "per_instance"

[processor.catalog_overrides.leather]
id = 8
name = "Leather"
color = [120, 60, 20]

[[images]]
path = "photos/sofa.jpg"
overlay = true

[[images]]
path = "photos/chair.jpg"
"#;

    #[test]
    fn test_job_from_toml() {
        let job = SegmentJob::from_toml(JOB_TOML).unwrap();
        assert_eq!(job.images.len(), 2);
        assert!(job.images[0].overlay);
        assert!(!job.images[1].overlay);
        assert_eq!(job.processor.mask_alpha, 0.4);
        assert_eq!(job.processor.box_thickness, 3);
        assert_eq!(job.processor.debug_masks, Some(DebugMaskNaming::PerInstance));
        assert_eq!(job.processor.catalog().color_for("leather"), [120, 60, 20]);
        assert!(matches!(
            job.model,
            ModelSource::Command { channel_order: ChannelOrder::Bgr, .. }
        ));
    }

    #[test]
    fn test_toml_and_json_agree() {
        let job = SegmentJob::from_toml(JOB_TOML).unwrap();
        let json = job.to_json().unwrap();
        assert_eq!(SegmentJob::from_json(&json).unwrap(), job);
    }

    #[test]
    fn test_empty_job_is_rejected() {
        let err = SegmentJob::from_json(
            r#"{"output_dir": "out", "model": {"kind": "recorded", "path": "p.json"}, "images": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::NoImages));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            SegmentJob::from_file("job.yaml"),
            Err(CliError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_missing_recordings_leave_model_unavailable() {
        let source = ModelSource::Recorded {
            path: PathBuf::from("/no/such/predictions.json"),
            normalized: false,
        };
        assert!(!source.load().is_available());
    }

    #[test]
    fn test_schema_mentions_model_kinds() {
        let schema = SegmentJob::schema_json().unwrap();
        assert!(schema.contains("recorded"));
        assert!(schema.contains("images"));
    }
}

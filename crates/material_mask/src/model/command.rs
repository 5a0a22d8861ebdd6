use std::process::Command;

use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    model::raw::parse_inference,
    traits::SegmentationModel,
    types::PredictionGroup,
};

/// Channel order expected by an external backend.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Convert an RGB image into this order. The only place channels are swapped.
    pub fn encode(&self, image: &RgbImage) -> RgbImage {
        match self {
            Self::Rgb => image.clone(),
            Self::Bgr => {
                let mut swapped = image.clone();
                for pixel in swapped.pixels_mut() {
                    pixel.0.swap(0, 2);
                }
                swapped
            }
        }
    }
}

/// Runs an external inference program once per image.
///
/// The image is written to a temporary PNG whose path is appended as the last
/// argument; the program prints its predictions as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
    channel_order: ChannelOrder,
    normalized: bool,
}

impl CommandModel {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            channel_order: ChannelOrder::Rgb,
            normalized: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Treat returned point coordinates as fractions of the image size
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }
}

impl SegmentationModel for CommandModel {
    fn infer(&self, image: &RgbImage) -> Result<Vec<PredictionGroup>> {
        let input = tempfile::Builder::new()
            .prefix("segment-input-")
            .suffix(".png")
            .tempfile()?;
        self.channel_order
            .encode(image)
            .save_with_format(input.path(), image::ImageFormat::Png)?;

        debug!(program = %self.program, input = %input.path().display(), "running inference command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input.path())
            .output()
            .map_err(|e| MaskError::Inference(format!("failed to start {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(MaskError::Inference(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let groups = parse_inference(&stdout)
            .map_err(|e| MaskError::Inference(format!("unreadable output from {}: {e}", self.program)))?;

        if !self.normalized {
            return Ok(groups);
        }
        let (width, height) = image.dimensions();
        Ok(groups
            .into_iter()
            .map(|group| group.into_iter().map(|p| p.denormalized(width, height)).collect())
            .collect())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bgr_swaps_red_and_blue() {
        let image = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        assert_eq!(ChannelOrder::Bgr.encode(&image).get_pixel(0, 0), &Rgb([30, 20, 10]));
        assert_eq!(ChannelOrder::Rgb.encode(&image).get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_parses_program_stdout() {
        let model = CommandModel::new("sh").args([
            "-c",
            r#"test -f "$0" && echo '{"predictions":[{"class":"metal","confidence":0.7}]}'"#,
        ]);
        let groups = model.infer(&RgbImage::new(8, 8)).unwrap();
        assert_eq!(groups[0][0].confidence, Some(0.7));
    }

    #[test]
    fn test_failing_program_is_inference_error() {
        let model = CommandModel::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let err = model.infer(&RgbImage::new(8, 8)).unwrap_err();
        assert!(matches!(err, MaskError::Inference(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn test_missing_program_is_inference_error() {
        let model = CommandModel::new("/no/such/segmenter");
        assert!(matches!(model.infer(&RgbImage::new(2, 2)), Err(MaskError::Inference(_))));
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    /// The shared segmentation model never finished construction.
    #[error("Segmentation model unavailable: {0}")]
    ModelUnavailable(String),

    /// The backing inference call failed. Never retried.
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("No label file found for image: {}", image.display())]
    MissingLabelSource { image: PathBuf },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("Invalid font: {0}")]
    InvalidFont(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;

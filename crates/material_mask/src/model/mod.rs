pub mod command;
pub mod raw;
pub mod recorded;

pub use command::{ChannelOrder, CommandModel};
pub use raw::parse_inference;
pub use recorded::RecordedModel;

use std::{fmt, sync::Arc};

use image::RgbImage;
use tracing::{error, info};

use crate::{
    error::{MaskError, Result},
    traits::SegmentationModel,
    types::PredictionGroup,
};

enum ModelState {
    Ready(Box<dyn SegmentationModel>),
    Failed(String),
}

/// Process-wide, initialize-once handle to the segmentation model.
///
/// Construction happens once, at startup. When it fails the handle stays
/// unavailable: every later call gets [`MaskError::ModelUnavailable`] and no
/// re-initialization is attempted. Clones share the same read-only model.
#[derive(Clone)]
pub struct SharedModel {
    state: Arc<ModelState>,
}

impl SharedModel {
    pub fn new(model: impl SegmentationModel + 'static) -> Self {
        Self {
            state: Arc::new(ModelState::Ready(Box::new(model))),
        }
    }

    /// Run `init` once and keep either the model or the failure reason
    pub fn load<M, E, F>(init: F) -> Self
    where
        M: SegmentationModel + 'static,
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<M, E>,
    {
        match init() {
            Ok(model) => {
                info!(model = model.name(), "Segmentation model loaded");
                Self::new(model)
            }
            Err(e) => {
                error!("Error loading segmentation model: {e}");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ModelState::Failed(reason.into())),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.state, ModelState::Ready(_))
    }

    pub fn get(&self) -> Result<&dyn SegmentationModel> {
        match &*self.state {
            ModelState::Ready(model) => Ok(model.as_ref()),
            ModelState::Failed(reason) => Err(MaskError::ModelUnavailable(reason.clone())),
        }
    }

    /// Infer through the shared model. Failures are returned as is, never retried.
    pub fn infer(&self, image: &RgbImage) -> Result<Vec<PredictionGroup>> {
        self.get()?.infer(image)
    }
}

impl fmt::Debug for SharedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state {
            ModelState::Ready(model) => f.debug_tuple("SharedModel").field(&model.name()).finish(),
            ModelState::Failed(reason) => f.debug_struct("SharedModel").field("failed", reason).finish(),
        }
    }
}

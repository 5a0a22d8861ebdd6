use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use image::RgbImage;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    algorithms::DefaultPolygonExtractor,
    catalog::MaterialCatalog,
    compositor::{Compositor, OverlayElement},
    config::{base_filename, DebugMaskConfig, DebugMaskNaming, ProcessorConfig},
    error::Result,
    mask::{BinaryMask, ClassMasks},
    model::SharedModel,
    rasterize::rasterize_instance,
    types::{MaskRecord, Prediction, PredictionShape, ResultPayload},
};

/// Turns one image's predictions into a [`ResultPayload`] or an annotated composite.
///
/// Holds no per-image state: every mask and canvas is allocated inside the call.
pub struct ResultAggregator {
    catalog: MaterialCatalog,
    extractor: DefaultPolygonExtractor,
    compositor: Compositor,
}

impl ResultAggregator {
    pub fn new(config: &ProcessorConfig) -> Result<Self> {
        let mut extractor = DefaultPolygonExtractor::with_ratio(config.simplify_ratio);
        extractor.min_points = config.min_polygon_points;
        Ok(Self {
            catalog: config.catalog(),
            extractor,
            compositor: Compositor::from_config(config)?,
        })
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Polygon records and detected-material summary for `predictions` on `image`
    pub fn process(&self, image: &RgbImage, predictions: &[Prediction]) -> Result<ResultPayload> {
        self.process_with_debug(image, predictions, None)
    }

    /// [`Self::process`], additionally writing every instance mask as a 0/255 PNG
    pub fn process_with_debug(
        &self,
        image: &RgbImage,
        predictions: &[Prediction],
        debug_masks: Option<&DebugMaskConfig>,
    ) -> Result<ResultPayload> {
        let (width, height) = image.dimensions();
        let mut payload = ResultPayload::empty(width, height);
        let mut detected: IndexSet<String> = IndexSet::new();
        let mut instance_counts: HashMap<String, usize> = HashMap::new();

        for prediction in predictions {
            // every reported class counts as detected, drawable or not
            let key = prediction.class.key();
            detected.insert(key.clone());
            match prediction.shape() {
                PredictionShape::Unrecognized => {
                    debug!(class = %prediction.class, "skipping prediction without points or box");
                    continue;
                }
                PredictionShape::BoxOnly => continue,
                PredictionShape::Polygon => {}
            }

            let mask = rasterize_instance(&prediction.points, width, height);
            let polygons = self.extractor.extract(&mask);
            let color = self.catalog.color_for(&key);
            debug!(class = %prediction.class, polygons = polygons.len(), "extracted instance");

            payload.masks.extend(polygons.into_iter().map(|points| MaskRecord {
                class: prediction.class.to_string(),
                confidence: prediction.confidence(),
                points,
                rgb_color: color,
            }));

            if let Some(debug_masks) = debug_masks {
                let index = instance_counts.entry(key.clone()).or_default();
                let path = debug_masks.path_for(&key, *index);
                *index += 1;
                std::fs::create_dir_all(&debug_masks.dir)?;
                mask.save_png(&path)?;
                debug!(path = %path.display(), "wrote instance mask");
            }
        }

        payload.material_categories = detected
            .iter()
            .filter_map(|key| self.catalog.category_for(key))
            .collect();

        Ok(payload)
    }

    /// Class masks and the review composite for `predictions` on `image`
    pub fn annotate(&self, image: &RgbImage, predictions: &[Prediction]) -> Annotation {
        let (width, height) = image.dimensions();
        let mut class_masks = ClassMasks::new(width, height);

        let instance_masks: Vec<Option<BinaryMask>> = predictions
            .iter()
            .map(|prediction| match prediction.shape() {
                PredictionShape::Polygon => Some(rasterize_instance(&prediction.points, width, height)),
                PredictionShape::BoxOnly | PredictionShape::Unrecognized => None,
            })
            .collect();

        let mut elements = Vec::with_capacity(predictions.len());
        for (prediction, mask) in predictions.iter().zip(&instance_masks) {
            let element = OverlayElement {
                class: &prediction.class,
                confidence: prediction.confidence(),
                mask: mask.as_ref(),
                bbox: prediction.bbox.map(|bbox| bbox.corners()),
            };
            if !element.is_drawable() {
                continue;
            }
            match mask {
                Some(mask) => class_masks.accumulate(&prediction.class, mask),
                None => {
                    class_masks.touch(&prediction.class);
                }
            }
            elements.push(element);
        }

        let composite = self.compositor.draw_overlay(image, &elements);
        Annotation {
            composite,
            class_masks,
            drawn: elements.len(),
        }
    }
}

/// Output of [`ResultAggregator::annotate`].
#[derive(Debug, Clone)]
pub struct Annotation {
    pub composite: RgbImage,
    pub class_masks: ClassMasks,
    /// Number of predictions that contributed a mask or a box
    pub drawn: usize,
}

/// One written class mask with the color it is rendered in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedClassMask {
    pub filename: PathBuf,
    pub color: [u8; 3],
}

/// Files written by [`Annotation::save`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationFiles {
    pub result: PathBuf,
    pub masks: IndexMap<String, SavedClassMask>,
}

impl Annotation {
    /// Write `{base}_{class}_mask.png` per class and the composite as `{base}_result.jpg`
    pub fn save(&self, dir: &Path, base: &str, catalog: &MaterialCatalog) -> Result<AnnotationFiles> {
        std::fs::create_dir_all(dir)?;

        let mut masks = IndexMap::new();
        for (key, accumulated) in self.class_masks.iter() {
            let filename = dir.join(DebugMaskNaming::PerClass.file_name(base, key, 0));
            accumulated.mask.save_png(&filename)?;
            masks.insert(
                key.to_string(),
                SavedClassMask { filename, color: catalog.color_for(key) },
            );
        }

        let result = dir.join(format!("{base}_result.jpg"));
        self.composite.save(&result)?;
        info!(path = %result.display(), classes = masks.len(), "Result saved");

        Ok(AnnotationFiles { result, masks })
    }
}

/// Segmentation front door: an injected shared model plus an aggregator.
pub struct Segmenter {
    model: SharedModel,
    aggregator: ResultAggregator,
    config: ProcessorConfig,
}

impl Segmenter {
    pub fn new(model: SharedModel, config: ProcessorConfig) -> Result<Self> {
        Ok(Self {
            aggregator: ResultAggregator::new(&config)?,
            model,
            config,
        })
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Debug mask destination for `path`, when debug masks are enabled
    fn debug_masks_for(&self, path: &Path) -> Option<DebugMaskConfig> {
        self.config
            .debug_masks
            .map(|naming| DebugMaskConfig::for_image(path, self.config.debug_dir.as_deref(), naming))
    }

    /// All predictions of every group the model returned, in order
    pub fn predict(&self, image: &RgbImage) -> Result<Vec<Prediction>> {
        let groups = self.model.infer(image)?;
        Ok(groups.into_iter().flatten().collect())
    }

    /// Decode and segment an image file.
    ///
    /// Fails with `ModelUnavailable` before touching the file when the model
    /// never loaded.
    pub fn segment_file(&self, path: impl AsRef<Path>) -> Result<ResultPayload> {
        let path = path.as_ref();
        self.model.get()?;

        let image = image::open(path)?.to_rgb8();
        let predictions = self.predict(&image)?;
        let debug_masks = self.debug_masks_for(path);

        let payload = self
            .aggregator
            .process_with_debug(&image, &predictions, debug_masks.as_ref())?;
        info!(
            image = %path.display(),
            masks = payload.masks.len(),
            categories = payload.material_categories.len(),
            "Segmented image"
        );
        Ok(payload)
    }

    pub fn segment_image(&self, image: &RgbImage) -> Result<ResultPayload> {
        let predictions = self.predict(image)?;
        self.aggregator.process(image, &predictions)
    }

    /// Decode, segment and render the review composite for an image file
    pub fn annotate_file(&self, path: impl AsRef<Path>) -> Result<(ResultPayload, Annotation)> {
        let path = path.as_ref();
        self.model.get()?;

        let image = image::open(path)?.to_rgb8();
        let predictions = self.predict(&image)?;
        let debug_masks = self.debug_masks_for(path);
        let payload = self
            .aggregator
            .process_with_debug(&image, &predictions, debug_masks.as_ref())?;
        let annotation = self.aggregator.annotate(&image, &predictions);
        debug!(image = %path.display(), base = %base_filename(path), drawn = annotation.drawn, "annotated");
        Ok((payload, annotation))
    }
}

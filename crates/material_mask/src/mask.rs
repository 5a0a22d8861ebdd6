use std::path::Path;

use image::{GrayImage, Luma};
use indexmap::IndexMap;

use crate::{error::Result, types::ClassLabel};

/// Height × width grid of 0/1 cells matching the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Zero-initialized mask
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Wrap a grayscale image, mapping every nonzero pixel to 1
    pub fn from_gray(image: &GrayImage) -> Self {
        let mut mask = image.clone();
        for pixel in mask.pixels_mut() {
            pixel[0] = u8::from(pixel[0] > 0);
        }
        Self(mask)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.0.put_pixel(x, y, Luma([u8::from(value)]));
    }

    /// Number of set cells
    pub fn area(&self) -> u64 {
        self.0.pixels().filter(|p| p[0] != 0).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.0.pixels().all(|p| p[0] == 0)
    }

    /// Pixelwise logical OR of `other` into `self`
    pub fn union_with(&mut self, other: &BinaryMask) {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        for (dst, src) in self.0.pixels_mut().zip(other.0.pixels()) {
            dst[0] |= src[0];
        }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub(crate) fn as_gray_mut(&mut self) -> &mut GrayImage {
        &mut self.0
    }

    /// Viewable single-channel copy with set cells at 255
    pub fn to_luma_image(&self) -> GrayImage {
        let mut image = self.0.clone();
        for pixel in image.pixels_mut() {
            pixel[0] = if pixel[0] != 0 { 255 } else { 0 };
        }
        image
    }

    /// Write as a 0/255 PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_luma_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Union of every instance mask seen for one class.
#[derive(Debug, Clone)]
pub struct MaskAccumulator {
    /// Label of the first instance seen for this class
    pub label: ClassLabel,
    pub mask: BinaryMask,
    pub instances: usize,
}

/// Per-class accumulated masks keyed by normalized class name, in first-seen order.
#[derive(Debug, Clone)]
pub struct ClassMasks {
    width: u32,
    height: u32,
    entries: IndexMap<String, MaskAccumulator>,
}

impl ClassMasks {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            entries: IndexMap::new(),
        }
    }

    /// Register a class without contributing pixels (keeps first-seen order)
    pub fn touch(&mut self, label: &ClassLabel) -> &mut MaskAccumulator {
        let (width, height) = (self.width, self.height);
        self.entries
            .entry(label.key())
            .or_insert_with(|| MaskAccumulator {
                label: label.clone(),
                mask: BinaryMask::new(width, height),
                instances: 0,
            })
    }

    /// OR an instance mask into its class accumulator
    pub fn accumulate(&mut self, label: &ClassLabel, instance: &BinaryMask) {
        let entry = self.touch(label);
        entry.mask.union_with(instance);
        entry.instances += 1;
    }

    pub fn get(&self, key: &str) -> Option<&MaskAccumulator> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries keyed by normalized class name, in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaskAccumulator)> {
        self.entries.iter().map(|(key, acc)| (key.as_str(), acc))
    }
}

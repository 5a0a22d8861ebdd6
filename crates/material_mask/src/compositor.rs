//! Human-review rendering: translucent instance masks, class-colored boxes and
//! confidence labels drawn over a copy of the source image.
//!
//! Everything here works in RGB. Palette colors are RGB and the returned image can
//! be saved as is.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use tracing::trace;

use crate::{
    catalog::MaterialCatalog,
    config::ProcessorConfig,
    error::{MaskError, Result},
    mask::BinaryMask,
    types::{ClassLabel, PixelBox},
};

const TEXT_OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// One drawable detection. Elements with neither a mask nor a box draw nothing.
#[derive(Debug, Clone)]
pub struct OverlayElement<'a> {
    pub class: &'a ClassLabel,
    pub confidence: f32,
    pub mask: Option<&'a BinaryMask>,
    pub bbox: Option<PixelBox>,
}

impl OverlayElement<'_> {
    pub fn label_text(&self) -> String {
        format!("{}: {:.2}", self.class, self.confidence)
    }

    pub fn is_drawable(&self) -> bool {
        self.mask.is_some() || self.bbox.is_some()
    }
}

pub struct Compositor {
    catalog: MaterialCatalog,
    alpha: f32,
    box_thickness: u32,
    scale: PxScale,
    font: FontArc,
}

/// DejaVu Sans, used for labels unless a font file is configured
const DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Box corners further than this outside the canvas are pulled in; nothing visible changes
const OFFSCREEN_MARGIN: i64 = 1 << 16;

pub fn default_font() -> Result<FontArc> {
    FontArc::try_from_slice(DEFAULT_FONT).map_err(|e| MaskError::InvalidFont(format!("bundled font: {e}")))
}

impl Compositor {
    /// Default tunables with the bundled label font
    pub fn new(catalog: MaterialCatalog) -> Result<Self> {
        let defaults = ProcessorConfig::default();
        Ok(Self {
            catalog,
            alpha: defaults.mask_alpha,
            box_thickness: defaults.box_thickness,
            scale: PxScale::from(defaults.label_font_size),
            font: default_font()?,
        })
    }

    /// Build from config, loading the label font file when one is configured
    pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
        let mut compositor = Self::new(config.catalog())?;
        compositor.alpha = config.mask_alpha;
        compositor.box_thickness = config.box_thickness;
        compositor.scale = PxScale::from(config.label_font_size);
        if let Some(path) = &config.font_path {
            compositor.font = load_font(path)?;
        }
        Ok(compositor)
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    /// Composite every element, in order, onto a copy of `image`
    pub fn draw_overlay(&self, image: &RgbImage, elements: &[OverlayElement<'_>]) -> RgbImage {
        let mut canvas = image.clone();

        for element in elements {
            if !element.is_drawable() {
                trace!(class = %element.class, "nothing to draw");
                continue;
            }
            let color = Rgb(self.catalog.color_for(&element.class.key()));

            if let Some(mask) = element.mask {
                self.blend_mask(&mut canvas, mask, color);
            }
            if let Some(bbox) = element.bbox {
                let bbox = pull_onto_canvas(bbox, canvas.width(), canvas.height());
                self.draw_box(&mut canvas, bbox, color);
                self.draw_label(&mut canvas, bbox, &element.label_text(), color);
            }
        }

        canvas
    }

    /// `dst = saturate(src + alpha * color)` on set mask cells only
    pub fn blend_mask(&self, canvas: &mut RgbImage, mask: &BinaryMask, color: Rgb<u8>) {
        let (width, height) = canvas.dimensions();
        let (mask_width, mask_height) = mask.dimensions();
        for y in 0..height.min(mask_height) {
            for x in 0..width.min(mask_width) {
                if !mask.get(x, y) {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(x, y);
                for (channel, tint) in pixel.0.iter_mut().zip(color.0) {
                    let blended = *channel as f32 + self.alpha * tint as f32;
                    *channel = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    fn draw_box(&self, canvas: &mut RgbImage, bbox: PixelBox, color: Rgb<u8>) {
        let (x1, x2) = (bbox.x1.min(bbox.x2), bbox.x1.max(bbox.x2));
        let (y1, y2) = (bbox.y1.min(bbox.y2), bbox.y1.max(bbox.y2));

        // stroke is centered on the box edge
        let thickness = self.box_thickness.clamp(1, 256) as i32;
        let inner = -(thickness - 1) / 2;
        for offset in inner..inner + thickness {
            let width = x2 - x1 + 2 * offset + 1;
            let height = y2 - y1 + 2 * offset + 1;
            if width <= 0 || height <= 0 {
                continue;
            }
            let rect = Rect::at(x1 - offset, y1 - offset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, bbox: PixelBox, text: &str, color: Rgb<u8>) {
        let (text_w, text_h) = text_size(self.scale, &self.font, text);

        let x = bbox.x1.min(bbox.x2);
        let y = bbox.y1.min(bbox.y2);
        let background = Rect::at(x, y - text_h as i32 - 10).of_size(text_w.max(1) + 1, text_h + 11);
        draw_filled_rect_mut(canvas, background, color);

        let top = y - 5 - text_h as i32;
        for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
            draw_text_mut(canvas, TEXT_OUTLINE, x + dx, top + dy, self.scale, &self.font, text);
        }
        draw_text_mut(canvas, TEXT_FILL, x, top, self.scale, &self.font, text);
    }
}

/// Clamp corners into `[-margin, size + margin]` so stroke and label arithmetic stays in range
fn pull_onto_canvas(bbox: PixelBox, width: u32, height: u32) -> PixelBox {
    let clamp = |v: i32, size: u32| {
        (v as i64).clamp(-OFFSCREEN_MARGIN, size as i64 + OFFSCREEN_MARGIN) as i32
    };
    PixelBox {
        x1: clamp(bbox.x1, width),
        y1: clamp(bbox.y1, height),
        x2: clamp(bbox.x2, width),
        y2: clamp(bbox.y2, height),
    }
}

/// Read a TrueType/OpenType font for label rendering
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MaskError::FileNotFound { path: path.to_path_buf() });
    }
    let data = std::fs::read(path)?;
    FontArc::try_from_vec(data).map_err(|e| MaskError::InvalidFont(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rasterize::rasterize_instance, types::BoundingBox};

    fn gray_image(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_blend_restricted_to_mask() {
        let image = gray_image(40, 40, 100);
        let mask = rasterize_instance(&[[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]], 40, 40);
        let metal = ClassLabel::from("metal");

        let compositor = Compositor::new(MaterialCatalog::default()).unwrap();
        let out = compositor.draw_overlay(
            &image,
            &[OverlayElement { class: &metal, confidence: 0.9, mask: Some(&mask), bbox: None }],
        );

        // red channel saturates, the others are untouched by a zero tint
        assert_eq!(out.get_pixel(5, 5), &Rgb([228, 100, 100]));
        assert_eq!(out.get_pixel(20, 20), &Rgb([100, 100, 100]));
    }

    #[test]
    fn test_blending_is_cumulative_in_order() {
        let image = gray_image(20, 20, 0);
        let mask = rasterize_instance(&[[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]], 20, 20);
        let metal = ClassLabel::from("metal");
        let element = OverlayElement { class: &metal, confidence: 1.0, mask: Some(&mask), bbox: None };

        let out = Compositor::new(MaterialCatalog::default()).unwrap().draw_overlay(&image, &[element.clone(), element]);
        assert_eq!(out.get_pixel(2, 2), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_unknown_class_is_yellow() {
        let image = gray_image(10, 10, 0);
        let mask = rasterize_instance(&[[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]], 10, 10);
        let velvet = ClassLabel::from("Velvet");
        let out = Compositor::new(MaterialCatalog::default()).unwrap().draw_overlay(
            &image,
            &[OverlayElement { class: &velvet, confidence: 1.0, mask: Some(&mask), bbox: None }],
        );
        assert_eq!(out.get_pixel(4, 4), &Rgb([128, 128, 0]));
    }

    #[test]
    fn test_box_stroke_is_three_pixels() {
        let image = gray_image(100, 100, 0);
        let wood = ClassLabel::from("wood");
        let bbox = PixelBox { x1: 20, y1: 60, x2: 80, y2: 90 };
        let out = Compositor::new(MaterialCatalog::default()).unwrap().draw_overlay(
            &image,
            &[OverlayElement { class: &wood, confidence: 0.75, mask: None, bbox: Some(bbox) }],
        );

        let brown = Rgb([139, 69, 19]);
        assert_eq!(out.get_pixel(50, 89), &brown);
        assert_eq!(out.get_pixel(50, 90), &brown);
        assert_eq!(out.get_pixel(50, 91), &brown);
        assert_eq!(out.get_pixel(50, 88), &Rgb([0, 0, 0]));
        // label background sits above the top edge, below the text baseline
        assert_eq!(out.get_pixel(22, 58), &brown);
        assert_eq!(out.get_pixel(50, 75), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_element_without_geometry_draws_nothing() {
        let image = gray_image(30, 30, 42);
        let metal = ClassLabel::from("metal");
        let out = Compositor::new(MaterialCatalog::default()).unwrap().draw_overlay(
            &image,
            &[OverlayElement { class: &metal, confidence: 0.5, mask: None, bbox: None }],
        );
        assert_eq!(out, image);
    }

    #[test]
    fn test_label_text() {
        let metal = ClassLabel::from("Metal");
        let element = OverlayElement { class: &metal, confidence: 0.876, mask: None, bbox: None };
        assert_eq!(element.label_text(), "Metal: 0.88");
    }

    #[test]
    fn test_missing_font_file() {
        let err = load_font("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, MaskError::FileNotFound { .. }));
    }

    #[test]
    fn test_label_text_has_outline_and_fill() {
        let image = gray_image(240, 120, 0);
        let wood = ClassLabel::from("wood");
        let bbox = PixelBox { x1: 20, y1: 70, x2: 200, y2: 110 };
        let compositor = Compositor::new(MaterialCatalog::default()).unwrap();
        let out = compositor.draw_overlay(
            &image,
            &[OverlayElement { class: &wood, confidence: 0.75, mask: None, bbox: Some(bbox) }],
        );

        let (text_w, text_h) = text_size(compositor.scale, &compositor.font, "wood: 0.75");
        assert!(text_w > 0 && text_h > 0);

        let band_top = 70 - text_h - 10;
        let mut white = 0;
        let mut dark = 0;
        for y in band_top..70 {
            for x in 20..20 + text_w {
                let p = out.get_pixel(x, y).0;
                if p.iter().all(|&c| c >= 240) {
                    white += 1;
                }
                // well below the brown background's red channel only where the outline dominates
                if p[0] <= 60 {
                    dark += 1;
                }
            }
        }
        assert!(white > 0, "no white fill pixels in label");
        assert!(dark > 0, "no black outline pixels in label");
    }

    #[test]
    fn test_far_out_of_frame_box_is_drawn_safely() {
        let image = gray_image(50, 30, 0);
        let wood = ClassLabel::from("wood");
        let bbox = BoundingBox::Raw { values: [-3e9, 0.0, 3e9, 10.0] }.corners();
        let out = Compositor::new(MaterialCatalog::default()).unwrap().draw_overlay(
            &image,
            &[OverlayElement { class: &wood, confidence: 0.5, mask: None, bbox: Some(bbox) }],
        );

        let brown = Rgb([139, 69, 19]);
        assert_eq!(out.get_pixel(25, 10), &brown);
        assert_eq!(out.get_pixel(25, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_configured_font_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.ttf");
        std::fs::write(&path, DEFAULT_FONT).unwrap();
        let config = ProcessorConfig { font_path: Some(path), ..ProcessorConfig::default() };
        assert!(Compositor::from_config(&config).is_ok());

        let broken = dir.path().join("broken.ttf");
        std::fs::write(&broken, b"not a font").unwrap();
        let config = ProcessorConfig { font_path: Some(broken), ..ProcessorConfig::default() };
        assert!(matches!(Compositor::from_config(&config), Err(MaskError::InvalidFont(_))));
    }
}

pub mod extraction;
pub mod simplification;

pub use extraction::*;
pub use simplification::*;

use crate::{
    mask::BinaryMask,
    traits::{ContourExtractor, PolygonSimplifier},
    types::Polygon,
};

/// Contours shorter than this are never emitted
pub const MIN_POLYGON_POINTS: usize = 3;

/// Contour extraction followed by simplification and the point-count filter
#[derive(Debug, Clone)]
pub struct PolygonExtractor<C, S>
where
    C: ContourExtractor,
    S: PolygonSimplifier,
{
    pub contour_extractor: C,
    pub simplifier: S,
    pub min_points: usize,
}

impl<C, S> PolygonExtractor<C, S>
where
    C: ContourExtractor,
    S: PolygonSimplifier,
{
    pub fn new(contour_extractor: C, simplifier: S) -> Self {
        Self {
            contour_extractor,
            simplifier,
            min_points: MIN_POLYGON_POINTS,
        }
    }

    /// Simplified outer polygons of `mask`. Degenerate contours are dropped.
    pub fn extract(&self, mask: &BinaryMask) -> Vec<Polygon> {
        self.contour_extractor
            .extract_contours(mask)
            .iter()
            .map(|contour| self.simplifier.simplify(contour))
            .filter(|polygon| polygon.len() >= self.min_points.max(MIN_POLYGON_POINTS))
            .collect()
    }
}

pub type DefaultPolygonExtractor = PolygonExtractor<ExternalContourExtractor, PerimeterDouglasPeucker>;

impl Default for DefaultPolygonExtractor {
    fn default() -> Self {
        Self::new(ExternalContourExtractor, PerimeterDouglasPeucker::default())
    }
}

impl DefaultPolygonExtractor {
    pub fn with_ratio(ratio: f64) -> Self {
        Self::new(ExternalContourExtractor, PerimeterDouglasPeucker { ratio })
    }
}

/// Outer polygons of a binary mask, simplified with `epsilon = 0.005 × perimeter`
pub fn extract_polygons(mask: &BinaryMask) -> Vec<Polygon> {
    DefaultPolygonExtractor::default().extract(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::rasterize_instance;

    #[test]
    fn test_empty_mask_has_no_polygons() {
        let mask = BinaryMask::new(100, 100);
        assert!(extract_polygons(&mask).is_empty());
    }

    #[test]
    fn test_triangle_yields_three_points() {
        let mask = rasterize_instance(&[[10.0, 10.0], [190.0, 10.0], [100.0, 190.0]], 200, 200);
        let polygons = extract_polygons(&mask);

        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 3);
    }

    #[test]
    fn test_repeatable() {
        let mask = rasterize_instance(
            &[[5.0, 5.0], [80.0, 12.0], [60.0, 70.0], [30.0, 40.0], [8.0, 60.0]],
            100,
            100,
        );
        assert_eq!(extract_polygons(&mask), extract_polygons(&mask));
    }

    #[test]
    fn test_every_polygon_has_three_points() {
        let mut mask = BinaryMask::new(50, 50);
        // isolated pixels and a thin line produce degenerate contours
        mask.set(3, 3, true);
        mask.set(40, 5, true);
        mask.set(41, 5, true);
        for x in 10..40 {
            for y in 20..35 {
                mask.set(x, y, true);
            }
        }

        let polygons = extract_polygons(&mask);
        assert!(!polygons.is_empty());
        assert!(polygons.iter().all(|polygon| polygon.len() >= 3));
    }

    #[test]
    fn test_disjoint_regions_yield_separate_polygons() {
        let mut mask = rasterize_instance(&[[2.0, 2.0], [30.0, 2.0], [30.0, 30.0], [2.0, 30.0]], 100, 100);
        mask.union_with(&rasterize_instance(
            &[[60.0, 60.0], [90.0, 60.0], [90.0, 90.0], [60.0, 90.0]],
            100,
            100,
        ));
        assert_eq!(extract_polygons(&mask).len(), 2);
    }
}

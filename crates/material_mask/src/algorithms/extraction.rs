use imageproc::contours::{find_contours, BorderType};
use crate::{mask::BinaryMask, traits::ContourExtractor};

/// Outer-border-only contour extractor built on imageproc's border following.
///
/// Holes, and blobs nested inside holes, are not reported.
#[derive(Debug, Clone, Default)]
pub struct ExternalContourExtractor;

impl ContourExtractor for ExternalContourExtractor {
    fn extract_contours(&self, mask: &BinaryMask) -> Vec<Vec<[i32; 2]>> {
        find_contours::<i32>(mask.as_gray())
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                let mut points: Vec<[i32; 2]> = Vec::with_capacity(contour.points.len());
                for p in &contour.points {
                    if points.last() != Some(&[p.x, p.y]) {
                        points.push([p.x, p.y]);
                    }
                }
                while points.len() > 1 && points.first() == points.last() {
                    points.pop();
                }
                points
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(mask: &mut BinaryMask, x0: u32, y0: u32, x1: u32, y1: u32, value: bool) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.set(x, y, value);
            }
        }
    }

    #[test]
    fn test_ignores_holes() {
        let mut mask = BinaryMask::new(60, 60);
        fill(&mut mask, 10, 10, 50, 50, true);
        fill(&mut mask, 20, 20, 40, 40, false);

        let contours = ExternalContourExtractor.extract_contours(&mask);
        assert_eq!(contours.len(), 1);
    }

    #[test]
    fn test_ignores_blob_inside_hole() {
        let mut mask = BinaryMask::new(80, 80);
        fill(&mut mask, 5, 5, 75, 75, true);
        fill(&mut mask, 20, 20, 60, 60, false);
        fill(&mut mask, 35, 35, 45, 45, true);

        let contours = ExternalContourExtractor.extract_contours(&mask);
        assert_eq!(contours.len(), 1);
    }

    #[test]
    fn test_disjoint_blobs() {
        let mut mask = BinaryMask::new(60, 30);
        fill(&mut mask, 2, 2, 12, 12, true);
        fill(&mut mask, 30, 5, 50, 25, true);

        let contours = ExternalContourExtractor.extract_contours(&mask);
        assert_eq!(contours.len(), 2);
        for contour in &contours {
            assert_ne!(contour.first(), contour.last());
        }
    }
}

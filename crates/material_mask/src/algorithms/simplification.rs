use geo_types::{Coord, LineString};
use crate::{traits::PolygonSimplifier, types::Polygon};

/// Length of a contour including its closing segment
pub fn closed_perimeter(contour: &[[i32; 2]]) -> f64 {
    use geo::EuclideanLength;

    let mut ring = to_linestring(contour);
    ring.close();
    ring.euclidean_length()
}

fn to_linestring(points: &[[i32; 2]]) -> LineString<f64> {
    points
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect::<Vec<_>>()
        .into()
}

fn farthest_from(contour: &[[i32; 2]], origin: usize) -> usize {
    let [ox, oy] = contour[origin];
    let mut best = origin;
    let mut best_dist = 0i64;
    for (i, &[x, y]) in contour.iter().enumerate() {
        let (dx, dy) = ((x - ox) as i64, (y - oy) as i64);
        let dist = dx * dx + dy * dy;
        if dist > best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Closed-curve Douglas-Peucker with a tolerance proportional to the perimeter.
///
/// The ring is split at its two mutually distant points and each half is simplified
/// with geo's Ramer-Douglas-Peucker, so larger shapes merge points over larger
/// distances.
#[derive(Debug, Clone)]
pub struct PerimeterDouglasPeucker {
    /// Fraction of the closed perimeter used as the distance tolerance
    pub ratio: f64,
}

impl Default for PerimeterDouglasPeucker {
    fn default() -> Self {
        Self { ratio: 0.005 }
    }
}

impl PolygonSimplifier for PerimeterDouglasPeucker {
    fn simplify(&self, contour: &[[i32; 2]]) -> Polygon {
        use geo::Simplify;

        if contour.len() < 3 {
            return contour.to_vec();
        }

        let epsilon = self.ratio * closed_perimeter(contour);

        let start = farthest_from(contour, 0);
        let mut ring = contour.to_vec();
        ring.rotate_left(start);
        let split = farthest_from(&ring, 0);
        if split == 0 {
            // every point coincides
            return vec![ring[0]];
        }

        let first_half = to_linestring(&ring[..=split]).simplify(&epsilon);
        let mut second = ring[split..].to_vec();
        second.push(ring[0]);
        let second_half = to_linestring(&second).simplify(&epsilon);

        let mut polygon: Polygon = first_half
            .coords()
            .map(|c| [c.x.round() as i32, c.y.round() as i32])
            .collect();
        let tail: Vec<Coord<f64>> = second_half.coords().copied().collect();
        if tail.len() > 2 {
            polygon.extend(
                tail[1..tail.len() - 1]
                    .iter()
                    .map(|c| [c.x.round() as i32, c.y.round() as i32]),
            );
        }
        polygon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_ring(x0: i32, y0: i32, size: i32) -> Vec<[i32; 2]> {
        let mut ring = Vec::new();
        for x in x0..x0 + size {
            ring.push([x, y0]);
        }
        for y in y0..y0 + size {
            ring.push([x0 + size, y]);
        }
        for x in (x0 + 1..=x0 + size).rev() {
            ring.push([x, y0 + size]);
        }
        for y in (y0 + 1..=y0 + size).rev() {
            ring.push([x0, y]);
        }
        ring
    }

    #[test]
    fn test_perimeter_of_square() {
        let ring = vec![[0, 0], [10, 0], [10, 10], [0, 10]];
        assert!((closed_perimeter(&ring) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_square_reduces_to_corners() {
        let ring = square_ring(10, 10, 40);
        let simplified = PerimeterDouglasPeucker::default().simplify(&ring);

        assert_eq!(simplified.len(), 4);
        for corner in [[10, 10], [50, 10], [50, 50], [10, 50]] {
            assert!(simplified.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn test_deterministic() {
        let ring = square_ring(3, 7, 25);
        let simplifier = PerimeterDouglasPeucker::default();
        assert_eq!(simplifier.simplify(&ring), simplifier.simplify(&ring));
    }

    #[test]
    fn test_degenerate_contours_pass_through() {
        let simplifier = PerimeterDouglasPeucker::default();
        assert_eq!(simplifier.simplify(&[[1, 1]]), vec![[1, 1]]);
        assert_eq!(simplifier.simplify(&[[1, 1], [1, 1], [1, 1]]), vec![[1, 1]]);
    }
}

use image::Luma;
use imageproc::{
    drawing::{draw_line_segment_mut, draw_polygon_mut},
    point::Point,
};

use crate::mask::BinaryMask;

/// Coordinates are clamped to this magnitude so clipping never sees infinities
const COORD_LIMIT: f64 = 1e12;

/// Fill the polygon described by `points` into a fresh `width` × `height` mask.
///
/// Coordinates are absolute pixels and are truncated toward zero. The polygon is
/// clipped to the frame before any integer conversion, so arbitrarily distant
/// vertices are safe. Fewer than three distinct vertices rasterize as a point or
/// segment, which never yields a polygon downstream.
pub fn rasterize_instance(points: &[[f32; 2]], width: u32, height: u32) -> BinaryMask {
    let mut mask = BinaryMask::new(width, height);

    let ring: Vec<[f64; 2]> = points
        .iter()
        .filter(|[x, y]| !x.is_nan() && !y.is_nan())
        .map(|&[x, y]| {
            [
                (x as f64).clamp(-COORD_LIMIT, COORD_LIMIT),
                (y as f64).clamp(-COORD_LIMIT, COORD_LIMIT),
            ]
        })
        .collect();
    // one pixel of slack keeps edges that run along the border
    let clipped = clip_to_window(ring, [-1.0, -1.0], [width as f64, height as f64]);

    let mut vertices: Vec<Point<i32>> = Vec::with_capacity(clipped.len());
    for [x, y] in clipped {
        let vertex = Point::new(x as i32, y as i32);
        if vertices.last() != Some(&vertex) {
            vertices.push(vertex);
        }
    }
    // imageproc rejects an explicitly closed ring
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    let canvas = mask.as_gray_mut();
    match vertices.as_slice() {
        [] => {}
        [only] => {
            draw_line_segment_mut(
                canvas,
                (only.x as f32, only.y as f32),
                (only.x as f32, only.y as f32),
                Luma([1u8]),
            );
        }
        [start, end] => {
            draw_line_segment_mut(
                canvas,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                Luma([1u8]),
            );
        }
        polygon => draw_polygon_mut(canvas, polygon, Luma([1u8])),
    }

    mask
}

/// Sutherland-Hodgman clipping of a closed ring against an axis-aligned window.
fn clip_to_window(ring: Vec<[f64; 2]>, min: [f64; 2], max: [f64; 2]) -> Vec<[f64; 2]> {
    let mut output = ring;
    for axis in 0..2 {
        for (bound, keep_above) in [(min[axis], true), (max[axis], false)] {
            let inside = |p: &[f64; 2]| {
                if keep_above { p[axis] >= bound } else { p[axis] <= bound }
            };
            let input = std::mem::take(&mut output);
            let Some(&last) = input.last() else {
                return output;
            };
            let mut previous = last;
            for current in input {
                let (cur_in, prev_in) = (inside(&current), inside(&previous));
                if cur_in != prev_in {
                    let t = (bound - previous[axis]) / (current[axis] - previous[axis]);
                    let other = 1 - axis;
                    let mut crossing = [0.0; 2];
                    crossing[axis] = bound;
                    crossing[other] = previous[other] + t * (current[other] - previous[other]);
                    output.push(crossing);
                }
                if cur_in {
                    output.push(current);
                }
                previous = current;
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_square_interior() {
        let mask = rasterize_instance(
            &[[10.0, 10.0], [29.0, 10.0], [29.0, 29.0], [10.0, 29.0]],
            50,
            50,
        );
        assert_eq!(mask.dimensions(), (50, 50));
        assert_eq!(mask.area(), 400);
        assert!(mask.get(20, 20));
        assert!(!mask.get(5, 5));
        assert!(!mask.get(30, 30));
    }

    #[test]
    fn test_closed_ring_is_accepted() {
        let open = rasterize_instance(&[[2.0, 2.0], [12.0, 2.0], [12.0, 12.0]], 20, 20);
        let closed = rasterize_instance(
            &[[2.0, 2.0], [12.0, 2.0], [12.0, 12.0], [2.0, 2.0]],
            20,
            20,
        );
        assert_eq!(open, closed);
        assert!(open.area() > 0);
    }

    #[test]
    fn test_clips_out_of_frame_vertices() {
        let mask = rasterize_instance(
            &[[-10.0, -10.0], [40.0, -10.0], [40.0, 40.0], [-10.0, 40.0]],
            30,
            20,
        );
        assert_eq!(mask.area(), 600);
    }

    #[test]
    fn test_empty_points_yield_empty_mask() {
        let mask = rasterize_instance(&[], 10, 10);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_fresh_buffer_per_call() {
        let first = rasterize_instance(&[[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]], 10, 10);
        let second = rasterize_instance(&[[6.0, 6.0], [9.0, 6.0], [9.0, 9.0]], 10, 10);
        assert!(first.get(4, 1));
        assert!(!second.get(4, 1));
    }

    #[test]
    fn test_huge_coordinates_do_not_overflow() {
        let mask = rasterize_instance(&[[-3e9, -3e9], [3e9, -3e9], [3e9, 3e9]], 20, 20);
        // the triangle is the half of the frame above the diagonal
        assert!(mask.get(15, 2));
        assert!(!mask.get(2, 15));

        let infinite = rasterize_instance(
            &[[f32::NEG_INFINITY, 0.0], [f32::INFINITY, 0.0], [f32::INFINITY, 10.0]],
            20,
            20,
        );
        assert_eq!(infinite.dimensions(), (20, 20));
    }

    #[test]
    fn test_clip_keeps_in_frame_vertices() {
        let clipped = clip_to_window(
            vec![[2.0, 2.0], [8.0, 2.0], [8.0, 8.0]],
            [-1.0, -1.0],
            [10.0, 10.0],
        );
        assert_eq!(clipped, vec![[2.0, 2.0], [8.0, 2.0], [8.0, 8.0]]);
    }
}

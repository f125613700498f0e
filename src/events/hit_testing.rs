//! Geometric hit testing predicates
//!
//! Pure functions over points in a single coordinate space. Malformed input
//! (too few vertices) is a caller bug and reported as [`HitTestError`].

use crate::geometry::Point;

/// Errors raised by malformed hit test input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HitTestError {
    #[error("{shape} needs at least {required} vertices, got {got}")]
    NotEnoughVertices {
        shape: &'static str,
        required: usize,
        got: usize,
    },
}

/// Point within an axis-aligned rectangle, bounds inclusive
pub fn rect_hit(px: f64, py: f64, rx: f64, ry: f64, rw: f64, rh: f64) -> bool {
    px >= rx && px <= rx + rw && py >= ry && py <= ry + rh
}

/// Even-odd ray casting over an implicitly closed vertex list
pub fn polygon_hit(px: f64, py: f64, vertices: &[Point]) -> Result<bool, HitTestError> {
    if vertices.len() < 3 {
        return Err(HitTestError::NotEnoughVertices {
            shape: "polygon",
            required: 3,
            got: vertices.len(),
        });
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > py) != (b.y > py) && px < (b.x - a.x) * (py - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    Ok(inside)
}

/// Index of the first segment of an open polyline within `margin` of the point.
///
/// Segment `i` runs from vertex `i` to vertex `i + 1`. Distance is measured
/// to the closest point on the segment, so the ends are clamped rather than
/// extended.
pub fn line_section_hit(
    px: f64,
    py: f64,
    margin: f64,
    vertices: &[Point],
) -> Result<Option<usize>, HitTestError> {
    if vertices.len() < 2 {
        return Err(HitTestError::NotEnoughVertices {
            shape: "line",
            required: 2,
            got: vertices.len(),
        });
    }

    let point = Point::new(px, py);
    Ok(vertices
        .windows(2)
        .position(|segment| distance_to_segment(point, segment[0], segment[1]) <= margin))
}

/// Euclidean distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return (p.x - a.x).hypot(p.y - a.y);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a.x + t * abx, a.y + t * aby);
    (p.x - cx).hypot(p.y - cy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn test_rect_hit_inclusive_edges() {
        assert!(rect_hit(0.0, 0.0, 0.0, 0.0, 10.0, 10.0));
        assert!(rect_hit(10.0, 10.0, 0.0, 0.0, 10.0, 10.0));
        assert!(!rect_hit(10.5, 5.0, 0.0, 0.0, 10.0, 10.0));
        assert!(!rect_hit(5.0, -0.1, 0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_polygon_hit_concave() {
        // U shape opening upwards
        let u = pts(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);
        assert!(polygon_hit(0.5, 2.0, &u).unwrap());
        assert!(polygon_hit(1.5, 0.5, &u).unwrap());
        assert!(!polygon_hit(1.5, 2.0, &u).unwrap());
        assert!(!polygon_hit(4.0, 1.0, &u).unwrap());
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let err = polygon_hit(0.0, 0.0, &pts(&[(0.0, 0.0), (1.0, 1.0)])).unwrap_err();
        assert_eq!(
            err,
            HitTestError::NotEnoughVertices {
                shape: "polygon",
                required: 3,
                got: 2
            }
        );
    }

    #[test]
    fn test_line_section_picks_segment() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_eq!(line_section_hit(5.0, 3.0, 6.0, &line).unwrap(), Some(0));
        assert_eq!(line_section_hit(13.0, 6.0, 6.0, &line).unwrap(), Some(1));
        assert_eq!(line_section_hit(3.0, 7.0, 6.0, &line).unwrap(), None);
    }

    #[test]
    fn test_line_section_clamps_to_endpoints() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        // On the infinite extension but beyond the margin from the end
        assert_eq!(line_section_hit(20.0, 0.0, 6.0, &line).unwrap(), None);
        assert_eq!(line_section_hit(-4.0, 0.0, 6.0, &line).unwrap(), Some(0));
    }

    #[test]
    fn test_line_needs_two_vertices() {
        assert!(line_section_hit(0.0, 0.0, 1.0, &pts(&[(0.0, 0.0)])).is_err());
    }

    #[test]
    fn test_degenerate_segment_distance() {
        let d = distance_to_segment(Point::new(3.0, 4.0), Point::zero(), Point::zero());
        assert_eq!(d, 5.0);
    }
}

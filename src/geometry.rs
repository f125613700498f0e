//! Basic geometry shared by the viewport, scene and renderer
//!
//! All coordinates are `f64`. Values that cross a coordinate space are
//! rounded with [`round_half_up`] so repeated transforms stay reproducible.

/// Round to the nearest integer, ties toward positive infinity.
///
/// `f64::round` rounds ties away from zero, which makes `-2.5` and `2.5`
/// asymmetric; transforms need the same step on both sides of the origin.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Represents a 2D point with x and y coordinates
///
/// Serialized as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Translate by the given deltas
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// Represents a 2D size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a rectangle with position and size
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f64 {
        self.origin.x
    }

    pub fn y(&self) -> f64 {
        self.origin.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// Inclusive containment test
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x() && point.x <= self.max_x() && point.y >= self.y() && point.y <= self.max_y()
    }

    /// Whether two spans overlap or one fully contains the other.
    ///
    /// Endpoints touching counts as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        span_overlaps(self.x(), self.max_x(), other.x(), other.max_x())
            && span_overlaps(self.y(), self.max_y(), other.y(), other.max_y())
    }
}

fn span_overlaps(start: f64, end: f64, view_start: f64, view_end: f64) -> bool {
    let endpoint_inside = [start, end]
        .iter()
        .any(|v| view_start <= *v && *v <= view_end);
    endpoint_inside || (start < view_start && view_end < end)
}

/// Axis-aligned bounding box of a point list, `None` when empty
pub fn bounding_box(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up_is_symmetric_in_step() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(7.0), 7.0);
    }

    #[test]
    fn test_rect_contains_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_point(Point::new(0.0, 0.0)));
        assert!(rect.contains_point(Point::new(10.0, 10.0)));
        assert!(!rect.contains_point(Point::new(10.1, 5.0)));
    }

    #[test]
    fn test_overlap_partial_and_containment() {
        let view = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(Rect::new(90.0, 90.0, 20.0, 20.0).overlaps(&view));
        assert!(Rect::new(10.0, 10.0, 5.0, 5.0).overlaps(&view));
        // Item larger than the viewport on both axes
        assert!(Rect::new(-50.0, -50.0, 300.0, 300.0).overlaps(&view));
        assert!(!Rect::new(101.0, 0.0, 10.0, 10.0).overlaps(&view));
    }

    #[test]
    fn test_bounding_box() {
        let points = [Point::new(3.0, 4.0), Point::new(-1.0, 10.0), Point::new(5.0, 2.0)];
        let bbox = bounding_box(&points).unwrap();
        assert_eq!(bbox, Rect::new(-1.0, 2.0, 6.0, 8.0));
        assert!(bounding_box(&[]).is_none());
    }
}

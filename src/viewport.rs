//! Viewport state and coordinate transforms
//!
//! Three spaces are involved:
//! - map space: absolute, zoom independent
//! - scaled space: map space times the scale of the current zoom level
//! - screen space: scaled space shifted so the viewport center sits at the
//!   canvas center
//!
//! Every scale step rounds immediately, so `scale(unscale(v))` is only
//! guaranteed to be within one unit of `v`.

use serde::Serialize;

use crate::config::validate_zoom_table;
use crate::geometry::{round_half_up, Point, Rect};
use crate::Error;

/// Position, floor, zoom level and canvas size
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    x: f64,
    y: f64,
    floor: Option<String>,
    level: usize,
    width: f64,
    height: f64,
    level_to_scale: Vec<f64>,
}

/// Derived viewport metrics handed to canvas subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSnapshot {
    pub x: f64,
    pub y: f64,
    pub floor: Option<String>,
    pub level: usize,
    /// One step closer to level 0, clamped
    pub next_level: usize,
    /// One step away from level 0, clamped
    pub previous_level: usize,
    pub width: f64,
    pub height: f64,
    pub normalized_width: f64,
    pub normalized_height: f64,
    pub scaled_x: f64,
    pub scaled_y: f64,
    pub left_x: f64,
    pub top_y: f64,
    pub right_x: f64,
    pub bottom_y: f64,
    pub screen_left_x: f64,
    pub screen_top_y: f64,
    pub screen_right_x: f64,
    pub screen_bottom_y: f64,
}

impl Viewport {
    /// Create a viewport at the origin with no floor selected
    pub fn new(level_to_scale: Vec<f64>) -> Result<Self, Error> {
        validate_zoom_table(&level_to_scale)?;
        Ok(Self {
            x: 0.0,
            y: 0.0,
            floor: None,
            level: 0,
            width: 0.0,
            height: 0.0,
            level_to_scale,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn floor(&self) -> Option<&str> {
        self.floor.as_deref()
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn level_to_scale(&self) -> &[f64] {
        &self.level_to_scale
    }

    /// Scale factor of the current level
    pub fn current_scale(&self) -> f64 {
        self.level_to_scale[self.level]
    }

    /// Move the viewport. Returns `Ok(false)` when nothing changed.
    ///
    /// `floor` and `level` fall back to the current values when `None`.
    pub fn set_position(
        &mut self,
        x: f64,
        y: f64,
        floor: Option<&str>,
        level: Option<usize>,
    ) -> Result<bool, Error> {
        let next_floor = floor.map(str::to_owned).or_else(|| self.floor.clone());
        let next_level = level.unwrap_or(self.level);

        if !x.is_finite() || !y.is_finite() || next_floor.is_none() {
            return Err(Error::InvalidPosition {
                x,
                y,
                floor: next_floor,
                level: Some(next_level),
            });
        }
        if next_level >= self.level_to_scale.len() {
            return Err(Error::InvalidLevel {
                level: next_level,
                len: self.level_to_scale.len(),
            });
        }

        if self.x == x && self.y == y && self.floor == next_floor && self.level == next_level {
            log::debug!("position unchanged, skipping update");
            return Ok(false);
        }

        self.x = x;
        self.y = y;
        self.floor = next_floor;
        self.level = next_level;
        Ok(true)
    }

    pub fn set_dimension(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Replace the zoom table, clamping the current level into it
    pub fn set_level_to_scale(&mut self, table: Vec<f64>) -> Result<(), Error> {
        validate_zoom_table(&table)?;
        self.level = self.level.min(table.len() - 1);
        self.level_to_scale = table;
        Ok(())
    }

    /// Map space to scaled space
    pub fn scale(&self, v: f64) -> f64 {
        round_half_up(v * self.current_scale())
    }

    /// Scaled space back to map space
    pub fn unscale(&self, v: f64) -> f64 {
        round_half_up(v / self.current_scale())
    }

    pub fn normalized_width(&self) -> f64 {
        self.unscale(self.width)
    }

    pub fn normalized_height(&self) -> f64 {
        self.unscale(self.height)
    }

    pub fn scaled_x(&self) -> f64 {
        self.scale(self.x)
    }

    pub fn scaled_y(&self) -> f64 {
        self.scale(self.y)
    }

    pub fn left_x(&self) -> f64 {
        self.x - round_half_up(self.normalized_width() / 2.0)
    }

    pub fn top_y(&self) -> f64 {
        self.y - round_half_up(self.normalized_height() / 2.0)
    }

    pub fn right_x(&self) -> f64 {
        self.x + round_half_up(self.normalized_width() / 2.0)
    }

    pub fn bottom_y(&self) -> f64 {
        self.y + round_half_up(self.normalized_height() / 2.0)
    }

    pub fn screen_left_x(&self) -> f64 {
        self.scaled_x() - round_half_up(self.width / 2.0)
    }

    pub fn screen_top_y(&self) -> f64 {
        self.scaled_y() - round_half_up(self.height / 2.0)
    }

    pub fn screen_right_x(&self) -> f64 {
        self.scaled_x() + round_half_up(self.width / 2.0)
    }

    pub fn screen_bottom_y(&self) -> f64 {
        self.scaled_y() + round_half_up(self.height / 2.0)
    }

    /// The visible window in scaled space
    pub fn screen_rect(&self) -> Rect {
        let left = self.screen_left_x();
        let top = self.screen_top_y();
        Rect::new(
            left,
            top,
            self.screen_right_x() - left,
            self.screen_bottom_y() - top,
        )
    }

    /// Culling test for a box in scaled space
    pub fn in_viewport(&self, rect: &Rect) -> bool {
        rect.overlaps(&self.screen_rect())
    }

    /// Canvas-relative pointer position to scaled space
    pub fn client_to_scaled(&self, client: Point) -> Point {
        client.offset(self.screen_left_x(), self.screen_top_y())
    }

    /// Canvas-relative pointer position to map space
    pub fn client_to_map(&self, client: Point) -> Point {
        Point::new(
            self.unscale(client.x) + self.left_x(),
            self.unscale(client.y) + self.top_y(),
        )
    }

    /// Zoom in by one level
    pub fn next_level(&self) -> usize {
        self.level.saturating_sub(1)
    }

    /// Zoom out by one level
    pub fn previous_level(&self) -> usize {
        (self.level + 1).min(self.level_to_scale.len() - 1)
    }

    /// Resolve a continuous scale to the closest table level.
    ///
    /// The table is expected to shrink as the level grows. Levels are
    /// scanned in order until the scale difference changes sign; on an exact
    /// tie the lower level wins.
    pub fn nearest_level(&self, cap_scale: f64) -> usize {
        let table = &self.level_to_scale;
        if cap_scale >= table[0] {
            return 0;
        }

        let mut nearest = 0;
        let mut last_diff = table[0] - cap_scale;
        for (level, scale) in table.iter().enumerate() {
            let diff = scale - cap_scale;
            if (diff > 0.0) != (last_diff > 0.0) {
                if diff.abs() < last_diff.abs() {
                    nearest = level;
                }
                return nearest;
            }
            last_diff = diff;
            nearest = level;
        }
        nearest
    }

    /// Whether a pinch at `pinch_scale` stays inside the table's range
    pub fn pinch_in_range(&self, pinch_scale: f64) -> bool {
        let cap_scale = pinch_scale * self.current_scale();
        let max_scale = self.level_to_scale[0];
        let min_scale = self.level_to_scale[self.level_to_scale.len() - 1];
        cap_scale >= min_scale && cap_scale <= max_scale
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            x: self.x,
            y: self.y,
            floor: self.floor.clone(),
            level: self.level,
            next_level: self.next_level(),
            previous_level: self.previous_level(),
            width: self.width,
            height: self.height,
            normalized_width: self.normalized_width(),
            normalized_height: self.normalized_height(),
            scaled_x: self.scaled_x(),
            scaled_y: self.scaled_y(),
            left_x: self.left_x(),
            top_y: self.top_y(),
            right_x: self.right_x(),
            bottom_y: self.bottom_y(),
            screen_left_x: self.screen_left_x(),
            screen_top_y: self.screen_top_y(),
            screen_right_x: self.screen_right_x(),
            screen_bottom_y: self.screen_bottom_y(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(vec![1.0, 0.85, 0.6]).unwrap();
        vp.set_dimension(100.0, 100.0);
        vp.set_position(5.0, 5.0, Some("1"), Some(0)).unwrap();
        vp
    }

    #[test]
    fn test_screen_origin_at_level_zero() {
        let vp = viewport();
        assert_eq!(vp.screen_left_x(), -45.0);
        assert_eq!(vp.screen_top_y(), -45.0);
        assert_eq!(vp.screen_right_x(), 55.0);
        assert_eq!(vp.left_x(), -45.0);
        assert_eq!(vp.right_x(), 55.0);
    }

    #[test]
    fn test_scaled_bounds_follow_level() {
        let mut vp = viewport();
        vp.set_position(1000.0, 500.0, None, Some(2)).unwrap();
        assert_eq!(vp.scaled_x(), 600.0);
        assert_eq!(vp.scaled_y(), 300.0);
        assert_eq!(vp.normalized_width(), 167.0);
        assert_eq!(vp.screen_left_x(), 550.0);
        assert_eq!(vp.left_x(), 1000.0 - 84.0);
    }

    #[test]
    fn test_scale_round_trip_within_one() {
        let mut vp = viewport();
        for level in 0..3 {
            vp.set_position(0.0, 0.0, None, Some(level)).unwrap();
            for v in -500..500 {
                let v = v as f64 * 1.7;
                let v = round_half_up(v);
                assert!((vp.scale(vp.unscale(v)) - v).abs() <= 1.0, "level {level} v {v}");
                assert!((vp.unscale(vp.scale(v)) - v).abs() <= 1.0, "level {level} v {v}");
            }
        }
    }

    #[test]
    fn test_invalid_position_keeps_previous() {
        let mut vp = viewport();
        let before = vp.clone();
        let err = vp.set_position(f64::NAN, 0.0, Some("F1"), Some(0));
        assert!(matches!(err, Err(Error::InvalidPosition { .. })));
        assert_eq!(vp, before);

        let err = vp.set_position(0.0, 0.0, None, Some(9));
        assert!(matches!(err, Err(Error::InvalidLevel { level: 9, len: 3 })));
        assert_eq!(vp, before);
    }

    #[test]
    fn test_missing_floor_is_rejected() {
        let mut vp = Viewport::new(vec![1.0]).unwrap();
        assert!(vp.set_position(1.0, 1.0, None, None).is_err());
    }

    #[test]
    fn test_identical_position_is_noop() {
        let mut vp = viewport();
        assert!(!vp.set_position(5.0, 5.0, Some("1"), Some(0)).unwrap());
        assert!(vp.set_position(6.0, 5.0, None, None).unwrap());
    }

    #[test]
    fn test_adjacent_levels_clamp() {
        let mut vp = viewport();
        assert_eq!(vp.next_level(), 0);
        assert_eq!(vp.previous_level(), 1);
        vp.set_position(0.0, 0.0, None, Some(2)).unwrap();
        assert_eq!(vp.next_level(), 1);
        assert_eq!(vp.previous_level(), 2);
    }

    #[test]
    fn test_nearest_level() {
        let vp = Viewport::new(vec![1.0, 0.8, 0.6]).unwrap();
        assert_eq!(vp.nearest_level(1.4), 0);
        assert_eq!(vp.nearest_level(0.95), 0);
        assert_eq!(vp.nearest_level(0.82), 1);
        assert_eq!(vp.nearest_level(0.65), 2);
        assert_eq!(vp.nearest_level(0.1), 2);
    }

    #[test]
    fn test_nearest_level_tie_prefers_lower_index() {
        let vp = Viewport::new(vec![1.0, 0.5, 0.25]).unwrap();
        assert_eq!(vp.nearest_level(0.75), 0);
        assert_eq!(vp.nearest_level(0.375), 1);
    }

    #[test]
    fn test_zoom_table_update_clamps_level() {
        let mut vp = viewport();
        vp.set_position(0.0, 0.0, None, Some(2)).unwrap();
        vp.set_level_to_scale(vec![1.0, 0.5]).unwrap();
        assert_eq!(vp.level(), 1);
        assert!(vp.set_level_to_scale(Vec::new()).is_err());
    }

    #[test]
    fn test_client_to_map() {
        let vp = viewport();
        let map = vp.client_to_map(Point::new(50.0, 50.0));
        assert_eq!(map, Point::new(5.0, 5.0));
        let scaled = vp.client_to_scaled(Point::new(0.0, 0.0));
        assert_eq!(scaled, Point::new(-45.0, -45.0));
    }
}

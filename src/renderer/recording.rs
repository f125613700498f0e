//! Headless surface that records draw calls
//!
//! Used by tests and by hosts that want to inspect a frame without a
//! graphics backend.

use std::collections::HashSet;

use crate::geometry::{Point, Rect, Size};
use crate::scene::{ImageSource, LineCap, TextMeasure};

use super::{RenderingSurface, StrokeStyle, SurfaceError};

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize {
        width: f64,
        height: f64,
        device_pixel_ratio: f64,
    },
    Clear,
    GlobalAlpha(f64),
    FillRect {
        rect: Rect,
        color: String,
    },
    StrokeRect {
        rect: Rect,
        color: String,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: String,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        color: String,
    },
    Image {
        src: String,
        rect: Rect,
    },
    FillText {
        text: String,
        origin: Point,
        font: String,
        color: String,
    },
    StrokeText {
        text: String,
        origin: Point,
        color: String,
        width: f64,
    },
    FillPath {
        points: Vec<Point>,
        color: String,
    },
    StrokePath {
        points: Vec<Point>,
        closed: bool,
        color: String,
        width: f64,
        cap: LineCap,
    },
    PreviewScale(f64),
}

/// Surface that keeps a log of draw calls and measures text with a fixed
/// advance per character
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    char_width: f64,
    line_height: f64,
    broken_images: HashSet<String>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    /// 8 units per character, 16 units per line
    pub fn new() -> Self {
        Self::with_metrics(8.0, 16.0)
    }

    pub fn with_metrics(char_width: f64, line_height: f64) -> Self {
        Self {
            ops: Vec::new(),
            char_width,
            line_height,
            broken_images: HashSet::new(),
        }
    }

    /// Make `draw_image` fail for `src`
    pub fn break_image(&mut self, src: impl Into<String>) {
        self.broken_images.insert(src.into());
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the log
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Ops recorded since the most recent clear
    pub fn last_frame(&self) -> &[DrawOp] {
        match self.ops.iter().rposition(|op| *op == DrawOp::Clear) {
            Some(index) => &self.ops[index + 1..],
            None => &self.ops,
        }
    }

    /// Number of frames started
    pub fn frame_count(&self) -> usize {
        self.ops.iter().filter(|op| **op == DrawOp::Clear).count()
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&self, _font: &str, text: &str) -> Size {
        Size::new(text.chars().count() as f64 * self.char_width, self.line_height)
    }
}

impl RenderingSurface for RecordingSurface {
    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.ops.push(DrawOp::Resize {
            width,
            height,
            device_pixel_ratio,
        });
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(DrawOp::GlobalAlpha(alpha));
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.ops.push(DrawOp::FillRect {
            rect,
            color: color.to_string(),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: &str) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color: color.to_string(),
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.ops.push(DrawOp::FillCircle {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.ops.push(DrawOp::StrokeCircle {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn draw_image(&mut self, source: &ImageSource, rect: Rect) -> Result<(), SurfaceError> {
        if self.broken_images.contains(&source.src) {
            return Err(SurfaceError::ImageUnavailable(source.src.clone()));
        }
        self.ops.push(DrawOp::Image {
            src: source.src.clone(),
            rect,
        });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, origin: Point, font: &str, color: &str) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            origin,
            font: font.to_string(),
            color: color.to_string(),
        });
    }

    fn stroke_text(&mut self, text: &str, origin: Point, _font: &str, color: &str, width: f64) {
        self.ops.push(DrawOp::StrokeText {
            text: text.to_string(),
            origin,
            color: color.to_string(),
            width,
        });
    }

    fn fill_path(&mut self, points: &[Point], color: &str) {
        self.ops.push(DrawOp::FillPath {
            points: points.to_vec(),
            color: color.to_string(),
        });
    }

    fn stroke_path(&mut self, points: &[Point], closed: bool, style: StrokeStyle<'_>) {
        self.ops.push(DrawOp::StrokePath {
            points: points.to_vec(),
            closed,
            color: style.color.to_string(),
            width: style.width,
            cap: style.cap,
        });
    }

    fn set_preview_scale(&mut self, scale: f64) {
        self.ops.push(DrawOp::PreviewScale(scale));
    }
}

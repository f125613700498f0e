//! Rendering: the drawing surface abstraction, the frame scheduler and the
//! paint procedure

pub mod painter;
pub mod recording;
pub mod scheduler;
#[cfg(feature = "skia")]
pub mod skia;

pub use painter::paint;
pub use scheduler::RenderScheduler;
#[cfg(feature = "skia")]
pub use skia::SkiaSurface;

use crate::geometry::{Point, Rect};
use crate::scene::{ImageSource, LineCap, TextMeasure};

/// Custom error type for surface failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    /// The surface has no pixels for this image
    #[error("Image {0} is not available to the surface")]
    ImageUnavailable(String),
    /// Backend-specific failure
    #[error("Surface error: {0}")]
    Backend(String),
}

/// Stroke parameters for paths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle<'a> {
    pub color: &'a str,
    pub width: f64,
    pub cap: LineCap,
}

/// Drawing capability the canvas paints onto.
///
/// Coordinates are canvas pixels with the origin at the top-left corner.
/// Colors are CSS color strings.
pub trait RenderingSurface: TextMeasure {
    /// Resize the backing store; `device_pixel_ratio` scales the pixel
    /// buffer, not the coordinate space
    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64);

    fn clear(&mut self);

    /// Alpha applied to subsequent draw calls
    fn set_global_alpha(&mut self, alpha: f64);

    fn fill_rect(&mut self, rect: Rect, color: &str);

    fn stroke_rect(&mut self, rect: Rect, color: &str);

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str);

    fn draw_image(&mut self, source: &ImageSource, rect: Rect) -> Result<(), SurfaceError>;

    /// Draw text with its top edge at `origin.y`
    fn fill_text(&mut self, text: &str, origin: Point, font: &str, color: &str);

    fn stroke_text(&mut self, text: &str, origin: Point, font: &str, color: &str, width: f64);

    /// Fill a closed polygon
    fn fill_path(&mut self, points: &[Point], color: &str);

    fn stroke_path(&mut self, points: &[Point], closed: bool, style: StrokeStyle<'_>);

    /// Visual zoom applied during a pinch; 1.0 resets it
    fn set_preview_scale(&mut self, _scale: f64) {}
}

/// Statistics for a single paint
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderStats {
    /// Frames painted so far, including this one
    pub frame_count: u64,
    /// Items that produced draw calls
    pub items_drawn: u32,
    /// Items skipped for being hidden, on another floor or off screen
    pub items_skipped: u32,
    /// Layers skipped entirely
    pub layers_skipped: u32,
    /// Image draws the surface rejected
    pub draw_failures: u32,
}

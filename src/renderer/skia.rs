// Skia raster surface for the map canvas
use std::collections::HashMap;

use skia_safe::{
    paint::Cap, surfaces, Color, Color4f, Font, Image, Paint, PaintStyle, Path, Surface,
};

use crate::geometry::{Point, Rect, Size};
use crate::scene::{ImageSource, LineCap, TextMeasure};

use super::{RenderingSurface, StrokeStyle, SurfaceError};

const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Skia surface state, created on the first resize
struct SkiaState {
    /// Skia raster surface
    surface: Surface,
    /// Current logical width
    width: f64,
    /// Current logical height
    height: f64,
}

/// Raster surface backed by Skia.
///
/// Images are drawn from pixels registered with [`SkiaSurface::register_image`];
/// the canvas itself only tracks image sizes.
pub struct SkiaSurface {
    state: Option<SkiaState>,
    images: HashMap<String, Image>,
    alpha: f32,
    preview_scale: f64,
}

impl Default for SkiaSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SkiaSurface {
    /// Create a new Skia surface; it has no pixels until resized
    pub fn new() -> Self {
        Self {
            state: None,
            images: HashMap::new(),
            alpha: 1.0,
            preview_scale: 1.0,
        }
    }

    /// Make decoded pixels available for items whose image `src` matches
    pub fn register_image(&mut self, src: impl Into<String>, image: Image) {
        self.images.insert(src.into(), image);
    }

    /// Logical size of the surface
    pub fn size(&self) -> Option<Size> {
        self.state
            .as_ref()
            .map(|state| Size::new(state.width, state.height))
    }

    /// Scale the host should apply while a pinch is in progress
    pub fn preview_scale(&self) -> f64 {
        self.preview_scale
    }

    /// Copy of the current pixels
    pub fn snapshot(&mut self) -> Option<Image> {
        self.state
            .as_mut()
            .map(|state| state.surface.image_snapshot())
    }

    fn paint(&self, color: &str) -> Paint {
        let mut color = parse_color(color).unwrap_or_else(|| {
            log::warn!("Unrecognized color {color:?}, drawing black");
            Color4f::new(0.0, 0.0, 0.0, 1.0)
        });
        color.a *= self.alpha;
        let mut paint = Paint::new(color, None);
        paint.set_anti_alias(true);
        paint
    }

    fn stroke_paint(&self, color: &str, width: f64) -> Paint {
        let mut paint = self.paint(color);
        paint.set_style(PaintStyle::Stroke);
        paint.set_stroke_width(width as f32);
        paint
    }

    fn with_canvas(&mut self, draw: impl FnOnce(&skia_safe::Canvas)) {
        match &mut self.state {
            Some(state) => draw(state.surface.canvas()),
            None => log::debug!("draw call before the surface was sized, ignoring"),
        }
    }
}

fn font_for(style: &str) -> Font {
    let mut font = Font::default();
    font.set_size(font_size(style).unwrap_or(DEFAULT_FONT_SIZE));
    font
}

/// Pixel size from a CSS font shorthand such as `"bold 14px sans-serif"`
fn font_size(style: &str) -> Option<f32> {
    style
        .split_whitespace()
        .find_map(|part| part.strip_suffix("px"))
        .and_then(|size| size.parse().ok())
}

fn to_skia_rect(rect: Rect) -> skia_safe::Rect {
    skia_safe::Rect::from_xywh(
        rect.x() as f32,
        rect.y() as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

fn to_skia_point(point: Point) -> skia_safe::Point {
    skia_safe::Point::new(point.x as f32, point.y as f32)
}

fn to_skia_cap(cap: LineCap) -> Cap {
    match cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    }
}

fn build_path(points: &[Point], closed: bool) -> Path {
    let mut path = Path::new();
    for (i, point) in points.iter().enumerate() {
        if i == 0 {
            path.move_to(to_skia_point(*point));
        } else {
            path.line_to(to_skia_point(*point));
        }
    }
    if closed {
        path.close();
    }
    path
}

/// Parse a CSS color: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` or a
/// handful of named colors
pub fn parse_color(input: &str) -> Option<Color4f> {
    let input = input.trim().to_ascii_lowercase();

    if let Some(hex) = input.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        return match hex.len() {
            3 => {
                let mut c = hex.chars().map(|ch| channel(&format!("{ch}{ch}")));
                Some(Color4f::new(c.next()??, c.next()??, c.next()??, 1.0))
            }
            6 | 8 => Some(Color4f::new(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
                hex.get(6..8).map_or(Some(1.0), channel)?,
            )),
            _ => None,
        };
    }

    if let Some(args) = input
        .strip_prefix("rgba(")
        .or_else(|| input.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<f32> = args
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;
        return match parts.as_slice() {
            [r, g, b] => Some(Color4f::new(r / 255.0, g / 255.0, b / 255.0, 1.0)),
            [r, g, b, a] => Some(Color4f::new(r / 255.0, g / 255.0, b / 255.0, *a)),
            _ => None,
        };
    }

    let named = match input.as_str() {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::RED,
        "green" => Color::from_rgb(0, 128, 0),
        "blue" => Color::BLUE,
        "yellow" => Color::YELLOW,
        "gray" | "grey" => Color::from_rgb(128, 128, 128),
        "transparent" => Color::TRANSPARENT,
        _ => return None,
    };
    Some(Color4f::from(named))
}

impl TextMeasure for SkiaSurface {
    fn measure_text(&self, font: &str, text: &str) -> Size {
        let font = font_for(font);
        let (width, _bounds) = font.measure_str(text, None);
        Size::new(width as f64, font.spacing() as f64)
    }
}

impl RenderingSurface for SkiaSurface {
    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        let pixel_width = (width * device_pixel_ratio).round().max(1.0) as i32;
        let pixel_height = (height * device_pixel_ratio).round().max(1.0) as i32;

        match surfaces::raster_n32_premul((pixel_width, pixel_height)) {
            Some(mut surface) => {
                surface
                    .canvas()
                    .scale((device_pixel_ratio as f32, device_pixel_ratio as f32));
                self.state = Some(SkiaState {
                    surface,
                    width,
                    height,
                });
            }
            None => log::warn!("Failed to create a {pixel_width}x{pixel_height} raster surface"),
        }
    }

    fn clear(&mut self) {
        self.with_canvas(|canvas| {
            canvas.clear(Color::TRANSPARENT);
        });
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0) as f32;
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        let paint = self.paint(color);
        self.with_canvas(|canvas| {
            canvas.draw_rect(to_skia_rect(rect), &paint);
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: &str) {
        let paint = self.stroke_paint(color, 1.0);
        self.with_canvas(|canvas| {
            canvas.draw_rect(to_skia_rect(rect), &paint);
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        let paint = self.paint(color);
        self.with_canvas(|canvas| {
            canvas.draw_circle(to_skia_point(center), radius as f32, &paint);
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str) {
        let paint = self.stroke_paint(color, 1.0);
        self.with_canvas(|canvas| {
            canvas.draw_circle(to_skia_point(center), radius as f32, &paint);
        });
    }

    fn draw_image(&mut self, source: &ImageSource, rect: Rect) -> Result<(), SurfaceError> {
        let image = self
            .images
            .get(&source.src)
            .cloned()
            .ok_or_else(|| SurfaceError::ImageUnavailable(source.src.clone()))?;
        let mut paint = Paint::default();
        paint.set_alpha_f(self.alpha);
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| SurfaceError::Backend("surface has not been sized".to_string()))?;
        state
            .surface
            .canvas()
            .draw_image_rect(&image, None, to_skia_rect(rect), &paint);
        Ok(())
    }

    fn fill_text(&mut self, text: &str, origin: Point, font: &str, color: &str) {
        let paint = self.paint(color);
        let font = font_for(font);
        let (_, metrics) = font.metrics();
        self.with_canvas(|canvas| {
            let baseline = skia_safe::Point::new(origin.x as f32, origin.y as f32 - metrics.ascent);
            canvas.draw_str(text, baseline, &font, &paint);
        });
    }

    fn stroke_text(&mut self, text: &str, origin: Point, font: &str, color: &str, width: f64) {
        let paint = self.stroke_paint(color, width);
        let font = font_for(font);
        let (_, metrics) = font.metrics();
        self.with_canvas(|canvas| {
            let baseline = skia_safe::Point::new(origin.x as f32, origin.y as f32 - metrics.ascent);
            canvas.draw_str(text, baseline, &font, &paint);
        });
    }

    fn fill_path(&mut self, points: &[Point], color: &str) {
        let paint = self.paint(color);
        let path = build_path(points, true);
        self.with_canvas(|canvas| {
            canvas.draw_path(&path, &paint);
        });
    }

    fn stroke_path(&mut self, points: &[Point], closed: bool, style: StrokeStyle<'_>) {
        let mut paint = self.stroke_paint(style.color, style.width);
        paint.set_stroke_cap(to_skia_cap(style.cap));
        let path = build_path(points, closed);
        self.with_canvas(|canvas| {
            canvas.draw_path(&path, &paint);
        });
    }

    fn set_preview_scale(&mut self, scale: f64) {
        self.preview_scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        let c = parse_color("#f00").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (1.0, 0.0, 0.0, 1.0));
        let c = parse_color("#00ff0080").unwrap();
        assert_eq!(c.g, 1.0);
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
        assert!(parse_color("#12").is_none());
    }

    #[test]
    fn test_parse_functional_and_named_colors() {
        let c = parse_color("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!((c.r, c.a), (1.0, 0.5));
        assert!(parse_color("rgb(0,0,255)").is_some());
        assert!(parse_color("Red").is_some());
        assert!(parse_color("chartreuse-ish").is_none());
    }

    #[test]
    fn test_font_size_from_shorthand() {
        assert_eq!(font_size("bold 14px sans-serif"), Some(14.0));
        assert_eq!(font_size("serif"), None);
    }

    #[test]
    fn test_draws_after_resize() {
        let mut surface = SkiaSurface::new();
        surface.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), "red");
        assert!(surface.snapshot().is_none());

        surface.resize(20.0, 10.0, 2.0);
        surface.clear();
        surface.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), "red");
        let image = surface.snapshot().unwrap();
        assert_eq!((image.width(), image.height()), (40, 20));
        assert_eq!(surface.size(), Some(Size::new(20.0, 10.0)));
    }

    #[test]
    fn test_unregistered_image_is_an_error() {
        let mut surface = SkiaSurface::new();
        surface.resize(10.0, 10.0, 1.0);
        let result = surface.draw_image(&ImageSource::new("missing.png"), Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(result, Err(SurfaceError::ImageUnavailable("missing.png".into())));
    }
}

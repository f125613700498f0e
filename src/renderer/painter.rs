//! Paint procedure for a single frame

use crate::geometry::{Point, Rect};
use crate::scene::{DrawableItem, ImageState, LayerId, SceneStore, Visual};
use crate::viewport::Viewport;

use super::{RenderStats, RenderingSurface, StrokeStyle, SurfaceError};

/// Paint every visible item of every visible layer.
///
/// Hit areas of all items are refreshed first, whether or not the item ends
/// up drawn. Image draw failures are logged and counted; they never abort
/// the frame.
pub fn paint<S: RenderingSurface + ?Sized>(
    surface: &mut S,
    scene: &mut SceneStore,
    viewport: &Viewport,
    frame: u64,
) -> RenderStats {
    surface.clear();
    scene.refresh_hit_areas(viewport);

    let mut stats = RenderStats {
        frame_count: frame,
        ..Default::default()
    };
    let origin = Point::new(viewport.screen_left_x(), viewport.screen_top_y());

    for layer in LayerId::ORDER {
        if scene.is_layer_hidden(layer) {
            stats.layers_skipped += 1;
            continue;
        }

        for item in scene.collection(layer).iter() {
            if item.hidden || viewport.floor() != Some(item.floor.as_str()) {
                stats.items_skipped += 1;
                continue;
            }
            let bounds = item.rendered_box(viewport);
            if !viewport.in_viewport(&bounds) {
                stats.items_skipped += 1;
                continue;
            }

            surface.set_global_alpha(item.opacity.unwrap_or(1.0));
            match draw_item(surface, item, bounds, origin, viewport) {
                Ok(true) => stats.items_drawn += 1,
                Ok(false) => {}
                Err(err) => {
                    log::warn!("Image cannot be drawn for item {}: {}", item.id, err);
                    stats.draw_failures += 1;
                }
            }
        }
    }

    surface.set_global_alpha(1.0);
    stats
}

/// Draw one item; `Ok(false)` means there was nothing to draw
fn draw_item<S: RenderingSurface + ?Sized>(
    surface: &mut S,
    item: &DrawableItem,
    bounds: Rect,
    origin: Point,
    viewport: &Viewport,
) -> Result<bool, SurfaceError> {
    let Some(visual) = &item.visual else {
        return Ok(false);
    };

    let screen = Rect::new(
        bounds.x() - origin.x,
        bounds.y() - origin.y,
        bounds.width(),
        bounds.height(),
    );

    match visual {
        Visual::Circle(circle) => {
            let center = Point::new(
                screen.x() + screen.width() / 2.0,
                screen.y() + screen.height() / 2.0,
            );
            let radius = screen.width() / 2.0;
            if let Some(color) = &circle.color {
                surface.fill_circle(center, radius, color);
            }
            if let Some(color) = &circle.border_color {
                surface.stroke_circle(center, radius, color);
            }
        }
        Visual::Rect(rect) => {
            if let Some(color) = &rect.color {
                surface.fill_rect(screen, color);
            }
            if let Some(color) = &rect.border_color {
                surface.stroke_rect(screen, color);
            }
        }
        Visual::Image(source) => {
            if item.image_state != Some(ImageState::Ready) {
                return Ok(false);
            }
            surface.draw_image(source, screen)?;
        }
        Visual::Text(block) => {
            let lines: Vec<&str> = if block.lines.is_empty() {
                vec![block.text.as_str()]
            } else {
                block.lines.iter().map(String::as_str).collect()
            };
            let stroke = block
                .stroke_width
                .filter(|width| *width > 0.0)
                .zip(block.stroke_style.as_deref());

            for (i, line) in lines.into_iter().enumerate() {
                let at = Point::new(screen.x(), screen.y() + block.line_height * i as f64);
                surface.fill_text(line, at, &block.style, &block.color);
                if let Some((width, color)) = stroke {
                    surface.stroke_text(line, at, &block.style, color, width);
                }
            }
        }
        Visual::Line(line) => {
            let Some(color) = line.stroke_style.as_deref() else {
                return Ok(false);
            };
            let points: Vec<Point> = line
                .coordinates
                .iter()
                .map(|c| {
                    Point::new(
                        item.scaled_position(c.x, viewport) - origin.x,
                        item.scaled_position(c.y, viewport) - origin.y,
                    )
                })
                .collect();
            surface.stroke_path(
                &points,
                false,
                StrokeStyle {
                    color,
                    width: line.width.unwrap_or(1.0),
                    cap: line.cap,
                },
            );
        }
        Visual::Shape(shape) => {
            let scale = |v: f64| {
                if item.scale_dimension {
                    viewport.scale(v)
                } else {
                    v
                }
            };
            let points: Vec<Point> = shape
                .coordinates
                .iter()
                .map(|c| Point::new(scale(c.x) + screen.x(), scale(c.y) + screen.y()))
                .collect();
            if let Some(color) = &shape.fill_style {
                surface.fill_path(&points, color);
            }
            if let Some(color) = shape.stroke_style.as_deref() {
                surface.stroke_path(
                    &points,
                    true,
                    StrokeStyle {
                        color,
                        width: shape.width.unwrap_or(1.0),
                        cap: shape.cap,
                    },
                );
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::renderer::recording::{DrawOp, RecordingSurface};
    use crate::scene::{
        Circle, ImageSource, ItemDescriptor, LineStyle, RectStyle, SetItemsOptions, ShapeStyle,
        TextBlock,
    };

    fn viewport(level: usize) -> Viewport {
        let mut vp = Viewport::new(vec![1.0, 0.5]).unwrap();
        vp.set_dimension(100.0, 100.0);
        vp.set_position(50.0, 50.0, Some("1"), Some(level)).unwrap();
        vp
    }

    fn scene_with(surface: &RecordingSurface, vp: &Viewport, items: Vec<ItemDescriptor>) -> SceneStore {
        let mut scene = SceneStore::new();
        let staged = scene
            .stage_items(items, SetItemsOptions::default(), surface, vp)
            .unwrap();
        scene.commit_items(staged);
        scene
    }

    fn red_rect(id: &str) -> ItemDescriptor {
        ItemDescriptor::new(id, "1").rect(RectStyle {
            width: 10.0,
            height: 10.0,
            color: Some("red".into()),
            border_color: Some("black".into()),
        })
    }

    #[test]
    fn test_rect_fill_then_stroke_in_screen_space() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(&surface, &vp, vec![red_rect("r").at(20.0, 30.0)]);

        let stats = paint(&mut surface, &mut scene, &vp, 1);
        assert_eq!(stats.items_drawn, 1);
        let expected = Rect::new(20.0, 30.0, 10.0, 10.0);
        assert_eq!(
            surface.last_frame(),
            &[
                DrawOp::GlobalAlpha(1.0),
                DrawOp::FillRect {
                    rect: expected,
                    color: "red".into()
                },
                DrawOp::StrokeRect {
                    rect: expected,
                    color: "black".into()
                },
                DrawOp::GlobalAlpha(1.0),
            ]
        );
    }

    #[test]
    fn test_skips_hidden_other_floor_and_offscreen() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut other_floor = red_rect("b").at(10.0, 10.0);
        other_floor.floor = Some("2".into());
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![
                red_rect("a").at(10.0, 10.0).hidden(true),
                other_floor,
                red_rect("c").at(500.0, 500.0),
                red_rect("d").at(95.0, 95.0),
            ],
        );

        let stats = paint(&mut surface, &mut scene, &vp, 1);
        assert_eq!(stats.items_skipped, 3);
        assert_eq!(stats.items_drawn, 1);
    }

    #[test]
    fn test_hidden_layer_is_skipped() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(&surface, &vp, vec![red_rect("a").at(10.0, 10.0)]);
        scene.set_layer_hidden(LayerId::MapItems, true);

        let stats = paint(&mut surface, &mut scene, &vp, 1);
        assert_eq!(stats.layers_skipped, 1);
        assert_eq!(stats.items_drawn, 0);
    }

    #[test]
    fn test_opacity_is_per_item() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![red_rect("a").at(10.0, 10.0).opacity(0.25), red_rect("b").at(40.0, 40.0)],
        );
        paint(&mut surface, &mut scene, &vp, 1);
        let alphas: Vec<f64> = surface
            .last_frame()
            .iter()
            .filter_map(|op| match op {
                DrawOp::GlobalAlpha(a) => Some(*a),
                _ => None,
            })
            .collect();
        assert_eq!(alphas, vec![0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_circle_centered_in_box() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![ItemDescriptor::new("c", "1").at(10.0, 10.0).circle(Circle {
                radius: 5.0,
                color: Some("blue".into()),
                border_color: None,
            })],
        );
        paint(&mut surface, &mut scene, &vp, 1);
        assert!(surface.last_frame().contains(&DrawOp::FillCircle {
            center: Point::new(15.0, 15.0),
            radius: 5.0,
            color: "blue".into(),
        }));
    }

    #[test]
    fn test_line_coordinates_follow_scale_position() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(1);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![ItemDescriptor::new("l", "1").line(LineStyle {
                coordinates: vec![Point::new(40.0, 40.0), Point::new(60.0, 40.0)],
                stroke_style: Some("green".into()),
                width: Some(2.0),
                ..Default::default()
            })],
        );
        paint(&mut surface, &mut scene, &vp, 1);
        // screen origin at level 1 is (25 - 50, 25 - 50)
        let stroke = surface
            .last_frame()
            .iter()
            .find_map(|op| match op {
                DrawOp::StrokePath { points, closed, .. } => Some((points.clone(), *closed)),
                _ => None,
            })
            .unwrap();
        assert_eq!(stroke, (vec![Point::new(45.0, 45.0), Point::new(55.0, 45.0)], false));
    }

    #[test]
    fn test_shape_is_closed_and_offset_by_item() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![ItemDescriptor::new("s", "1").at(10.0, 20.0).shape(ShapeStyle {
                coordinates: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)],
                fill_style: Some("yellow".into()),
                stroke_style: Some("black".into()),
                ..Default::default()
            })],
        );
        paint(&mut surface, &mut scene, &vp, 1);
        let frame = surface.last_frame();
        assert!(frame.contains(&DrawOp::FillPath {
            points: vec![Point::new(10.0, 20.0), Point::new(20.0, 20.0), Point::new(10.0, 30.0)],
            color: "yellow".into(),
        }));
        assert!(frame
            .iter()
            .any(|op| matches!(op, DrawOp::StrokePath { closed: true, .. })));
    }

    #[test]
    fn test_wrapped_text_draws_each_line_with_stroke() {
        let mut surface = RecordingSurface::new();
        let vp = viewport(0);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![ItemDescriptor::new("t", "1").at(0.0, 0.0).text(TextBlock {
                style: "12px sans".into(),
                color: "black".into(),
                text: "aa bb".into(),
                max_line_width: Some(30.0),
                stroke_width: Some(2.0),
                stroke_style: Some("white".into()),
                ..Default::default()
            })],
        );
        paint(&mut surface, &mut scene, &vp, 1);
        let fills: Vec<(String, Point)> = surface
            .last_frame()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, origin, .. } => Some((text.clone(), *origin)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![
                ("aa".to_string(), Point::new(0.0, 0.0)),
                ("bb".to_string(), Point::new(0.0, 16.0)),
            ]
        );
        let strokes = surface
            .last_frame()
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokeText { .. }))
            .count();
        assert_eq!(strokes, 2);
    }

    #[test]
    fn test_image_failure_is_counted_not_fatal() {
        let mut surface = RecordingSurface::new();
        surface.break_image("broken.png");
        let vp = viewport(0);
        let mut scene = scene_with(
            &surface,
            &vp,
            vec![
                ItemDescriptor::new("a", "1")
                    .at(10.0, 10.0)
                    .image(ImageSource::loaded("broken.png", Size::new(8.0, 8.0))),
                ItemDescriptor::new("b", "1")
                    .at(20.0, 20.0)
                    .image(ImageSource::loaded("ok.png", Size::new(8.0, 8.0))),
                ItemDescriptor::new("c", "1").at(30.0, 30.0).image(ImageSource::new("pending.png")),
            ],
        );
        let stats = paint(&mut surface, &mut scene, &vp, 1);
        assert_eq!(stats.draw_failures, 1);
        assert_eq!(stats.items_drawn, 1);
        assert!(surface.last_frame().contains(&DrawOp::Image {
            src: "ok.png".into(),
            rect: Rect::new(20.0, 20.0, 8.0, 8.0),
        }));
    }
}

//! Drawable items and the descriptors they are built from
//!
//! A descriptor is what callers hand in; every field is optional so it can
//! describe a partial update. A [`DrawableItem`] is the resolved form with
//! derived size and hit area.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, ItemEvent, ItemListener};
use crate::geometry::{bounding_box, Point, Rect, Size};
use crate::viewport::Viewport;
use crate::Error;

use super::text::{layout_text, TextMeasure};

/// Stroke end style for lines and shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Reference to an image resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub src: String,
    /// Known natural size; `None` means the image still has to be loaded
    #[serde(default)]
    pub natural_size: Option<Size>,
}

impl ImageSource {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            natural_size: None,
        }
    }

    /// An image whose natural size is already known
    pub fn loaded(src: impl Into<String>, natural_size: Size) -> Self {
        Self {
            src: src.into(),
            natural_size: Some(natural_size),
        }
    }
}

/// Load state of an item's image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageState {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextBlock {
    /// Font description, e.g. `"bold 12px sans-serif"`
    pub style: String,
    pub color: String,
    pub text: String,
    pub max_line_width: Option<f64>,
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<String>,
    /// Filled in at ingest when the text wraps
    #[serde(skip_deserializing)]
    pub lines: Vec<String>,
    #[serde(skip_deserializing)]
    pub line_height: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub radius: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectStyle {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
}

/// Open polyline in map space
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineStyle {
    pub coordinates: Vec<Point>,
    pub stroke_style: Option<String>,
    pub cap: LineCap,
    pub width: Option<f64>,
    /// Hit tolerance in scaled pixels
    pub hit_error_margin: Option<f64>,
}

/// Closed polygon relative to the item position
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    pub coordinates: Vec<Point>,
    pub fill_style: Option<String>,
    pub stroke_style: Option<String>,
    pub cap: LineCap,
    pub width: Option<f64>,
}

/// The single visual an item draws
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Visual {
    Image(ImageSource),
    Text(TextBlock),
    Line(LineStyle),
    Shape(ShapeStyle),
    Circle(Circle),
    Rect(RectStyle),
}

impl Visual {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Visual::Image(_) => "image",
            Visual::Text(_) => "text",
            Visual::Line(_) => "line",
            Visual::Shape(_) => "shape",
            Visual::Circle(_) => "circle",
            Visual::Rect(_) => "rect",
        }
    }
}

/// Per-component hit area overrides
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomHitArea {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl CustomHitArea {
    fn apply(&self, computed: Rect) -> Rect {
        Rect::new(
            self.x.unwrap_or(computed.x()),
            self.y.unwrap_or(computed.y()),
            self.width.unwrap_or(computed.width()),
            self.height.unwrap_or(computed.height()),
        )
    }
}

/// A resolved tile or map item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawableItem {
    pub id: String,
    pub floor: String,
    pub x: f64,
    pub y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Derived from the visual unless set explicitly on an image
    pub width: f64,
    pub height: f64,
    pub z_index: i32,
    pub opacity: Option<f64>,
    pub hidden: bool,
    pub center: bool,
    pub scale_position: bool,
    pub scale_dimension: bool,
    pub hit_area: Rect,
    pub custom_hit: CustomHitArea,
    pub visual: Option<Visual>,
    pub image_state: Option<ImageState>,
    pub others: serde_json::Value,
    #[serde(skip)]
    pub(crate) requested_size: (Option<f64>, Option<f64>),
}

impl DrawableItem {
    /// Box the item occupies in scaled space
    pub fn rendered_box(&self, viewport: &Viewport) -> Rect {
        let (width, height) = self.scaled_size(viewport);
        let mut x = self.scaled_position(self.x, viewport) + self.offset_x;
        let mut y = self.scaled_position(self.y, viewport) + self.offset_y;
        if self.center {
            x -= width / 2.0;
            y -= height / 2.0;
        }
        Rect::new(x, y, width, height)
    }

    pub fn scaled_size(&self, viewport: &Viewport) -> (f64, f64) {
        if self.scale_dimension {
            (viewport.scale(self.width), viewport.scale(self.height))
        } else {
            (self.width, self.height)
        }
    }

    pub(crate) fn scaled_position(&self, v: f64, viewport: &Viewport) -> f64 {
        if self.scale_position {
            viewport.scale(v)
        } else {
            v
        }
    }

    /// Recompute the hit area from the current position and size.
    ///
    /// A centered item is shifted by half its drawn size, expressed in the
    /// space its hit area is tested in.
    pub fn refresh_hit_area(&mut self, viewport: &Viewport) {
        let (x, y) = if self.center {
            let (width, height) = self.scaled_size(viewport);
            if self.scale_position {
                (
                    self.x - viewport.unscale(width / 2.0),
                    self.y - viewport.unscale(height / 2.0),
                )
            } else {
                (self.x - width / 2.0, self.y - height / 2.0)
            }
        } else {
            (self.x, self.y)
        };
        self.hit_area = self
            .custom_hit
            .apply(Rect::new(x, y, self.width, self.height));
    }

    pub fn image_source(&self) -> Option<&ImageSource> {
        match &self.visual {
            Some(Visual::Image(source)) => Some(source),
            _ => None,
        }
    }

    /// Record the outcome of an image load for this item
    pub(crate) fn apply_image_size(&mut self, natural: Size, viewport: &Viewport) {
        if let Some(Visual::Image(source)) = &mut self.visual {
            source.natural_size = Some(natural);
        }
        self.width = self.requested_size.0.filter(|w| *w != 0.0).unwrap_or(natural.width);
        self.height = self
            .requested_size
            .1
            .filter(|h| *h != 0.0)
            .unwrap_or(natural.height);
        self.image_state = Some(ImageState::Ready);
        self.refresh_hit_area(viewport);
    }
}

/// Listeners declared on a descriptor, registered under the default id
#[derive(Clone, Default)]
pub struct DeclarativeListeners {
    entries: Vec<(EventKind, ItemListener)>,
}

impl DeclarativeListeners {
    pub fn set(&mut self, kind: EventKind, listener: ItemListener) {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = listener,
            None => self.entries.push((kind, listener)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(EventKind, ItemListener)> {
        self.entries
    }
}

impl fmt::Debug for DeclarativeListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(kind, _)| kind))
            .finish()
    }
}

/// Input record for `set_items`; omitted fields fall back to defaults or,
/// for partial updates, to the previous value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemDescriptor {
    pub id: String,
    pub floor: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub z_index: Option<i32>,
    pub opacity: Option<f64>,
    pub hidden: Option<bool>,
    pub center: Option<bool>,
    pub scale_position: Option<bool>,
    pub scale_dimension: Option<bool>,
    pub custom_hit_x: Option<f64>,
    pub custom_hit_y: Option<f64>,
    pub custom_hit_width: Option<f64>,
    pub custom_hit_height: Option<f64>,
    pub image: Option<ImageSource>,
    pub text_element: Option<TextBlock>,
    pub line: Option<LineStyle>,
    pub shape: Option<ShapeStyle>,
    pub circle: Option<Circle>,
    pub rect: Option<RectStyle>,
    pub others: Option<serde_json::Value>,
    #[serde(skip)]
    pub listeners: DeclarativeListeners,
}

impl ItemDescriptor {
    pub fn new(id: impl Into<String>, floor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            floor: Some(floor.into()),
            ..Default::default()
        }
    }

    /// Descriptor carrying only an id, for partial updates
    pub fn update(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.offset_x = Some(x);
        self.offset_y = Some(y);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = Some(center);
        self
    }

    pub fn scale_position(mut self, scale: bool) -> Self {
        self.scale_position = Some(scale);
        self
    }

    pub fn scale_dimension(mut self, scale: bool) -> Self {
        self.scale_dimension = Some(scale);
        self
    }

    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    pub fn text(mut self, text: TextBlock) -> Self {
        self.text_element = Some(text);
        self
    }

    pub fn line(mut self, line: LineStyle) -> Self {
        self.line = Some(line);
        self
    }

    pub fn shape(mut self, shape: ShapeStyle) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn circle(mut self, circle: Circle) -> Self {
        self.circle = Some(circle);
        self
    }

    pub fn rect(mut self, rect: RectStyle) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn others(mut self, others: serde_json::Value) -> Self {
        self.others = Some(others);
        self
    }

    /// Attach a listener registered under the default listener id
    pub fn on<F>(mut self, kind: EventKind, listener: F) -> Self
    where
        F: Fn(&mut ItemEvent<'_>) + 'static,
    {
        self.listeners.set(kind, Rc::new(listener));
        self
    }

    fn has_visual(&self) -> bool {
        self.text_element.is_some()
            || self.line.is_some()
            || self.shape.is_some()
            || self.image.is_some()
            || self.circle.is_some()
            || self.rect.is_some()
    }

    /// Pick the visual by precedence: text, line, shape, image, circle, rect
    fn take_visual(&mut self) -> Option<Visual> {
        if let Some(text) = self.text_element.take() {
            return Some(Visual::Text(text));
        }
        if let Some(line) = self.line.take() {
            return Some(Visual::Line(line));
        }
        if let Some(shape) = self.shape.take() {
            return Some(Visual::Shape(shape));
        }
        if let Some(image) = self.image.take() {
            return Some(Visual::Image(image));
        }
        if let Some(circle) = self.circle.take() {
            return Some(Visual::Circle(circle));
        }
        self.rect.take().map(Visual::Rect)
    }

    /// Resolve into a drawable item.
    ///
    /// `prior` is the item being updated when the update is partial.
    pub(crate) fn resolve(
        mut self,
        index: usize,
        prior: Option<&DrawableItem>,
        measure: &dyn TextMeasure,
        viewport: &Viewport,
    ) -> Result<DrawableItem, Error> {
        if self.id.is_empty() {
            return Err(Error::MissingField { field: "id", index });
        }

        let floor = self
            .floor
            .take()
            .or_else(|| prior.map(|p| p.floor.clone()))
            .filter(|floor| !floor.is_empty())
            .ok_or(Error::MissingField {
                field: "floor",
                index,
            })?;

        let visual = if self.has_visual() {
            self.take_visual()
        } else {
            prior.and_then(|p| p.visual.clone())
        };

        let requested_size = (
            self.width.or_else(|| prior.and_then(|p| p.requested_size.0)),
            self.height.or_else(|| prior.and_then(|p| p.requested_size.1)),
        );

        let custom_hit = CustomHitArea {
            x: self.custom_hit_x.or_else(|| prior.and_then(|p| p.custom_hit.x)),
            y: self.custom_hit_y.or_else(|| prior.and_then(|p| p.custom_hit.y)),
            width: self
                .custom_hit_width
                .or_else(|| prior.and_then(|p| p.custom_hit.width)),
            height: self
                .custom_hit_height
                .or_else(|| prior.and_then(|p| p.custom_hit.height)),
        };

        let mut item = DrawableItem {
            x: self.x.or(prior.map(|p| p.x)).unwrap_or(0.0),
            y: self.y.or(prior.map(|p| p.y)).unwrap_or(0.0),
            offset_x: self.offset_x.or(prior.map(|p| p.offset_x)).unwrap_or(0.0),
            offset_y: self.offset_y.or(prior.map(|p| p.offset_y)).unwrap_or(0.0),
            width: requested_size.0.unwrap_or(0.0),
            height: requested_size.1.unwrap_or(0.0),
            z_index: self.z_index.or(prior.map(|p| p.z_index)).unwrap_or(0),
            opacity: self.opacity.or_else(|| prior.and_then(|p| p.opacity)),
            hidden: self.hidden.or(prior.map(|p| p.hidden)).unwrap_or(false),
            center: self.center.or(prior.map(|p| p.center)).unwrap_or(false),
            scale_position: self
                .scale_position
                .or(prior.map(|p| p.scale_position))
                .unwrap_or(true),
            scale_dimension: self
                .scale_dimension
                .or(prior.map(|p| p.scale_dimension))
                .unwrap_or(false),
            hit_area: Rect::default(),
            custom_hit,
            visual: None,
            image_state: None,
            others: self
                .others
                .take()
                .or_else(|| prior.map(|p| p.others.clone()))
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            requested_size,
            floor,
            id: self.id,
        };

        item.visual = match visual {
            Some(visual) => Some(derive_size(&mut item, visual, prior, measure)?),
            None => None,
        };
        item.refresh_hit_area(viewport);
        Ok(item)
    }
}

/// Fill in size (and for lines, position) from the visual
fn derive_size(
    item: &mut DrawableItem,
    visual: Visual,
    prior: Option<&DrawableItem>,
    measure: &dyn TextMeasure,
) -> Result<Visual, Error> {
    let visual = match visual {
        Visual::Text(mut block) => {
            let layout = layout_text(measure, &block.style, &block.text, block.max_line_width);
            block.lines = layout.lines;
            block.line_height = layout.line_height;
            item.width = layout.size.width;
            item.height = layout.size.height;
            Visual::Text(block)
        }
        Visual::Line(line) => {
            let bbox = checked_bbox(&item.id, "line", &line.coordinates, 2)?;
            let stroke = line.width.unwrap_or(0.0);
            item.x = bbox.x();
            item.y = bbox.y();
            item.width = bbox.width() + stroke;
            item.height = bbox.height() + stroke;
            Visual::Line(line)
        }
        Visual::Shape(shape) => {
            let bbox = checked_bbox(&item.id, "shape", &shape.coordinates, 3)?;
            let stroke = shape.width.unwrap_or(0.0);
            item.width = bbox.width() + stroke;
            item.height = bbox.height() + stroke;
            Visual::Shape(shape)
        }
        Visual::Image(mut source) => {
            // Keep a size learned by an earlier load of the same resource
            if source.natural_size.is_none() {
                source.natural_size = prior
                    .and_then(DrawableItem::image_source)
                    .filter(|old| old.src == source.src)
                    .and_then(|old| old.natural_size);
            }
            match source.natural_size {
                Some(natural) => {
                    item.width = item.requested_size.0.filter(|w| *w != 0.0).unwrap_or(natural.width);
                    item.height = item
                        .requested_size
                        .1
                        .filter(|h| *h != 0.0)
                        .unwrap_or(natural.height);
                    item.image_state = Some(ImageState::Ready);
                }
                None => item.image_state = Some(ImageState::Pending),
            }
            Visual::Image(source)
        }
        Visual::Circle(circle) => {
            item.width = circle.radius * 2.0;
            item.height = circle.radius * 2.0;
            Visual::Circle(circle)
        }
        Visual::Rect(rect) => {
            item.width = rect.width;
            item.height = rect.height;
            Visual::Rect(rect)
        }
    };
    Ok(visual)
}

fn checked_bbox(id: &str, kind: &str, coordinates: &[Point], required: usize) -> Result<Rect, Error> {
    if coordinates.len() < required {
        return Err(Error::InvalidGeometry {
            id: id.to_string(),
            reason: format!(
                "a {kind} needs at least {required} coordinates, got {}",
                coordinates.len()
            ),
        });
    }
    bounding_box(coordinates).ok_or_else(|| Error::InvalidGeometry {
        id: id.to_string(),
        reason: format!("{kind} has no coordinates"),
    })
}

/// Input record for `add_tiles`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TileDescriptor {
    pub id: String,
    pub floor: String,
    pub x: f64,
    pub y: f64,
    pub image: Option<ImageSource>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub hidden: bool,
}

impl TileDescriptor {
    pub fn new(id: impl Into<String>, floor: impl Into<String>, x: f64, y: f64, image: ImageSource) -> Self {
        Self {
            id: id.into(),
            floor: floor.into(),
            x,
            y,
            image: Some(image),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::MissingField { field: "id", index });
        }
        if self.floor.is_empty() {
            return Err(Error::MissingField {
                field: "floor",
                index,
            });
        }
        Ok(())
    }

    /// Tiles are never scaled and sit at z-index 0
    pub(crate) fn into_item(self, viewport: &Viewport) -> DrawableItem {
        let image_state = self.image.as_ref().map(|image| match image.natural_size {
            Some(_) => ImageState::Ready,
            None => ImageState::Pending,
        });
        let natural = self.image.as_ref().and_then(|image| image.natural_size);
        let mut item = DrawableItem {
            id: self.id,
            floor: self.floor,
            x: self.x,
            y: self.y,
            offset_x: 0.0,
            offset_y: 0.0,
            width: natural.map_or(self.width.unwrap_or(0.0), |s| s.width),
            height: natural.map_or(self.height.unwrap_or(0.0), |s| s.height),
            z_index: 0,
            opacity: None,
            hidden: self.hidden,
            center: false,
            scale_position: false,
            scale_dimension: false,
            hit_area: Rect::default(),
            custom_hit: CustomHitArea::default(),
            visual: self.image.map(Visual::Image),
            image_state,
            others: serde_json::Value::Object(Default::default()),
            requested_size: (None, None),
        };
        item.refresh_hit_area(viewport);
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl TextMeasure for Fixed {
        fn measure_text(&self, _font: &str, text: &str) -> Size {
            Size::new(text.len() as f64 * 5.0, 10.0)
        }
    }

    fn viewport(level: usize) -> Viewport {
        let mut vp = Viewport::new(vec![1.0, 0.5]).unwrap();
        vp.set_dimension(100.0, 100.0);
        vp.set_position(0.0, 0.0, Some("1"), Some(level)).unwrap();
        vp
    }

    fn resolve(desc: ItemDescriptor, prior: Option<&DrawableItem>) -> Result<DrawableItem, Error> {
        desc.resolve(0, prior, &Fixed, &viewport(0))
    }

    #[test]
    fn test_defaults_for_new_item() {
        let item = resolve(ItemDescriptor::new("a", "1"), None).unwrap();
        assert!(item.scale_position);
        assert!(!item.scale_dimension);
        assert!(!item.center && !item.hidden);
        assert_eq!(item.z_index, 0);
        assert_eq!(item.opacity, None);
        assert_eq!(item.others, serde_json::json!({}));
        assert!(item.visual.is_none());
    }

    #[test]
    fn test_missing_fields() {
        let err = resolve(ItemDescriptor::update(""), None).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "id", .. }));
        let err = resolve(ItemDescriptor::update("a"), None).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "floor", .. }));
    }

    #[test]
    fn test_visual_precedence() {
        let desc = ItemDescriptor::new("a", "1")
            .rect(RectStyle {
                width: 4.0,
                height: 4.0,
                ..Default::default()
            })
            .circle(Circle {
                radius: 3.0,
                ..Default::default()
            });
        let item = resolve(desc, None).unwrap();
        assert_eq!(item.visual.as_ref().map(Visual::kind_name), Some("circle"));
        assert_eq!((item.width, item.height), (6.0, 6.0));
    }

    #[test]
    fn test_line_takes_bbox_origin_and_stroke() {
        let desc = ItemDescriptor::new("l", "1").line(LineStyle {
            coordinates: vec![Point::new(10.0, 20.0), Point::new(30.0, 5.0)],
            width: Some(2.0),
            ..Default::default()
        });
        let item = resolve(desc, None).unwrap();
        assert_eq!((item.x, item.y), (10.0, 5.0));
        assert_eq!((item.width, item.height), (22.0, 17.0));
    }

    #[test]
    fn test_degenerate_geometry_is_rejected() {
        let desc = ItemDescriptor::new("s", "1").shape(ShapeStyle {
            coordinates: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            ..Default::default()
        });
        assert!(matches!(resolve(desc, None), Err(Error::InvalidGeometry { .. })));
    }

    #[test]
    fn test_partial_update_keeps_prior_fields() {
        let prior = resolve(
            ItemDescriptor::new("a", "1")
                .at(1.0, 2.0)
                .z_index(4)
                .opacity(0.5)
                .rect(RectStyle {
                    width: 8.0,
                    height: 9.0,
                    color: Some("red".into()),
                    border_color: None,
                }),
            None,
        )
        .unwrap();

        let mut update = ItemDescriptor::update("a");
        update.x = Some(5.0);
        let item = resolve(update, Some(&prior)).unwrap();

        assert_eq!(item.x, 5.0);
        assert_eq!(item.y, 2.0);
        assert_eq!(item.floor, "1");
        assert_eq!(item.z_index, 4);
        assert_eq!(item.opacity, Some(0.5));
        assert_eq!(item.visual, prior.visual);
        assert_eq!((item.width, item.height), (8.0, 9.0));
    }

    #[test]
    fn test_partial_update_with_new_visual_replaces_old() {
        let prior = resolve(
            ItemDescriptor::new("a", "1").text(TextBlock {
                text: "hi".into(),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
        assert_eq!(prior.visual.as_ref().map(Visual::kind_name), Some("text"));

        let update = ItemDescriptor::update("a").rect(RectStyle {
            width: 4.0,
            height: 2.0,
            ..Default::default()
        });
        let item = resolve(update, Some(&prior)).unwrap();
        assert!(matches!(item.visual, Some(Visual::Rect(_))));
        assert_eq!((item.width, item.height), (4.0, 2.0));

        let kept = resolve(ItemDescriptor::update("a").z_index(1), Some(&item)).unwrap();
        assert_eq!(kept.visual, item.visual);
    }

    #[test]
    fn test_image_waits_for_natural_size() {
        let item = resolve(ItemDescriptor::new("i", "1").image(ImageSource::new("a.png")), None).unwrap();
        assert_eq!(item.image_state, Some(ImageState::Pending));
        assert_eq!(item.width, 0.0);

        let sized = resolve(
            ItemDescriptor::new("i", "1")
                .size(16.0, 0.0)
                .image(ImageSource::loaded("a.png", Size::new(32.0, 24.0))),
            None,
        )
        .unwrap();
        assert_eq!(sized.image_state, Some(ImageState::Ready));
        assert_eq!((sized.width, sized.height), (16.0, 24.0));
    }

    #[test]
    fn test_centered_hit_area_matches_rendered_box() {
        let vp = viewport(1);
        let desc = ItemDescriptor::new("c", "1")
            .at(100.0, 100.0)
            .center(true)
            .scale_dimension(true)
            .rect(RectStyle {
                width: 40.0,
                height: 20.0,
                ..Default::default()
            });
        let item = desc.resolve(0, None, &Fixed, &vp).unwrap();
        let rendered = item.rendered_box(&vp);
        assert_eq!(rendered, Rect::new(40.0, 45.0, 20.0, 10.0));
        // hit x is in map space and scaled at test time
        assert_eq!(vp.scale(item.hit_area.x()), rendered.x());
        assert_eq!(vp.scale(item.hit_area.y()), rendered.y());
    }

    #[test]
    fn test_custom_hit_overrides_components() {
        let mut desc = ItemDescriptor::new("a", "1").at(3.0, 4.0).rect(RectStyle {
            width: 10.0,
            height: 10.0,
            ..Default::default()
        });
        desc.custom_hit_width = Some(50.0);
        let item = resolve(desc, None).unwrap();
        assert_eq!(item.hit_area, Rect::new(3.0, 4.0, 50.0, 10.0));
    }

    #[test]
    fn test_descriptor_from_json() {
        let desc: ItemDescriptor = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "floor": "1",
            "x": 0,
            "y": 0,
            "zIndex": 2,
            "rect": { "width": 10, "height": 10, "color": "red" }
        }))
        .unwrap();
        let item = resolve(desc, None).unwrap();
        assert_eq!(item.z_index, 2);
        assert_eq!(
            item.visual,
            Some(Visual::Rect(RectStyle {
                width: 10.0,
                height: 10.0,
                color: Some("red".into()),
                border_color: None,
            }))
        );
    }
}

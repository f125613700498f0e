//! Event payloads delivered to item listeners and canvas subscribers

use std::time::Duration;

use serde::Serialize;

use crate::geometry::Point;
use crate::scene::DrawableItem;
use crate::viewport::ViewportSnapshot;

use super::EventKind;

/// Mouse button carried by a raw pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
}

/// A raw pointer event as reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Position relative to the canvas top-left corner
    pub position: Point,
    pub button: PointerButton,
    /// Monotonic host timestamp, used for dispatch throttling
    pub timestamp: Duration,
}

impl PointerInput {
    /// Primary-button event at `(x, y)`
    pub fn primary(x: f64, y: f64, timestamp: Duration) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            timestamp,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.button == PointerButton::Primary
    }
}

/// Pointer location handed to item listeners
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerPosition {
    /// Scaled-space coordinates
    pub x: f64,
    pub y: f64,
    /// The same point in map space
    pub map_x: f64,
    pub map_y: f64,
}

/// Controls how an item event continues after a listener returns
#[derive(Debug, Clone, Default)]
pub struct EventPropagation {
    /// No lower item receives anything for this raw event
    pub stopped: bool,
    /// Remaining listeners of the current item are skipped
    pub chain_halted: bool,
}

impl EventPropagation {
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    pub fn halt_chain(&mut self) {
        self.chain_halted = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }
}

/// Event passed to a per-item listener
pub struct ItemEvent<'a> {
    pub kind: EventKind,
    /// Full descriptor of the item the event targets
    pub item: &'a DrawableItem,
    pub pointer: PointerPosition,
    /// Segment index for line hits
    pub line_index: Option<usize>,
    pub(crate) propagation: EventPropagation,
}

impl<'a> ItemEvent<'a> {
    pub(crate) fn new(
        kind: EventKind,
        item: &'a DrawableItem,
        pointer: PointerPosition,
        line_index: Option<usize>,
    ) -> Self {
        Self {
            kind,
            item,
            pointer,
            line_index,
            propagation: EventPropagation::default(),
        }
    }

    /// Keep items below this one from seeing the current raw event.
    ///
    /// Also skips this item's remaining listeners and event kinds.
    pub fn stop_propagation(&mut self) {
        self.propagation.stop_propagation();
        self.propagation.halt_chain();
    }

    /// Skip the remaining listeners registered on this item for this kind
    pub fn halt_listeners(&mut self) {
        self.propagation.halt_chain();
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation.is_propagation_stopped()
    }
}

impl std::fmt::Debug for ItemEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemEvent")
            .field("kind", &self.kind)
            .field("item", &self.item.id)
            .field("pointer", &self.pointer)
            .field("line_index", &self.line_index)
            .field("propagation", &self.propagation)
            .finish()
    }
}

/// Pointer position relative to the canvas plus its map-space equivalent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPointer {
    pub client_x: f64,
    pub client_y: f64,
    pub client_map_x: f64,
    pub client_map_y: f64,
}

/// Center a pan gesture is about to move to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanTarget {
    pub new_x: f64,
    pub new_y: f64,
    pub new_left_x: f64,
    pub new_top_y: f64,
}

/// Snapshot handed to canvas-level subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEvent {
    #[serde(flatten)]
    pub viewport: ViewportSnapshot,
    #[serde(flatten)]
    pub client: Option<ClientPointer>,
    /// Sign of the wheel delta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wheel_delta: Option<f64>,
    #[serde(flatten)]
    pub pan: Option<PanTarget>,
    /// Level a finished pinch resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinch_level: Option<usize>,
}

impl CanvasEvent {
    pub fn new(viewport: ViewportSnapshot) -> Self {
        Self {
            viewport,
            client: None,
            wheel_delta: None,
            pan: None,
            pinch_level: None,
        }
    }

    pub fn with_client(mut self, client: ClientPointer) -> Self {
        self.client = Some(client);
        self
    }
}

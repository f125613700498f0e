//! Input dispatcher
//!
//! Turns raw pointer events into per-item gestures. Items are hit-tested in
//! reverse paint order and listener chains run synchronously; an item that
//! stops propagation hides the event from every item below it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::geometry::Point;
use crate::scene::{DrawableItem, SceneStore, Visual};
use crate::viewport::Viewport;

use super::hit_testing::{line_section_hit, polygon_hit, rect_hit};
use super::{
    CanvasEmitter, CanvasEvent, CanvasEventKind, ClientPointer, EventKind, GestureState,
    ItemEvent, ListenerRegistry, PanTarget, PointerInput, PointerPosition,
};

/// Raw pointer phases subject to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

impl PointerPhase {
    /// Phases that go through the throttle; pointer-up always runs at once
    const THROTTLED: [PointerPhase; 2] = [PointerPhase::Down, PointerPhase::Move];
}

/// Leading and trailing edge rate limiter, one window per phase
#[derive(Debug, Default)]
struct Throttle {
    interval: Duration,
    last_run: HashMap<PointerPhase, Duration>,
    trailing: HashMap<PointerPhase, PointerInput>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Whether `input` runs now; otherwise it becomes the trailing call
    fn admit(&mut self, phase: PointerPhase, input: PointerInput) -> bool {
        let open = match self.last_run.get(&phase) {
            Some(last) => input.timestamp.saturating_sub(*last) >= self.interval,
            None => true,
        };
        if open {
            self.last_run.insert(phase, input.timestamp);
            self.trailing.remove(&phase);
        } else {
            self.trailing.insert(phase, input);
        }
        open
    }

    /// Trailing calls whose window has elapsed at `now`
    fn due(&mut self, now: Duration) -> Vec<(PointerPhase, PointerInput)> {
        let mut due = Vec::new();
        for phase in PointerPhase::THROTTLED {
            let ready = match self.last_run.get(&phase) {
                Some(last) => now.saturating_sub(*last) >= self.interval,
                None => true,
            };
            if !ready {
                continue;
            }
            if let Some(input) = self.trailing.remove(&phase) {
                self.last_run.insert(phase, now);
                due.push((phase, input));
            }
        }
        due
    }

    /// Drop every held-back call
    fn discard_trailing(&mut self) {
        self.trailing.clear();
    }

    fn has_pending(&self) -> bool {
        !self.trailing.is_empty()
    }
}

/// Active canvas pan
#[derive(Debug, Clone, Copy)]
struct PanGesture {
    down_client: Point,
    origin: Point,
}

/// Snapshot plus client coordinates for canvas subscribers
pub fn client_event(viewport: &Viewport, client: Point) -> CanvasEvent {
    let map = viewport.client_to_map(client);
    CanvasEvent::new(viewport.snapshot()).with_client(ClientPointer {
        client_x: client.x,
        client_y: client.y,
        client_map_x: map.x,
        client_map_y: map.y,
    })
}

/// Run an item's listener chain for one kind.
///
/// Returns `true` when a listener stopped propagation.
fn fire(
    registry: &ListenerRegistry,
    kind: EventKind,
    item: &DrawableItem,
    pointer: PointerPosition,
    line_index: Option<usize>,
) -> bool {
    let listeners = registry.listeners(kind, &item.id);
    if listeners.is_empty() {
        return false;
    }
    log::trace!("dispatching {kind} to {} ({} listeners)", item.id, listeners.len());

    let mut event = ItemEvent::new(kind, item, pointer, line_index);
    for listener in listeners {
        listener(&mut event);
        if event.propagation.chain_halted {
            break;
        }
    }
    event.propagation.stopped
}

/// Pointer state machine for the map item layer
#[derive(Debug)]
pub struct InputDispatcher {
    gestures: GestureState,
    throttle: Throttle,
    /// Client position of the last primary pointer-down
    last_down_client: Option<Point>,
    pan: Option<PanGesture>,
    /// Set while an item is dragged
    prevent_pan: bool,
    last_pointer: Option<PointerPosition>,
    line_hit_margin: f64,
}

impl InputDispatcher {
    pub fn new(throttle: Duration, line_hit_margin: f64) -> Self {
        Self {
            gestures: GestureState::new(),
            throttle: Throttle::new(throttle),
            last_down_client: None,
            pan: None,
            prevent_pan: false,
            last_pointer: None,
            line_hit_margin,
        }
    }

    pub fn gestures(&self) -> &GestureState {
        &self.gestures
    }

    /// Whether a throttled dispatch is waiting for its window
    pub fn has_pending(&self) -> bool {
        self.throttle.has_pending()
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    pub fn pointer_down(
        &mut self,
        input: PointerInput,
        scene: &SceneStore,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) {
        if !input.is_primary() {
            return;
        }
        self.last_down_client = Some(input.position);
        self.pan = Some(PanGesture {
            down_client: input.position,
            origin: Point::new(viewport.x(), viewport.y()),
        });
        if self.throttle.admit(PointerPhase::Down, input) {
            self.dispatch(PointerPhase::Down, input.position, scene, viewport, emitter);
        }
    }

    /// Dispatch a move and compute the pan target, if a pan is active
    pub fn pointer_move(
        &mut self,
        input: PointerInput,
        scene: &SceneStore,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) -> Option<Point> {
        if input.is_primary() && self.throttle.admit(PointerPhase::Move, input) {
            self.dispatch(PointerPhase::Move, input.position, scene, viewport, emitter);
        }
        self.pan_target(input.position, viewport, emitter)
    }

    /// Dispatch a pointer-up. Returns `true` when it ended a pan gesture.
    ///
    /// Pointer-up is never throttled. Downs and moves still held back are
    /// dropped so none of them can replay after the gesture ended.
    pub fn pointer_up(
        &mut self,
        input: PointerInput,
        scene: &SceneStore,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) -> bool {
        if !input.is_primary() {
            return false;
        }
        if self.throttle.has_pending() {
            log::trace!("pointer-up drops held-back dispatches");
            self.throttle.discard_trailing();
        }
        self.dispatch(PointerPhase::Up, input.position, scene, viewport, emitter);
        self.pan.take().is_some()
    }

    /// Run throttled dispatches whose window has elapsed
    pub fn flush(
        &mut self,
        now: Duration,
        scene: &SceneStore,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) {
        for (phase, input) in self.throttle.due(now) {
            log::trace!("running trailing {phase:?} dispatch");
            self.dispatch(phase, input.position, scene, viewport, emitter);
        }
    }

    /// New center for the active pan, after mouse-move subscribers had
    /// their say
    fn pan_target(
        &self,
        client: Point,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) -> Option<Point> {
        let pan = self.pan?;
        if self.prevent_pan {
            return None;
        }
        let proposed = Point::new(
            pan.origin.x + viewport.unscale(pan.down_client.x - client.x),
            pan.origin.y + viewport.unscale(pan.down_client.y - client.y),
        );
        let target = emitter.emit_mouse_move(proposed, |center| {
            let mut event = client_event(viewport, client);
            event.pan = Some(PanTarget {
                new_x: center.x,
                new_y: center.y,
                new_left_x: center.x - viewport.normalized_width() / 2.0,
                new_top_y: center.y - viewport.normalized_height() / 2.0,
            });
            event
        });
        Some(target)
    }

    /// Fire `mouseout` for hovered items that are about to disappear, then
    /// drop their gesture state
    pub fn detach_items<S: AsRef<str>>(&mut self, ids: &[S], scene: &SceneStore) {
        let pointer = self.last_pointer.unwrap_or(PointerPosition {
            x: 0.0,
            y: 0.0,
            map_x: 0.0,
            map_y: 0.0,
        });
        for id in ids {
            let id = id.as_ref();
            if self.gestures.is_hovering(id) {
                if let Some(item) = scene.items().get(id) {
                    fire(scene.listeners(), EventKind::MouseOut, item, pointer, None);
                }
            }
            self.gestures.forget(id);
        }
    }

    /// [`detach_items`](Self::detach_items) for every item in the store
    pub fn detach_all(&mut self, scene: &SceneStore) {
        let ids = scene.items().ids().to_vec();
        self.detach_items(&ids, scene);
        self.gestures.clear();
    }

    fn hit_test(&self, item: &DrawableItem, point: Point, viewport: &Viewport) -> (bool, Option<usize>) {
        let hit = item.hit_area;
        match &item.visual {
            Some(Visual::Shape(shape)) => {
                let vertices: Vec<Point> = shape
                    .coordinates
                    .iter()
                    .map(|c| {
                        Point::new(
                            item.scaled_position(c.x + hit.x(), viewport),
                            item.scaled_position(c.y + hit.y(), viewport),
                        )
                    })
                    .collect();
                match polygon_hit(point.x, point.y, &vertices) {
                    Ok(inside) => (inside, None),
                    Err(e) => {
                        log::warn!("Skipping hit test for {}: {e}", item.id);
                        (false, None)
                    }
                }
            }
            Some(Visual::Line(line)) => {
                let vertices: Vec<Point> = line
                    .coordinates
                    .iter()
                    .map(|c| {
                        Point::new(
                            item.scaled_position(c.x, viewport),
                            item.scaled_position(c.y, viewport),
                        )
                    })
                    .collect();
                let margin = line.hit_error_margin.unwrap_or(self.line_hit_margin);
                match line_section_hit(point.x, point.y, margin, &vertices) {
                    Ok(index) => (index.is_some(), index),
                    Err(e) => {
                        log::warn!("Skipping hit test for {}: {e}", item.id);
                        (false, None)
                    }
                }
            }
            _ => {
                let (width, height) = if item.scale_dimension {
                    (viewport.scale(hit.width()), viewport.scale(hit.height()))
                } else {
                    (hit.width(), hit.height())
                };
                let inside = rect_hit(
                    point.x,
                    point.y,
                    item.scaled_position(hit.x(), viewport) + item.offset_x,
                    item.scaled_position(hit.y(), viewport) + item.offset_y,
                    width,
                    height,
                );
                (inside, None)
            }
        }
    }

    fn dispatch(
        &mut self,
        phase: PointerPhase,
        client: Point,
        scene: &SceneStore,
        viewport: &Viewport,
        emitter: &CanvasEmitter,
    ) {
        let scaled = viewport.client_to_scaled(client);
        let pointer = PointerPosition {
            x: scaled.x,
            y: scaled.y,
            map_x: viewport.unscale(scaled.x),
            map_y: viewport.unscale(scaled.y),
        };
        self.last_pointer = Some(pointer);

        let same_position = self.last_down_client == Some(client);
        let registry = scene.listeners();
        let mut visited = HashSet::new();
        let mut any_clicked = false;

        let items_visible = !scene.is_layer_hidden(crate::scene::LayerId::MapItems);
        for item in scene.items().iter().rev().filter(|_| items_visible) {
            if item.hidden
                || viewport.floor() != Some(item.floor.as_str())
                || !viewport.in_viewport(&item.rendered_box(viewport))
            {
                continue;
            }
            visited.insert(item.id.as_str());

            let (hit, line_index) = self.hit_test(item, scaled, viewport);
            let mut kinds = Vec::new();
            match phase {
                PointerPhase::Down => {
                    if hit {
                        self.gestures.set_down(&item.id);
                    }
                }
                PointerPhase::Move => {
                    if hit && self.gestures.enter(&item.id) {
                        kinds.push(EventKind::MouseOver);
                    }
                    if hit {
                        kinds.push(EventKind::MouseMove);
                    }
                    if !hit && self.gestures.leave(&item.id) {
                        kinds.push(EventKind::MouseOut);
                    }
                    if self.gestures.is_down(&item.id)
                        && registry.has_listeners(EventKind::Drag, &item.id)
                    {
                        self.gestures.start_drag(&item.id);
                        self.prevent_pan = true;
                        kinds.push(EventKind::Drag);
                    }
                }
                PointerPhase::Up => {
                    if self.gestures.release(&item.id) {
                        kinds.push(EventKind::DragEnd);
                    }
                    if hit {
                        kinds.push(EventKind::MouseUp);
                        if same_position {
                            kinds.push(EventKind::Click);
                            any_clicked = true;
                        }
                    }
                }
            }

            let stopped = kinds
                .into_iter()
                .any(|kind| fire(registry, kind, item, pointer, line_index));
            if stopped {
                log::trace!("{} stopped propagation", item.id);
                break;
            }
        }

        if phase == PointerPhase::Up {
            if !any_clicked && same_position {
                emitter.emit(CanvasEventKind::ClickAway, &client_event(viewport, client));
            }
            self.gestures.release_all();
            self.prevent_pan = false;
        }

        for id in self.gestures.hovering() {
            if visited.contains(id.as_str()) {
                continue;
            }
            if let Some(item) = scene.items().get(&id) {
                fire(registry, EventKind::MouseOut, item, pointer, None);
            }
            self.gestures.leave(&id);
        }
    }
}

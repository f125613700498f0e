//! Canvas-level subscriber lists
//!
//! Subscribers are kept per kind in registration order and removed through
//! the [`ListenerHandle`] returned when they were added.

use std::fmt;
use std::rc::Rc;

use crate::geometry::Point;

use super::CanvasEvent;

/// Opaque token identifying a canvas subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Canvas subscriber receiving a viewport snapshot
pub type CanvasListener = Rc<dyn Fn(&CanvasEvent)>;

/// Pan subscriber; may return a replacement center for the pending move
pub type PanListener = Rc<dyn Fn(&CanvasEvent) -> Option<Point>>;

/// Listeners of a single kind in registration order
pub struct ListenerList<F: ?Sized> {
    entries: Vec<(ListenerHandle, Rc<F>)>,
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for ListenerList<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<F: ?Sized> ListenerList<F> {
    fn push(&mut self, handle: ListenerHandle, listener: Rc<F>) {
        self.entries.push((handle, listener));
    }

    fn remove(&mut self, handle: ListenerHandle) -> bool {
        match self.entries.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Detached copy of the current listeners
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.iter().map(|(_, l)| Rc::clone(l)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Kinds of canvas-level subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasEventKind {
    PositionChange,
    MouseUp,
    Wheel,
    ContextMenu,
    PinchEnd,
    ClickAway,
}

/// Subscriber lists for every canvas-level event
#[derive(Debug, Default)]
pub struct CanvasEmitter {
    next_handle: u64,
    mouse_move: ListenerList<dyn Fn(&CanvasEvent) -> Option<Point>>,
    position_change: ListenerList<dyn Fn(&CanvasEvent)>,
    mouse_up: ListenerList<dyn Fn(&CanvasEvent)>,
    wheel: ListenerList<dyn Fn(&CanvasEvent)>,
    context_menu: ListenerList<dyn Fn(&CanvasEvent)>,
    pinch_end: ListenerList<dyn Fn(&CanvasEvent)>,
    click_away: ListenerList<dyn Fn(&CanvasEvent)>,
}

impl CanvasEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ListenerHandle {
        self.next_handle += 1;
        ListenerHandle(self.next_handle)
    }

    fn list_mut(&mut self, kind: CanvasEventKind) -> &mut ListenerList<dyn Fn(&CanvasEvent)> {
        match kind {
            CanvasEventKind::PositionChange => &mut self.position_change,
            CanvasEventKind::MouseUp => &mut self.mouse_up,
            CanvasEventKind::Wheel => &mut self.wheel,
            CanvasEventKind::ContextMenu => &mut self.context_menu,
            CanvasEventKind::PinchEnd => &mut self.pinch_end,
            CanvasEventKind::ClickAway => &mut self.click_away,
        }
    }

    fn list(&self, kind: CanvasEventKind) -> &ListenerList<dyn Fn(&CanvasEvent)> {
        match kind {
            CanvasEventKind::PositionChange => &self.position_change,
            CanvasEventKind::MouseUp => &self.mouse_up,
            CanvasEventKind::Wheel => &self.wheel,
            CanvasEventKind::ContextMenu => &self.context_menu,
            CanvasEventKind::PinchEnd => &self.pinch_end,
            CanvasEventKind::ClickAway => &self.click_away,
        }
    }

    /// Register a subscriber
    pub fn on(&mut self, kind: CanvasEventKind, listener: CanvasListener) -> ListenerHandle {
        let handle = self.allocate();
        self.list_mut(kind).push(handle, listener);
        handle
    }

    /// Register a pan subscriber
    pub fn on_mouse_move(&mut self, listener: PanListener) -> ListenerHandle {
        let handle = self.allocate();
        self.mouse_move.push(handle, listener);
        handle
    }

    pub fn off(&mut self, kind: CanvasEventKind, handle: ListenerHandle) -> bool {
        self.list_mut(kind).remove(handle)
    }

    pub fn off_mouse_move(&mut self, handle: ListenerHandle) -> bool {
        self.mouse_move.remove(handle)
    }

    /// Deliver an event to every subscriber of `kind`
    pub fn emit(&self, kind: CanvasEventKind, event: &CanvasEvent) {
        let listeners = self.list(kind).snapshot();
        log::trace!("emitting {:?} to {} subscribers", kind, listeners.len());
        for listener in listeners {
            listener(event);
        }
    }

    /// Run pan subscribers in order, each seeing the previous override.
    ///
    /// `build` turns the current proposed center into the event to deliver.
    pub fn emit_mouse_move(&self, proposed: Point, build: impl Fn(Point) -> CanvasEvent) -> Point {
        let mut target = proposed;
        for listener in self.mouse_move.snapshot() {
            if let Some(replacement) = listener(&build(target)) {
                target = replacement;
            }
        }
        target
    }

    pub fn subscriber_count(&self, kind: CanvasEventKind) -> usize {
        self.list(kind).len()
    }
}

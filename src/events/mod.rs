//! Pointer input handling for the map canvas
//!
//! The event system provides:
//! - Pure hit-test predicates for rectangles, polygons and polylines
//! - A per-item listener registry keyed by [`EventKind`]
//! - Canvas-level subscriber lists with removable handles
//! - The input dispatcher turning raw pointer events into item gestures

pub mod dispatcher;
pub mod emitter;
pub mod event;
pub mod gesture;
pub mod hit_testing;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use dispatcher::{client_event, InputDispatcher, PointerPhase};
pub use emitter::{CanvasEmitter, CanvasEventKind, CanvasListener, ListenerHandle, PanListener};
pub use event::*;
pub use gesture::GestureState;
pub use registry::{ItemListener, ListenerRegistry, DEFAULT_LISTENER_ID};

/// Per-item event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Click,
    MouseOver,
    MouseOut,
    MouseMove,
    MouseUp,
    Drag,
    DragEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Click,
        EventKind::MouseOver,
        EventKind::MouseOut,
        EventKind::MouseMove,
        EventKind::MouseUp,
        EventKind::Drag,
        EventKind::DragEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::MouseOver => "mouseover",
            EventKind::MouseOut => "mouseout",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseUp => "mouseup",
            EventKind::Drag => "drag",
            EventKind::DragEnd => "dragend",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::UnsupportedEvent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_parsing() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        let err = "dblclick".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "Event dblclick not supported");
    }

    #[test]
    fn test_event_kind_serde_names() {
        let json = serde_json::to_string(&EventKind::DragEnd).unwrap();
        assert_eq!(json, "\"dragend\"");
        let kind: EventKind = serde_json::from_str("\"mouseover\"").unwrap();
        assert_eq!(kind, EventKind::MouseOver);
    }
}

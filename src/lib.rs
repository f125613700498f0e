// Core module of the mapcanvas indoor map engine
pub mod canvas;
pub mod config;
pub mod events;
pub mod geometry;
pub mod image;
pub mod renderer;
pub mod scene;
pub mod viewport;

/// Version of the mapcanvas crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::canvas::CanvasHandler;
    pub use crate::config::CanvasConfig;
    pub use crate::events::{
        CanvasEvent, EventKind, ItemEvent, ListenerHandle, PointerButton, PointerInput,
    };
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::image::{ImageLoadError, ImageLoader};
    pub use crate::renderer::{recording::RecordingSurface, RenderingSurface};
    pub use crate::scene::{
        ImageSource, ItemDescriptor, LayerId, SetItemsOptions, TileDescriptor, Visual,
    };
    pub use crate::viewport::{Viewport, ViewportSnapshot};
    pub use crate::Error;
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while feeding or driving the canvas
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field} is required for canvas item (record {index})")]
    MissingField { field: &'static str, index: usize },

    #[error("updatePosition got invalid parameters x={x}, y={y}, floor={floor:?}, level={level:?}")]
    InvalidPosition {
        x: f64,
        y: f64,
        floor: Option<String>,
        level: Option<usize>,
    },

    #[error("Zoom level {level} is outside a table of {len} levels")]
    InvalidLevel { level: usize, len: usize },

    #[error("Invalid zoom table: {0}")]
    InvalidZoomTable(String),

    #[error("Invalid canvas config: {0}")]
    InvalidConfig(String),

    #[error("{0} only accepts an array")]
    NotAnArray(&'static str),

    #[error("Event {0} not supported")]
    UnsupportedEvent(String),

    #[error("Invalid geometry for canvas item {id}: {reason}")]
    InvalidGeometry { id: String, reason: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

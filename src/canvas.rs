//! The map canvas facade
//!
//! [`CanvasHandler`] owns the viewport, the scene, the input dispatcher and
//! the drawing surface. Every mutation goes through it and schedules the
//! next paint; the host drives paints and image loads by calling
//! [`CanvasHandler::tick`].

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use crate::config::CanvasConfig;
use crate::events::{
    client_event, CanvasEmitter, CanvasEvent, CanvasEventKind, EventKind, InputDispatcher,
    ItemEvent, ListenerHandle, PointerInput,
};
use crate::geometry::Point;
use crate::image::{ImageLoadError, ImageLoadOutcome, ImageLoader};
use crate::renderer::{paint, RenderScheduler, RenderStats, RenderingSurface};
use crate::scene::{
    ItemDescriptor, LayerId, PendingImage, SceneStore, SetItemsOptions, TileDescriptor,
};
use crate::viewport::{Viewport, ViewportSnapshot};
use crate::{Error, Result};

/// Interactive map canvas over a rendering surface
pub struct CanvasHandler<S: RenderingSurface> {
    config: CanvasConfig,
    viewport: Viewport,
    scene: SceneStore,
    dispatcher: InputDispatcher,
    emitter: CanvasEmitter,
    scheduler: RenderScheduler,
    surface: S,
    image_loader: Option<Rc<dyn ImageLoader>>,
    pending_loads: FuturesUnordered<LocalBoxFuture<'static, ImageLoadOutcome>>,
}

impl<S: RenderingSurface> CanvasHandler<S> {
    /// Create a canvas; the viewport has no floor until the first
    /// [`update_position`](Self::update_position)
    pub fn new(surface: S, config: CanvasConfig) -> Result<Self> {
        config.validate()?;
        let viewport = Viewport::new(config.level_to_scale.clone())?;
        let mut scene = SceneStore::new();
        for layer in &config.hidden_layers {
            scene.set_layer_hidden(*layer, true);
        }
        let dispatcher = InputDispatcher::new(config.dispatch_throttle(), config.line_hit_margin);

        Ok(Self {
            config,
            viewport,
            scene,
            dispatcher,
            emitter: CanvasEmitter::new(),
            scheduler: RenderScheduler::new(),
            surface,
            image_loader: None,
            pending_loads: FuturesUnordered::new(),
        })
    }

    pub fn set_image_loader(&mut self, loader: impl ImageLoader + 'static) {
        self.image_loader = Some(Rc::new(loader));
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn dispatcher(&self) -> &InputDispatcher {
        &self.dispatcher
    }

    /// Current viewport metrics, as handed to subscribers
    pub fn snapshot(&self) -> ViewportSnapshot {
        self.viewport.snapshot()
    }

    // Scene ingest

    /// Add background tiles; existing ids are skipped
    pub fn add_tiles(&mut self, tiles: Vec<TileDescriptor>) -> Result<()> {
        let pending = self.scene.add_tiles(tiles, &self.viewport)?;
        self.spawn_loads(pending);
        self.request_render();
        Ok(())
    }

    /// [`add_tiles`](Self::add_tiles) from a JSON array
    pub fn add_tiles_json(&mut self, tiles: serde_json::Value) -> Result<()> {
        if !tiles.is_array() {
            return Err(Error::NotAnArray("addTiles"));
        }
        let tiles: Vec<TileDescriptor> = serde_json::from_value(tiles)?;
        self.add_tiles(tiles)
    }

    pub fn remove_all_tiles(&mut self) {
        self.scene.remove_all_tiles();
        self.request_render();
    }

    /// Insert or update map items.
    ///
    /// The batch is validated as a whole; on error nothing changes. Images
    /// of unknown size are loaded in the background and painted once
    /// resolved.
    pub fn set_items(&mut self, items: Vec<ItemDescriptor>, options: SetItemsOptions) -> Result<()> {
        let staged = self
            .scene
            .stage_items(items, options, &self.surface, &self.viewport)?;
        if !options.merge {
            self.dispatcher.detach_all(&self.scene);
        }
        let pending = self.scene.commit_items(staged);
        self.spawn_loads(pending);
        self.request_render();
        Ok(())
    }

    /// [`set_items`](Self::set_items) from a JSON array
    pub fn set_items_json(&mut self, items: serde_json::Value, options: SetItemsOptions) -> Result<()> {
        if !items.is_array() {
            return Err(Error::NotAnArray("setItems"));
        }
        let items: Vec<ItemDescriptor> = serde_json::from_value(items)?;
        self.set_items(items, options)
    }

    /// Remove one item. Returns `false` if it did not exist.
    pub fn remove_item(&mut self, id: &str) -> bool {
        !self.remove_items(&[id]).is_empty()
    }

    /// Remove items and their listeners, returning the ids that existed
    pub fn remove_items<T: AsRef<str>>(&mut self, ids: &[T]) -> Vec<String> {
        self.dispatcher.detach_items(ids, &self.scene);
        let removed = self.scene.remove_items(ids);
        if !removed.is_empty() {
            self.request_render();
        }
        removed
    }

    pub fn set_layer_hidden(&mut self, layer: LayerId, hidden: bool) {
        self.scene.set_layer_hidden(layer, hidden);
        self.request_render();
    }

    // Viewport

    /// Resize the canvas in CSS pixels
    pub fn update_viewport_dimension(&mut self, width: f64, height: f64) {
        self.viewport.set_dimension(width, height);
        self.surface
            .resize(width, height, self.config.device_pixel_ratio);
        self.position_changed();
    }

    pub fn update_zoom_table(&mut self, level_to_scale: Vec<f64>) -> Result<()> {
        self.viewport.set_level_to_scale(level_to_scale)?;
        self.position_changed();
        Ok(())
    }

    /// Move the viewport center. `floor` and `level` keep their current
    /// values when `None`; an unchanged position is a no-op.
    pub fn update_position(
        &mut self,
        x: f64,
        y: f64,
        floor: Option<&str>,
        level: Option<usize>,
    ) -> Result<()> {
        if self.viewport.set_position(x, y, floor, level)? {
            self.position_changed();
        }
        Ok(())
    }

    fn position_changed(&mut self) {
        self.request_render();
        self.emitter.emit(
            CanvasEventKind::PositionChange,
            &CanvasEvent::new(self.viewport.snapshot()),
        );
    }

    // Item listeners

    pub fn add_item_listener<F>(
        &mut self,
        kind: EventKind,
        listener_id: &str,
        item_id: &str,
        listener: F,
        prepend: bool,
    ) where
        F: Fn(&mut ItemEvent<'_>) + 'static,
    {
        self.scene
            .listeners_mut()
            .register(kind, listener_id, item_id, Rc::new(listener), prepend);
    }

    /// Like [`add_item_listener`](Self::add_item_listener) with the kind
    /// given by name, e.g. `"mouseover"`
    pub fn add_item_listener_named<F>(
        &mut self,
        kind: &str,
        listener_id: &str,
        item_id: &str,
        listener: F,
        prepend: bool,
    ) -> Result<()>
    where
        F: Fn(&mut ItemEvent<'_>) + 'static,
    {
        let kind: EventKind = kind.parse()?;
        self.add_item_listener(kind, listener_id, item_id, listener, prepend);
        Ok(())
    }

    /// Returns whether the listener was registered
    pub fn remove_item_listener(&mut self, kind: EventKind, listener_id: &str, item_id: &str) -> bool {
        self.scene
            .listeners_mut()
            .unregister(kind, listener_id, item_id)
    }

    pub fn remove_item_listener_named(
        &mut self,
        kind: &str,
        listener_id: &str,
        item_id: &str,
    ) -> Result<bool> {
        let kind: EventKind = kind.parse()?;
        Ok(self.remove_item_listener(kind, listener_id, item_id))
    }

    // Canvas subscriptions

    pub fn on_position_change(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter
            .on(CanvasEventKind::PositionChange, Rc::new(listener))
    }

    /// Fired when a pan gesture ends, with the release position
    pub fn on_mouse_up(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter.on(CanvasEventKind::MouseUp, Rc::new(listener))
    }

    /// Fired for each pan step. Returning a point replaces the proposed
    /// center; later subscribers see the replacement.
    pub fn on_mouse_move(
        &mut self,
        listener: impl Fn(&CanvasEvent) -> Option<Point> + 'static,
    ) -> ListenerHandle {
        self.emitter.on_mouse_move(Rc::new(listener))
    }

    pub fn on_wheel(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter.on(CanvasEventKind::Wheel, Rc::new(listener))
    }

    pub fn on_context_menu(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter.on(CanvasEventKind::ContextMenu, Rc::new(listener))
    }

    pub fn on_pinch_end(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter.on(CanvasEventKind::PinchEnd, Rc::new(listener))
    }

    pub fn on_click_away(&mut self, listener: impl Fn(&CanvasEvent) + 'static) -> ListenerHandle {
        self.emitter.on(CanvasEventKind::ClickAway, Rc::new(listener))
    }

    pub fn remove_canvas_listener(&mut self, kind: CanvasEventKind, handle: ListenerHandle) -> bool {
        self.emitter.off(kind, handle)
    }

    pub fn remove_mouse_move_listener(&mut self, handle: ListenerHandle) -> bool {
        self.emitter.off_mouse_move(handle)
    }

    // Raw input

    pub fn handle_pointer_down(&mut self, input: PointerInput) {
        self.dispatcher
            .pointer_down(input, &self.scene, &self.viewport, &self.emitter);
    }

    /// Dispatch a move; during a pan this also moves the viewport
    pub fn handle_pointer_move(&mut self, input: PointerInput) -> Result<()> {
        let target = self
            .dispatcher
            .pointer_move(input, &self.scene, &self.viewport, &self.emitter);
        match target {
            Some(center) => self.update_position(center.x, center.y, None, None),
            None => Ok(()),
        }
    }

    pub fn handle_pointer_up(&mut self, input: PointerInput) {
        let ended_pan = self
            .dispatcher
            .pointer_up(input, &self.scene, &self.viewport, &self.emitter);
        if ended_pan {
            self.emitter.emit(
                CanvasEventKind::MouseUp,
                &client_event(&self.viewport, input.position),
            );
        }
    }

    /// Report a wheel turn; subscribers receive the sign of `delta_y`
    pub fn handle_wheel(&mut self, client: Point, delta_y: f64) {
        let mut event = client_event(&self.viewport, client);
        event.wheel_delta = Some(if delta_y > 0.0 {
            1.0
        } else if delta_y < 0.0 {
            -1.0
        } else {
            0.0
        });
        self.emitter.emit(CanvasEventKind::Wheel, &event);
    }

    pub fn handle_context_menu(&mut self, client: Point) {
        self.emitter.emit(
            CanvasEventKind::ContextMenu,
            &client_event(&self.viewport, client),
        );
    }

    /// Preview a pinch. Returns the applied scale, or `None` when the
    /// pinch would leave the zoom table's range.
    pub fn handle_pinch_move(&mut self, scale: f64) -> Option<f64> {
        if !self.viewport.pinch_in_range(scale) {
            return None;
        }
        self.surface.set_preview_scale(scale);
        Some(scale)
    }

    /// Finish a pinch, returning the level it resolves to
    pub fn handle_pinch_end(&mut self, scale: f64) -> usize {
        let level = self
            .viewport
            .nearest_level(scale * self.viewport.current_scale());
        let mut event = CanvasEvent::new(self.viewport.snapshot());
        event.pinch_level = Some(level);
        self.emitter.emit(CanvasEventKind::PinchEnd, &event);
        self.surface.set_preview_scale(1.0);
        level
    }

    // Frames and loads

    /// Schedule a paint for the next tick
    pub fn request_render(&mut self) {
        self.scheduler.request();
    }

    pub fn is_render_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Number of image loads still in flight
    pub fn pending_image_loads(&self) -> usize {
        self.pending_loads.len()
    }

    /// Advance the canvas to `now`: run throttled dispatches that are due,
    /// apply finished image loads and paint if a render was requested
    pub fn tick(&mut self, now: Duration) -> Option<RenderStats> {
        self.dispatcher
            .flush(now, &self.scene, &self.viewport, &self.emitter);

        while let Some(Some(outcome)) = self.pending_loads.next().now_or_never() {
            self.apply_load(outcome);
        }

        let frame = self.scheduler.take()?;
        Some(paint(&mut self.surface, &mut self.scene, &self.viewport, frame))
    }

    /// Wait for every in-flight image load and apply the results
    pub async fn wait_for_image_loads(&mut self) {
        while let Some(outcome) = self.pending_loads.next().await {
            self.apply_load(outcome);
        }
    }

    fn spawn_loads(&mut self, pending: Vec<PendingImage>) {
        for PendingImage {
            layer,
            item_id,
            source,
        } in pending
        {
            let Some(loader) = self.image_loader.clone() else {
                self.apply_load(ImageLoadOutcome {
                    layer,
                    item_id,
                    result: Err(ImageLoadError::NoLoader(source.src.clone())),
                    src: source.src,
                });
                continue;
            };
            log::debug!("loading image {} for {item_id}", source.src);
            self.pending_loads.push(
                async move {
                    let result = loader.load(&source).await;
                    ImageLoadOutcome {
                        layer,
                        item_id,
                        src: source.src,
                        result,
                    }
                }
                .boxed_local(),
            );
        }
    }

    fn apply_load(&mut self, outcome: ImageLoadOutcome) {
        let ImageLoadOutcome {
            layer,
            item_id,
            src,
            result,
        } = outcome;
        match result {
            Ok(size) => {
                if self
                    .scene
                    .resolve_image(layer, &item_id, &src, size, &self.viewport)
                {
                    self.request_render();
                } else {
                    log::debug!("image {src} resolved for {item_id}, which no longer uses it");
                }
            }
            Err(e) => {
                log::warn!("Failed to load image for {item_id}: {e}");
                self.scene.fail_image(layer, &item_id, &src);
            }
        }
    }
}

impl<S: RenderingSurface + std::fmt::Debug> std::fmt::Debug for CanvasHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasHandler")
            .field("viewport", &self.viewport)
            .field("scene", &self.scene)
            .field("dispatcher", &self.dispatcher)
            .field("scheduler", &self.scheduler)
            .field("surface", &self.surface)
            .field("pending_loads", &self.pending_loads.len())
            .finish()
    }
}

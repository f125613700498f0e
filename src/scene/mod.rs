//! Scene store: background tiles, foreground items and their listeners
//!
//! Both collections keep a map from id to item plus an id list that fixes
//! paint and hit-test order. Items are re-sorted by z-index after every
//! batch; the sort is stable so equal z-indices keep insertion order.

pub mod item;
pub mod text;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::events::{ListenerRegistry, DEFAULT_LISTENER_ID};
use crate::geometry::Size;
use crate::viewport::Viewport;
use crate::Error;

pub use item::{
    Circle, CustomHitArea, DeclarativeListeners, DrawableItem, ImageSource, ImageState,
    ItemDescriptor, LineCap, LineStyle, RectStyle, ShapeStyle, TextBlock, TileDescriptor, Visual,
};
pub use text::{layout_text, TextLayout, TextMeasure};

/// Render layers, painted in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerId {
    MapTiles,
    MapItems,
}

impl LayerId {
    pub const ORDER: [LayerId; 2] = [LayerId::MapTiles, LayerId::MapItems];
}

/// Options for [`SceneStore::stage_items`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetItemsOptions {
    /// `false` drops every existing item and listener first
    pub merge: bool,
    /// Omitted fields keep the previous value of an existing item
    pub partial: bool,
}

impl Default for SetItemsOptions {
    fn default() -> Self {
        Self {
            merge: true,
            partial: true,
        }
    }
}

/// An image that must be loaded before its item can be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub layer: LayerId,
    pub item_id: String,
    pub source: ImageSource,
}

/// Items keyed by id with a separate paint order
#[derive(Debug, Default, Clone)]
pub struct ItemCollection {
    items: HashMap<String, DrawableItem>,
    order: Vec<String>,
}

impl ItemCollection {
    pub fn get(&self, id: &str) -> Option<&DrawableItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DrawableItem> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in paint order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Items in paint order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DrawableItem> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut DrawableItem> + '_ {
        self.items.values_mut()
    }

    /// Insert or replace; a new id goes to the end of the order
    fn upsert(&mut self, item: DrawableItem) {
        if !self.items.contains_key(&item.id) {
            self.order.push(item.id.clone());
        }
        self.items.insert(item.id.clone(), item);
    }

    fn remove_many<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<String> {
        let doomed: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut removed = Vec::new();
        self.order.retain(|id| {
            if doomed.contains(id.as_str()) {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        for id in &removed {
            self.items.remove(id);
        }
        removed
    }

    fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
    }

    fn sort_by_z_index(&mut self) {
        let items = &self.items;
        self.order
            .sort_by_key(|id| items.get(id).map_or(0, |item| item.z_index));
    }
}

/// A validated batch waiting to be committed
#[derive(Debug)]
pub struct StagedItems {
    items: Vec<DrawableItem>,
    listeners: Vec<(String, DeclarativeListeners)>,
    options: SetItemsOptions,
}

impl StagedItems {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    pub fn options(&self) -> SetItemsOptions {
        self.options
    }
}

/// Tiles, items, listener registry and layer visibility
#[derive(Debug, Default)]
pub struct SceneStore {
    tiles: ItemCollection,
    items: ItemCollection,
    listeners: ListenerRegistry,
    hidden_layers: HashSet<LayerId>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tiles(&self) -> &ItemCollection {
        &self.tiles
    }

    pub fn items(&self) -> &ItemCollection {
        &self.items
    }

    pub fn collection(&self, layer: LayerId) -> &ItemCollection {
        match layer {
            LayerId::MapTiles => &self.tiles,
            LayerId::MapItems => &self.items,
        }
    }

    fn collection_mut(&mut self, layer: LayerId) -> &mut ItemCollection {
        match layer {
            LayerId::MapTiles => &mut self.tiles,
            LayerId::MapItems => &mut self.items,
        }
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }

    pub fn is_layer_hidden(&self, layer: LayerId) -> bool {
        self.hidden_layers.contains(&layer)
    }

    pub fn set_layer_hidden(&mut self, layer: LayerId, hidden: bool) {
        if hidden {
            self.hidden_layers.insert(layer);
        } else {
            self.hidden_layers.remove(&layer);
        }
    }

    /// Add tiles, skipping ids that already exist.
    ///
    /// The whole batch is validated before anything is inserted. Returns the
    /// tiles whose image size is still unknown.
    pub fn add_tiles(
        &mut self,
        tiles: Vec<TileDescriptor>,
        viewport: &Viewport,
    ) -> Result<Vec<PendingImage>, Error> {
        for (index, tile) in tiles.iter().enumerate() {
            tile.validate(index)?;
        }

        let mut pending = Vec::new();
        for tile in tiles {
            if self.tiles.contains(&tile.id) {
                log::debug!("tile {} already present, skipping", tile.id);
                continue;
            }
            let item = tile.into_item(viewport);
            if item.image_state == Some(ImageState::Pending) {
                if let Some(source) = item.image_source() {
                    pending.push(PendingImage {
                        layer: LayerId::MapTiles,
                        item_id: item.id.clone(),
                        source: source.clone(),
                    });
                }
            }
            self.tiles.upsert(item);
        }
        Ok(pending)
    }

    pub fn remove_all_tiles(&mut self) {
        self.tiles.clear();
    }

    /// Resolve a batch of descriptors without touching the store.
    ///
    /// Fails on the first invalid record, leaving the store as it was.
    pub fn stage_items(
        &self,
        descriptors: Vec<ItemDescriptor>,
        options: SetItemsOptions,
        measure: &dyn TextMeasure,
        viewport: &Viewport,
    ) -> Result<StagedItems, Error> {
        let mut staged: Vec<DrawableItem> = Vec::with_capacity(descriptors.len());
        let mut staged_index: HashMap<String, usize> = HashMap::new();
        let mut listeners = Vec::new();

        for (index, mut descriptor) in descriptors.into_iter().enumerate() {
            let declared = std::mem::take(&mut descriptor.listeners);

            let prior = if !options.partial {
                None
            } else if let Some(&i) = staged_index.get(&descriptor.id) {
                staged.get(i)
            } else if options.merge {
                self.items.get(&descriptor.id)
            } else {
                None
            };

            let item = descriptor.resolve(index, prior, measure, viewport)?;
            if !declared.is_empty() {
                listeners.push((item.id.clone(), declared));
            }

            match staged_index.get(&item.id) {
                Some(&i) => staged[i] = item,
                None => {
                    staged_index.insert(item.id.clone(), staged.len());
                    staged.push(item);
                }
            }
        }

        Ok(StagedItems {
            items: staged,
            listeners,
            options,
        })
    }

    /// Apply a staged batch and return the images still to be loaded
    pub fn commit_items(&mut self, staged: StagedItems) -> Vec<PendingImage> {
        if !staged.options.merge {
            self.items.clear();
            self.listeners.clear();
        }

        let mut pending = Vec::new();
        for item in staged.items {
            if item.image_state == Some(ImageState::Pending) {
                if let Some(source) = item.image_source() {
                    pending.push(PendingImage {
                        layer: LayerId::MapItems,
                        item_id: item.id.clone(),
                        source: source.clone(),
                    });
                }
            }
            self.items.upsert(item);
        }

        for (item_id, declared) in staged.listeners {
            for (kind, listener) in declared.into_entries() {
                self.listeners
                    .register(kind, DEFAULT_LISTENER_ID, &item_id, listener, false);
            }
        }

        self.items.sort_by_z_index();
        pending
    }

    /// Remove items and every listener registered on them
    pub fn remove_items<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<String> {
        let removed = self.items.remove_many(ids);
        self.listeners.remove_items(ids);
        removed
    }

    /// Record a finished image load.
    ///
    /// Ignored when the item is gone or now points at another resource.
    pub fn resolve_image(
        &mut self,
        layer: LayerId,
        item_id: &str,
        src: &str,
        natural: Size,
        viewport: &Viewport,
    ) -> bool {
        match self.image_item_mut(layer, item_id, src) {
            Some(item) => {
                item.apply_image_size(natural, viewport);
                true
            }
            None => false,
        }
    }

    /// Mark an image as failed so it stays present but undrawn
    pub fn fail_image(&mut self, layer: LayerId, item_id: &str, src: &str) -> bool {
        match self.image_item_mut(layer, item_id, src) {
            Some(item) => {
                item.image_state = Some(ImageState::Failed);
                true
            }
            None => false,
        }
    }

    fn image_item_mut(&mut self, layer: LayerId, item_id: &str, src: &str) -> Option<&mut DrawableItem> {
        self.collection_mut(layer)
            .get_mut(item_id)
            .filter(|item| item.image_source().is_some_and(|source| source.src == src))
    }

    /// Recompute every hit area against the current viewport
    pub fn refresh_hit_areas(&mut self, viewport: &Viewport) {
        for item in self.tiles.values_mut().chain(self.items.values_mut()) {
            item.refresh_hit_area(viewport);
        }
    }
}

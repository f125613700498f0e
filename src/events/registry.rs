//! Per-item listener registry
//!
//! For every event kind, each item id maps to an ordered list of named
//! listeners. Declarative listeners attached through an item descriptor
//! share the list under [`DEFAULT_LISTENER_ID`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{EventKind, ItemEvent};

/// Listener id reserved for listeners declared on the item itself
pub const DEFAULT_LISTENER_ID: &str = "default";

/// Callback attached to an item
pub type ItemListener = Rc<dyn Fn(&mut ItemEvent<'_>)>;

type ListenerChain = Vec<(String, ItemListener)>;

/// Ordered named listeners grouped by event kind and item id
#[derive(Default)]
pub struct ListenerRegistry {
    chains: HashMap<EventKind, HashMap<String, ListenerChain>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, items) in &self.chains {
            for (item_id, chain) in items {
                let ids: Vec<&str> = chain.iter().map(|(id, _)| id.as_str()).collect();
                map.entry(&(kind, item_id), &ids);
            }
        }
        map.finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a listener.
    ///
    /// Replacing keeps the original position; `prepend` only matters for a
    /// listener id the item has not seen yet.
    pub fn register(
        &mut self,
        kind: EventKind,
        listener_id: &str,
        item_id: &str,
        listener: ItemListener,
        prepend: bool,
    ) {
        let chain = self
            .chains
            .entry(kind)
            .or_default()
            .entry(item_id.to_string())
            .or_default();

        if let Some(slot) = chain.iter_mut().find(|(id, _)| id == listener_id) {
            slot.1 = listener;
            return;
        }

        let entry = (listener_id.to_string(), listener);
        if prepend {
            chain.insert(0, entry);
        } else {
            chain.push(entry);
        }
    }

    /// Remove a listener, reporting whether it was registered
    pub fn unregister(&mut self, kind: EventKind, listener_id: &str, item_id: &str) -> bool {
        let Some(chain) = self
            .chains
            .get_mut(&kind)
            .and_then(|items| items.get_mut(item_id))
        else {
            return false;
        };

        match chain.iter().position(|(id, _)| id == listener_id) {
            Some(index) => {
                chain.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of an item's listeners in dispatch order.
    ///
    /// The returned list is detached from the registry, so a dispatch in
    /// flight keeps the listeners it started with.
    pub fn listeners(&self, kind: EventKind, item_id: &str) -> Vec<ItemListener> {
        self.chains
            .get(&kind)
            .and_then(|items| items.get(item_id))
            .map(|chain| chain.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn listener_ids(&self, kind: EventKind, item_id: &str) -> Vec<String> {
        self.chains
            .get(&kind)
            .and_then(|items| items.get(item_id))
            .map(|chain| chain.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_listeners(&self, kind: EventKind, item_id: &str) -> bool {
        self.chains
            .get(&kind)
            .and_then(|items| items.get(item_id))
            .is_some_and(|chain| !chain.is_empty())
    }

    /// Drop every listener of the given items
    pub fn remove_items<S: AsRef<str>>(&mut self, item_ids: &[S]) {
        for items in self.chains.values_mut() {
            for id in item_ids {
                items.remove(id.as_ref());
            }
        }
    }

    pub fn clear(&mut self) {
        self.chains.clear();
    }
}

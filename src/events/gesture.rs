//! Ephemeral per-item pointer state

use std::collections::HashSet;

/// Which items the pointer is down on, hovering, or dragging
#[derive(Debug, Default, Clone)]
pub struct GestureState {
    down: HashSet<String>,
    hovering: HashSet<String>,
    dragging: HashSet<String>,
}

impl GestureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_down(&self, id: &str) -> bool {
        self.down.contains(id)
    }

    pub fn is_hovering(&self, id: &str) -> bool {
        self.hovering.contains(id)
    }

    pub fn is_dragging(&self, id: &str) -> bool {
        self.dragging.contains(id)
    }

    pub fn set_down(&mut self, id: &str) {
        self.down.insert(id.to_string());
    }

    /// Returns `true` when the item was not hovering before
    pub fn enter(&mut self, id: &str) -> bool {
        self.hovering.insert(id.to_string())
    }

    /// Returns `true` when the item was hovering before
    pub fn leave(&mut self, id: &str) -> bool {
        self.hovering.remove(id)
    }

    pub fn start_drag(&mut self, id: &str) {
        self.dragging.insert(id.to_string());
    }

    /// Clear down and drag for one item, returning whether it was dragging
    pub fn release(&mut self, id: &str) -> bool {
        self.down.remove(id);
        self.dragging.remove(id)
    }

    /// Clear every down and drag flag
    pub fn release_all(&mut self) {
        self.down.clear();
        self.dragging.clear();
    }

    /// Hovering items sorted by id
    pub fn hovering(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.hovering.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn forget(&mut self, id: &str) {
        self.down.remove(id);
        self.hovering.remove(id);
        self.dragging.remove(id);
    }

    pub fn clear(&mut self) {
        self.down.clear();
        self.hovering.clear();
        self.dragging.clear();
    }

    pub fn any_dragging(&self) -> bool {
        !self.dragging.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_transitions_report_edges() {
        let mut state = GestureState::new();
        assert!(state.enter("a"));
        assert!(!state.enter("a"));
        assert!(state.leave("a"));
        assert!(!state.leave("a"));
    }

    #[test]
    fn test_release_reports_drag() {
        let mut state = GestureState::new();
        state.set_down("a");
        state.start_drag("a");
        assert!(state.any_dragging());
        assert!(state.release("a"));
        assert!(!state.is_down("a"));
        assert!(!state.release("a"));
    }

    #[test]
    fn test_forget_clears_everything() {
        let mut state = GestureState::new();
        state.set_down("a");
        state.enter("a");
        state.start_drag("a");
        state.forget("a");
        assert!(!state.is_down("a") && !state.is_hovering("a") && !state.is_dragging("a"));
    }
}

//! Per-sheet zoom and pan memory.
//!
//! Entries are keyed by `(form_id, sheet_index, sheet_name)` and survive
//! reloads of the same form, so a sheet comes back exactly as it was left.

use std::collections::BTreeMap;

use tracing::debug;

use crate::layout::SheetViewState;
use crate::types::SheetKey;

#[derive(Debug, Default, Clone)]
pub struct ViewStateStore {
    states: BTreeMap<SheetKey, SheetViewState>,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, key: SheetKey, state: SheetViewState) {
        debug!(
            key = %key,
            scale = state.scale,
            offset_x = state.offset_x,
            offset_y = state.offset_y,
            "saved sheet view state"
        );
        self.states.insert(key, state);
    }

    pub fn get(&self, key: &SheetKey) -> Option<SheetViewState> {
        self.states.get(key).copied()
    }

    /// Stored state, or scale 1 with zero offsets.
    pub fn get_or_default(&self, key: &SheetKey) -> SheetViewState {
        self.get(key).unwrap_or_default()
    }

    /// Drop every entry belonging to `form_id`.
    pub fn clear_for_form(&mut self, form_id: i32) {
        let before = self.states.len();
        self.states.retain(|key, _| key.form_id != form_id);
        debug!(form_id, removed = before - self.states.len(), "cleared form view states");
    }

    pub fn clear_all(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Log every stored entry at debug level.
    pub fn dump(&self) {
        debug!(entries = self.states.len(), "view state store");
        for (key, state) in &self.states {
            debug!(key = %key, ?state, "view state entry");
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn state(scale: f32, x: f32, y: f32) -> SheetViewState {
        SheetViewState {
            scale,
            offset_x: x,
            offset_y: y,
        }
    }

    #[test]
    fn missing_entry_defaults() {
        let store = ViewStateStore::new();
        let key = SheetKey::new(1, 0, "A");
        assert_eq!(store.get(&key), None);
        assert_eq!(store.get_or_default(&key), SheetViewState::default());
    }

    #[test]
    fn key_includes_sheet_name() {
        let mut store = ViewStateStore::new();
        store.save(SheetKey::new(1, 0, "A"), state(1.5, -10.0, -20.0));
        assert!(store.get(&SheetKey::new(1, 0, "B")).is_none());
        assert_eq!(store.get(&SheetKey::new(1, 0, "A")).map(|s| s.scale), Some(1.5));
    }

    #[test]
    fn clear_for_form_keeps_other_forms() {
        let mut store = ViewStateStore::new();
        store.save(SheetKey::new(1, 0, "A"), state(2.0, 0.0, 0.0));
        store.save(SheetKey::new(1, 1, "B"), state(2.0, 0.0, 0.0));
        store.save(SheetKey::new(2, 0, "A"), state(2.0, 0.0, 0.0));
        store.clear_for_form(1);
        assert_eq!(store.len(), 1);
        store.dump();
        store.clear_all();
        assert!(store.is_empty());
    }
}

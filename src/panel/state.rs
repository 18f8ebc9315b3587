use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::WindowId;

/// Best-effort record of which windows have the side panel open. Absent and
/// `false` both read as closed.
#[derive(Default)]
pub struct PanelStateStore {
    windows: Mutex<HashMap<WindowId, bool>>,
}

impl PanelStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<WindowId, bool>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, window_id: WindowId) -> bool {
        self.windows().get(&window_id).copied().unwrap_or(false)
    }

    pub fn set(&self, window_id: WindowId, is_open: bool) {
        self.windows().insert(window_id, is_open);
    }

    pub fn delete(&self, window_id: WindowId) {
        self.windows().remove(&window_id);
    }

    /// Forget every window. Used when a close cannot be attributed.
    pub fn clear(&self) {
        self.windows().clear();
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        let mut open: Vec<WindowId> = self
            .windows()
            .iter()
            .filter_map(|(window_id, is_open)| is_open.then_some(*window_id))
            .collect();
        open.sort_unstable();
        open
    }
}

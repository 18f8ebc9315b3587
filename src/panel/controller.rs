use std::sync::Arc;

use anyhow::{Context, Result};

use crate::host::{broadcast_to_tabs, deliver, HostRuntime, Notice, Target};
use crate::log_info;
use crate::models::WindowId;

use super::PanelStateStore;

const ENABLE_LOGS: bool = true;

/// Drives the per-window `{closed, open}` machine on top of a host that can
/// only open the panel.
#[derive(Clone)]
pub struct PanelController {
    state: Arc<PanelStateStore>,
    host: Arc<dyn HostRuntime>,
}

impl PanelController {
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self {
            state: Arc::new(PanelStateStore::new()),
            host,
        }
    }

    pub fn is_open(&self, window_id: WindowId) -> bool {
        self.state.get(window_id)
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        self.state.open_windows()
    }

    /// The host call happens before anything else and without awaiting, so a
    /// request made from a user gesture reaches the host inside that gesture.
    pub fn open(&self, window_id: WindowId) -> Result<()> {
        self.host
            .open_side_panel(window_id)
            .with_context(|| format!("failed to open side panel for window {window_id}"))?;
        self.state.set(window_id, true);
        log_info!("Side panel opened for window {}", window_id);
        Ok(())
    }

    /// Icon click. Returns the new open state for the window. Closing goes
    /// through the same path as a `close-panel` request.
    pub async fn toggle(&self, window_id: WindowId) -> Result<bool> {
        if !self.state.get(window_id) {
            self.open(window_id)?;
            return Ok(true);
        }

        self.close(Some(window_id)).await;
        Ok(false)
    }

    /// Intended close. Without a window the close cannot be attributed and
    /// every window is treated as closed.
    pub async fn close(&self, window_id: Option<WindowId>) {
        match window_id {
            Some(window_id) => {
                self.state.set(window_id, false);
                log_info!("Side panel closed for window {}", window_id);
            }
            None => {
                self.state.clear();
                log_info!("Side panel close without window; all windows marked closed");
            }
        }

        deliver(self.host.as_ref(), Target::Panel, &Notice::ClosePanel).await;
        broadcast_to_tabs(self.host.as_ref(), &Notice::PanelClosed).await;
    }

    /// The panel reported that it went away. The host does not say which
    /// window, so the next icon click anywhere opens instead of toggling shut.
    pub async fn closed_unattributed(&self) {
        self.state.clear();
        log_info!("Side panel closed; panel state cleared for all windows");

        let delivered = broadcast_to_tabs(self.host.as_ref(), &Notice::PanelClosed).await;
        deliver(self.host.as_ref(), Target::Panel, &Notice::PanelClosed).await;
        log_info!("Panel close broadcast reached {} content contexts", delivered);
    }

    pub fn forget_window(&self, window_id: WindowId) {
        self.state.delete(window_id);
    }
}

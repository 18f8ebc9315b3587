use std::sync::Arc;

use chrono::Duration;

use crate::host::{deliver, HostRuntime, Target};
use crate::license::{LicenseAndVariantCache, RemoteApi};
use crate::models::{TabId, WindowId};
use crate::panel::PanelController;
use crate::preferences::PreferencesStore;
use crate::router::{self, Envelope, Response};
use crate::storage::KeyValueStore;
use crate::tabs::TabTranscriptCache;
use crate::variants::VariantStore;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

/// Status the host reports once a page has finished loading.
const TAB_COMPLETE: &str = "complete";

/// The background process: sole owner of the in-memory stores and the entry
/// point for host lifecycle events and incoming messages.
///
/// In-memory state does not survive a restart; an empty cache and all panels
/// closed is a valid starting point.
pub struct Background {
    pub(crate) tabs: TabTranscriptCache,
    pub(crate) panel: PanelController,
    pub(crate) license: LicenseAndVariantCache,
    pub(crate) variants: VariantStore,
    pub(crate) preferences: PreferencesStore,
    host: Arc<dyn HostRuntime>,
}

impl Background {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteApi>,
        host: Arc<dyn HostRuntime>,
        variants_ttl: Duration,
    ) -> Self {
        Self {
            tabs: TabTranscriptCache::new(),
            panel: PanelController::new(host.clone()),
            license: LicenseAndVariantCache::new(store.clone(), remote, variants_ttl),
            variants: VariantStore::new(store.clone()),
            preferences: PreferencesStore::new(store),
            host,
        }
    }

    /// Toolbar icon clicked. Returns whether the panel is now open.
    pub async fn on_icon_activated(&self, window_id: WindowId) -> bool {
        match self.panel.toggle(window_id).await {
            Ok(is_open) => is_open,
            Err(err) => {
                log_error!("Icon toggle failed: {:#}", err);
                self.panel.is_open(window_id)
            }
        }
    }

    /// Returns whether a cached transcript was restored into the tab.
    pub async fn on_tab_updated(
        &self,
        tab_id: TabId,
        status: Option<&str>,
        url: Option<&str>,
    ) -> bool {
        let (Some(TAB_COMPLETE), Some(url)) = (status, url) else {
            return false;
        };

        let Some(restoration) = self.tabs.auto_load_for_tab(tab_id, url) else {
            return false;
        };

        for notice in restoration.notices() {
            deliver(self.host.as_ref(), Target::Tab(tab_id), &notice).await;
        }
        true
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        if self.tabs.clear_tab(tab_id) {
            log_info!("Dropped cached transcript for closed tab {}", tab_id);
        }
    }

    pub fn on_window_removed(&self, window_id: WindowId) {
        self.panel.forget_window(window_id);
    }

    pub async fn on_message(&self, envelope: Envelope) -> Option<Response> {
        router::dispatch(self, envelope).await
    }
}

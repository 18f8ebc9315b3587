//! Seam to the browser's extension platform: the side-panel primitive and
//! message delivery to other contexts.

pub mod stdio;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{TabId, TranscriptPayload, WindowId};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Messages the background sends to other contexts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "action",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Notice {
    RestoreTranscript {
        tab_id: TabId,
        url: String,
        transcript: TranscriptPayload,
    },
    Badge {
        tab_id: TabId,
        text: String,
    },
    ClosePanel,
    PanelClosed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Tab(TabId),
    Panel,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The receiving context has no listener (tab without content script,
    /// panel not open).
    #[error("no listener in receiving context")]
    NoListener,
    #[error("delivery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Synchronous on purpose: the host only honours open requests issued in
    /// the same task as the user gesture, so callers must not await first.
    fn open_side_panel(&self, window_id: WindowId) -> Result<()>;

    async fn send_to_tab(&self, tab_id: TabId, notice: &Notice) -> Result<(), DeliveryError>;

    async fn send_to_panel(&self, notice: &Notice) -> Result<(), DeliveryError>;

    /// Tabs currently running a content script.
    async fn content_tabs(&self) -> Vec<TabId>;
}

/// At-most-once delivery; failures are logged, never retried or returned.
pub async fn deliver(host: &dyn HostRuntime, target: Target, notice: &Notice) -> bool {
    let result = match target {
        Target::Tab(tab_id) => host.send_to_tab(tab_id, notice).await,
        Target::Panel => host.send_to_panel(notice).await,
    };

    match result {
        Ok(()) => true,
        Err(DeliveryError::NoListener) => {
            log_debug!("No listener for {:?} in {:?}", notice, target);
            false
        }
        Err(err) => {
            log_warn!("Dropping {:?} for {:?}: {}", notice, target, err);
            false
        }
    }
}

/// Sends `notice` to every content context; returns how many accepted it.
pub async fn broadcast_to_tabs(host: &dyn HostRuntime, notice: &Notice) -> usize {
    let mut delivered = 0;
    for tab_id in host.content_tabs().await {
        if deliver(host, Target::Tab(tab_id), notice).await {
            delivered += 1;
        }
    }
    delivered
}

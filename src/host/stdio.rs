//! Host bridge over stdio: one JSON event per stdin line, one JSON command per
//! stdout line.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{TabId, WindowId};
use crate::router::{Response, Sender};

use super::{DeliveryError, HostRuntime, Notice, Target};

/// Lifecycle events and messages forwarded by the browser side.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostEvent {
    IconActivated {
        window_id: WindowId,
        tab_id: Option<TabId>,
    },
    TabRemoved {
        tab_id: TabId,
    },
    TabUpdated {
        tab_id: TabId,
        status: Option<String>,
        url: Option<String>,
    },
    WindowRemoved {
        window_id: WindowId,
    },
    Message {
        id: Option<u64>,
        action: String,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        sender: Sender,
    },
    /// Full list of tabs currently running a content script.
    TabsSnapshot {
        tab_ids: Vec<TabId>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostCommand {
    OpenSidePanel { window_id: WindowId },
    Deliver { target: Target, notice: Notice },
    Respond { id: Option<u64>, response: Response },
}

pub struct StdioHost {
    out: Mutex<Box<dyn Write + Send>>,
    live_tabs: Mutex<BTreeSet<TabId>>,
}

impl StdioHost {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            live_tabs: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn live_tabs(&self) -> MutexGuard<'_, BTreeSet<TabId>> {
        self.live_tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_command(&self, command: &HostCommand) -> Result<()> {
        let line = serde_json::to_string(command).context("failed to encode host command")?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}").context("failed to write host command")?;
        out.flush().context("failed to flush host command")
    }

    /// Keeps the set of tabs with a content-script listener in step with the
    /// events the host reports.
    pub fn track(&self, event: &HostEvent) {
        let mut tabs = self.live_tabs();
        match event {
            HostEvent::TabsSnapshot { tab_ids } => {
                *tabs = tab_ids.iter().copied().collect();
            }
            HostEvent::TabUpdated { tab_id, .. } => {
                tabs.insert(*tab_id);
            }
            HostEvent::TabRemoved { tab_id } => {
                tabs.remove(tab_id);
            }
            HostEvent::Message {
                sender: Sender {
                    tab_id: Some(tab_id),
                    ..
                },
                ..
            } => {
                tabs.insert(*tab_id);
            }
            _ => {}
        }
    }

    fn deliver_line(&self, target: Target, notice: &Notice) -> Result<(), DeliveryError> {
        self.write_command(&HostCommand::Deliver {
            target,
            notice: notice.clone(),
        })
        .map_err(|err| DeliveryError::Failed(format!("{err:#}")))
    }
}

#[async_trait]
impl HostRuntime for StdioHost {
    fn open_side_panel(&self, window_id: WindowId) -> Result<()> {
        self.write_command(&HostCommand::OpenSidePanel { window_id })
    }

    async fn send_to_tab(&self, tab_id: TabId, notice: &Notice) -> Result<(), DeliveryError> {
        if !self.live_tabs().contains(&tab_id) {
            return Err(DeliveryError::NoListener);
        }
        self.deliver_line(Target::Tab(tab_id), notice)
    }

    async fn send_to_panel(&self, notice: &Notice) -> Result<(), DeliveryError> {
        self.deliver_line(Target::Panel, notice)
    }

    async fn content_tabs(&self) -> Vec<TabId> {
        self.live_tabs().iter().copied().collect()
    }
}

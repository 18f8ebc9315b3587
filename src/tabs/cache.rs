use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::host::Notice;
use crate::log_info;
use crate::models::{CachedTranscript, TabId, TranscriptPayload};

const ENABLE_LOGS: bool = true;

const RESTORED_BADGE: &str = "✓";

/// What the caller must deliver to the tab after an auto-load hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Restoration {
    pub transcript: CachedTranscript,
}

impl Restoration {
    /// The restore message followed by the badge cue.
    pub fn notices(&self) -> [Notice; 2] {
        [
            Notice::RestoreTranscript {
                tab_id: self.transcript.tab_id,
                url: self.transcript.url.clone(),
                transcript: self.transcript.payload.clone(),
            },
            Notice::Badge {
                tab_id: self.transcript.tab_id,
                text: RESTORED_BADGE.into(),
            },
        ]
    }
}

/// At most one transcript per tab, held only in memory.
///
/// Every operation is a single lock-protected step, so a tab removal racing an
/// auto-load resolves last-write-wins per tab.
#[derive(Default)]
pub struct TabTranscriptCache {
    entries: Mutex<HashMap<TabId, CachedTranscript>>,
}

impl TabTranscriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TabId, CachedTranscript>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces any previous entry for the tab wholesale.
    pub fn store(&self, tab_id: TabId, url: impl Into<String>, payload: TranscriptPayload) {
        let entry = CachedTranscript {
            tab_id,
            url: url.into(),
            payload,
            captured_at: Utc::now(),
        };
        self.entries().insert(tab_id, entry);
    }

    pub fn get(&self, tab_id: TabId) -> Option<CachedTranscript> {
        self.entries().get(&tab_id).cloned()
    }

    /// Returns a restoration when the tab's cached URL equals `url` exactly.
    /// Leaves the cache untouched either way, so repeated calls restore again.
    pub fn auto_load_for_tab(&self, tab_id: TabId, url: &str) -> Option<Restoration> {
        let entry = self.entries().get(&tab_id).cloned()?;
        if entry.url != url {
            return None;
        }

        log_info!("Restoring cached transcript for tab {} ({})", tab_id, url);
        Some(Restoration { transcript: entry })
    }

    /// Returns whether an entry was removed.
    pub fn clear_tab(&self, tab_id: TabId) -> bool {
        self.entries().remove(&tab_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

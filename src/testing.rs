//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::host::{DeliveryError, HostRuntime, Notice, Target};
use crate::license::RemoteApi;
use crate::models::{PromptVariant, RemoteValidation, TabId, WindowId};
use crate::storage::KeyValueStore;

/// Host that records what the core asked it to do.
#[derive(Default)]
pub struct RecordingHost {
    tabs: Mutex<Vec<TabId>>,
    no_listener: Mutex<HashSet<TabId>>,
    panel_deaf: AtomicBool,
    fail_open: AtomicBool,
    opened: Mutex<Vec<WindowId>>,
    delivered: Mutex<Vec<(Target, Notice)>>,
}

impl RecordingHost {
    pub fn with_tabs(tabs: &[TabId]) -> Self {
        let host = Self::default();
        *host.tabs.lock().unwrap() = tabs.to_vec();
        host
    }

    pub fn drop_listener(&self, tab_id: TabId) {
        self.no_listener.lock().unwrap().insert(tab_id);
    }

    pub fn set_panel_listening(&self, listening: bool) {
        self.panel_deaf.store(!listening, Ordering::SeqCst);
    }

    pub fn reject_opens(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<WindowId> {
        self.opened.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<(Target, Notice)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_to(&self, target: Target) -> Vec<Notice> {
        self.delivered()
            .into_iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, notice)| notice)
            .collect()
    }
}

#[async_trait]
impl HostRuntime for RecordingHost {
    fn open_side_panel(&self, window_id: WindowId) -> Result<()> {
        if self.fail_open.load(Ordering::SeqCst) {
            bail!("sidePanel.open() may only be called in response to a user gesture");
        }
        self.opened.lock().unwrap().push(window_id);
        Ok(())
    }

    async fn send_to_tab(&self, tab_id: TabId, notice: &Notice) -> Result<(), DeliveryError> {
        if self.no_listener.lock().unwrap().contains(&tab_id) {
            return Err(DeliveryError::NoListener);
        }
        self.delivered
            .lock()
            .unwrap()
            .push((Target::Tab(tab_id), notice.clone()));
        Ok(())
    }

    async fn send_to_panel(&self, notice: &Notice) -> Result<(), DeliveryError> {
        if self.panel_deaf.load(Ordering::SeqCst) {
            return Err(DeliveryError::NoListener);
        }
        self.delivered
            .lock()
            .unwrap()
            .push((Target::Panel, notice.clone()));
        Ok(())
    }

    async fn content_tabs(&self) -> Vec<TabId> {
        self.tabs.lock().unwrap().clone()
    }
}

/// Scripted stand-in for the license/variant API.
#[derive(Default)]
pub struct FakeRemote {
    validations: Mutex<HashMap<String, RemoteValidation>>,
    variants: Mutex<Vec<PromptVariant>>,
    templates: Mutex<HashMap<String, String>>,
    offline: AtomicBool,
    pub validate_calls: AtomicUsize,
    pub variant_calls: AtomicUsize,
    pub template_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_key(&self, key: &str, lifetime: bool) {
        self.validations.lock().unwrap().insert(
            key.to_string(),
            RemoteValidation {
                valid: true,
                lifetime,
                ..RemoteValidation::default()
            },
        );
    }

    pub fn serve_variants(&self, variants: Vec<PromptVariant>) {
        *self.variants.lock().unwrap() = variants;
    }

    pub fn serve_template(&self, variant: &str, prompt: &str) {
        self.templates
            .lock()
            .unwrap()
            .insert(variant.to_string(), prompt.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("network unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn validate_license(&self, license_key: &str, _email: &str) -> Result<RemoteValidation> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self
            .validations
            .lock()
            .unwrap()
            .get(license_key)
            .cloned()
            .unwrap_or_else(|| RemoteValidation::invalid("Unknown license key")))
    }

    async fn fetch_prompt_variants(&self) -> Result<Vec<PromptVariant>> {
        self.variant_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.variants.lock().unwrap().clone())
    }

    async fn fetch_prompt_template(&self, variant: &str) -> Result<String> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.templates
            .lock()
            .unwrap()
            .get(variant)
            .cloned()
            .ok_or_else(|| anyhow!("unknown variant {variant}"))
    }
}

pub fn variant(id: &str, prompt: Option<&str>) -> PromptVariant {
    PromptVariant {
        variant: id.to_string(),
        description: format!("{id} variant"),
        prompt: prompt.map(str::to_string),
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        bail!("storage unavailable")
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<()> {
        bail!("storage unavailable")
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        bail!("storage unavailable")
    }

    async fn remove_all(&self, _keys: &[&str]) -> Result<()> {
        bail!("storage unavailable")
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        bail!("storage unavailable")
    }
}

/// Cloneable sink standing in for stdout.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    /// Every line written so far, parsed as JSON.
    pub fn lines(&self) -> Vec<Value> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// A background wired to fakes, with the handles tests need to inspect it.
pub fn background(
    tabs: &[TabId],
) -> (
    crate::background::Background,
    Arc<RecordingHost>,
    Arc<FakeRemote>,
    Arc<crate::storage::MemoryStore>,
) {
    let host = Arc::new(RecordingHost::with_tabs(tabs));
    let remote = Arc::new(FakeRemote::new());
    let store = Arc::new(crate::storage::MemoryStore::new());
    let background = crate::background::Background::new(
        store.clone(),
        remote.clone(),
        host.clone(),
        chrono::Duration::hours(1),
    );
    (background, host, remote, store)
}

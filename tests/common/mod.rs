use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use promptbridge_lib::host::{DeliveryError, HostRuntime, Notice};
use promptbridge_lib::license::RemoteApi;
use promptbridge_lib::models::{PromptVariant, RemoteValidation, TabId, WindowId};

#[derive(Default)]
pub struct QuietHost {
    pub opened: Mutex<Vec<WindowId>>,
}

#[async_trait]
impl HostRuntime for QuietHost {
    fn open_side_panel(&self, window_id: WindowId) -> Result<()> {
        self.opened.lock().unwrap().push(window_id);
        Ok(())
    }

    async fn send_to_tab(&self, _tab_id: TabId, _notice: &Notice) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn send_to_panel(&self, _notice: &Notice) -> Result<(), DeliveryError> {
        Err(DeliveryError::NoListener)
    }

    async fn content_tabs(&self) -> Vec<TabId> {
        Vec::new()
    }
}

/// Accepts every key as a lifetime license and serves one variant.
pub struct AcceptingRemote;

#[async_trait]
impl RemoteApi for AcceptingRemote {
    async fn validate_license(&self, _license_key: &str, _email: &str) -> Result<RemoteValidation> {
        Ok(RemoteValidation {
            valid: true,
            lifetime: true,
            ..RemoteValidation::default()
        })
    }

    async fn fetch_prompt_variants(&self) -> Result<Vec<PromptVariant>> {
        Ok(vec![PromptVariant {
            variant: "summary".into(),
            description: "Summary".into(),
            prompt: None,
        }])
    }

    async fn fetch_prompt_template(&self, _variant: &str) -> Result<String> {
        Ok("Summarize: {transcript}".into())
    }
}

/// Remote that is never reachable.
pub struct OfflineRemote;

#[async_trait]
impl RemoteApi for OfflineRemote {
    async fn validate_license(&self, _license_key: &str, _email: &str) -> Result<RemoteValidation> {
        anyhow::bail!("offline")
    }

    async fn fetch_prompt_variants(&self) -> Result<Vec<PromptVariant>> {
        anyhow::bail!("offline")
    }

    async fn fetch_prompt_template(&self, _variant: &str) -> Result<String> {
        anyhow::bail!("offline")
    }
}

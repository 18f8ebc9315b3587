use std::sync::Arc;

use anyhow::{Context, Result};

use crate::log_warn;
use crate::models::variant::validation;
use crate::models::UserPreferences;
use crate::storage::{get_json, keys, set_json, KeyValueStore};

const ENABLE_LOGS: bool = true;

#[derive(Clone)]
pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Missing, partial or unreadable records fall back to defaults.
    pub async fn get(&self) -> UserPreferences {
        match get_json(self.store.as_ref(), keys::USER_PREFERENCES).await {
            Ok(Some(preferences)) => preferences,
            Ok(None) => UserPreferences::default(),
            Err(err) => {
                log_warn!("Using default preferences: {:#}", err);
                UserPreferences::default()
            }
        }
    }

    pub async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        validation::validate_identifier(&preferences.default_variant)
            .context("invalid default variant")?;
        set_json(self.store.as_ref(), keys::USER_PREFERENCES, preferences)
            .await
            .context("failed to save preferences")
    }
}

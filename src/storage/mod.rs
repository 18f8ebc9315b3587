//! Durable key/value storage shared by every persisted piece of state.
//!
//! Values are JSON. `get` distinguishes a missing key (`None`) from a stored
//! falsy value (`Some(Value::Bool(false))`, `Some(Value::Null)`); callers apply
//! their own defaults.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Storage keys used by the core.
pub mod keys {
    pub const CUSTOM_VARIANTS: &str = "customVariants";
    pub const USER_PREFERENCES: &str = "userPreferences";
    pub const LICENSE_KEY: &str = "licenseKey";
    pub const LICENSE_VALIDATION: &str = "licenseValidation";
    pub const PROMPT_VARIANTS_CACHE: &str = "promptVariantsCache";

    const PROMPT_TEMPLATE_PREFIX: &str = "promptTemplate:";

    pub fn prompt_template(variant: &str) -> String {
        format!("{PROMPT_TEMPLATE_PREFIX}{variant}")
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Removes every key as one unit: either all are gone afterwards or none
    /// were touched.
    async fn remove_all(&self, keys: &[&str]) -> Result<()>;

    async fn list_keys(&self) -> Result<Vec<String>>;
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("stored value for '{key}' has an unexpected shape")),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value)
        .with_context(|| format!("failed to serialize value for '{key}'"))?;
    store.set(key, value).await
}

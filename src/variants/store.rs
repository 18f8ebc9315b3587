use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use crate::models::variant::validation;
use crate::models::{CustomVariant, CustomVariantInput};
use crate::storage::{get_json, keys, set_json, KeyValueStore};
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

/// User-defined variants, persisted as one ordered list. Every mutation reads
/// the whole list and writes it back; concurrent edits are last-write-wins.
#[derive(Clone)]
pub struct VariantStore {
    store: Arc<dyn KeyValueStore>,
}

impl VariantStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load(&self) -> Result<Vec<CustomVariant>> {
        Ok(get_json(self.store.as_ref(), keys::CUSTOM_VARIANTS)
            .await
            .context("failed to read custom variants")?
            .unwrap_or_default())
    }

    async fn persist(&self, variants: &[CustomVariant]) -> Result<()> {
        set_json(self.store.as_ref(), keys::CUSTOM_VARIANTS, variants)
            .await
            .context("failed to save custom variants")
    }

    /// Storage failures read as an empty list.
    pub async fn list(&self) -> Vec<CustomVariant> {
        match self.load().await {
            Ok(variants) => variants,
            Err(err) => {
                log_error!("{:#}", err);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, variant: &str) -> Option<CustomVariant> {
        self.list()
            .await
            .into_iter()
            .find(|existing| existing.variant == variant)
    }

    pub async fn add(&self, input: CustomVariantInput) -> Result<CustomVariant> {
        validation::validate_identifier(&input.variant)?;
        validation::validate_prompt(&input.prompt)?;

        let mut variants = self.load().await?;
        if variants.iter().any(|existing| existing.variant == input.variant) {
            bail!("A variant named '{}' already exists", input.variant);
        }

        let created = input.into_variant(Utc::now());
        variants.push(created.clone());
        self.persist(&variants).await?;

        log_info!("Added custom variant {}", created.variant);
        Ok(created)
    }

    /// Edits `original`, possibly renaming it. The old record is removed and
    /// the new one takes its place in the list, so a rename never leaves the
    /// old identifier behind.
    pub async fn update(&self, original: &str, input: CustomVariantInput) -> Result<CustomVariant> {
        validation::validate_identifier(&input.variant)?;
        validation::validate_prompt(&input.prompt)?;

        let mut variants = self.load().await?;
        let index = variants
            .iter()
            .position(|existing| existing.variant == original)
            .ok_or_else(|| anyhow!("No custom variant named '{original}'"))?;

        if input.variant != original
            && variants.iter().any(|existing| existing.variant == input.variant)
        {
            bail!("A variant named '{}' already exists", input.variant);
        }

        let previous = variants.remove(index);
        let updated = input.into_variant(previous.created_at);
        variants.insert(index, updated.clone());
        self.persist(&variants).await?;

        if updated.variant != original {
            log_info!("Renamed custom variant {} to {}", original, updated.variant);
        }
        Ok(updated)
    }

    /// Returns whether a variant was removed.
    pub async fn delete(&self, variant: &str) -> Result<bool> {
        let mut variants = self.load().await?;
        let before = variants.len();
        variants.retain(|existing| existing.variant != variant);

        if variants.len() == before {
            return Ok(false);
        }

        self.persist(&variants).await?;
        log_info!("Deleted custom variant {}", variant);
        Ok(true)
    }
}

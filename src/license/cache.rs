use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::variant::validation;
use crate::models::{LicenseStatus, LicenseValidation, PromptVariant};
use crate::storage::{get_json, keys, set_json, KeyValueStore};
use crate::variants::VariantStore;
use crate::{log_error, log_info, log_warn};

use super::RemoteApi;

const ENABLE_LOGS: bool = true;

/// A cached remote value together with when it was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stamped<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

impl<T> Stamped<T> {
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.fetched_at
            .checked_add_signed(ttl)
            .map_or(true, |expires_at| expires_at > now)
    }
}

/// License status and remote prompt data, kept in durable storage so most
/// queries need no network round trip.
#[derive(Clone)]
pub struct LicenseAndVariantCache {
    store: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteApi>,
    custom: VariantStore,
    ttl: Duration,
}

impl LicenseAndVariantCache {
    pub fn new(store: Arc<dyn KeyValueStore>, remote: Arc<dyn RemoteApi>, ttl: Duration) -> Self {
        Self {
            custom: VariantStore::new(store.clone()),
            store,
            remote,
            ttl,
        }
    }

    /// Always asks the server; the previous record is never reused. Both
    /// valid and invalid outcomes are stored, keyed by the submitted key.
    pub async fn validate_and_store(
        &self,
        license_key: &str,
        email: &str,
    ) -> Result<LicenseValidation> {
        let license_key = license_key.trim();
        if license_key.is_empty() {
            bail!("License key is required");
        }

        let remote = self
            .remote
            .validate_license(license_key, email.trim())
            .await
            .context("License validation request failed")?;
        let validation =
            LicenseValidation::from_remote(license_key.to_string(), remote, Utc::now());

        set_json(self.store.as_ref(), keys::LICENSE_KEY, license_key)
            .await
            .context("failed to store license key")?;
        set_json(self.store.as_ref(), keys::LICENSE_VALIDATION, &validation)
            .await
            .context("failed to store license validation")?;

        log_info!(
            "License validated (valid: {}, lifetime: {})",
            validation.valid,
            validation.lifetime
        );
        Ok(validation)
    }

    pub async fn get_stored_key(&self) -> Option<String> {
        match get_json::<String>(self.store.as_ref(), keys::LICENSE_KEY).await {
            Ok(key) => key.filter(|key| !key.is_empty()),
            Err(err) => {
                log_error!("Failed to read stored license key: {:#}", err);
                None
            }
        }
    }

    /// A validation record only counts when it belongs to the stored key.
    pub async fn get_stored_validation(&self) -> LicenseStatus {
        let Some(license_key) = self.get_stored_key().await else {
            return LicenseStatus::NoLicense;
        };

        match get_json::<LicenseValidation>(self.store.as_ref(), keys::LICENSE_VALIDATION).await {
            Ok(Some(validation)) if validation.license_key == license_key => {
                LicenseStatus::Checked(validation)
            }
            Ok(_) => LicenseStatus::Unvalidated { license_key },
            Err(err) => {
                log_error!("Failed to read stored license validation: {:#}", err);
                LicenseStatus::Unvalidated { license_key }
            }
        }
    }

    /// Removes key and validation together.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove_all(&[keys::LICENSE_KEY, keys::LICENSE_VALIDATION])
            .await
            .context("failed to clear stored license")?;
        log_info!("Stored license cleared");
        Ok(())
    }

    pub async fn get_prompt_variants(&self) -> Result<Vec<PromptVariant>> {
        self.read_through(keys::PROMPT_VARIANTS_CACHE, || {
            self.remote.fetch_prompt_variants()
        })
        .await
    }

    /// Resolves the template for `variant`: a custom variant wins, then a
    /// prompt carried inline by the cached variant list, then the
    /// per-variant endpoint.
    pub async fn get_prompt_template(&self, variant: &str) -> Result<String> {
        validation::validate_identifier(variant)?;

        if let Some(custom) = self.custom.get(variant).await {
            return Ok(custom.prompt);
        }
        if let Some(prompt) = self.listed_prompt(variant).await {
            return Ok(prompt);
        }

        let key = keys::prompt_template(variant);
        self.read_through(&key, || self.remote.fetch_prompt_template(variant))
            .await
    }

    /// Only consulted once a variant list has been cached. A stale list is
    /// refreshed first, falling back to the stale copy when offline.
    async fn listed_prompt(&self, variant: &str) -> Option<String> {
        let cached = self
            .read_cached::<Vec<PromptVariant>>(keys::PROMPT_VARIANTS_CACHE)
            .await?;
        let variants = if cached.is_fresh(self.ttl, Utc::now()) {
            cached.value
        } else {
            self.get_prompt_variants().await.ok()?
        };

        variants
            .into_iter()
            .find(|listed| listed.variant == variant)?
            .prompt
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<Stamped<T>> {
        match get_json::<Stamped<T>>(self.store.as_ref(), key).await {
            Ok(cached) => cached,
            Err(err) => {
                log_warn!("Ignoring unreadable cache entry '{}': {:#}", key, err);
                None
            }
        }
    }

    /// Serves a fresh cached value, otherwise fetches and caches. A failed
    /// fetch falls back to the stale value when there is one.
    async fn read_through<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cached = match self.read_cached::<T>(key).await {
            Some(entry) if entry.is_fresh(self.ttl, Utc::now()) => return Ok(entry.value),
            stale => stale,
        };

        match fetch().await {
            Ok(value) => {
                let entry = Stamped {
                    value,
                    fetched_at: Utc::now(),
                };
                if let Err(err) = set_json(self.store.as_ref(), key, &entry).await {
                    log_error!("Failed to cache '{}': {:#}", key, err);
                }
                Ok(entry.value)
            }
            Err(err) => match cached {
                Some(entry) => {
                    log_warn!(
                        "Fetch for '{}' failed, serving cache from {}: {:#}",
                        key,
                        entry.fetched_at,
                        err
                    );
                    Ok(entry.value)
                }
                None => Err(err),
            },
        }
    }
}

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::models::{PromptVariant, RemoteValidation};

/// License and prompt-variant API. Implementations own their timeouts.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// A rejected key is `Ok` with `valid == false`; `Err` means the server
    /// could not be asked.
    async fn validate_license(&self, license_key: &str, email: &str) -> Result<RemoteValidation>;

    async fn fetch_prompt_variants(&self) -> Result<Vec<PromptVariant>>;

    async fn fetch_prompt_template(&self, variant: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TemplateResponse {
    prompt: String,
}

pub struct HttpRemoteApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn validate_license(&self, license_key: &str, email: &str) -> Result<RemoteValidation> {
        let body = serde_json::json!({
            "licenseKey": license_key,
            "email": email,
        });

        let response = self
            .client
            .post(self.url("license/validate"))
            .json(&body)
            .send()
            .await
            .context("Failed to send license validation request")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // The server reports rejected keys as 4xx with an `error` field.
            if let Ok(outcome) = serde_json::from_str::<RemoteValidation>(&text) {
                if outcome.error.is_some() {
                    return Ok(RemoteValidation {
                        valid: false,
                        ..outcome
                    });
                }
            }
            bail!("License server error ({}): {}", status, text);
        }

        serde_json::from_str(&text).context("Failed to parse license validation response")
    }

    async fn fetch_prompt_variants(&self) -> Result<Vec<PromptVariant>> {
        let response = self
            .client
            .get(self.url("variants"))
            .send()
            .await
            .context("Failed to send prompt variants request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Prompt variants API error ({}): {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse prompt variants response")
    }

    async fn fetch_prompt_template(&self, variant: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url(&format!("variants/{variant}/prompt")))
            .send()
            .await
            .with_context(|| format!("Failed to request prompt template for {variant}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Prompt template API error ({}): {}", status, error_text);
        }

        let template: TemplateResponse = response
            .json()
            .await
            .context("Failed to parse prompt template response")?;

        Ok(template.prompt)
    }
}

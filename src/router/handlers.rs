use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use crate::background::Background;
use crate::models::variant::apply_template;
use crate::models::{CustomVariantInput, TabId, TranscriptPayload, UserPreferences, WindowId};

use super::{Action, Response, Sender};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WindowPayload {
    window_id: Option<WindowId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TabPayload {
    tab_id: Option<TabId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreTranscriptPayload {
    #[serde(default)]
    tab_id: Option<TabId>,
    #[serde(default)]
    url: Option<String>,
    transcript: TranscriptPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateLicensePayload {
    license_key: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveVariantPayload {
    #[serde(default)]
    original_variant: Option<String>,
    variant: CustomVariantInput,
}

#[derive(Debug, Deserialize)]
struct DeleteVariantPayload {
    variant: String,
}

#[derive(Debug, Deserialize)]
struct SavePreferencesPayload {
    preferences: UserPreferences,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BuildPromptPayload {
    variant: Option<String>,
    tab_id: Option<TabId>,
}

fn parse<T: DeserializeOwned>(action: Action, payload: Value) -> Result<T> {
    let payload = if payload.is_null() {
        Value::Object(Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload)
        .with_context(|| format!("malformed payload for '{}'", action.name()))
}

pub(super) async fn handle(
    background: &Background,
    action: Action,
    payload: Value,
    sender: &Sender,
) -> Result<Response> {
    match action {
        // Synchronous: must reach the host before anything is awaited.
        Action::OpenPanelFromContent => open_panel_from_content(background, payload, sender),
        Action::ClosePanel => {
            let WindowPayload { window_id } = parse(action, payload)?;
            background
                .panel
                .close(window_id.or(sender.window_id))
                .await;
            Ok(Response::ok())
        }
        Action::PanelClosed => {
            background.panel.closed_unattributed().await;
            Ok(Response::ok())
        }
        Action::StoreTranscript => store_transcript(background, parse(action, payload)?, sender),
        Action::GetTranscript => {
            let TabPayload { tab_id } = parse(action, payload)?;
            let tab_id = tab_id
                .or(sender.tab_id)
                .ok_or_else(|| anyhow!("tabId is required"))?;
            Response::ok().with("transcript", background.tabs.get(tab_id))
        }
        Action::GetPanelState => {
            let WindowPayload { window_id } = parse(action, payload)?;
            let window_id = window_id
                .or(sender.window_id)
                .ok_or_else(|| anyhow!("windowId is required"))?;
            Response::ok().with("isOpen", background.panel.is_open(window_id))
        }
        Action::ValidateLicense => {
            let request: ValidateLicensePayload = parse(action, payload)?;
            let validation = background
                .license
                .validate_and_store(&request.license_key, &request.email)
                .await?;
            Response::ok().with("validation", validation)
        }
        Action::GetLicenseStatus => {
            let status = background.license.get_stored_validation().await;
            let active = status.is_active(Utc::now());
            Response::ok().with("license", status)?.with("active", active)
        }
        Action::ClearLicense => {
            background.license.clear().await?;
            Ok(Response::ok())
        }
        Action::GetPromptVariants => {
            Response::ok().with("variants", background.license.get_prompt_variants().await?)
        }
        Action::GetCustomVariants => {
            Response::ok().with("variants", background.variants.list().await)
        }
        Action::SaveCustomVariant => {
            let request: SaveVariantPayload = parse(action, payload)?;
            let saved = match request.original_variant.as_deref() {
                Some(original) => background.variants.update(original, request.variant).await?,
                None => background.variants.add(request.variant).await?,
            };
            Response::ok().with("variant", saved)
        }
        Action::DeleteCustomVariant => {
            let request: DeleteVariantPayload = parse(action, payload)?;
            let deleted = background.variants.delete(&request.variant).await?;
            Response::ok().with("deleted", deleted)
        }
        Action::GetPreferences => {
            Response::ok().with("preferences", background.preferences.get().await)
        }
        Action::SavePreferences => {
            let request: SavePreferencesPayload = parse(action, payload)?;
            background.preferences.save(&request.preferences).await?;
            Response::ok().with("preferences", request.preferences)
        }
        Action::BuildPrompt => build_prompt(background, parse(action, payload)?, sender).await,
    }
}

fn open_panel_from_content(
    background: &Background,
    payload: Value,
    sender: &Sender,
) -> Result<Response> {
    let WindowPayload { window_id } = parse(Action::OpenPanelFromContent, payload)?;
    let window_id = sender
        .window_id
        .or(window_id)
        .ok_or_else(|| anyhow!("sender window is unknown"))?;

    background.panel.open(window_id)?;
    Response::ok().with("isOpen", true)
}

fn store_transcript(
    background: &Background,
    request: StoreTranscriptPayload,
    sender: &Sender,
) -> Result<Response> {
    let tab_id = request
        .tab_id
        .or(sender.tab_id)
        .ok_or_else(|| anyhow!("tabId is required"))?;
    let url = request
        .url
        .or_else(|| sender.url.clone())
        .ok_or_else(|| anyhow!("url is required"))?;

    background.tabs.store(tab_id, url, request.transcript);
    Response::ok().with("tabId", tab_id)
}

async fn build_prompt(
    background: &Background,
    request: BuildPromptPayload,
    sender: &Sender,
) -> Result<Response> {
    let preferences = background.preferences.get().await;
    let variant = request
        .variant
        .unwrap_or_else(|| preferences.default_variant.clone());
    let tab_id = request
        .tab_id
        .or(sender.tab_id)
        .ok_or_else(|| anyhow!("tabId is required"))?;
    let transcript = background
        .tabs
        .get(tab_id)
        .ok_or_else(|| anyhow!("No transcript captured for tab {tab_id}"))?;
    if transcript.payload.is_empty() {
        bail!("Transcript for tab {tab_id} is empty");
    }

    let template = background
        .license
        .get_prompt_template(&variant)
        .await
        .with_context(|| format!("No prompt template available for '{variant}'"))?;

    let prompt = apply_template(
        &template,
        &transcript.payload.render(preferences.include_timestamps),
    );

    Response::ok().with("prompt", prompt)?.with("variant", variant)
}

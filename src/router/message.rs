use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{TabId, WindowId};

/// Where a message came from, as reported by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Sender {
    pub tab_id: Option<TabId>,
    pub window_id: Option<WindowId>,
    pub url: Option<String>,
}

impl Sender {
    pub fn tab(tab_id: TabId, window_id: WindowId) -> Self {
        Self {
            tab_id: Some(tab_id),
            window_id: Some(window_id),
            url: None,
        }
    }

    /// The panel and other extension pages have no tab.
    pub fn extension_page(window_id: Option<WindowId>) -> Self {
        Self {
            window_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub sender: Sender,
}

impl Envelope {
    pub fn new(action: impl Into<String>, payload: Value, sender: Sender) -> Self {
        Self {
            action: action.into(),
            payload,
            sender,
        }
    }
}

/// `{success, error?, ...fields}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: Map::new(),
        }
    }

    pub fn failure(error: &anyhow::Error) -> Self {
        Self {
            success: false,
            error: Some(format!("{error:#}")),
            data: Map::new(),
        }
    }

    pub fn with<T: Serialize>(mut self, field: &str, value: T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize response field '{field}'"))?;
        self.data.insert(field.to_string(), value);
        Ok(self)
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

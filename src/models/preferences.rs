use serde::{Deserialize, Serialize};

pub const DEFAULT_VARIANT: &str = "summary";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub default_variant: String,
    pub include_timestamps: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_variant: DEFAULT_VARIANT.into(),
            include_timestamps: false,
        }
    }
}

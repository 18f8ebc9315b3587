use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.json";
const DEFAULT_DATA_DIR: &str = ".promptbridge";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_base_url: String,
    /// Freshness window for cached remote variants and templates.
    pub variants_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub database_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.promptbridge.app/v1".into(),
            variants_ttl_secs: 3600,
            request_timeout_secs: 15,
            database_file: "promptbridge.sqlite3".into(),
        }
    }
}

impl Config {
    /// Reads `config.json` from `data_dir`, then applies environment
    /// overrides. A missing file means defaults; so does a file that does not
    /// parse, with a warning.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unparsable {}: {}", path.display(), err);
                Config::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };

        if let Ok(url) = std::env::var("PROMPTBRIDGE_API_URL") {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn data_dir() -> PathBuf {
        std::env::var_os("PROMPTBRIDGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn debug_enabled() -> bool {
        std::env::var("PROMPTBRIDGE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }

    pub fn variants_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.variants_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        chrono::Duration::seconds(secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.variants_ttl_secs, 3600);
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("promptbridge.sqlite3")
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"variantsTtlSecs": 60, "requestTimeoutSecs": 3}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.variants_ttl(), chrono::Duration::seconds(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.database_file, "promptbridge.sqlite3");
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.variants_ttl_secs, Config::default().variants_ttl_secs);
    }
}

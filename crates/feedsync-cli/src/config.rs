use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use feedsync_core::config::FeedConfig;
use feedsync_core::models::UserRef;
use serde::{Deserialize, Serialize};

/// CLI configuration loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Engine settings (API base, page size, rollback policy)
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

/// Signed-in user the CLI acts as
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Raw value for the Authorization header
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

impl Credentials {
    pub fn profile(&self) -> UserRef {
        UserRef::new(self.user_id.clone(), self.user_name.clone())
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Explicit path must exist; the default location may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("feedsync").join("config.json"))
}

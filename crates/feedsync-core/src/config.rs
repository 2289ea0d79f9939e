use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_BASE, DEFAULT_PAGE_SIZE};

/// What happens to an optimistic change when the backend rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    /// Leave the optimistic value in place
    #[default]
    Keep,
    /// Put back the value captured before the optimistic apply
    Restore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    pub api_base: String,
    pub page_size: u32,
    pub rollback: RollbackPolicy,
    /// Comment like/unlike are not broadcast unless this is set, so other
    /// sessions only see them on their next full fetch.
    pub broadcast_comment_likes: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            rollback: RollbackPolicy::Keep,
            broadcast_comment_likes: false,
        }
    }
}

impl FeedConfig {
    /// Load config from a JSON file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize feed config")
    }
}

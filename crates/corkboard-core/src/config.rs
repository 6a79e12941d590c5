use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration, loaded from `.corkboard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub forum: ForumConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base: Duration::from_millis(self.base_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    /// Whether approvals/rejections post status messages and retitle the
    /// proposal's discussion topic.
    #[serde(default = "default_true")]
    pub update_topics: bool,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            update_topics: default_true(),
        }
    }
}

/// Per-user settings, loaded from the platform config directory
/// (`corkboard/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Acting user name when the CLI is not given one explicitly.
    #[serde(default)]
    pub default_actor: Option<String>,
}

/// Load the user-level config, falling back to defaults when the platform
/// has no config directory or no file exists.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("corkboard/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the engine config under `project_root`, falling back to defaults
/// when no config file exists.
pub fn load_config(project_root: &Path) -> Result<EngineConfig> {
    let path = project_root.join(".corkboard/config.toml");
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EngineConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

const fn default_base_backoff_ms() -> u64 {
    1_000
}

const fn default_batch_size() -> usize {
    crate::mover::DEFAULT_BATCH_SIZE
}

const fn default_true() -> bool {
    true
}

//! Engine configuration loaded from `lockstep.toml`.
//!
//! [`EngineConfig`] holds the knobs for the concurrency-safe apply path.
//! Values missing from the file fall back to defaults. The
//! `LOCKSTEP_MAX_ATTEMPTS` environment variable takes precedence over the
//! file.

use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

/// Top-level configuration for the workflow engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Total attempts per apply call, counting the first. 2 means
    /// retry once on a lost conditional update.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Re-fetch the record snapshot before retrying a lost update. When
    /// false, the retry reuses the caller's stale snapshot, which almost
    /// always loses again if a single competing writer won.
    #[serde(default = "default_refetch_on_retry")]
    pub refetch_on_retry: bool,

    /// Write a history entry at record creation and after each successful
    /// apply.
    #[serde(default = "default_historise")]
    pub historise: bool,
}

// Total attempts per apply call: 2, i.e. retry once.
fn default_max_attempts() -> u32 {
    2
}

// Re-fetch before retrying by default.
fn default_refetch_on_retry() -> bool {
    true
}

// History is on unless the variant opts out.
fn default_historise() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            refetch_on_retry: default_refetch_on_retry(),
            historise: default_historise(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration from `lockstep.toml` in the current directory.
    /// Falls back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("lockstep.toml"))
    }

    /// Load the configuration from an explicit path, applying the
    /// environment override.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EngineConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment takes precedence over the config file.
        if let Ok(raw) = std::env::var("LOCKSTEP_MAX_ATTEMPTS")
            && let Ok(attempts) = raw.parse::<u32>()
        {
            config.max_attempts = attempts;
        }

        Ok(config)
    }
}

use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SERVER_URL_ENV: &str = "HOLDFAST_MISSION_CONTROL_URL";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Optional project configuration, read from `.holdfast/config.yaml`.
///
/// Every field has a default so a missing or partially-written file is never
/// an error. Hooks in particular must not fail on configuration problems;
/// `load` degrades to defaults instead of surfacing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mission-control server base URL. `HOLDFAST_MISSION_CONTROL_URL`
    /// overrides the file value.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Standby idle backoff: sleep `min(base * 2^idle_count, cap)` seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Age after which a claimed-but-unprocessed inbox item is considered
    /// abandoned and returned to the pending state.
    #[serde(default = "default_stale_claim")]
    pub stale_claim_secs: u64,

    /// Longest task-body excerpt embedded in a continuation message.
    #[serde(default = "default_task_excerpt")]
    pub max_task_excerpt: usize,
}

fn default_server_url() -> String {
    "http://localhost:7777".to_string()
}

fn default_backoff_base() -> u64 {
    5
}

fn default_backoff_cap() -> u64 {
    120
}

fn default_stale_claim() -> u64 {
    15 * 60
}

fn default_task_excerpt() -> usize {
    1500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            backoff_base_secs: default_backoff_base(),
            backoff_cap_secs: default_backoff_cap(),
            stale_claim_secs: default_stale_claim(),
            max_task_excerpt: default_task_excerpt(),
        }
    }
}

impl Config {
    /// Load configuration for `root`, falling back to defaults on any
    /// missing or malformed file, then apply env overrides.
    pub fn load(root: &Path) -> Self {
        let mut config: Config = std::fs::read_to_string(paths::config_path(root))
            .ok()
            .and_then(|data| serde_yaml::from_str(&data).ok())
            .unwrap_or_default();

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.is_empty() {
                config.server_url = url;
            }
        }
        config
    }

    /// Starter file content written by `holdfast init`.
    pub fn starter_yaml() -> String {
        // Defaults always serialize.
        serde_yaml::to_string(&Config::default()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

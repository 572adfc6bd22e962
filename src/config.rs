//! Workflow configuration.
//!
//! The configuration is an optional JSON file in the workflow's data
//! directory.  Every field is optional; a minimal `{}` file is valid and
//! all sections fall back to their compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "mullvad_path": "/usr/local/bin/mullvad",
//!   "command_timeout_ms": 5000,
//!   "account_warning_days": 5,
//!   "update_relays_on_refresh": true,
//!   "cache": {
//!     "relay_list_max_age_secs": 432000,
//!     "version_max_age_secs": 86400,
//!     "account_max_age_secs": 86400
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "alfred-mullvad";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred location of the client binary.  `PATH` is searched when
    /// it does not exist.
    pub mullvad_path: PathBuf,
    /// Deadline for a single client invocation (ms).
    pub command_timeout_ms: u64,
    /// Show the account banner on the home screen when the account expires
    /// within this many days.
    pub account_warning_days: i64,
    /// Run `relay update` before re-reading the relay list.
    pub update_relays_on_refresh: bool,
    /// Cache lifetimes.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mullvad_path: PathBuf::from("/usr/local/bin/mullvad"),
            command_timeout_ms: 5000,
            account_warning_days: 5,
            update_relays_on_refresh: true,
            cache: CacheConfig::default(),
        }
    }
}

/// Cache lifetimes, in **seconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub relay_list_max_age_secs: u64,
    pub version_max_age_secs: u64,
    pub account_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            relay_list_max_age_secs: 5 * 24 * 60 * 60,
            version_max_age_secs: 24 * 60 * 60,
            account_max_age_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn relay_list_max_age(&self) -> Duration {
        Duration::from_secs(self.relay_list_max_age_secs)
    }

    pub fn version_max_age(&self) -> Duration {
        Duration::from_secs(self.version_max_age_secs)
    }

    pub fn account_max_age(&self) -> Duration {
        Duration::from_secs(self.account_max_age_secs)
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

/// Resolve the config file (`$alfred_workflow_data/config.json`, else
/// `$XDG_CONFIG_HOME/alfred-mullvad/config.json`).
pub fn config_path() -> PathBuf {
    match std::env::var("alfred_workflow_data") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("config.json"),
        _ => xdg_dir("XDG_CONFIG_HOME", ".config").join("config.json"),
    }
}

/// Resolve the cache directory (`$alfred_workflow_cache`, else
/// `$XDG_CACHE_HOME/alfred-mullvad`).
pub fn cache_dir() -> PathBuf {
    match std::env::var("alfred_workflow_cache") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => xdg_dir("XDG_CACHE_HOME", ".cache"),
    }
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    let base = std::env::var(var).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/{}", home, fallback)
    });
    PathBuf::from(base).join(APP_DIR)
}

/// Load the config, falling back to defaults when there is no usable file.
pub fn load_or_default() -> Config {
    let path = config_path();
    match Config::load(&path) {
        Ok(cfg) => {
            log::info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            log::info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

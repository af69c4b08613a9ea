//! Configuration schema for Hearth
//!
//! Configuration is stored at `~/.config/hearth/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application layout
    pub app: AppConfig,

    /// Resource construction limits
    pub resources: ResourcesConfig,

    /// File watching
    pub watch: WatchConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Application directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application root; `public/` and `private/` live beneath it
    pub root: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// Resource settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Largest file, in bytes, whose contents are held in memory
    pub max_file_size_to_load: u64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            max_file_size_to_load: 10 * 1024 * 1024,
        }
    }
}

/// Watch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Invalidate resources when their files change
    pub enabled: bool,

    /// Rebuild invalidated resources in the background
    pub reload_on_change: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reload_on_change: false,
        }
    }
}

//! Configuration for diskmemo.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::policy::CacheSettings;
use crate::{CacheError, CacheResult};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "diskmemo.toml";

/// Main configuration for diskmemo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Disk cache policy. All five fields are required when loading.
    pub cache: CacheSettings,

    /// In-memory memoizer settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// In-memory memoizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of entries.
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,

    /// Entry time to live in seconds (0 = no expiry).
    #[serde(default)]
    pub ttl_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
            ttl_secs: 0,
        }
    }
}

fn default_memory_capacity() -> usize {
    256
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// The `[cache]` table is checked field by field, so a missing policy
    /// field is reported by name instead of as a generic parse error.
    pub fn from_toml_str(content: &str) -> CacheResult<Self> {
        let root: toml::Table = toml::from_str(content)?;

        let cache = match root.get("cache") {
            Some(table) => CacheSettings::from_toml(table, "[cache]")?,
            None => {
                return Err(CacheError::InvalidPolicy(
                    "no [cache] table in configuration".to_string(),
                ))
            }
        };

        let general: GeneralConfig = match root.get("general") {
            Some(value) => value.clone().try_into()?,
            None => GeneralConfig::default(),
        };

        let memory: MemoryConfig = match root.get("memory") {
            Some(value) => value.clone().try_into()?,
            None => MemoryConfig::default(),
        };

        Ok(Self {
            general,
            cache,
            memory,
        })
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            cache: CacheSettings::default(),
            memory: MemoryConfig::default(),
        }
    }

    /// Per-user config path (`~/.config/diskmemo/diskmemo.toml` on Linux).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("diskmemo").join(CONFIG_FILE_NAME))
    }

    /// Loads `path` if it exists, then the per-user config, then defaults.
    ///
    /// A file that exists but does not parse is an error, not a fallback.
    pub fn load_or_default(path: &Path) -> CacheResult<Self> {
        if path.exists() {
            return Self::load(path);
        }
        match Self::user_config_path() {
            Some(user) if user.exists() => Self::load(user),
            _ => Ok(Self::default_config()),
        }
    }

    /// Default configuration for the per-user config file.
    pub fn user_config() -> Self {
        Self {
            cache: CacheSettings::user_default(),
            ..Self::default_config()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

//! User settings
//!
//! Settings are read from an explicit file or from
//! `<base>/.archive/config.toml`. The relocation mode is never stored here;
//! it is chosen per invocation.

use std::path::{Path, PathBuf};

use archive_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::repository::METADATA_DIR;

/// File name looked up inside a repository's metadata directory
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Ask before executing each group
    pub confirm: bool,
    /// Print the comparison before planning
    pub show_comparison: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            confirm: true,
            show_comparison: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    /// Default location inside a local repository
    pub fn default_path(base_root: &Path) -> PathBuf {
        base_root.join(METADATA_DIR).join(CONFIG_FILE)
    }

    /// Resolve settings: explicit file, else the base repository's file, else defaults.
    pub fn resolve(explicit: Option<&Path>, base_root: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading settings from {}", path.display());
            return Self::load(path);
        }

        if let Some(root) = base_root {
            let path = Self::default_path(root);
            if path.is_file() {
                tracing::debug!("Loading settings from {}", path.display());
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }
}

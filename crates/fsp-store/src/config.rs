use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`PersistentStore`](crate::PersistentStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one backing file per object id. Created on first
    /// write.
    pub base_dir: PathBuf,
    /// Backing file extension, without the leading dot.
    pub extension: String,
    /// Default per-scope cache capacity. `0` means unbounded.
    pub cache_capacity: usize,
    /// Write through a temp file and rename it over the target, so a crash
    /// never leaves a truncated backing file. When `false`, files are
    /// overwritten in place.
    pub atomic_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            extension: "fsp.json".into(),
            cache_capacity: 0,
            atomic_writes: true,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn from_toml_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(StoreError::Config("base_dir must not be empty".into()));
        }
        if self.extension.starts_with('.') || self.extension.contains(['/', '\\']) {
            return Err(StoreError::Config(format!(
                "extension {:?} must be a bare suffix without leading dot or separators",
                self.extension
            )));
        }
        Ok(())
    }
}

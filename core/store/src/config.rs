//! Store configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use notevault_common::{Error, Result};

/// Configuration for a single vault.
///
/// The vault root is the only parameter the store itself needs; it is passed
/// explicitly so several independent vaults can live in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory exposed as the vault.
    pub root: PathBuf,
    /// Create the root directory when the store is opened.
    ///
    /// When false, a missing root lists as an empty vault.
    #[serde(default)]
    pub create_root: bool,
}

impl StoreConfig {
    /// Create a configuration for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_root: false,
        }
    }

    /// Set whether the root directory is created on open.
    pub fn with_create_root(mut self, create_root: bool) -> Self {
        self.create_root = create_root;
        self
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

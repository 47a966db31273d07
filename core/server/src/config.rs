//! Server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use notevault_common::{Error, Result};
use notevault_store::StoreConfig;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default browser origin allowed by CORS (the editor's dev server).
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_origins() -> Vec<String> {
    vec![DEFAULT_ORIGIN.to_string()]
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Vault served by this process.
    pub vault: StoreConfig,
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Origins allowed to call the API from a browser.
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Create a configuration with default bind address and origins.
    pub fn new(vault: StoreConfig) -> Self {
        Self {
            vault,
            bind: default_bind(),
            allowed_origins: default_origins(),
        }
    }

    /// Set the listen address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Replace the allowed origins.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
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

//! Persisted key-value storage configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which key-value backend holds the identity fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map. Nothing survives a restart.
    Memory,
    /// JSON object file on disk.
    #[default]
    File,
}

fn default_legacy_keys() -> Vec<String> {
    ["token", "access_token", "accessToken", "jwt_token"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the identity file. Empty means `~/.campus/identity.json`.
    #[serde(default)]
    pub path: String,

    /// Credential-only key names written by earlier releases, in migration
    /// priority order.
    #[serde(default = "default_legacy_keys")]
    pub legacy_keys: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: String::new(),
            legacy_keys: default_legacy_keys(),
        }
    }
}

impl StorageConfig {
    /// Resolve the identity file location, falling back to the home directory.
    #[must_use]
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            dirs::home_dir().map(|h| h.join(".campus").join("identity.json"))
        } else {
            Some(PathBuf::from(&self.path))
        }
    }
}

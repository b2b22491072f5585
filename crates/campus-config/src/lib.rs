//! # campus-config
//!
//! Layered configuration loading for the campus session layer using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CAMPUS_*` prefix, `__` as separator)
//! 2. Project-level `.campus/config.toml`
//! 3. User-level `~/.config/campus/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `CAMPUS_API__BASE_URL` -> `api.base_url`,
//! `CAMPUS_ASSISTANT__POLL_INTERVAL_MS` -> `assistant.poll_interval_ms`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use campus_config::CampusConfig;
//!
//! let config = CampusConfig::load_with_dotenv().expect("config");
//! println!("polling every {:?}", config.assistant.poll_interval());
//! ```

mod api;
mod assistant;
mod error;
mod session;
mod storage;

pub use api::ApiConfig;
pub use assistant::AssistantConfig;
pub use error::ConfigError;
pub use session::SessionConfig;
pub use storage::{StorageBackend, StorageConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CampusConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl CampusConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`load_with_dotenv`](Self::load_with_dotenv)
    /// if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or layer providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".campus/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("CAMPUS_").split("__"))
    }

    /// Reject values the session layer cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assistant.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "assistant.poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.storage.legacy_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "storage.legacy_keys".into(),
                reason: "key names must not be empty".into(),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("campus").join("config.toml"))
    }

    /// Load `.env` from the workspace root, walking up from `CARGO_MANIFEST_DIR`.
    /// Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

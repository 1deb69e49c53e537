//! Application configuration management.
//!
//! Configuration is stored at `~/.config/usergate/config.json` and may be
//! overridden per-invocation through environment variables:
//!
//! - `USERGATE_API_URL`: base URL of the REST backend
//! - `USERGATE_ADMIN_PROBE`: path of the admin-only probe endpoint
//! - `USERGATE_SESSION_PROBE`: path used to verify plain sessions
//! - `USERGATE_CREDENTIAL_BACKEND`: `file`, `keyring` or `memory`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{client::DEFAULT_REQUEST_TIMEOUT_SECS, ApiClient, ApiError};
use crate::auth::{BackendKind, CredentialStore, FileBackend, KeyringBackend, MemoryBackend};
use crate::guard::{Probe, Role, SessionGuard};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "usergate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:3001/api";

const DEFAULT_ADMIN_PROBE: &str = "/dashboard";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),

    #[error("Invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub admin_probe_path: String,
    /// `None` trusts the token's presence for plain pages.
    pub session_probe_path: Option<String>,
    pub request_timeout_secs: u64,
    pub credential_backend: BackendKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            admin_probe_path: DEFAULT_ADMIN_PROBE.to_string(),
            session_probe_path: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credential_backend: BackendKind::default(),
        }
    }
}

impl Config {
    /// Load the config file (defaults if missing), then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, contents).map_err(io_err)
    }

    /// Apply overrides from `lookup` (the process environment in practice).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("USERGATE_API_URL") {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(path) = non_empty("USERGATE_ADMIN_PROBE") {
            self.admin_probe_path = path.trim().to_string();
        }
        if let Some(path) = non_empty("USERGATE_SESSION_PROBE") {
            self.session_probe_path = Some(path.trim().to_string());
        }
        if let Some(kind) = non_empty("USERGATE_CREDENTIAL_BACKEND") {
            self.credential_backend =
                kind.parse().map_err(|message| ConfigError::InvalidEnv {
                    var: "USERGATE_CREDENTIAL_BACKEND",
                    message,
                })?;
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::NoDirectory("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Open the credential store on the configured backend.
    pub fn open_store(&self) -> Result<CredentialStore, ConfigError> {
        Ok(match self.credential_backend {
            BackendKind::File => CredentialStore::open(FileBackend::new(self.cache_dir()?)),
            BackendKind::Keyring => CredentialStore::open(KeyringBackend::new()),
            BackendKind::Memory => CredentialStore::open(MemoryBackend),
        })
    }

    pub fn api_client(&self, store: Arc<CredentialStore>) -> Result<ApiClient, ConfigError> {
        Ok(ApiClient::with_timeout(
            &self.api_base_url,
            store,
            self.request_timeout(),
        )?)
    }

    /// Guard for pages that only need a signed-in user.
    pub fn session_guard(&self, client: ApiClient) -> SessionGuard {
        let probe = match self.session_probe_path {
            Some(ref path) => Probe::session(path.clone()),
            None => Probe::presence(),
        };
        SessionGuard::new(client, probe)
    }

    /// Guard for the admin area.
    pub fn admin_guard(&self, client: ApiClient) -> SessionGuard {
        SessionGuard::new(
            client,
            Probe::role(self.admin_probe_path.clone(), Role::admin()),
        )
    }
}

use crate::shared::paths::ClientPaths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const STATE_ROOT_ENV: &str = "OPSDECK_STATE_ROOT";
pub const BACKEND_URL_ENV: &str = "OPSDECK_BACKEND_URL";
pub const DEFAULT_STATE_ROOT_DIR: &str = ".opsdeck";
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("failed to resolve home directory for client state root")]
    HomeDirectoryUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub polling: PollingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            status_interval_ms: default_status_interval_ms(),
            metrics_interval_ms: default_metrics_interval_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BACKEND_BASE_URL.to_string()
}

fn default_status_interval_ms() -> u64 {
    crate::workflow::STATUS_POLL_INTERVAL_MS
}

fn default_metrics_interval_ms() -> u64 {
    crate::api::METRICS_POLL_INTERVAL_MS
}

impl Settings {
    /// Backend base URL with the environment override applied, so a dev
    /// backend can be targeted without editing the settings file.
    pub fn effective_base_url(&self) -> String {
        std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.backend.base_url.clone())
    }
}

/// `OPSDECK_STATE_ROOT` when set, otherwise `~/.opsdeck`.
pub fn default_state_root() -> Result<PathBuf, ConfigError> {
    if let Some(root) = std::env::var_os(STATE_ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var_os("HOME").filter(|v| !v.is_empty());
    match home {
        Some(home) => Ok(PathBuf::from(home).join(DEFAULT_STATE_ROOT_DIR)),
        None => Err(ConfigError::HomeDirectoryUnavailable),
    }
}

/// Loads settings from the state root. A missing file yields defaults; an
/// unreadable or invalid file is an error because a misconfigured backend
/// URL should never be silently replaced.
pub fn load_settings(paths: &ClientPaths) -> Result<Settings, ConfigError> {
    let path = paths.settings_path();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn save_settings(paths: &ClientPaths, settings: &Settings) -> Result<(), ConfigError> {
    validate_settings(settings)?;
    let path = paths.settings_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let body = serde_yaml::to_string(settings).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(&path, body).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let base_url = settings.backend.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Settings(
            "backend.base_url must be non-empty".to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Settings(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }
    if settings.polling.status_interval_ms == 0 {
        return Err(ConfigError::Settings(
            "polling.status_interval_ms must be greater than zero".to_string(),
        ));
    }
    if settings.polling.metrics_interval_ms == 0 {
        return Err(ConfigError::Settings(
            "polling.metrics_interval_ms must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

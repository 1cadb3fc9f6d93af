//! Settings resolution for WILMA.
//!
//! Implements hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global settings file (`<config dir>/wilma/settings.json`)
//! 3. Environment variables
//! 4. CLI arguments (applied by the caller, highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default base URL of the main REST API.
pub const DEFAULT_API_URL: &str = "http://localhost:5070";
/// Default base URL of the forecasting service.
pub const DEFAULT_FORECAST_URL: &str = "http://localhost:8000/api";
/// Default path of the token refresh endpoint on the main API.
pub const DEFAULT_REFRESH_PATH: &str = "/api/users/refresh-token";
/// Delay between the "session expired" notice and the redirect to login.
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1500;

/// Complete WILMA client settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Main REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Path of the refresh endpoint, relative to `base_url`.
    pub refresh_path: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

/// Forecasting service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForecastSettings {
    pub base_url: String,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FORECAST_URL.to_string(),
        }
    }
}

/// Session persistence and expiry handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub redirect_delay_ms: u64,
    /// Storage file override. Defaults to `~/.wilma/storage.json`.
    pub storage_path: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            storage_path: None,
        }
    }
}

impl SessionSettings {
    pub const fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSettings {
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl HttpSettings {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Resolved storage file path.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.session.storage_path.clone().or_else(default_storage_path)
    }
}

/// Load settings: defaults, then the global settings file, then environment.
pub fn load_settings() -> Result<Settings> {
    let mut settings = match global_settings_path() {
        Some(path) if path.exists() => load_settings_file(&path)?,
        _ => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Path to the global settings file.
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wilma").join("settings.json"))
}

/// Default path of the local storage file: `~/.wilma/storage.json`.
pub fn default_storage_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".wilma").join("storage.json"))
}

/// Read and parse a settings file. Missing sections fall back to defaults.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read settings file {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse settings file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Apply `WILMA_*` environment overrides using the given lookup.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("WILMA_API_URL") {
        settings.api.base_url = val;
    }
    if let Some(val) = lookup("WILMA_REFRESH_PATH") {
        settings.api.refresh_path = val;
    }
    if let Some(val) = lookup("WILMA_FORECAST_URL") {
        settings.forecast.base_url = val;
    }
    if let Some(val) = lookup("WILMA_STORAGE_PATH") {
        settings.session.storage_path = Some(PathBuf::from(val));
    }
    if let Some(n) = lookup("WILMA_REDIRECT_DELAY_MS").and_then(|v| v.parse().ok()) {
        settings.session.redirect_delay_ms = n;
    }
    if let Some(n) = lookup("WILMA_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.http.request_timeout_secs = n;
    }
}

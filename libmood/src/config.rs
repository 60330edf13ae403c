//! Configuration management for Mood

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::credentials::CredentialConfig;
use crate::error::{ConfigError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3333";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: Option<CredentialConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout; unset means the HTTP client's own default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = Self::load_from_path(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!("No config at {:?}, using defaults", config_path);
            Self::default_config()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: None,
            },
            credentials: Some(CredentialConfig::default()),
        }
    }

    /// Credential settings, defaulted when the section is absent
    pub fn credential_config(&self) -> CredentialConfig {
        self.credentials.clone().unwrap_or_default()
    }

    /// `MOOD_API_URL` takes precedence over `api.base_url`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MOOD_API_URL") {
            if !url.is_empty() {
                tracing::debug!("Using API base URL from MOOD_API_URL");
                self.api.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", base_url),
            }
            .into());
        }
        Ok(())
    }
}

/// Resolve the configuration file path (`MOOD_CONFIG`, else the XDG config dir)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MOOD_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("mood").join("config.toml"))
}

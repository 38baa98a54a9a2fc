//! Service configuration.
//!
//! Loaded once at startup from an optional TOML file named by `PULSE_CONFIG`,
//! then overridden by environment variables. The result is validated before
//! the server starts so that misconfiguration never yields broken image URLs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the optional TOML config path.
pub const CONFIG_PATH_VAR: &str = "PULSE_CONFIG";

/// Where rendered charts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Cloud Storage JSON API
    #[default]
    Gcs,
    /// Directory on the local filesystem
    Local,
    /// Process memory, for development and tests
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("expected gcs, local or memory, got '{}'", other)),
        }
    }
}

/// Forecast model trained per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Dense,
    Naive,
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(ModelKind::Dense),
            "naive" => Ok(ModelKind::Naive),
            other => Err(format!("expected dense or naive, got '{}'", other)),
        }
    }
}

/// Service-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Public URL prefix that artifact names are appended to.
    pub base_image_path: String,
    /// Bucket the charts are uploaded to.
    pub bucket_name: String,
    pub storage_backend: StorageBackend,
    /// Root directory for the `local` backend.
    pub local_storage_dir: Option<PathBuf>,
    /// Bearer token for the GCS API.
    pub gcs_access_token: Option<String>,
    /// GCS API root.
    pub storage_endpoint: String,
    /// Deadline for the training stage of one request.
    pub training_timeout_secs: u64,
    pub forecast_model: ModelKind,
    /// TrueType font for chart text. Charts are drawn without text when unset.
    pub chart_font_path: Option<PathBuf>,
    /// Log level.
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_image_path: String::new(),
            bucket_name: String::new(),
            storage_backend: StorageBackend::Gcs,
            local_storage_dir: None,
            gcs_access_token: None,
            storage_endpoint: "https://storage.googleapis.com".to_string(),
            training_timeout_secs: 120,
            forecast_model: ModelKind::Dense,
            chart_font_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(&vars)
    }

    /// Load from an explicit variable map, reading the TOML file it points to.
    pub fn from_sources(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = match vars.get(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(v) = vars.get("HOST") {
            self.host = v.clone();
        }
        if let Some(v) = vars.get("PORT") {
            self.port = parse_var("PORT", v)?;
        }
        if let Some(v) = vars.get("BASE_IMAGE_PATH") {
            self.base_image_path = v.clone();
        }
        if let Some(v) = vars.get("BUCKET_NAME") {
            self.bucket_name = v.clone();
        }
        if let Some(v) = vars.get("STORAGE_BACKEND") {
            self.storage_backend = parse_var("STORAGE_BACKEND", v)?;
        }
        if let Some(v) = vars.get("LOCAL_STORAGE_DIR") {
            self.local_storage_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = vars.get("GCS_ACCESS_TOKEN") {
            self.gcs_access_token = Some(v.clone()).filter(|t| !t.is_empty());
        }
        if let Some(v) = vars.get("STORAGE_ENDPOINT") {
            self.storage_endpoint = v.clone();
        }
        if let Some(v) = vars.get("TRAINING_TIMEOUT_SECS") {
            self.training_timeout_secs = parse_var("TRAINING_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = vars.get("FORECAST_MODEL") {
            self.forecast_model = parse_var("FORECAST_MODEL", v)?;
        }
        if let Some(v) = vars.get("CHART_FONT_PATH") {
            self.chart_font_path = Some(PathBuf::from(v));
        }
        if let Some(v) = vars.get("LOG_LEVEL") {
            self.log_level = v.clone();
        }
        Ok(())
    }

    /// Check that every required value is present and usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_image_path.trim().is_empty() {
            return Err(ConfigError::Missing("BASE_IMAGE_PATH"));
        }
        if self.bucket_name.trim().is_empty() {
            return Err(ConfigError::Missing("BUCKET_NAME"));
        }
        if self.storage_backend == StorageBackend::Local && self.local_storage_dir.is_none() {
            return Err(ConfigError::Missing("LOCAL_STORAGE_DIR"));
        }
        if self.training_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "TRAINING_TIMEOUT_SECS".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn training_timeout(&self) -> Duration {
        Duration::from_secs(self.training_timeout_secs)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.training_timeout(), Duration::from_secs(120));
        assert_eq!(config.storage_backend, StorageBackend::Gcs);
    }

    #[test]
    fn test_bind_addr() {
        let config = ServiceConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..ServiceConfig::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }
}

//! Configuration loading and types.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct. Every section is optional and falls back to the
//! defaults below.

use serde::Deserialize;
use std::path::Path;

use crate::errors::{ObjectStorageError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Where the object storage API lives.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Account credentials.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings (used by the `slos` binary).
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Base URL; the auth endpoint is `{base_url}/auth/v1.0`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// PEM trust store for `https` targets. When set, only these
    /// certificates are trusted.
    #[serde(default)]
    pub ca_bundle: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ca_bundle: None,
        }
    }
}

/// Account credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Account user, typically `account:user`.
    #[serde(default)]
    pub username: String,

    /// Password or API key (also accepts `password`).
    #[serde(alias = "password", default)]
    pub api_key: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_base_url() -> String {
    "http://dal05.objectstorage.service.networklayer.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Parse configuration from YAML text.
pub fn parse_config(contents: &str) -> Result<Config> {
    serde_yaml::from_str(contents).map_err(|e| ObjectStorageError::InvalidConfig {
        message: format!("malformed configuration: {e}"),
    })
}

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| ObjectStorageError::InvalidConfig {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

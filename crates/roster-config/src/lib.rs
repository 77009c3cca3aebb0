//! Server configuration for roster.
//!
//! [`ServerConfig`] is assembled in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional JSON file named by `ROSTER_CONFIG`
//! 3. Environment variables (the server loads `.env` via `dotenvy` before this runs)
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `ROSTER_BIND_ADDR` | `bind_addr` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | `database_url` | `sqlite://data/sample.db` |
//! | `ROSTER_MAX_CONNECTIONS` | `max_connections` | `5` |
//! | `ROSTER_ACQUIRE_TIMEOUT_SECS` | `acquire_timeout_secs` | `30` |
//! | `ROSTER_INTEGER_PATH_CODES` | `integer_path_codes` | `false` |
//!
//! # Loading from JSON
//!
//! ```rust
//! use roster_config::ServerConfig;
//!
//! let config = ServerConfig::from_json(r#"{ "max_connections": 10 }"#).unwrap();
//! assert_eq!(config.max_connections, 10);
//! assert_eq!(config.bind_addr, "0.0.0.0:3000");
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_PATH_VAR: &str = "ROSTER_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable held a value of the wrong type.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    /// A value parsed but is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime settings for the HTTP server and its connection pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the server listens on.
    pub bind_addr: String,
    /// sqlx connection URL for the sample database.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a request waits for a pooled connection before failing.
    pub acquire_timeout_secs: u64,
    /// Require PUT/PATCH/DELETE path codes to be integer-formatted, as the
    /// legacy API did.
    pub integer_path_codes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            database_url: "sqlite://data/sample.db".into(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            integer_path_codes: false,
        }
    }
}

impl ServerConfig {
    /// Loads the optional config file, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!(?config, "Resolved server config");
        Ok(config)
    }

    /// Parses a configuration from a JSON string. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        info!("Loaded config file {}", path.display());
        Self::from_json(&content)
    }

    /// Overrides fields from variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ROSTER_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("ROSTER_MAX_CONNECTIONS") {
            self.max_connections = parse_var("ROSTER_MAX_CONNECTIONS", v)?;
        }
        if let Some(v) = lookup("ROSTER_ACQUIRE_TIMEOUT_SECS") {
            self.acquire_timeout_secs = parse_var("ROSTER_ACQUIRE_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("ROSTER_INTEGER_PATH_CODES") {
            self.integer_path_codes = parse_flag("ROSTER_INTEGER_PATH_CODES", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1".into()));
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("database_url must not be empty".into()));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    let flag = value.trim().to_ascii_lowercase();
    match flag.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_legacy_service() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert!(!config.integer_path_codes);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ServerConfig::from_json(r#"{ "bind_addr": "127.0.0.1:8080" }"#).unwrap();
        config
            .apply_env(env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("ROSTER_MAX_CONNECTIONS", "8"),
                ("ROSTER_INTEGER_PATH_CODES", "TRUE"),
            ]))
            .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 8);
        assert!(config.integer_path_codes);
    }

    #[test]
    fn bad_env_values_are_reported() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(env(&[("ROSTER_ACQUIRE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "ROSTER_ACQUIRE_TIMEOUT_SECS", .. }));

        let err = config
            .apply_env(env(&[("ROSTER_INTEGER_PATH_CODES", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = ServerConfig::from_json(r#"{ "max_connections": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_file_is_an_io_error() {
        let err = ServerConfig::from_file("/nonexistent/roster.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

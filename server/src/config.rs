//! Configuration management for the server.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path of the collection catalog (JSON)
    pub catalog_path: PathBuf,
    /// Base URL of the remote document store; `None` keeps records in memory
    pub store_url: Option<String>,
    /// Token passed as `auth` to the document store
    pub store_auth: Option<String>,
    /// Base URL of the blob service; `None` keeps uploads in memory
    pub blob_url: Option<String>,
    /// Timeout for each remote request
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            catalog_path: PathBuf::from("catalog.json"),
            store_url: None,
            store_auth: None,
            blob_url: None,
            request_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty("HOST").unwrap_or(defaults.host);

        let port = match non_empty("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let catalog_path = non_empty("FOLIO_CATALOG")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        let store_url = non_empty("FOLIO_STORE_URL")
            .map(|url| validate_url("FOLIO_STORE_URL", url))
            .transpose()?;
        let blob_url = non_empty("FOLIO_BLOB_URL")
            .map(|url| validate_url("FOLIO_BLOB_URL", url))
            .transpose()?;

        let store_auth = non_empty("FOLIO_STORE_AUTH");

        let request_timeout = non_empty("FOLIO_REQUEST_TIMEOUT_SECS")
            .map(|value| match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(ConfigError::InvalidTimeout),
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            catalog_path,
            store_url,
            store_auth,
            blob_url,
            request_timeout,
        })
    }
}

fn validate_url(key: &'static str, url: String) -> Result<String, ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::InvalidUrl(key))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("{0} must be an http(s) URL")]
    InvalidUrl(&'static str),

    #[error("FOLIO_REQUEST_TIMEOUT_SECS must be a positive number of seconds")]
    InvalidTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn reads_remote_settings() {
        let config = load(&[
            ("PORT", "8080"),
            ("FOLIO_STORE_URL", "https://example.firebaseio.com/"),
            ("FOLIO_STORE_AUTH", "secret"),
            ("FOLIO_REQUEST_TIMEOUT_SECS", "15"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.store_url.as_deref(),
            Some("https://example.firebaseio.com")
        );
        assert_eq!(config.store_auth.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.blob_url, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(load(&[("PORT", "http")]), Err(ConfigError::InvalidPort));
        assert_eq!(
            load(&[("FOLIO_BLOB_URL", "ftp://files")]),
            Err(ConfigError::InvalidUrl("FOLIO_BLOB_URL"))
        );
        assert_eq!(
            load(&[("FOLIO_REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidTimeout)
        );
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("HOST", " "), ("FOLIO_STORE_URL", "")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.store_url, None);
    }
}

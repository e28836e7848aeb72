//! Store configuration.
//!
//! Loaded from environment variables (optionally via a `.env` file):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DOCSHELF_URL` | `http://127.0.0.1:54321` |
//! | `DOCSHELF_API_KEY` | (required) |
//! | `DOCSHELF_BUCKET` | `documents` |
//! | `DOCSHELF_TABLE` | `documents` |
//! | `DOCSHELF_TIMEOUT_SECS` | `30` |
//! | `DOCSHELF_SIGNED_URL_TTL_SECS` | `3600` |
//! | `DOCSHELF_MAX_UPLOAD_BYTES` | `10485760` |

use std::env;

use docshelf_core::defaults;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ENV_URL: &str = "DOCSHELF_URL";
pub const ENV_API_KEY: &str = "DOCSHELF_API_KEY";
pub const ENV_BUCKET: &str = "DOCSHELF_BUCKET";
pub const ENV_TABLE: &str = "DOCSHELF_TABLE";
pub const ENV_TIMEOUT_SECS: &str = "DOCSHELF_TIMEOUT_SECS";
pub const ENV_SIGNED_URL_TTL_SECS: &str = "DOCSHELF_SIGNED_URL_TTL_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "DOCSHELF_MAX_UPLOAD_BYTES";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for docshelf_core::Error {
    fn from(e: ConfigError) -> Self {
        docshelf_core::Error::Config(e.to_string())
    }
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted backend (REST and storage APIs hang off it).
    pub base_url: String,
    /// Anonymous or service key sent with every request.
    pub api_key: String,
    /// Object storage bucket for uploaded files.
    pub bucket: String,
    /// Table holding document records.
    pub table: String,
    pub request_timeout_secs: u64,
    pub signed_url_ttl_secs: u64,
    pub max_upload_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::STORE_URL.to_string(),
            api_key: String::new(),
            bucket: defaults::STORE_BUCKET.to_string(),
            table: defaults::STORE_TABLE.to_string(),
            request_timeout_secs: defaults::STORE_TIMEOUT_SECS,
            signed_url_ttl_secs: defaults::SIGNED_URL_TTL_SECS,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

impl StoreConfig {
    /// Config pointing at `base_url` with `api_key`, everything else default.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Read `.env` if present, then the environment, then validate.
    pub fn load() -> ConfigResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env::var(ENV_URL).unwrap_or(defaults.base_url),
            api_key: env::var(ENV_API_KEY).unwrap_or(defaults.api_key),
            bucket: env::var(ENV_BUCKET).unwrap_or(defaults.bucket),
            table: env::var(ENV_TABLE).unwrap_or(defaults.table),
            request_timeout_secs: parse_u64(
                ENV_TIMEOUT_SECS,
                env::var(ENV_TIMEOUT_SECS).ok(),
                defaults.request_timeout_secs,
            )?,
            signed_url_ttl_secs: parse_u64(
                ENV_SIGNED_URL_TTL_SECS,
                env::var(ENV_SIGNED_URL_TTL_SECS).ok(),
                defaults.signed_url_ttl_secs,
            )?,
            max_upload_bytes: parse_u64(
                ENV_MAX_UPLOAD_BYTES,
                env::var(ENV_MAX_UPLOAD_BYTES).ok(),
                defaults.max_upload_bytes,
            )?,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "api_key cannot be empty (set {})",
                ENV_API_KEY
            )));
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Validation("bucket cannot be empty".to_string()));
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::Validation("table cannot be empty".to_string()));
        }
        if self.request_timeout_secs == 0 || self.signed_url_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn parse_u64(var: &'static str, raw: Option<String>, default: u64) -> ConfigResult<u64> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> StoreConfig {
        StoreConfig::new("https://example.supabase.co/", "anon-key")
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.bucket, "documents");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_base_trims_trailing_slash() {
        assert_eq!(valid().base(), "https://example.supabase.co");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = valid();
        config.base_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_missing_key() {
        let mut config = valid();
        config.api_key = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = valid();
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("X", None, 7).unwrap(), 7);
        assert_eq!(parse_u64("X", Some(" 42 ".to_string()), 7).unwrap(), 42);
        let err = parse_u64("X", Some("lots".to_string()), 7).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for X: lots");
    }

    #[test]
    fn test_config_error_converts_to_core_error() {
        let err: docshelf_core::Error = ConfigError::Validation("bad".to_string()).into();
        assert!(matches!(err, docshelf_core::Error::Config(_)));
    }
}

//! Startup configuration.
//!
//! Values come from the process environment (optionally seeded from a
//! `.env` file) and are read exactly once; every collaborator receives
//! its slice of [`Config`] at construction.

use core::fmt;
use core::time::Duration;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::splitter::DEFAULT_SENTINEL_LABEL;

/// Production App Store Connect API root.
const DEFAULT_API_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// Default HTTP timeout for report downloads.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level server configuration.
#[derive(Clone)]
pub(crate) struct Config {
    /// App Store Connect access.
    pub(crate) api: ApiConfig,
    /// PostgreSQL connection string (`DSN`).
    pub(crate) database_url: Option<String>,
    /// Directory that downloaded reports are written to.
    pub(crate) output_dir: PathBuf,
    /// Label of the line separating the two tables of an export.
    pub(crate) sentinel_label: String,
}

/// App Store Connect access settings.
#[derive(Clone)]
pub(crate) struct ApiConfig {
    /// API root, without trailing slash.
    pub(crate) base_url: String,
    /// Pre-issued bearer token.
    pub(crate) token: Option<String>,
    /// Vendor number that reports are requested for.
    pub(crate) vendor_number: Option<String>,
    /// Per-request timeout.
    pub(crate) timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api", &self.api)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_dsn| "[REDACTED]"),
            )
            .field("output_dir", &self.output_dir)
            .field("sentinel_label", &self.sentinel_label)
            .finish()
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_token| "[REDACTED]"))
            .field("vendor_number", &self.vendor_number)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the environment, reading `.env` first if
    /// one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not
    /// parse.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        let _dotenv = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not
    /// parse.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout_secs = match get("ASC_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_err| ConfigError::InvalidValue {
                    name: "ASC_REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let api = ApiConfig {
            base_url: get("ASC_API_BASE_URL")
                .map_or_else(|| DEFAULT_API_BASE_URL.to_owned(), |url| {
                    url.trim_end_matches('/').to_owned()
                }),
            token: get("ASC_API_TOKEN"),
            vendor_number: get("ASC_VENDOR_NUMBER"),
            timeout: Duration::from_secs(timeout_secs),
        };

        if api.token.is_none() {
            warn!("ASC_API_TOKEN not set - report downloads will fail");
        }
        if api.vendor_number.is_none() {
            warn!("ASC_VENDOR_NUMBER not set - report downloads will fail");
        }

        let database_url = get("DSN");
        if database_url.is_some() {
            info!("PostgreSQL DSN loaded from environment");
        }

        Ok(Self {
            api,
            database_url,
            output_dir: get("APPLE_DATA_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            sentinel_label: get("REPORT_SENTINEL_LABEL")
                .unwrap_or_else(|| DEFAULT_SENTINEL_LABEL.to_owned()),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    clippy::use_debug,
    reason = "test code uses expect and Debug output for readability"
)]
mod tests {
    use core::time::Duration;
    use std::collections::HashMap;
    use std::path::Path;

    use super::Config;
    use crate::error::ConfigError;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|&(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).expect("should build");
        assert_eq!(config.api.base_url, "https://api.appstoreconnect.apple.com/v1");
        assert!(config.api.token.is_none());
        assert!(config.api.vendor_number.is_none());
        assert_eq!(config.api.timeout, Duration::from_secs(60));
        assert!(config.database_url.is_none());
        assert_eq!(config.output_dir, Path::new("."));
        assert_eq!(config.sentinel_label, "Total_Rows");
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = config_from(&[
            ("ASC_API_BASE_URL", "http://localhost:8080/v1/"),
            ("ASC_API_TOKEN", "token"),
            ("ASC_VENDOR_NUMBER", "85012345"),
            ("ASC_REQUEST_TIMEOUT_SECS", " 5 "),
            ("DSN", "postgres://u:p@localhost/db"),
            ("APPLE_DATA_DIR", "/tmp/reports"),
            ("REPORT_SENTINEL_LABEL", "ROWS"),
        ])
        .expect("should build");
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api.vendor_number.as_deref(), Some("85012345"));
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.output_dir, Path::new("/tmp/reports"));
        assert_eq!(config.sentinel_label, "ROWS");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("ASC_VENDOR_NUMBER", "  ")]).expect("should build");
        assert!(config.api.vendor_number.is_none());
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = config_from(&[("ASC_REQUEST_TIMEOUT_SECS", "soon")]).expect_err("should fail");
        assert!(err.to_string().contains("ASC_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = config_from(&[
            ("ASC_API_TOKEN", "super-secret-token"),
            ("DSN", "postgres://user:hunter2@db/sales"),
        ])
        .expect("should build");
        let debug = format!("{config:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("super-secret-token"));
        assert!(!debug.contains("hunter2"));
    }
}

use std::str::FromStr;
use std::time::Duration;

use api::HttpLimits;
use thiserror::Error;
use tracing::warn;

pub use storage::sqlite::DEFAULT_DB_URL;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT_IN_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_BODY_SIZE_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {raw:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        raw: String,
    },
}

/// Settings read from the process environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVars {
    pub db_url: String,
    pub port: u16,
    pub request_timeout_in_ms: u64,
    pub request_body_size_limit: usize,
}

impl EnvVars {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    ///
    /// Unset or empty variables fall back to their defaults with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = match lookup("PROGRESS_DB_URL").filter(|s| !s.is_empty()) {
            Some(url) => url,
            None => {
                warn!("PROGRESS_DB_URL not set. Defaulting to {DEFAULT_DB_URL}");
                DEFAULT_DB_URL.to_string()
            }
        };
        let port = parse_or_default(&lookup, "PORT", "a port number", DEFAULT_PORT)?;
        let request_timeout_in_ms = parse_or_default(
            &lookup,
            "REQUEST_TIMEOUT_IN_MS",
            "an unsigned integer",
            DEFAULT_REQUEST_TIMEOUT_IN_MS,
        )?;
        let request_body_size_limit = parse_or_default(
            &lookup,
            "REQUEST_BODY_SIZE_LIMIT",
            "an unsigned integer",
            DEFAULT_REQUEST_BODY_SIZE_LIMIT,
        )?;

        Ok(Self {
            db_url,
            port,
            request_timeout_in_ms,
            request_body_size_limit,
        })
    }

    #[must_use]
    pub fn http_limits(&self) -> HttpLimits {
        HttpLimits {
            request_timeout: Duration::from_millis(self.request_timeout_in_ms),
            request_body_size_limit: self.request_body_size_limit,
        }
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + std::fmt::Display,
{
    match lookup(name).filter(|s| !s.is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            raw,
        }),
        None => {
            warn!("{name} not set. Defaulting to {default}");
            Ok(default)
        }
    }
}

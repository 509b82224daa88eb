//! Configuration management for the OMP server.
//!
//! All configuration is driven by environment variables. Every constructor has
//! a `from_lookup` twin taking a lookup function so tests never touch the
//! process environment.

use std::env;
use std::str::FromStr;

use crate::error::{OmpError, OmpResult};

/// Process-wide server configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Request body cap, also advertised in discovery.
    pub max_payload_mb: u64,
    /// Advertised rate limit. Not enforced.
    pub rate_limit_per_min: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            log_level: "info".to_owned(),
            max_payload_mb: 5,
            rate_limit_per_min: 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`OmpError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> OmpResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`OmpError::Config`] if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OmpResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("OMP_SERVER_HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("OMP_SERVER_PORT") {
            config.port = parse_number("OMP_SERVER_PORT", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("OMP_MAX_PAYLOAD_MB") {
            config.max_payload_mb = parse_number("OMP_MAX_PAYLOAD_MB", &v)?;
        }
        if let Some(v) = lookup("OMP_RATE_LIMIT") {
            config.rate_limit_per_min = parse_number("OMP_RATE_LIMIT", &v)?;
        }

        Ok(config)
    }

    /// The `host:port` address to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body cap in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        usize::try_from(self.max_payload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> OmpResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OmpError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}

/// Interpret a configuration flag value.
#[must_use]
pub fn lookup_bool(value: &str) -> bool {
    matches!(
        value.trim(),
        "1" | "true" | "yes" | "on" | "TRUE" | "YES" | "ON" | "True" | "Yes"
    )
}

/// Read a boolean flag from the environment.
#[must_use]
pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| lookup_bool(&v))
}

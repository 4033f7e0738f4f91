//! Service configuration.
//!
//! Loaded from environment variables (a `.env` file is honoured by the
//! binary) with defaults suitable for a single-shop install.

use crate::models::DEFAULT_LOW_STOCK_THRESHOLD;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Threshold given to products registered without one
    pub low_stock_default: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("bloom_ledger.db"),
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            low_stock_default: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("BLOOM_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BLOOM_PORT",
                expected: "a port number",
                value,
            })?,
            None => defaults.port,
        };

        let low_stock_default = match lookup("BLOOM_LOW_STOCK_DEFAULT") {
            Some(value) => match value.parse::<i64>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "BLOOM_LOW_STOCK_DEFAULT",
                        expected: "a non-negative integer",
                        value,
                    })
                }
            },
            None => defaults.low_stock_default,
        };

        Ok(Self {
            database_path: lookup("BLOOM_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            host: lookup("BLOOM_HOST").unwrap_or(defaults.host),
            port,
            log_level: lookup("BLOOM_LOG_LEVEL").unwrap_or(defaults.log_level),
            low_stock_default,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("bloom_ledger.db"));
        assert_eq!(config.low_stock_default, 5);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("BLOOM_PORT", "9090"),
            ("BLOOM_HOST", "127.0.0.1"),
            ("BLOOM_DATABASE_PATH", "/var/lib/bloom/shop.db"),
            ("BLOOM_LOW_STOCK_DEFAULT", "12"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.database_path, PathBuf::from("/var/lib/bloom/shop.db"));
        assert_eq!(config.low_stock_default, 12);
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("BLOOM_PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "BLOOM_PORT must be a port number, got \"eighty\""
        );
    }

    #[test]
    fn negative_threshold_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("BLOOM_LOW_STOCK_DEFAULT", "-1")])).is_err());
    }
}

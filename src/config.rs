//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Environment (development, production)
    pub environment: String,

    /// Transfer orchestration settings
    pub transfer: TransferConfig,
}

/// Settings for `TransferHandler`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Deadline applied when the caller supplies none
    pub timeout: Option<Duration>,

    /// Re-runs of a transfer whose statement hit a deadlock
    pub max_retries: u32,

    /// Base delay between re-runs; attempt `n` waits `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(5000)),
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            environment,
            transfer: TransferConfig::from_env()?,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl TransferConfig {
    /// Load transfer settings; `TRANSFER_TIMEOUT_MS=0` disables the default deadline
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_ms: u64 = parse_env("TRANSFER_TIMEOUT_MS", 5000)?;
        let max_retries = parse_env("TRANSFER_MAX_RETRIES", defaults.max_retries)?;
        let backoff_ms: u64 = parse_env("TRANSFER_RETRY_BACKOFF_MS", 50)?;

        Ok(Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            max_retries,
            retry_backoff: Duration::from_millis(backoff_ms),
        })
    }
}

fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_config_defaults() {
        let config = TransferConfig::default();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff, Duration::from_millis(50));
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("LEDGER_TRANSFER_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        env::set_var("LEDGER_TRANSFER_TEST_BAD_VAR", "not-a-number");
        let result: Result<u32, _> = parse_env("LEDGER_TRANSFER_TEST_BAD_VAR", 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("LEDGER_TRANSFER_TEST_BAD_VAR"))
        ));
    }
}

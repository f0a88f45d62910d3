//! Configuration Module
//!
//! Handles loading named cache settings from environment variables.

use std::env;
use std::time::Duration;

/// Named cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum key length in bytes
    pub max_key_length: usize,
    /// Productions slower than this are logged as warnings
    pub slow_production_threshold: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NAMED_CACHE_MAX_KEY_LENGTH` - Maximum key length in bytes (default: 256)
    /// - `NAMED_CACHE_SLOW_PRODUCTION_MS` - Slow production threshold in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_key_length: env::var("NAMED_CACHE_MAX_KEY_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_key_length),
            slow_production_threshold: env::var("NAMED_CACHE_SLOW_PRODUCTION_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_production_threshold),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_length: 256,
            slow_production_threshold: Duration::from_millis(1000),
        }
    }
}

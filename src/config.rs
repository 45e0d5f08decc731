//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.
//! The library API itself takes TTLs and intervals per call; this only feeds the binary.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold, 0 = unbounded
    pub max_entries: usize,
    /// TTL in milliseconds for entries stored without an explicit TTL
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Reaper sweep interval in milliseconds
    pub reaper_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries, 0 for no limit (default: 0)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REAPER_INTERVAL_MS` - Reaper sweep interval in milliseconds (default: 1000)
    ///
    /// Missing values fall back to the defaults. Set but unparseable values
    /// (including negative durations) also fall back, with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            reaper_interval_ms: env_or("REAPER_INTERVAL_MS", defaults.reaper_interval_ms),
        }
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Reaper interval as a `Duration`.
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_millis(self.reaper_interval_ms)
    }
}

fn env_or<T: FromStr + std::fmt::Debug>(name: &str, default: T) -> T {
    parse_or(name, env::var(name).ok().as_deref(), default)
}

fn parse_or<T: FromStr + std::fmt::Debug>(name: &str, raw: Option<&str>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                "Ignoring invalid {}={:?}, using default {:?}",
                name, raw, default
            );
            default
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 0,
            default_ttl_ms: 300_000,
            server_port: 3000,
            reaper_interval_ms: 1000,
        }
    }
}

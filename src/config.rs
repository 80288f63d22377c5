//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::DEFAULT_BUCKET_COUNT;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval in seconds between expired-key sweeps
    pub ttl_check_interval: u64,
    /// Interval in seconds between snapshot writes
    pub dump_interval: u64,
    /// Location of the snapshot file
    pub dump_file: PathBuf,
    /// TCP port for the line protocol server
    pub server_port: u16,
    /// Number of hash buckets in the cache
    pub bucket_count: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTL_CHECK_INTERVAL` - Sweep frequency in seconds (default: 5)
    /// - `DUMP_INTERVAL` - Snapshot frequency in seconds (default: 60)
    /// - `DUMP_FILE` - Snapshot file path (default: dump.json)
    /// - `SERVER_PORT` - TCP server port (default: 2094)
    /// - `BUCKET_COUNT` - Hash buckets in the cache (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_check_interval: parse_var("TTL_CHECK_INTERVAL")
                .unwrap_or(defaults.ttl_check_interval),
            dump_interval: parse_var("DUMP_INTERVAL").unwrap_or(defaults.dump_interval),
            dump_file: env::var_os("DUMP_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.dump_file),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            bucket_count: parse_var("BUCKET_COUNT").unwrap_or(defaults.bucket_count),
        }
    }

    /// Sweep period as a `Duration`.
    pub fn ttl_check_period(&self) -> Duration {
        Duration::from_secs(self.ttl_check_interval.max(1))
    }

    /// Snapshot period as a `Duration`.
    pub fn dump_period(&self) -> Duration {
        Duration::from_secs(self.dump_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_check_interval: 5,
            dump_interval: 60,
            dump_file: PathBuf::from("dump.json"),
            server_port: 2094,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ttl_check_interval, 5);
        assert_eq!(config.dump_interval, 60);
        assert_eq!(config.dump_file, PathBuf::from("dump.json"));
        assert_eq!(config.server_port, 2094);
        assert_eq!(config.bucket_count, DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment so parallel tests cannot race on it
        env::remove_var("TTL_CHECK_INTERVAL");
        env::remove_var("DUMP_FILE");
        env::remove_var("SERVER_PORT");
        env::remove_var("BUCKET_COUNT");
        env::set_var("DUMP_INTERVAL", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.ttl_check_interval, 5);
        assert_eq!(config.dump_interval, 60);
        assert_eq!(config.server_port, 2094);

        env::set_var("DUMP_INTERVAL", "15");
        env::set_var("DUMP_FILE", "/tmp/store.json");
        let config = Config::from_env();
        assert_eq!(config.dump_interval, 15);
        assert_eq!(config.dump_file, PathBuf::from("/tmp/store.json"));

        env::remove_var("DUMP_INTERVAL");
        env::remove_var("DUMP_FILE");
    }

    #[test]
    fn test_periods_never_zero() {
        let config = Config {
            ttl_check_interval: 0,
            dump_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.ttl_check_period(), Duration::from_secs(1));
        assert_eq!(config.dump_period(), Duration::from_secs(1));
    }
}

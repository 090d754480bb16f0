//! Relay configuration loaded from environment variables.

use std::time::Duration;

/// Outbox relay configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory store)
/// - `OUTBOX_BATCH_SIZE`: messages fetched per pass (default: `100`)
/// - `OUTBOX_MAX_ATTEMPTS`: failed attempts before a message is no longer delivered (default: `5`)
/// - `OUTBOX_POLL_INTERVAL_MS`: delay between passes (default: `1000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub database_url: Option<String>,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub poll_interval: Duration,
    pub log_level: String,
}

impl RelayConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            batch_size: env_parse("OUTBOX_BATCH_SIZE")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.batch_size),
            max_attempts: env_parse("OUTBOX_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            poll_interval: env_parse("OUTBOX_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            batch_size: 100,
            max_attempts: 5,
            poll_interval: Duration::from_millis(1000),
            log_level: "info".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = RelayConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        assert_eq!(env_parse::<u32>("OUTBOX_TEST_KEY_THAT_IS_NEVER_SET"), None);
    }
}

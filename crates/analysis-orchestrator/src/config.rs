use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Engine tuning, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Lifetime of every cached entry
    pub cache_ttl: Duration,
    /// Upper bound on a single storage fetch
    pub fetch_timeout: Duration,
    /// Calendar days of history pulled per symbol
    pub history_days: i64,
    /// `None` keeps the cache unbounded
    pub cache_max_entries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_millis(5000),
            history_days: 400,
            cache_max_entries: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("CACHE_TTL_SECS must be a whole number of seconds")?,
            ),
            fetch_timeout: Duration::from_millis(
                env::var("FETCH_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("FETCH_TIMEOUT_MS must be a whole number of milliseconds")?,
            ),
            history_days: env::var("HISTORY_DAYS")
                .unwrap_or_else(|_| "400".to_string())
                .parse()
                .context("HISTORY_DAYS must be an integer")?,
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("CACHE_MAX_ENTRIES must be a positive integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_days <= 0 {
            anyhow::bail!("HISTORY_DAYS must be positive, got {}", self.history_days);
        }
        if self.fetch_timeout.is_zero() {
            anyhow::bail!("FETCH_TIMEOUT_MS must be positive");
        }
        if self.cache_max_entries == Some(0) {
            anyhow::bail!("CACHE_MAX_ENTRIES must be positive when set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.history_days, 400);
    }

    #[test]
    fn test_rejects_non_positive_history() {
        let config = EngineConfig {
            history_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

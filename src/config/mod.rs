use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

pub mod providers;
pub mod cluster;
pub mod loader;

pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 15;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub request_timeout_secs: u64,
}

impl RefreshConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            request_timeout_secs: 30,
        }
    }
}

/// Exponential backoff applied to token issuance.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            initial_interval_ms: 500,
            multiplier: 2.0,
            max_interval_ms: 10_000,
            max_attempts: 3,
        }
    }
}

impl RetryConfig {
    /// Rejects settings under which the backoff would stop growing.
    pub fn validate(&self) -> Result<()> {
        if !(self.multiplier > 1.0 && self.multiplier.is_finite()) {
            return Err(Error::ConfigError(format!(
                "retry.multiplier must be a finite value above 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::ConfigError("retry.max_attempts must be at least 1".to_string()));
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(Error::ConfigError(format!(
                "retry.max_interval_ms ({}) is below retry.initial_interval_ms ({})",
                self.max_interval_ms, self.initial_interval_ms
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Parses a refresh interval given in minutes. Unset, non-numeric and zero
/// values fall back to the default.
pub fn parse_refresh_interval(raw: Option<&str>) -> Duration {
    let minutes = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_MINUTES);

    Duration::from_secs(minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_interval_defaults_when_unset_or_invalid() {
        let default = Duration::from_secs(15 * 60);
        assert_eq!(parse_refresh_interval(None), default);
        assert_eq!(parse_refresh_interval(Some("")), default);
        assert_eq!(parse_refresh_interval(Some("soon")), default);
        assert_eq!(parse_refresh_interval(Some("0")), default);
        assert_eq!(parse_refresh_interval(Some("-5")), default);
    }

    #[test]
    fn refresh_interval_is_read_in_minutes() {
        assert_eq!(parse_refresh_interval(Some("5")), Duration::from_secs(300));
        assert_eq!(parse_refresh_interval(Some(" 1 ")), Duration::from_secs(60));
    }
}

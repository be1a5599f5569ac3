//! Convergence polling configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Subscription activation probe, relative to the API base URL
    #[serde(default = "default_probe_path")]
    pub probe_path: String,

    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.probe_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("polling.probe_path"));
        }
        if self.interval_ms == 0 {
            return Err(ValidationError::ZeroInterval("polling.interval_ms"));
        }
        if self.interval_ms >= self.timeout_ms {
            return Err(ValidationError::IntervalExceedsTimeout);
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            probe_path: default_probe_path(),
            interval_ms: default_interval(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_probe_path() -> String {
    "/profile/check-premium-event".to_string()
}

fn default_interval() -> u64 {
    3_000
}

fn default_timeout() -> u64 {
    90_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollingConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.timeout(), Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_must_be_below_timeout() {
        let config = PollingConfig {
            interval_ms: 90_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::IntervalExceedsTimeout));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = PollingConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::ZeroInterval(_))));
    }
}

//! Notification push channel configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Push endpoint, relative to the API base URL
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// First reconnect delay after the stream drops
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the doubling reconnect delay
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay_ms: u64,

    /// Delay between an optimistic insert and the authoritative refetch
    #[serde(default = "default_refetch_delay")]
    pub refetch_delay_ms: u64,

    /// How long the "new activity" indicator stays lit
    #[serde(default = "default_activity_pulse")]
    pub activity_pulse_ms: u64,
}

impl NotificationsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn refetch_delay(&self) -> Duration {
        Duration::from_millis(self.refetch_delay_ms)
    }

    pub fn activity_pulse(&self) -> Duration {
        Duration::from_millis(self.activity_pulse_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.stream_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("notifications.stream_path"));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ValidationError::ZeroInterval("notifications.reconnect_delay_ms"));
        }
        if self.activity_pulse_ms == 0 {
            return Err(ValidationError::ZeroInterval("notifications.activity_pulse_ms"));
        }
        if self.reconnect_delay_ms > self.max_reconnect_delay_ms {
            return Err(ValidationError::InvalidReconnectBackoff);
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            stream_path: default_stream_path(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_delay_ms: default_max_reconnect_delay(),
            refetch_delay_ms: default_refetch_delay(),
            activity_pulse_ms: default_activity_pulse(),
        }
    }
}

fn default_stream_path() -> String {
    "/notifications/stream".to_string()
}

fn default_reconnect_delay() -> u64 {
    1_000
}

fn default_max_reconnect_delay() -> u64 {
    30_000
}

fn default_refetch_delay() -> u64 {
    500
}

fn default_activity_pulse() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NotificationsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.activity_pulse(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_floor_above_ceiling_is_rejected() {
        let config = NotificationsConfig {
            reconnect_delay_ms: 60_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidReconnectBackoff));
    }

    #[test]
    fn test_relative_stream_path_is_rejected() {
        let config = NotificationsConfig {
            stream_path: "notifications/stream".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

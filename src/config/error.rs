//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("API base URL must start with http:// or https://")]
    InvalidBaseUrl,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Interval must be greater than zero: {0}")]
    ZeroInterval(&'static str),

    #[error("Reconnect delay exceeds its maximum")]
    InvalidReconnectBackoff,

    #[error("Poll interval must be shorter than the poll timeout")]
    IntervalExceedsTimeout,

    #[error("Path must start with '/': {0}")]
    InvalidPath(&'static str),
}

//! Tracing subscriber bootstrap.
//!
//! # Invariants
//! - Initialization happens at most once per process; later calls are no-ops.
//! - `RUST_LOG`, when set, overrides the configured directive.

use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

static TRACING_INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors raised while installing the global subscriber
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("failed to install tracing subscriber: {0}")]
    InstallFailed(String),
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// # Errors
///
/// Returns `TelemetryError` if the filter directive does not parse or another
/// subscriber was installed outside this function.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    TRACING_INSTALLED
        .get_or_try_init(|| {
            let filter = build_filter(config)?;
            let builder = tracing_subscriber::fmt().with_env_filter(filter);

            let installed = if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            installed.map_err(|e| TelemetryError::InstallFailed(e.to_string()))?;

            info!(json = config.json, level = %config.level, "Tracing initialized");
            Ok(())
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "wardrobe_sync=verbose".to_string(),
            json: false,
        };
        assert!(matches!(
            build_filter(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}

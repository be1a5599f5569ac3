//! Client configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `WARDROBE_SYNC` prefix
//! and `__` between nested keys. Every section has working defaults, so an
//! empty environment yields a client pointed at a local development API.
//!
//! # Example
//!
//! ```no_run
//! use wardrobe_sync::config::ClientConfig;
//!
//! let config = ClientConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("API at {}", config.api.base_url);
//! ```

mod api;
mod error;
mod logging;
mod notifications;
mod persistence;
mod polling;

pub use api::ApiConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use notifications::NotificationsConfig;
pub use persistence::PersistenceConfig;
pub use polling::PollingConfig;

use serde::Deserialize;

/// Root client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Wardrobe API location and request timeout
    #[serde(default)]
    pub api: ApiConfig,

    /// Where session records are kept
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Push channel tuning
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Convergence polling tuning
    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `WARDROBE_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `WARDROBE_SYNC__API__BASE_URL=https://...` -> `api.base_url`
    /// - `WARDROBE_SYNC__POLLING__TIMEOUT_MS=60000` -> `polling.timeout_ms`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("WARDROBE_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api.validate()?;
        self.persistence.validate()?;
        self.notifications.validate()?;
        self.polling.validate()?;
        Ok(())
    }
}

//! Session Store Port - Durable local session records.
//!
//! Two independently keyed records: the remembered identity (fast first
//! paint) and the overlay bundle. Both survive a restart and are restored
//! verbatim.

use async_trait::async_trait;

use crate::domain::session::{PersistedOverlayBundle, RememberedIdentity};

/// Errors that can occur while reading or writing session records
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Failed to serialize record: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize record: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the remembered identity, if one was saved.
    async fn load_remembered(&self) -> Result<Option<RememberedIdentity>, SessionStoreError>;

    async fn save_remembered(&self, record: &RememberedIdentity) -> Result<(), SessionStoreError>;

    /// Remove the remembered identity. Missing records are not an error.
    async fn clear_remembered(&self) -> Result<(), SessionStoreError>;

    /// Load the overlay bundle, if one was saved.
    async fn load_overlay(&self) -> Result<Option<PersistedOverlayBundle>, SessionStoreError>;

    async fn save_overlay(&self, bundle: &PersistedOverlayBundle) -> Result<(), SessionStoreError>;

    /// Remove the overlay bundle. Missing records are not an error.
    async fn clear_overlay(&self) -> Result<(), SessionStoreError>;
}

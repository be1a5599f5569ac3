//! In-Memory Session Store Adapter
//!
//! Holds session records in memory. Useful for testing and for clients
//! that should not persist anything.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::session::{PersistedOverlayBundle, RememberedIdentity};
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Debug, Default)]
struct Records {
    remembered: Option<RememberedIdentity>,
    overlay: Option<PersistedOverlayBundle>,
}

/// In-memory storage for session records
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<Records>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if either record is present
    pub async fn has_any(&self) -> bool {
        let records = self.records.read().await;
        records.remembered.is_some() || records.overlay.is_some()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_remembered(&self) -> Result<Option<RememberedIdentity>, SessionStoreError> {
        Ok(self.records.read().await.remembered.clone())
    }

    async fn save_remembered(&self, record: &RememberedIdentity) -> Result<(), SessionStoreError> {
        self.records.write().await.remembered = Some(record.clone());
        Ok(())
    }

    async fn clear_remembered(&self) -> Result<(), SessionStoreError> {
        self.records.write().await.remembered = None;
        Ok(())
    }

    async fn load_overlay(&self) -> Result<Option<PersistedOverlayBundle>, SessionStoreError> {
        Ok(self.records.read().await.overlay.clone())
    }

    async fn save_overlay(&self, bundle: &PersistedOverlayBundle) -> Result<(), SessionStoreError> {
        self.records.write().await.overlay = Some(bundle.clone());
        Ok(())
    }

    async fn clear_overlay(&self) -> Result<(), SessionStoreError> {
        self.records.write().await.overlay = None;
        Ok(())
    }
}

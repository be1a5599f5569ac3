//! File-based Session Store Adapter
//!
//! Keeps each session record in its own YAML file under a state directory:
//!
//! ```text
//! <state_dir>/remembered_identity.yaml
//! <state_dir>/overlay_bundle.yaml
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::session::{PersistedOverlayBundle, RememberedIdentity};
use crate::ports::{SessionStore, SessionStoreError};

const REMEMBERED_FILE: &str = "remembered_identity.yaml";
const OVERLAY_FILE: &str = "overlay_bundle.yaml";

/// File-based storage for session records
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `base_path`. The directory is created on
    /// first write.
    ///
    /// # Example
    /// ```ignore
    /// let store = FileSessionStore::new("./.wardrobe-sync");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn remembered_path(&self) -> PathBuf {
        self.base_path.join(REMEMBERED_FILE)
    }

    fn overlay_path(&self) -> PathBuf {
        self.base_path.join(OVERLAY_FILE)
    }

    async fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SessionStoreError> {
        let yaml = match fs::read_to_string(path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        serde_yaml::from_str(&yaml)
            .map(Some)
            .map_err(|e| SessionStoreError::DeserializationFailed(e.to_string()))
    }

    async fn write<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;

        let yaml = serde_yaml::to_string(record)
            .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;

        fs::write(path, yaml)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }

    async fn remove(path: &Path) -> Result<(), SessionStoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::IoError(e.to_string())),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load_remembered(&self) -> Result<Option<RememberedIdentity>, SessionStoreError> {
        Self::read(&self.remembered_path()).await
    }

    async fn save_remembered(&self, record: &RememberedIdentity) -> Result<(), SessionStoreError> {
        self.write(&self.remembered_path(), record).await
    }

    async fn clear_remembered(&self) -> Result<(), SessionStoreError> {
        Self::remove(&self.remembered_path()).await
    }

    async fn load_overlay(&self) -> Result<Option<PersistedOverlayBundle>, SessionStoreError> {
        Self::read(&self.overlay_path()).await
    }

    async fn save_overlay(&self, bundle: &PersistedOverlayBundle) -> Result<(), SessionStoreError> {
        self.write(&self.overlay_path(), bundle).await
    }

    async fn clear_overlay(&self) -> Result<(), SessionStoreError> {
        Self::remove(&self.overlay_path()).await
    }
}

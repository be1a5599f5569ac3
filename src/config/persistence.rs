//! Local persistence configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the remembered identity and overlay bundle.
    /// When unset, session records are kept in memory only.
    pub state_dir: Option<PathBuf>,
}

impl PersistenceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.state_dir {
            Some(dir) if dir.as_os_str().is_empty() => {
                Err(ValidationError::MissingRequired("persistence.state_dir"))
            }
            _ => Ok(()),
        }
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::triggers::{TriggerConfig, TriggerError, TriggerStore};

/// Simple JSON file store for the trigger registry.
pub struct TriggerFileStore {
    path: PathBuf,
}

impl TriggerFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn store_error(e: impl std::fmt::Display) -> TriggerError {
    TriggerError::Store(e.to_string())
}

#[async_trait]
impl TriggerStore for TriggerFileStore {
    async fn load(&self) -> Result<TriggerConfig, TriggerError> {
        if !self.path.exists() {
            return Ok(TriggerConfig::default());
        }

        let text = fs::read_to_string(&self.path).await.map_err(store_error)?;
        serde_json::from_str(&text)
            .map_err(|e| TriggerError::Store(format!("{}: {e}", self.path.display())))
    }

    async fn save(&self, config: &TriggerConfig) -> Result<(), TriggerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(store_error)?;
        }

        let text = serde_json::to_string_pretty(config).map_err(store_error)?;
        fs::write(&self.path, text).await.map_err(store_error)
    }
}

//! Archive persistence — the document list as JSON under a single key.
//!
//! Loading never fails: missing, unreadable or unparseable data falls back
//! to the built-in default archive.

use std::rc::Rc;
use archive_types::{
    Result,
    config::{ArchiveConfig, CONFIG_STORAGE_KEY},
    document::Document,
};
use crate::defaults::default_documents;
use crate::ports::StoragePort;

#[derive(Clone)]
pub struct ArchivePersistence {
    storage: Rc<dyn StoragePort>,
    key: String,
}

impl ArchivePersistence {
    pub fn new(storage: Rc<dyn StoragePort>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn load(&self) -> Vec<Document> {
        let data = match self.storage.get(&self.key).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                log::info!("No saved archive under {}, using defaults", self.key);
                return default_documents();
            }
            Err(e) => {
                log::warn!("Failed to read archive ({}), using defaults", e);
                return default_documents();
            }
        };

        match serde_json::from_slice::<Vec<Document>>(&data) {
            Ok(docs) => {
                log::info!("Archive restored from {} ({} documents)", self.storage.backend_name(), docs.len());
                docs
            }
            Err(e) => {
                log::warn!("Saved archive is unreadable ({}), using defaults", e);
                default_documents()
            }
        }
    }

    pub async fn save(&self, documents: &[Document]) -> Result<()> {
        let json = serde_json::to_vec(documents)?;
        self.storage.set(&self.key, &json).await
    }
}

/// Restore the saved configuration, if any.
pub async fn load_config(storage: &dyn StoragePort) -> Option<ArchiveConfig> {
    match storage.get(CONFIG_STORAGE_KEY).await {
        Ok(Some(data)) => match serde_json::from_slice::<ArchiveConfig>(&data) {
            Ok(config) => {
                log::info!("Config restored from storage");
                Some(config.normalized())
            }
            Err(e) => {
                log::warn!("Saved config is unreadable ({}), ignoring", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("Failed to read config: {}", e);
            None
        }
    }
}

pub async fn save_config(storage: &dyn StoragePort, config: &ArchiveConfig) -> Result<()> {
    let json = serde_json::to_vec(config)?;
    storage.set(CONFIG_STORAGE_KEY, &json).await
}

//! Runtime wiring helpers
//!
//! Builds a `LeadStore` from configuration so binaries do not have to know
//! about individual backends.

use std::sync::Arc;

use configs::{StorageBackend, StorageConfig};
use tracing::info;

use crate::errors::ServiceError;
use crate::leads::LeadStore;
use crate::storage::{JsonFileKv, MemoryKv};

/// Open the lead store described by `cfg`, creating the data directory for
/// the file backend when needed.
pub async fn open_lead_store(cfg: &StorageConfig) -> Result<LeadStore, ServiceError> {
    let store = match cfg.backend {
        StorageBackend::File => {
            common::env::ensure_data_dir(&cfg.data_dir)
                .await
                .map_err(|e| ServiceError::storage("prepare data dir", e))?;
            let kv = JsonFileKv::new(cfg.file_path()).await?;
            info!(path = %kv.path().display(), "using file-backed lead storage");
            LeadStore::with_key(kv, cfg.leads_key.clone())
        }
        StorageBackend::Memory => LeadStore::with_key(Arc::new(MemoryKv::new()), cfg.leads_key.clone()),
        StorageBackend::Disabled => LeadStore::detached(),
    };
    info!(event = "store_opened", backend = %cfg.backend, key = %store.key(), persistent = store.is_persistent(), "lead store ready");
    Ok(store)
}

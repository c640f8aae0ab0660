use std::{collections::HashMap, path::{Path, PathBuf}, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;

/// JSON file-backed key-value store.
///
/// Keeps a `key -> raw string` map in memory and rewrites the whole file on
/// every change, the way browser local storage keeps one string per key.
/// Intended for a single process; two processes sharing a file overwrite each
/// other.
#[derive(Clone)]
pub struct JsonFileKv {
    inner: Arc<RwLock<HashMap<String, String>>>,
    file_path: PathBuf,
}

impl JsonFileKv {
    /// Open the store at `path`. Creates the file with an empty map if missing.
    /// A file that does not hold a JSON string map is logged and treated as empty;
    /// it is replaced on the next write.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ServiceError::storage("create data dir", e))?;
            }
        }

        let map: HashMap<String, String> = match fs::read(&file_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "storage file is not a JSON string map; starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty: HashMap<String, String> = HashMap::new();
                fs::write(&file_path, serde_json::to_vec(&empty)?)
                    .await
                    .map_err(|e| ServiceError::storage("create storage file", e))?;
                debug!(path = %file_path.display(), "created empty storage file");
                empty
            }
            Err(e) => return Err(ServiceError::storage("read storage file", e)),
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Memory is only updated after this succeeds, so it never holds state
    /// the file does not.
    async fn save(&self, map: &HashMap<String, String>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(map)?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::storage("write storage file", e))
    }
}

#[async_trait::async_trait]
impl KvBackend for JsonFileKv {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        next.insert(key.to_string(), value);
        self.save(&next).await?;
        *map = next;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        if !map.contains_key(key) {
            return Ok(false);
        }
        let mut next = map.clone();
        next.remove(key);
        self.save(&next).await?;
        *map = next;
        Ok(true)
    }
}

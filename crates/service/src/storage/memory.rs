use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;

/// In-process key-value backend.
#[derive(Default)]
pub struct MemoryKv {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KvBackend for MemoryKv {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.inner.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError> {
        Ok(self.inner.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_kv_get_set_remove() -> Result<(), anyhow::Error> {
        let kv = MemoryKv::new();
        assert!(kv.is_empty().await);
        assert_eq!(kv.get_item("k").await?, None);

        kv.set_item("k", "v1".into()).await?;
        kv.set_item("k", "v2".into()).await?;
        assert_eq!(kv.get_item("k").await?.as_deref(), Some("v2"));
        assert_eq!(kv.len().await, 1);

        assert!(kv.remove_item("k").await?);
        assert!(!kv.remove_item("k").await?);
        assert!(kv.is_empty().await);
        Ok(())
    }
}

use crate::errors::ServiceError;
use async_trait::async_trait;

/// Trait abstraction for the key-value store holding the lead slot.
/// Implementations can be in-memory, file-backed, or remote KV.
/// Each call is atomic on its own; nothing spans a get followed by a set.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError>;
    /// Returns whether the key existed.
    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError>;
}

//! No-op backend — disables persistent memory entirely.

use async_trait::async_trait;
use vera_core::error::MemoryError;
use vera_core::memory::KvStore;

/// A no-op store that remembers nothing.
pub struct NoopMemory;

#[async_trait]
impl KvStore for NoopMemory {
    fn name(&self) -> &str { "none" }

    async fn get(&self, _collection: &str, _key: &str) -> Result<Option<serde_json::Value>, MemoryError> {
        Ok(None)
    }

    async fn set(&self, _collection: &str, _key: &str, _value: serde_json::Value) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn delete(&self, _collection: &str, _key: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }
}

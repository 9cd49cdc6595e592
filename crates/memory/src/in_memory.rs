//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use vera_core::error::MemoryError;
use vera_core::memory::KvStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory key-value store keyed by `(collection, key)`.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone)]
pub struct InMemoryBackend {
    entries: Arc<RwLock<HashMap<(String, String), serde_json::Value>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored values across all collections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(collection.to_string(), key.to_string())).cloned())
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), MemoryError> {
        self.entries
            .write()
            .await
            .insert((collection.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, MemoryError> {
        let removed = self
            .entries
            .write()
            .await
            .remove(&(collection.to_string(), key.to_string()));
        Ok(removed.is_some())
    }
}

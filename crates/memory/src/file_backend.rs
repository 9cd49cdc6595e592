//! File-based backend — persistent JSON-lines storage.
//!
//! Each line is one `{"collection", "key", "value"}` object. The whole file is
//! loaded on creation and rewritten on every mutation (set, delete), which
//! keeps reads fast and the file human-inspectable.
//!
//! Storage location: `~/.vera/memory/kv.jsonl`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vera_core::error::MemoryError;
use vera_core::memory::KvStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type Entries = BTreeMap<(String, String), serde_json::Value>;

#[derive(Serialize, Deserialize)]
struct Line {
    collection: String,
    key: String,
    value: serde_json::Value,
}

/// A file-backed key-value store using JSONL (one JSON object per line).
pub struct FileBackend {
    path: PathBuf,
    entries: Arc<RwLock<Entries>>,
}

impl FileBackend {
    /// Create a new file-based backend at the given path.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory backend loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Load entries from a JSONL file. Later lines win for duplicate keys.
    fn load_from_disk(path: &PathBuf) -> Entries {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Entries::new(), // File doesn't exist yet — start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Line>(line) {
                Ok(l) => Some(((l.collection, l.key), l.value)),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory line");
                    None
                }
            })
            .collect()
    }

    /// Flush all entries to disk as JSONL.
    async fn flush(&self) -> Result<(), MemoryError> {
        let entries = self.entries.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for ((collection, key), value) in entries.iter() {
            let line = serde_json::to_string(&Line {
                collection: collection.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize memory line: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content).map_err(|e| {
            MemoryError::Storage(format!("Failed to write memory file: {e}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

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
        self.flush().await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, MemoryError> {
        let removed = self
            .entries
            .write()
            .await
            .remove(&(collection.to_string(), key.to_string()))
            .is_some();
        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp); // Close file so backend can use it
        path
    }

    #[tokio::test]
    async fn set_persists_across_reload() {
        let path = temp_path();

        let kv = FileBackend::new(path.clone());
        kv.set("vera:people", "s1:u1", json!({"userName": "alice"}))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("alice"));

        let reloaded = FileBackend::new(path);
        let value = reloaded.get("vera:people", "s1:u1").await.unwrap().unwrap();
        assert_eq!(value["userName"], "alice");
    }

    #[tokio::test]
    async fn delete_persists_across_reload() {
        let path = temp_path();

        let kv = FileBackend::new(path.clone());
        kv.set("c", "a", json!(1)).await.unwrap();
        kv.set("c", "b", json!(2)).await.unwrap();
        assert!(kv.delete("c", "a").await.unwrap());

        let reloaded = FileBackend::new(path);
        assert!(reloaded.get("c", "a").await.unwrap().is_none());
        assert_eq!(reloaded.get("c", "b").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn corrupted_lines_are_skipped() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"collection":"c","key":"ok","value":"fine"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp).unwrap();

        let kv = FileBackend::new(tmp.path().to_path_buf());
        assert_eq!(kv.get("c", "ok").await.unwrap(), Some(json!("fine")));
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.jsonl");

        let kv = FileBackend::new(path.clone());
        kv.set("c", "k", json!(true)).await.unwrap();
        assert!(path.exists());
    }
}

//! Memory types and the key-value persistence trait.
//!
//! Vera remembers two things:
//! - one [`PersonMemory`] per (server, user) — the latest state of a person
//! - a rolling log of [`MemoryRecord`]s per server — recent messages and the
//!   knowledge extracted from them
//!
//! Both are persisted through a [`KvStore`], addressed by
//! `(collection, key)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::knowledge::KnowledgeTriple;
use crate::text::truncate_content;

/// The latest known state of one user on one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMemory {
    pub user_id: String,

    pub server_id: String,

    #[serde(default)]
    pub user_name: String,

    /// When the user last sent a message
    pub last_seen_iso: DateTime<Utc>,

    /// The user's most recent message, truncated
    #[serde(default)]
    pub last_message: String,

    /// Free-form notes. Carried forward on every write, never produced by
    /// the pipeline itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One processed message in a server's rolling log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Creation time in epoch milliseconds. Not guaranteed unique.
    pub id: String,

    pub server_id: String,

    pub user_id: String,

    #[serde(default)]
    pub user_name: String,

    /// The message text, truncated
    pub message: String,

    #[serde(default)]
    pub knowledge: Vec<KnowledgeTriple>,

    pub created_at_iso: DateTime<Utc>,
}

impl MemoryRecord {
    /// A record stamped with the current time. The message is truncated.
    pub fn now(
        server_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        message: &str,
        knowledge: Vec<KnowledgeTriple>,
    ) -> Self {
        let created_at_iso = Utc::now();
        Self {
            id: created_at_iso.timestamp_millis().to_string(),
            server_id: server_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            message: truncate_content(message),
            knowledge,
            created_at_iso,
        }
    }
}

/// Key-value persistence for structured values.
///
/// Implementations: in-memory map (default, tests), JSON-lines file, none.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "file", "none").
    fn name(&self) -> &str;

    /// Read a value. `Ok(None)` when the key does not exist.
    async fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> std::result::Result<Option<serde_json::Value>, MemoryError>;

    /// Write (replace) a value.
    async fn set(
        &self,
        collection: &str,
        key: &str,
        value: serde_json::Value,
    ) -> std::result::Result<(), MemoryError>;

    /// Delete a value. Returns whether something was removed.
    async fn delete(&self, collection: &str, key: &str) -> std::result::Result<bool, MemoryError>;
}

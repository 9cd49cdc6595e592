//! Person profiles and per-server rolling logs on top of a [`KvStore`].
//!
//! Storage failures never escape this type: reads degrade to "absent",
//! writes are logged and dropped.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use vera_core::error::MemoryError;
use vera_core::memory::{KvStore, MemoryRecord, PersonMemory};
use vera_core::text::{truncate_chars, truncate_content};

/// Collection holding one [`PersonMemory`] per `<serverId>:<userId>`.
pub const PEOPLE_COLLECTION: &str = "vera:people";
/// Collection holding one rolling log per `<serverId>:recent`.
pub const MEMORIES_COLLECTION: &str = "vera:memories";
/// Records kept per server; older ones are evicted first.
pub const MAX_RECORDS: usize = 50;
/// Characters of the last message kept on a profile.
pub const PROFILE_MESSAGE_CHARS: usize = 500;
/// Records returned by [`MemoryStore::recent`] when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

fn person_key(server_id: &str, user_id: &str) -> String {
    format!("{server_id}:{user_id}")
}

fn recent_key(server_id: &str) -> String {
    format!("{server_id}:recent")
}

/// Memory of people and recent messages, shared across requests.
#[derive(Clone)]
pub struct MemoryStore {
    kv: Arc<dyn KvStore>,
}

impl MemoryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The underlying backend name.
    pub fn backend(&self) -> &str {
        self.kv.name()
    }

    /// The stored profile, or `None` on miss or any read/decode failure.
    pub async fn get_profile(&self, server_id: &str, user_id: &str) -> Option<PersonMemory> {
        let key = person_key(server_id, user_id);
        let value = match self.kv.get(PEOPLE_COLLECTION, &key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read person memory");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(person) => Some(person),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable person memory");
                None
            }
        }
    }

    /// Replace the profile with the latest message, carrying `notes` forward
    /// from `previous`. The new profile is returned even if it could not be
    /// persisted.
    pub async fn upsert_profile(
        &self,
        server_id: &str,
        user_id: &str,
        user_name: &str,
        last_message: &str,
        previous: Option<&PersonMemory>,
    ) -> PersonMemory {
        let person = PersonMemory {
            user_id: user_id.to_string(),
            server_id: server_id.to_string(),
            user_name: user_name.to_string(),
            last_seen_iso: Utc::now(),
            last_message: truncate_chars(&truncate_content(last_message), PROFILE_MESSAGE_CHARS),
            notes: previous.and_then(|p| p.notes.clone()),
        };

        let key = person_key(server_id, user_id);
        if let Err(e) = self.write(PEOPLE_COLLECTION, &key, &person).await {
            warn!(key = %key, error = %e, "Failed to persist person memory");
        }
        person
    }

    /// Append a record to its server's log, keeping the newest [`MAX_RECORDS`].
    ///
    /// Read-modify-write without locking: concurrent appends for the same
    /// server can lose one another.
    pub async fn append_record(&self, record: MemoryRecord) {
        let key = recent_key(&record.server_id);
        let mut records = self.read_log(&key).await;
        records.push(record);
        if records.len() > MAX_RECORDS {
            let excess = records.len() - MAX_RECORDS;
            records.drain(..excess);
        }

        match self.write(MEMORIES_COLLECTION, &key, &records).await {
            Ok(()) => debug!(key = %key, count = records.len(), "Memory record appended"),
            Err(e) => warn!(key = %key, error = %e, "Failed to persist memory record"),
        }
    }

    /// The newest `limit` records of a server, oldest first, optionally
    /// filtered to one user.
    pub async fn recent(
        &self,
        server_id: &str,
        user_id: Option<&str>,
        limit: usize,
    ) -> Vec<MemoryRecord> {
        let mut records = self.read_log(&recent_key(server_id)).await;
        if let Some(user_id) = user_id {
            records.retain(|r| r.user_id == user_id);
        }
        let start = records.len().saturating_sub(limit);
        records.split_off(start)
    }

    /// Delete a person's profile. Returns whether one existed.
    pub async fn forget_profile(&self, server_id: &str, user_id: &str) -> Result<bool, MemoryError> {
        self.kv
            .delete(PEOPLE_COLLECTION, &person_key(server_id, user_id))
            .await
    }

    /// Delete a server's rolling log. Returns whether one existed.
    pub async fn clear_recent(&self, server_id: &str) -> Result<bool, MemoryError> {
        self.kv
            .delete(MEMORIES_COLLECTION, &recent_key(server_id))
            .await
    }

    async fn read_log(&self, key: &str) -> Vec<MemoryRecord> {
        let value = match self.kv.get(MEMORIES_COLLECTION, key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read memory log");
                return Vec::new();
            }
        };

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Discarding unreadable memory log");
            Vec::new()
        })
    }

    async fn write<T: serde::Serialize>(
        &self,
        collection: &str,
        key: &str,
        value: &T,
    ) -> Result<(), MemoryError> {
        let value = serde_json::to_value(value).map_err(|e| MemoryError::Corrupted {
            collection: collection.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set(collection, key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;
    use async_trait::async_trait;
    use serde_json::json;
    use vera_core::KnowledgeTriple;

    fn store() -> (MemoryStore, InMemoryBackend) {
        let kv = InMemoryBackend::new();
        (MemoryStore::new(Arc::new(kv.clone())), kv)
    }

    fn record(server: &str, user: &str, message: &str) -> MemoryRecord {
        MemoryRecord::now(server, user, user, message, Vec::new())
    }

    /// A backend whose every call fails.
    struct BrokenKv;

    #[async_trait]
    impl KvStore for BrokenKv {
        fn name(&self) -> &str {
            "broken"
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<serde_json::Value>, MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn set(&self, _: &str, _: &str, _: serde_json::Value) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<bool, MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let (store, _) = store();
        assert!(store.get_profile("s1", "u1").await.is_none());

        store.upsert_profile("s1", "u1", "alice", "hello there", None).await;
        let person = store.get_profile("s1", "u1").await.unwrap();
        assert_eq!(person.user_name, "alice");
        assert_eq!(person.last_message, "hello there");
    }

    #[tokio::test]
    async fn notes_are_carried_forward() {
        let (store, _) = store();
        let mut previous = store.upsert_profile("s1", "u1", "alice", "first", None).await;
        previous.notes = Some("likes tea".into());

        let updated = store
            .upsert_profile("s1", "u1", "alice", "second", Some(&previous))
            .await;
        assert_eq!(updated.notes.as_deref(), Some("likes tea"));
        assert_eq!(updated.last_message, "second");
        assert_eq!(
            store.get_profile("s1", "u1").await.unwrap().notes.as_deref(),
            Some("likes tea")
        );
    }

    #[tokio::test]
    async fn profile_message_is_capped() {
        let (store, _) = store();
        let long = "z".repeat(2_000);
        let person = store.upsert_profile("s1", "u1", "alice", &long, None).await;
        assert_eq!(person.last_message.chars().count(), PROFILE_MESSAGE_CHARS);
    }

    #[tokio::test]
    async fn corrupted_profile_reads_as_absent() {
        let (store, kv) = store();
        kv.set(PEOPLE_COLLECTION, "s1:u1", json!({"unexpected": true}))
            .await
            .unwrap();
        assert!(store.get_profile("s1", "u1").await.is_none());
    }

    #[tokio::test]
    async fn fifty_one_appends_keep_the_last_fifty() {
        let (store, _) = store();
        for i in 1..=51 {
            store.append_record(record("s1", "u1", &format!("m{i}"))).await;
        }
        let all = store.recent("s1", None, 100).await;
        assert_eq!(all.len(), MAX_RECORDS);
        assert_eq!(all.first().unwrap().message, "m2");
        assert_eq!(all.last().unwrap().message, "m51");
    }

    #[tokio::test]
    async fn recent_filters_by_user_and_keeps_order() {
        let (store, _) = store();
        for (user, msg) in [("u1", "a"), ("u2", "b"), ("u1", "c"), ("u1", "d"), ("u2", "e")] {
            store.append_record(record("s1", user, msg)).await;
        }

        let mine: Vec<_> = store
            .recent("s1", Some("u1"), 2)
            .await
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(mine, vec!["c", "d"]);

        let everyone = store.recent("s1", None, DEFAULT_RECENT_LIMIT).await;
        assert_eq!(everyone.len(), 5);
        assert!(store.recent("other", None, 5).await.is_empty());
    }

    #[tokio::test]
    async fn records_keep_their_knowledge() {
        let (store, _) = store();
        let triple = KnowledgeTriple::new("alice", "likes", "rust");
        store
            .append_record(MemoryRecord::now("s1", "u1", "alice", "I like rust", vec![triple.clone()]))
            .await;
        let recent = store.recent("s1", Some("u1"), 5).await;
        assert_eq!(recent[0].knowledge, vec![triple]);
    }

    #[tokio::test]
    async fn forget_and_clear() {
        let (store, _) = store();
        store.upsert_profile("s1", "u1", "alice", "hi", None).await;
        store.append_record(record("s1", "u1", "hi")).await;

        assert!(store.forget_profile("s1", "u1").await.unwrap());
        assert!(store.get_profile("s1", "u1").await.is_none());
        assert!(store.clear_recent("s1").await.unwrap());
        assert!(store.recent("s1", None, 5).await.is_empty());
        assert!(!store.clear_recent("s1").await.unwrap());
    }

    #[tokio::test]
    async fn failing_backend_degrades_gracefully() {
        let store = MemoryStore::new(Arc::new(BrokenKv));
        assert!(store.get_profile("s1", "u1").await.is_none());

        let person = store.upsert_profile("s1", "u1", "alice", "hi", None).await;
        assert_eq!(person.last_message, "hi");

        store.append_record(record("s1", "u1", "hi")).await;
        assert!(store.recent("s1", None, 5).await.is_empty());
        assert!(store.forget_profile("s1", "u1").await.is_err());
    }
}

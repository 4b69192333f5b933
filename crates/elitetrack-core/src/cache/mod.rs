//! Durable last-known-good snapshots of the local collections.
//!
//! The [`DurableCache`] is a plain key → blob store. [`LocalStateStore`] sits on
//! top of it and (de)serializes whole collections as JSON, one key per
//! collection. The snapshot is only read when the gateway is unreachable or
//! unconfigured; the controller writes through after every local change.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::{error::Result, reconcile::Collection};

mod sqlite;

pub use sqlite::SqliteCache;

/// Key under which the project collection is cached.
pub const PROJECTS_KEY: &str = "elitetrack.projects";
/// Key under which the conversation collection is cached.
pub const CONVERSATIONS_KEY: &str = "elitetrack.conversations";
/// Key under which the message collection is cached.
pub const MESSAGES_KEY: &str = "elitetrack.messages";
/// Key under which the quote collection is cached.
pub const QUOTES_KEY: &str = "elitetrack.quotes";

/// Whole-object key/value storage surviving restarts.
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, blob: String) -> Result<()>;
}

/// Volatile cache for tests and cache-less sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), blob);
        Ok(())
    }
}

/// Typed access to cached collections.
#[derive(Clone)]
pub struct LocalStateStore {
    cache: Arc<dyn DurableCache>,
}

impl LocalStateStore {
    pub fn new(cache: Arc<dyn DurableCache>) -> Self {
        Self { cache }
    }

    /// Loads the collection cached under `key`, if any.
    pub async fn load<R: DeserializeOwned>(&self, key: &str) -> Result<Option<Collection<R>>> {
        match self.cache.get(key).await? {
            Some(blob) => {
                let collection: Collection<R> = serde_json::from_str(&blob)?;
                debug!("loaded {} cached records from {key}", collection.len());
                Ok(Some(collection))
            }
            None => Ok(None),
        }
    }

    /// Replaces the snapshot under `key` with `collection`.
    pub async fn store<R: Serialize>(&self, key: &str, collection: &Collection<R>) -> Result<()> {
        let blob = serde_json::to_string(collection)?;
        self.cache.set(key, blob).await
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::models::{ConversationRecord, RecordId};

    fn conversation(id: &str) -> ConversationRecord {
        ConversationRecord {
            id: RecordId::new(id),
            project_id: RecordId::new("prj_1"),
            participants: vec![RecordId::new("cli_1")],
            created_at: Timestamp::from_second(1_700_000_000).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_store_and_load_collection() {
        let store = LocalStateStore::new(Arc::new(MemoryCache::new()));
        let missing: Option<Collection<ConversationRecord>> =
            store.load(CONVERSATIONS_KEY).await.unwrap();
        assert!(missing.is_none());

        let coll = Collection::new(vec![conversation("cnv_1"), conversation("cnv_2")]);
        store.store(CONVERSATIONS_KEY, &coll).await.unwrap();
        let loaded: Collection<ConversationRecord> =
            store.load(CONVERSATIONS_KEY).await.unwrap().unwrap();
        assert_eq!(loaded, coll);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_a_serialization_error() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(QUOTES_KEY, "{not json".to_string()).await.unwrap();
        let store = LocalStateStore::new(cache);
        let result = store
            .load::<crate::models::QuoteRecord>(QUOTES_KEY)
            .await;
        assert!(matches!(
            result,
            Err(crate::error::TrackerError::Serialization { .. })
        ));
    }
}

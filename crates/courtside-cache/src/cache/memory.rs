//! Process-local store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::CacheResult;
use crate::key::ResourceKey;
use crate::types::Payload;

use super::{ArtifactStore, CacheEntry};

/// Non-durable store; entries are swapped whole under a write lock.
///
/// The map lock is taken only for a single insert or lookup and never across
/// an await, and entries are built before it is taken. Writes to different
/// keys therefore wait on each other for one hash map operation at most.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<ResourceKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn get(&self, key: &ResourceKey) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &ResourceKey, payload: Payload) -> CacheResult<CacheEntry> {
        let entry = CacheEntry::new(key.clone(), payload, Utc::now())?;
        self.entries
            .write()
            .await
            .insert(key.clone(), entry.clone());
        Ok(entry)
    }

    async fn seed(&self, entry: CacheEntry) -> CacheResult<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.key) {
            return Ok(false);
        }
        entries.insert(entry.key.clone(), entry);
        Ok(true)
    }

    async fn list(&self) -> CacheResult<Vec<(ResourceKey, DateTime<Utc>)>> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .map(|entry| (entry.key.clone(), entry.fetched_at))
            .collect())
    }
}

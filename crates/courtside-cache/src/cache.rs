//! Artifact store.
//!
//! Every entry carries its own `fetched_at`; there is no separate freshness
//! marker. The file store keeps one file per key so payload and timestamp are
//! replaced together.
//!
//! # Store Structure
//!
//! ```text
//! ~/.cache/courtside/{class}/{id | _}/
//!   entry.json       # key, fetched_at, digest, payload
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::key::ResourceKey;
use crate::lock::KeyLocks;
use crate::types::Payload;

mod io;
mod memory;
mod paths;
mod read;
mod write;

pub use memory::MemoryStore;

/// One cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ResourceKey,

    pub payload: Payload,

    /// Time of the last successful fresh fetch (not the last read).
    pub fetched_at: DateTime<Utc>,

    /// sha256 of the serialized payload.
    pub digest: String,
}

impl CacheEntry {
    pub fn new(key: ResourceKey, payload: Payload, fetched_at: DateTime<Utc>) -> CacheResult<Self> {
        let json = serde_json::to_string(&payload).map_err(|e| {
            CacheError::store(&key, format!("failed to serialize payload: {}", e))
        })?;
        Ok(Self {
            digest: io::sha256_hex(json.as_bytes()),
            key,
            payload,
            fetched_at,
        })
    }

    /// Elapsed time since `fetched_at`.
    pub fn age(&self) -> Duration {
        age_since(self.fetched_at, Utc::now())
    }
}

/// Timestamps in the future count as age zero.
pub(crate) fn age_since(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - fetched_at).to_std().unwrap_or(Duration::ZERO)
}

/// Key → artifact persistence.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Most recently written entry, or `None`. A missing key is not an error.
    async fn get(&self, key: &ResourceKey) -> CacheResult<Option<CacheEntry>>;

    /// Persist `payload`, stamping `fetched_at` with the current time.
    async fn put(&self, key: &ResourceKey, payload: Payload) -> CacheResult<CacheEntry>;

    /// Write a pre-built entry only if the key has none. Returns whether it was written.
    async fn seed(&self, entry: CacheEntry) -> CacheResult<bool>;

    /// Every stored key with its `fetched_at`.
    async fn list(&self) -> CacheResult<Vec<(ResourceKey, DateTime<Utc>)>>;

    /// Elapsed time since the entry's `fetched_at`.
    async fn age_of(&self, key: &ResourceKey) -> CacheResult<Option<Duration>> {
        Ok(self.get(key).await?.map(|entry| entry.age()))
    }
}

/// Durable store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    writes: KeyLocks,
}

impl FileStore {
    /// Store at the default location.
    ///
    /// Default: `~/.cache/courtside`
    pub fn new() -> CacheResult<Self> {
        Ok(Self::with_dir(io::default_store_dir()?))
    }

    /// Store at a custom directory.
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writes: KeyLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &ResourceKey) -> PathBuf {
        paths::entry_path(&self.root, key)
    }
}

#[async_trait]
impl ArtifactStore for FileStore {
    async fn get(&self, key: &ResourceKey) -> CacheResult<Option<CacheEntry>> {
        read::get_impl(self, key).await
    }

    async fn put(&self, key: &ResourceKey, payload: Payload) -> CacheResult<CacheEntry> {
        let entry = CacheEntry::new(key.clone(), payload, Utc::now())?;
        let _guard = self.writes.acquire(key).await;
        write::write_entry(self, &entry).await?;
        Ok(entry)
    }

    async fn seed(&self, entry: CacheEntry) -> CacheResult<bool> {
        let _guard = self.writes.acquire(&entry.key).await;
        if self.entry_path(&entry.key).exists() {
            return Ok(false);
        }
        write::write_entry(self, &entry).await?;
        Ok(true)
    }

    async fn list(&self) -> CacheResult<Vec<(ResourceKey, DateTime<Utc>)>> {
        read::list_impl(self).await
    }
}

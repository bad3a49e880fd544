//! Write path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::fs;
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::key::ResourceKey;

use super::{io, paths, CacheEntry, FileStore};

/// On-disk layout. The payload is kept as raw JSON so the digest covers the
/// exact bytes that were written.
#[derive(Serialize)]
struct EntryFileOut<'a> {
    key: &'a ResourceKey,
    fetched_at: DateTime<Utc>,
    digest: &'a str,
    payload: &'a RawValue,
}

pub(crate) async fn write_entry(store: &FileStore, entry: &CacheEntry) -> CacheResult<()> {
    let key = &entry.key;
    let dir = paths::entry_dir(store.root(), key);

    fs::create_dir_all(&dir)
        .await
        .map_err(|e| CacheError::store(key, format!("failed to create entry directory: {}", e)))?;

    let payload_json = serde_json::to_string(&entry.payload)
        .map_err(|e| CacheError::store(key, format!("failed to serialize payload: {}", e)))?;
    let digest = io::sha256_hex(payload_json.as_bytes());
    let payload = RawValue::from_string(payload_json)
        .map_err(|e| CacheError::store(key, format!("failed to embed payload: {}", e)))?;

    let file = EntryFileOut {
        key,
        fetched_at: entry.fetched_at,
        digest: &digest,
        payload: &*payload,
    };
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| CacheError::store(key, format!("failed to serialize entry: {}", e)))?;

    io::write_atomic(&dir.join(paths::ENTRY_FILE), &content)
        .await
        .map_err(|e| CacheError::store(key, format!("failed to write entry: {}", e)))?;

    debug!(key = %key, fetched_at = %entry.fetched_at, "stored entry");
    Ok(())
}

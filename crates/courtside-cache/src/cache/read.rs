//! Read path with integrity verification.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};
use crate::key::{ResourceClass, ResourceKey};
use crate::types::Payload;

use super::{io, paths, CacheEntry, FileStore};

#[derive(Deserialize)]
struct EntryFileIn {
    key: ResourceKey,
    fetched_at: DateTime<Utc>,
    digest: String,
    payload: Box<RawValue>,
}

pub(crate) async fn get_impl(
    store: &FileStore,
    key: &ResourceKey,
) -> CacheResult<Option<CacheEntry>> {
    let path = paths::entry_path(store.root(), key);

    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(key = %key, "not in store");
            return Ok(None);
        }
        Err(e) => {
            return Err(CacheError::store(
                key,
                format!("failed to read entry: {}", e),
            ))
        }
    };

    let corrupt = |message: String| CacheError::Corrupt {
        key: key.to_string(),
        message,
    };

    let file: EntryFileIn = serde_json::from_str(&content)
        .map_err(|e| corrupt(format!("failed to parse entry: {}", e)))?;

    if &file.key != key {
        return Err(corrupt(format!("entry belongs to {}", file.key)));
    }

    let computed = io::sha256_hex(file.payload.get().as_bytes());
    if computed != file.digest {
        warn!(
            key = %key,
            expected = %file.digest,
            actual = %computed,
            "store integrity check failed"
        );
        return Err(corrupt(format!(
            "digest mismatch: expected {}, got {}",
            file.digest, computed
        )));
    }

    let payload: Payload = serde_json::from_str(file.payload.get())
        .map_err(|e| corrupt(format!("failed to decode payload: {}", e)))?;

    debug!(key = %key, fetched_at = %file.fetched_at, "store hit");
    Ok(Some(CacheEntry {
        key: file.key,
        payload,
        fetched_at: file.fetched_at,
        digest: file.digest,
    }))
}

/// Header fields only; the payload is skipped.
#[derive(Deserialize)]
struct EntryHeader {
    key: ResourceKey,
    fetched_at: DateTime<Utc>,
}

pub(crate) async fn list_impl(
    store: &FileStore,
) -> CacheResult<Vec<(ResourceKey, DateTime<Utc>)>> {
    let mut result = Vec::new();

    for class in ResourceClass::ALL {
        let class_dir = store.root().join(class.as_str());
        let mut dirs = match fs::read_dir(&class_dir).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(CacheError::store(
                    class,
                    format!("failed to read class directory: {}", e),
                ))
            }
        };

        while let Some(entry) = dirs
            .next_entry()
            .await
            .map_err(|e| CacheError::store(class, format!("failed to read directory entry: {}", e)))?
        {
            let path = entry.path().join(paths::ENTRY_FILE);
            let Ok(content) = fs::read_to_string(&path).await else {
                continue;
            };
            match serde_json::from_str::<EntryHeader>(&content) {
                Ok(header) => result.push((header.key, header.fetched_at)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }
    }

    Ok(result)
}

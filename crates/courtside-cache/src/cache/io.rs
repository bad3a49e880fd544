//! Filesystem helpers: default location, atomic writes, hashing.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::{CacheError, CacheResult};

pub(crate) fn default_store_dir() -> CacheResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| CacheError::Config {
            message: "could not determine cache directory".to_string(),
        })?;

    Ok(base.join("courtside"))
}

/// Write to a sibling temp file, then rename over `path`.
///
/// Callers serialize writers per key, so a fixed temp name is enough.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, content).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

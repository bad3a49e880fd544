//! Seed data.
//!
//! Operator-supplied entries that prime an empty store, including
//! hand-maintained values for specific entities. A seed never replaces an
//! existing entry, and a seeded entry is refreshed like any other once its
//! `fetched_at` falls outside the TTL.
//!
//! ```yaml
//! entries:
//!   - key: "player-stats:2544"
//!     fetched_at: 2024-04-15T00:00:00Z   # optional, defaults to the epoch
//!     payload:
//!       kind: player-stats
//!       data:
//!         player_id: 2544
//!         current_season: { season: "2023-24", games_played: 71, minutes: 35.3,
//!                           points: 25.7, rebounds: 7.3, assists: 8.3 }
//! ```
//!
//! JSON works too.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{ArtifactStore, CacheEntry};
use crate::error::{CacheError, CacheResult};
use crate::key::ResourceKey;
use crate::types::Payload;
use crate::validate::Validator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub key: ResourceKey,

    pub payload: Payload,

    /// When the data was current. Omitted means already expired, so the
    /// first resolution tries upstream and falls back to this value.
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub entries: Vec<SeedEntry>,
}

impl SeedFile {
    pub fn parse(content: &str) -> CacheResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CacheError::Config {
            message: format!("invalid seed data: {}", e),
        })
    }

    pub fn from_path(path: &Path) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
            message: format!("failed to read seed file {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }
}

/// A seed entry that was not written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedRejection {
    pub key: ResourceKey,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub written: Vec<ResourceKey>,

    /// Already present in the store.
    pub skipped: Vec<ResourceKey>,

    /// Failed validation.
    pub rejected: Vec<SeedRejection>,
}

/// Write every plausible entry the store does not have yet.
///
/// Implausible entries are reported, not written. Store failures abort.
pub async fn seed_store(
    store: &dyn ArtifactStore,
    seed: &SeedFile,
    validator: &Validator,
) -> CacheResult<SeedReport> {
    let mut report = SeedReport::default();

    for entry in &seed.entries {
        if let Err(e) = validator.validate(&entry.key, &entry.payload) {
            warn!(key = %entry.key, error = %e, "rejecting seed entry");
            report.rejected.push(SeedRejection {
                key: entry.key.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        let fetched_at = entry.fetched_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let cache_entry = CacheEntry::new(entry.key.clone(), entry.payload.clone(), fetched_at)?;

        if store.seed(cache_entry).await? {
            report.written.push(entry.key.clone());
        } else {
            report.skipped.push(entry.key.clone());
        }
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        rejected = report.rejected.len(),
        "seeded store"
    );
    Ok(report)
}

//! Staleness-aware cache-and-refresh engine for upstream sports statistics.
//!
//! This crate sits between request handlers and a slow, rate-limited upstream
//! statistics source, providing:
//!
//! - Durable artifact store with per-entry timestamps and integrity digests
//! - Per-class TTLs with a force-refresh override
//! - Bounded retry with exponential backoff
//! - Plausibility validation of cached and fetched payloads
//! - Fallback to the last good entry when upstream is down
//! - Single-flight refresh per key
//! - Scheduler-driven proactive refresh sweeps
//!
//! # Quick Start
//!
//! ```no_run
//! use courtside_cache::{EngineConfig, RefreshMode, ResourceKey};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = EngineConfig::from_env()?.build()?;
//!
//! let resolved = engine
//!     .resolve(&ResourceKey::player_stats(2544)?, RefreshMode::Normal)
//!     .await?;
//! if resolved.is_degraded() {
//!     println!("serving data {}s old", resolved.age().as_secs());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `COURTSIDE_PROVIDER_URL` | Upstream base URL (default: `http://127.0.0.1:8080/v1`) |
//! | `COURTSIDE_PROVIDER_TOKEN` | Bearer token |
//! | `COURTSIDE_PROVIDER_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `COURTSIDE_CACHE_DIR` | Store root (default: platform cache dir + `courtside`) |
//! | `COURTSIDE_MAX_ATTEMPTS` | Upstream attempts per fetch (default: 3) |
//! | `COURTSIDE_RESOLVE_TIMEOUT` | Total resolve budget in seconds (default: 60) |
//! | `COURTSIDE_TTL_<CLASS>` | TTL override in seconds per resource class |

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod lock;
pub mod provider;
pub mod refresh;
pub mod resolver;
pub mod retry;
pub mod seed;
pub mod staleness;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

// Re-export main types
pub use cache::{ArtifactStore, CacheEntry, FileStore, MemoryStore};
pub use client::HttpProvider;
pub use config::{EngineConfig, ProviderConfig};
pub use error::{CacheError, CacheResult, ProviderError};
pub use key::{ResourceClass, ResourceKey};
pub use lock::{KeyGuard, KeyLocks};
pub use provider::StatsProvider;
pub use refresh::{RefreshJob, RefreshJobConfig, SweepFailure, SweepReport};
pub use resolver::{EntryStatus, RefreshOrchestrator, DEFAULT_RESOLVE_TIMEOUT};
pub use retry::{FetchOutcome, RetryPolicy, RetryingFetcher};
pub use seed::{seed_store, SeedEntry, SeedFile, SeedRejection, SeedReport};
pub use staleness::{RefreshMode, StalenessRules};
pub use types::{
    LeagueStatLine, Payload, PlayerListing, PlayerProfile, ResolveSource, Resolved, Roster,
    RosterPlayer, SeasonLine, Standings, StandingsRow, Team, TeamSeasonStats,
};
pub use validate::{
    Implausible, Validator, PER_GAME_POINTS_CEILING, TEAM_POINTS_PER_GAME_CEILING,
};

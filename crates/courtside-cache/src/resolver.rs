//! Artifact resolution.
//!
//! Resolves a key to a payload with the following priority:
//! 1. Cache (if present, within its TTL and plausible)
//! 2. Upstream (fetched with retries, validated, written through)
//! 3. Stale cache (last plausible entry, marked degraded)
//!
//! Refreshes are single-flight per key: callers that queue behind an
//! in-flight refresh receive its outcome instead of fetching again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{age_since, ArtifactStore, CacheEntry};
use crate::error::{CacheError, CacheResult};
use crate::key::{ResourceClass, ResourceKey};
use crate::lock::KeyLocks;
use crate::retry::RetryingFetcher;
use crate::staleness::{RefreshMode, StalenessRules};
use crate::types::{Payload, ResolveSource, Resolved};
use crate::validate::Validator;

/// Default total budget for one resolution, retries included.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a finished refresh, left for callers queued on the same key.
#[derive(Debug, Clone)]
struct Flight {
    finished: u64,
    outcome: CacheResult<Resolved>,
}

/// Cached key as reported by [`RefreshOrchestrator::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatus {
    pub key: ResourceKey,
    pub fetched_at: DateTime<Utc>,
    pub age: Duration,
    pub ttl: Duration,
    pub fresh: bool,
}

/// Staleness-aware cache-and-refresh engine.
pub struct RefreshOrchestrator {
    store: Arc<dyn ArtifactStore>,
    fetcher: RetryingFetcher,
    rules: StalenessRules,
    validator: Validator,
    flights: KeyLocks<Flight>,
    sequence: AtomicU64,
    resolve_timeout: Duration,
}

impl RefreshOrchestrator {
    pub fn new(store: Arc<dyn ArtifactStore>, fetcher: RetryingFetcher, rules: StalenessRules) -> Self {
        Self {
            store,
            fetcher,
            rules,
            validator: Validator::default(),
            flights: KeyLocks::new(),
            sequence: AtomicU64::new(0),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Set the total time budget for one upstream refresh.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn rules(&self) -> &StalenessRules {
        &self.rules
    }

    /// Resolve from split class/id form, e.g. `("roster", Some("1610612747"))`.
    pub async fn resolve_str(
        &self,
        class: &str,
        id: Option<&str>,
        mode: RefreshMode,
    ) -> CacheResult<Resolved> {
        let class: ResourceClass = class.parse()?;
        let key = ResourceKey::new(class, id)?;
        self.resolve(&key, mode).await
    }

    /// Resolve `key` to a payload.
    ///
    /// Never returns an implausible payload. Store write failures escalate;
    /// upstream failures fall back to the last plausible entry when one exists.
    pub async fn resolve(&self, key: &ResourceKey, mode: RefreshMode) -> CacheResult<Resolved> {
        let class = key.class();
        let cached = self.load(key).await?;
        let age = cached.as_ref().map(CacheEntry::age).unwrap_or_default();

        if !self.rules.needs_refresh(class, cached.is_some(), age, mode) {
            if let Some(entry) = cached {
                match self.check(key, &entry.payload) {
                    Ok(()) => {
                        debug!(key = %key, age_secs = age.as_secs(), "cache hit");
                        return Ok(resolved(entry, ResolveSource::Cache));
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "cached entry implausible, refreshing");
                    }
                }
            }
        } else {
            debug!(key = %key, present = cached.is_some(), ?mode, "refresh needed");
        }

        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst);
        let mut flight = self.flights.acquire(key).await;

        if let Some(done) = flight.as_ref() {
            if joinable(done, ticket, mode) {
                debug!(key = %key, "joined in-flight refresh");
                return done.outcome.clone();
            }
        }

        let outcome = self.refresh(key, mode).await;
        *flight = Some(Flight {
            finished: self.sequence.fetch_add(1, Ordering::SeqCst),
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Every stored key with its age against the configured TTL.
    pub async fn status(&self) -> CacheResult<Vec<EntryStatus>> {
        let now = Utc::now();
        let mut entries: Vec<EntryStatus> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|(key, fetched_at)| {
                let age = age_since(fetched_at, now);
                let ttl = self.rules.ttl(key.class());
                EntryStatus {
                    fresh: self.rules.is_fresh(key.class(), age),
                    key,
                    fetched_at,
                    age,
                    ttl,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Refresh under the key's flight lock.
    async fn refresh(&self, key: &ResourceKey, mode: RefreshMode) -> CacheResult<Resolved> {
        let class = key.class();

        // Re-read: a refresh that finished before we queued may have left a
        // fresh entry behind.
        let cached = self.load(key).await?;
        if mode == RefreshMode::Normal {
            if let Some(entry) = &cached {
                if self.rules.is_fresh(class, entry.age()) && self.check(key, &entry.payload).is_ok() {
                    debug!(key = %key, "entry refreshed while waiting");
                    return Ok(resolved(entry.clone(), ResolveSource::Cache));
                }
            }
        }

        let failure = match tokio::time::timeout(self.resolve_timeout, self.fetcher.fetch(key)).await {
            Ok(Ok(payload)) => match self.check(key, &payload) {
                Ok(()) => {
                    let entry = self.store.put(key, payload).await?;
                    info!(
                        key = %key,
                        provider = self.fetcher.provider_name(),
                        fetched_at = %entry.fetched_at,
                        "refreshed from upstream"
                    );
                    return Ok(resolved(entry, ResolveSource::Upstream));
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding implausible upstream payload");
                    e.to_string()
                }
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "resolve budget of {}s exceeded for {}",
                self.resolve_timeout.as_secs_f64(),
                key
            ),
        };

        self.fall_back(key, cached, failure)
    }

    fn fall_back(
        &self,
        key: &ResourceKey,
        cached: Option<CacheEntry>,
        failure: String,
    ) -> CacheResult<Resolved> {
        let Some(entry) = cached else {
            warn!(key = %key, reason = %failure, "refresh failed with nothing cached");
            return Err(CacheError::Resolution {
                key: key.to_string(),
                reason: format!("{}; nothing cached", failure),
            });
        };

        if let Err(e) = self.check(key, &entry.payload) {
            warn!(key = %key, reason = %failure, error = %e, "refresh failed and cached entry is implausible");
            return Err(CacheError::Resolution {
                key: key.to_string(),
                reason: format!("{}; cached entry rejected ({})", failure, e),
            });
        }

        warn!(
            key = %key,
            reason = %failure,
            age_secs = entry.age().as_secs(),
            "serving stale entry"
        );
        Ok(resolved(entry, ResolveSource::Stale { reason: failure }))
    }

    /// Read the current entry; a corrupt entry counts as absent.
    async fn load(&self, key: &ResourceKey) -> CacheResult<Option<CacheEntry>> {
        match self.store.get(key).await {
            Ok(entry) => Ok(entry),
            Err(CacheError::Corrupt { message, .. }) => {
                warn!(key = %key, error = %message, "ignoring corrupt cache entry");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn check(&self, key: &ResourceKey, payload: &Payload) -> CacheResult<()> {
        self.validator
            .validate(key, payload)
            .map_err(|e| CacheError::Implausible {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

/// A finished flight answers a caller that queued before it completed,
/// unless a forced caller would only get a cache hit back.
fn joinable(flight: &Flight, ticket: u64, mode: RefreshMode) -> bool {
    if flight.finished < ticket {
        return false;
    }
    match (&flight.outcome, mode) {
        (Ok(r), RefreshMode::Force) => r.source != ResolveSource::Cache,
        _ => true,
    }
}

fn resolved(entry: CacheEntry, source: ResolveSource) -> Resolved {
    Resolved {
        key: entry.key,
        payload: entry.payload,
        fetched_at: entry.fetched_at,
        source,
    }
}

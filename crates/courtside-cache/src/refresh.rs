//! Proactive refresh.
//!
//! A sweep resolves every eagerly maintained key in normal mode, so fresh keys
//! cost nothing and expired ones are refreshed before a request needs them.
//! The sweep is not atomic: each key stands alone and one failure never stops
//! the rest.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::key::ResourceKey;
use crate::resolver::RefreshOrchestrator;
use crate::staleness::RefreshMode;
use crate::types::{Payload, ResolveSource};

/// Which keys a sweep maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshJobConfig {
    #[serde(default = "default_keys")]
    pub keys: Vec<ResourceKey>,

    /// Also maintain `roster:<id>` for every team in the resolved team list.
    #[serde(default = "default_true")]
    pub rosters_from_teams: bool,

    /// Pause after each key that went upstream, in milliseconds.
    #[serde(default = "default_spacing")]
    pub spacing_ms: u64,
}

fn default_keys() -> Vec<ResourceKey> {
    vec![
        ResourceKey::teams(),
        ResourceKey::standings(),
        ResourceKey::league_stats(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_spacing() -> u64 {
    500
}

impl Default for RefreshJobConfig {
    fn default() -> Self {
        Self {
            keys: default_keys(),
            rosters_from_teams: default_true(),
            spacing_ms: default_spacing(),
        }
    }
}

impl RefreshJobConfig {
    pub fn with_keys(mut self, keys: Vec<ResourceKey>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_rosters_from_teams(mut self, enabled: bool) -> Self {
        self.rosters_from_teams = enabled;
        self
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing_ms = spacing.as_millis() as u64;
        self
    }
}

/// A key the sweep could not resolve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    pub key: ResourceKey,
    pub error: String,
}

/// Per-key outcomes of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Still within TTL; nothing fetched.
    pub fresh: Vec<ResourceKey>,

    /// Fetched and written through.
    pub refreshed: Vec<ResourceKey>,

    /// Refresh failed; the previous entry remains.
    pub degraded: Vec<ResourceKey>,

    /// Nothing usable.
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.fresh.len() + self.refreshed.len() + self.degraded.len() + self.failed.len()
    }

    /// Every key resolved without falling back.
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty() && self.failed.is_empty()
    }
}

/// Scheduler-driven sweep over eagerly maintained keys.
pub struct RefreshJob {
    engine: Arc<RefreshOrchestrator>,
    config: RefreshJobConfig,
}

impl RefreshJob {
    pub fn new(engine: Arc<RefreshOrchestrator>, config: RefreshJobConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &RefreshJobConfig {
        &self.config
    }

    /// Run one sweep.
    pub async fn tick(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut queue: Vec<ResourceKey> = Vec::with_capacity(self.config.keys.len());
        for key in &self.config.keys {
            push_unique(&mut queue, key.clone());
        }

        let spacing = Duration::from_millis(self.config.spacing_ms);
        let mut went_upstream = false;
        let mut next = 0;

        while let Some(key) = queue.get(next).cloned() {
            next += 1;

            if went_upstream && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }

            match self.engine.resolve(&key, RefreshMode::Normal).await {
                Ok(resolved) => {
                    if self.config.rosters_from_teams {
                        if let Payload::Teams(teams) = &resolved.payload {
                            for team in teams {
                                match ResourceKey::roster(team.id) {
                                    Ok(roster) => push_unique(&mut queue, roster),
                                    Err(e) => warn!(team_id = team.id, error = %e, "skipping roster"),
                                }
                            }
                        }
                    }

                    went_upstream = resolved.source != ResolveSource::Cache;
                    match resolved.source {
                        ResolveSource::Cache => report.fresh.push(key),
                        ResolveSource::Upstream => report.refreshed.push(key),
                        ResolveSource::Stale { .. } => report.degraded.push(key),
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "sweep could not resolve key");
                    went_upstream = true;
                    report.failed.push(SweepFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            fresh = report.fresh.len(),
            refreshed = report.refreshed.len(),
            degraded = report.degraded.len(),
            failed = report.failed.len(),
            "refresh sweep finished"
        );
        report
    }

    /// Sweep every `period` until `shutdown` completes. Returns the number of
    /// sweeps run. The first sweep starts immediately.
    pub async fn run_until<F>(&self, period: Duration, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut sweeps = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(sweeps, "refresh loop stopping");
                    return sweeps;
                }
                _ = interval.tick() => {
                    self.tick().await;
                    sweeps += 1;
                }
            }
        }
    }
}

fn push_unique(queue: &mut Vec<ResourceKey>, key: ResourceKey) {
    if !queue.contains(&key) {
        queue.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ArtifactStore, CacheEntry, MemoryStore};
    use crate::error::ProviderError;
    use crate::provider::StatsProvider;
    use crate::retry::{RetryPolicy, RetryingFetcher};
    use crate::staleness::StalenessRules;
    use crate::testing::fixtures;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Mutex;

    /// Answers by class; standings always fail.
    #[derive(Default)]
    struct ByClass {
        seen: Mutex<Vec<ResourceKey>>,
    }

    #[async_trait]
    impl StatsProvider for ByClass {
        async fn fetch(&self, key: &ResourceKey) -> Result<Payload, ProviderError> {
            self.seen.lock().unwrap().push(key.clone());
            match key.class() {
                crate::key::ResourceClass::Teams => Ok(fixtures::teams()),
                crate::key::ResourceClass::Roster => {
                    Ok(fixtures::roster(key.id().unwrap().parse().unwrap()))
                }
                crate::key::ResourceClass::PlayerStats => Ok(fixtures::player_stats(2544, 25.7)),
                _ => Err(ProviderError::Network {
                    message: "HTTP 503".into(),
                }),
            }
        }

        fn provider_name(&self) -> &'static str {
            "by-class"
        }
    }

    fn engine(store: Arc<MemoryStore>, provider: Arc<ByClass>) -> Arc<RefreshOrchestrator> {
        Arc::new(RefreshOrchestrator::new(
            store,
            RetryingFetcher::new(provider, RetryPolicy::default().with_max_attempts(1)),
            StalenessRules::default(),
        ))
    }

    fn config(keys: Vec<ResourceKey>) -> RefreshJobConfig {
        RefreshJobConfig::default()
            .with_keys(keys)
            .with_spacing(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ByClass::default());
        let job = RefreshJob::new(
            engine(store.clone(), provider.clone()),
            config(vec![
                ResourceKey::standings(),
                ResourceKey::player_stats(2544).unwrap(),
            ])
            .with_rosters_from_teams(false),
        );

        let report = job.tick().await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, ResourceKey::standings());
        assert_eq!(report.refreshed, vec![ResourceKey::player_stats(2544).unwrap()]);
        assert!(!report.is_clean());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_expands_rosters_from_teams() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ByClass::default());
        let job = RefreshJob::new(
            engine(store.clone(), provider.clone()),
            config(vec![ResourceKey::teams()]),
        );

        let report = job.tick().await;

        assert_eq!(
            report.refreshed,
            vec![
                ResourceKey::teams(),
                ResourceKey::roster(1610612747).unwrap(),
                ResourceKey::roster(1610612738).unwrap(),
            ]
        );
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_second_sweep_is_all_fresh() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ByClass::default());
        let job = RefreshJob::new(
            engine(store, provider.clone()),
            config(vec![ResourceKey::teams(), ResourceKey::teams()]),
        );

        job.tick().await;
        let calls = provider.seen.lock().unwrap().len();
        let report = job.tick().await;

        assert_eq!(calls, 3, "duplicate keys resolve once");
        assert_eq!(provider.seen.lock().unwrap().len(), calls);
        assert_eq!(report.fresh.len(), 3);
        assert_eq!(report.total(), 3);
    }

    #[tokio::test]
    async fn test_expired_key_degrades_instead_of_failing() {
        let store = Arc::new(MemoryStore::new());
        let entry = CacheEntry::new(
            ResourceKey::standings(),
            fixtures::standings(),
            Utc::now() - ChronoDuration::hours(4),
        )
        .unwrap();
        store.seed(entry).await.unwrap();
        let job = RefreshJob::new(
            engine(store, Arc::new(ByClass::default())),
            config(vec![ResourceKey::standings()]),
        );

        let report = job.tick().await;
        assert_eq!(report.degraded, vec![ResourceKey::standings()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_upstream_keys() {
        let store = Arc::new(MemoryStore::new());
        let job = RefreshJob::new(
            engine(store, Arc::new(ByClass::default())),
            config(vec![ResourceKey::teams()]).with_spacing(Duration::from_millis(500)),
        );

        let started = tokio::time::Instant::now();
        let report = job.tick().await;

        assert_eq!(report.refreshed.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ByClass::default());
        let job = RefreshJob::new(
            engine(store, provider),
            config(vec![ResourceKey::player_stats(2544).unwrap()]),
        );

        let sweeps = job
            .run_until(
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_secs(150)),
            )
            .await;

        // t=0, t=60, t=120
        assert_eq!(sweeps, 3);
    }

    #[test]
    fn test_config_yaml_keys() {
        let config: RefreshJobConfig =
            serde_yaml::from_str("keys: [teams, \"roster:1610612747\"]\nspacing_ms: 0\n").unwrap();
        assert_eq!(
            config.keys,
            vec![ResourceKey::teams(), ResourceKey::roster(1610612747).unwrap()]
        );
        assert!(config.rosters_from_teams);
    }
}

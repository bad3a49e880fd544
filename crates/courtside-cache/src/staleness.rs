//! Freshness decisions.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::ResourceClass;

const HOUR: u64 = 60 * 60;

/// Whether the caller asked to bypass the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    #[default]
    Normal,
    Force,
}

impl RefreshMode {
    /// Map a boolean `force_refresh` query flag.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Force
        } else {
            Self::Normal
        }
    }
}

/// Per-class TTLs. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessRules {
    /// TTL in seconds per class; missing classes use the built-in default.
    ttl_secs: BTreeMap<ResourceClass, u64>,
}

impl Default for StalenessRules {
    fn default() -> Self {
        Self {
            ttl_secs: ResourceClass::ALL
                .into_iter()
                .map(|class| (class, default_ttl_secs(class)))
                .collect(),
        }
    }
}

fn default_ttl_secs(class: ResourceClass) -> u64 {
    match class {
        ResourceClass::Teams | ResourceClass::Roster | ResourceClass::Players => 24 * HOUR,
        ResourceClass::PlayerStats | ResourceClass::LeagueStats => 6 * HOUR,
        ResourceClass::Standings | ResourceClass::TeamStats => 3 * HOUR,
    }
}

impl StalenessRules {
    /// Override one class's TTL.
    pub fn with_ttl(mut self, class: ResourceClass, ttl: Duration) -> Self {
        self.ttl_secs.insert(class, ttl.as_secs());
        self
    }

    pub fn ttl(&self, class: ResourceClass) -> Duration {
        Duration::from_secs(
            self.ttl_secs
                .get(&class)
                .copied()
                .unwrap_or_else(|| default_ttl_secs(class)),
        )
    }

    /// `age < ttl`
    pub fn is_fresh(&self, class: ResourceClass, age: Duration) -> bool {
        age < self.ttl(class)
    }

    /// Whether a resolution must go upstream.
    ///
    /// `age` is ignored when no entry is present.
    pub fn needs_refresh(
        &self,
        class: ResourceClass,
        present: bool,
        age: Duration,
        mode: RefreshMode,
    ) -> bool {
        match (mode, present) {
            (RefreshMode::Force, _) => true,
            (RefreshMode::Normal, false) => true,
            (RefreshMode::Normal, true) => !self.is_fresh(class, age),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_differ_by_class() {
        let rules = StalenessRules::default();
        assert_eq!(rules.ttl(ResourceClass::Roster), Duration::from_secs(24 * HOUR));
        assert_eq!(rules.ttl(ResourceClass::Standings), Duration::from_secs(3 * HOUR));
        assert_eq!(
            rules.ttl(ResourceClass::PlayerStats),
            Duration::from_secs(6 * HOUR)
        );
    }

    #[test]
    fn test_needs_refresh_matches_ttl_boundary() {
        let rules = StalenessRules::default();
        for class in ResourceClass::ALL {
            let ttl = rules.ttl(class);
            for age in [
                Duration::ZERO,
                ttl - Duration::from_secs(1),
                ttl,
                ttl + Duration::from_secs(1),
                ttl * 10,
            ] {
                assert_eq!(
                    rules.needs_refresh(class, true, age, RefreshMode::Normal),
                    age >= ttl,
                    "{} at {:?}",
                    class,
                    age
                );
                assert!(rules.needs_refresh(class, true, age, RefreshMode::Force));
            }
        }
    }

    #[test]
    fn test_absent_entry_always_needs_refresh() {
        let rules = StalenessRules::default();
        assert!(rules.needs_refresh(
            ResourceClass::Teams,
            false,
            Duration::ZERO,
            RefreshMode::Normal
        ));
    }

    #[test]
    fn test_override_is_independent_per_class() {
        let rules = StalenessRules::default()
            .with_ttl(ResourceClass::Standings, Duration::from_secs(60));
        assert_eq!(rules.ttl(ResourceClass::Standings), Duration::from_secs(60));
        assert_eq!(rules.ttl(ResourceClass::Roster), Duration::from_secs(24 * HOUR));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let rules: StalenessRules =
            serde_yaml::from_str("ttl_secs:\n  standings: 600\n").unwrap();
        assert_eq!(rules.ttl(ResourceClass::Standings), Duration::from_secs(600));
        assert_eq!(rules.ttl(ResourceClass::Teams), Duration::from_secs(24 * HOUR));
    }

    #[test]
    fn test_mode_from_force_flag() {
        assert_eq!(RefreshMode::from_force(true), RefreshMode::Force);
        assert_eq!(RefreshMode::from_force(false), RefreshMode::Normal);
    }
}

//! Resource keys.
//!
//! Supported formats:
//! - `teams` → league-wide team list
//! - `roster:<team-id>` → one team's roster
//! - `player-stats:<player-id>` → one player's season lines
//! - `standings` → conference standings
//! - `league-stats` → per-game stat lines for every player

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// A named category of cached data with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceClass {
    Teams,
    Roster,
    PlayerStats,
    Standings,
    LeagueStats,
    Players,
    TeamStats,
}

impl ResourceClass {
    /// Every class, in a stable order.
    pub const ALL: [ResourceClass; 7] = [
        Self::Teams,
        Self::Roster,
        Self::PlayerStats,
        Self::Standings,
        Self::LeagueStats,
        Self::Players,
        Self::TeamStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Roster => "roster",
            Self::PlayerStats => "player-stats",
            Self::Standings => "standings",
            Self::LeagueStats => "league-stats",
            Self::Players => "players",
            Self::TeamStats => "team-stats",
        }
    }

    /// Whether keys of this class carry a sub-id.
    pub fn requires_id(&self) -> bool {
        matches!(self, Self::Roster | Self::PlayerStats | Self::TeamStats)
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| CacheError::InvalidKey {
                key: s.to_string(),
                reason: "unknown resource class".to_string(),
            })
    }
}

/// Identifier of one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    class: ResourceClass,
    id: Option<String>,
}

impl ResourceKey {
    /// Build a key, validating the id against the class.
    pub fn new(class: ResourceClass, id: Option<&str>) -> CacheResult<Self> {
        let display = match id {
            Some(id) => format!("{}:{}", class, id),
            None => class.to_string(),
        };

        match (class.requires_id(), id) {
            (true, None) => Err(CacheError::InvalidKey {
                key: display,
                reason: format!("{} requires an id", class),
            }),
            (false, Some(_)) => Err(CacheError::InvalidKey {
                key: display,
                reason: format!("{} does not take an id", class),
            }),
            (_, Some(id)) => {
                validate_id(id).map_err(|reason| CacheError::InvalidKey {
                    key: display,
                    reason,
                })?;
                Ok(Self {
                    class,
                    id: Some(id.to_string()),
                })
            }
            (_, None) => Ok(Self { class, id: None }),
        }
    }

    /// `teams`
    pub fn teams() -> Self {
        Self {
            class: ResourceClass::Teams,
            id: None,
        }
    }

    /// `standings`
    pub fn standings() -> Self {
        Self {
            class: ResourceClass::Standings,
            id: None,
        }
    }

    /// `league-stats`
    pub fn league_stats() -> Self {
        Self {
            class: ResourceClass::LeagueStats,
            id: None,
        }
    }

    /// `players`
    pub fn players() -> Self {
        Self {
            class: ResourceClass::Players,
            id: None,
        }
    }

    /// `team-stats:<team-id>`
    pub fn team_stats(team_id: impl fmt::Display) -> CacheResult<Self> {
        Self::new(ResourceClass::TeamStats, Some(&team_id.to_string()))
    }

    /// `roster:<team-id>`
    pub fn roster(team_id: impl fmt::Display) -> CacheResult<Self> {
        Self::new(ResourceClass::Roster, Some(&team_id.to_string()))
    }

    /// `player-stats:<player-id>`
    pub fn player_stats(player_id: impl fmt::Display) -> CacheResult<Self> {
        Self::new(ResourceClass::PlayerStats, Some(&player_id.to_string()))
    }

    /// Parse `class[:id]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use courtside_cache::{ResourceClass, ResourceKey};
    ///
    /// let key = ResourceKey::parse("roster:1610612747").unwrap();
    /// assert_eq!(key.class(), ResourceClass::Roster);
    /// assert_eq!(key.id(), Some("1610612747"));
    ///
    /// assert!(ResourceKey::parse("standings:east").is_err());
    /// ```
    pub fn parse(raw: &str) -> CacheResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CacheError::InvalidKey {
                key: raw.to_string(),
                reason: "empty key".to_string(),
            });
        }

        let (class, id) = match raw.split_once(':') {
            Some((class, id)) => (class, Some(id)),
            None => (raw, None),
        };
        let class: ResourceClass = class.parse().map_err(|_| CacheError::InvalidKey {
            key: raw.to_string(),
            reason: format!("unknown resource class '{}'", class),
        })?;

        Self::new(class, id)
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Ids become path segments in the file store.
fn validate_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("id cannot be empty".to_string());
    }
    if id.len() > 64 {
        return Err("id too long (max 64 characters)".to_string());
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("invalid character '{}' in id", c));
    }
    Ok(())
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.class, id),
            None => write!(f, "{}", self.class),
        }
    }
}

impl FromStr for ResourceKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.to_string()
    }
}

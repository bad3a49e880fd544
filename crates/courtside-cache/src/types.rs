//! Decoded payload types, one per resource class.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::{ResourceClass, ResourceKey};

/// A franchise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub full_name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub year_founded: Option<u32>,
}

/// One player on a roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    /// Jersey numbers are strings upstream ("00" and "0" are different numbers).
    #[serde(default)]
    pub jersey_number: Option<String>,
}

/// A team's current roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub team_id: u64,
    pub players: Vec<RosterPlayer>,
}

impl Roster {
    /// Sort by numeric jersey number; missing or non-numeric numbers go last.
    pub fn sort_by_jersey(&mut self) {
        self.players.sort_by_key(|p| {
            p.jersey_number
                .as_deref()
                .and_then(|n| n.trim().parse::<u32>().ok())
                .unwrap_or(u32::MAX)
        });
    }
}

/// One season of per-game averages for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonLine {
    pub season: String,
    #[serde(default)]
    pub team: String,
    pub games_played: u32,
    #[serde(default)]
    pub games_started: u32,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    #[serde(default)]
    pub steals: f64,
    #[serde(default)]
    pub blocks: f64,
    #[serde(default)]
    pub turnovers: f64,
    #[serde(default)]
    pub fg_pct: f64,
    #[serde(default)]
    pub fg3_pct: f64,
    #[serde(default)]
    pub ft_pct: f64,
}

/// A player's stats: the most recent season plus prior seasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: u64,
    #[serde(default)]
    pub current_season: Option<SeasonLine>,
    #[serde(default)]
    pub career: Vec<SeasonLine>,
}

impl PlayerProfile {
    /// Every season line, current first.
    pub fn lines(&self) -> impl Iterator<Item = &SeasonLine> {
        self.current_season.iter().chain(self.career.iter())
    }
}

/// A row of the standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team_id: u64,
    pub team_name: String,
    pub conference: String,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
    #[serde(default)]
    pub games_behind: Option<String>,
    pub conference_rank: u32,
    #[serde(default)]
    pub home_record: Option<String>,
    #[serde(default)]
    pub road_record: Option<String>,
}

/// Conference standings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Standings {
    pub eastern: Vec<StandingsRow>,
    pub western: Vec<StandingsRow>,
}

impl Standings {
    /// Split rows by conference, each side ordered by conference rank.
    pub fn from_rows(rows: impl IntoIterator<Item = StandingsRow>) -> Self {
        let mut standings = Self::default();
        for row in rows {
            if row.conference.eq_ignore_ascii_case("east") {
                standings.eastern.push(row);
            } else {
                standings.western.push(row);
            }
        }
        standings.eastern.sort_by_key(|r| r.conference_rank);
        standings.western.sort_by_key(|r| r.conference_rank);
        standings
    }

    pub fn rows(&self) -> impl Iterator<Item = &StandingsRow> {
        self.eastern.iter().chain(self.western.iter())
    }
}

/// League-wide per-game line for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStatLine {
    pub player_id: u64,
    pub player_name: String,
    #[serde(default)]
    pub team: String,
    pub games_played: u32,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
}

/// One entry in the league-wide player index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerListing {
    pub id: u64,
    pub name: String,
    pub team_id: u64,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_abbreviation: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub jersey_number: Option<String>,
}

/// A team's record and scoring for its latest season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub team_id: u64,
    pub team_name: String,
    pub season: String,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
    pub points_per_game: f64,
}

/// Decoded artifact, tagged by resource class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Payload {
    Teams(Vec<Team>),
    Roster(Roster),
    PlayerStats(PlayerProfile),
    Standings(Standings),
    LeagueStats(Vec<LeagueStatLine>),
    Players(Vec<PlayerListing>),
    TeamStats(TeamSeasonStats),
}

impl Payload {
    /// The resource class this payload belongs to.
    pub fn class(&self) -> ResourceClass {
        match self {
            Self::Teams(_) => ResourceClass::Teams,
            Self::Roster(_) => ResourceClass::Roster,
            Self::PlayerStats(_) => ResourceClass::PlayerStats,
            Self::Standings(_) => ResourceClass::Standings,
            Self::LeagueStats(_) => ResourceClass::LeagueStats,
            Self::Players(_) => ResourceClass::Players,
            Self::TeamStats(_) => ResourceClass::TeamStats,
        }
    }
}

/// Where a resolved artifact came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveSource {
    /// Cached entry within its TTL.
    Cache,

    /// Freshly fetched from upstream and written through.
    Upstream,

    /// Degraded answer: a previous entry served because refresh failed.
    Stale { reason: String },
}

impl std::fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Upstream => write!(f, "upstream"),
            Self::Stale { reason } => write!(f, "stale:{}", reason),
        }
    }
}

/// A resolved artifact.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub key: ResourceKey,

    /// Owned copy of the stored payload.
    pub payload: Payload,

    /// When the underlying entry was fetched from upstream.
    pub fetched_at: DateTime<Utc>,

    pub source: ResolveSource,
}

impl Resolved {
    /// Whether this is a fallback answer.
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ResolveSource::Stale { .. })
    }

    /// Age of the data at the time of the call.
    pub fn age(&self) -> std::time::Duration {
        crate::cache::age_since(self.fetched_at, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64, jersey: Option<&str>) -> RosterPlayer {
        RosterPlayer {
            id,
            name: format!("Player {}", id),
            position: None,
            height: None,
            weight: None,
            jersey_number: jersey.map(String::from),
        }
    }

    #[test]
    fn test_roster_sort_puts_unnumbered_last() {
        let mut roster = Roster {
            team_id: 1,
            players: vec![
                player(1, None),
                player(2, Some("23")),
                player(3, Some("n/a")),
                player(4, Some("0")),
                player(5, Some(" 6")),
            ],
        };
        roster.sort_by_jersey();
        let order: Vec<u64> = roster.players.iter().map(|p| p.id).collect();
        assert_eq!(order[..3], [4, 5, 2]);
        assert!(order[3..].contains(&1));
        assert!(order[3..].contains(&3));
    }

    #[test]
    fn test_standings_split_and_ranked() {
        let row = |id: u64, conf: &str, rank: u32| StandingsRow {
            team_id: id,
            team_name: format!("Team {}", id),
            conference: conf.to_string(),
            wins: 10,
            losses: 10,
            win_pct: 0.5,
            games_behind: None,
            conference_rank: rank,
            home_record: None,
            road_record: None,
        };
        let standings =
            Standings::from_rows(vec![row(1, "East", 2), row(2, "West", 1), row(3, "East", 1)]);
        let east: Vec<u64> = standings.eastern.iter().map(|r| r.team_id).collect();
        assert_eq!(east, vec![3, 1]);
        assert_eq!(standings.western.len(), 1);
    }

    #[test]
    fn test_payload_tagging() {
        let payload = Payload::Teams(vec![]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "teams");
        assert_eq!(payload.class(), ResourceClass::Teams);
    }

    #[test]
    fn test_resolve_source_display() {
        assert_eq!(ResolveSource::Cache.to_string(), "cache");
        assert_eq!(ResolveSource::Upstream.to_string(), "upstream");
        assert_eq!(
            ResolveSource::Stale {
                reason: "upstream down".into()
            }
            .to_string(),
            "stale:upstream down"
        );
    }
}

//! Plausibility checks on decoded payloads.
//!
//! The same checks apply to cached, seeded and freshly fetched artifacts: the
//! bounds describe what the numbers mean, not how old they are. Payloads for
//! a single entity must also name the entity their key names.

use std::fmt;

use std::collections::HashSet;

use crate::key::ResourceKey;
use crate::types::{
    LeagueStatLine, Payload, PlayerListing, Roster, SeasonLine, StandingsRow, TeamSeasonStats,
};

/// Highest believable per-game scoring average.
///
/// Known heuristic: upstream sometimes returns season totals where per-game
/// averages were requested, and a value above this ceiling is the only signal.
/// A legitimate average above it would be misclassified.
pub const PER_GAME_POINTS_CEILING: f64 = 60.0;

pub const PER_GAME_REBOUNDS_CEILING: f64 = 30.0;

pub const PER_GAME_ASSISTS_CEILING: f64 = 25.0;

/// Highest believable team scoring average.
pub const TEAM_POINTS_PER_GAME_CEILING: f64 = 160.0;

/// Upper bound on games in one season line (regular season plus slack).
pub const MAX_GAMES_PER_SEASON: u32 = 100;

/// A failed plausibility rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Implausible {
    pub rule: &'static str,
    pub detail: String,
}

impl Implausible {
    fn new(rule: &'static str, detail: impl Into<String>) -> Self {
        Self {
            rule,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Implausible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.detail)
    }
}

/// Plausibility bounds. Defaults are the published constants above.
#[derive(Debug, Clone)]
pub struct Validator {
    pub points_ceiling: f64,
    pub rebounds_ceiling: f64,
    pub assists_ceiling: f64,
    pub team_points_ceiling: f64,
    pub max_games: u32,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            points_ceiling: PER_GAME_POINTS_CEILING,
            rebounds_ceiling: PER_GAME_REBOUNDS_CEILING,
            assists_ceiling: PER_GAME_ASSISTS_CEILING,
            team_points_ceiling: TEAM_POINTS_PER_GAME_CEILING,
            max_games: MAX_GAMES_PER_SEASON,
        }
    }
}

impl Validator {
    /// Check `payload` against the rules for `key`.
    pub fn validate(&self, key: &ResourceKey, payload: &Payload) -> Result<(), Implausible> {
        let class = key.class();
        if payload.class() != class {
            return Err(Implausible::new(
                "payload_class",
                format!("expected {} payload, found {}", class, payload.class()),
            ));
        }

        match payload {
            Payload::Teams(teams) => {
                if teams.is_empty() {
                    return Err(Implausible::new("non_empty", "team list is empty"));
                }
                if let Some(team) = teams.iter().find(|t| t.full_name.trim().is_empty()) {
                    return Err(Implausible::new(
                        "team_name",
                        format!("team {} has no name", team.id),
                    ));
                }
                Ok(())
            }
            Payload::Roster(roster) => {
                check_entity(key, "team", roster.team_id)?;
                check_roster(roster)
            }
            Payload::PlayerStats(profile) => {
                check_entity(key, "player", profile.player_id)?;
                profile
                    .lines()
                    .try_for_each(|line| self.check_season_line(line))
            }
            Payload::Standings(standings) => {
                if standings.eastern.is_empty() && standings.western.is_empty() {
                    return Err(Implausible::new("non_empty", "standings table is empty"));
                }
                standings.rows().try_for_each(|row| self.check_standings_row(row))
            }
            Payload::LeagueStats(lines) => {
                lines.iter().try_for_each(|line| self.check_league_line(line))
            }
            Payload::Players(players) => check_players(players),
            Payload::TeamStats(stats) => {
                check_entity(key, "team", stats.team_id)?;
                self.check_team_stats(stats)
            }
        }
    }

    fn check_season_line(&self, line: &SeasonLine) -> Result<(), Implausible> {
        let context = format!("season {}", line.season);
        self.check_averages(&context, line.points, line.rebounds, line.assists)?;

        for (name, value) in [
            ("minutes", line.minutes),
            ("steals", line.steals),
            ("blocks", line.blocks),
            ("turnovers", line.turnovers),
        ] {
            check_non_negative(&context, name, value)?;
        }
        for (name, value) in [
            ("fg_pct", line.fg_pct),
            ("fg3_pct", line.fg3_pct),
            ("ft_pct", line.ft_pct),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Implausible::new(
                    "percentage_range",
                    format!("{}: {} = {} outside [0, 1]", context, name, value),
                ));
            }
        }

        if line.games_played > self.max_games {
            return Err(Implausible::new(
                "games_per_season",
                format!(
                    "{}: {} games played exceeds {}",
                    context, line.games_played, self.max_games
                ),
            ));
        }
        if line.games_started > line.games_played {
            return Err(Implausible::new(
                "games_started",
                format!(
                    "{}: {} games started but only {} played",
                    context, line.games_started, line.games_played
                ),
            ));
        }
        Ok(())
    }

    fn check_league_line(&self, line: &LeagueStatLine) -> Result<(), Implausible> {
        let context = format!("player {}", line.player_id);
        self.check_averages(&context, line.points, line.rebounds, line.assists)?;
        if line.games_played > self.max_games {
            return Err(Implausible::new(
                "games_per_season",
                format!(
                    "{}: {} games played exceeds {}",
                    context, line.games_played, self.max_games
                ),
            ));
        }
        Ok(())
    }

    fn check_standings_row(&self, row: &StandingsRow) -> Result<(), Implausible> {
        self.check_record(row.team_id, row.wins, row.losses, row.win_pct)
    }

    fn check_team_stats(&self, stats: &TeamSeasonStats) -> Result<(), Implausible> {
        let context = format!("team {} season {}", stats.team_id, stats.season);
        self.check_record(stats.team_id, stats.wins, stats.losses, stats.win_pct)?;
        check_non_negative(&context, "points_per_game", stats.points_per_game)?;
        if stats.points_per_game > self.team_points_ceiling {
            return Err(Implausible::new(
                "per_game_ceiling",
                format!(
                    "{}: points per game {} above {} (cumulative totals?)",
                    context, stats.points_per_game, self.team_points_ceiling
                ),
            ));
        }
        Ok(())
    }

    /// Win percentage in range and a season's worth of games at most.
    fn check_record(
        &self,
        team_id: u64,
        wins: u32,
        losses: u32,
        win_pct: f64,
    ) -> Result<(), Implausible> {
        if !(0.0..=1.0).contains(&win_pct) {
            return Err(Implausible::new(
                "percentage_range",
                format!("team {}: win_pct {} outside [0, 1]", team_id, win_pct),
            ));
        }
        if wins.checked_add(losses).map_or(true, |games| games > self.max_games) {
            return Err(Implausible::new(
                "games_per_season",
                format!(
                    "team {}: {}-{} exceeds {} games",
                    team_id, wins, losses, self.max_games
                ),
            ));
        }
        Ok(())
    }

    /// Per-game ceilings. Exceeding them usually means cumulative totals.
    fn check_averages(
        &self,
        context: &str,
        points: f64,
        rebounds: f64,
        assists: f64,
    ) -> Result<(), Implausible> {
        for (name, value, ceiling) in [
            ("points", points, self.points_ceiling),
            ("rebounds", rebounds, self.rebounds_ceiling),
            ("assists", assists, self.assists_ceiling),
        ] {
            check_non_negative(context, name, value)?;
            if value > ceiling {
                return Err(Implausible::new(
                    "per_game_ceiling",
                    format!(
                        "{}: {} per game {} above {} (cumulative totals?)",
                        context, name, value, ceiling
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// The numeric id the key names must be the one the payload describes.
fn check_entity(key: &ResourceKey, what: &str, payload_id: u64) -> Result<(), Implausible> {
    if key.id().and_then(|id| id.parse::<u64>().ok()) == Some(payload_id) {
        return Ok(());
    }
    Err(Implausible::new(
        "entity_id",
        format!("{} payload describes {} {}", key, what, payload_id),
    ))
}

fn check_roster(roster: &Roster) -> Result<(), Implausible> {
    if roster.players.is_empty() {
        return Err(Implausible::new(
            "non_empty",
            format!("team {} roster is empty", roster.team_id),
        ));
    }
    let mut seen = HashSet::new();
    for player in &roster.players {
        if player.name.trim().is_empty() {
            return Err(Implausible::new(
                "player_name",
                format!("player {} has no name", player.id),
            ));
        }
        if !seen.insert(player.id) {
            return Err(Implausible::new(
                "duplicate_player",
                format!("player {} listed twice on team {}", player.id, roster.team_id),
            ));
        }
    }
    Ok(())
}

fn check_players(players: &[PlayerListing]) -> Result<(), Implausible> {
    if players.is_empty() {
        return Err(Implausible::new("non_empty", "player list is empty"));
    }
    let mut seen = HashSet::new();
    for player in players {
        if player.name.trim().is_empty() {
            return Err(Implausible::new(
                "player_name",
                format!("player {} has no name", player.id),
            ));
        }
        if !seen.insert(player.id) {
            return Err(Implausible::new(
                "duplicate_player",
                format!("player {} listed twice", player.id),
            ));
        }
    }
    Ok(())
}

fn check_non_negative(context: &str, name: &str, value: f64) -> Result<(), Implausible> {
    if value.is_nan() || value < 0.0 {
        return Err(Implausible::new(
            "non_negative",
            format!("{}: {} = {}", context, name, value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlayerProfile, RosterPlayer, Standings, Team};

    fn player_key() -> ResourceKey {
        ResourceKey::player_stats(2544).unwrap()
    }

    fn line(points: f64) -> SeasonLine {
        SeasonLine {
            season: "2023-24".into(),
            team: "LAL".into(),
            games_played: 71,
            games_started: 71,
            minutes: 35.3,
            points,
            rebounds: 7.3,
            assists: 8.3,
            steals: 1.3,
            blocks: 0.5,
            turnovers: 3.2,
            fg_pct: 0.54,
            fg3_pct: 0.41,
            ft_pct: 0.75,
        }
    }

    fn profile(current: SeasonLine) -> Payload {
        Payload::PlayerStats(PlayerProfile {
            player_id: 2544,
            current_season: Some(current),
            career: vec![line(27.4)],
        })
    }

    #[test]
    fn test_realistic_profile_passes() {
        let v = Validator::default();
        assert!(v
            .validate(&player_key(), &profile(line(25.7)))
            .is_ok());
    }

    #[test]
    fn test_cumulative_points_rejected() {
        let v = Validator::default();
        let err = v
            .validate(&player_key(), &profile(line(150.0)))
            .unwrap_err();
        assert_eq!(err.rule, "per_game_ceiling");
        assert!(err.detail.contains("points"));
    }

    #[test]
    fn test_ceiling_is_configurable() {
        let v = Validator {
            points_ceiling: 200.0,
            ..Validator::default()
        };
        assert!(v
            .validate(&player_key(), &profile(line(150.0)))
            .is_ok());
    }

    #[test]
    fn test_percentage_and_games_rules() {
        let v = Validator::default();

        let mut bad_pct = line(20.0);
        bad_pct.fg_pct = 54.0;
        assert_eq!(
            v.validate(&player_key(), &profile(bad_pct))
                .unwrap_err()
                .rule,
            "percentage_range"
        );

        let mut bad_starts = line(20.0);
        bad_starts.games_started = 80;
        assert_eq!(
            v.validate(&player_key(), &profile(bad_starts))
                .unwrap_err()
                .rule,
            "games_started"
        );

        let mut negative = line(20.0);
        negative.blocks = -1.0;
        assert_eq!(
            v.validate(&player_key(), &profile(negative))
                .unwrap_err()
                .rule,
            "non_negative"
        );
    }

    #[test]
    fn test_class_mismatch_rejected() {
        let v = Validator::default();
        let err = v
            .validate(&ResourceKey::standings(), &Payload::Teams(vec![]))
            .unwrap_err();
        assert_eq!(err.rule, "payload_class");
    }

    #[test]
    fn test_empty_tables_rejected() {
        let v = Validator::default();
        assert!(v
            .validate(&ResourceKey::teams(), &Payload::Teams(vec![]))
            .is_err());
        assert!(v
            .validate(
                &ResourceKey::standings(),
                &Payload::Standings(Standings::default())
            )
            .is_err());

        let teams = Payload::Teams(vec![Team {
            id: 1,
            full_name: "Boston Celtics".into(),
            abbreviation: "BOS".into(),
            nickname: "Celtics".into(),
            city: "Boston".into(),
            state: "Massachusetts".into(),
            year_founded: Some(1946),
        }]);
        assert!(v.validate(&ResourceKey::teams(), &teams).is_ok());
    }

    #[test]
    fn test_standings_record_bounds() {
        let v = Validator::default();
        let row = StandingsRow {
            team_id: 1,
            team_name: "Boston Celtics".into(),
            conference: "East".into(),
            wins: 64,
            losses: 18,
            win_pct: 0.78,
            games_behind: None,
            conference_rank: 1,
            home_record: Some("37-4".into()),
            road_record: Some("27-14".into()),
        };
        let ok = Payload::Standings(Standings::from_rows(vec![row.clone()]));
        assert!(v.validate(&ResourceKey::standings(), &ok).is_ok());

        let totals = Payload::Standings(Standings::from_rows(vec![StandingsRow {
            wins: 640,
            ..row
        }]));
        assert_eq!(
            v.validate(&ResourceKey::standings(), &totals)
                .unwrap_err()
                .rule,
            "games_per_season"
        );
    }

    fn standings_row(wins: u32, losses: u32) -> StandingsRow {
        StandingsRow {
            team_id: 1610612738,
            team_name: "Boston Celtics".into(),
            conference: "East".into(),
            wins,
            losses,
            win_pct: 0.78,
            games_behind: None,
            conference_rank: 1,
            home_record: None,
            road_record: None,
        }
    }

    #[test]
    fn test_record_overflow_is_implausible() {
        let v = Validator::default();
        for (wins, losses) in [(u32::MAX, 1), (1, u32::MAX), (u32::MAX, u32::MAX)] {
            let table = Payload::Standings(Standings::from_rows(vec![standings_row(wins, losses)]));
            let err = v
                .validate(&ResourceKey::standings(), &table)
                .unwrap_err();
            assert_eq!(err.rule, "games_per_season");
        }
    }

    #[test]
    fn test_payload_must_describe_keyed_entity() {
        let v = Validator::default();
        let curry = Payload::PlayerStats(PlayerProfile {
            player_id: 201939,
            current_season: Some(line(26.4)),
            career: vec![],
        });
        let err = v.validate(&player_key(), &curry).unwrap_err();
        assert_eq!(err.rule, "entity_id");
        assert!(err.detail.contains("201939"));
        assert!(v
            .validate(&ResourceKey::player_stats(201939).unwrap(), &curry)
            .is_ok());

        let celtics = Payload::Roster(Roster {
            team_id: 1610612738,
            players: vec![roster_player(1628369, "Jayson Tatum")],
        });
        let err = v
            .validate(&ResourceKey::roster(1610612747).unwrap(), &celtics)
            .unwrap_err();
        assert_eq!(err.rule, "entity_id");
    }

    fn roster_player(id: u64, name: &str) -> RosterPlayer {
        RosterPlayer {
            id,
            name: name.into(),
            position: None,
            height: None,
            weight: None,
            jersey_number: None,
        }
    }

    #[test]
    fn test_roster_rules() {
        let v = Validator::default();
        let key = ResourceKey::roster(1610612747).unwrap();
        let roster = |players| {
            Payload::Roster(Roster {
                team_id: 1610612747,
                players,
            })
        };

        assert!(v
            .validate(&key, &roster(vec![roster_player(2544, "LeBron James")]))
            .is_ok());
        assert_eq!(v.validate(&key, &roster(vec![])).unwrap_err().rule, "non_empty");
        assert_eq!(
            v.validate(
                &key,
                &roster(vec![
                    roster_player(2544, "LeBron James"),
                    roster_player(2544, "LeBron James"),
                ])
            )
            .unwrap_err()
            .rule,
            "duplicate_player"
        );
        assert_eq!(
            v.validate(&key, &roster(vec![roster_player(2544, " ")]))
                .unwrap_err()
                .rule,
            "player_name"
        );
    }

    #[test]
    fn test_team_stats_rules() {
        let v = Validator::default();
        let key = ResourceKey::team_stats(1610612738).unwrap();
        let stats = TeamSeasonStats {
            team_id: 1610612738,
            team_name: "Boston Celtics".into(),
            season: "2023-24".into(),
            wins: 64,
            losses: 18,
            win_pct: 0.78,
            points_per_game: 120.6,
        };
        assert!(v.validate(&key, &Payload::TeamStats(stats.clone())).is_ok());

        let totals = TeamSeasonStats {
            points_per_game: 9887.0,
            ..stats.clone()
        };
        assert_eq!(
            v.validate(&key, &Payload::TeamStats(totals)).unwrap_err().rule,
            "per_game_ceiling"
        );

        let bad_pct = TeamSeasonStats {
            win_pct: 78.0,
            ..stats.clone()
        };
        assert_eq!(
            v.validate(&key, &Payload::TeamStats(bad_pct)).unwrap_err().rule,
            "percentage_range"
        );

        let overflow = TeamSeasonStats {
            wins: u32::MAX,
            ..stats
        };
        assert_eq!(
            v.validate(&key, &Payload::TeamStats(overflow)).unwrap_err().rule,
            "games_per_season"
        );
    }

    #[test]
    fn test_players_rules() {
        let v = Validator::default();
        let listing = |id| PlayerListing {
            id,
            name: "LeBron James".into(),
            team_id: 1610612747,
            team_name: "Los Angeles Lakers".into(),
            team_abbreviation: "LAL".into(),
            position: None,
            jersey_number: None,
        };
        let key = ResourceKey::players();

        assert!(v.validate(&key, &Payload::Players(vec![listing(2544)])).is_ok());
        assert_eq!(
            v.validate(&key, &Payload::Players(vec![])).unwrap_err().rule,
            "non_empty"
        );
        assert_eq!(
            v.validate(&key, &Payload::Players(vec![listing(2544), listing(2544)]))
                .unwrap_err()
                .rule,
            "duplicate_player"
        );
    }
}

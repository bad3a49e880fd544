//! Result-set decoding: tabular upstream records into payloads.
//!
//! Upstream answers with
//!
//! ```json
//! {"resultSets": [{"name": "...", "headers": ["PLAYER_ID", ...], "rowSet": [[2544, ...]]}]}
//! ```
//!
//! Only the first result set is read. Columns are looked up by header name so
//! column order and extra columns do not matter.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::key::{ResourceClass, ResourceKey};
use crate::types::{
    LeagueStatLine, Payload, PlayerListing, PlayerProfile, Roster, RosterPlayer, SeasonLine,
    Standings, StandingsRow, Team, TeamSeasonStats,
};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    headers: Vec<String>,
    #[serde(rename = "rowSet", default)]
    row_set: Vec<Vec<Value>>,
}

/// One row with by-name column access.
struct Row<'a> {
    columns: &'a HashMap<&'a str, usize>,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .get(column)
            .and_then(|&i| self.values.get(i))
            .filter(|v| !v.is_null())
    }

    fn require(&self, column: &str) -> Result<&'a Value, ProviderError> {
        self.get(column).ok_or_else(|| invalid(format!("missing column {}", column)))
    }

    /// Whole numbers only; `71.0` is accepted, `71.9` is not.
    fn u64(&self, column: &str) -> Result<u64, ProviderError> {
        let value = self.require(column)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().and_then(whole_u64))
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| invalid(format!("{} is not an unsigned integer: {}", column, value)))
    }

    fn u32_or_zero(&self, column: &str) -> Result<u32, ProviderError> {
        match self.get(column) {
            None => Ok(0),
            Some(_) => u32::try_from(self.u64(column)?)
                .map_err(|_| invalid(format!("{} out of range", column))),
        }
    }

    /// Missing numbers read as zero.
    fn f64_or_zero(&self, column: &str) -> Result<f64, ProviderError> {
        match self.get(column) {
            None => Ok(0.0),
            Some(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| invalid(format!("{} is not a number: {}", column, value))),
        }
    }

    fn string(&self, column: &str) -> Result<String, ProviderError> {
        self.opt_string(column)
            .ok_or_else(|| invalid(format!("missing column {}", column)))
    }

    fn string_or_empty(&self, column: &str) -> String {
        self.opt_string(column).unwrap_or_default()
    }

    /// Strings and numbers both render as text; empty text is absent.
    fn opt_string(&self, column: &str) -> Option<String> {
        let text = match self.get(column)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

fn whole_u64(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn invalid(message: impl Into<String>) -> ProviderError {
    ProviderError::InvalidResponse {
        message: message.into(),
    }
}

/// Decode a response body for `key`.
pub(crate) fn decode_payload(key: &ResourceKey, body: &str) -> Result<Payload, ProviderError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| invalid(format!("failed to parse result sets: {}", e)))?;
    let set = envelope
        .result_sets
        .into_iter()
        .next()
        .ok_or_else(|| invalid("response has no result sets"))?;

    let columns: HashMap<&str, usize> = set
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();
    let rows: Vec<Row<'_>> = set
        .row_set
        .iter()
        .map(|values| Row {
            columns: &columns,
            values,
        })
        .collect();

    match key.class() {
        ResourceClass::Teams => Ok(Payload::Teams(
            rows.iter().map(team).collect::<Result<_, _>>()?,
        )),
        ResourceClass::Roster => {
            let mut roster = Roster {
                team_id: entity_id(key, &rows, "TeamID")?,
                players: rows.iter().map(roster_player).collect::<Result<_, _>>()?,
            };
            roster.sort_by_jersey();
            Ok(Payload::Roster(roster))
        }
        ResourceClass::PlayerStats => {
            let player_id = entity_id(key, &rows, "PLAYER_ID")?;
            let mut lines = rows
                .iter()
                .map(season_line)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter();
            Ok(Payload::PlayerStats(PlayerProfile {
                player_id,
                current_season: lines.next(),
                career: lines.collect(),
            }))
        }
        ResourceClass::Standings => Ok(Payload::Standings(Standings::from_rows(
            rows.iter().map(standings_row).collect::<Result<Vec<_>, _>>()?,
        ))),
        ResourceClass::LeagueStats => Ok(Payload::LeagueStats(
            rows.iter().map(league_line).collect::<Result<_, _>>()?,
        )),
        ResourceClass::Players => {
            let mut players = Vec::with_capacity(rows.len());
            for row in &rows {
                // Unsigned and retired players carry team id 0.
                let listing = player_listing(row)?;
                if listing.team_id != 0 {
                    players.push(listing);
                }
            }
            Ok(Payload::Players(players))
        }
        ResourceClass::TeamStats => {
            // Seasons are listed oldest first.
            let latest = rows
                .last()
                .ok_or_else(|| invalid(format!("{} has no seasons", key)))?;
            Ok(Payload::TeamStats(team_season(key, latest)?))
        }
    }
}

/// The id the rows claim to describe, falling back to the key's id when the
/// column is absent. A mismatch with the key is left for validation.
fn entity_id(key: &ResourceKey, rows: &[Row<'_>], column: &str) -> Result<u64, ProviderError> {
    match rows.first() {
        Some(row) if row.get(column).is_some() => row.u64(column),
        _ => parse_id(key),
    }
}

fn parse_id(key: &ResourceKey) -> Result<u64, ProviderError> {
    key.id()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| invalid(format!("{} does not carry a numeric id", key)))
}

fn joined_name(row: &Row<'_>, city: &str, name: &str) -> Result<String, ProviderError> {
    let city = row.string_or_empty(city);
    let name = row.string(name)?;
    Ok(if city.is_empty() {
        name
    } else {
        format!("{} {}", city, name)
    })
}

fn team(row: &Row<'_>) -> Result<Team, ProviderError> {
    Ok(Team {
        id: row.u64("ID")?,
        full_name: row.string("FULL_NAME")?,
        abbreviation: row.string("ABBREVIATION")?,
        nickname: row.string_or_empty("NICKNAME"),
        city: row.string_or_empty("CITY"),
        state: row.string_or_empty("STATE"),
        year_founded: match row.get("YEAR_FOUNDED") {
            Some(_) => Some(row.u32_or_zero("YEAR_FOUNDED")?),
            None => None,
        },
    })
}

fn roster_player(row: &Row<'_>) -> Result<RosterPlayer, ProviderError> {
    Ok(RosterPlayer {
        id: row.u64("PLAYER_ID")?,
        name: row.string("PLAYER")?,
        position: row.opt_string("POSITION"),
        height: row.opt_string("HEIGHT"),
        weight: row.opt_string("WEIGHT"),
        jersey_number: row.opt_string("NUM"),
    })
}

fn season_line(row: &Row<'_>) -> Result<SeasonLine, ProviderError> {
    Ok(SeasonLine {
        season: row.string("SEASON_ID")?,
        team: row.string_or_empty("TEAM_ABBREVIATION"),
        games_played: row.u32_or_zero("GP")?,
        games_started: row.u32_or_zero("GS")?,
        minutes: row.f64_or_zero("MIN")?,
        points: row.f64_or_zero("PTS")?,
        rebounds: row.f64_or_zero("REB")?,
        assists: row.f64_or_zero("AST")?,
        steals: row.f64_or_zero("STL")?,
        blocks: row.f64_or_zero("BLK")?,
        turnovers: row.f64_or_zero("TOV")?,
        fg_pct: row.f64_or_zero("FG_PCT")?,
        fg3_pct: row.f64_or_zero("FG3_PCT")?,
        ft_pct: row.f64_or_zero("FT_PCT")?,
    })
}

fn standings_row(row: &Row<'_>) -> Result<StandingsRow, ProviderError> {
    Ok(StandingsRow {
        team_id: row.u64("TeamID")?,
        team_name: joined_name(row, "TeamCity", "TeamName")?,
        conference: row.string("Conference")?,
        wins: row.u32_or_zero("WINS")?,
        losses: row.u32_or_zero("LOSSES")?,
        win_pct: row.f64_or_zero("WinPCT")?,
        games_behind: row.opt_string("GamesBehind"),
        conference_rank: row.u32_or_zero("PlayoffRank")?,
        home_record: row.opt_string("HOME"),
        road_record: row.opt_string("ROAD"),
    })
}

fn league_line(row: &Row<'_>) -> Result<LeagueStatLine, ProviderError> {
    Ok(LeagueStatLine {
        player_id: row.u64("PLAYER_ID")?,
        player_name: row.string("PLAYER_NAME")?,
        team: row.string_or_empty("TEAM_ABBREVIATION"),
        games_played: row.u32_or_zero("GP")?,
        points: row.f64_or_zero("PTS")?,
        rebounds: row.f64_or_zero("REB")?,
        assists: row.f64_or_zero("AST")?,
    })
}

fn player_listing(row: &Row<'_>) -> Result<PlayerListing, ProviderError> {
    let team_id = match row.get("TEAM_ID") {
        Some(_) => row.u64("TEAM_ID")?,
        None => 0,
    };
    Ok(PlayerListing {
        id: row.u64("PERSON_ID")?,
        name: row.string("DISPLAY_FIRST_LAST")?,
        team_id,
        team_name: if team_id == 0 {
            String::new()
        } else {
            joined_name(row, "TEAM_CITY", "TEAM_NAME")?
        },
        team_abbreviation: row.string_or_empty("TEAM_ABBREVIATION"),
        position: row.opt_string("POSITION"),
        jersey_number: row.opt_string("JERSEY"),
    })
}

/// Upstream reports season point totals; the payload carries the average.
fn team_season(key: &ResourceKey, row: &Row<'_>) -> Result<TeamSeasonStats, ProviderError> {
    let wins = row.u32_or_zero("WINS")?;
    let losses = row.u32_or_zero("LOSSES")?;
    let games = match row.u32_or_zero("GP")? {
        0 => wins.saturating_add(losses),
        gp => gp,
    };
    let points = row.f64_or_zero("PTS")?;

    Ok(TeamSeasonStats {
        team_id: match row.get("TEAM_ID") {
            Some(_) => row.u64("TEAM_ID")?,
            None => parse_id(key)?,
        },
        team_name: joined_name(row, "TEAM_CITY", "TEAM_NAME")?,
        season: row.string("YEAR")?,
        wins,
        losses,
        win_pct: row.f64_or_zero("WIN_PCT")?,
        points_per_game: if games == 0 {
            0.0
        } else {
            points / f64::from(games)
        },
    })
}

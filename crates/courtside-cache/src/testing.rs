//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::key::ResourceKey;
use crate::provider::StatsProvider;
use crate::retry::FetchOutcome;

/// Replays scripted outcomes, then repeats `exhausted` forever.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<FetchOutcome>>,
    exhausted: FetchOutcome,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Vec<FetchOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            exhausted: Err(ProviderError::Network {
                message: "script exhausted".into(),
            }),
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn failing(error: ProviderError) -> Self {
        Self::new(vec![]).then_always(Err(error))
    }

    pub(crate) fn then_always(mut self, outcome: FetchOutcome) -> Self {
        self.exhausted = outcome;
        self
    }

    /// Sleep before answering, to keep a fetch in flight.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsProvider for ScriptedProvider {
    async fn fetch(&self, _key: &ResourceKey) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.exhausted.clone())
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub(crate) mod fixtures {
    use crate::types::{
        Payload, PlayerProfile, Roster, RosterPlayer, SeasonLine, Standings, StandingsRow, Team,
    };

    pub(crate) fn season_line(points: f64) -> SeasonLine {
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

    pub(crate) fn player_stats(player_id: u64, points: f64) -> Payload {
        Payload::PlayerStats(PlayerProfile {
            player_id,
            current_season: Some(season_line(points)),
            career: vec![],
        })
    }

    pub(crate) fn standings() -> Payload {
        standings_with_wins(64)
    }

    pub(crate) fn standings_with_wins(wins: u32) -> Payload {
        Payload::Standings(Standings::from_rows(vec![
            StandingsRow {
                team_id: 1610612738,
                team_name: "Boston Celtics".into(),
                conference: "East".into(),
                wins,
                losses: 18,
                win_pct: 0.78,
                games_behind: Some("0.0".into()),
                conference_rank: 1,
                home_record: Some("37-4".into()),
                road_record: Some("27-14".into()),
            },
            StandingsRow {
                team_id: 1610612760,
                team_name: "Oklahoma City Thunder".into(),
                conference: "West".into(),
                wins: 57,
                losses: 25,
                win_pct: 0.695,
                games_behind: Some("0.0".into()),
                conference_rank: 1,
                home_record: Some("33-8".into()),
                road_record: Some("24-17".into()),
            },
        ]))
    }

    pub(crate) fn teams() -> Payload {
        Payload::Teams(vec![
            Team {
                id: 1610612747,
                full_name: "Los Angeles Lakers".into(),
                abbreviation: "LAL".into(),
                nickname: "Lakers".into(),
                city: "Los Angeles".into(),
                state: "California".into(),
                year_founded: Some(1948),
            },
            Team {
                id: 1610612738,
                full_name: "Boston Celtics".into(),
                abbreviation: "BOS".into(),
                nickname: "Celtics".into(),
                city: "Boston".into(),
                state: "Massachusetts".into(),
                year_founded: Some(1946),
            },
        ])
    }

    pub(crate) fn roster(team_id: u64) -> Payload {
        Payload::Roster(Roster {
            team_id,
            players: vec![RosterPlayer {
                id: 2544,
                name: "LeBron James".into(),
                position: Some("F".into()),
                height: Some("6-9".into()),
                weight: Some("250".into()),
                jersey_number: Some("23".into()),
            }],
        })
    }
}

use std::time::Duration;

use courtside_cache::{EngineConfig, EntryStatus};
use serde::Serialize;

use super::super::args::StatusArgs;
use crate::exit_codes;

#[derive(Serialize)]
struct StatusRow {
    key: String,
    fetched_at: String,
    age_secs: u64,
    ttl_secs: u64,
    fresh: bool,
}

impl From<&EntryStatus> for StatusRow {
    fn from(status: &EntryStatus) -> Self {
        Self {
            key: status.key.to_string(),
            fetched_at: status.fetched_at.to_rfc3339(),
            age_secs: status.age.as_secs(),
            ttl_secs: status.ttl.as_secs(),
            fresh: status.fresh,
        }
    }
}

pub async fn run(args: StatusArgs, config: &EngineConfig) -> anyhow::Result<i32> {
    let engine = match config.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    let entries = match engine.status().await {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    if args.json {
        let rows: Vec<StatusRow> = entries.iter().map(StatusRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(exit_codes::SUCCESS);
    }

    if entries.is_empty() {
        println!("no cached entries");
        return Ok(exit_codes::SUCCESS);
    }

    for entry in &entries {
        println!(
            "{:<28} {:>12} / {:<8} {}",
            entry.key.to_string(),
            short(entry.age),
            short(entry.ttl),
            if entry.fresh { "fresh" } else { "stale" }
        );
    }
    Ok(exit_codes::SUCCESS)
}

/// Whole-second humantime rendering, e.g. `2h 5m 3s`.
fn short(d: Duration) -> String {
    humantime::format_duration(Duration::from_secs(d.as_secs())).to_string()
}

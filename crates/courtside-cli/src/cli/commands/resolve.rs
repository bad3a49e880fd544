use chrono::{DateTime, Utc};
use courtside_cache::{EngineConfig, Payload, RefreshMode, ResourceKey};
use serde::Serialize;

use super::super::args::ResolveArgs;
use crate::exit_codes;

#[derive(Serialize)]
struct ResolveOutput<'a> {
    key: &'a ResourceKey,
    source: String,
    fetched_at: DateTime<Utc>,
    age_secs: u64,
    payload: &'a Payload,
}

pub async fn run(args: ResolveArgs, config: &EngineConfig) -> anyhow::Result<i32> {
    let key = match ResourceKey::parse(&args.key) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    let engine = match config.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    let resolved = match engine
        .resolve(&key, RefreshMode::from_force(args.force))
        .await
    {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    if resolved.is_degraded() {
        eprintln!(
            "warning: serving cached {} from {} ({})",
            resolved.key,
            resolved.fetched_at.to_rfc3339(),
            resolved.source
        );
    }

    let output = ResolveOutput {
        key: &resolved.key,
        source: resolved.source.to_string(),
        fetched_at: resolved.fetched_at,
        age_secs: resolved.age().as_secs(),
        payload: &resolved.payload,
    };
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);

    Ok(exit_codes::SUCCESS)
}

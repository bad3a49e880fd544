use std::sync::Arc;

use courtside_cache::{EngineConfig, RefreshJob, ResourceKey};

use super::super::args::SweepArgs;
use crate::exit_codes;

pub async fn run(args: SweepArgs, config: &EngineConfig) -> anyhow::Result<i32> {
    let mut job_config = config.refresh.clone();
    if !args.keys.is_empty() {
        let mut keys = Vec::with_capacity(args.keys.len());
        for raw in &args.keys {
            match ResourceKey::parse(raw) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return Ok(e.exit_code());
                }
            }
        }
        job_config = job_config.with_keys(keys);
    }

    let engine = match config.build() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    let report = RefreshJob::new(engine, job_config).tick().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed.is_empty() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::UNRESOLVED)
    }
}

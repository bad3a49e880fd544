use std::sync::Arc;
use std::time::Duration;

use courtside_cache::{seed_store, EngineConfig, RefreshJob, SeedFile, Validator};
use tracing::info;

use super::super::args::RunArgs;
use crate::exit_codes;

/// Long-running mode: prime from the configured seed file, then sweep on
/// a fixed interval until Ctrl-C.
pub async fn run(args: RunArgs, config: &EngineConfig) -> anyhow::Result<i32> {
    let engine = match config.build() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    if let Some(path) = &config.seed_file {
        let seeded = match SeedFile::from_path(path) {
            Ok(seed) => seed_store(engine.store().as_ref(), &seed, &Validator::default()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = seeded {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    }

    let job = RefreshJob::new(engine, config.refresh.clone());
    let sweeps = job
        .run_until(Duration::from_secs(args.interval_secs), async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    info!(sweeps, "refresh loop stopped");
    Ok(exit_codes::SUCCESS)
}

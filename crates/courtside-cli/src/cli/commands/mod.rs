use super::args::*;

pub mod resolve;
pub mod run;
pub mod seed;
pub mod status;
pub mod sweep;

use courtside_cache::EngineConfig;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(e.exit_code());
        }
    };

    match cli.cmd {
        Command::Resolve(args) => resolve::run(args, &config).await,
        Command::Sweep(args) => sweep::run(args, &config).await,
        Command::Run(args) => run::run(args, &config).await,
        Command::Seed(args) => seed::run(args, &config).await,
        Command::Status(args) => status::run(args, &config).await,
    }
}

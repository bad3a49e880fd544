use courtside_cache::{seed_store, EngineConfig, SeedFile, Validator};

use super::super::args::SeedArgs;
use crate::exit_codes;

pub async fn run(args: SeedArgs, config: &EngineConfig) -> anyhow::Result<i32> {
    let Some(path) = args.file.or_else(|| config.seed_file.clone()) else {
        eprintln!("error: no seed file given and none configured (seed_file)");
        return Ok(exit_codes::USAGE_ERROR);
    };

    let result = match (SeedFile::from_path(&path), config.file_store()) {
        (Ok(seed), Ok(store)) => seed_store(&store, &seed, &Validator::default()).await,
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match result {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(e.exit_code())
        }
    }
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "courtside",
    version,
    about = "Staleness-aware cache in front of an upstream sports statistics source"
)]
pub struct Cli {
    /// YAML config file (environment variables still override it)
    #[arg(long, global = true, env = "COURTSIDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve one key and print the payload as JSON
    Resolve(ResolveArgs),
    /// Run one proactive refresh sweep
    Sweep(SweepArgs),
    /// Sweep on a fixed interval until Ctrl-C
    Run(RunArgs),
    /// Prime the store from a YAML or JSON seed file
    Seed(SeedArgs),
    /// List cached keys with age and freshness
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Resource key, e.g. `standings`, `roster:1610612747`, `player-stats:2544`
    pub key: String,

    /// Bypass the TTL and go upstream
    #[arg(long)]
    pub force: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Keys to sweep instead of the configured ones
    #[arg(long = "key", value_name = "KEY")]
    pub keys: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Seconds between sweeps
    #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// Seed file; defaults to `seed_file` from the config
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

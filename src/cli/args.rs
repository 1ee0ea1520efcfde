use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Parental content monitoring daemon with sandboxed enforcement hand-off"
)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the canonical rules file (TOML)
    #[arg(long = "rules", value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Path of the shared snapshot hand-off file
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Seconds between periodic sync cycles
    #[arg(long = "sync-interval", value_name = "SECONDS")]
    pub sync_interval_secs: Option<u64>,
}

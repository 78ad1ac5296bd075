use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "pbs-accounting",
    version,
    about = "Load PBS accounting logs into the accounting table"
)]
pub struct CliArgs {
    /// Read DB connection parameters from this TOML file (overrides other options)
    #[arg(short = 'f', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Create the accounting table and its indexes if missing
    #[arg(short = 'c', long = "create-table")]
    pub create_table: bool,

    /// Storage engine to use: sqlite or mysql
    #[arg(short = 'e', long = "db-engine", default_value = "sqlite")]
    pub engine: String,

    /// Database to connect to (file path for sqlite)
    #[arg(short = 'D', long = "db")]
    pub db: Option<String>,

    /// Database server host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// User for connecting to the database
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Password for connecting to the database
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// TOML file with [[rules]] mapping users/groups to VO and role
    #[arg(long)]
    pub identity_rules: Option<PathBuf>,

    /// Diagnostic verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: Level,

    /// PBS accounting log files
    pub logs: Vec<PathBuf>,
}

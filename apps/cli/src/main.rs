mod args;
mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use accounting_db::Db;
use anyhow::{Context, Result};
use args::CliArgs;
use clap::Parser;
use config::{StorageEngine, StoreConfig};
use ingest::{IngestOptions, IngestStats, ingest_files};
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use tracing::{Level, debug, error, info, warn};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    register_logging(args.log_level);

    match run(&args) {
        Ok(stats) if stats.all_rejected() => {
            error!(
                rejected = stats.lines_rejected,
                "no accounting records were stored"
            );
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn register_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn register_cancel_flag() -> Result<Arc<AtomicBool>> {
    let cancel = Arc::new(AtomicBool::new(false));
    for signal in TERM_SIGNALS {
        // A second signal while the first is still being honoured exits at once.
        flag::register_conditional_shutdown(*signal, 1, Arc::clone(&cancel))
            .context("register shutdown handler")?;
        flag::register(*signal, Arc::clone(&cancel)).context("register cancel handler")?;
    }
    Ok(cancel)
}

fn open_store(store: &StoreConfig) -> Result<Db> {
    match store.engine {
        StorageEngine::Sqlite => {
            if store.host.is_some() || store.user.is_some() || store.password.is_some() {
                debug!("host/user/password are not used by the sqlite engine");
            }
            Db::open(&store.db).with_context(|| format!("open accounting store {}", store.db))
        }
    }
}

fn run(args: &CliArgs) -> Result<IngestStats> {
    let config = config::resolve(args)?;
    debug!(store = ?config.store, rules = config.resolver.rules().len(), "resolved configuration");
    let cancel = register_cancel_flag()?;
    run_with(config, cancel)
}

fn run_with(config: config::RunConfig, cancel: Arc<AtomicBool>) -> Result<IngestStats> {
    let mut db = open_store(&config.store)?;
    if config.create_table {
        db.ensure_schema().context("create accounting table")?;
    }
    if config.logs.is_empty() {
        info!("no log files given");
        return Ok(IngestStats::default());
    }

    let options = IngestOptions::new(config.resolver).with_cancel(cancel);
    let stats = ingest_files(&mut db, &config.logs, &options).context("ingest accounting logs")?;
    report_summary(&stats);
    Ok(stats)
}

fn report_summary(stats: &IngestStats) {
    if stats.cancelled {
        warn!("ingest cancelled; remaining lines were not processed");
    }
    info!(
        files = stats.files_scanned,
        skipped_files = stats.files_skipped,
        lines = stats.lines_read,
        exit_events = stats.exit_events,
        stored = stats.records_upserted,
        rejected = stats.lines_rejected,
        "summary"
    );
}

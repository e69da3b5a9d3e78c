//! Task Manager
//!
//! A single-user task tracker with an HTML interface and a read-only JSON
//! API, backed by SQLite.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use task_manager::cli::export::{self, ExportArgs};
use task_manager::cli::{Cli, Command};
use task_manager::config::{Config, ConfigLoader, ConfigPaths};
use task_manager::db::Database;
use task_manager::logging::{self, LogTarget};
use task_manager::web::{self, AppState};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    // An explicit --config wins over TASK_MANAGER_CONFIG_PATH
    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_explicit_file(config_path);
    }
    let mut loader = ConfigLoader::load_with_paths(paths)?;

    // Override settings from CLI arguments
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let config = loader.into_config();
    debug!(?config, "Effective configuration");

    match cli.command {
        Some(Command::Export(args)) => run_export(&config, &args),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    Database::open(&config.server.db_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.server.db_path.display()
        )
    })
}

async fn run_server(config: Config) -> Result<()> {
    info!("Starting Task Manager v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);

    let db = open_database(&config)?;
    let state = AppState::new(Arc::new(db));

    let handle = web::start_server(state, &config.server.host, config.server.port).await?;
    info!("Open http://{} in a browser", handle.addr());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C");

    handle.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

fn run_export(config: &Config, args: &ExportArgs) -> Result<()> {
    let db = open_database(config)?;
    let written = export::run(&db, args)?;

    if let Some(path) = &args.output {
        info!("Exported {} bytes to {}", written, path.display());
    }
    Ok(())
}

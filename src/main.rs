//! Playground tree server
//!
//! Serves the ordered container tree and kanban boards over a JSON HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use playground_tree::api;
use playground_tree::cli::{Cli, Command, ServeArgs};
use playground_tree::config::Config;
use playground_tree::db::Database;
use playground_tree::logging::{self, LogTarget};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn open_database(config: &Config) -> Result<Database> {
    config
        .ensure_db_dir()
        .with_context(|| format!("creating directory for {}", config.server.db_path.display()))?;
    let db = Database::open_with_timeout(
        &config.server.db_path,
        Duration::from_millis(config.server.busy_timeout_ms),
    )?
    .with_max_depth(config.tree.max_depth);
    Ok(db)
}

async fn run_server(config: Config, args: ServeArgs) -> Result<()> {
    let bind = args.bind.unwrap_or(config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind, port))?;

    let db = open_database(&config)?;
    info!(db_path = %config.server.db_path.display(), max_depth = config.tree.max_depth, "Database ready");

    api::serve(Arc::new(db), addr).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    match cli.command {
        Some(Command::Init) => {
            open_database(&config)?;
            info!(db_path = %config.server.db_path.display(), "Database initialized");
        }
        Some(Command::Serve(args)) => run_server(config, args).await?,
        None => run_server(config, ServeArgs::default()).await?,
    }

    Ok(())
}

//! triage-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite ticket store, rebuilds the live queue from it, and serves the JSON
//! API over HTTP. A background task re-syncs with the store every
//! `sync_interval_secs` so tickets written by other processes show up.

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use triage_core::QueueManager;
use triage_store_sqlite::SqliteStore;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Triage walk-in queue server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let manager = Arc::new(QueueManager::new(store, server_cfg.queue()));

  // A failed first load leaves an empty queue; the periodic sync retries.
  match manager.sync().await {
    Ok(report) => tracing::info!(
      day = %report.day,
      waiting = report.waiting,
      serving = report.serving,
      "loaded queue"
    ),
    Err(e) => tracing::error!(error = %e, "initial sync failed, starting empty"),
  }

  if server_cfg.sync_interval_secs > 0 {
    tokio::spawn(sync_periodically(
      manager.clone(),
      Duration::from_secs(server_cfg.sync_interval_secs),
    ));
  }

  let app = triage_api::api_router(manager).layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shut down");
  Ok(())
}

/// Reconcile the live queue with the store on a fixed period. `sync` logs
/// its own failures and keeps the existing queue, so errors only skip a tick.
async fn sync_periodically(manager: Arc<QueueManager<SqliteStore>>, period: Duration) {
  let mut ticker = tokio::time::interval(period);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  // The first tick fires immediately; startup already synced.
  ticker.tick().await;
  loop {
    ticker.tick().await;
    if let Err(e) = manager.sync().await {
      tracing::debug!(error = %e, "periodic sync skipped");
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

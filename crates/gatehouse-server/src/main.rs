//! Gatehouse server binary.
//!
//! Reads `gatehouse.toml` (or the path given with `--config`), opens the
//! SQLite store, optionally loads a JSON seed fixture, and serves the JSON
//! API over HTTP.

mod settings;
mod seed;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use gatehouse_core::AccessControl;
use gatehouse_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Gatehouse access-control server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gatehouse.toml")]
  config: PathBuf,

  /// JSON fixture of users, areas and permissions to load into an empty store.
  #[arg(long)]
  seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;
  let offset = server_cfg.offset()?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = &cli.seed {
    let data = seed::read(path)?;
    seed::apply(&store, data).await.context("failed to load seed")?;
  }

  let engine = Arc::new(AccessControl::new(Arc::new(store)).with_offset(offset));
  let app = gatehouse_api::api_router(engine);
  let address = server_cfg.address();

  tracing::info!(%offset, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

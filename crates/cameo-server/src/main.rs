//! cameo server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP.
//!
//! # Importing data
//!
//! To load an upstream appearance dump into the configured store and exit:
//!
//! ```sh
//! cargo run -p cameo-server -- --import appearances.json
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cameo_core::{dataset::Dataset, media::{BlobLocator, PageManifest}};
use cameo_engine::Engine;
use cameo_server::{ServerConfig, expand_tilde, spawn_cache_purger};
use cameo_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cameo identity-aggregation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Import an appearance dataset (JSON) into the store and exit.
  #[arg(long, value_name = "DATASET")]
  import: Option<PathBuf>,
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

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: ingest a dataset and exit.
  if let Some(path) = cli.import {
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read {path:?}"))?;
    let dataset = Dataset::from_json(&raw).with_context(|| format!("failed to parse {path:?}"))?;
    let summary = store.import(&dataset).await.context("import failed")?;
    println!(
      "imported {} people and {} appearances ({} entries and {} appearances skipped) at {}",
      summary.people,
      summary.appearances,
      dataset.skipped_entries,
      dataset.skipped_appearances,
      summary.ingested_at.to_rfc3339(),
    );
    return Ok(());
  }

  let locator = BlobLocator::new(server_cfg.blob_base_url.clone(), server_cfg.asset_version.clone());
  let mut engine = Engine::new(Arc::new(store), server_cfg.engine.clone(), locator);

  if let Some(path) = &server_cfg.manifest_path {
    let path = expand_tilde(path);
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read manifest {path:?}"))?;
    let manifest = PageManifest::from_json(&raw).with_context(|| format!("failed to parse manifest {path:?}"))?;
    tracing::info!(documents = manifest.document_count(), "loaded page manifest");
    engine = engine.with_manifest(manifest);
  }

  if let Some(every) = server_cfg.cache_purge_interval() {
    spawn_cache_purger(engine.clone(), every);
  }

  let app = cameo_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

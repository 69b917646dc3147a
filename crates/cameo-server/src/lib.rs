//! HTTP server assembly for cameo.
//!
//! Mounts the [`cameo_api`] router under `/api`, adds `/health` and request
//! tracing. Configuration is deserialised into [`ServerConfig`].

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::{Router, routing::get};
use cameo_core::store::{AppearanceStore, PersonDirectory};
use cameo_engine::{Engine, EngineConfig};
use serde::Deserialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::debug;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CAMEO_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  /// Public base URL of the blob store holding page images.
  pub blob_base_url:    String,
  /// Cache-busting suffix appended to blob URLs.
  pub asset_version:    Option<String>,
  /// Optional page manifest mapping document pages to image keys.
  pub manifest_path:    Option<PathBuf>,
  /// Seconds between sweeps of expired cache entries; `0` disables them.
  pub cache_purge_secs: u64,
  pub engine:           EngineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".to_owned(),
      port:             8080,
      store_path:       PathBuf::from("cameo.db"),
      blob_base_url:    "/blobs".to_owned(),
      asset_version:    None,
      manifest_path:    None,
      cache_purge_secs: 300,
      engine:           EngineConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer an optional TOML file under `CAMEO_*` environment variables.
  /// Nested keys use `__`, e.g. `CAMEO_ENGINE__FEED__MAX_AUTHORS`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CAMEO").separator("__"))
      .build()?
      .try_deserialize()
  }

  pub fn cache_purge_interval(&self) -> Option<Duration> {
    (self.cache_purge_secs > 0).then(|| Duration::from_secs(self.cache_purge_secs))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Cache upkeep ─────────────────────────────────────────────────────────────

/// Sweep expired entries out of `engine`'s caches every `every`.
///
/// Entries expire on read anyway; the sweep bounds memory held by keys that
/// are never read again, such as deep feed cursors.
pub fn spawn_cache_purger<S>(engine: Engine<S>, every: Duration) -> JoinHandle<()>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
      ticks.tick().await;
      let purged = engine.purge_expired();
      if purged > 0 {
        debug!(purged, "purged expired cache entries");
      }
    }
  })
}

// ─── Router ───────────────────────────────────────────────────────────────────

async fn health() -> &'static str { "ok" }

/// Build the full application router for `engine`.
pub fn router<S>(engine: Engine<S>) -> Router
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", cameo_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use cameo_core::{appearance::Appearance, media::BlobLocator, memory::MemoryStore, person::Person};
  use cameo_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn make_engine() -> Engine<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .upsert_person(&Person { id: "ann".into(), display_name: "Ann".into() })
      .await
      .unwrap();
    store
      .record_appearances(&[Appearance::new("EFTA1.pdf", 1, "ann", 99.9)])
      .await
      .unwrap();
    Engine::new(Arc::new(store), EngineConfig::default(), BlobLocator::new("https://b.test", Some("3".into())))
  }

  async fn oneshot(uri: &str) -> axum::response::Response {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router(make_engine().await).oneshot(req).await.unwrap()
  }

  #[tokio::test]
  async fn health_is_ok() {
    let resp = oneshot("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
  }

  #[tokio::test]
  async fn api_is_nested() {
    let resp = oneshot("/api/people/ann/avatar").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["avatar"]["url"], "https://b.test/thumbnails/EFTA1.jpg?v=3");

    assert_eq!(oneshot("/people/ann/avatar").await.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn config_file_overrides_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          port = 9001
          blob_base_url = "https://cdn.test"

          [engine]
          avatar_min_confidence = 97.5

          [engine.feed]
          excluded_authors = ["spam"]
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 9001);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.engine.avatar_min_confidence, 97.5);
    assert_eq!(cfg.engine.feed.excluded_authors, vec!["spam".to_owned()]);
    assert_eq!(cfg.engine.feed.max_authors, 400);
    assert_eq!(cfg.engine.friends.limit, 48);
  }

  #[test]
  fn missing_config_file_is_fine() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/cameo.toml")).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("cameo.db"));
    assert_eq!(cfg.cache_purge_interval(), Some(Duration::from_secs(300)));
  }

  fn memory_engine() -> Engine<MemoryStore> {
    let store = MemoryStore::new(
      vec![Person { id: "ann".into(), display_name: "Ann".into() }],
      vec![Appearance::new("EFTA1.pdf", 1, "ann", 99.9)],
    );
    Engine::new(Arc::new(store), EngineConfig::default(), BlobLocator::new("/blobs", None))
  }

  #[tokio::test(start_paused = true)]
  async fn purger_sweeps_expired_entries() {
    let swept = memory_engine();
    let unswept = memory_engine();
    swept.best_avatar("ann").await.unwrap();
    unswept.best_avatar("ann").await.unwrap();

    let purger = spawn_cache_purger(swept.clone(), Duration::from_secs(3600));
    tokio::time::advance(Duration::from_secs(8 * 24 * 3600)).await;
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }

    // Both avatars are past their week; only the swept engine let go of it.
    assert_eq!(unswept.purge_expired(), 1);
    assert_eq!(swept.purge_expired(), 0);
    purger.abort();
  }
}

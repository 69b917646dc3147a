//! Error type for `cameo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored row that cannot be turned back into a domain value.
  #[error("invalid row: {0}")]
  InvalidRow(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

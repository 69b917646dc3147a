//! Error types for `cameo-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid dataset: {0}")]
  InvalidDataset(String),

  #[error("invalid manifest: {0}")]
  InvalidManifest(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

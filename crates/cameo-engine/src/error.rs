//! Error type for `cameo-engine`.

use std::sync::Arc;

use thiserror::Error;

/// Engine failures.
///
/// `Clone` so that one failed computation can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("upstream store unavailable: {0}")]
  Upstream(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn upstream(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Upstream(Arc::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! The memoized entry points of cameo.
//!
//! [`Engine`] reads appearances through the `cameo-core` store traits, runs
//! the pure aggregation algorithms over them and keeps every derived view
//! in an injected [`cameo_cache::Memo`].

pub mod config;
pub mod engine;
pub mod error;

pub use config::{CacheTtls, EngineConfig, PostsParams, SearchParams};
pub use engine::{Avatar, Caches, Engine, SearchHit};
pub use error::{Error, Result};

//! JSON HTTP API for cameo.
//!
//! Exposes an axum [`Router`] over any [`Engine`]. Auth, TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cameo_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod etag;
pub mod feed;
pub mod people;
pub mod posts;

use std::time::Duration;

use axum::{
  Json, Router,
  http::header,
  response::{IntoResponse, Response},
  routing::get,
};
use cameo_core::store::{AppearanceStore, PersonDirectory};
use cameo_engine::Engine;
use serde::Serialize;

pub use error::ApiError;

/// How long shared caches may serve a stale copy while revalidating.
const STALE_WHILE_REVALIDATE: u64 = 86_400;

fn cache_control(max_age: Duration) -> String {
  format!(
    "public, s-maxage={}, stale-while-revalidate={STALE_WHILE_REVALIDATE}",
    max_age.as_secs()
  )
}

/// A JSON body that shared caches may keep for `max_age`.
pub(crate) fn cacheable<T: Serialize>(body: T, max_age: Duration) -> Response {
  ([(header::CACHE_CONTROL, cache_control(max_age))], Json(body)).into_response()
}

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Engine<S>) -> Router<()>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  Router::new()
    // People
    .route("/people/search", get(people::search::<S>))
    .route("/people/{id}", get(people::get_one::<S>))
    .route("/people/{id}/avatar", get(people::avatar::<S>))
    .route("/people/{id}/covers", get(people::covers::<S>))
    .route("/people/{id}/friends", get(people::friends::<S>))
    .route("/people/{id}/with", get(people::with_by_key::<S>))
    .route("/people/{id}/posts", get(people::posts::<S>))
    // Posts
    .route("/posts/{doc}/with", get(posts::co_people::<S>))
    // Feed
    .route("/feed", get(feed::handler::<S>))
    .with_state(engine)
}

//! `GET /feed[?cursor=<n>&limit=<n>]`: one page of the global feed.
//!
//! The body is the serialised [`cameo_core::feed::FeedPage`]. Responses carry
//! a strong ETag and a matching `If-None-Match` gets `304 Not Modified`.

use axum::{
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use cameo_core::store::{AppearanceStore, PersonDirectory};
use cameo_engine::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::{
  cache_control,
  error::ApiError,
  etag::{compute_etag, is_fresh},
};

#[derive(Debug, Deserialize)]
pub struct FeedParams {
  pub cursor: Option<u64>,
  pub limit:  Option<usize>,
}

pub async fn handler<S>(
  State(engine): State<Engine<S>>,
  Query(params): Query<FeedParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let page = engine.page(params.cursor.unwrap_or(0), params.limit).await?;
  let body = serde_json::to_vec(&page)?;
  let etag = compute_etag(&body);
  let cache = cache_control(engine.config().cache.feed());

  if is_fresh(&headers, &etag) {
    debug!(%etag, "feed page not modified");
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag), (header::CACHE_CONTROL, cache)]).into_response());
  }

  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/json".to_owned()),
        (header::ETAG, etag),
        (header::CACHE_CONTROL, cache),
      ],
      body,
    )
      .into_response(),
  )
}

//! `GET /posts/{doc}/with?owner=<id>[&page=<n>]`: who appears with the
//! owner on one post. Without `page` the owner's best page is used.

use axum::{
  extract::{Path, Query, State},
  response::Response,
};
use cameo_core::{
  person::PersonRef,
  store::{AppearanceStore, PersonDirectory},
};
use cameo_engine::Engine;
use serde::{Deserialize, Serialize};

use crate::{cacheable, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CoPeopleParams {
  pub owner: Option<String>,
  pub page:  Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoPeopleBody {
  pub co_people: Vec<PersonRef>,
}

pub async fn co_people<S>(
  State(engine): State<Engine<S>>,
  Path(doc): Path<String>,
  Query(params): Query<CoPeopleParams>,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let owner = params
    .owner
    .filter(|o| !o.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("missing owner".into()))?;
  let page = params.page.filter(|p| *p >= 1);

  let co_people = engine.co_people_for_post(&doc, page, &owner).await?;
  Ok(cacheable(CoPeopleBody { co_people }, engine.config().cache.with_people()))
}

//! Handlers for `/people` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/people/{id}` | `person` and `avatar` are `null` for unknown ids |
//! | `GET`  | `/people/{id}/avatar` | |
//! | `GET`  | `/people/{id}/covers` | Optional `?n=` (1–24, default 6) |
//! | `GET`  | `/people/{id}/friends` | |
//! | `GET`  | `/people/{id}/with` | Required `?keys=doc1,doc2` |
//! | `GET`  | `/people/{id}/posts` | Optional `?cursor=&limit=`; 404 for unknown ids |
//! | `GET`  | `/people/search` | `?q=` name query, optional `?limit=` |

use std::collections::BTreeMap;

use axum::{
  extract::{Path, Query, State},
  response::Response,
};
use cameo_core::{
  feed::FeedPage,
  graph::FriendEdge,
  person::{Person, PersonRef},
  store::{AppearanceStore, PersonDirectory},
};
use cameo_engine::{Avatar, Engine, SearchHit};
use serde::{Deserialize, Serialize};

use crate::{cacheable, error::ApiError};

const DEFAULT_COVERS: usize = 6;
const MAX_COVERS: usize = 24;

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProfileBody {
  pub person: Option<Person>,
  pub avatar: Option<Avatar>,
}

/// `GET /people/{id}`
pub async fn get_one<S>(State(engine): State<Engine<S>>, Path(id): Path<String>) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let person = engine.person(&id).await?;
  let avatar = match person {
    Some(_) => engine.best_avatar(&id).await?,
    None => None,
  };
  Ok(cacheable(ProfileBody { person, avatar }, engine.config().cache.names()))
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub q:     Option<String>,
  pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchBody {
  pub people: Vec<SearchHit>,
}

/// `GET /people/search?q=<text>[&limit=<n>]`
pub async fn search<S>(
  State(engine): State<Engine<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let limit = engine.config().search.limit(params.limit);
  let people = engine
    .search_people(params.q.as_deref().unwrap_or_default(), limit)
    .await?;
  Ok(cacheable(SearchBody { people }, engine.config().cache.search()))
}

// ─── Avatar & covers ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AvatarBody {
  pub avatar: Option<Avatar>,
}

/// `GET /people/{id}/avatar`
pub async fn avatar<S>(State(engine): State<Engine<S>>, Path(id): Path<String>) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let avatar = engine.best_avatar(&id).await?;
  Ok(cacheable(AvatarBody { avatar }, engine.config().cache.avatars()))
}

#[derive(Debug, Deserialize)]
pub struct CoversParams {
  pub n: Option<usize>,
}

#[derive(Serialize)]
pub struct CoversBody {
  pub covers: Vec<Avatar>,
}

/// `GET /people/{id}/covers[?n=<count>]`
pub async fn covers<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<String>,
  Query(params): Query<CoversParams>,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let n = params.n.unwrap_or(DEFAULT_COVERS).clamp(1, MAX_COVERS);
  let covers = engine.covers(&id, n).await?;
  Ok(cacheable(CoversBody { covers }, engine.config().cache.avatars()))
}

// ─── Friends ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FriendsBody {
  pub friends: Vec<FriendEdge>,
}

/// `GET /people/{id}/friends`
pub async fn friends<S>(State(engine): State<Engine<S>>, Path(id): Path<String>) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let friends = engine.build_friends(&id).await?;
  Ok(cacheable(FriendsBody { friends }, engine.config().cache.friends()))
}

// ─── Appears with, by document ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WithParams {
  pub keys: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithBody {
  pub with_by_key: BTreeMap<String, Vec<PersonRef>>,
}

/// `GET /people/{id}/with?keys=<doc>,<doc>`
pub async fn with_by_key<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<String>,
  Query(params): Query<WithParams>,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let keys: Vec<String> = params
    .keys
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .map(str::to_owned)
    .collect();
  if keys.is_empty() {
    return Err(ApiError::BadRequest("missing keys".into()));
  }

  let with_by_key = engine.co_people_for_documents(&id, &keys).await?;
  Ok(cacheable(WithBody { with_by_key }, engine.config().cache.with_people()))
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PostsParams {
  pub cursor: Option<u64>,
  pub limit:  Option<usize>,
}

/// `GET /people/{id}/posts[?cursor=<n>&limit=<n>]`
pub async fn posts<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<String>,
  Query(params): Query<PostsParams>,
) -> Result<Response, ApiError>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  let page: FeedPage = engine
    .person_posts(&id, params.cursor.unwrap_or(0), params.limit)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("person {id}")))?;
  Ok(cacheable(page, engine.config().cache.posts()))
}

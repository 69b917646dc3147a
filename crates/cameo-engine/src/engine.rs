//! [`Engine`]: store reads, aggregation and memoization in one place.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  sync::Arc,
};

use cameo_cache::{Memo, TtlCache, cached};
use cameo_core::{
  annotate::{self, CoPeopleParams},
  appearance::Appearance,
  feed::{self, AuthorQueue, FeedItem, FeedPage},
  graph::{FriendEdge, co_occurrence_weights},
  index::PageIndex,
  media::{BlobLocator, PageManifest},
  person::{Person, PersonRef, search_names},
  select::{best_appearance, best_appearances},
  store::{AppearanceStore, PersonDirectory},
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EngineConfig, Error, Result};

// ─── Output types ────────────────────────────────────────────────────────────

/// A person's representative image: the page it was cut from and where to
/// fetch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
  pub person_id:   String,
  pub document_id: String,
  pub page:        u32,
  pub confidence:  f64,
  pub url:         String,
}

/// One name-search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
  pub id:           String,
  pub display_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url:   Option<String>,
}

/// Everything the feed is drawn from, built once per index lifetime.
#[derive(Debug, Clone)]
pub struct FeedSource {
  pub index:  PageIndex,
  pub queues: Vec<AuthorQueue>,
}

type Shared<V> = Arc<dyn Memo<V, Error>>;

/// One memo per derived view.
#[derive(Clone)]
pub struct Caches {
  pub avatars:        Shared<Option<Avatar>>,
  pub covers:         Shared<Vec<Avatar>>,
  pub friends:        Shared<Vec<FriendEdge>>,
  pub co_people:      Shared<Vec<PersonRef>>,
  pub co_people_many: Shared<BTreeMap<String, Vec<PersonRef>>>,
  pub names:          Shared<Arc<HashMap<String, String>>>,
  pub feed_source:    Shared<Arc<FeedSource>>,
  pub feed_pages:     Shared<FeedPage>,
  pub person_posts:   Shared<Option<FeedPage>>,
  pub search:         Shared<Vec<SearchHit>>,
}

fn ttl_cache<V>() -> Shared<V>
where
  V: Clone + Send + Sync + 'static,
{
  Arc::new(TtlCache::<V, Error>::new())
}

impl Caches {
  /// Fresh in-process caches.
  pub fn in_memory() -> Self {
    Self {
      avatars:        ttl_cache(),
      covers:         ttl_cache(),
      friends:        ttl_cache(),
      co_people:      ttl_cache(),
      co_people_many: ttl_cache(),
      names:          ttl_cache(),
      feed_source:    ttl_cache(),
      feed_pages:     ttl_cache(),
      person_posts:   ttl_cache(),
      search:         ttl_cache(),
    }
  }

  /// Drop expired entries from every cache. Returns how many went.
  pub fn purge_expired(&self) -> usize {
    self.avatars.purge_expired()
      + self.covers.purge_expired()
      + self.friends.purge_expired()
      + self.co_people.purge_expired()
      + self.co_people_many.purge_expired()
      + self.names.purge_expired()
      + self.feed_source.purge_expired()
      + self.feed_pages.purge_expired()
      + self.person_posts.purge_expired()
      + self.search.purge_expired()
  }
}

fn upstream(e: impl std::error::Error + Send + Sync + 'static) -> Error {
  warn!(error = %e, "store request failed");
  Error::upstream(e)
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Memoized entry points over a store `S`.
///
/// Cloning is cheap; clones share the store and the caches.
pub struct Engine<S> {
  store:    Arc<S>,
  config:   Arc<EngineConfig>,
  caches:   Caches,
  locator:  Arc<BlobLocator>,
  manifest: Option<Arc<PageManifest>>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      config:   Arc::clone(&self.config),
      caches:   self.caches.clone(),
      locator:  Arc::clone(&self.locator),
      manifest: self.manifest.clone(),
    }
  }
}

impl<S> Engine<S>
where
  S: AppearanceStore + PersonDirectory + 'static,
{
  pub fn new(store: Arc<S>, config: EngineConfig, locator: BlobLocator) -> Self {
    Self {
      store,
      config: Arc::new(config),
      caches: Caches::in_memory(),
      locator: Arc::new(locator),
      manifest: None,
    }
  }

  pub fn with_manifest(mut self, manifest: PageManifest) -> Self {
    self.manifest = Some(Arc::new(manifest));
    self
  }

  pub fn with_caches(mut self, caches: Caches) -> Self {
    self.caches = caches;
    self
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Drop expired cache entries; see [`Caches::purge_expired`].
  pub fn purge_expired(&self) -> usize { self.caches.purge_expired() }

  fn avatar_for(&self, a: Appearance) -> Avatar {
    let url = self
      .locator
      .page_image_url(self.manifest.as_deref(), &a.document_id, a.page);
    Avatar {
      person_id: a.person_id,
      document_id: a.document_id,
      page: a.page,
      confidence: a.confidence,
      url,
    }
  }

  fn image_url(&self, document_id: &str, page: u32) -> String {
    self
      .locator
      .page_image_url(self.manifest.as_deref(), document_id, page)
  }

  // ─── People ────────────────────────────────────────────────────────────────

  /// The person behind `person_id`, or `None` if the id is unknown.
  pub async fn person(&self, person_id: &str) -> Result<Option<Person>> {
    let name = self
      .store
      .resolve_display_name(person_id)
      .await
      .map_err(upstream)?;
    Ok(name.map(|display_name| Person { id: person_id.to_owned(), display_name }))
  }

  /// id → display name for everybody, cached.
  async fn names(&self) -> Result<Arc<HashMap<String, String>>> {
    let engine = self.clone();
    cached(&self.caches.names, "names".to_owned(), self.config.cache.names(), move || async move {
      let people = engine.store.list_people().await.map_err(upstream)?;
      debug!(people = people.len(), "loaded name directory");
      Ok(Arc::new(
        people
          .into_iter()
          .map(|p| (p.id, p.display_name))
          .collect::<HashMap<_, _>>(),
      ))
    })
    .await
  }

  fn person_refs(names: &HashMap<String, String>, people: Vec<annotate::ScoredPerson>) -> Vec<PersonRef> {
    people
      .into_iter()
      .map(|p| {
        let display_name = names.get(&p.person_id).cloned().unwrap_or_else(|| p.person_id.clone());
        PersonRef { id: p.person_id, display_name }
      })
      .collect()
  }

  /// Up to `limit` people whose name matches `query`, each with an avatar
  /// URL when one qualifies.
  pub async fn search_people(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return Ok(Vec::new());
    }

    let engine = self.clone();
    let key = format!("search:{limit}:{query}");
    cached(&self.caches.search, key, self.config.cache.search(), move || async move {
      let names = engine.names().await?;
      let matches = search_names(names.iter().map(|(id, name)| (id.as_str(), name.as_str())), &query, limit);
      let avatars = try_join_all(matches.iter().map(|p| engine.best_avatar(&p.id))).await?;
      debug!(query = %query, hits = matches.len(), "searched names");

      Ok(
        matches
          .into_iter()
          .zip(avatars)
          .map(|(p, avatar)| SearchHit {
            id:           p.id,
            display_name: p.display_name,
            avatar_url:   avatar.map(|a| a.url),
          })
          .collect(),
      )
    })
    .await
  }

  // ─── Avatars ───────────────────────────────────────────────────────────────

  /// The single best appearance of `person_id` as an avatar, if any reaches
  /// the avatar floor.
  pub async fn best_avatar(&self, person_id: &str) -> Result<Option<Avatar>> {
    let engine = self.clone();
    let id = person_id.to_owned();
    cached(
      &self.caches.avatars,
      format!("avatar:{person_id}"),
      self.config.cache.avatars(),
      move || async move {
        let appearances = engine
          .store
          .appearances_for_person(&id)
          .await
          .map_err(upstream)?;
        let best = best_appearance(&appearances, engine.config.avatar_min_confidence);
        Ok(best.map(|a| engine.avatar_for(a)))
      },
    )
    .await
  }

  /// Up to `n` distinct pages showing `person_id`, best first.
  pub async fn covers(&self, person_id: &str, n: usize) -> Result<Vec<Avatar>> {
    let engine = self.clone();
    let id = person_id.to_owned();
    cached(
      &self.caches.covers,
      format!("covers:{person_id}:{n}"),
      self.config.cache.avatars(),
      move || async move {
        let appearances = engine
          .store
          .appearances_for_person(&id)
          .await
          .map_err(upstream)?;
        Ok(
          best_appearances(&appearances, engine.config.avatar_min_confidence, n)
            .into_iter()
            .map(|a| engine.avatar_for(a))
            .collect(),
        )
      },
    )
    .await
  }

  // ─── Friend graph ──────────────────────────────────────────────────────────

  /// The weighted co-occurrence edges out of `owner_id`.
  pub async fn build_friends(&self, owner_id: &str) -> Result<Vec<FriendEdge>> {
    let engine = self.clone();
    let id = owner_id.to_owned();
    cached(
      &self.caches.friends,
      format!("friends:{owner_id}"),
      self.config.cache.friends(),
      move || async move { engine.compute_friends(&id).await },
    )
    .await
  }

  async fn compute_friends(&self, owner_id: &str) -> Result<Vec<FriendEdge>> {
    let params = &self.config.friends;
    let owned = self
      .store
      .appearances_for_person(owner_id)
      .await
      .map_err(upstream)?;

    // Only documents with a presence event can contribute an edge.
    let documents: Vec<String> = owned
      .iter()
      .filter(|a| a.is_well_formed() && a.confidence >= params.min_conf_owner)
      .map(|a| a.document_id.clone())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    if documents.is_empty() {
      return Ok(Vec::new());
    }

    let appearances = self
      .store
      .appearances_for_documents(&documents)
      .await
      .map_err(upstream)?;
    let index = PageIndex::build(&appearances);
    let weighted = co_occurrence_weights(&index, owner_id, params);
    debug!(owner = owner_id, documents = documents.len(), edges = weighted.len(), "built friend graph");

    let names = self.names().await?;
    let avatars = try_join_all(weighted.iter().map(|w| self.best_avatar(&w.person_id))).await?;

    Ok(
      weighted
        .into_iter()
        .zip(avatars)
        .map(|(w, avatar)| FriendEdge {
          display_name:    names.get(&w.person_id).cloned().unwrap_or_else(|| w.person_id.clone()),
          other_person_id: w.person_id,
          weight:          w.weight,
          avatar_url:      avatar.map(|a| a.url),
        })
        .collect(),
    )
  }

  // ─── Co-people ─────────────────────────────────────────────────────────────

  /// Who appears with `owner_id` around `page` of `document_id`. Without a
  /// page, the owner's best page in the document is used.
  pub async fn co_people_for_post(
    &self,
    document_id: &str,
    page: Option<u32>,
    owner_id: &str,
  ) -> Result<Vec<PersonRef>> {
    let engine = self.clone();
    let doc = document_id.to_owned();
    let owner = owner_id.to_owned();
    let slot = match page {
      Some(p) => p.to_string(),
      None => "best".to_owned(),
    };
    cached(
      &self.caches.co_people,
      format!("with:{owner_id}:{document_id}:{slot}"),
      self.config.cache.with_people(),
      move || async move {
        let params = &engine.config.with_people;
        let appearances = engine
          .store
          .appearances_for_documents(std::slice::from_ref(&doc))
          .await
          .map_err(upstream)?;
        let index = PageIndex::build(&appearances);
        let page = page.unwrap_or_else(|| annotate::preview_page(&index, &doc, &owner, params.min_conf_owner));
        let scored = annotate::co_people_for_post(&index, &doc, page, &owner, params);
        let names = engine.names().await?;
        Ok(Self::person_refs(&names, scored))
      },
    )
    .await
  }

  /// [`Self::co_people_for_post`] for several documents at once, each at the
  /// owner's best page. Unknown documents map to an empty list.
  pub async fn co_people_for_documents(
    &self,
    owner_id: &str,
    document_ids: &[String],
  ) -> Result<BTreeMap<String, Vec<PersonRef>>> {
    let keys: Vec<String> = document_ids
      .iter()
      .filter(|d| !d.is_empty())
      .cloned()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    if keys.is_empty() {
      return Ok(BTreeMap::new());
    }

    let engine = self.clone();
    let owner = owner_id.to_owned();
    let cache_key = format!("with-docs:{owner_id}:{}", keys.join(","));
    cached(
      &self.caches.co_people_many,
      cache_key,
      self.config.cache.with_people(),
      move || async move {
        let params = &engine.config.with_people;
        let appearances = engine
          .store
          .appearances_for_documents(&keys)
          .await
          .map_err(upstream)?;
        let index = PageIndex::build(&appearances);
        let names = engine.names().await?;

        Ok(
          keys
            .into_iter()
            .map(|doc| {
              let page = annotate::preview_page(&index, &doc, &owner, params.min_conf_owner);
              let scored = annotate::co_people_for_post(&index, &doc, page, &owner, params);
              (doc, Self::person_refs(&names, scored))
            })
            .collect(),
        )
      },
    )
    .await
  }

  // ─── Timeline ──────────────────────────────────────────────────────────────

  /// One page of `person_id`'s own documents, newest first by document
  /// number, starting `cursor` documents in. `None` for an unknown person.
  pub async fn person_posts(
    &self,
    person_id: &str,
    cursor: u64,
    page_size: Option<usize>,
  ) -> Result<Option<FeedPage>> {
    let size = self.config.posts.page_size(page_size);
    let engine = self.clone();
    let id = person_id.to_owned();
    cached(
      &self.caches.person_posts,
      format!("posts:{person_id}:{cursor}:{size}"),
      self.config.cache.posts(),
      move || async move { engine.compute_person_posts(&id, cursor, size).await },
    )
    .await
  }

  async fn compute_person_posts(&self, person_id: &str, cursor: u64, size: usize) -> Result<Option<FeedPage>> {
    let Some(owner_name) = self
      .store
      .resolve_display_name(person_id)
      .await
      .map_err(upstream)?
    else {
      return Ok(None);
    };

    let floor = self.config.posts.min_confidence;
    let owned = self
      .store
      .appearances_for_person(person_id)
      .await
      .map_err(upstream)?;
    let timeline = AuthorQueue::new(
      person_id,
      owned
        .iter()
        .filter(|a| a.is_well_formed() && a.confidence >= floor)
        .map(|a| a.document_id.clone()),
    );

    let start = usize::try_from(cursor).unwrap_or(usize::MAX);
    let documents: Vec<String> = timeline.documents().skip(start).take(size).map(str::to_owned).collect();
    let end = start.saturating_add(documents.len());
    let next_cursor = (end < timeline.len()).then_some(end as u64);
    if documents.is_empty() {
      return Ok(Some(FeedPage { items: Vec::new(), next_cursor }));
    }

    let appearances = self
      .store
      .appearances_for_documents(&documents)
      .await
      .map_err(upstream)?;
    let index = PageIndex::build(&appearances);
    let names = self.names().await?;
    let co_params = CoPeopleParams {
      min_conf_owner: floor,
      min_conf_other: self.config.feed.min_conf_with,
      page_window:    self.config.feed.page_window,
      max_people:     self.config.feed.max_with,
    };

    let items = documents
      .into_iter()
      .map(|doc| self.feed_item(&index, &names, doc, person_id.to_owned(), Some(&owner_name), &co_params))
      .collect();
    Ok(Some(FeedPage { items, next_cursor }))
  }

  fn feed_item(
    &self,
    index: &PageIndex,
    names: &HashMap<String, String>,
    document_id: String,
    owner_id: String,
    owner_name: Option<&str>,
    params: &CoPeopleParams,
  ) -> FeedItem {
    let preview_page = annotate::preview_page(index, &document_id, &owner_id, params.min_conf_owner);
    let scored = annotate::co_people_for_post(index, &document_id, preview_page, &owner_id, params);
    let owner_name = owner_name
      .map(str::to_owned)
      .or_else(|| names.get(&owner_id).cloned())
      .unwrap_or_else(|| owner_id.clone());
    FeedItem {
      image_url: Some(self.image_url(&document_id, preview_page)),
      owner_name,
      co_people: Self::person_refs(names, scored),
      preview_page,
      document_id,
      owner_id,
    }
  }

  // ─── Feed ──────────────────────────────────────────────────────────────────

  async fn feed_source(&self) -> Result<Arc<FeedSource>> {
    let engine = self.clone();
    cached(&self.caches.feed_source, "feed-source".to_owned(), self.config.cache.index(), move || async move {
      let appearances = engine.store.all_appearances().await.map_err(upstream)?;
      let index = PageIndex::build(&appearances);
      let queues = feed::author_queues(&index, &engine.config.feed);
      debug!(
        documents = index.document_count(),
        skipped = index.skipped(),
        authors = queues.len(),
        "built feed source"
      );
      Ok(Arc::new(FeedSource { index, queues }))
    })
    .await
  }

  /// One page of the global feed starting `cursor` items into the stream.
  /// `page_size` is clamped to the configured bounds.
  pub async fn page(&self, cursor: u64, page_size: Option<usize>) -> Result<FeedPage> {
    let size = self.config.feed.page_size(page_size);
    let engine = self.clone();
    cached(
      &self.caches.feed_pages,
      format!("feed:{cursor}:{size}"),
      self.config.cache.feed(),
      move || async move { engine.compute_page(cursor, size).await },
    )
    .await
  }

  async fn compute_page(&self, cursor: u64, size: usize) -> Result<FeedPage> {
    let params = &self.config.feed;
    let source = self.feed_source().await?;
    let names = self.names().await?;

    let slice = feed::replay(source.queues.clone(), feed::feed_seed(params.seed_origin), cursor, size);
    let co_params = CoPeopleParams {
      min_conf_owner: params.min_conf_owner,
      min_conf_other: params.min_conf_with,
      page_window:    params.page_window,
      max_people:     params.max_with,
    };

    let next_cursor = (!slice.exhausted).then(|| cursor + slice.entries.len() as u64);
    let items = slice
      .entries
      .into_iter()
      .map(|entry| self.feed_item(&source.index, &names, entry.document_id, entry.author_id, None, &co_params))
      .collect();

    Ok(FeedPage { items, next_cursor })
  }
}

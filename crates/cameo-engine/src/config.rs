//! Engine thresholds and cache lifetimes.

use std::time::Duration;

use cameo_core::{annotate::CoPeopleParams, feed::FeedParams, graph::FriendParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Appearances below this never become an avatar or cover.
  pub avatar_min_confidence: f64,
  pub friends:               FriendParams,
  pub with_people:           CoPeopleParams,
  pub feed:                  FeedParams,
  pub posts:                 PostsParams,
  pub search:                SearchParams,
  pub cache:                 CacheTtls,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      avatar_min_confidence: 98.0,
      friends:               FriendParams::default(),
      with_people:           CoPeopleParams::default(),
      feed:                  FeedParams::default(),
      posts:                 PostsParams::default(),
      search:                SearchParams::default(),
      cache:                 CacheTtls::default(),
    }
  }
}

/// One person's own timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostsParams {
  /// A document joins the timeline once the person appears in it at this
  /// confidence.
  pub min_confidence:    f64,
  pub default_page_size: usize,
  pub min_page_size:     usize,
  pub max_page_size:     usize,
}

impl Default for PostsParams {
  fn default() -> Self {
    Self { min_confidence: 98.0, default_page_size: 12, min_page_size: 6, max_page_size: 50 }
  }
}

impl PostsParams {
  pub fn page_size(&self, requested: Option<usize>) -> usize {
    let max = self.max_page_size.max(1);
    requested
      .unwrap_or(self.default_page_size)
      .clamp(self.min_page_size.clamp(1, max), max)
  }
}

/// Name search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
  pub default_limit: usize,
  pub max_limit:     usize,
}

impl Default for SearchParams {
  fn default() -> Self { Self { default_limit: 8, max_limit: 25 } }
}

impl SearchParams {
  pub fn limit(&self, requested: Option<usize>) -> usize {
    requested.unwrap_or(self.default_limit).clamp(1, self.max_limit.max(1))
  }
}

/// Cache lifetimes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
  pub avatars:     u64,
  pub friends:     u64,
  pub with_people: u64,
  pub names:       u64,
  pub index:       u64,
  pub feed:        u64,
  pub posts:       u64,
  pub search:      u64,
}

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

impl Default for CacheTtls {
  fn default() -> Self {
    Self {
      avatars:     7 * DAY,
      friends:     30 * MINUTE,
      with_people: 30 * MINUTE,
      names:       30 * MINUTE,
      index:       30 * MINUTE,
      feed:        10 * MINUTE,
      posts:       10 * MINUTE,
      search:      MINUTE,
    }
  }
}

impl CacheTtls {
  pub fn avatars(&self) -> Duration { Duration::from_secs(self.avatars) }

  pub fn friends(&self) -> Duration { Duration::from_secs(self.friends) }

  pub fn with_people(&self) -> Duration { Duration::from_secs(self.with_people) }

  pub fn names(&self) -> Duration { Duration::from_secs(self.names) }

  pub fn index(&self) -> Duration { Duration::from_secs(self.index) }

  pub fn feed(&self) -> Duration { Duration::from_secs(self.feed) }

  pub fn posts(&self) -> Duration { Duration::from_secs(self.posts) }

  pub fn search(&self) -> Duration { Duration::from_secs(self.search) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_tables_keep_defaults() {
    let cfg: EngineConfig = serde_json::from_str(
      r#"{"friends": {"limit": 10}, "cache": {"feed": 5}, "feed": {"excluded_authors": ["x"]}}"#,
    )
    .unwrap();
    assert_eq!(cfg.friends.limit, 10);
    assert_eq!(cfg.friends.min_conf_owner, 99.0);
    assert_eq!(cfg.cache.feed(), Duration::from_secs(5));
    assert_eq!(cfg.cache.avatars(), Duration::from_secs(7 * DAY));
    assert_eq!(cfg.feed.excluded_authors, vec!["x".to_owned()]);
    assert_eq!(cfg.with_people.min_conf_owner, 99.7);
    assert_eq!(cfg.avatar_min_confidence, 98.0);
    assert_eq!(cfg.cache.search(), Duration::from_secs(60));
  }

  #[test]
  fn page_sizes_and_limits_are_clamped() {
    let posts = PostsParams::default();
    assert_eq!(posts.page_size(None), 12);
    assert_eq!(posts.page_size(Some(1)), 6);
    assert_eq!(posts.page_size(Some(500)), 50);

    let search = SearchParams::default();
    assert_eq!(search.limit(None), 8);
    assert_eq!(search.limit(Some(0)), 1);
    assert_eq!(search.limit(Some(100)), 25);
  }
}

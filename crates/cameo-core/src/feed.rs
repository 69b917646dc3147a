//! The deterministic feed interleaver.
//!
//! Each author contributes a FIFO queue of documents. Items are drawn by
//! shuffling the list of authors that still have documents with a seeded
//! PRNG and popping from the first one. The seed comes only from the stream
//! origin, so the whole stream is a pure function of (queues, origin) and
//! any cursor can be served by replaying it from the start and skipping
//! `cursor` items. No server-side session state is kept; the price is that
//! serving cursor `c` costs `O(c)`.

use std::{cmp::Ordering, collections::VecDeque};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{index::PageIndex, person::PersonRef};

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Feed construction and pagination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedParams {
  /// Minimum author confidence for a document to enter the author's queue.
  pub min_conf_owner:    f64,
  /// Minimum confidence for someone to be listed on an item as appearing
  /// with the author.
  pub min_conf_with:     f64,
  pub page_window:       u32,
  pub max_with:          usize,
  pub default_page_size: usize,
  pub max_page_size:     usize,
  /// Only the most-documented authors take part.
  pub max_authors:       usize,
  pub excluded_authors:  Vec<String>,
  /// Stream origin folded into the shuffle seed. Changing it reshuffles the
  /// whole feed.
  pub seed_origin:       u64,
}

impl Default for FeedParams {
  fn default() -> Self {
    Self {
      min_conf_owner:    99.0,
      min_conf_with:     98.0,
      page_window:       1,
      max_with:          6,
      default_page_size: 12,
      max_page_size:     50,
      max_authors:       400,
      excluded_authors:  Vec::new(),
      seed_origin:       0,
    }
  }
}

impl FeedParams {
  /// Clamp a requested page size into `1..=max_page_size`, substituting the
  /// default when none was asked for.
  pub fn page_size(&self, requested: Option<usize>) -> usize {
    requested
      .unwrap_or(self.default_page_size)
      .clamp(1, self.max_page_size.max(1))
  }
}

// ─── Output types ────────────────────────────────────────────────────────────

/// One rendered post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
  pub document_id:  String,
  pub preview_page: u32,
  pub owner_id:     String,
  pub owner_name:   String,
  pub co_people:    Vec<PersonRef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url:    Option<String>,
}

/// One page of the feed. `next_cursor` is `None` at the end of the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
  pub items:       Vec<FeedItem>,
  pub next_cursor: Option<u64>,
}

// ─── Document ordering ───────────────────────────────────────────────────────

/// The numeric run at the end of a document's stem, e.g. `12345` for
/// `EFTA00012345.pdf`.
pub fn document_number(document_id: &str) -> Option<u64> {
  let stem = match document_id.rfind('.') {
    Some(dot) if dot > 0 => &document_id[..dot],
    _ => document_id,
  };
  let digits_start = stem
    .char_indices()
    .rev()
    .take_while(|(_, c)| c.is_ascii_digit())
    .last()
    .map(|(i, _)| i)?;
  stem[digits_start..].parse().ok()
}

/// Queue order: numbered documents first, highest number first; then
/// everything else; ties by document id descending. Purely syntactic, so
/// queues can be sorted without any I/O.
pub fn compare_documents(a: &str, b: &str) -> Ordering {
  match (document_number(a), document_number(b)) {
    (Some(x), Some(y)) => y.cmp(&x),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
  .then_with(|| b.cmp(a))
}

// ─── Queues ──────────────────────────────────────────────────────────────────

/// One author's pending documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorQueue {
  pub author_id: String,
  documents:     VecDeque<String>,
}

impl AuthorQueue {
  /// Build a queue, sorting and deduplicating `documents`.
  pub fn new(author_id: impl Into<String>, documents: impl IntoIterator<Item = String>) -> Self {
    let mut docs: Vec<String> = documents.into_iter().collect();
    docs.sort_by(|a, b| compare_documents(a, b));
    docs.dedup();
    Self { author_id: author_id.into(), documents: docs.into() }
  }

  pub fn len(&self) -> usize { self.documents.len() }

  pub fn is_empty(&self) -> bool { self.documents.is_empty() }

  /// Pending documents, front first.
  pub fn documents(&self) -> impl Iterator<Item = &str> { self.documents.iter().map(String::as_str) }

  fn pop(&mut self) -> Option<String> { self.documents.pop_front() }
}

/// Pick the feed authors from `index` and build their queues.
///
/// Authors are people with at least one document at or above
/// `params.min_conf_owner`, ordered by how many such documents they have
/// (descending, then id ascending) and capped at `params.max_authors`;
/// `params.excluded_authors` are then removed from the capped list.
pub fn author_queues(index: &PageIndex, params: &FeedParams) -> Vec<AuthorQueue> {
  let mut authors: Vec<(&str, Vec<String>)> = index
    .documents_by_person(params.min_conf_owner)
    .into_iter()
    .map(|(person, docs)| (person, docs.into_iter().map(str::to_owned).collect()))
    .collect();

  authors.sort_by(|(a, a_docs), (b, b_docs)| b_docs.len().cmp(&a_docs.len()).then_with(|| a.cmp(b)));
  // Excluded authors still occupy their slot under the cap.
  authors.truncate(params.max_authors);

  authors
    .into_iter()
    .filter(|(person, _)| !params.excluded_authors.iter().any(|x| x == person))
    .map(|(person, docs)| AuthorQueue::new(person, docs))
    .collect()
}

// ─── Seed ────────────────────────────────────────────────────────────────────

/// Fold `"feed:<origin>"` into a 32-bit seed (FNV-1a).
pub fn feed_seed(origin: u64) -> u32 {
  const OFFSET: u32 = 0x811c_9dc5;
  const PRIME: u32 = 0x0100_0193;
  format!("feed:{origin}")
    .bytes()
    .fold(OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(PRIME))
}

// ─── Interleaver ─────────────────────────────────────────────────────────────

/// One drawn item: which author, which document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
  pub author_id:   String,
  pub document_id: String,
}

/// An infinite-looking, finite stream of [`FeedEntry`] values.
pub struct Interleaver {
  queues: Vec<AuthorQueue>,
  /// Indices into `queues` that still hold documents.
  live:   Vec<usize>,
  rng:    StdRng,
}

impl Interleaver {
  pub fn new(queues: Vec<AuthorQueue>, seed: u32) -> Self {
    let live = queues
      .iter()
      .enumerate()
      .filter(|(_, q)| !q.is_empty())
      .map(|(i, _)| i)
      .collect();
    Self { queues, live, rng: StdRng::seed_from_u64(u64::from(seed)) }
  }

  pub fn is_exhausted(&self) -> bool { self.live.is_empty() }
}

impl Iterator for Interleaver {
  type Item = FeedEntry;

  fn next(&mut self) -> Option<FeedEntry> {
    if self.live.is_empty() {
      return None;
    }
    self.live.shuffle(&mut self.rng);
    let slot = self.live[0];
    let queue = &mut self.queues[slot];
    let document_id = queue.pop()?;
    let author_id = queue.author_id.clone();
    if queue.is_empty() {
      self.live.remove(0);
    }
    Some(FeedEntry { author_id, document_id })
  }
}

/// The entries of one page plus whether the stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSlice {
  pub entries:   Vec<FeedEntry>,
  pub exhausted: bool,
}

/// Replay the stream from `seed`, skip `cursor` entries and collect the next
/// `page_size`.
pub fn replay(queues: Vec<AuthorQueue>, seed: u32, cursor: u64, page_size: usize) -> FeedSlice {
  let mut stream = Interleaver::new(queues, seed);
  let mut skipped = 0u64;
  while skipped < cursor && stream.next().is_some() {
    skipped += 1;
  }
  let entries: Vec<FeedEntry> = stream.by_ref().take(page_size).collect();
  FeedSlice { entries, exhausted: stream.is_exhausted() }
}

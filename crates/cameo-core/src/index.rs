//! The page index: `document → page → (person → max confidence)`.
//!
//! Every windowed aggregation (friend graph, co-people, feed previews) reads
//! from this structure. It is built by scanning appearances once; repeated
//! sightings of the same person on the same page collapse to the highest
//! confidence.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  ops::RangeInclusive,
};

use tracing::trace;

use crate::appearance::Appearance;

type PagePeople = HashMap<String, f64>;

/// An index of who appears on which page of which document.
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
  documents: HashMap<String, BTreeMap<u32, PagePeople>>,
  skipped:   usize,
}

impl PageIndex {
  /// Build an index over every well-formed appearance.
  pub fn build<'a>(appearances: impl IntoIterator<Item = &'a Appearance>) -> Self {
    Self::build_filtered(appearances, |_| true)
  }

  /// Build an index restricted to the given documents.
  pub fn build_for<'a>(
    appearances: impl IntoIterator<Item = &'a Appearance>,
    documents: &HashSet<String>,
  ) -> Self {
    Self::build_filtered(appearances, |doc| documents.contains(doc))
  }

  fn build_filtered<'a>(
    appearances: impl IntoIterator<Item = &'a Appearance>,
    keep: impl Fn(&str) -> bool,
  ) -> Self {
    let mut index = Self::default();
    for a in appearances {
      if !a.is_well_formed() {
        trace!(document = %a.document_id, page = a.page, "skipping malformed appearance");
        index.skipped += 1;
        continue;
      }
      if !keep(&a.document_id) {
        continue;
      }
      index.insert(a);
    }
    index
  }

  fn insert(&mut self, a: &Appearance) {
    let people = self
      .documents
      .entry(a.document_id.clone())
      .or_default()
      .entry(a.page)
      .or_default();
    let best = people.entry(a.person_id.clone()).or_insert(a.confidence);
    if a.confidence > *best {
      *best = a.confidence;
    }
  }

  /// Number of malformed records dropped while building.
  pub fn skipped(&self) -> usize { self.skipped }

  pub fn is_empty(&self) -> bool { self.documents.is_empty() }

  pub fn document_count(&self) -> usize { self.documents.len() }

  /// Iterate over the indexed document ids, in no particular order.
  pub fn documents(&self) -> impl Iterator<Item = &str> {
    self.documents.keys().map(String::as_str)
  }

  pub fn contains_document(&self, document_id: &str) -> bool {
    self.documents.contains_key(document_id)
  }

  /// Max confidence of `person_id` on `page` of `document_id`, if seen.
  pub fn confidence(&self, document_id: &str, page: u32, person_id: &str) -> Option<f64> {
    self
      .documents
      .get(document_id)?
      .get(&page)?
      .get(person_id)
      .copied()
  }

  /// Every `(page, confidence)` at which `person_id` appears in
  /// `document_id`, ascending by page.
  pub fn pages_of<'a>(
    &'a self,
    document_id: &str,
    person_id: &'a str,
  ) -> impl Iterator<Item = (u32, f64)> + 'a {
    self
      .documents
      .get(document_id)
      .into_iter()
      .flat_map(move |pages| {
        pages
          .iter()
          .filter_map(move |(page, people)| people.get(person_id).map(|c| (*page, *c)))
      })
  }

  /// Every `(person, confidence)` seen on a page of `document_id` that falls
  /// inside `window`. A person appearing on several pages of the window is
  /// yielded once per page.
  pub fn people_in_window<'a>(
    &'a self,
    document_id: &str,
    window: RangeInclusive<u32>,
  ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
    self
      .documents
      .get(document_id)
      .into_iter()
      .flat_map(move |pages| pages.range(window.clone()))
      .flat_map(|(_, people)| people.iter().map(|(p, c)| (p.as_str(), *c)))
  }

  /// For every person, the documents on which they reach `min_confidence`
  /// on at least one page.
  pub fn documents_by_person(&self, min_confidence: f64) -> HashMap<&str, HashSet<&str>> {
    let mut out: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (doc, pages) in &self.documents {
      for people in pages.values() {
        for (person, conf) in people {
          if *conf >= min_confidence {
            out.entry(person.as_str()).or_default().insert(doc.as_str());
          }
        }
      }
    }
    out
  }
}

/// The inclusive page range `[page - window, page + window]`, clamped to
/// valid pages.
pub fn page_window(page: u32, window: u32) -> RangeInclusive<u32> {
  page.saturating_sub(window).max(1)..=page.saturating_add(window)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ap(doc: &str, page: u32, person: &str, conf: f64) -> Appearance {
    Appearance::new(doc, page, person, conf)
  }

  #[test]
  fn keeps_max_confidence_per_page() {
    let aps = vec![ap("d", 1, "a", 90.0), ap("d", 1, "a", 97.0), ap("d", 1, "a", 93.0)];
    let index = PageIndex::build(&aps);
    assert_eq!(index.confidence("d", 1, "a"), Some(97.0));
  }

  #[test]
  fn malformed_records_are_counted_not_indexed() {
    let mut bad = ap("d", 1, "a", 99.0);
    bad.page = 0;
    let mut no_doc = ap("", 2, "a", 99.0);
    no_doc.document_id.clear();
    let aps = vec![bad, no_doc, ap("d", 2, "b", 99.0)];

    let index = PageIndex::build(&aps);
    assert_eq!(index.skipped(), 2);
    assert_eq!(index.document_count(), 1);
    assert_eq!(index.confidence("d", 2, "b"), Some(99.0));
  }

  #[test]
  fn build_for_restricts_documents() {
    let aps = vec![ap("d1", 1, "a", 99.0), ap("d2", 1, "a", 99.0)];
    let keep: HashSet<String> = ["d2".to_owned()].into();
    let index = PageIndex::build_for(&aps, &keep);
    assert!(!index.contains_document("d1"));
    assert!(index.contains_document("d2"));
  }

  #[test]
  fn window_is_clamped_at_page_one() {
    assert_eq!(page_window(1, 2), 1..=3);
    assert_eq!(page_window(5, 1), 4..=6);
    assert_eq!(page_window(3, 0), 3..=3);
  }

  #[test]
  fn people_in_window_scans_only_the_window() {
    let aps = vec![
      ap("d", 1, "a", 99.0),
      ap("d", 3, "b", 98.0),
      ap("d", 6, "c", 97.0),
    ];
    let index = PageIndex::build(&aps);
    let mut seen: Vec<&str> = index.people_in_window("d", page_window(2, 1)).map(|(p, _)| p).collect();
    seen.sort();
    assert_eq!(seen, vec!["a", "b"]);
  }
}

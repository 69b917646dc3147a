//! Per-post "appears with" annotation.
//!
//! This is the local counterpart of the friend graph: for one document and
//! one preview page it ranks the other people in the page window by their
//! best confidence there. Nobody here needs to meet an edge-weight bar, so a
//! person can be listed on a post without being in the owner's friend graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  appearance::Appearance,
  index::{PageIndex, page_window},
  select::best_page,
};

/// Thresholds for [`co_people_for_post`] and [`preview_page`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoPeopleParams {
  /// Owner appearances below this are ignored when picking the preview page.
  pub min_conf_owner: f64,
  pub min_conf_other: f64,
  pub page_window:    u32,
  pub max_people:     usize,
}

impl Default for CoPeopleParams {
  fn default() -> Self {
    Self {
      min_conf_owner: 99.7,
      min_conf_other: 98.8,
      page_window:    1,
      max_people:     6,
    }
  }
}

/// A person ranked by their best confidence inside a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPerson {
  pub person_id:  String,
  pub confidence: f64,
}

/// The other people around `preview_page` of `document_id`, best confidence
/// first, ties broken by id, at most `params.max_people`.
pub fn co_people_for_post(
  index: &PageIndex,
  document_id: &str,
  preview_page: u32,
  owner_id: &str,
  params: &CoPeopleParams,
) -> Vec<ScoredPerson> {
  let mut best: HashMap<&str, f64> = HashMap::new();
  for (person, conf) in index.people_in_window(document_id, page_window(preview_page, params.page_window)) {
    if person == owner_id || conf < params.min_conf_other {
      continue;
    }
    let entry = best.entry(person).or_insert(conf);
    if conf > *entry {
      *entry = conf;
    }
  }

  let mut ranked: Vec<ScoredPerson> = best
    .into_iter()
    .map(|(person, confidence)| ScoredPerson { person_id: person.to_owned(), confidence })
    .collect();
  ranked.sort_by(|a, b| {
    b.confidence
      .total_cmp(&a.confidence)
      .then_with(|| a.person_id.cmp(&b.person_id))
  });
  ranked.truncate(params.max_people);
  ranked
}

/// The page of `document_id` that best shows `owner_id`, considering only
/// appearances at or above `min_conf_owner`. Page 1 when there are none.
pub fn preview_page(index: &PageIndex, document_id: &str, owner_id: &str, min_conf_owner: f64) -> u32 {
  let candidates: Vec<Appearance> = index
    .pages_of(document_id, owner_id)
    .filter(|(_, conf)| *conf >= min_conf_owner)
    .map(|(page, conf)| Appearance::new(document_id, page, owner_id, conf))
    .collect();
  best_page(&candidates)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ap(doc: &str, page: u32, person: &str, conf: f64) -> Appearance {
    Appearance::new(doc, page, person, conf)
  }

  fn ids(people: &[ScoredPerson]) -> Vec<&str> {
    people.iter().map(|p| p.person_id.as_str()).collect()
  }

  #[test]
  fn ranks_by_best_confidence_in_window() {
    let aps = vec![
      ap("d", 4, "owner", 99.9),
      ap("d", 3, "b", 98.9),
      ap("d", 5, "b", 99.6),
      ap("d", 4, "c", 99.1),
      ap("d", 9, "far", 99.9),
    ];
    let index = PageIndex::build(&aps);
    let people = co_people_for_post(&index, "d", 4, "owner", &CoPeopleParams::default());
    assert_eq!(ids(&people), vec!["b", "c"]);
    assert_eq!(people[0].confidence, 99.6);
  }

  #[test]
  fn ties_break_by_id_and_list_is_truncated() {
    let mut aps = vec![ap("d", 1, "owner", 99.9)];
    for id in ["f", "e", "d", "c", "b", "a", "g"] {
      aps.push(ap("d", 1, id, 99.0));
    }
    let index = PageIndex::build(&aps);
    let people = co_people_for_post(&index, "d", 1, "owner", &CoPeopleParams::default());
    assert_eq!(ids(&people), vec!["a", "b", "c", "d", "e", "f"]);
  }

  #[test]
  fn listed_without_meeting_an_edge_weight_bar() {
    // One shared page is enough here, while a friend graph with
    // min_edge_weight = 2 would drop this person.
    let aps = vec![ap("d", 1, "owner", 99.9), ap("d", 1, "b", 99.9)];
    let index = PageIndex::build(&aps);
    let people = co_people_for_post(&index, "d", 1, "owner", &CoPeopleParams::default());
    assert_eq!(ids(&people), vec!["b"]);
  }

  #[test]
  fn unknown_document_is_empty() {
    let index = PageIndex::default();
    assert!(co_people_for_post(&index, "nope", 1, "owner", &CoPeopleParams::default()).is_empty());
  }

  #[test]
  fn preview_page_respects_owner_floor() {
    let aps = vec![
      ap("d", 2, "owner", 99.95),
      ap("d", 7, "owner", 99.99),
      ap("d", 1, "owner", 99.0),
    ];
    let index = PageIndex::build(&aps);
    assert_eq!(preview_page(&index, "d", "owner", 99.7), 7);
    assert_eq!(preview_page(&index, "d", "owner", 100.0), 1);
    assert_eq!(preview_page(&index, "missing", "owner", 0.0), 1);
  }
}

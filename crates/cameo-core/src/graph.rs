//! The co-occurrence friend graph.
//!
//! For one owner, an edge to another person is weighted by the number of
//! distinct documents in which that person appears within `page_window`
//! pages of a page where the owner is confidently present. A document counts
//! at most once per other person, however many pages qualify, so one long
//! document cannot dominate an edge.
//!
//! The graph is directional: owner-side and other-side confidence floors
//! can differ, so `weight(a → b)` need not equal `weight(b → a)`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::index::{PageIndex, page_window};

/// Thresholds for [`co_occurrence_weights`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendParams {
  /// Minimum owner confidence for a page to count as a presence event.
  pub min_conf_owner:  f64,
  /// Minimum confidence for another person to count as co-occurring.
  pub min_conf_other:  f64,
  /// Pages either side of a presence event that are searched.
  pub page_window:     u32,
  /// Edges lighter than this are dropped.
  pub min_edge_weight: u32,
  /// Maximum number of edges returned.
  pub limit:           usize,
}

impl Default for FriendParams {
  fn default() -> Self {
    Self {
      min_conf_owner:  99.0,
      min_conf_other:  99.0,
      page_window:     1,
      min_edge_weight: 1,
      limit:           48,
    }
  }
}

/// An unresolved edge target: a person id and its document count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPerson {
  pub person_id: String,
  pub weight:    u32,
}

/// A resolved friend edge, ready to hand back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEdge {
  pub other_person_id: String,
  pub display_name:    String,
  pub weight:          u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url:      Option<String>,
}

/// Compute the weighted edges out of `owner_id`, sorted by weight
/// descending then person id ascending and truncated to `params.limit`.
///
/// An owner with no presence events yields an empty vector.
pub fn co_occurrence_weights(
  index: &PageIndex,
  owner_id: &str,
  params: &FriendParams,
) -> Vec<WeightedPerson> {
  let mut counts: HashMap<&str, u32> = HashMap::new();

  for doc in index.documents() {
    let events: Vec<u32> = index
      .pages_of(doc, owner_id)
      .filter(|(_, conf)| *conf >= params.min_conf_owner)
      .map(|(page, _)| page)
      .collect();
    if events.is_empty() {
      continue;
    }

    // One count per other person per document, however many windows hit.
    let mut others: HashSet<&str> = HashSet::new();
    for page in events {
      for (person, conf) in index.people_in_window(doc, page_window(page, params.page_window)) {
        if person == owner_id || conf < params.min_conf_other {
          continue;
        }
        others.insert(person);
      }
    }

    for person in others {
      *counts.entry(person).or_default() += 1;
    }
  }

  let mut edges: Vec<WeightedPerson> = counts
    .into_iter()
    .filter(|(_, weight)| *weight >= params.min_edge_weight)
    .map(|(person, weight)| WeightedPerson { person_id: person.to_owned(), weight })
    .collect();
  edges.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.person_id.cmp(&b.person_id)));
  edges.truncate(params.limit);
  edges
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::appearance::Appearance;

  fn ap(doc: &str, page: u32, person: &str, conf: f64) -> Appearance {
    Appearance::new(doc, page, person, conf)
  }

  fn params(min_owner: f64, min_other: f64, window: u32) -> FriendParams {
    FriendParams {
      min_conf_owner:  min_owner,
      min_conf_other:  min_other,
      page_window:     window,
      min_edge_weight: 1,
      limit:           100,
    }
  }

  #[test]
  fn overlapping_windows_count_the_document_once() {
    let aps = vec![
      ap("doc1", 3, "a", 99.8),
      ap("doc1", 5, "a", 99.9),
      ap("doc1", 4, "b", 99.0),
    ];
    let index = PageIndex::build(&aps);
    let edges = co_occurrence_weights(&index, "a", &params(99.0, 98.0, 1));
    assert_eq!(edges, vec![WeightedPerson { person_id: "b".into(), weight: 1 }]);
  }

  #[test]
  fn weight_counts_documents_not_pages() {
    let mut aps = Vec::new();
    for page in 1..=5 {
      aps.push(ap("long", page, "a", 99.5));
      aps.push(ap("long", page, "b", 99.5));
    }
    aps.push(ap("short", 1, "a", 99.5));
    aps.push(ap("short", 1, "b", 99.5));

    let index = PageIndex::build(&aps);
    let edges = co_occurrence_weights(&index, "a", &params(99.0, 99.0, 0));
    assert_eq!(edges[0].weight, 2);
  }

  #[test]
  fn owner_is_never_an_edge_target() {
    let aps = vec![ap("d", 1, "a", 99.9), ap("d", 2, "a", 99.9), ap("d", 1, "b", 99.9)];
    let index = PageIndex::build(&aps);
    let edges = co_occurrence_weights(&index, "a", &params(0.0, 0.0, 3));
    assert!(edges.iter().all(|e| e.person_id != "a"));
    assert_eq!(edges.len(), 1);
  }

  #[test]
  fn owner_without_presence_events_yields_nothing() {
    let aps = vec![ap("d", 1, "a", 90.0), ap("d", 1, "b", 99.9)];
    let index = PageIndex::build(&aps);
    assert!(co_occurrence_weights(&index, "a", &params(99.0, 0.0, 1)).is_empty());
    assert!(co_occurrence_weights(&index, "nobody", &params(0.0, 0.0, 1)).is_empty());
  }

  #[test]
  fn sorted_by_weight_then_id_and_truncated() {
    let aps = vec![
      ap("d1", 1, "a", 99.9),
      ap("d1", 1, "c", 99.9),
      ap("d1", 1, "b", 99.9),
      ap("d2", 1, "a", 99.9),
      ap("d2", 1, "c", 99.9),
      ap("d3", 1, "a", 99.9),
      ap("d3", 1, "d", 99.9),
    ];
    let index = PageIndex::build(&aps);
    let mut p = params(99.0, 99.0, 0);
    let ids: Vec<String> = co_occurrence_weights(&index, "a", &p)
      .into_iter()
      .map(|e| e.person_id)
      .collect();
    assert_eq!(ids, vec!["c", "b", "d"]);

    p.limit = 2;
    p.min_edge_weight = 2;
    let edges = co_occurrence_weights(&index, "a", &p);
    assert_eq!(edges, vec![WeightedPerson { person_id: "c".into(), weight: 2 }]);
  }

  #[test]
  fn raising_the_other_floor_never_adds_or_increases() {
    let aps = vec![
      ap("d1", 2, "a", 99.5),
      ap("d1", 1, "b", 98.2),
      ap("d1", 3, "c", 99.9),
      ap("d2", 5, "a", 99.5),
      ap("d2", 5, "b", 99.4),
      ap("d2", 6, "c", 97.0),
      ap("d3", 1, "a", 99.9),
      ap("d3", 2, "b", 99.95),
    ];
    let index = PageIndex::build(&aps);

    let mut previous: HashMap<String, u32> = HashMap::new();
    for (step, floor) in [90.0, 97.5, 98.5, 99.45, 99.99].into_iter().enumerate() {
      let current: HashMap<String, u32> = co_occurrence_weights(&index, "a", &params(99.0, floor, 1))
        .into_iter()
        .map(|e| (e.person_id, e.weight))
        .collect();
      if step > 0 {
        for (person, weight) in &current {
          let before = previous.get(person).copied().unwrap_or(0);
          assert!(*weight <= before, "{person} grew from {before} to {weight} at floor {floor}");
        }
      }
      previous = current;
    }
  }

  #[test]
  fn asymmetric_floors_make_the_graph_directional() {
    let aps = vec![ap("d", 1, "a", 99.9), ap("d", 1, "b", 98.5)];
    let index = PageIndex::build(&aps);
    let p = params(99.0, 98.0, 0);
    assert_eq!(co_occurrence_weights(&index, "a", &p).len(), 1);
    assert!(co_occurrence_weights(&index, "b", &p).is_empty());
  }
}

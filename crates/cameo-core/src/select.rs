//! Representative appearance selection.
//!
//! Confidence is noisy, so selection is a strict arg-max with a stable
//! secondary key: higher confidence first, then the earlier page, then the
//! lexically smaller document id. The same input set yields the same choice
//! regardless of the order it was ingested in.

use std::{cmp::Ordering, collections::HashSet};

use crate::appearance::Appearance;

/// Total ranking order: confidence descending, page ascending, document id
/// ascending.
pub fn rank(a: &Appearance, b: &Appearance) -> Ordering {
  b.confidence
    .total_cmp(&a.confidence)
    .then_with(|| a.page.cmp(&b.page))
    .then_with(|| a.document_id.cmp(&b.document_id))
}

/// The best `n` appearances at or above `min_confidence`, deduplicated by
/// `(document, page)`.
pub fn best_appearances(
  appearances: &[Appearance],
  min_confidence: f64,
  n: usize,
) -> Vec<Appearance> {
  let mut eligible: Vec<&Appearance> = appearances
    .iter()
    .filter(|a| a.is_well_formed() && a.confidence >= min_confidence)
    .collect();
  eligible.sort_by(|a, b| rank(a, b));

  let mut seen: HashSet<(&str, u32)> = HashSet::new();
  eligible
    .into_iter()
    .filter(|a| seen.insert((a.document_id.as_str(), a.page)))
    .take(n)
    .cloned()
    .collect()
}

/// The single best appearance at or above `min_confidence`.
pub fn best_appearance(appearances: &[Appearance], min_confidence: f64) -> Option<Appearance> {
  appearances
    .iter()
    .filter(|a| a.is_well_formed() && a.confidence >= min_confidence)
    .min_by(|a, b| rank(a, b))
    .cloned()
}

/// The page of the best appearance, or page 1 when there is no evidence at
/// all. Callers must read page 1 from an empty set as "no strong evidence".
pub fn best_page(appearances: &[Appearance]) -> u32 {
  appearances
    .iter()
    .filter(|a| a.page >= 1)
    .min_by(|a, b| {
      b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.page.cmp(&b.page))
    })
    .map_or(1, |a| a.page)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ap(doc: &str, page: u32, conf: f64) -> Appearance {
    Appearance::new(doc, page, "p", conf)
  }

  #[test]
  fn higher_confidence_wins() {
    let aps = vec![ap("d", 1, 97.0), ap("d", 4, 99.5), ap("d", 2, 98.0)];
    assert_eq!(best_page(&aps), 4);
    let best = best_appearances(&aps, 0.0, 3);
    assert_eq!(best[0].page, 4);
    assert_eq!(best.iter().map(|a| a.page).collect::<Vec<_>>(), vec![4, 2, 1]);
  }

  #[test]
  fn ties_prefer_lower_page_regardless_of_input_order() {
    let forward = vec![ap("d", 3, 99.0), ap("d", 2, 99.0), ap("d", 7, 99.0)];
    let mut reversed = forward.clone();
    reversed.reverse();
    for _ in 0..3 {
      assert_eq!(best_page(&forward), 2);
      assert_eq!(best_page(&reversed), 2);
      assert_eq!(best_appearances(&forward, 0.0, 1), best_appearances(&reversed, 0.0, 1));
    }
  }

  #[test]
  fn ties_across_documents_break_on_document_id() {
    let aps = vec![ap("zeta.pdf", 1, 99.0), ap("alpha.pdf", 1, 99.0)];
    assert_eq!(best_appearance(&aps, 0.0).unwrap().document_id, "alpha.pdf");
  }

  #[test]
  fn floor_filters_and_dedup_happens_before_truncation() {
    let aps = vec![
      ap("d", 1, 99.9),
      ap("d", 1, 99.8),
      ap("d", 2, 99.7),
      ap("d", 3, 50.0),
    ];
    let best = best_appearances(&aps, 98.0, 2);
    assert_eq!(best.len(), 2);
    assert_eq!((best[0].page, best[0].confidence), (1, 99.9));
    assert_eq!(best[1].page, 2);
  }

  #[test]
  fn empty_input_is_not_an_error() {
    assert_eq!(best_page(&[]), 1);
    assert!(best_appearances(&[], 0.0, 5).is_empty());
    assert!(best_appearance(&[ap("d", 1, 10.0)], 98.0).is_none());
  }
}

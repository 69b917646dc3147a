//! Appearance: one (person, document, page, confidence) observation.
//!
//! Appearances are produced upstream by a face-recognition pipeline and are
//! immutable once ingested. Everything else in cameo is derived from them.

use serde::{Deserialize, Serialize};

// ─── Appearance ──────────────────────────────────────────────────────────────

/// A person detected on one page of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
  pub document_id: String,
  /// 1-based page number.
  pub page:        u32,
  pub person_id:   String,
  /// Detector confidence in `[0, 100]`. Absent upstream values are 0.
  #[serde(default)]
  pub confidence:  f64,
}

impl Appearance {
  pub fn new(
    document_id: impl Into<String>,
    page: u32,
    person_id: impl Into<String>,
    confidence: f64,
  ) -> Self {
    Self {
      document_id: document_id.into(),
      page,
      person_id: person_id.into(),
      confidence: normalize_confidence(Some(confidence)),
    }
  }

  /// Whether this record can take part in aggregation. Records with an empty
  /// document id or page 0 are data-quality problems and are skipped.
  pub fn is_well_formed(&self) -> bool {
    !self.document_id.is_empty() && self.page >= 1 && !self.person_id.is_empty()
  }
}

/// Map an optional upstream confidence onto `[0, 100]`; absent or non-finite
/// values become 0.
pub fn normalize_confidence(confidence: Option<f64>) -> f64 {
  match confidence {
    Some(c) if c.is_finite() => c.clamp(0.0, 100.0),
    _ => 0.0,
  }
}

// ─── Raw records ─────────────────────────────────────────────────────────────

/// An appearance as it arrives from upstream, before validation.
///
/// Every field is optional so that a single bad record never fails a whole
/// import; [`RawAppearance::into_appearance`] decides whether it is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppearance {
  #[serde(alias = "file")]
  pub document_id: Option<String>,
  pub page:        Option<f64>,
  pub confidence:  Option<f64>,
}

impl RawAppearance {
  /// Validate and attach the owning person. Returns `None` for records with
  /// a missing or empty document id or a missing, fractional or
  /// non-positive page.
  pub fn into_appearance(self, person_id: &str) -> Option<Appearance> {
    let document_id = self.document_id.filter(|d| !d.trim().is_empty())?;
    let page = self
      .page
      .filter(|p| p.fract() == 0.0 && *p >= 1.0 && *p <= f64::from(u32::MAX))?
      as u32;

    Some(Appearance {
      document_id,
      page,
      person_id: person_id.to_owned(),
      confidence: normalize_confidence(self.confidence),
    })
  }
}

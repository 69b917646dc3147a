//! Conversions between domain types and SQLite column values.
//!
//! Timestamps are RFC 3339 strings. Document id lists are bound as one JSON
//! array and expanded with `json_each` on the SQL side.

use cameo_core::{
  appearance::{Appearance, normalize_confidence},
  person::Person,
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::InvalidRow(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_id_list(ids: &[String]) -> Result<String> { Ok(serde_json::to_string(ids)?) }

// ─── Rows ────────────────────────────────────────────────────────────────────

pub const APPEARANCE_COLUMNS: &str = "document_id, page, person_id, COALESCE(confidence, 0)";

/// An `appearances` row as read back from SQLite.
pub struct RawAppearance {
  pub document_id: String,
  pub page:        i64,
  pub person_id:   String,
  pub confidence:  f64,
}

impl RawAppearance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id: row.get(0)?,
      page:        row.get(1)?,
      person_id:   row.get(2)?,
      confidence:  row.get(3)?,
    })
  }

  pub fn into_appearance(self) -> Result<Appearance> {
    let page = u32::try_from(self.page)
      .ok()
      .filter(|p| *p >= 1)
      .ok_or_else(|| Error::InvalidRow(format!("page {} of {}", self.page, self.document_id)))?;
    Ok(Appearance {
      document_id: self.document_id,
      page,
      person_id: self.person_id,
      confidence: normalize_confidence(Some(self.confidence)),
    })
  }
}

pub struct RawPerson {
  pub person_id:    String,
  pub display_name: String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { person_id: row.get(0)?, display_name: row.get(1)? })
  }

  pub fn into_person(self) -> Person { Person { id: self.person_id, display_name: self.display_name } }
}

pub fn decode_appearances(raws: Vec<RawAppearance>) -> Result<Vec<Appearance>> {
  raws.into_iter().map(RawAppearance::into_appearance).collect()
}

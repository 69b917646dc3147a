//! [`SqliteStore`], the SQLite implementation of the cameo store traits.

use std::path::Path;

use cameo_core::{
  appearance::Appearance,
  dataset::Dataset,
  person::{Person, PersonRegistry},
  store::{AppearanceStore, PersonDirectory},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{
    APPEARANCE_COLUMNS, RawAppearance, RawPerson, decode_appearances, decode_dt, encode_dt,
    encode_id_list,
  },
  schema::SCHEMA,
};

const INSERT_PERSON: &str = "
  INSERT INTO people (person_id, display_name) VALUES (?1, ?2)
  ON CONFLICT (person_id) DO UPDATE SET display_name = excluded.display_name";

const INSERT_APPEARANCE: &str = "
  INSERT INTO appearances (document_id, page, person_id, confidence, ingested_at)
  VALUES (?1, ?2, ?3, ?4, ?5)
  ON CONFLICT (document_id, page, person_id) DO UPDATE SET
    confidence  = MAX(COALESCE(confidence, 0), COALESCE(excluded.confidence, 0)),
    ingested_at = excluded.ingested_at";

/// What one [`SqliteStore::import`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
  pub people:      usize,
  pub appearances: usize,
  pub ingested_at: DateTime<Utc>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Appearance data backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Write a whole dataset in one transaction.
  ///
  /// Person ids are re-derived against the people already stored, so a name
  /// keeps the id it was first imported under and a new name never takes
  /// over an existing id. Appearances already present keep the higher
  /// confidence.
  pub async fn import(&self, dataset: &Dataset) -> Result<ImportSummary> {
    let dataset = dataset.clone();
    let ingested_at = Utc::now();
    let at_str = encode_dt(ingested_at);

    let (people_written, appearances_written) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let written = {
          let known = {
            let mut stmt = tx.prepare("SELECT person_id, display_name FROM people")?;
            let rows = stmt
              .query_map([], RawPerson::from_row)?
              .map(|r| r.map(RawPerson::into_person))
              .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
          };
          let mut registry = PersonRegistry::from_people(known);
          let dataset = dataset.reassign_ids(&mut registry);
          let appearances: Vec<&Appearance> = dataset
            .appearances
            .iter()
            .filter(|a| a.is_well_formed())
            .collect();

          let mut person_stmt = tx.prepare(INSERT_PERSON)?;
          for p in &dataset.people {
            person_stmt.execute(rusqlite::params![p.id, p.display_name])?;
          }
          let mut appearance_stmt = tx.prepare(INSERT_APPEARANCE)?;
          for a in &appearances {
            appearance_stmt.execute(rusqlite::params![
              a.document_id,
              a.page,
              a.person_id,
              a.confidence,
              at_str,
            ])?;
          }
          (dataset.people.len(), appearances.len())
        };
        tx.commit()?;
        Ok(written)
      })
      .await?;

    info!(people = people_written, appearances = appearances_written, "imported dataset");
    Ok(ImportSummary { people: people_written, appearances: appearances_written, ingested_at })
  }

  /// Append individual appearances. Malformed records are skipped; returns
  /// how many were written.
  pub async fn record_appearances(&self, appearances: &[Appearance]) -> Result<usize> {
    let rows: Vec<Appearance> = appearances
      .iter()
      .filter(|a| a.is_well_formed())
      .cloned()
      .collect();
    let skipped = appearances.len() - rows.len();
    if skipped > 0 {
      debug!(skipped, "skipping malformed appearances");
    }
    let at_str = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(INSERT_APPEARANCE)?;
          for a in &rows {
            stmt.execute(rusqlite::params![a.document_id, a.page, a.person_id, a.confidence, at_str])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;
    Ok(written)
  }

  pub async fn upsert_person(&self, person: &Person) -> Result<()> {
    let (id, name) = (person.id.clone(), person.display_name.clone());
    self
      .conn
      .call(move |conn| {
        conn.execute(INSERT_PERSON, rusqlite::params![id, name])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// When the most recent appearance was written, if any.
  pub async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT MAX(ingested_at) FROM appearances", [], |row| row.get(0))
            .optional()?
            .flatten(),
        )
      })
      .await?;
    raw.as_deref().map(decode_dt).transpose()
  }

  pub async fn appearance_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM appearances", [], |row| row.get(0))?))
      .await?;
    u64::try_from(n).map_err(|_| Error::InvalidRow(format!("negative count {n}")))
  }

  async fn query_appearances(&self, sql: String, param: Option<String>) -> Result<Vec<Appearance>> {
    let raws: Vec<RawAppearance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt.query_map(rusqlite::params![p], RawAppearance::from_row)?,
          None => stmt.query_map([], RawAppearance::from_row)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;
    decode_appearances(raws)
  }
}

// ─── AppearanceStore impl ────────────────────────────────────────────────────

impl AppearanceStore for SqliteStore {
  type Error = Error;

  async fn appearances_for_person<'a>(&'a self, person_id: &'a str) -> Result<Vec<Appearance>> {
    self
      .query_appearances(
        format!("SELECT {APPEARANCE_COLUMNS} FROM appearances WHERE person_id = ?1"),
        Some(person_id.to_owned()),
      )
      .await
  }

  async fn appearances_for_documents<'a>(&'a self, document_ids: &'a [String]) -> Result<Vec<Appearance>> {
    if document_ids.is_empty() {
      return Ok(Vec::new());
    }
    self
      .query_appearances(
        format!(
          "SELECT {APPEARANCE_COLUMNS} FROM appearances
           WHERE document_id IN (SELECT value FROM json_each(?1))"
        ),
        Some(encode_id_list(document_ids)?),
      )
      .await
  }

  async fn all_appearances(&self) -> Result<Vec<Appearance>> {
    self
      .query_appearances(format!("SELECT {APPEARANCE_COLUMNS} FROM appearances"), None)
      .await
  }
}

// ─── PersonDirectory impl ────────────────────────────────────────────────────

impl PersonDirectory for SqliteStore {
  type Error = Error;

  async fn resolve_display_name<'a>(&'a self, person_id: &'a str) -> Result<Option<String>> {
    let id = person_id.to_owned();
    let name: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT display_name FROM people WHERE person_id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(name)
  }

  async fn list_people(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT person_id, display_name FROM people ORDER BY person_id")?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws.into_iter().map(RawPerson::into_person).collect())
  }
}

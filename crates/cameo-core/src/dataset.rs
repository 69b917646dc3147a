//! Import of the upstream appearance dump.
//!
//! The recognition pipeline exports one entry per recognised person:
//!
//! ```json
//! [{ "name": "Jane Doe",
//!    "appearances": [{ "file": "EFTA00001.pdf", "page": 3, "confidence": 99.4 }] }]
//! ```
//!
//! Bad records are data-quality problems upstream, not caller errors, so
//! they are skipped and counted instead of failing the import.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
  Error, Result,
  appearance::{Appearance, RawAppearance},
  person::{Person, PersonRegistry},
};

#[derive(Deserialize)]
struct RawEntry {
  name:        Option<String>,
  #[serde(default)]
  appearances: Vec<Value>,
}

/// A validated dataset: people with collision-free ids and their
/// appearances.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
  pub people:              Vec<Person>,
  pub appearances:         Vec<Appearance>,
  /// Entries dropped for lacking a usable name.
  pub skipped_entries:     usize,
  /// Appearances dropped for a missing document id or page.
  pub skipped_appearances: usize,
}

impl Dataset {
  pub fn from_json(json: &str) -> Result<Self> {
    match serde_json::from_str::<Value>(json)? {
      Value::Array(entries) => Ok(Self::from_entries(entries)),
      other => Err(Error::InvalidDataset(format!(
        "expected a top-level array, found {}",
        kind_of(&other)
      ))),
    }
  }

  /// Re-key the dataset against `registry`, usually one seeded with the
  /// people already stored, so that every name keeps the id it was first
  /// given. Names the registry has not seen are interned in name order.
  pub fn reassign_ids(self, registry: &mut PersonRegistry) -> Self {
    let mut people = self.people;
    people.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    let mut ids: HashMap<String, String> = HashMap::with_capacity(people.len());
    let mut rekeyed = Vec::with_capacity(people.len());
    for p in people {
      let id = registry.intern(&p.display_name);
      if id != p.id {
        debug!(from = %p.id, to = %id, "reassigning person id");
      }
      ids.insert(p.id, id.clone());
      rekeyed.push(Person { id, display_name: p.display_name.trim().to_owned() });
    }
    rekeyed.sort_by(|a, b| a.id.cmp(&b.id));

    let appearances = self
      .appearances
      .into_iter()
      .map(|mut a| {
        if let Some(id) = ids.get(&a.person_id) {
          a.person_id = id.clone();
        }
        a
      })
      .collect();

    Self {
      people: rekeyed,
      appearances,
      skipped_entries: self.skipped_entries,
      skipped_appearances: self.skipped_appearances,
    }
  }

  fn from_entries(entries: Vec<Value>) -> Self {
    let mut dataset = Self::default();

    // Group by trimmed name first so that ids do not depend on entry order.
    let mut by_name: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for raw in entries {
      let entry: RawEntry = match serde_json::from_value(raw) {
        Ok(e) => e,
        Err(e) => {
          debug!(error = %e, "skipping unreadable dataset entry");
          dataset.skipped_entries += 1;
          continue;
        }
      };
      match entry.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
          by_name.entry(name.to_owned()).or_default().extend(entry.appearances);
        }
        _ => {
          dataset.skipped_entries += 1;
          dataset.skipped_appearances += entry.appearances.len();
        }
      }
    }

    let mut registry = PersonRegistry::new();
    for (name, raws) in by_name {
      let person_id = registry.intern(&name);
      for raw in raws {
        let parsed = serde_json::from_value::<RawAppearance>(raw)
          .ok()
          .and_then(|r| r.into_appearance(&person_id));
        match parsed {
          Some(a) => dataset.appearances.push(a),
          None => dataset.skipped_appearances += 1,
        }
      }
    }
    dataset.people = registry.people();

    info!(
      people = dataset.people.len(),
      appearances = dataset.appearances.len(),
      skipped_entries = dataset.skipped_entries,
      skipped_appearances = dataset.skipped_appearances,
      "parsed appearance dataset"
    );
    dataset
  }
}

fn kind_of(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

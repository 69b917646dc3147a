//! Person identity: display names, stable ids and the registry that keeps
//! them collision-free.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A person known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
  /// Stable identity key; every join in the system goes through it.
  pub id:           String,
  pub display_name: String,
}

/// The compact person reference embedded in feed items and co-people lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
  pub id:           String,
  pub display_name: String,
}

impl From<Person> for PersonRef {
  fn from(p: Person) -> Self {
    Self { id: p.id, display_name: p.display_name }
  }
}

/// Normalise a display name into a URL-safe slug.
///
/// Lowercases, drops quotes, collapses every run of characters outside
/// `[a-z0-9]` into a single `-` and strips leading and trailing dashes.
/// Names with no usable characters become `"person"`.
pub fn slugify(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut pending_dash = false;

  for c in name.trim().to_lowercase().chars() {
    if c == '\'' || c == '"' {
      continue;
    }
    if c.is_ascii_lowercase() || c.is_ascii_digit() {
      if pending_dash && !out.is_empty() {
        out.push('-');
      }
      pending_dash = false;
      out.push(c);
    } else {
      pending_dash = true;
    }
  }

  if out.is_empty() { "person".to_owned() } else { out }
}

/// Rank people whose display name contains `query`, case-insensitively.
///
/// Exact matches come first, then names starting with the query, then names
/// with a word starting with it, then any other substring match. Within a
/// rank names sort alphabetically, then by id. A blank query matches nobody.
pub fn search_names<'a>(
  people: impl IntoIterator<Item = (&'a str, &'a str)>,
  query: &str,
  limit: usize,
) -> Vec<PersonRef> {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() || limit == 0 {
    return Vec::new();
  }

  let mut hits: Vec<(u8, String, &str, &str)> = people
    .into_iter()
    .filter_map(|(id, name)| {
      let folded = name.to_lowercase();
      let rank = if folded == needle {
        0
      } else if folded.starts_with(&needle) {
        1
      } else if folded
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.starts_with(&needle))
      {
        2
      } else if folded.contains(&needle) {
        3
      } else {
        return None;
      };
      Some((rank, folded, id, name))
    })
    .collect();

  hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(b.2)));
  hits
    .into_iter()
    .take(limit)
    .map(|(_, _, id, name)| PersonRef { id: id.to_owned(), display_name: name.to_owned() })
    .collect()
}

/// Assigns ids to display names.
///
/// The same (trimmed) display name always yields the same id, and two
/// different display names never share one: when a slug is already owned by
/// another name the smallest free numeric suffix (`-2`, `-3`, …) is appended.
/// Ids depend on interning order, so callers that want ids to be independent
/// of input order intern names in sorted order (see
/// [`crate::dataset::Dataset`]).
#[derive(Debug, Default, Clone)]
pub struct PersonRegistry {
  by_name: HashMap<String, String>,
  by_id:   HashMap<String, String>,
}

impl PersonRegistry {
  pub fn new() -> Self { Self::default() }

  /// A registry that already owns the ids of `people`, so that names seen
  /// before keep their id and new names never take one of those ids.
  pub fn from_people(people: impl IntoIterator<Item = Person>) -> Self {
    let mut registry = Self::new();
    for p in people {
      let name = p.display_name.trim().to_owned();
      registry.by_name.entry(name.clone()).or_insert_with(|| p.id.clone());
      registry.by_id.entry(p.id).or_insert(name);
    }
    registry
  }

  /// Return the id for `display_name`, allocating one if needed.
  pub fn intern(&mut self, display_name: &str) -> String {
    let name = display_name.trim();
    if let Some(id) = self.by_name.get(name) {
      return id.clone();
    }

    let base = slugify(name);
    let mut id = base.clone();
    let mut suffix = 2u32;
    while self.by_id.contains_key(&id) {
      id = format!("{base}-{suffix}");
      suffix += 1;
    }

    self.by_name.insert(name.to_owned(), id.clone());
    self.by_id.insert(id.clone(), name.to_owned());
    id
  }

  pub fn get(&self, display_name: &str) -> Option<&str> {
    self.by_name.get(display_name.trim()).map(String::as_str)
  }

  pub fn len(&self) -> usize { self.by_id.len() }

  pub fn is_empty(&self) -> bool { self.by_id.is_empty() }

  /// All registered people, ordered by id.
  pub fn people(&self) -> Vec<Person> {
    let mut people: Vec<Person> = self
      .by_id
      .iter()
      .map(|(id, name)| Person { id: id.clone(), display_name: name.clone() })
      .collect();
    people.sort_by(|a, b| a.id.cmp(&b.id));
    people
  }
}

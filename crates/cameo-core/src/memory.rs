//! An in-process store over a fully loaded [`Dataset`].
//!
//! Useful for tests and for serving small datasets without a database.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  convert::Infallible,
};

use crate::{
  appearance::Appearance,
  dataset::Dataset,
  person::Person,
  store::{AppearanceStore, PersonDirectory},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  appearances: Vec<Appearance>,
  by_person:   HashMap<String, Vec<usize>>,
  by_document: HashMap<String, Vec<usize>>,
  people:      BTreeMap<String, String>,
}

impl MemoryStore {
  pub fn new(people: Vec<Person>, appearances: Vec<Appearance>) -> Self {
    let mut by_person: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_document: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, a) in appearances.iter().enumerate() {
      by_person.entry(a.person_id.clone()).or_default().push(i);
      by_document.entry(a.document_id.clone()).or_default().push(i);
    }

    Self {
      appearances,
      by_person,
      by_document,
      people: people.into_iter().map(|p| (p.id, p.display_name)).collect(),
    }
  }

  pub fn from_dataset(dataset: Dataset) -> Self { Self::new(dataset.people, dataset.appearances) }

  pub fn appearance_count(&self) -> usize { self.appearances.len() }

  fn collect(&self, indices: impl IntoIterator<Item = usize>) -> Vec<Appearance> {
    indices.into_iter().map(|i| self.appearances[i].clone()).collect()
  }
}

impl AppearanceStore for MemoryStore {
  type Error = Infallible;

  async fn appearances_for_person<'a>(&'a self, person_id: &'a str) -> Result<Vec<Appearance>, Infallible> {
    Ok(
      self
        .by_person
        .get(person_id)
        .map(|ix| self.collect(ix.iter().copied()))
        .unwrap_or_default(),
    )
  }

  async fn appearances_for_documents<'a>(
    &'a self,
    document_ids: &'a [String],
  ) -> Result<Vec<Appearance>, Infallible> {
    let unique: HashSet<&str> = document_ids.iter().map(String::as_str).collect();
    let indices = unique
      .into_iter()
      .filter_map(|doc| self.by_document.get(doc))
      .flatten()
      .copied();
    Ok(self.collect(indices))
  }

  async fn all_appearances(&self) -> Result<Vec<Appearance>, Infallible> { Ok(self.appearances.clone()) }
}

impl PersonDirectory for MemoryStore {
  type Error = Infallible;

  async fn resolve_display_name<'a>(&'a self, person_id: &'a str) -> Result<Option<String>, Infallible> {
    Ok(self.people.get(person_id).cloned())
  }

  async fn list_people(&self) -> Result<Vec<Person>, Infallible> {
    Ok(
      self
        .people
        .iter()
        .map(|(id, name)| Person { id: id.clone(), display_name: name.clone() })
        .collect(),
    )
  }
}

//! The read-side store traits consumed by the engine.
//!
//! The traits are implemented by storage backends (`MemoryStore` here,
//! `SqliteStore` in `cameo-store-sqlite`). Higher layers (`cameo-engine`,
//! `cameo-api`) depend on these abstractions, not on any concrete backend.

use std::future::Future;

use crate::{appearance::Appearance, person::Person};

/// Read-only access to appearance records.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AppearanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every appearance of `person_id`, at any confidence. Unknown people
  /// yield an empty vector.
  fn appearances_for_person<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Appearance>, Self::Error>> + Send + 'a;

  /// Every appearance, of anyone, on any of `document_ids`.
  fn appearances_for_documents<'a>(
    &'a self,
    document_ids: &'a [String],
  ) -> impl Future<Output = Result<Vec<Appearance>, Self::Error>> + Send + 'a;

  /// The whole appearance set. Used to build the global page index that the
  /// feed is interleaved from.
  fn all_appearances(
    &self,
  ) -> impl Future<Output = Result<Vec<Appearance>, Self::Error>> + Send + '_;
}

/// Resolution of person ids to display names.
pub trait PersonDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The display name for `person_id`, or `None` if the id is unknown.
  fn resolve_display_name<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Every known person, ordered by id.
  fn list_people(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;
}

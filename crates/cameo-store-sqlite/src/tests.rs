//! Integration tests for `SqliteStore` against an in-memory database.

use cameo_core::{
  appearance::Appearance,
  dataset::Dataset,
  person::Person,
  store::{AppearanceStore, PersonDirectory},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn dataset() -> Dataset {
  Dataset::from_json(
    r#"[
      {"name": "Ann Lee", "appearances": [
        {"file": "EFTA01.pdf", "page": 1, "confidence": 99.5},
        {"file": "EFTA02.pdf", "page": 3}
      ]},
      {"name": "Bo", "appearances": [
        {"file": "EFTA01.pdf", "page": 2, "confidence": 98.0},
        {"file": "EFTA03.pdf", "page": 0}
      ]}
    ]"#,
  )
  .unwrap()
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_writes_people_and_appearances() {
  let s = store().await;
  let summary = s.import(&dataset()).await.unwrap();
  assert_eq!(summary.people, 2);
  assert_eq!(summary.appearances, 3);
  assert_eq!(s.appearance_count().await.unwrap(), 3);
  assert_eq!(s.last_ingested_at().await.unwrap(), Some(summary.ingested_at));

  let people = s.list_people().await.unwrap();
  assert_eq!(people, vec![
    Person { id: "ann-lee".into(), display_name: "Ann Lee".into() },
    Person { id: "bo".into(), display_name: "Bo".into() },
  ]);
}

#[tokio::test]
async fn reimport_is_idempotent() {
  let s = store().await;
  s.import(&dataset()).await.unwrap();
  s.import(&dataset()).await.unwrap();
  assert_eq!(s.appearance_count().await.unwrap(), 3);
  assert_eq!(s.list_people().await.unwrap().len(), 2);
}

#[tokio::test]
async fn later_imports_keep_existing_person_ids() {
  let s = store().await;
  s.import(&Dataset::from_json(r#"[{"name": "Jane-Doe", "appearances": [{"file": "old.pdf", "page": 1, "confidence": 99}]}]"#).unwrap())
    .await
    .unwrap();

  // On its own this dataset would hand `jane-doe` to "Jane Doe".
  let second = Dataset::from_json(
    r#"[
      {"name": "Jane Doe", "appearances": [{"file": "new.pdf", "page": 1, "confidence": 99}]},
      {"name": "Jane-Doe"}
    ]"#,
  )
  .unwrap();
  let summary = s.import(&second).await.unwrap();
  assert_eq!(summary.people, 2);

  assert_eq!(s.list_people().await.unwrap(), vec![
    Person { id: "jane-doe".into(), display_name: "Jane-Doe".into() },
    Person { id: "jane-doe-2".into(), display_name: "Jane Doe".into() },
  ]);

  let docs = |rows: Vec<Appearance>| rows.into_iter().map(|a| a.document_id).collect::<Vec<_>>();
  assert_eq!(docs(s.appearances_for_person("jane-doe").await.unwrap()), vec!["old.pdf"]);
  assert_eq!(docs(s.appearances_for_person("jane-doe-2").await.unwrap()), vec!["new.pdf"]);
}

#[tokio::test]
async fn empty_store_has_no_ingest_time() {
  let s = store().await;
  assert_eq!(s.last_ingested_at().await.unwrap(), None);
  assert!(s.all_appearances().await.unwrap().is_empty());
}

// ─── Appearances ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_confidence_reads_back_as_zero() {
  let s = store().await;
  s.import(&dataset()).await.unwrap();
  let ann = s.appearances_for_person("ann-lee").await.unwrap();
  let on_two = ann.iter().find(|a| a.document_id == "EFTA02.pdf").unwrap();
  assert_eq!(on_two.confidence, 0.0);
  assert_eq!(on_two.page, 3);
}

#[tokio::test]
async fn duplicate_records_keep_the_higher_confidence() {
  let s = store().await;
  let written = s
    .record_appearances(&[
      Appearance::new("d", 1, "p", 97.0),
      Appearance::new("d", 1, "p", 99.0),
      Appearance::new("d", 1, "p", 98.0),
      Appearance::new("", 1, "p", 99.0),
    ])
    .await
    .unwrap();
  assert_eq!(written, 3);

  let rows = s.appearances_for_person("p").await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].confidence, 99.0);
}

#[tokio::test]
async fn appearances_for_documents_filters_by_id_list() {
  let s = store().await;
  s.import(&dataset()).await.unwrap();

  let docs = vec!["EFTA01.pdf".to_owned(), "nope.pdf".to_owned()];
  let mut on_one = s.appearances_for_documents(&docs).await.unwrap();
  on_one.sort_by_key(|a| a.page);
  let people: Vec<&str> = on_one.iter().map(|a| a.person_id.as_str()).collect();
  assert_eq!(people, vec!["ann-lee", "bo"]);

  assert!(s.appearances_for_documents(&[]).await.unwrap().is_empty());
  assert!(s.appearances_for_person("nobody").await.unwrap().is_empty());
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn display_names_resolve_and_update() {
  let s = store().await;
  s.import(&dataset()).await.unwrap();
  assert_eq!(s.resolve_display_name("bo").await.unwrap().as_deref(), Some("Bo"));
  assert_eq!(s.resolve_display_name("zed").await.unwrap(), None);

  s.upsert_person(&Person { id: "bo".into(), display_name: "Bo Diddley".into() })
    .await
    .unwrap();
  assert_eq!(s.resolve_display_name("bo").await.unwrap().as_deref(), Some("Bo Diddley"));
}

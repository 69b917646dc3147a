//! Blob-store addressing: page image keys and public URLs.
//!
//! Rendered page images live in an external blob store. Which key holds the
//! image of page `n` of a document is described by an optional manifest that
//! has shipped in several shapes over time; [`PageManifest`] resolves all of
//! them once, at load time, into a flat lookup table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

// ─── Key helpers ─────────────────────────────────────────────────────────────

fn has_extension(key: &str, exts: &[&str]) -> bool {
  key
    .rsplit_once('.')
    .is_some_and(|(_, ext)| exts.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

pub fn is_image_key(key: &str) -> bool { has_extension(key, &["jpg", "jpeg", "png", "webp", "gif"]) }

pub fn is_pdf_key(key: &str) -> bool { has_extension(key, &["pdf"]) }

/// `foo/bar.pdf` → `thumbnails/foo/bar.jpg`.
pub fn thumbnail_key_for_pdf(pdf_key: &str) -> String {
  let stem = if is_pdf_key(pdf_key) { &pdf_key[..pdf_key.len() - 4] } else { pdf_key };
  format!("thumbnails/{stem}.jpg")
}

// ─── Manifest ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestShape {
  Items { items: Vec<Value> },
  ByDocument(HashMap<String, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentPages {
  Paged { pages: PageList },
  Direct(HashMap<String, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageList {
  Ordered(Vec<Value>),
  Keyed(HashMap<String, Value>),
}

#[derive(Deserialize)]
struct ManifestItem {
  #[serde(rename = "pdfKey")]
  pdf_key: Option<String>,
  pdf:     Option<String>,
  key:     Option<String>,
  pages:   Option<PageList>,
}

#[derive(Deserialize)]
struct PageObject {
  key:  Option<String>,
  jpg:  Option<String>,
  path: Option<String>,
}

/// A page entry is either a bare key or an object carrying one.
fn entry_key(entry: Value) -> Option<String> {
  match entry {
    Value::String(s) => Some(s),
    Value::Object(_) => {
      let obj: PageObject = serde_json::from_value(entry).ok()?;
      obj.key.or(obj.jpg).or(obj.path)
    }
    _ => None,
  }
}

fn resolve_pages(list: PageList) -> HashMap<u32, String> {
  match list {
    PageList::Ordered(entries) => entries
      .into_iter()
      .zip(1u32..)
      .filter_map(|(entry, page)| entry_key(entry).map(|k| (page, k)))
      .collect(),
    PageList::Keyed(map) => resolve_keyed(map),
  }
}

fn resolve_keyed(map: HashMap<String, Value>) -> HashMap<u32, String> {
  map
    .into_iter()
    .filter_map(|(page, entry)| Some((page.parse().ok()?, entry_key(entry)?)))
    .collect()
}

/// Page-image lookup table resolved from any known manifest shape:
///
/// - `{ "<doc>": { "<page>": key } }`
/// - `{ "<doc>": { "pages": { "<page>": key } } }`
/// - `{ "<doc>": { "pages": [key | {key|jpg|path}, …] } }` (1-based order)
/// - `{ "items": [{ "pdfKey"|"pdf"|"key": "<doc>", "pages": … }] }`
#[derive(Debug, Clone, Default)]
pub struct PageManifest {
  pages: HashMap<String, HashMap<u32, String>>,
}

impl PageManifest {
  pub fn from_json(json: &str) -> Result<Self> {
    Self::from_value(serde_json::from_str(json)?)
  }

  pub fn from_value(value: Value) -> Result<Self> {
    let shape: ManifestShape = serde_json::from_value(value)
      .map_err(|e| Error::InvalidManifest(e.to_string()))?;

    let mut pages: HashMap<String, HashMap<u32, String>> = HashMap::new();
    match shape {
      ManifestShape::Items { items } => {
        for raw in items {
          let Ok(item) = serde_json::from_value::<ManifestItem>(raw) else {
            continue;
          };
          let Some(doc) = item.pdf_key.or(item.pdf).or(item.key) else {
            continue;
          };
          if let Some(list) = item.pages {
            pages.entry(doc).or_default().extend(resolve_pages(list));
          }
        }
      }
      ManifestShape::ByDocument(docs) => {
        for (doc, raw) in docs {
          let resolved = match serde_json::from_value::<DocumentPages>(raw) {
            Ok(DocumentPages::Paged { pages }) => resolve_pages(pages),
            Ok(DocumentPages::Direct(map)) => resolve_keyed(map),
            Err(_) => continue,
          };
          if !resolved.is_empty() {
            pages.insert(doc, resolved);
          }
        }
      }
    }

    debug!(documents = pages.len(), "resolved page manifest");
    Ok(Self { pages })
  }

  /// The blob key holding the image of `page` of `document_id`.
  pub fn page_key(&self, document_id: &str, page: u32) -> Option<&str> {
    self.pages.get(document_id)?.get(&page).map(String::as_str)
  }

  pub fn document_count(&self) -> usize { self.pages.len() }
}

// ─── Locator ─────────────────────────────────────────────────────────────────

/// Builds public URLs for blob-store keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocator {
  pub base_url:      String,
  /// Appended as `?v=` to bust CDN caches when assets are regenerated.
  pub asset_version: Option<String>,
}

impl BlobLocator {
  pub fn new(base_url: impl Into<String>, asset_version: Option<String>) -> Self {
    let base_url: String = base_url.into();
    Self {
      base_url: base_url.trim_end_matches('/').to_owned(),
      asset_version,
    }
  }

  pub fn file_url(&self, key: &str) -> String {
    let key = key.trim_start_matches('/');
    match &self.asset_version {
      Some(v) => format!("{}/{key}?v={v}", self.base_url),
      None => format!("{}/{key}", self.base_url),
    }
  }

  /// The key of the image that best represents `page` of `document_id`:
  /// the manifest entry if there is one, the document itself if it already
  /// is an image, else the document thumbnail.
  pub fn page_image_key(
    &self,
    manifest: Option<&PageManifest>,
    document_id: &str,
    page: u32,
  ) -> String {
    if let Some(key) = manifest.and_then(|m| m.page_key(document_id, page)) {
      return key.to_owned();
    }
    if is_image_key(document_id) {
      return document_id.to_owned();
    }
    if is_pdf_key(document_id) {
      return thumbnail_key_for_pdf(document_id);
    }
    document_id.to_owned()
  }

  pub fn page_image_url(
    &self,
    manifest: Option<&PageManifest>,
    document_id: &str,
    page: u32,
  ) -> String {
    self.file_url(&self.page_image_key(manifest, document_id, page))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn direct_shape() {
    let m = PageManifest::from_json(r#"{"a.pdf": {"1": "a/1.jpg", "2": "a/2.jpg"}}"#).unwrap();
    assert_eq!(m.page_key("a.pdf", 2), Some("a/2.jpg"));
    assert_eq!(m.page_key("a.pdf", 3), None);
  }

  #[test]
  fn paged_map_and_array_shapes() {
    let m = PageManifest::from_json(
      r#"{
        "a.pdf": {"pages": {"3": "a/3.jpg"}},
        "b.pdf": {"pages": ["b/1.jpg", {"jpg": "b/2.jpg"}, {"path": "b/3.jpg"}, null]}
      }"#,
    )
    .unwrap();
    assert_eq!(m.page_key("a.pdf", 3), Some("a/3.jpg"));
    assert_eq!(m.page_key("b.pdf", 1), Some("b/1.jpg"));
    assert_eq!(m.page_key("b.pdf", 2), Some("b/2.jpg"));
    assert_eq!(m.page_key("b.pdf", 3), Some("b/3.jpg"));
    assert_eq!(m.page_key("b.pdf", 4), None);
  }

  #[test]
  fn items_shape() {
    let m = PageManifest::from_json(
      r#"{"items": [
        {"pdfKey": "a.pdf", "pages": ["a/1.jpg"]},
        {"pdf": "b.pdf", "pages": {"2": {"key": "b/2.jpg"}}},
        {"pages": ["orphan.jpg"]}
      ]}"#,
    )
    .unwrap();
    assert_eq!(m.page_key("a.pdf", 1), Some("a/1.jpg"));
    assert_eq!(m.page_key("b.pdf", 2), Some("b/2.jpg"));
    assert_eq!(m.document_count(), 2);
  }

  #[test]
  fn unknown_entries_are_ignored() {
    let m = PageManifest::from_json(r#"{"a.pdf": 7, "b.pdf": {"x": "nope"}}"#).unwrap();
    assert_eq!(m.document_count(), 0);
    assert!(PageManifest::from_json("[1, 2]").is_err());
  }

  #[test]
  fn urls_fall_back_to_thumbnails() {
    let loc = BlobLocator::new("https://blobs.example/", Some("20251221".into()));
    assert_eq!(
      loc.page_image_url(None, "docs/EFTA01.pdf", 3),
      "https://blobs.example/thumbnails/docs/EFTA01.jpg?v=20251221"
    );
    assert_eq!(loc.page_image_url(None, "photo.JPG", 1), "https://blobs.example/photo.JPG?v=20251221");

    let manifest = PageManifest::from_json(r#"{"x.pdf": {"2": "pages/x-2.jpg"}}"#).unwrap();
    let plain = BlobLocator::new("https://blobs.example", None);
    assert_eq!(plain.page_image_url(Some(&manifest), "x.pdf", 2), "https://blobs.example/pages/x-2.jpg");
  }
}

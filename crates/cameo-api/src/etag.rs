//! Strong ETags over serialised response bodies.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// A quoted, hex-encoded SHA-256 of `body`.
pub fn compute_etag(body: &[u8]) -> String { format!("\"{}\"", hex::encode(Sha256::digest(body))) }

/// Whether the request's `If-None-Match` already names `etag`.
pub fn is_fresh(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(str::trim)
    .any(|candidate| candidate == "*" || candidate == etag || candidate.strip_prefix("W/") == Some(etag))
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn same_body_same_etag() {
    assert_eq!(compute_etag(b"{}"), compute_etag(b"{}"));
    assert_ne!(compute_etag(b"{}"), compute_etag(b"[]"));
    assert!(compute_etag(b"x").starts_with('"'));
  }

  #[test]
  fn if_none_match_lists_and_wildcards() {
    let etag = compute_etag(b"page");
    let mut headers = HeaderMap::new();
    assert!(!is_fresh(&headers, &etag));

    headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&format!("\"other\", W/{etag}")).unwrap());
    assert!(is_fresh(&headers, &etag));

    headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
    assert!(is_fresh(&headers, &etag));
  }
}

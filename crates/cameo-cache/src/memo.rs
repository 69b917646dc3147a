use std::{future::Future, sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt};

/// A keyed value cache with per-entry expiry and in-flight deduplication.
///
/// Implementations must be shareable across tasks; all methods take
/// `&self`.
pub trait Memo<V, E>: Send + Sync {
  /// The live value for `key`, or `None` on a miss or after expiry.
  fn get(&self, key: &str) -> Option<V>;

  /// Store `value` under `key` for `ttl`, replacing whatever was there.
  /// Returns the stored value.
  fn set(&self, key: &str, value: V, ttl: Duration) -> V;

  /// Run `compute` for `key` unless a computation for the same key is
  /// already running, in which case wait for that one instead.
  ///
  /// Every caller of one computation observes the same result, success or
  /// failure. Once it settles the key is free again, so a failed
  /// computation is retried by the next caller. Dropping the returned
  /// future stops waiting but does not cancel the computation for other
  /// waiters.
  fn once(&self, key: &str, compute: BoxFuture<'static, Result<V, E>>) -> BoxFuture<'static, Result<V, E>>;

  /// Drop every expired entry. Returns how many were removed.
  fn purge_expired(&self) -> usize;
}

/// Read-through lookup: return the cached value for `key`, or compute it
/// once across concurrent callers and store it for `ttl`.
///
/// Failures are never stored.
pub async fn cached<V, E, F, Fut>(
  memo: &Arc<dyn Memo<V, E>>,
  key: String,
  ttl: Duration,
  compute: F,
) -> Result<V, E>
where
  V: Send + 'static,
  E: Send + 'static,
  F: FnOnce() -> Fut + Send + 'static,
  Fut: Future<Output = Result<V, E>> + Send + 'static,
{
  if let Some(hit) = memo.get(&key) {
    return Ok(hit);
  }

  let store = Arc::clone(memo);
  let slot = key.clone();
  let work = async move {
    // Another flight may have filled the slot between the miss above and
    // this computation being registered.
    if let Some(hit) = store.get(&slot) {
      return Ok(hit);
    }
    let value = compute().await?;
    Ok(store.set(&slot, value, ttl))
  };

  memo.once(&key, work.boxed()).await
}

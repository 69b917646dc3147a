use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
  time::Duration,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use crate::memo::Memo;

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Entry<V> {
  value:      V,
  expires_at: Instant,
}

struct Inner<V, E> {
  entries:   Mutex<HashMap<String, Entry<V>>>,
  in_flight: Mutex<HashMap<String, Flight<V, E>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> { m.lock().unwrap_or_else(PoisonError::into_inner) }

/// In-process [`Memo`] backed by two mutex-guarded maps: settled values
/// with their expiry, and shared handles to running computations.
///
/// Cloning is cheap and clones share state.
pub struct TtlCache<V, E> {
  inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for TtlCache<V, E> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<V, E> Default for TtlCache<V, E> {
  fn default() -> Self {
    Self {
      inner: Arc::new(Inner {
        entries:   Mutex::new(HashMap::new()),
        in_flight: Mutex::new(HashMap::new()),
      }),
    }
  }
}

impl<V, E> TtlCache<V, E> {
  pub fn new() -> Self { Self::default() }

  /// Number of stored entries, including expired ones not yet purged.
  pub fn len(&self) -> usize { lock(&self.inner.entries).len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Number of computations currently running.
  pub fn in_flight(&self) -> usize { lock(&self.inner.in_flight).len() }
}

impl<V, E> Memo<V, E> for TtlCache<V, E>
where
  V: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  fn get(&self, key: &str) -> Option<V> {
    let mut entries = lock(&self.inner.entries);
    match entries.get(key) {
      Some(e) if e.expires_at > Instant::now() => Some(e.value.clone()),
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  fn set(&self, key: &str, value: V, ttl: Duration) -> V {
    let entry = Entry { value: value.clone(), expires_at: Instant::now() + ttl };
    lock(&self.inner.entries).insert(key.to_owned(), entry);
    value
  }

  fn once(&self, key: &str, compute: BoxFuture<'static, Result<V, E>>) -> BoxFuture<'static, Result<V, E>> {
    let mut flights = lock(&self.inner.in_flight);
    if let Some(flight) = flights.get(key) {
      debug!(key, "joining in-flight computation");
      return flight.clone().boxed();
    }

    debug!(key, "starting computation");
    let registry: Weak<Inner<V, E>> = Arc::downgrade(&self.inner);
    let owned_key = key.to_owned();
    let flight: Flight<V, E> = async move {
      let result = compute.await;
      // Deregister before any waiter sees the result so that a caller
      // reacting to a failure starts a fresh attempt.
      if let Some(inner) = registry.upgrade() {
        lock(&inner.in_flight).remove(&owned_key);
      }
      result
    }
    .boxed()
    .shared();

    flights.insert(key.to_owned(), flight.clone());
    flight.boxed()
  }

  fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut entries = lock(&self.inner.entries);
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    before - entries.len()
  }
}

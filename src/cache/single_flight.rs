//! Key-keyed cache with request deduplication.
//!
//! The page-level resource-content lookup is expensive and keyed by a stable
//! topic string; without single-flight, concurrent renders of the same topic
//! would trigger duplicate expensive work. At most one computation is in
//! flight per key at any time, and every caller that joined that flight
//! observes the exact same resolved value or the exact same failure.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use tokio::time::Instant;

use crate::errors::ComputeError;

/// One in-flight computation, shared by every caller that joined it.
type Flight<V> = Shared<BoxFuture<'static, Result<V, ComputeError>>>;

enum Slot<V> {
    Ready {
        value: V,
        // None = never expires
        expires_at: Option<Instant>,
    },
    InFlight(Flight<V>),
}

/// Cache with per-key request deduplication and TTL expiry.
///
/// Process-scoped: constructed once and injected (`Arc`), never reached
/// through a global. Failures are never memoized - a failed computation
/// propagates to all callers awaiting that key and leaves the key absent,
/// so the next lookup retries.
pub struct SingleFlightCache<K, V> {
    entries: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, joining an in-flight computation
    /// if one exists, or invoking `compute` otherwise.
    ///
    /// A successful result is stored with expiry `now + ttl` (`None` keeps
    /// it until invalidated). Expired entries are dropped lazily here, on
    /// lookup.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: K,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V, ComputeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ComputeError>> + Send + 'static,
    {
        // One critical section decides whether we hit, join, or start a
        // flight. Constructing the future does not run it, so calling
        // `compute` under the lock is fine; the lock is never held across
        // an await.
        let flight = {
            let mut entries = self.lock();

            if let Some(Slot::Ready { value, expires_at }) = entries.get(&key) {
                let live = expires_at.map_or(true, |at| Instant::now() < at);
                if live {
                    return Ok(value.clone());
                }
                entries.remove(&key);
            }

            match entries.get(&key) {
                Some(Slot::InFlight(existing)) => existing.clone(),
                _ => {
                    let flight: Flight<V> = compute().boxed().shared();
                    entries.insert(key.clone(), Slot::InFlight(flight.clone()));
                    flight
                }
            }
        };

        let result = flight.clone().await;
        self.settle(&key, &flight, &result, ttl);
        result
    }

    /// Remove any stored or in-flight entry for `key`.
    ///
    /// Affects only future lookups: callers already awaiting an in-flight
    /// computation for this key still receive its result.
    pub fn invalidate(&self, key: &K) {
        if self.lock().remove(key).is_some() {
            debug!("Invalidated cache entry");
        }
    }

    /// Drop every entry, stored and in-flight alike.
    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    /// Number of entries currently held, in-flight ones included.
    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    /// Record the outcome of a flight every awaiter ran through.
    ///
    /// Guarded by pointer identity so a flight that was invalidated (or
    /// superseded) while it ran never writes back; idempotent, so it does
    /// not matter which awaiter settles first.
    fn settle(&self, key: &K, flight: &Flight<V>, result: &Result<V, ComputeError>, ttl: Option<Duration>) {
        let mut entries = self.lock();

        let ours = matches!(
            entries.get(key),
            Some(Slot::InFlight(current)) if current.ptr_eq(flight)
        );
        if !ours {
            return;
        }

        match result {
            Ok(value) => {
                entries.insert(
                    key.clone(),
                    Slot::Ready {
                        value: value.clone(),
                        expires_at: ttl.map(|ttl| Instant::now() + ttl),
                    },
                );
            }
            Err(_) => {
                // Failures are never memoized; the key reverts to absent.
                entries.remove(key);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

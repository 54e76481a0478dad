//! Transparent caching of read-only remote calls
//!
//! A [`CallCache`] wraps any idempotent fetch: the call's fingerprint is looked
//! up in the [`CacheStore`] and, on a miss, the fetch runs once and its result
//! is stored with the operation's TTL. Errors are returned to the caller and
//! never stored, so the next call retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use super::{CacheArg, CacheStore, Fingerprint};

/// Identity and expiry policy of a cached operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedOp {
    /// Name unique among cached operations; part of every fingerprint
    pub name: &'static str,
    /// How long results stay fresh; `None` keeps them forever
    pub ttl: Option<Duration>,
}

impl CachedOp {
    /// An operation whose results never expire
    pub const fn new(name: &'static str) -> Self {
        Self { name, ttl: None }
    }

    /// An operation whose results expire after `secs` seconds
    pub const fn expiring(name: &'static str, secs: u64) -> Self {
        Self {
            name,
            ttl: Some(Duration::from_secs(secs)),
        }
    }
}

/// Per-fingerprint locks held while a real fetch is running
type InFlight = HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>;

/// Cache front for read-only remote calls
#[derive(Debug)]
pub struct CallCache {
    store: Arc<CacheStore>,
    in_flight: parking_lot::Mutex<InFlight>,
}

impl CallCache {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            in_flight: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// A cache that keeps results for the current process only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(CacheStore::in_memory()))
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Returns the cached result of `op(args)`, or runs `fetch` to produce it
    ///
    /// On a miss, `fetch` is awaited exactly once and a successful result is
    /// stored. Concurrent callers asking for the same fingerprint wait for the
    /// first one instead of issuing their own request.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        op: &CachedOp,
        args: &[CacheArg],
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = Fingerprint::new(op.name, args);
        if let Some(value) = self.lookup(op, &key) {
            return Ok(value);
        }

        let slot = self.slot_for(key);
        let _permit = slot.lock.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(value) = self.lookup(op, &key) {
            return Ok(value);
        }

        tracing::debug!(op = op.name, key = %key, "cache miss");
        let result = fetch().await;
        if let Ok(value) = &result {
            match serde_json::to_value(value) {
                Ok(json) => self.store.put(key, json, op.ttl),
                Err(err) => {
                    tracing::warn!(op = op.name, error = %err, "result is not cacheable")
                }
            }
        }
        result
    }

    fn lookup<T: DeserializeOwned>(&self, op: &CachedOp, key: &Fingerprint) -> Option<T> {
        let entry = self.store.get(key)?;
        match serde_json::from_value(entry.value) {
            Ok(value) => {
                tracing::debug!(op = op.name, key = %key, "cache hit");
                Some(value)
            }
            Err(err) => {
                tracing::debug!(op = op.name, key = %key, error = %err, "cached value has the wrong shape");
                None
            }
        }
    }

    fn slot_for(&self, key: Fingerprint) -> InFlightSlot<'_> {
        let lock = self.in_flight.lock().entry(key).or_default().clone();
        InFlightSlot {
            cache: self,
            key,
            lock,
        }
    }
}

/// A caller's claim on the lock of one fingerprint
///
/// Dropping it, including when the owning future is cancelled, removes the
/// table entry once no other caller holds the same lock.
struct InFlightSlot<'a> {
    cache: &'a CallCache,
    key: Fingerprint,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock();
        // One reference in the table, one held here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            in_flight.remove(&self.key);
        }
    }
}

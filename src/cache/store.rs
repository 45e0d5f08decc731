//! Cache Store Module
//!
//! Concurrent key-value storage with per-entry TTL and lazy expiration on read.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::stats::StatsCounters;
use crate::cache::{ttl_from_millis, CacheEntry, CacheStats};
use crate::error::{CacheError, Result};
use crate::tasks::{Reaper, ReaperShared};

struct StoreInner<K, V> {
    /// Sharded map; each shard has its own lock
    entries: DashMap<K, CacheEntry<V>>,
    /// Hit/miss/reclamation counters
    stats: StatsCounters,
    /// Entry limit, None = unbounded
    max_entries: Option<usize>,
    /// Admission counter kept in step with `entries` for the entry limit
    occupied: AtomicUsize,
    /// The store's single reaper, if one was started
    reaper: Mutex<Weak<ReaperShared>>,
}

// == Cache Store ==
/// Concurrent TTL cache.
///
/// `CacheStore` is a cheap handle: clones share the same entries, so it can be
/// handed to request handlers, worker threads and a [`Reaper`] alike.
///
/// Every entry carries its own deadline, and `get` never returns a value whose
/// deadline has passed, whether or not a reaper is running.
pub struct CacheStore<K, V> {
    inner: Arc<StoreInner<K, V>>,
}

impl<K, V> Clone for CacheStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash, V> Default for CacheStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.len())
            .field("max_entries", &self.inner.max_entries)
            .finish()
    }
}

impl<K: Eq + Hash, V> CacheStore<K, V> {
    // == Constructors ==
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a store that refuses new keys once `max_entries` are held.
    ///
    /// Expired entries count toward the limit until they are reclaimed.
    /// Sweeps free each slot while still holding the entry's shard lock;
    /// `delete` and lazy eviction free it right after releasing that lock, so
    /// a concurrent `put` of a new key may briefly still see the old count.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self::build(Some(max_entries))
    }

    fn build(max_entries: Option<usize>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: DashMap::new(),
                stats: StatsCounters::default(),
                max_entries,
                occupied: AtomicUsize::new(0),
                reaper: Mutex::new(Weak::new()),
            }),
        }
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`, expiring `ttl` from now.
    ///
    /// Last writer wins. A zero `ttl` stores nothing and removes any existing
    /// entry for the key, since such an entry would already be expired.
    ///
    /// # Errors
    /// `CacheError::CapacityExceeded` when the store has an entry limit, it is
    /// reached, and `key` is not already present.
    pub fn put(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.delete(&key);
            return Ok(());
        }

        let entry = CacheEntry::new(value, ttl, Instant::now());

        match self.inner.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                self.reserve_slot()?;
                vacant.insert(entry);
            }
        }

        Ok(())
    }

    /// Like [`put`](Self::put), with a signed millisecond TTL from untrusted input.
    ///
    /// # Errors
    /// `CacheError::InvalidArgument` for a negative TTL, before anything is
    /// written.
    pub fn put_with_ttl_millis(&self, key: K, value: V, ttl_ms: i64) -> Result<()> {
        let ttl = ttl_from_millis(ttl_ms)?;
        self.put(key, value, ttl)
    }

    fn reserve_slot(&self) -> Result<()> {
        let Some(max) = self.inner.max_entries else {
            self.inner.occupied.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        };

        self.inner
            .occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < max).then_some(count + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                CacheError::CapacityExceeded(format!("store is limited to {} entries", max))
            })
    }

    fn release_slots(&self, count: usize) {
        if count > 0 {
            self.inner.occupied.fetch_sub(count, Ordering::AcqRel);
        }
    }

    // == Get ==
    /// Returns a copy of the value for `key` if present and not expired.
    ///
    /// An expired entry found here is removed in the same call.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.lookup(key, |entry| entry.value.clone());
        self.record_access(value.is_some());
        value
    }

    /// Like [`get`](Self::get), also returning the entry's remaining lifetime
    /// as observed in the same lookup.
    pub fn get_with_ttl<Q>(&self, key: &Q) -> Option<(V, Duration)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let found = self.lookup(key, |entry| (entry.value.clone(), entry.ttl_remaining()));
        self.record_access(found.is_some());
        found
    }

    fn record_access(&self, hit: bool) {
        if hit {
            self.inner.stats.record_hit();
        } else {
            self.inner.stats.record_miss();
        }
    }

    /// Returns true if `key` holds a live entry. Evicts it if expired.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key, |_| ()).is_some()
    }

    /// Remaining lifetime of the live entry for `key`.
    pub fn ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key, CacheEntry::ttl_remaining)
    }

    /// Applies `f` to the live entry for `key`, evicting it if expired.
    fn lookup<Q, R>(&self, key: &Q, f: impl FnOnce(&CacheEntry<V>) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();

        match self.inner.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(f(entry.value())),
            Some(_) => {}
        }

        // The read guard is released; re-check under the shard write lock so a
        // fresh put that landed in between is left alone.
        if self
            .inner
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            self.release_slots(1);
            self.inner.stats.record_expired();
        }

        None
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns whether one was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.inner.entries.remove(key).is_some();
        if removed {
            self.release_slots(1);
        }
        removed
    }

    // == Purge Expired ==
    /// Removes every entry expired as of this call's start.
    ///
    /// Shards are locked one at a time, so traffic on other shards proceeds
    /// during the sweep. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.inner.entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                self.release_slots(1);
                false
            } else {
                true
            }
        });

        self.inner.stats.record_reaped(removed);
        removed
    }

    // == Length ==
    /// Number of entries held, including expired ones not yet reclaimed.
    ///
    /// This is an upper bound on the number of live entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    // == Stats ==
    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.len())
    }

    /// Slot remembering the reaper attached to this store.
    pub(crate) fn reaper_slot(&self) -> MutexGuard<'_, Weak<ReaperShared>> {
        // The guarded value is a plain Weak, valid even after a panic elsewhere
        self.inner
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn downgrade(&self) -> WeakStore<K, V> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    // == Start Reaper ==
    /// Starts a background [`Reaper`] sweeping this store every `interval`.
    ///
    /// A store has at most one reaper. If one is already running, it is
    /// rescheduled to `interval` and the returned handle controls that same
    /// task. Must be called from within a tokio runtime.
    pub fn start_reaper(&self, interval: Duration) -> Result<Reaper> {
        Reaper::start(self, interval)
    }
}

/// Non-owning handle held by the reaper.
pub(crate) struct WeakStore<K, V> {
    inner: Weak<StoreInner<K, V>>,
}

impl<K, V> WeakStore<K, V> {
    pub(crate) fn upgrade(&self) -> Option<CacheStore<K, V>> {
        self.inner.upgrade().map(|inner| CacheStore { inner })
    }
}

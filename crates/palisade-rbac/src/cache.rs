//! Decision cache.
//!
//! A bounded LRU map from `(fingerprint, rule-set version)` to decision. The
//! version is part of the key, so a decision computed under an older rule set
//! can never be returned once the store has moved on. The evaluator also
//! flushes the whole cache on every store change notification to release
//! entries that can no longer be hit.
//!
//! # Thread Safety
//!
//! The map sits behind a `Mutex`. Every operation holds the lock for a single
//! map access and never calls out while holding it.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use palisade_types::{Fingerprint, RuleSetVersion};

use crate::decision::PermissionDecision;

/// Default number of cached decisions.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Cache key: a context fingerprint under one rule-set version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub version: RuleSetVersion,
}

impl CacheKey {
    pub fn new(fingerprint: Fingerprint, version: RuleSetVersion) -> Self {
        Self {
            fingerprint,
            version,
        }
    }
}

/// LRU cache of permission decisions.
///
/// A capacity of zero disables caching: `get` always misses and `insert`
/// drops the entry.
#[derive(Debug)]
pub struct DecisionCache {
    entries: Option<Mutex<LruCache<CacheKey, PermissionDecision>>>,
}

impl DecisionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |entries| lock(entries).cap().get())
    }

    /// Returns a copy of the cached decision and marks it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<PermissionDecision> {
        let entries = self.entries.as_ref()?;
        lock(entries).get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, decision: PermissionDecision) {
        if let Some(entries) = &self.entries {
            lock(entries).put(key, decision);
        }
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        if let Some(entries) = &self.entries {
            lock(entries).clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| lock(entries).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Cached decisions are plain values; a panic elsewhere cannot leave one half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

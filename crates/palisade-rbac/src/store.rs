//! Rule store contract and in-memory implementation.
//!
//! The store owns the current rule set and its version. Every change bumps the
//! version and notifies subscribers; evaluators subscribe to flush their
//! decision caches.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use palisade_types::{Role, RuleId, RuleSetVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::rule::PermissionRule;

// ============================================================================
// Contract
// ============================================================================

/// Callback invoked with the new version after every store change.
pub type ChangeListener = Arc<dyn Fn(RuleSetVersion) + Send + Sync>;

/// Handle returned by [`RuleStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Readiness of a rule store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreStatus {
    /// The initial load has not completed.
    Loading,
    Ready,
    /// The last load failed. Evaluations deny until a later load succeeds.
    Unavailable,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStatus::Loading => write!(f, "loading"),
            StoreStatus::Ready => write!(f, "ready"),
            StoreStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Source of permission rules.
pub trait RuleStore: Send + Sync {
    /// Rules whose `role` equals `role`.
    fn rules_for_role(&self, role: &Role) -> Vec<PermissionRule>;

    fn all_rules(&self) -> Vec<PermissionRule>;

    /// Version of the current rule set. Strictly increases on every change.
    fn current_version(&self) -> RuleSetVersion;

    fn status(&self) -> StoreStatus;

    /// Registers a change listener.
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;

    /// Removes a listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug)]
struct Snapshot {
    rules: BTreeMap<RuleId, PermissionRule>,
    version: RuleSetVersion,
    status: StoreStatus,
}

/// `RwLock`-protected rule set held in memory.
///
/// Listeners run after the write lock is released, so a listener may read
/// the store.
pub struct InMemoryRuleStore {
    snapshot: RwLock<Snapshot>,
    listeners: Mutex<BTreeMap<SubscriptionId, ChangeListener>>,
    next_subscription: AtomicU64,
}

impl InMemoryRuleStore {
    /// Creates an empty store in the `Loading` state.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Snapshot {
                rules: BTreeMap::new(),
                version: RuleSetVersion::INITIAL,
                status: StoreStatus::Loading,
            }),
            listeners: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Creates a `Ready` store holding `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRuleId`] if two rules share an id.
    pub fn with_rules(rules: Vec<PermissionRule>) -> Result<Self> {
        let store = Self::new();
        store.replace_all(rules)?;
        Ok(store)
    }

    /// Replaces the whole rule set and marks the store `Ready`.
    ///
    /// The rule set is rejected as a whole if two rules share an id.
    pub fn replace_all(&self, rules: Vec<PermissionRule>) -> Result<RuleSetVersion> {
        let mut by_id = BTreeMap::new();
        for rule in rules {
            let id = rule.id.clone();
            if by_id.insert(id.clone(), rule).is_some() {
                return Err(StoreError::DuplicateRuleId(id));
            }
        }
        let count = by_id.len();

        let version = self.mutate(|snapshot| {
            snapshot.rules = by_id;
            snapshot.status = StoreStatus::Ready;
        });
        info!(version = %version, rules = count, "Rule set replaced");
        Ok(version)
    }

    /// Inserts or replaces one rule by id.
    pub fn upsert(&self, rule: PermissionRule) -> RuleSetVersion {
        let id = rule.id.clone();
        let version = self.mutate(|snapshot| {
            snapshot.rules.insert(rule.id.clone(), rule);
        });
        info!(version = %version, rule_id = %id, "Rule upserted");
        version
    }

    /// Removes a rule. The version only moves if a rule was removed.
    pub fn remove(&self, id: &RuleId) -> Option<PermissionRule> {
        let removed = {
            let mut snapshot = write(&self.snapshot);
            let removed = snapshot.rules.remove(id)?;
            snapshot.version = snapshot.version.next();
            (removed, snapshot.version)
        };
        info!(version = %removed.1, rule_id = %id, "Rule removed");
        self.notify(removed.1);
        Some(removed.0)
    }

    /// Marks the store unavailable, e.g. after a failed reload.
    pub fn mark_unavailable(&self, reason: &str) -> RuleSetVersion {
        let version = self.mutate(|snapshot| snapshot.status = StoreStatus::Unavailable);
        warn!(version = %version, reason = %reason, "Rule store unavailable");
        version
    }

    /// Marks the store as loading, e.g. at the start of a reload.
    pub fn mark_loading(&self) -> RuleSetVersion {
        self.mutate(|snapshot| snapshot.status = StoreStatus::Loading)
    }

    pub fn len(&self) -> usize {
        read(&self.snapshot).rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Applies `change`, bumps the version, then notifies with the lock released.
    fn mutate(&self, change: impl FnOnce(&mut Snapshot)) -> RuleSetVersion {
        let version = {
            let mut snapshot = write(&self.snapshot);
            change(&mut snapshot);
            snapshot.version = snapshot.version.next();
            snapshot.version
        };
        self.notify(version);
        version
    }

    fn notify(&self, version: RuleSetVersion) {
        let listeners: Vec<ChangeListener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(version);
        }
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryRuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = read(&self.snapshot);
        f.debug_struct("InMemoryRuleStore")
            .field("rules", &snapshot.rules.len())
            .field("version", &snapshot.version)
            .field("status", &snapshot.status)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn rules_for_role(&self, role: &Role) -> Vec<PermissionRule> {
        read(&self.snapshot)
            .rules
            .values()
            .filter(|rule| &rule.role == role)
            .cloned()
            .collect()
    }

    fn all_rules(&self) -> Vec<PermissionRule> {
        read(&self.snapshot).rules.values().cloned().collect()
    }

    fn current_version(&self) -> RuleSetVersion {
        read(&self.snapshot).version
    }

    fn status(&self) -> StoreStatus {
        read(&self.snapshot).status
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.listeners).remove(&id).is_some()
    }
}

// A panicking listener or mutation must not take the store down with it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::{Action, ResourceKind};
    use std::sync::atomic::AtomicUsize;

    fn rule(id: &str, role: &str) -> PermissionRule {
        PermissionRule::allow(id, role, ResourceKind::Contacts, Action::Read)
    }

    #[test]
    fn test_new_store_is_loading() {
        let store = InMemoryRuleStore::new();
        assert_eq!(store.status(), StoreStatus::Loading);
        assert_eq!(store.current_version(), RuleSetVersion::INITIAL);
    }

    #[test]
    fn test_with_rules_is_ready() {
        let store = InMemoryRuleStore::with_rules(vec![rule("r1", "sales")]).unwrap();
        assert_eq!(store.status(), StoreStatus::Ready);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_every_mutation_bumps_version() {
        let store = InMemoryRuleStore::new();
        let v1 = store.replace_all(vec![rule("r1", "sales")]).unwrap();
        let v2 = store.upsert(rule("r2", "sales"));
        store.remove(&RuleId::new("r1")).unwrap();
        let v3 = store.current_version();

        assert!(v1 < v2 && v2 < v3);
    }

    #[test]
    fn test_remove_missing_rule_keeps_version() {
        let store = InMemoryRuleStore::with_rules(vec![rule("r1", "sales")]).unwrap();
        let before = store.current_version();
        assert!(store.remove(&RuleId::new("nope")).is_none());
        assert_eq!(store.current_version(), before);
    }

    #[test]
    fn test_duplicate_ids_reject_whole_set() {
        let store = InMemoryRuleStore::with_rules(vec![rule("r0", "sales")]).unwrap();
        let before = store.current_version();

        let err = store
            .replace_all(vec![rule("r1", "sales"), rule("r1", "admin")])
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateRuleId(id) if id.as_str() == "r1"));
        assert_eq!(store.current_version(), before);
        assert_eq!(store.all_rules()[0].id.as_str(), "r0");
    }

    #[test]
    fn test_rules_for_role_filters() {
        let store = InMemoryRuleStore::with_rules(vec![
            rule("r1", "sales"),
            rule("r2", "admin"),
            rule("r3", "sales"),
        ])
        .unwrap();

        let ids: Vec<_> = store
            .rules_for_role(&Role::new("sales"))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![RuleId::new("r1"), RuleId::new("r3")]);
    }

    #[test]
    fn test_listeners_are_notified_and_can_unsubscribe() {
        let store = InMemoryRuleStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let id = store.subscribe(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        store.upsert(rule("r1", "sales"));
        store.mark_unavailable("test");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.upsert(rule("r2", "sales"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = Arc::new(InMemoryRuleStore::new());
        let observed = Arc::new(AtomicU64::new(0));

        let reader = Arc::clone(&store);
        let sink = Arc::clone(&observed);
        store.subscribe(Arc::new(move |_| {
            sink.store(reader.current_version().as_u64(), Ordering::SeqCst);
        }));

        let version = store.upsert(rule("r1", "sales"));
        assert_eq!(observed.load(Ordering::SeqCst), version.as_u64());
    }
}

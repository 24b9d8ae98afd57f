//! Permission evaluation engine.
//!
//! Combines role matching, scope inheritance and ABAC conditions into a single
//! decision per context:
//!
//! 1. Deny if the store is not ready.
//! 2. Return a cached decision for `(fingerprint, version)` if present.
//! 3. Select candidate rules: the subject holds the rule's role, resource and
//!    action match, the rule's scope covers the request scope and its scope
//!    instance (if any) matches the context.
//! 4. Fire unconditional candidates and conditional candidates whose
//!    condition holds.
//! 5. Any firing Deny wins. Otherwise any firing Allow wins. Otherwise deny
//!    with "no matching rule".
//!
//! Among rules of the winning effect the reported rule is the one with the
//! narrowest scope, then the highest priority, then the earliest `createdAt`,
//! then the smallest id.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use palisade_abac::evaluate_condition;
use palisade_types::{Effect, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheKey, DEFAULT_CACHE_CAPACITY, DecisionCache};
use crate::clock::{Clock, SystemClock};
use crate::context::PermissionContext;
use crate::decision::{
    PermissionDecision, REASON_NO_MATCHING_RULE, REASON_NOT_READY, REASON_UNAVAILABLE,
};
use crate::fingerprint::fingerprint;
use crate::matrix::PermissionMatrix;
use crate::rule::PermissionRule;
use crate::store::{RuleStore, StoreStatus, SubscriptionId};

// ============================================================================
// Options and statistics
// ============================================================================

/// Construction options for an [`Evaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Maximum number of cached decisions. Zero disables the cache.
    pub cache_capacity: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EvaluatorOptions {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Snapshot of evaluator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorStats {
    /// Calls to [`Evaluator::evaluate`].
    pub evaluations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Times rule selection and combination actually ran.
    pub rule_match_runs: u64,
    /// Warnings raised by ABAC conditions.
    pub condition_warnings: u64,
}

#[derive(Debug, Default)]
struct Counters {
    evaluations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    rule_match_runs: AtomicU64,
    condition_warnings: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> EvaluatorStats {
        EvaluatorStats {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            rule_match_runs: self.rule_match_runs.load(Ordering::Relaxed),
            condition_warnings: self.condition_warnings.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates permission contexts against a rule store.
///
/// Each evaluator owns its decision cache and keeps it subscribed to the
/// store for as long as the evaluator lives.
pub struct Evaluator {
    store: Arc<dyn RuleStore>,
    clock: Arc<dyn Clock>,
    cache: Arc<DecisionCache>,
    counters: Counters,
    subscription: SubscriptionId,
}

impl Evaluator {
    /// Creates an evaluator with the system clock and default options.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self::with_options(store, Arc::new(SystemClock), EvaluatorOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn RuleStore>,
        clock: Arc<dyn Clock>,
        options: EvaluatorOptions,
    ) -> Self {
        let cache = Arc::new(DecisionCache::new(options.cache_capacity));

        let flushed = Arc::clone(&cache);
        let subscription = store.subscribe(Arc::new(move |version| {
            debug!(version = %version, "Rule set changed; flushing decision cache");
            flushed.invalidate_all();
        }));

        Self {
            store,
            clock,
            cache,
            counters: Counters::default(),
            subscription,
        }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    pub fn stats(&self) -> EvaluatorStats {
        self.counters.snapshot()
    }

    /// Evaluates a context.
    ///
    /// # Postcondition
    ///
    /// Always returns exactly one decision. Policy outcomes are never errors.
    pub fn evaluate(&self, ctx: &PermissionContext) -> PermissionDecision {
        Counters::bump(&self.counters.evaluations, 1);

        match self.store.status() {
            StoreStatus::Ready => {}
            StoreStatus::Loading => {
                debug!(subject = %ctx.subject().id(), "Rule store still loading; denying");
                return PermissionDecision::deny(REASON_NOT_READY, self.clock.now());
            }
            StoreStatus::Unavailable => {
                warn!(subject = %ctx.subject().id(), "Rule store unavailable; denying");
                return PermissionDecision::deny(REASON_UNAVAILABLE, self.clock.now());
            }
        }

        // Read the version before the rules: if it moves while we evaluate,
        // the decision may mix two rule sets and must not be cached.
        let version = self.store.current_version();
        let key = CacheKey::new(fingerprint(ctx), version);

        if let Some(hit) = self.cache.get(&key) {
            Counters::bump(&self.counters.cache_hits, 1);
            debug!(fingerprint = ?key.fingerprint, version = %version, "Decision cache hit");
            return hit;
        }
        Counters::bump(&self.counters.cache_misses, 1);

        let decision = self.decide(ctx);

        if self.store.current_version() == version {
            self.cache.insert(key, decision.clone());
        } else {
            debug!(version = %version, "Rule set changed during evaluation; not caching");
        }
        decision
    }

    /// Derives the permission matrix from the store's current rules.
    ///
    /// `extra_roles` are listed even if no rule mentions them.
    pub fn matrix(&self, extra_roles: &[Role]) -> PermissionMatrix {
        PermissionMatrix::from_rules(&self.store.all_rules(), extra_roles)
    }

    // ========================================================================
    // Rule matching
    // ========================================================================

    fn decide(&self, ctx: &PermissionContext) -> PermissionDecision {
        Counters::bump(&self.counters.rule_match_runs, 1);

        let candidates = self.candidates(ctx);
        let attributes = ctx.attributes();

        let mut firing: Vec<&PermissionRule> = Vec::new();

        for rule in &candidates {
            let fires = match &rule.conditions {
                None => true,
                Some(condition) => {
                    let outcome = evaluate_condition(condition, &attributes);
                    if !outcome.warnings.is_empty() {
                        Counters::bump(
                            &self.counters.condition_warnings,
                            outcome.warnings.len() as u64,
                        );
                        for warning in &outcome.warnings {
                            warn!(rule_id = %rule.id, %warning, "Rule condition warning");
                        }
                    }
                    outcome.matched
                }
            };

            if fires {
                firing.push(rule);
            }
        }

        let now = self.clock.now();

        let Some((effect, matched)) = combine(&firing) else {
            debug!(
                subject = %ctx.subject().id(),
                resource = %ctx.resource().kind(),
                action = %ctx.action(),
                candidates = candidates.len(),
                "No rule fired"
            );
            return PermissionDecision::deny(REASON_NO_MATCHING_RULE, now);
        };

        let inherited = matched.scope != ctx.scope();
        let verb = match effect {
            Effect::Allow => "allowed",
            Effect::Deny => "denied",
        };
        let reason = if inherited {
            format!("{verb} by rule '{}' (inherited from {} scope)", matched.id, matched.scope)
        } else {
            format!("{verb} by rule '{}'", matched.id)
        };

        debug!(
            subject = %ctx.subject().id(),
            resource = %ctx.resource().kind(),
            action = %ctx.action(),
            rule_id = %matched.id,
            effect = %effect,
            "Rule matched"
        );

        PermissionDecision {
            effect,
            matched_rule: Some(matched.clone()),
            reason,
            inherited,
            evaluated_at: now,
        }
    }

    /// Rules the subject's roles bring into play for this request.
    fn candidates(&self, ctx: &PermissionContext) -> Vec<PermissionRule> {
        ctx.subject()
            .roles()
            .iter()
            .flat_map(|role| self.store.rules_for_role(role))
            .filter(|rule| is_candidate(rule, ctx))
            .collect()
    }
}

impl Drop for Evaluator {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("cache", &self.cache)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Whether `rule` applies to the request in `ctx`, ignoring conditions.
pub fn is_candidate(rule: &PermissionRule, ctx: &PermissionContext) -> bool {
    ctx.subject().roles().contains(&rule.role)
        && rule.resource == ctx.resource().kind()
        && rule.action == ctx.action()
        && rule.scope.covers(ctx.scope())
        && rule
            .scope_instance
            .as_deref()
            .is_none_or(|instance| ctx.scope_instance(rule.scope) == Some(instance))
}

/// Combines the rules that fired into one effect and the rule reported for it.
///
/// Deny-override: any Deny in `firing` wins over every Allow. Within the
/// winning effect the rule is chosen by [`precedence`]. `None` when nothing
/// fired.
pub fn combine<'a>(firing: &[&'a PermissionRule]) -> Option<(Effect, &'a PermissionRule)> {
    let effect = if firing.iter().any(|rule| rule.effect == Effect::Deny) {
        Effect::Deny
    } else {
        Effect::Allow
    };
    firing
        .iter()
        .copied()
        .filter(|rule| rule.effect == effect)
        .min_by(|a, b| precedence(a, b))
        .map(|rule| (effect, rule))
}

/// Orders rules of the same effect; `Less` means "reported first".
///
/// Narrowest scope, then highest priority, then earliest `createdAt`, then
/// smallest id. The last key makes the order total.
pub fn precedence(a: &PermissionRule, b: &PermissionRule) -> CmpOrdering {
    b.scope
        .cmp(&a.scope)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

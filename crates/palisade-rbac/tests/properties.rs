//! Property tests for rule combination.
//!
//! Random rule sets over a small vocabulary, evaluated against a fixed
//! context. Conditions are either absent, always true or always false so the
//! expected outcome can be computed independently.

use std::sync::Arc;

use palisade_abac::Condition;
use palisade_rbac::decision::REASON_NO_MATCHING_RULE;
use palisade_rbac::evaluator::is_candidate;
use palisade_rbac::{Evaluator, InMemoryRuleStore, PermissionContext, PermissionRule, RuleStore};
use palisade_types::{Action, Effect, ResourceKind, Scope};
use proptest::prelude::*;

fn arb_scope() -> impl Strategy<Value = Scope> {
    prop_oneof![Just(Scope::Global), Just(Scope::Project), Just(Scope::Record)]
}

fn arb_condition() -> impl Strategy<Value = Option<Condition>> {
    prop_oneof![
        Just(None),
        // Empty And holds, empty Or does not.
        Just(Some(Condition::and(vec![]))),
        Just(Some(Condition::or(vec![]))),
    ]
}

fn arb_rule(idx: usize) -> impl Strategy<Value = PermissionRule> {
    (
        prop_oneof![Just("sales"), Just("viewer")],
        prop_oneof![Just(ResourceKind::Contacts), Just(ResourceKind::Reports)],
        prop_oneof![Just(Action::Read), Just(Action::Export)],
        arb_scope(),
        any::<bool>(),
        arb_condition(),
        -5i32..5,
    )
        .prop_map(move |(role, resource, action, scope, allow, conditions, priority)| {
            let effect = if allow { Effect::Allow } else { Effect::Deny };
            let mut rule = PermissionRule::new(format!("r{idx}"), role, resource, action, effect)
                .with_scope(scope)
                .with_priority(priority);
            rule.conditions = conditions;
            rule
        })
}

fn arb_rules() -> impl Strategy<Value = Vec<PermissionRule>> {
    (0usize..12).prop_flat_map(|n| (0..n).map(arb_rule).collect::<Vec<_>>())
}

fn fires(rule: &PermissionRule) -> bool {
    match &rule.conditions {
        None => true,
        Some(Condition::And { and }) => and.is_empty(),
        Some(_) => false,
    }
}

fn context(scope: Scope) -> PermissionContext {
    PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
        .role("sales")
        .scope(scope)
        .build()
        .unwrap()
}

proptest! {
    /// Property: any firing Deny makes the decision Deny; otherwise any
    /// firing Allow makes it Allow; otherwise it is the default deny.
    #[test]
    fn prop_deny_override(rules in arb_rules(), scope in arb_scope()) {
        let ctx = context(scope);
        let firing: Vec<&PermissionRule> = rules
            .iter()
            .filter(|rule| is_candidate(rule, &ctx) && fires(rule))
            .collect();

        let store = Arc::new(InMemoryRuleStore::with_rules(rules.clone()).unwrap());
        let decision = Evaluator::new(store as Arc<dyn RuleStore>).evaluate(&ctx);

        if firing.iter().any(|r| r.effect == Effect::Deny) {
            prop_assert_eq!(decision.effect, Effect::Deny);
            prop_assert_eq!(decision.matched_rule.map(|r| r.effect), Some(Effect::Deny));
        } else if firing.is_empty() {
            prop_assert_eq!(decision.effect, Effect::Deny);
            prop_assert_eq!(decision.reason.as_str(), REASON_NO_MATCHING_RULE);
        } else {
            prop_assert_eq!(decision.effect, Effect::Allow);
        }
    }

    /// Property: an empty rule set denies every context
    #[test]
    fn prop_default_deny(scope in arb_scope()) {
        let store = Arc::new(InMemoryRuleStore::with_rules(vec![]).unwrap());
        let decision = Evaluator::new(store as Arc<dyn RuleStore>).evaluate(&context(scope));

        prop_assert_eq!(decision.effect, Effect::Deny);
        prop_assert_eq!(decision.reason.as_str(), REASON_NO_MATCHING_RULE);
    }

    /// Property: the reported rule is never broader than another firing rule
    /// of the same effect
    #[test]
    fn prop_matched_rule_is_narrowest(rules in arb_rules(), scope in arb_scope()) {
        let ctx = context(scope);
        let store = Arc::new(InMemoryRuleStore::with_rules(rules.clone()).unwrap());
        let decision = Evaluator::new(store as Arc<dyn RuleStore>).evaluate(&ctx);

        if let Some(matched) = decision.matched_rule {
            let narrowest = rules
                .iter()
                .filter(|rule| is_candidate(rule, &ctx) && fires(rule) && rule.effect == matched.effect)
                .map(|rule| rule.scope)
                .max();
            prop_assert_eq!(Some(matched.scope), narrowest);
            prop_assert_eq!(decision.inherited, matched.scope != scope);
        }
    }

    /// Property: repeated evaluation returns identical decisions
    #[test]
    fn prop_determinism(rules in arb_rules(), scope in arb_scope()) {
        let store = Arc::new(InMemoryRuleStore::with_rules(rules).unwrap());
        let evaluator = Evaluator::new(store as Arc<dyn RuleStore>);
        let ctx = context(scope);

        let first = evaluator.evaluate(&ctx);
        let second = evaluator.evaluate(&ctx);
        prop_assert_eq!(first.effect, second.effect);
        prop_assert_eq!(first.matched_rule, second.matched_rule);
        prop_assert_eq!(first.reason, second.reason);
    }
}

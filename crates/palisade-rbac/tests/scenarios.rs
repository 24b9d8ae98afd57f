//! End-to-end evaluation scenarios.
//!
//! Each test builds a rule store, an evaluator and a context through the
//! public API only, and checks the resulting decision.

use std::sync::Arc;

use palisade_abac::{Condition, Operator};
use palisade_rbac::decision::REASON_NO_MATCHING_RULE;
use palisade_rbac::{
    Evaluator, InMemoryRuleStore, PermissionContext, PermissionRule, RuleStore, Subject,
    create_permission_context,
};
use palisade_types::{Action, Effect, ResourceKind, Scope};
use serde_json::json;

fn setup(rules: Vec<PermissionRule>) -> (Arc<InMemoryRuleStore>, Evaluator) {
    let store = Arc::new(InMemoryRuleStore::with_rules(rules).unwrap());
    let evaluator = Evaluator::new(Arc::clone(&store) as Arc<dyn RuleStore>);
    (store, evaluator)
}

#[test]
fn sales_can_read_contacts_globally() {
    let (_store, evaluator) = setup(vec![PermissionRule::allow(
        "sales-read-contacts",
        "sales",
        ResourceKind::Contacts,
        Action::Read,
    )]);

    let ctx = create_permission_context(
        &Subject::new("U1", ["sales"]),
        "contacts",
        "read",
        Scope::Global,
        None,
    )
    .unwrap();
    let decision = evaluator.evaluate(&ctx);

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(
        decision.matched_rule.map(|r| r.id.to_string()),
        Some("sales-read-contacts".to_string())
    );
    assert!(!decision.inherited);
}

#[test]
fn project_deny_overrides_global_allow() {
    let (_store, evaluator) = setup(vec![
        PermissionRule::allow("global-allow", "sales", ResourceKind::Contacts, Action::Read),
        PermissionRule::deny("projectx-deny", "sales", ResourceKind::Contacts, Action::Read)
            .with_scope(Scope::Project)
            .with_scope_instance("projectX"),
    ]);

    let ctx = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
        .role("sales")
        .scope(Scope::Project)
        .project("projectX")
        .build()
        .unwrap();
    let decision = evaluator.evaluate(&ctx);

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.matched_rule.unwrap().id.as_str(), "projectx-deny");

    // Other projects still inherit the global allow.
    let elsewhere = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
        .role("sales")
        .scope(Scope::Project)
        .project("projectY")
        .build()
        .unwrap();
    let decision = evaluator.evaluate(&elsewhere);
    assert_eq!(decision.effect, Effect::Allow);
    assert!(decision.inherited);
}

#[test]
fn viewer_without_rules_is_denied() {
    let (_store, evaluator) = setup(vec![PermissionRule::allow(
        "sales-read",
        "sales",
        ResourceKind::Documents,
        Action::Read,
    )]);

    let ctx = create_permission_context(
        &Subject::new("U9", ["viewer"]),
        "documents",
        "read",
        Scope::Global,
        None,
    )
    .unwrap();
    let decision = evaluator.evaluate(&ctx);

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, REASON_NO_MATCHING_RULE);
    assert!(decision.matched_rule.is_none());
    assert!(!decision.inherited);
}

#[test]
fn editor_may_update_own_project_only() {
    let (_store, evaluator) = setup(vec![
        PermissionRule::allow("owner-update", "editor", ResourceKind::Projects, Action::Update)
            .with_scope(Scope::Record)
            .with_conditions(Condition::leaf(
                "$resource.ownerId",
                Operator::Eq,
                json!("$subject.id"),
            )),
    ]);
    let editor = Subject::new("U1", ["editor"]);

    let own = json!({ "id": "P1", "ownerId": "U1" });
    let ctx = create_permission_context(&editor, "projects", "update", Scope::Record, Some(&own))
        .unwrap();
    assert_eq!(evaluator.evaluate(&ctx).effect, Effect::Allow);

    let foreign = json!({ "id": "P2", "ownerId": "U2" });
    let ctx = create_permission_context(&editor, "projects", "update", Scope::Record, Some(&foreign))
        .unwrap();
    let decision = evaluator.evaluate(&ctx);
    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, REASON_NO_MATCHING_RULE);
}

#[test]
fn repeated_evaluation_is_served_from_cache() {
    let (_store, evaluator) = setup(vec![PermissionRule::allow(
        "sales-read",
        "sales",
        ResourceKind::Contacts,
        Action::Read,
    )]);
    let ctx = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
        .role("sales")
        .build()
        .unwrap();

    let first = evaluator.evaluate(&ctx);
    let second = evaluator.evaluate(&ctx);

    assert_eq!(first, second);
    let stats = evaluator.stats();
    assert_eq!(stats.rule_match_runs, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.evaluations, 2);
}

#[test]
fn toggling_a_rule_is_visible_immediately() {
    let (store, evaluator) = setup(vec![PermissionRule::allow(
        "toggle",
        "sales",
        ResourceKind::Invoices,
        Action::Approve,
    )]);
    let ctx = PermissionContext::builder("U1", ResourceKind::Invoices, Action::Approve)
        .role("sales")
        .build()
        .unwrap();

    assert_eq!(evaluator.evaluate(&ctx).effect, Effect::Allow);

    store.upsert(PermissionRule::deny(
        "toggle",
        "sales",
        ResourceKind::Invoices,
        Action::Approve,
    ));
    assert_eq!(evaluator.evaluate(&ctx).effect, Effect::Deny);

    store.upsert(PermissionRule::allow(
        "toggle",
        "sales",
        ResourceKind::Invoices,
        Action::Approve,
    ));
    assert_eq!(evaluator.evaluate(&ctx).effect, Effect::Allow);
    assert_eq!(evaluator.stats().rule_match_runs, 3);
}

#[test]
fn independent_evaluators_do_not_share_caches() {
    let store = Arc::new(
        InMemoryRuleStore::with_rules(vec![PermissionRule::allow(
            "r1",
            "sales",
            ResourceKind::Contacts,
            Action::Read,
        )])
        .unwrap(),
    );
    let a = Evaluator::new(Arc::clone(&store) as Arc<dyn RuleStore>);
    let b = Evaluator::new(Arc::clone(&store) as Arc<dyn RuleStore>);
    let ctx = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
        .role("sales")
        .build()
        .unwrap();

    a.evaluate(&ctx);
    assert_eq!(a.cache().len(), 1);
    assert!(b.cache().is_empty());
}

#[test]
fn evaluator_is_shareable_across_threads() {
    let (_store, evaluator) = setup(vec![PermissionRule::allow(
        "r1",
        "sales",
        ResourceKind::Contacts,
        Action::Read,
    )]);
    let evaluator = Arc::new(evaluator);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let evaluator = Arc::clone(&evaluator);
            std::thread::spawn(move || {
                let ctx = PermissionContext::builder(format!("U{i}"), ResourceKind::Contacts, Action::Read)
                    .role("sales")
                    .build()
                    .unwrap();
                evaluator.evaluate(&ctx).is_allowed()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(evaluator.stats().evaluations, 4);
}

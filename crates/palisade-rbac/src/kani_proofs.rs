//! Kani bounded model checking proofs for rule combination.
//!
//! These proofs verify the properties of the combination step that do not
//! depend on ABAC conditions:
//! - Proof #1: Scope coverage is reflexive and follows depth
//! - Proof #2: Rule precedence is antisymmetric
//! - Proof #3: `combine` applies deny-override for any effect, priority and scope
//!
//! Run with: `cargo kani --tests --harness verify_*`

#[cfg(kani)]
use crate::evaluator::{combine, precedence};
#[cfg(kani)]
use crate::rule::PermissionRule;
#[cfg(kani)]
use palisade_types::{Action, Effect, ResourceKind, Scope};

#[cfg(kani)]
fn any_scope() -> Scope {
    match kani::any::<u8>() % 3 {
        0 => Scope::Global,
        1 => Scope::Project,
        _ => Scope::Record,
    }
}

//=============================================================================
// Proof #1: Scope Coverage
//=============================================================================

/// **Property**: A scope covers itself, and covers another scope exactly when
/// its depth is not greater.
#[cfg(kani)]
#[kani::proof]
fn verify_scope_coverage() {
    let a = any_scope();
    let b = any_scope();

    assert!(a.covers(a));
    assert_eq!(a.covers(b), a.depth() <= b.depth());
}

//=============================================================================
// Proof #2: Precedence Antisymmetry
//=============================================================================

/// **Property**: `precedence(a, b)` is the reverse of `precedence(b, a)`.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_precedence_antisymmetric() {
    let a = PermissionRule::allow("a", "r", ResourceKind::Contacts, Action::Read)
        .with_scope(any_scope())
        .with_priority(kani::any());
    let b = PermissionRule::allow("b", "r", ResourceKind::Contacts, Action::Read)
        .with_scope(any_scope())
        .with_priority(kani::any());

    assert_eq!(precedence(&a, &b), precedence(&b, &a).reverse());
}

//=============================================================================
// Proof #3: Deny-Override
//=============================================================================

/// **Property**: For any two firing rules of any effect, scope and priority,
/// `combine` reports Deny exactly when one of them is a Deny, and the
/// reported rule carries the reported effect.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_deny_override() {
    let effect = |deny: bool| if deny { Effect::Deny } else { Effect::Allow };
    let first = PermissionRule::new(
        "a",
        "r",
        ResourceKind::Contacts,
        Action::Read,
        effect(kani::any()),
    )
        .with_scope(any_scope())
        .with_priority(kani::any());
    let second = PermissionRule::new(
        "b",
        "r",
        ResourceKind::Contacts,
        Action::Read,
        effect(kani::any()),
    )
        .with_scope(any_scope())
        .with_priority(kani::any());

    let any_deny = first.effect == Effect::Deny || second.effect == Effect::Deny;
    let Some((combined, rule)) = combine(&[&first, &second]) else {
        panic!("two firing rules must combine");
    };

    assert_eq!(combined == Effect::Deny, any_deny);
    assert_eq!(rule.effect, combined);
    assert!(combine(&[]).is_none());
}

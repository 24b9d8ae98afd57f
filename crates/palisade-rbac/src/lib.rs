//! # palisade-rbac: Role-Based Access Control evaluation
//!
//! Provides the permission evaluation core for Palisade:
//! - **Rules** granting or denying `(role, resource, action)` at a scope
//! - **Context building** from an authenticated subject and a resource
//! - **Evaluation** with scope inheritance and deny-override
//! - **Decision caching** keyed by context fingerprint and rule-set version
//! - **Permission matrix** projection for admin screens
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  PermissionContext                           │
//! │  (subject + resource + action + scope)       │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator                                   │
//! │  ├─ Readiness check (RuleStore status)       │
//! │  ├─ DecisionCache lookup                     │
//! │  ├─ Candidate rules by role/resource/scope   │
//! │  ├─ ABAC conditions (palisade-abac)          │
//! │  └─ Deny-override combination                │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PermissionDecision                          │
//! │  - Effect (Allow/Deny)                       │
//! │  - Matched rule, inherited flag, reason      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Combination
//!
//! | Firing rules          | Effect | Reported rule                    |
//! |-----------------------|--------|----------------------------------|
//! | none                  | Deny   | none ("no matching rule")        |
//! | Allows only           | Allow  | narrowest / highest priority     |
//! | any Deny              | Deny   | narrowest / highest priority Deny|
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use palisade_rbac::{Evaluator, InMemoryRuleStore, PermissionContext, PermissionRule};
//! use palisade_types::{Action, ResourceKind, Scope};
//!
//! let store = Arc::new(InMemoryRuleStore::with_rules(vec![
//!     PermissionRule::allow("sales-read", "sales", ResourceKind::Contacts, Action::Read),
//!     PermissionRule::deny("px-lock", "sales", ResourceKind::Contacts, Action::Read)
//!         .with_scope(Scope::Project)
//!         .with_scope_instance("projectX"),
//! ])?);
//! let evaluator = Evaluator::new(store);
//!
//! let ctx = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
//!     .role("sales")
//!     .scope(Scope::Project)
//!     .project("projectX")
//!     .build()?;
//!
//! let decision = evaluator.evaluate(&ctx);
//! assert!(!decision.is_allowed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod clock;
pub mod context;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod matrix;
pub mod rule;
pub mod store;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

pub use cache::{CacheKey, DecisionCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{ContextBuilder, PermissionContext, Subject, create_permission_context};
pub use decision::PermissionDecision;
pub use error::{ContextError, StoreError};
pub use evaluator::{Evaluator, EvaluatorOptions, EvaluatorStats};
pub use matrix::{PermissionKey, PermissionMatrix};
pub use rule::PermissionRule;
pub use store::{ChangeListener, InMemoryRuleStore, RuleStore, StoreStatus, SubscriptionId};

//! # Palisade
//!
//! Permission evaluation for business applications.
//!
//! Palisade answers "may this subject perform this action on this resource,
//! at this scope?" by combining:
//!
//! - **Role rules** - grants and denials per `(role, resource, action)`
//! - **Scope inheritance** - global rules apply to projects and records
//! - **Attribute conditions** - `$resource.ownerId eq $subject.id` and friends
//! - **Deny-override** - one firing deny beats any number of allows
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Palisade                           │
//! │  ┌─────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │  Rules  │ → │  Context  │ → │Evaluator │ → │ Decision │  │
//! │  │ (store) │   │ (builder) │   │  + ABAC  │   │ (cached) │  │
//! │  └─────────┘   └───────────┘   └──────────┘   └──────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use palisade::{Action, Guard, GuardOutcome, InMemoryRuleStore, Palisade, PermissionRule};
//! use palisade::{ResourceKind, Subject};
//!
//! let store = InMemoryRuleStore::with_rules(vec![
//!     PermissionRule::allow("sales-read", "sales", ResourceKind::Contacts, Action::Read),
//! ])?;
//! let palisade = Palisade::new(Arc::new(store));
//! let subject = Subject::new("U1", ["sales"]);
//!
//! assert!(palisade.can(&subject, "contacts", "read", None, None).allowed);
//!
//! let guard = Guard::new(ResourceKind::Contacts, Action::Delete).with_redirect("/403");
//! assert_eq!(
//!     guard.check(&palisade, &subject),
//!     GuardOutcome::<()>::Redirect("/403".to_string())
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - **Consumer layer**: [`Palisade`], [`SubjectSession`], [`Guard`]
//! - **Rule documents**: [`JsonFileRuleStore`], [`RuleDocument`]
//! - **Core**: re-exported from `palisade-rbac` and `palisade-abac`

mod error;
mod guard;
mod service;
mod store;

// Consumer layer
pub use error::{PalisadeError, Result};
pub use guard::{Guard, GuardOutcome};
pub use service::{CanResult, Palisade, SubjectSession};
pub use store::{JsonFileRuleStore, Revision, RuleDocument};

// Re-export shared types
pub use palisade_types::{
    Action, Effect, Fingerprint, ResourceKind, Role, RuleId, RuleSetVersion, Scope, SubjectId,
};

// Re-export the evaluation core
pub use palisade_rbac::{
    ContextBuilder, ContextError, Evaluator, EvaluatorOptions, EvaluatorStats, InMemoryRuleStore,
    PermissionContext, PermissionDecision, PermissionKey, PermissionMatrix, PermissionRule,
    RuleStore, StoreError, StoreStatus, Subject, create_permission_context,
};

// Re-export condition types
pub use palisade_abac::{Condition, ConditionWarning, Leaf, Operator, UnsupportedOperatorError};

// Re-export configuration
pub use palisade_config::{ConfigLoader, PalisadeConfig};

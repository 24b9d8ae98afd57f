//! # palisade-abac: Attribute-Based Access Control predicates
//!
//! Evaluates boolean condition trees against subject and resource attributes.
//! The role layer (`palisade-rbac`) decides which rules are candidates; this
//! crate decides whether a candidate's condition holds.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Condition tree                              │
//! │  Leaf | And[..] | Or[..] | Not(..)           │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Predicate Evaluator                         │
//! │  ├─ Resolve $subject. / $resource. paths     │
//! │  ├─ Apply operator (eq, in, gt, contains..)  │
//! │  └─ Short-circuit And / Or                   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  ConditionOutcome                            │
//! │  - matched (bool)                            │
//! │  - warnings (unsupported operator, types)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Evaluation never fails. A missing attribute or a type mismatch makes the
//! affected leaf `false`. An unsupported operator makes the whole condition
//! unmatchable, even under `not`. Both problems are reported as a
//! [`ConditionWarning`].
//!
//! ## Examples
//!
//! ```
//! use palisade_abac::{AttributeSet, Condition, Operator, flatten, matches};
//! use serde_json::json;
//!
//! let subject = flatten(&json!({ "id": "U1" }));
//! let resource = flatten(&json!({ "ownerId": "U1", "status": "draft" }));
//! let attrs = AttributeSet::new(&subject, &resource);
//!
//! let owner_may_edit_drafts = Condition::and(vec![
//!     Condition::leaf("ownerId", Operator::Eq, json!("$subject.id")),
//!     Condition::leaf("status", Operator::In, json!(["draft", "review"])),
//! ]);
//!
//! assert!(matches(&owner_may_edit_drafts, &attrs));
//! ```

pub mod attributes;
pub mod condition;
pub mod evaluator;

pub use attributes::{AttributeMap, AttributeSet, flatten, flatten_into};
pub use condition::{Condition, Leaf, Operator};
pub use evaluator::{
    ConditionOutcome, ConditionWarning, UnsupportedOperatorError, evaluate_condition, matches,
};

//! Permission rules.
//!
//! A rule grants or denies one `(role, resource, action)` triple at a scope,
//! optionally narrowed by a scope instance and an ABAC condition. Rules may
//! overlap freely; the evaluator resolves conflicts.

use chrono::{DateTime, Utc};
use palisade_abac::Condition;
use palisade_types::{Action, Effect, ResourceKind, Role, RuleId, Scope};
use serde::{Deserialize, Serialize};

/// A single permission rule.
///
/// # Wire format
///
/// ```json
/// {
///   "id": "r-17",
///   "role": "editor",
///   "resource": "projects",
///   "action": "update",
///   "scope": "record",
///   "effect": "allow",
///   "conditions": { "attributePath": "ownerId", "operator": "eq", "value": "$subject.id" },
///   "priority": 10,
///   "createdAt": "2024-03-01T09:00:00Z"
/// }
/// ```
///
/// `scope` defaults to `global`, `priority` to `0` and `createdAt` to the Unix
/// epoch when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    pub id: RuleId,
    pub role: Role,
    pub resource: ResourceKind,
    pub action: Action,
    #[serde(default)]
    pub scope: Scope,
    /// Restricts the rule to one instance of its scope (e.g. one project).
    ///
    /// Only `project` and `record` scopes have instances. A `global` rule
    /// with a scope instance matches no request and never fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_instance: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Condition>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl PermissionRule {
    /// Creates a global, unconditional rule with priority 0.
    pub fn new(
        id: impl Into<RuleId>,
        role: impl Into<Role>,
        resource: ResourceKind,
        action: Action,
        effect: Effect,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            resource,
            action,
            scope: Scope::Global,
            scope_instance: None,
            effect,
            conditions: None,
            priority: 0,
            created_at: DateTime::<Utc>::default(),
        }
    }

    pub fn allow(
        id: impl Into<RuleId>,
        role: impl Into<Role>,
        resource: ResourceKind,
        action: Action,
    ) -> Self {
        Self::new(id, role, resource, action, Effect::Allow)
    }

    pub fn deny(
        id: impl Into<RuleId>,
        role: impl Into<Role>,
        resource: ResourceKind,
        action: Action,
    ) -> Self {
        Self::new(id, role, resource, action, Effect::Deny)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_scope_instance(mut self, instance: impl Into<String>) -> Self {
        self.scope_instance = Some(instance.into());
        self
    }

    pub fn with_conditions(mut self, condition: Condition) -> Self {
        self.conditions = Some(condition);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// True when the rule has no ABAC condition.
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_none()
    }

    /// True for rules that apply to every instance of every scope level.
    ///
    /// These are the only rules a [`PermissionMatrix`](crate::PermissionMatrix)
    /// can represent.
    pub fn is_blanket(&self) -> bool {
        self.scope == Scope::Global && self.scope_instance.is_none() && self.is_unconditional()
    }
}

//! Permission context construction.
//!
//! A [`PermissionContext`] is the normalized, immutable input to the
//! evaluator. It is built fresh for every request, either from loosely typed
//! input with [`create_permission_context`] or with [`ContextBuilder`].
//!
//! Normalization:
//! - subject roles become a sorted set; blank role names are dropped
//! - subject and resource attributes are flattened to dot paths
//! - the subject's `id` and `roles` are exposed as attributes of the same name
//! - a resource instance's `id` (string or number) becomes `instance_id`
//! - `projectId` on the instance (or the id of a `projects` instance) names the
//!   project scope instance, and the instance id names the record scope instance

use std::collections::{BTreeMap, BTreeSet};

use palisade_abac::{AttributeMap, AttributeSet, flatten};
use palisade_types::{Action, ResourceKind, Role, Scope, SubjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContextError;

/// Instance attribute naming the project a record belongs to.
pub const PROJECT_ID_ATTRIBUTE: &str = "projectId";

// ============================================================================
// Subject input
// ============================================================================

/// An already-authenticated subject, as handed over by the session layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: Value,
}

impl Subject {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            attributes: Value::Null,
        }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}

// ============================================================================
// Normalized context
// ============================================================================

/// The subject half of a context.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectContext {
    id: SubjectId,
    roles: BTreeSet<Role>,
    attributes: AttributeMap,
}

impl SubjectContext {
    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

/// The resource half of a context.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContext {
    kind: ResourceKind,
    instance_id: Option<String>,
    attributes: AttributeMap,
}

impl ResourceContext {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

/// Normalized evaluation input. Fields are private: a context can only be
/// produced by the builder, so every context has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionContext {
    subject: SubjectContext,
    resource: ResourceContext,
    action: Action,
    scope: Scope,
    scope_instances: BTreeMap<Scope, String>,
}

impl PermissionContext {
    pub fn builder(
        subject_id: impl Into<String>,
        resource: ResourceKind,
        action: Action,
    ) -> ContextBuilder {
        ContextBuilder::new(subject_id, resource, action)
    }

    pub fn subject(&self) -> &SubjectContext {
        &self.subject
    }

    pub fn resource(&self) -> &ResourceContext {
        &self.resource
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Instance ids per scope level (`project -> "projectX"`).
    pub fn scope_instances(&self) -> &BTreeMap<Scope, String> {
        &self.scope_instances
    }

    pub fn scope_instance(&self, level: Scope) -> Option<&str> {
        self.scope_instances.get(&level).map(String::as_str)
    }

    /// Attributes visible to ABAC conditions.
    pub fn attributes(&self) -> AttributeSet<'_> {
        AttributeSet::new(&self.subject.attributes, &self.resource.attributes)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Typed builder for [`PermissionContext`].
///
/// # Examples
///
/// ```
/// use palisade_rbac::PermissionContext;
/// use palisade_types::{Action, ResourceKind, Scope};
/// use serde_json::json;
///
/// let ctx = PermissionContext::builder("U1", ResourceKind::Documents, Action::Read)
///     .role("viewer")
///     .scope(Scope::Project)
///     .project("projectX")
///     .instance(json!({ "id": "D7", "owner": { "id": "U2" } }))
///     .build()
///     .unwrap();
///
/// assert_eq!(ctx.resource().instance_id(), Some("D7"));
/// assert!(ctx.resource().attributes().contains_key("owner.id"));
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    subject_id: String,
    roles: Vec<String>,
    subject_attributes: Value,
    resource: ResourceKind,
    action: Action,
    scope: Scope,
    instance: Option<Value>,
    scope_instances: BTreeMap<Scope, String>,
}

impl ContextBuilder {
    pub fn new(subject_id: impl Into<String>, resource: ResourceKind, action: Action) -> Self {
        Self {
            subject_id: subject_id.into(),
            roles: Vec::new(),
            subject_attributes: Value::Null,
            resource,
            action,
            scope: Scope::Global,
            instance: None,
            scope_instances: BTreeMap::new(),
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn subject_attributes(mut self, attributes: Value) -> Self {
        self.subject_attributes = attributes;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// The resource instance being accessed. Its fields become resource attributes.
    pub fn instance(mut self, instance: Value) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Names the project the request is made in.
    pub fn project(mut self, id: impl Into<String>) -> Self {
        self.scope_instances.insert(Scope::Project, id.into());
        self
    }

    /// Names the record the request targets.
    pub fn record(mut self, id: impl Into<String>) -> Self {
        self.scope_instances.insert(Scope::Record, id.into());
        self
    }

    pub fn build(self) -> Result<PermissionContext, ContextError> {
        if self.subject_id.trim().is_empty() {
            return Err(ContextError::BlankSubjectId);
        }

        let roles: BTreeSet<Role> = self
            .roles
            .into_iter()
            .filter(|role| !role.trim().is_empty())
            .map(Role::from)
            .collect();
        if roles.is_empty() {
            return Err(ContextError::NoRoles);
        }

        let mut subject_attributes = flatten(&self.subject_attributes);
        subject_attributes.insert("id".to_string(), Value::String(self.subject_id.clone()));
        subject_attributes.insert(
            "roles".to_string(),
            Value::Array(
                roles
                    .iter()
                    .map(|role| Value::String(role.to_string()))
                    .collect(),
            ),
        );

        let (instance_id, resource_attributes) = match &self.instance {
            Some(instance) => (instance_id_of(instance), flatten(instance)),
            None => (None, AttributeMap::new()),
        };

        // Explicit scope instances win over those derived from the instance.
        let mut scope_instances = BTreeMap::new();
        if let Some(project) = resource_attributes
            .get(PROJECT_ID_ATTRIBUTE)
            .and_then(id_string)
            .or_else(|| {
                (self.resource == ResourceKind::Projects)
                    .then(|| instance_id.clone())
                    .flatten()
            })
        {
            scope_instances.insert(Scope::Project, project);
        }
        if let Some(record) = &instance_id {
            scope_instances.insert(Scope::Record, record.clone());
        }
        scope_instances.extend(self.scope_instances);

        Ok(PermissionContext {
            subject: SubjectContext {
                id: SubjectId::new(self.subject_id),
                roles,
                attributes: subject_attributes,
            },
            resource: ResourceContext {
                kind: self.resource,
                instance_id,
                attributes: resource_attributes,
            },
            action: self.action,
            scope: self.scope,
            scope_instances,
        })
    }
}

fn instance_id_of(instance: &Value) -> Option<String> {
    instance.get("id").and_then(id_string)
}

/// Ids may be strings or numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// String entry point
// ============================================================================

/// Builds a context from loosely typed input.
///
/// # Errors
///
/// Returns [`ContextError`] when the subject has no roles, the subject id is
/// blank, or `resource_type` / `action` are not members of their enums.
pub fn create_permission_context(
    subject: &Subject,
    resource_type: &str,
    action: &str,
    scope: Scope,
    resource_instance: Option<&Value>,
) -> Result<PermissionContext, ContextError> {
    let resource: ResourceKind = resource_type.parse()?;
    let action: Action = action.parse()?;

    let mut builder = ContextBuilder::new(subject.id.clone(), resource, action)
        .roles(subject.roles.iter().cloned())
        .subject_attributes(subject.attributes.clone())
        .scope(scope);
    if let Some(instance) = resource_instance {
        builder = builder.instance(instance.clone());
    }
    builder.build()
}

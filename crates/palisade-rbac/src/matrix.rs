//! Permission matrix projection.
//!
//! A read-only `role x (resource:action)` grid derived from the rule set for
//! admin screens. It only reflects blanket rules (global scope, no instance,
//! no condition); anything finer-grained needs a real evaluation. The rule set
//! remains the source of truth.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use palisade_types::{Action, Effect, ParseError, ResourceKind, Role};
use serde::{Deserialize, Serialize};

use crate::rule::PermissionRule;

// ============================================================================
// Permission key
// ============================================================================

/// A `resource:action` pair, e.g. `contacts:read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PermissionKey {
    pub resource: ResourceKind,
    pub action: Action,
}

impl PermissionKey {
    pub fn new(resource: ResourceKind, action: Action) -> Self {
        Self { resource, action }
    }

    /// Every key, resources outermost.
    pub fn all() -> Vec<PermissionKey> {
        ResourceKind::ALL
            .iter()
            .flat_map(|&resource| Action::ALL.iter().map(move |&action| Self::new(resource, action)))
            .collect()
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))?;
        Ok(Self::new(resource.parse()?, action.parse()?))
    }
}

impl From<PermissionKey> for String {
    fn from(key: PermissionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Matrix
// ============================================================================

/// Derived `role -> permission -> granted` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMatrix {
    pub roles: Vec<Role>,
    pub permissions: Vec<PermissionKey>,
    pub matrix: BTreeMap<Role, BTreeMap<PermissionKey, bool>>,
}

impl PermissionMatrix {
    /// Builds the matrix from `rules`.
    ///
    /// A cell is `true` iff some blanket Allow exists for it and no blanket
    /// Deny does. Roles are those named by any rule plus `extra_roles`, sorted.
    pub fn from_rules(rules: &[PermissionRule], extra_roles: &[Role]) -> Self {
        let roles: BTreeSet<Role> = rules
            .iter()
            .map(|rule| rule.role.clone())
            .chain(extra_roles.iter().cloned())
            .collect();

        let mut allowed: BTreeSet<(&Role, PermissionKey)> = BTreeSet::new();
        let mut denied: BTreeSet<(&Role, PermissionKey)> = BTreeSet::new();
        for rule in rules.iter().filter(|rule| rule.is_blanket()) {
            let cell = (&rule.role, PermissionKey::new(rule.resource, rule.action));
            match rule.effect {
                Effect::Allow => allowed.insert(cell),
                Effect::Deny => denied.insert(cell),
            };
        }

        let permissions = PermissionKey::all();
        let matrix = roles
            .iter()
            .map(|role| {
                let row = permissions
                    .iter()
                    .map(|&key| {
                        let cell = (role, key);
                        (key, allowed.contains(&cell) && !denied.contains(&cell))
                    })
                    .collect();
                (role.clone(), row)
            })
            .collect();

        Self {
            roles: roles.into_iter().collect(),
            permissions,
            matrix,
        }
    }

    pub fn is_allowed(&self, role: &Role, key: PermissionKey) -> bool {
        self.matrix
            .get(role)
            .and_then(|row| row.get(&key))
            .copied()
            .unwrap_or(false)
    }

    /// Keys granted to `role`, in matrix order.
    pub fn granted(&self, role: &Role) -> Vec<PermissionKey> {
        self.matrix
            .get(role)
            .map(|row| {
                row.iter()
                    .filter(|(_, granted)| **granted)
                    .map(|(key, _)| *key)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_abac::Condition;
    use palisade_types::Scope;

    fn key(resource: ResourceKind, action: Action) -> PermissionKey {
        PermissionKey::new(resource, action)
    }

    #[test]
    fn test_blanket_allow_sets_cell() {
        let rules = vec![PermissionRule::allow("r1", "sales", ResourceKind::Contacts, Action::Read)];
        let matrix = PermissionMatrix::from_rules(&rules, &[]);

        let sales = Role::new("sales");
        assert!(matrix.is_allowed(&sales, key(ResourceKind::Contacts, Action::Read)));
        assert!(!matrix.is_allowed(&sales, key(ResourceKind::Contacts, Action::Delete)));
        assert_eq!(matrix.granted(&sales), vec![key(ResourceKind::Contacts, Action::Read)]);
    }

    #[test]
    fn test_blanket_deny_clears_cell() {
        let rules = vec![
            PermissionRule::allow("r1", "sales", ResourceKind::Contacts, Action::Read),
            PermissionRule::deny("r2", "sales", ResourceKind::Contacts, Action::Read),
        ];
        let matrix = PermissionMatrix::from_rules(&rules, &[]);
        assert!(!matrix.is_allowed(&Role::new("sales"), key(ResourceKind::Contacts, Action::Read)));
    }

    #[test]
    fn test_non_blanket_rules_are_ignored() {
        let rules = vec![
            PermissionRule::allow("r1", "sales", ResourceKind::Contacts, Action::Read)
                .with_scope(Scope::Project),
            PermissionRule::allow("r2", "sales", ResourceKind::Contacts, Action::Update)
                .with_conditions(Condition::exists("ownerId")),
            // A narrow deny does not clear a blanket allow in the projection.
            PermissionRule::allow("r3", "sales", ResourceKind::Reports, Action::Export),
            PermissionRule::deny("r4", "sales", ResourceKind::Reports, Action::Export)
                .with_scope_instance("p1"),
        ];
        let matrix = PermissionMatrix::from_rules(&rules, &[]);
        let sales = Role::new("sales");

        assert!(!matrix.is_allowed(&sales, key(ResourceKind::Contacts, Action::Read)));
        assert!(!matrix.is_allowed(&sales, key(ResourceKind::Contacts, Action::Update)));
        assert!(matrix.is_allowed(&sales, key(ResourceKind::Reports, Action::Export)));
    }

    #[test]
    fn test_extra_roles_are_listed() {
        let matrix = PermissionMatrix::from_rules(&[], &[Role::new("viewer")]);
        assert_eq!(matrix.roles, vec![Role::new("viewer")]);
        assert_eq!(matrix.permissions.len(), ResourceKind::ALL.len() * Action::ALL.len());
        assert!(matrix.granted(&Role::new("viewer")).is_empty());
    }

    #[test]
    fn test_json_shape_uses_resource_action_keys() {
        let rules = vec![PermissionRule::allow("r1", "sales", ResourceKind::Contacts, Action::Read)];
        let value = serde_json::to_value(PermissionMatrix::from_rules(&rules, &[])).unwrap();

        assert_eq!(value["roles"], serde_json::json!(["sales"]));
        assert_eq!(value["permissions"][0], serde_json::json!("contacts:create"));
        assert_eq!(value["matrix"]["sales"]["contacts:read"], serde_json::json!(true));

        let back: PermissionMatrix = serde_json::from_value(value).unwrap();
        assert!(back.is_allowed(&Role::new("sales"), key(ResourceKind::Contacts, Action::Read)));
    }

    #[test]
    fn test_permission_key_parse() {
        assert_eq!(
            "invoices:approve".parse::<PermissionKey>().unwrap(),
            key(ResourceKind::Invoices, Action::Approve)
        );
        assert!("invoices".parse::<PermissionKey>().is_err());
        assert!("invoices:fly".parse::<PermissionKey>().is_err());
    }
}

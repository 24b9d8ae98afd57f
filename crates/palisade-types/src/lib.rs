//! # palisade-types: Core types for `Palisade`
//!
//! This crate contains shared types used across the `Palisade` system:
//! - Protected vocabulary ([`ResourceKind`], [`Action`], [`Scope`], [`Effect`])
//! - Identifiers ([`Role`], [`SubjectId`], [`RuleId`])
//! - Rule-set revisions ([`RuleSetVersion`])
//! - Cache keys ([`Fingerprint`])
//!
//! The enums are closed on purpose: a resource or action that is not listed
//! here cannot be named in a rule or a request. Extending the vocabulary means
//! adding a variant.

use std::fmt::{Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Parse errors
// ============================================================================

/// Error returned when a string does not name a member of a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown resource: {0:?}")]
    UnknownResource(String),

    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    #[error("unknown scope: {0:?}")]
    UnknownScope(String),

    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),
}

// ============================================================================
// Resource kinds
// ============================================================================

/// Protected resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Contacts,
    Companies,
    Projects,
    Documents,
    Settings,
    Pipeline,
    Estimates,
    Invoices,
    Reports,
    Users,
}

impl ResourceKind {
    /// Every resource kind, in declaration order.
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Contacts,
        ResourceKind::Companies,
        ResourceKind::Projects,
        ResourceKind::Documents,
        ResourceKind::Settings,
        ResourceKind::Pipeline,
        ResourceKind::Estimates,
        ResourceKind::Invoices,
        ResourceKind::Reports,
        ResourceKind::Users,
    ];

    /// Returns the wire name (`"contacts"`, `"pipeline"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Contacts => "contacts",
            ResourceKind::Companies => "companies",
            ResourceKind::Projects => "projects",
            ResourceKind::Documents => "documents",
            ResourceKind::Settings => "settings",
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::Estimates => "estimates",
            ResourceKind::Invoices => "invoices",
            ResourceKind::Reports => "reports",
            ResourceKind::Users => "users",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownResource(s.to_string()))
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Operation performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Sign off on a record (estimates, invoices, documents).
    Approve,
    /// Move data outside the application (CSV, PDF, API pull).
    Export,
    /// Hand a record over to another owner.
    Assign,
    /// Administrative control over the resource type itself.
    Manage,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 8] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Approve,
        Action::Export,
        Action::Assign,
        Action::Manage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Export => "export",
            Action::Assign => "assign",
            Action::Manage => "manage",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Hierarchical qualifier bounding where a rule applies.
///
/// Ordered from broadest to narrowest: `Global ⊇ Project ⊇ Record`.
/// The derived `Ord` follows that order, so `Global < Project < Record`
/// reads as "broader than".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    #[default]
    Global,
    Project,
    Record,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Global, Scope::Project, Scope::Record];

    /// Distance from the root of the hierarchy (`Global` = 0).
    pub fn depth(&self) -> u8 {
        match self {
            Scope::Global => 0,
            Scope::Project => 1,
            Scope::Record => 2,
        }
    }

    /// Returns whether a rule at this scope covers a request at `other`.
    ///
    /// True when `self` is equal to or an ancestor of `other`.
    ///
    /// ```
    /// use palisade_types::Scope;
    ///
    /// assert!(Scope::Global.covers(Scope::Record));
    /// assert!(Scope::Project.covers(Scope::Project));
    /// assert!(!Scope::Record.covers(Scope::Project));
    /// ```
    pub fn covers(&self, other: Scope) -> bool {
        self.depth() <= other.depth()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
            Scope::Record => "record",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| ParseError::UnknownScope(s.to_string()))
    }
}

// ============================================================================
// Effect
// ============================================================================

/// The effect of a rule or decision: allow or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Default for Effect {
    /// Defaults to `Deny` (deny unless explicitly allowed).
    fn default() -> Self {
        Self::Deny
    }
}

impl Effect {
    pub fn is_allow(&self) -> bool {
        matches!(self, Effect::Allow)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Effect::Deny)
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
        }
    }
}

impl FromStr for Effect {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(ParseError::UnknownEffect(other.to_string())),
        }
    }
}

// ============================================================================
// String identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// A named role (`"sales"`, `"editor"`, `"viewer"`).
    ///
    /// Roles are defined by administrators, so unlike resources and actions
    /// they form an open set.
    Role
);

string_id!(
    /// Identifier of an already-authenticated subject.
    SubjectId
);

string_id!(
    /// Identifier of a permission rule.
    RuleId
);

// ============================================================================
// Rule-set version
// ============================================================================

/// Monotonically increasing revision of the rule set.
///
/// Every mutation of the rule store bumps the version. Cached decisions are
/// keyed by the version they were computed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RuleSetVersion(u64);

impl RuleSetVersion {
    pub const INITIAL: RuleSetVersion = RuleSetVersion(0);

    pub fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for RuleSetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for RuleSetVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RuleSetVersion> for u64 {
    fn from(version: RuleSetVersion) -> Self {
        version.0
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// 32-byte digest of a normalized evaluation context.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; Fingerprint::LENGTH]);

impl Fingerprint {
    pub const LENGTH: usize = 32;

    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 8 bytes are enough to tell fingerprints apart in logs.
        write!(f, "Fingerprint(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

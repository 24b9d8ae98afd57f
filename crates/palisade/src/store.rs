//! JSON rule documents.
//!
//! A rule document is either an object carrying a revision marker
//!
//! ```json
//! { "revision": 42, "rules": [ { "id": "r1", ... } ] }
//! ```
//!
//! or a bare array of rules. The revision may be an integer or an opaque
//! string (an ETag); it is informational only, the store keeps its own
//! monotonic version.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use palisade_rbac::{
    ChangeListener, InMemoryRuleStore, PermissionRule, RuleStore, StoreError, StoreStatus,
    SubscriptionId,
};
use palisade_types::{Role, RuleId, RuleSetVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

// ============================================================================
// Rule document
// ============================================================================

/// Revision marker carried by a rule document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Revision {
    Number(u64),
    Tag(String),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Number(n) => write!(f, "{n}"),
            Revision::Tag(tag) => f.write_str(tag),
        }
    }
}

/// A parsed rule document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    pub rules: Vec<PermissionRule>,
}

impl RuleDocument {
    /// Parses either document shape.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] for malformed JSON or rules, and
    /// [`StoreError::DuplicateRuleId`] if two rules share an id.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(text)?;
        let document = if value.is_array() {
            RuleDocument {
                revision: None,
                rules: serde_json::from_value(value)?,
            }
        } else {
            serde_json::from_value(value)?
        };
        document.check_unique_ids()?;
        Ok(document)
    }

    fn check_unique_ids(&self) -> Result<(), StoreError> {
        let mut seen = std::collections::BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(&rule.id) {
                return Err(StoreError::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(())
    }

    /// `(rule id, operator name)` for every unsupported leaf. Rules listed here never fire.
    pub fn unsupported_operators(&self) -> Vec<(RuleId, String)> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.conditions
                    .iter()
                    .flat_map(|condition| condition.unsupported_operators())
                    .map(|op| (rule.id.clone(), op.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// A [`RuleStore`] fed from a JSON rule document on disk.
///
/// Starts in `Loading`. [`load`](Self::load) reads the document with
/// `tokio::fs`; a failed load marks the store `Unavailable` so every
/// evaluation denies until a later load succeeds.
pub struct JsonFileRuleStore {
    path: PathBuf,
    rules: InMemoryRuleStore,
    revision: RwLock<Option<Revision>>,
}

impl JsonFileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: InMemoryRuleStore::new(),
            revision: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Revision of the last successfully loaded document.
    pub fn revision(&self) -> Option<Revision> {
        self.revision
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reads and installs the rule document.
    ///
    /// # Errors
    ///
    /// Marks the store unavailable and returns [`StoreError::Unavailable`]
    /// wrapping the read or parse error.
    pub async fn load(&self) -> Result<RuleSetVersion, StoreError> {
        match self.install().await {
            Ok(version) => Ok(version),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to load rule document");
                self.rules.mark_unavailable(&err.to_string());
                Err(StoreError::Unavailable(Box::new(err)))
            }
        }
    }

    async fn install(&self) -> Result<RuleSetVersion, StoreError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let document = RuleDocument::parse(&text)?;
        let count = document.rules.len();

        let version = self.rules.replace_all(document.rules)?;
        *self.revision.write().unwrap_or_else(PoisonError::into_inner) = document.revision;
        info!(
            path = %self.path.display(),
            version = %version,
            rules = count,
            "Rule document loaded"
        );
        Ok(version)
    }
}

impl fmt::Debug for JsonFileRuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileRuleStore")
            .field("path", &self.path)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl RuleStore for JsonFileRuleStore {
    fn rules_for_role(&self, role: &Role) -> Vec<PermissionRule> {
        self.rules.rules_for_role(role)
    }

    fn all_rules(&self) -> Vec<PermissionRule> {
        self.rules.all_rules()
    }

    fn current_version(&self) -> RuleSetVersion {
        self.rules.current_version()
    }

    fn status(&self) -> StoreStatus {
        self.rules.status()
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.rules.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.rules.unsubscribe(id)
    }
}

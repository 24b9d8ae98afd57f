//! Permission decisions.

use chrono::{DateTime, Utc};
use palisade_types::Effect;
use serde::{Deserialize, Serialize};

use crate::rule::PermissionRule;

/// Reason given when no rule fires.
pub const REASON_NO_MATCHING_RULE: &str = "no matching rule";

/// Reason given while the rule store has not finished loading.
pub const REASON_NOT_READY: &str = "policy store not ready";

/// Reason given when the rule store failed to load.
pub const REASON_UNAVAILABLE: &str = "policy store unavailable";

/// The outcome of evaluating one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    pub effect: Effect,
    /// The rule that determined the outcome, if any fired.
    pub matched_rule: Option<PermissionRule>,
    pub reason: String,
    /// True when `matched_rule` sits at a strictly broader scope than the request.
    pub inherited: bool,
    pub evaluated_at: DateTime<Utc>,
}

impl PermissionDecision {
    /// A deny with no matched rule.
    pub fn deny(reason: impl Into<String>, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            effect: Effect::Deny,
            matched_rule: None,
            reason: reason.into(),
            inherited: false,
            evaluated_at,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect.is_allow()
    }
}

//! Error types for context construction and rule stores.
//!
//! Policy outcomes are never errors. A denied request is a
//! [`PermissionDecision`](crate::PermissionDecision) with `Effect::Deny`.

use palisade_types::{ParseError, RuleId};
use thiserror::Error;

/// The caller handed the context builder something malformed.
///
/// This is a caller bug, so it is returned instead of being folded into a
/// `Deny` decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("invalid context: subject has no roles")]
    NoRoles,

    #[error("invalid context: subject id is blank")]
    BlankSubjectId,

    #[error("invalid context: unknown resource '{0}'")]
    UnknownResource(String),

    #[error("invalid context: unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid context: unknown scope '{0}'")]
    UnknownScope(String),

    #[error("invalid context: unknown effect '{0}'")]
    UnknownEffect(String),
}

impl From<ParseError> for ContextError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnknownResource(name) => ContextError::UnknownResource(name),
            ParseError::UnknownAction(name) => ContextError::UnknownAction(name),
            ParseError::UnknownScope(name) => ContextError::UnknownScope(name),
            ParseError::UnknownEffect(name) => ContextError::UnknownEffect(name),
        }
    }
}

/// Errors raised while loading or mutating a rule store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Two rules in one rule set share an id.
    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(RuleId),

    /// A load failed and the store now denies every request. Wraps the cause.
    #[error("policy store unavailable")]
    Unavailable(#[source] Box<StoreError>),

    #[error("failed to read rule document: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rule document: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// The underlying failure, looking through [`StoreError::Unavailable`].
    pub fn cause(&self) -> &StoreError {
        match self {
            StoreError::Unavailable(inner) => inner.cause(),
            other => other,
        }
    }
}

/// Result type for rule store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_keep_their_kind() {
        assert_eq!(
            ContextError::from(ParseError::UnknownScope("galaxy".into())),
            ContextError::UnknownScope("galaxy".into())
        );
        let effect = ContextError::from(ParseError::UnknownEffect("maybe".into()));
        assert_eq!(effect, ContextError::UnknownEffect("maybe".into()));
        assert_eq!(effect.to_string(), "invalid context: unknown effect 'maybe'");
    }

    #[test]
    fn test_unavailable_exposes_cause() {
        let err = StoreError::Unavailable(Box::new(StoreError::DuplicateRuleId("r1".into())));
        assert_eq!(err.to_string(), "policy store unavailable");
        assert!(matches!(err.cause(), StoreError::DuplicateRuleId(id) if id.as_str() == "r1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

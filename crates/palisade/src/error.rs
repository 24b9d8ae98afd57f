//! Error types for the Palisade facade.

use palisade_rbac::{ContextError, StoreError};
use thiserror::Error;

/// Result type for Palisade operations.
pub type Result<T> = std::result::Result<T, PalisadeError>;

/// Errors surfaced by the facade.
///
/// `can` and `Guard` never return these: they fold every failure into a
/// denied result.
#[derive(Debug, Error)]
pub enum PalisadeError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// `reload` was called on an instance built around a caller-supplied store.
    #[error("no rule document is attached to this instance")]
    NoRuleDocument,
}

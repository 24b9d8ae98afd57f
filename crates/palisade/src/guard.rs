//! Declarative permission guards for rendering layers.
//!
//! A [`Guard`] describes what a piece of UI needs (`contacts:update` on
//! record `C1`, say) and what to show otherwise. Checking it yields a
//! [`GuardOutcome`] the caller maps onto its own view tree.

use palisade_rbac::Subject;
use palisade_types::{Action, ResourceKind, Scope};
use serde_json::Value;
use tracing::debug;

use crate::service::{CanResult, Palisade};

/// What the guarded element should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// Permission granted; render the guarded content.
    Render,
    /// Denied; render this instead.
    Fallback(T),
    /// Denied; navigate to this path.
    Redirect(String),
    /// Denied (or still loading) with nothing to show.
    Hidden,
}

impl<T> GuardOutcome<T> {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render)
    }
}

/// A permission requirement plus what to do when it is not met.
#[derive(Debug, Clone)]
pub struct Guard<T> {
    resource: ResourceKind,
    action: Action,
    scope: Option<Scope>,
    resource_instance: Option<Value>,
    fallback: Option<T>,
    redirect_to: Option<String>,
}

impl<T: Clone> Guard<T> {
    pub fn new(resource: ResourceKind, action: Action) -> Self {
        Self {
            resource,
            action,
            scope: None,
            resource_instance: None,
            fallback: None,
            redirect_to: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_instance(mut self, instance: Value) -> Self {
        self.resource_instance = Some(instance);
        self
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Redirect on denial. Takes precedence over a fallback.
    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    pub fn check(&self, palisade: &Palisade, subject: &Subject) -> GuardOutcome<T> {
        let result = palisade.can(
            subject,
            self.resource.as_str(),
            self.action.as_str(),
            self.scope,
            self.resource_instance.as_ref(),
        );
        self.resolve(&result)
    }

    /// Maps a query result onto an outcome.
    ///
    /// While the rule set is loading nothing is shown: a redirect fired
    /// before the rules arrive would bounce users who are in fact allowed.
    pub fn resolve(&self, result: &CanResult) -> GuardOutcome<T> {
        if result.allowed {
            return GuardOutcome::Render;
        }
        if result.loading {
            return GuardOutcome::Hidden;
        }

        debug!(
            resource = %self.resource,
            action = %self.action,
            reason = %result.reason,
            "Guard denied"
        );
        if let Some(path) = &self.redirect_to {
            GuardOutcome::Redirect(path.clone())
        } else if let Some(fallback) = &self.fallback {
            GuardOutcome::Fallback(fallback.clone())
        } else {
            GuardOutcome::Hidden
        }
    }
}

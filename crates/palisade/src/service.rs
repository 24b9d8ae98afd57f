//! Main entry point for Palisade.
//!
//! [`Palisade`] owns an [`Evaluator`] and answers loosely typed queries from
//! UI and API layers. It never panics and never returns an error from
//! [`Palisade::can`]: anything that goes wrong is a denial.

use std::sync::Arc;

use palisade_config::PalisadeConfig;
use palisade_rbac::{
    Evaluator, EvaluatorOptions, EvaluatorStats, PermissionDecision, PermissionMatrix, RuleStore,
    StoreStatus, Subject, SystemClock, create_permission_context,
};
use palisade_types::{Role, RuleSetVersion, Scope};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{PalisadeError, Result};
use crate::guard::{Guard, GuardOutcome};
use crate::store::JsonFileRuleStore;

/// Answer to a `can` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanResult {
    pub allowed: bool,
    pub reason: String,
    /// The rule set has not been loaded yet.
    pub loading: bool,
}

impl CanResult {
    fn denied(reason: impl Into<String>, loading: bool) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            loading,
        }
    }
}

/// Permission service handle.
pub struct Palisade {
    evaluator: Evaluator,
    document: Option<Arc<JsonFileRuleStore>>,
}

impl Palisade {
    /// Wraps a caller-supplied store with default evaluator options.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self::with_options(store, EvaluatorOptions::default())
    }

    pub fn with_options(store: Arc<dyn RuleStore>, options: EvaluatorOptions) -> Self {
        Self::from_evaluator(Evaluator::with_options(
            store,
            Arc::new(SystemClock),
            options,
        ))
    }

    pub fn from_evaluator(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            document: None,
        }
    }

    /// Opens the rule document named by `config.rules.path`.
    ///
    /// A failed load is logged and leaves the store `Unavailable`; every
    /// query denies until [`reload`](Self::reload) succeeds.
    pub async fn open(config: &PalisadeConfig) -> Self {
        let (palisade, store) = Self::attach(config);
        // The store logs and records the failure itself.
        let _ = store.load().await;
        palisade
    }

    /// Like [`open`](Self::open), but fails if the first load fails.
    ///
    /// # Errors
    ///
    /// Returns the store error from reading or parsing the document.
    pub async fn try_open(config: &PalisadeConfig) -> Result<Self> {
        let (palisade, store) = Self::attach(config);
        store.load().await?;
        Ok(palisade)
    }

    fn attach(config: &PalisadeConfig) -> (Self, Arc<JsonFileRuleStore>) {
        let store = Arc::new(JsonFileRuleStore::new(&config.rules.path));
        let options =
            EvaluatorOptions::default().with_cache_capacity(config.effective_cache_capacity());
        let mut palisade = Self::with_options(store.clone(), options);
        palisade.document = Some(store.clone());
        (palisade, store)
    }

    /// Re-reads the attached rule document.
    ///
    /// # Errors
    ///
    /// Returns [`PalisadeError::NoRuleDocument`] when the instance was built
    /// around a caller-supplied store, or the store error from the load.
    pub async fn reload(&self) -> Result<RuleSetVersion> {
        let store = self.document.as_ref().ok_or(PalisadeError::NoRuleDocument)?;
        Ok(store.load().await?)
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn status(&self) -> StoreStatus {
        self.evaluator.store().status()
    }

    pub fn stats(&self) -> EvaluatorStats {
        self.evaluator.stats()
    }

    /// Derived role x permission grid for admin screens.
    pub fn matrix(&self, extra_roles: &[Role]) -> PermissionMatrix {
        self.evaluator.matrix(extra_roles)
    }

    /// Builds a context and evaluates it.
    ///
    /// `scope` defaults to `record` when an instance is given, `global`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PalisadeError::Context`] for unknown resources or actions,
    /// a blank subject id, or a subject without roles.
    pub fn decide(
        &self,
        subject: &Subject,
        resource: &str,
        action: &str,
        scope: Option<Scope>,
        resource_instance: Option<&Value>,
    ) -> Result<PermissionDecision> {
        let scope = scope.unwrap_or(if resource_instance.is_some() {
            Scope::Record
        } else {
            Scope::Global
        });
        let ctx = create_permission_context(subject, resource, action, scope, resource_instance)?;
        Ok(self.evaluator.evaluate(&ctx))
    }

    /// Answers "may this subject do this?".
    pub fn can(
        &self,
        subject: &Subject,
        resource: &str,
        action: &str,
        scope: Option<Scope>,
        resource_instance: Option<&Value>,
    ) -> CanResult {
        let loading = self.status() == StoreStatus::Loading;
        match self.decide(subject, resource, action, scope, resource_instance) {
            Ok(decision) => CanResult {
                allowed: decision.is_allowed(),
                reason: decision.reason,
                loading,
            },
            Err(err) => {
                debug!(subject = %subject.id, resource, action, error = %err, "Query rejected");
                CanResult::denied(err.to_string(), loading)
            }
        }
    }

    /// Binds a subject for repeated queries.
    pub fn session(&self, subject: Subject) -> SubjectSession<'_> {
        SubjectSession {
            palisade: self,
            subject,
        }
    }
}

impl std::fmt::Debug for Palisade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palisade")
            .field("evaluator", &self.evaluator)
            .field("document", &self.document.as_ref().map(|store| store.path()))
            .finish()
    }
}

/// A [`Palisade`] handle bound to one authenticated subject.
#[derive(Debug)]
pub struct SubjectSession<'a> {
    palisade: &'a Palisade,
    subject: Subject,
}

impl SubjectSession<'_> {
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn can(
        &self,
        resource: &str,
        action: &str,
        scope: Option<Scope>,
        resource_instance: Option<&Value>,
    ) -> CanResult {
        self.palisade
            .can(&self.subject, resource, action, scope, resource_instance)
    }

    pub fn guard<T: Clone>(&self, guard: &Guard<T>) -> GuardOutcome<T> {
        guard.check(self.palisade, &self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_rbac::{InMemoryRuleStore, PermissionRule};
    use palisade_types::{Action, ResourceKind};
    use serde_json::json;

    fn palisade(rules: Vec<PermissionRule>) -> Palisade {
        Palisade::new(Arc::new(InMemoryRuleStore::with_rules(rules).unwrap()))
    }

    fn sales() -> Subject {
        Subject::new("U1", ["sales"])
    }

    #[test]
    fn test_can_allows_matching_rule() {
        let palisade = palisade(vec![PermissionRule::allow(
            "sales-read",
            "sales",
            ResourceKind::Contacts,
            Action::Read,
        )]);

        let result = palisade.can(&sales(), "contacts", "read", None, None);
        assert!(result.allowed);
        assert!(!result.loading);
        assert!(result.reason.contains("sales-read"));
    }

    #[test]
    fn test_instance_defaults_to_record_scope() {
        // A record-scoped rule is only a candidate for record-scope requests.
        let palisade = palisade(vec![
            PermissionRule::allow("rec", "sales", ResourceKind::Contacts, Action::Update)
                .with_scope(Scope::Record),
        ]);

        let instance = json!({ "id": "C1" });
        assert!(
            palisade
                .can(&sales(), "contacts", "update", None, Some(&instance))
                .allowed
        );
        assert!(
            !palisade
                .can(&sales(), "contacts", "update", None, None)
                .allowed
        );
    }

    #[test]
    fn test_context_error_becomes_denial() {
        let palisade = palisade(vec![]);

        let result = palisade.can(&sales(), "rockets", "read", None, None);
        assert!(!result.allowed);
        assert_eq!(result.reason, "invalid context: unknown resource 'rockets'");

        let nobody = Subject::new("U2", Vec::<String>::new());
        let result = palisade.can(&nobody, "contacts", "read", None, None);
        assert!(!result.allowed);
        assert_eq!(result.reason, "invalid context: subject has no roles");
    }

    #[test]
    fn test_decide_surfaces_context_error() {
        let palisade = palisade(vec![]);
        assert!(matches!(
            palisade.decide(&sales(), "contacts", "fly", None, None),
            Err(PalisadeError::Context(_))
        ));
    }

    #[test]
    fn test_loading_store_reports_loading() {
        let palisade = Palisade::new(Arc::new(InMemoryRuleStore::new()));

        let result = palisade.can(&sales(), "contacts", "read", None, None);
        assert!(!result.allowed);
        assert!(result.loading);
        assert_eq!(result.reason, "policy store not ready");
    }

    #[test]
    fn test_session_binds_subject() {
        let palisade = palisade(vec![PermissionRule::allow(
            "sales-read",
            "sales",
            ResourceKind::Contacts,
            Action::Read,
        )]);
        let session = palisade.session(sales());

        assert_eq!(session.subject().id, "U1");
        assert!(session.can("contacts", "read", None, None).allowed);
        assert!(!session.can("contacts", "delete", None, None).allowed);
    }

    #[tokio::test]
    async fn test_reload_without_document_fails() {
        let palisade = palisade(vec![]);
        assert!(matches!(
            palisade.reload().await,
            Err(PalisadeError::NoRuleDocument)
        ));
    }

    #[test]
    fn test_can_result_json_shape() {
        let result = CanResult::denied("no matching rule", false);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "allowed": false, "reason": "no matching rule", "loading": false })
        );
    }
}

//! Lint a rule document.

use std::path::Path;

use anyhow::{Context, Result};
use palisade::{PalisadeConfig, RuleDocument};
use tracing::{debug, warn};

use crate::style::colors::SemanticStyle;
use crate::style::{print_labeled, print_success, print_warn};

/// Parses the document and reports its rule count and unsupported operators.
///
/// Unsupported operators are warnings: the rules using them never fire, but
/// the document still loads.
pub async fn run(config: &PalisadeConfig, rules: Option<&Path>) -> Result<()> {
    let path = super::rules_path(config, rules);
    debug!(path = %path.display(), "Validating rule document");
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = RuleDocument::parse(&text)
        .with_context(|| format!("Invalid rule document {}", path.display()))?;

    print_success(&format!(
        "{} rules in {}",
        document.rules.len(),
        path.display().code()
    ));
    if let Some(revision) = &document.revision {
        print_labeled("revision", &revision.to_string());
    }

    let unsupported = document.unsupported_operators();
    if unsupported.is_empty() {
        print_labeled("unsupported operators", "none");
    } else {
        warn!(count = unsupported.len(), "Rule document uses unsupported operators");
        for (rule, operator) in &unsupported {
            print_warn(&format!(
                "rule '{rule}' uses unsupported operator '{operator}'; the rule never fires"
            ));
        }
    }

    Ok(())
}

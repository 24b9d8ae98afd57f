//! ABAC predicate evaluation.
//!
//! Evaluates a [`Condition`] tree against an [`AttributeSet`]. Evaluation is
//! total: a missing attribute or an operand of the wrong type makes the
//! affected leaf `false`. An operator the evaluator does not know is stronger:
//! the leaf is errored, the error passes through `Not` unchanged, and a tree
//! that reaches an errored leaf never matches. Mismatches and unknown
//! operators are reported as warnings so a broken rule is visible without
//! breaking every other decision.
//!
//! Warnings carry paths, operator names and type names. They never carry
//! attribute values.

use std::cmp::Ordering;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::attributes::{AttributeSet, as_reference};
use crate::condition::{Condition, Leaf, Operator};

// ============================================================================
// Warnings
// ============================================================================

/// A leaf used an operator outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported operator '{operator}' on attribute '{attribute_path}'")]
pub struct UnsupportedOperatorError {
    pub operator: String,
    pub attribute_path: String,
}

/// Non-fatal problem found while evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionWarning {
    #[error(transparent)]
    UnsupportedOperator(#[from] UnsupportedOperatorError),

    /// The operands have types the operator cannot compare.
    #[error("operator '{operator}' cannot compare {actual} with {expected} at '{attribute_path}'")]
    TypeMismatch {
        attribute_path: String,
        operator: String,
        actual: &'static str,
        expected: &'static str,
    },

    /// The operator needs a value and the leaf has none.
    #[error("operator '{operator}' at '{attribute_path}' requires a value")]
    MissingOperand {
        attribute_path: String,
        operator: String,
    },
}

/// Result of evaluating a condition tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub warnings: Vec<ConditionWarning>,
}

impl ConditionOutcome {
    /// True when evaluation reached a leaf with an unsupported operator.
    /// An errored outcome is never `matched`.
    pub fn is_errored(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ConditionWarning::UnsupportedOperator(_)))
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates `condition` against `attributes`.
///
/// `And` stops at the first child that is not `true` and `Or` at the first
/// child that is not `false`; children after that point are not visited and
/// contribute no warnings. An errored child stops both.
///
/// # Postcondition
///
/// Always returns an outcome. Never panics. `matched` is `false` whenever
/// [`ConditionOutcome::is_errored`] holds.
pub fn evaluate_condition(condition: &Condition, attributes: &AttributeSet<'_>) -> ConditionOutcome {
    let mut warnings = Vec::new();
    let matched = eval(condition, attributes, &mut warnings) == Verdict::True;
    ConditionOutcome { matched, warnings }
}

/// Evaluates `condition` and discards warnings.
pub fn matches(condition: &Condition, attributes: &AttributeSet<'_>) -> bool {
    evaluate_condition(condition, attributes).matched
}

// ============================================================================
// Tree walk
// ============================================================================

/// Three-valued result of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    True,
    False,
    /// An unsupported operator was reached. Absorbs every combinator.
    Errored,
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

fn eval(
    condition: &Condition,
    attributes: &AttributeSet<'_>,
    warnings: &mut Vec<ConditionWarning>,
) -> Verdict {
    match condition {
        Condition::And { and } => and
            .iter()
            .map(|c| eval(c, attributes, warnings))
            .find(|v| *v != Verdict::True)
            .unwrap_or(Verdict::True),
        Condition::Or { or } => or
            .iter()
            .map(|c| eval(c, attributes, warnings))
            .find(|v| *v != Verdict::False)
            .unwrap_or(Verdict::False),
        Condition::Not { not } => match eval(not, attributes, warnings) {
            Verdict::True => Verdict::False,
            Verdict::False => Verdict::True,
            Verdict::Errored => Verdict::Errored,
        },
        Condition::Leaf(leaf) => eval_leaf(leaf, attributes, warnings),
    }
}

fn eval_leaf(leaf: &Leaf, attributes: &AttributeSet<'_>, warnings: &mut Vec<ConditionWarning>) -> Verdict {
    if let Operator::Unsupported(name) = &leaf.operator {
        warn!(
            operator = %name,
            attribute_path = %leaf.attribute_path,
            "Unsupported ABAC operator; condition cannot match"
        );
        warnings.push(
            UnsupportedOperatorError {
                operator: name.clone(),
                attribute_path: leaf.attribute_path.clone(),
            }
            .into(),
        );
        return Verdict::Errored;
    }

    let Some(actual) = attributes.resolve(&leaf.attribute_path) else {
        return Verdict::False;
    };

    if leaf.operator == Operator::Exists {
        return (!actual.is_null()).into();
    }

    let Some(operand) = &leaf.value else {
        warnings.push(ConditionWarning::MissingOperand {
            attribute_path: leaf.attribute_path.clone(),
            operator: leaf.operator.to_string(),
        });
        return Verdict::False;
    };

    // A `$subject.` / `$resource.` operand compares against that attribute.
    let expected = match as_reference(operand) {
        Some(path) => match attributes.resolve(path) {
            Some(value) => value,
            None => return Verdict::False,
        },
        None => operand,
    };

    match apply(&leaf.operator, actual, expected) {
        Ok(result) => result.into(),
        Err((actual_kind, expected_kind)) => {
            warn!(
                operator = %leaf.operator,
                attribute_path = %leaf.attribute_path,
                actual = actual_kind,
                expected = expected_kind,
                "ABAC type mismatch; leaf evaluates to false"
            );
            warnings.push(ConditionWarning::TypeMismatch {
                attribute_path: leaf.attribute_path.clone(),
                operator: leaf.operator.to_string(),
                actual: actual_kind,
                expected: expected_kind,
            });
            Verdict::False
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

type Mismatch = (&'static str, &'static str);

/// Applies a supported operator. `Err` carries the two type names on mismatch.
fn apply(operator: &Operator, actual: &Value, expected: &Value) -> Result<bool, Mismatch> {
    let mismatch = || (kind(actual), kind(expected));
    match operator {
        Operator::Eq => Ok(values_equal(actual, expected)),
        Operator::Neq => Ok(!values_equal(actual, expected)),
        Operator::In => match expected {
            Value::Array(items) => Ok(items.iter().any(|item| values_equal(actual, item))),
            _ => Err(mismatch()),
        },
        Operator::NotIn => match expected {
            Value::Array(items) => Ok(!items.iter().any(|item| values_equal(actual, item))),
            _ => Err(mismatch()),
        },
        Operator::Gt => compare(actual, expected).map(Ordering::is_gt).ok_or_else(mismatch),
        Operator::Lt => compare(actual, expected).map(Ordering::is_lt).ok_or_else(mismatch),
        Operator::Gte => compare(actual, expected).map(Ordering::is_ge).ok_or_else(mismatch),
        Operator::Lte => compare(actual, expected).map(Ordering::is_le).ok_or_else(mismatch),
        Operator::Contains => match (actual, expected) {
            (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
            (Value::Array(items), needle) => Ok(items.iter().any(|item| values_equal(item, needle))),
            _ => Err(mismatch()),
        },
        // Handled before operand resolution.
        Operator::Exists => Ok(!actual.is_null()),
        Operator::Unsupported(_) => Ok(false),
    }
}

/// Structural equality, with numbers compared by value (`1 == 1.0`).
#[allow(clippy::float_cmp)]
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Orders two numbers or two strings. Anything else is incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

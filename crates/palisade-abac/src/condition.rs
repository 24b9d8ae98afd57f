//! Condition tree definitions.
//!
//! A condition is a closed AST: a [`Leaf`] comparison or one of the logical
//! combinators `And`, `Or` and `Not`. On the wire it is plain JSON:
//!
//! ```json
//! { "and": [
//!     { "attributePath": "ownerId", "operator": "eq", "value": "$subject.id" },
//!     { "not": { "attributePath": "archived", "operator": "eq", "value": true } }
//! ] }
//! ```

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Operator
// ============================================================================

/// Comparison operator of a leaf condition.
///
/// Unknown operator names are kept as [`Operator::Unsupported`] instead of
/// failing deserialization, so one malformed rule never rejects a whole rule
/// document. A condition that reaches an unsupported leaf never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    In,
    NotIn,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    Exists,
    /// An operator name this evaluator does not understand.
    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::Exists => "exists",
            Operator::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Operator::Unsupported(_))
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            "gt" => Operator::Gt,
            "lt" => Operator::Lt,
            "gte" => Operator::Gte,
            "lte" => Operator::Lte,
            "contains" => Operator::Contains,
            "exists" => Operator::Exists,
            _ => Operator::Unsupported(name),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unsupported(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Leaf
// ============================================================================

/// A single comparison: `attributePath <operator> value`.
///
/// `value` may itself be a `$subject.` / `$resource.` reference, in which case
/// the comparison is made against the referenced attribute. `exists` takes no
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaf {
    pub attribute_path: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// ============================================================================
// Condition
// ============================================================================

/// A boolean condition over subject and resource attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// All sub-conditions must be true. Empty is `true`.
    And { and: Vec<Condition> },
    /// At least one sub-condition must be true. Empty is `false`.
    Or { or: Vec<Condition> },
    /// The sub-condition must be false.
    Not { not: Box<Condition> },
    /// A single attribute comparison.
    Leaf(Leaf),
}

impl Condition {
    pub fn leaf(path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Condition::Leaf(Leaf {
            attribute_path: path.into(),
            operator,
            value: Some(value),
        })
    }

    /// Leaf that holds when `path` is present and not `null`.
    pub fn exists(path: impl Into<String>) -> Self {
        Condition::Leaf(Leaf {
            attribute_path: path.into(),
            operator: Operator::Exists,
            value: None,
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { and: conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { or: conditions }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            not: Box::new(condition),
        }
    }

    /// Collects every leaf in the tree, depth first.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Condition::And { and: children } | Condition::Or { or: children } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Condition::Not { not } => not.collect_leaves(out),
            Condition::Leaf(leaf) => out.push(leaf),
        }
    }

    /// Names of operators in this tree that will never match.
    pub fn unsupported_operators(&self) -> Vec<&str> {
        self.leaves()
            .into_iter()
            .filter(|leaf| !leaf.operator.is_supported())
            .map(|leaf| leaf.operator.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_nested_tree() {
        let condition: Condition = serde_json::from_value(json!({
            "and": [
                { "attributePath": "ownerId", "operator": "eq", "value": "$subject.id" },
                { "or": [
                    { "attributePath": "status", "operator": "in", "value": ["draft"] },
                    { "not": { "attributePath": "lockedAt", "operator": "exists" } }
                ]}
            ]
        }))
        .unwrap();

        let expected = Condition::and(vec![
            Condition::leaf("ownerId", Operator::Eq, json!("$subject.id")),
            Condition::or(vec![
                Condition::leaf("status", Operator::In, json!(["draft"])),
                Condition::not(Condition::exists("lockedAt")),
            ]),
        ]);
        assert_eq!(condition, expected);
    }

    #[test]
    fn test_unknown_operator_is_kept() {
        let condition: Condition = serde_json::from_value(json!({
            "attributePath": "name", "operator": "matchesRegex", "value": "^A"
        }))
        .unwrap();

        assert_eq!(condition.unsupported_operators(), vec!["matchesRegex"]);
    }

    #[test]
    fn test_operator_serializes_as_wire_name() {
        let json = serde_json::to_value(Condition::leaf("tags", Operator::NotIn, json!([]))).unwrap();
        assert_eq!(json["operator"], json!("notIn"));
        assert_eq!(json["attributePath"], json!("tags"));

        let exists = serde_json::to_value(Condition::exists("x")).unwrap();
        assert!(exists.get("value").is_none());
    }

    #[test]
    fn test_leaves_depth_first() {
        let condition = Condition::or(vec![
            Condition::exists("a"),
            Condition::not(Condition::and(vec![Condition::exists("b"), Condition::exists("c")])),
        ]);
        let paths: Vec<_> = condition
            .leaves()
            .iter()
            .map(|leaf| leaf.attribute_path.as_str())
            .collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }
}

//! Attribute maps and path resolution.
//!
//! Attributes are stored flat: nested objects are expanded into dot-path keys
//! (`owner.id`) so a condition can address any depth with a single lookup.
//! Arrays are leaf values and are never expanded.

use std::collections::BTreeMap;

use serde_json::Value;

/// Prefix that pins a path to subject attributes.
pub const SUBJECT_PREFIX: &str = "$subject.";

/// Prefix that pins a path to resource attributes.
pub const RESOURCE_PREFIX: &str = "$resource.";

/// Flat attribute map, keyed by dot path.
///
/// Ordered so that hashing and display are deterministic.
pub type AttributeMap = BTreeMap<String, Value>;

// ============================================================================
// Flattening
// ============================================================================

/// Flattens a JSON value into a dot-path attribute map.
///
/// Non-object inputs produce an empty map: attributes only exist under a name.
pub fn flatten(value: &Value) -> AttributeMap {
    let mut out = AttributeMap::new();
    flatten_into(&mut out, "", value);
    out
}

/// Flattens `value` into `out`, prefixing every key with `prefix`.
///
/// An empty object under a non-empty prefix is kept as a leaf so that
/// `exists` can still see the key.
pub fn flatten_into(out: &mut AttributeMap, prefix: &str, value: &Value) {
    match value {
        Value::Object(fields) if !fields.is_empty() || prefix.is_empty() => {
            for (key, child) in fields {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(out, &path, child);
            }
        }
        _ if prefix.is_empty() => {}
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

// ============================================================================
// AttributeSet
// ============================================================================

/// The attributes visible to a condition: subject and resource side by side.
///
/// Unprefixed paths see the union of both maps with resource attributes
/// shadowing subject attributes of the same name.
#[derive(Debug, Clone, Copy)]
pub struct AttributeSet<'a> {
    subject: &'a AttributeMap,
    resource: &'a AttributeMap,
}

impl<'a> AttributeSet<'a> {
    pub fn new(subject: &'a AttributeMap, resource: &'a AttributeMap) -> Self {
        Self { subject, resource }
    }

    pub fn subject(&self) -> &'a AttributeMap {
        self.subject
    }

    pub fn resource(&self) -> &'a AttributeMap {
        self.resource
    }

    /// Resolves an attribute path.
    ///
    /// - `$subject.<path>` reads subject attributes only
    /// - `$resource.<path>` reads resource attributes only
    /// - anything else reads resource attributes, then subject attributes
    pub fn resolve(&self, path: &str) -> Option<&'a Value> {
        if let Some(rest) = path.strip_prefix(SUBJECT_PREFIX) {
            return self.subject.get(rest);
        }
        if let Some(rest) = path.strip_prefix(RESOURCE_PREFIX) {
            return self.resource.get(rest);
        }
        self.resource.get(path).or_else(|| self.subject.get(path))
    }
}

/// Returns the referenced path if `value` is a `$subject.` / `$resource.` reference.
pub fn as_reference(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if s.starts_with(SUBJECT_PREFIX) || s.starts_with(RESOURCE_PREFIX) => {
            Some(s.as_str())
        }
        _ => None,
    }
}

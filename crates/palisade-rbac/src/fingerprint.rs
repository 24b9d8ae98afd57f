//! Context fingerprints.
//!
//! A fingerprint is a BLAKE3 digest over every field of a
//! [`PermissionContext`] that can influence a decision. Two contexts with the
//! same fingerprint get the same decision under the same rule-set version.
//!
//! Every field is written with a one-byte tag and a length prefix, so
//! adjacent fields cannot run into each other.

use palisade_abac::AttributeMap;
use palisade_types::Fingerprint;

use crate::context::PermissionContext;

const TAG_SUBJECT_ID: u8 = 0x01;
const TAG_ROLE: u8 = 0x02;
const TAG_SUBJECT_ATTRS: u8 = 0x03;
const TAG_RESOURCE: u8 = 0x04;
const TAG_INSTANCE_ID: u8 = 0x05;
const TAG_RESOURCE_ATTRS: u8 = 0x06;
const TAG_ACTION: u8 = 0x07;
const TAG_SCOPE: u8 = 0x08;
const TAG_SCOPE_INSTANCE: u8 = 0x09;

/// Computes the fingerprint of a context.
pub fn fingerprint(ctx: &PermissionContext) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();

    write_field(&mut hasher, TAG_SUBJECT_ID, ctx.subject().id().as_str().as_bytes());
    // Roles are a BTreeSet, so iteration is already sorted.
    write_len(&mut hasher, ctx.subject().roles().len());
    for role in ctx.subject().roles() {
        write_field(&mut hasher, TAG_ROLE, role.as_str().as_bytes());
    }
    write_attributes(&mut hasher, TAG_SUBJECT_ATTRS, ctx.subject().attributes());

    write_field(&mut hasher, TAG_RESOURCE, ctx.resource().kind().as_str().as_bytes());
    match ctx.resource().instance_id() {
        Some(id) => write_field(&mut hasher, TAG_INSTANCE_ID, id.as_bytes()),
        None => {
            hasher.update(&[TAG_INSTANCE_ID, 0]);
        }
    }
    write_attributes(&mut hasher, TAG_RESOURCE_ATTRS, ctx.resource().attributes());

    write_field(&mut hasher, TAG_ACTION, ctx.action().as_str().as_bytes());
    write_field(&mut hasher, TAG_SCOPE, ctx.scope().as_str().as_bytes());

    write_len(&mut hasher, ctx.scope_instances().len());
    for (level, id) in ctx.scope_instances() {
        write_field(&mut hasher, TAG_SCOPE_INSTANCE, level.as_str().as_bytes());
        write_field(&mut hasher, TAG_SCOPE_INSTANCE, id.as_bytes());
    }

    Fingerprint::from_bytes(*hasher.finalize().as_bytes())
}

fn write_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn write_field(hasher: &mut blake3::Hasher, tag: u8, bytes: &[u8]) {
    hasher.update(&[tag, 1]);
    write_len(hasher, bytes.len());
    hasher.update(bytes);
}

fn write_attributes(hasher: &mut blake3::Hasher, tag: u8, attributes: &AttributeMap) {
    write_len(hasher, attributes.len());
    for (path, value) in attributes {
        write_field(hasher, tag, path.as_bytes());
        // `Value`'s Display is compact JSON with sorted object keys.
        write_field(hasher, tag, value.to_string().as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::{Action, ResourceKind, Scope};
    use serde_json::json;

    fn ctx(roles: &[&str], instance: serde_json::Value) -> PermissionContext {
        PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
            .roles(roles.iter().copied())
            .scope(Scope::Record)
            .instance(instance)
            .build()
            .unwrap()
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = ctx(&["sales"], json!({ "id": "C1", "region": "eu" }));
        let b = ctx(&["sales"], json!({ "id": "C1", "region": "eu" }));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_role_order_does_not_matter() {
        let a = ctx(&["sales", "admin"], json!({ "id": "C1" }));
        let b = ctx(&["admin", "sales"], json!({ "id": "C1" }));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_attribute_change_changes_fingerprint() {
        let a = ctx(&["sales"], json!({ "id": "C1", "ownerId": "U1" }));
        let b = ctx(&["sales"], json!({ "id": "C1", "ownerId": "U2" }));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_scope_changes_fingerprint() {
        let a = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
            .role("sales")
            .build()
            .unwrap();
        let b = PermissionContext::builder("U1", ResourceKind::Contacts, Action::Read)
            .role("sales")
            .scope(Scope::Project)
            .project("projectX")
            .build()
            .unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}

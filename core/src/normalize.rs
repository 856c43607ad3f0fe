//! JSON:API resource graph flattening.
//!
//! # Design
//! A resource becomes a flat object: `id`, `type`, then its attributes, then
//! one member per requested relationship holding the resolved, recursively
//! normalized resource (or a list of them). Recursion follows the include
//! tree rather than the resource graph, so cyclic relationships terminate at
//! the depth the caller asked for.
//!
//! References that are not in the included pool normalize to `null`. A
//! to-many relationship keeps one entry per reference, so its length always
//! matches the linkage.

use serde_json::{Map, Value};

use crate::include::IncludeTree;
use crate::resource::{Linkage, PrimaryData, Resource, ResourceIdentifier};

/// Normalize primary data: `None` → `null`, a collection → an array in
/// input order (`null` slots stay `null`), a single resource → an object.
pub fn normalize(data: Option<&PrimaryData>, included: &[Resource], tree: &IncludeTree) -> Value {
    match data {
        None => Value::Null,
        Some(PrimaryData::Many(resources)) => Value::Array(
            resources
                .iter()
                .map(|resource| normalize_resource(resource.as_ref(), included, tree))
                .collect(),
        ),
        Some(PrimaryData::One(resource)) => normalize_resource(Some(resource.as_ref()), included, tree),
    }
}

/// Normalize one resource. `None` (an unresolved reference) is `null`.
pub fn normalize_resource(resource: Option<&Resource>, included: &[Resource], tree: &IncludeTree) -> Value {
    let Some(resource) = resource else {
        return Value::Null;
    };

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(resource.id.clone()));
    out.insert("type".to_string(), Value::String(resource.kind.clone()));
    for (key, value) in &resource.attributes {
        if key == "id" || key == "type" {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    for (name, subtree) in tree.iter() {
        let Some(relationship) = resource.relationship(name) else {
            continue;
        };
        let value = match relationship.data {
            None => Value::Null,
            Some(Linkage::Many(identifiers)) => Value::Array(
                identifiers
                    .iter()
                    .map(|identifier| {
                        let resource = identifier.as_ref().and_then(|identifier| find_included(identifier, included));
                        normalize_resource(resource, included, subtree)
                    })
                    .collect(),
            ),
            Some(Linkage::One(identifier)) => {
                normalize_resource(find_included(&identifier, included), included, subtree)
            }
        };
        out.insert(name.to_string(), value);
    }

    Value::Object(out)
}

/// First resource in `included` matching the identifier's `(id, type)`.
pub fn find_included<'a>(identifier: &ResourceIdentifier, included: &'a [Resource]) -> Option<&'a Resource> {
    included.iter().find(|resource| resource.identifies(identifier))
}

//! JSON:API document model.
//!
//! # Design
//! Only the members the normalizer reads are typed. Attributes stay as a JSON
//! object because their shape belongs to the caller. Relationship linkage is
//! an untagged enum so to-one, to-many, and null linkage deserialize without
//! any runtime type checks further down.
//!
//! Collections are read slot by slot: a `null` primary resource or a
//! malformed to-many reference occupies its position as `None` instead of
//! failing the whole document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A top-level JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<PrimaryData>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

/// The `data` member: one resource or a collection. Collection slots may be
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Option<Resource>>),
    One(Box<Resource>),
}

/// A resource object. Identity is the `(id, type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Map<String, Value>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            attributes: Map::new(),
            relationships: Map::new(),
        }
    }

    pub fn identifies(&self, identifier: &ResourceIdentifier) -> bool {
        self.id == identifier.id && self.kind == identifier.kind
    }

    /// The relationship named `name`, if present and an object.
    ///
    /// Linkage is read leniently. A to-many reference that is not a valid
    /// identifier keeps its slot as `None`, and a malformed to-one reference
    /// reads as null linkage. `data` that is neither null, an array nor an
    /// object makes the relationship absent.
    pub fn relationship(&self, name: &str) -> Option<Relationship> {
        let object = self.relationships.get(name)?.as_object()?;
        let data = match object.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(Linkage::Many(
                items
                    .iter()
                    .map(|item| ResourceIdentifier::deserialize(item).ok())
                    .collect(),
            )),
            Some(item @ Value::Object(_)) => ResourceIdentifier::deserialize(item).ok().map(Linkage::One),
            Some(_) => return None,
        };
        Some(Relationship { data })
    }
}

/// A `{id, type}` reference to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A relationship object. Only its linkage matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<Linkage>,
}

/// Resource linkage: to-one or to-many. A to-many slot is `None` when its
/// reference could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<Option<ResourceIdentifier>>),
    One(ResourceIdentifier),
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

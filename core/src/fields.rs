//! Field-level error extraction from failed response bodies.
//!
//! # Design
//! Servers report validation failures in one of two shapes:
//!
//! - plain JSON: `{"errors": {"email": ["has already been taken"]}}`
//! - JSON:API: `{"errors": [{"title": "..", "source": {"pointer": "/data/attributes/email"}}]}`
//!
//! `ErrorBody::parse` decides the shape once, from the response flavor and
//! the JSON it actually got, and everything downstream matches on the enum.
//! Parsing is total: a missing body, a body without `errors`, or an `errors`
//! member of an unexpected type all become `ErrorBody::Empty`.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::case;
use crate::http::Flavor;

const ATTRIBUTE_POINTER_PREFIX: &str = "/data/attributes/";

/// Field name → messages, in the order fields were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` to `field`, creating the field on first use.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message.into()),
            None => self.entries.push((field, vec![message.into()])),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"<field> <message>"` for every message, field by field.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.iter()
            .flat_map(|(field, messages)| messages.iter().map(move |message| format!("{field} {message}")))
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// One entry of a JSON:API `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorObject {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub pointer: Option<String>,
}

impl ErrorObject {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(title) => Some(Self {
                title: Some(title.clone()),
                ..Self::default()
            }),
            Value::Object(object) => Some(Self {
                title: string_member(object, "title"),
                detail: string_member(object, "detail"),
                pointer: object
                    .get("source")
                    .and_then(Value::as_object)
                    .and_then(|source| string_member(source, "pointer")),
            }),
            _ => None,
        }
    }

    /// The human-readable message: `title`, falling back to `detail`.
    pub fn message(&self) -> Option<&str> {
        self.title.as_deref().or(self.detail.as_deref())
    }

    /// The snake_cased attribute this error points at, if any.
    pub fn field(&self) -> Option<String> {
        self.pointer
            .as_deref()?
            .strip_prefix(ATTRIBUTE_POINTER_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(case::snake)
    }
}

fn string_member(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// The `errors` member of a failed response, by shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ErrorBody {
    /// No body, or nothing usable in it.
    #[default]
    Empty,
    /// Plain JSON: field → messages.
    FieldMap(FieldErrors),
    /// JSON:API error objects, in body order.
    ErrorArray(Vec<ErrorObject>),
    /// Messages with no field, e.g. `{"errors": {"detail": "Unauthorized"}}`
    /// served as JSON:API.
    Messages(Vec<String>),
}

impl ErrorBody {
    pub fn parse(body: Option<&Value>, flavor: Flavor) -> Self {
        let Some(errors) = body.and_then(|body| body.get("errors")) else {
            return ErrorBody::Empty;
        };

        match (errors, flavor) {
            (Value::Array(items), _) => ErrorBody::ErrorArray(items.iter().filter_map(ErrorObject::from_value).collect()),
            (Value::Object(object), Flavor::Plain) => {
                let mut fields = FieldErrors::new();
                for (field, value) in object {
                    for message in message_list(value) {
                        fields.push(field.clone(), message);
                    }
                }
                ErrorBody::FieldMap(fields)
            }
            (Value::Object(object), Flavor::JsonApi) => {
                ErrorBody::Messages(object.values().flat_map(message_list).collect())
            }
            _ => ErrorBody::Empty,
        }
    }

    /// Errors attributable to a field.
    pub fn fields(&self) -> FieldErrors {
        match self {
            ErrorBody::FieldMap(fields) => fields.clone(),
            ErrorBody::ErrorArray(objects) => {
                let mut fields = FieldErrors::new();
                for object in objects {
                    if let (Some(field), Some(message)) = (object.field(), object.message()) {
                        fields.push(field, message);
                    }
                }
                fields
            }
            ErrorBody::Empty | ErrorBody::Messages(_) => FieldErrors::new(),
        }
    }

    /// Every error as a sentence: field errors first as `"<field> <message>"`,
    /// then general errors in body order.
    pub fn errors(&self) -> Vec<String> {
        let mut out: Vec<String> = self.fields().messages().collect();
        match self {
            ErrorBody::ErrorArray(objects) => out.extend(
                objects
                    .iter()
                    .filter(|object| object.field().is_none())
                    .filter_map(|object| object.message().map(str::to_string)),
            ),
            ErrorBody::Messages(messages) => out.extend(messages.iter().cloned()),
            ErrorBody::Empty | ErrorBody::FieldMap(_) => {}
        }
        out
    }

    /// A short summary: the first error, or a status-specific fallback.
    pub fn title(&self, status: u16, status_text: &str) -> String {
        if let Some(first) = self.errors().into_iter().next() {
            return first;
        }
        fallback_title(status, status_text)
    }
}

fn message_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items.iter().flat_map(message_list).collect(),
        other => vec![other.to_string()],
    }
}

fn fallback_title(status: u16, status_text: &str) -> String {
    match status {
        403 => "Not authorized".to_string(),
        404 => "Page not found".to_string(),
        422 => "Unable to process request".to_string(),
        _ if !status_text.trim().is_empty() => status_text.to_string(),
        _ => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn json_api(body: Value) -> ErrorBody {
        ErrorBody::parse(Some(&body), Flavor::JsonApi)
    }

    fn plain(body: Value) -> ErrorBody {
        ErrorBody::parse(Some(&body), Flavor::Plain)
    }

    #[test]
    fn json_api_pointer_errors_become_fields() {
        let body = json_api(json!({
            "errors": [{
                "title": "has already been taken",
                "detail": "Email has already been taken",
                "source": { "pointer": "/data/attributes/email" }
            }]
        }));

        let fields = body.fields();
        assert_eq!(fields.get("email"), Some(&["has already been taken".to_string()][..]));
        assert_eq!(body.errors(), vec!["email has already been taken"]);
    }

    #[test]
    fn json_api_field_names_are_snake_cased_and_grouped() {
        let body = json_api(json!({
            "errors": [
                { "title": "is too short", "source": { "pointer": "/data/attributes/firstName" } },
                { "title": "is invalid", "source": { "pointer": "/data/attributes/email" } },
                { "title": "is blank", "source": { "pointer": "/data/attributes/firstName" } }
            ]
        }));

        assert_eq!(
            serde_json::to_value(body.fields()).unwrap(),
            json!({ "first_name": ["is too short", "is blank"], "email": ["is invalid"] })
        );
        assert_eq!(
            body.errors(),
            vec!["first_name is too short", "first_name is blank", "email is invalid"]
        );
    }

    #[test]
    fn json_api_errors_without_source_are_general() {
        let body = json_api(json!({ "errors": [{ "title": "Not authorized" }] }));
        assert!(body.fields().is_empty());
        assert_eq!(body.errors(), vec!["Not authorized"]);
    }

    #[test]
    fn field_errors_come_before_general_errors() {
        let body = json_api(json!({
            "errors": [
                { "title": "Rate limited" },
                { "title": "can't be blank", "source": { "pointer": "/data/attributes/name" } },
                { "detail": "Try again later", "source": { "pointer": "/data/relationships/owner" } }
            ]
        }));
        assert_eq!(
            body.errors(),
            vec!["name can't be blank", "Rate limited", "Try again later"]
        );
    }

    #[test]
    fn json_api_error_map_is_general_messages() {
        let body = json_api(json!({ "errors": { "detail": "Unauthorized" } }));
        assert!(body.fields().is_empty());
        assert_eq!(body.errors(), vec!["Unauthorized"]);
    }

    #[test]
    fn plain_field_map_is_copied_in_order() {
        let body = plain(json!({
            "errors": { "email": ["has already been taken", "is invalid"], "name": "can't be blank" }
        }));
        let fields = body.fields();
        let names: Vec<&str> = fields.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["email", "name"]);
        assert_eq!(fields.get("name"), Some(&["can't be blank".to_string()][..]));
        assert_eq!(
            body.errors(),
            vec!["email has already been taken", "email is invalid", "name can't be blank"]
        );
    }

    #[test]
    fn degrades_to_empty_on_odd_bodies() {
        for body in [
            ErrorBody::parse(None, Flavor::JsonApi),
            json_api(json!({})),
            json_api(json!({ "errors": "nope" })),
            plain(json!("text body")),
            plain(json!({ "errors": 42 })),
        ] {
            assert!(body.fields().is_empty());
            assert!(body.errors().is_empty());
        }
    }

    #[test]
    fn title_prefers_first_error() {
        let body = plain(json!({ "errors": { "email": ["has already been taken"] } }));
        assert_eq!(body.title(500, "Internal Server Error"), "email has already been taken");
    }

    #[test]
    fn title_falls_back_by_status() {
        let empty = ErrorBody::Empty;
        assert_eq!(empty.title(403, "Forbidden"), "Not authorized");
        assert_eq!(empty.title(404, "Not Found"), "Page not found");
        assert_eq!(empty.title(422, "Unprocessable Entity"), "Unable to process request");
        assert_eq!(empty.title(500, "Internal Server Error"), "Internal Server Error");
        assert_eq!(empty.title(500, ""), "HTTP 500");
    }
}

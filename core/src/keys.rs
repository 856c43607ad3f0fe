//! Recursive key renaming for JSON values.

use serde_json::{Map, Value};

/// Return a copy of `value` with every object key passed through `rename`.
///
/// Arrays are walked element by element at every depth. Scalars, and the
/// values stored under renamed keys that are not containers, are copied as-is.
pub fn map_keys<F>(value: &Value, rename: F) -> Value
where
    F: Fn(&str) -> String,
{
    map_with(value, &rename)
}

fn map_with<F>(value: &Value, rename: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Object(object) => {
            let mut out = Map::with_capacity(object.len());
            for (key, inner) in object {
                out.insert(rename(key), map_with(inner, rename));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| map_with(item, rename)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::case;

    #[test]
    fn renames_keys_deep_in_an_object() {
        let input = json!({ "key": { "deep_key": { "deepist_key": "test" } } });
        let out = map_keys(&input, |_| "test".to_string());
        assert_eq!(out, json!({ "test": { "test": { "test": "test" } } }));
    }

    #[test]
    fn walks_arrays_but_leaves_values_alone() {
        let input = json!([{ "first_name": "Ada", "tags": ["snake_case_value"] }, 3, null]);
        let out = map_keys(&input, case::camel);
        assert_eq!(
            out,
            json!([{ "firstName": "Ada", "tags": ["snake_case_value"] }, 3, null])
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(map_keys(&json!("some_string"), case::camel), json!("some_string"));
        assert_eq!(map_keys(&Value::Null, case::camel), Value::Null);
    }

    #[test]
    fn does_not_touch_the_input() {
        let input = json!({ "firstName": "Ada" });
        let _ = map_keys(&input, case::snake);
        assert_eq!(input, json!({ "firstName": "Ada" }));
    }
}

//! Value normalization shared by the deterministic scorers.

use serde_json::{Map, Value};

/// Objects and arrays are compared through their JSON serialization.
pub(crate) fn needs_json(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Copy of `value` with object keys sorted at every level.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries.into_iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

/// Parse a string operand as JSON, if it is one.
pub(crate) fn parse_json_str(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

/// Text form of a value: strings verbatim, null as empty, everything else as
/// compact JSON.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => canonical_json(other),
    }
}

/// Normalize a value for textual comparison. With `maybe_object`, strings
/// holding JSON are re-serialized canonically so formatting differences vanish.
pub fn normalize_value(value: &Value, maybe_object: bool) -> String {
    if needs_json(value) {
        return canonical_json(value);
    }
    if maybe_object {
        if let Some(parsed) = parse_json_str(value) {
            return canonical_json(&parsed);
        }
    }
    value_as_text(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        assert_eq!(canonical_json(&value), r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(&json!("hello"), false), "hello");
        assert_eq!(normalize_value(&json!("{\"b\": 1, \"a\": 2}"), true), r#"{"a":2,"b":1}"#);
        assert_eq!(normalize_value(&json!("{not json"), true), "{not json");
        assert_eq!(normalize_value(&json!(3), false), "3");
        assert_eq!(normalize_value(&Value::Null, false), "");
    }
}

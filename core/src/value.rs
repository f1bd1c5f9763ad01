//! Helpers for reading loosely-typed host JSON the way the host itself does.

use serde_json::Value;

/// Truthiness of a host value: `null`, `false`, `0` and `""` are falsy,
/// everything else (including empty objects and arrays) is truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringifies a scalar host value for use in a header.
pub(crate) fn host_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Returns the value stored under `key` when it is truthy.
pub(crate) fn truthy_field<'a>(
    values: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    values.get(key).filter(|value| is_truthy(value))
}

use bo_common::Cents;
use log::*;
use serde_json::Value;

/// True if every field in `part` appears in `complete` with the same value. Fields that `part` does not mention are
/// ignored, at any depth. Arrays must have the same length, and are compared element by element.
pub fn json_is_subset_of(part: &str, complete: &str) -> bool {
    let part: Value = serde_json::from_str(part).expect("Invalid JSON");
    let complete: Value = serde_json::from_str(complete).expect("Invalid JSON");
    value_is_subset_of(&part, &complete)
}

pub fn value_is_subset_of(part: &Value, complete: &Value) -> bool {
    match (part, complete) {
        // null is a wildcard
        (Value::Null, _) => true,
        (Value::Object(fields), Value::Object(actual)) => fields.iter().all(|(key, value)| match actual.get(key) {
            Some(v) => value_is_subset_of(value, v),
            None => {
                error!("Key not found: {key}");
                false
            },
        }),
        (Value::Array(expected), Value::Array(actual)) => {
            if expected.len() != actual.len() {
                error!("Array length mismatch: {} != {}", expected.len(), actual.len());
                return false;
            }
            expected.iter().zip(actual).all(|(p, c)| value_is_subset_of(p, c))
        },
        (p, c) if p == c => true,
        (p, c) => {
            error!("Value mismatch: {p} != {c}");
            false
        },
    }
}

/// Converts a dollar amount as written in feature files, e.g. `79.99` or `$100`, into cents.
pub fn dollars_to_cents(amount: &str) -> i64 {
    let amount = amount.trim().trim_start_matches('$');
    amount.parse::<Cents>().map(|c| c.value()).unwrap_or_else(|e| panic!("Invalid dollar amount. {e}"))
}

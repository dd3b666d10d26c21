//! Structural operations over JSON values: deep equality, deep merge, ordering.
//!
//! Numbers are compared by numeric value, so `1` and `1.0` are equal. This
//! matters for `save`: a document round-tripped through the backend must not
//! look "modified" just because an integer came back as a float.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// Deep structural equality with numeric comparison of numbers.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y),
        _ => false,
    }
}

/// Deep equality of two JSON objects (key order is irrelevant).
pub fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).map_or(false, |other| deep_equal(v, other)))
}

/// Merge `incoming` onto `target` in place.
///
/// - keys only in `target` are kept;
/// - keys only in `incoming` are added;
/// - when both sides hold an object, the objects are merged recursively;
/// - anything else (arrays, scalars, null, mismatched kinds) is replaced
///   wholesale by the incoming value.
pub fn deep_merge(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(update)) => {
                deep_merge(existing, update);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Order two values for `$gt`/`$lt` style comparisons.
///
/// Only number/number and string/string pairs are ordered; every other
/// pairing returns `None` and never satisfies a range operator.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    compare_numbers(a, b) == Some(Ordering::Equal)
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

//! Value coercions shared by the evaluator
//!
//! Truthiness, numeric coercion, string rendering and path lookup over
//! `serde_json::Value`.

use serde_json::Value;
use std::cmp::Ordering;

/// Truthy coercion: `null`, `false`, `0`, `""` and `[]` are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Floating point coercion used by arithmetic. Non-numeric strings and
/// structured values coerce to NaN.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Wrap an arithmetic result. Non-finite results have no JSON form and
/// become `null`.
pub fn from_number(n: f64) -> Value {
    if n.is_finite() {
        Value::from(n)
    } else {
        Value::Null
    }
}

/// String form used by `cat`
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Equality used by `==` / `!=`: numeric when both sides are numbers,
/// structural otherwise.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Ordering used by `<`, `<=`, `>`, `>=`.
///
/// Numbers compare numerically. A number against a numeric string
/// coerces the string. Two strings compare lexicographically. Anything
/// else is unordered, which makes every ordering comparison false.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => to_number(a).partial_cmp(&to_number(b)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            let (x, y) = (to_number(a), to_number(b));
            if x.is_nan() || y.is_nan() {
                None
            } else {
                x.partial_cmp(&y)
            }
        }
        _ => None,
    }
}

/// Resolve a path of keys through nested objects (and array indices).
/// A missing segment yields `None`, never an error.
pub fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = data;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([])] {
            assert!(!is_truthy(&falsy), "{} should be falsy", falsy);
        }
        for truthy in [json!(true), json!(1), json!(-0.5), json!("no"), json!([0]), json!({})] {
            assert!(is_truthy(&truthy), "{} should be truthy", truthy);
        }
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&json!(3)), 3.0);
        assert_eq!(to_number(&json!(" 2.5 ")), 2.5);
        assert_eq!(to_number(&json!(true)), 1.0);
        assert_eq!(to_number(&json!(null)), 0.0);
        assert!(to_number(&json!("abc")).is_nan());
        assert!(to_number(&json!([1])).is_nan());
    }

    #[test]
    fn test_from_number_non_finite() {
        assert_eq!(from_number(1.5), json!(1.5));
        assert_eq!(from_number(f64::INFINITY), Value::Null);
        assert_eq!(from_number(f64::NAN), Value::Null);
    }

    #[test]
    fn test_loose_equals_numbers() {
        assert!(loose_equals(&json!(1), &json!(1.0)));
        assert!(loose_equals(&json!("a"), &json!("a")));
        assert!(!loose_equals(&json!(1), &json!("1")));
        assert!(loose_equals(&json!({"a": [1]}), &json!({"a": [1]})));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&json!(1), &json!(2)), Some(Ordering::Less));
        assert_eq!(compare(&json!("10"), &json!(9)), Some(Ordering::Greater));
        assert_eq!(compare(&json!("apple"), &json!("banana")), Some(Ordering::Less));
        assert_eq!(compare(&json!(null), &json!(1)), None);
        assert_eq!(compare(&json!("x"), &json!(1)), None);
    }

    #[test]
    fn test_lookup_nested() {
        let data = json!({"order": {"lines": [{"sku": "A1"}], "total": 10}});
        let path = |s: &str| s.split('.').map(String::from).collect::<Vec<_>>();
        assert_eq!(lookup(&data, &path("order.total")), Some(&json!(10)));
        assert_eq!(lookup(&data, &path("order.lines.0.sku")), Some(&json!("A1")));
        assert_eq!(lookup(&data, &path("order.missing")), None);
        assert_eq!(lookup(&data, &path("order.total.deeper")), None);
        assert_eq!(lookup(&data, &[]), Some(&data));
    }
}

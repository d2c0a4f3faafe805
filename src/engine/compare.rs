//! Value ordering for in-process evaluation
//!
//! Values of different kinds order as arrays < booleans < null < numbers <
//! objects < strings. Numbers compare numerically, so `1` equals `1.0`.

use std::cmp::Ordering;

use serde_json::Value;

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Array(_) => 0,
        Value::Bool(_) => 1,
        Value::Null => 2,
        Value::Number(_) => 3,
        Value::Object(_) => 4,
        Value::String(_) => 5,
    }
}

/// Integers of either sign, widened so `u64` values above `i64::MAX` stay exact
fn as_integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Total order over JSON values
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (as_integer(a), as_integer(b)) {
                return ai.cmp(&bi);
            }
            let af = a.as_f64().unwrap_or(f64::NAN);
            let bf = b.as_f64().unwrap_or(f64::NAN);
            af.partial_cmp(&bf).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Deep equality with numeric comparison for numbers
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(3), &json!(9)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert!(values_equal(&json!(1), &json!(1.0)));
    }

    #[test]
    fn test_large_unsigned_compare_exactly() {
        let max = json!(u64::MAX);
        let below = json!(u64::MAX - 1);
        assert_eq!(compare_values(&below, &max), Ordering::Less);
        assert!(!values_equal(&below, &max));

        let above_f64 = json!((1u64 << 53) + 1);
        assert_eq!(compare_values(&json!(1u64 << 53), &above_f64), Ordering::Less);
        assert_eq!(compare_values(&json!(-1), &max), Ordering::Less);
    }

    #[test]
    fn test_cross_kind_order() {
        assert_eq!(compare_values(&json!([1]), &json!(true)), Ordering::Less);
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(5), &json!("5")), Ordering::Less);
        assert!(!values_equal(&json!("123"), &json!(123)));
    }

    #[test]
    fn test_nested_equality() {
        assert!(values_equal(&json!({"a": [1, {"b": 2}]}), &json!({"a": [1, {"b": 2}]})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!([1, 2]), &json!([1])));
    }
}

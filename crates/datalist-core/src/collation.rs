//! The single comparison rule shared by SQL generation and in-memory lists.
//!
//! NULL sorts lowest. Numbers compare numerically and sort before text. Text
//! compares with ASCII case folding, matching SQLite's `NOCASE` collation,
//! which the SQLite driver declares on every text column. Case-sensitive
//! comparisons fall back to byte order (`BINARY`).

use crate::Value;
use std::cmp::Ordering;

/// Storage class rank, lowest first.
fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => 1,
        Value::String(_) => 2,
        Value::List(_) => 3,
    }
}

/// Compares two values for sorting.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    compare_with_case(a, b, false)
}

/// Compares two values, folding ASCII case on text unless `case_sensitive`.
pub fn compare_with_case(a: &Value, b: &Value, case_sensitive: bool) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => compare_text(a, b, case_sensitive),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        _ if a.is_numeric() && b.is_numeric() => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_text(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        return a.as_bytes().cmp(b.as_bytes());
    }

    a.bytes()
        .map(|b| b.to_ascii_lowercase())
        .cmp(b.bytes().map(|b| b.to_ascii_lowercase()))
}

/// Compares a row value against a filter operand.
///
/// The operand is coerced towards the row value's storage class first, the
/// way column affinity converts a bound parameter: numeric columns parse
/// numeric-looking strings, text columns render numbers as text. Returns
/// `None` when either side is NULL, since NULL never satisfies a comparison.
pub fn compare_operand(row: &Value, operand: &Value, case_sensitive: bool) -> Option<Ordering> {
    if row.is_null() || operand.is_null() {
        return None;
    }

    match (row, operand) {
        (Value::String(_), Value::String(_)) => Some(compare_with_case(row, operand, case_sensitive)),
        (Value::String(text), _) => {
            let operand = operand.to_text()?;
            Some(compare_text(text, &operand, case_sensitive))
        }
        (_, Value::String(text)) if row.is_numeric() => match operand.as_f64() {
            Some(number) => Some(compare(row, &Value::Float(number))),
            None => Some(compare_text(&row.to_text()?, text, case_sensitive)),
        },
        _ => Some(compare_with_case(row, operand, case_sensitive)),
    }
}

/// Returns `true` when the two values are equal under the comparison rule.
pub fn equals(row: &Value, operand: &Value, case_sensitive: bool) -> bool {
    match (row, operand) {
        (Value::Null, Value::Null) => true,
        _ => compare_operand(row, operand, case_sensitive) == Some(Ordering::Equal),
    }
}

//! Scalar coercion for values injected at a target path.
//!
//! A raw string enclosed in double quotes is taken literally as a string,
//! which is how a caller forces `"true"` to stay a string instead of becoming
//! a boolean. Everything else goes through scalar inference: booleans first,
//! then numbers, and finally the unchanged string.

use crate::value::{Number, Value};

#[cfg(test)]
#[path = "coercion_tests.rs"]
mod tests;

/// Coerces a raw string into a typed leaf value.
///
/// # Examples
///
/// ```
/// use values_composer::{coerce_scalar, Value};
///
/// assert_eq!(coerce_scalar("true"), Value::Bool(true));
/// assert_eq!(coerce_scalar("\"true\""), Value::String("true".to_string()));
/// assert_eq!(coerce_scalar("value"), Value::String("value".to_string()));
/// ```
pub fn coerce_scalar(raw: &str) -> Value {
    if let Some(inner) = raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        return Value::String(inner.to_string());
    }

    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Some(number) = parse_number(raw) {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Number::Int(n));
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Number::UInt(n));
    }

    // Rust accepts "inf", "NaN" and friends; only plain decimal notation counts.
    let decimal = raw.bytes().any(|b| b.is_ascii_digit())
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !decimal {
        return None;
    }

    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Number::Float)
}

//! Shared JSON parsing helpers for loosely typed wire payloads.
//!
//! Exchanges encode numbers and flags inconsistently: the same field may
//! arrive as a JSON string (`"50000.5"`, `"false"`) or a native value
//! (`50000.5`, `false`). These helpers accept both.

use serde_json::Value;

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s.trim()).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (bool or `"true"` / `"false"` string) as `bool`.
#[inline]
pub fn parse_str_bool(v: Option<&Value>) -> Option<bool> {
    match v? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Borrow a named string field.
#[inline]
pub fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

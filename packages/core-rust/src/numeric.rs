//! Lenient coercion of loosely typed JSON settings into numbers and flags.
//!
//! Settings come from a flow editor that stores numbers as either JSON
//! numbers or strings (`"5000"`, `" 12.5 "`, `"7000ms"`). Coercion follows
//! leading-prefix parsing: the longest numeric prefix wins and trailing
//! garbage is ignored. Anything without a numeric prefix coerces to `None`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};

/// Largest integer magnitude an `f64` represents exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn float_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?")
            .expect("float prefix pattern is valid")
    })
}

fn int_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?\d+").expect("int prefix pattern is valid")
    })
}

/// Coerces a JSON value to a finite `f64`.
///
/// Numbers pass through; strings are parsed by their longest decimal prefix
/// after leading whitespace. Non-finite results, booleans, null, arrays and
/// objects yield `None`.
#[must_use]
pub fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => float_prefix()
            .find(s.trim_start())
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Coerces a JSON value to an integer, truncating fractional numbers.
///
/// Strings are parsed by their leading integer prefix (`"7000ms"` -> 7000,
/// `"12.9"` -> 12). Values without an integer prefix yield `None`.
#[must_use]
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < MAX_EXACT_INTEGER)
                .map(|f| {
                    #[allow(clippy::cast_possible_truncation)]
                    let truncated = f.trunc() as i64;
                    truncated
                })
        }),
        Value::String(s) => int_prefix()
            .find(s.trim_start())
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        _ => None,
    }
}

/// Flow-editor truthiness: `false`, `null`, `0`, `""` are false, everything else true.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Converts a sampled `f64` into a JSON number.
///
/// Whole values within the exactly representable range are stored as
/// integers so `10.0` serializes as `10`. Non-finite input yields `None`.
#[must_use]
pub fn json_number(value: f64) -> Option<Value> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        #[allow(clippy::cast_possible_truncation)]
        let whole = value as i64;
        return Some(Value::from(whole));
    }
    Number::from_f64(value).map(Value::Number)
}

/// Compares two JSON values, treating numbers by numeric value.
///
/// `serde_json` distinguishes integer `10` from float `10.0`; emitted payloads
/// must not, because the host numeric model has a single number type.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

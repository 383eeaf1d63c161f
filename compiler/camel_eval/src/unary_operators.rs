//! Unary operator implementations for the evaluator.
//!
//! Also home to `++`/`--` arithmetic, including the string "magic"
//! increment (`"aa"++` is `"ab"`, `"Az"++` is `"Ba"`, `"zz"++` is `"aaa"`).

use camel_ir::UnaryOp;
use camel_value::{Number, Value};

/// Evaluate a unary operation. Unary operators cannot fail.
pub fn evaluate_unary(value: &Value, op: UnaryOp) -> Value {
    match op {
        UnaryOp::Neg => negate(value),
        UnaryOp::Not => Value::boolean(!value.is_true()),
        UnaryOp::BitNot => Value::Int(!value.as_int()),
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Int(n) => n
            .checked_neg()
            .map_or_else(|| Value::Float(-(*n as f64)), Value::Int),
        Value::Float(f) => Value::Float(-f),
        // -"foo" is "-foo", -"-foo" is "+foo"
        Value::Str(s) if s.starts_with(|c: char| c.is_alphabetic() || c == '_') => {
            Value::string(format!("-{s}"))
        }
        Value::Str(s)
            if s.starts_with('-') && s[1..].starts_with(|c: char| c.is_alphabetic()) =>
        {
            Value::string(format!("+{}", &s[1..]))
        }
        other => match other.as_number() {
            Number::Int(n) => n
                .checked_neg()
                .map_or_else(|| Value::Float(-(n as f64)), Value::Int),
            Number::Float(f) => Value::Float(-f),
        },
    }
}

/// The value after `++` (when `increment`) or `--`.
pub fn step(value: &Value, increment: bool) -> Value {
    if increment {
        if let Value::Str(s) = value {
            if let Some(next) = magic_increment(s) {
                return Value::string(next);
            }
        }
    }
    let delta: i64 = if increment { 1 } else { -1 };
    match value.as_number() {
        Number::Int(n) => n
            .checked_add(delta)
            .map_or_else(|| Value::Float(n as f64 + delta as f64), Value::Int),
        Number::Float(f) => Value::Float(f + delta as f64),
    }
}

/// Alphanumeric string increment with carry.
///
/// Applies only to non-empty strings of the form `[a-zA-Z]*[0-9]*` that do
/// not look like numbers; everything else increments numerically.
pub fn magic_increment(s: &str) -> Option<String> {
    if s.is_empty() || Value::from(s).looks_like_number() {
        return None;
    }
    let letters_end = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    if !s[letters_end..].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut bytes = s.as_bytes().to_vec();
    for i in (0..bytes.len()).rev() {
        let (wrapped, carry) = match bytes[i] {
            b'z' => (b'a', true),
            b'Z' => (b'A', true),
            b'9' => (b'0', true),
            other => (other + 1, false),
        };
        bytes[i] = wrapped;
        if !carry {
            return String::from_utf8(bytes).ok();
        }
    }

    // carried out of the first position: grow by one
    let first = match s.as_bytes()[0] {
        b'a'..=b'z' => b'a',
        b'A'..=b'Z' => b'A',
        _ => b'1',
    };
    bytes.insert(0, first);
    String::from_utf8(bytes).ok()
}

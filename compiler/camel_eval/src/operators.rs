//! Binary operator implementations for the evaluator.
//!
//! Operators coerce their operands on the fly; the coercion is chosen by the
//! operator, never by the operand tags. `==` always compares numbers, `eq`
//! always compares strings.
//!
//! Short-circuit operators and `..` are not evaluated here: they need
//! control over operand evaluation (or produce lists), so the interpreter
//! handles them before operands are computed.

use std::cmp::Ordering;

use camel_ir::BinaryOp;
use camel_value::{division_by_zero, modulo_by_zero, EvalResult, Number, Value};

// Helper functions for repetitive arithmetic patterns

/// Integer arithmetic that promotes to float on overflow.
#[inline]
fn int_or_float(checked: Option<i64>, fallback: impl FnOnce() -> f64) -> Value {
    checked.map_or_else(|| Value::Float(fallback()), Value::Int)
}

/// Numeric operands, keeping integer-ness only when both were stored as
/// integers.
enum Operands {
    Int(i64, i64),
    Float(f64, f64),
}

#[inline]
fn arith_operands(left: &Value, right: &Value) -> Operands {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Operands::Int(*a, *b),
        _ => Operands::Float(left.as_float(), right.as_float()),
    }
}

/// Numeric ordering for comparisons. String operands that parse as
/// integers compare exactly; anything else compares as floats. `None`
/// when either side is NaN.
pub fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (left.as_number(), right.as_number()) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_float().partial_cmp(&b.as_float()),
    }
}

/// String ordering, by code point.
pub fn compare_strings(left: &Value, right: &Value) -> Ordering {
    left.as_string().cmp(&right.as_string())
}

#[inline]
fn ordering_value(ord: Ordering) -> Value {
    Value::Int(match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

// Direct Dispatch Function

/// Evaluate a binary operation on two already-evaluated operands.
///
/// Fatal only for a zero divisor in `/` or `%`.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => Ok(eval_arith(left, right, op)),
        BinaryOp::Div => eval_div(left, right),
        BinaryOp::Mod => eval_mod(left, right),
        BinaryOp::Pow => Ok(Value::Float(left.as_float().powf(right.as_float()))),

        BinaryOp::Concat => {
            let mut s = left.as_string();
            s.push_str(&right.as_string());
            Ok(Value::string(s))
        }
        BinaryOp::Repeat => {
            let count = usize::try_from(right.as_int()).unwrap_or(0);
            Ok(Value::string(left.as_string().repeat(count)))
        }

        BinaryOp::NumEq
        | BinaryOp::NumNe
        | BinaryOp::NumLt
        | BinaryOp::NumLe
        | BinaryOp::NumGt
        | BinaryOp::NumGe
        | BinaryOp::NumCmp => Ok(eval_numeric_comparison(left, right, op)),

        BinaryOp::StrEq
        | BinaryOp::StrNe
        | BinaryOp::StrLt
        | BinaryOp::StrLe
        | BinaryOp::StrGt
        | BinaryOp::StrGe
        | BinaryOp::StrCmp => Ok(eval_string_comparison(left, right, op)),

        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => Ok(eval_bitwise(left.as_int(), right.as_int(), op)),

        // Both operands are already evaluated here, so these reduce to
        // choosing one of them.
        BinaryOp::And => Ok(if left.is_true() { right.clone() } else { left.clone() }),
        BinaryOp::Or => Ok(if left.is_true() { left.clone() } else { right.clone() }),
        BinaryOp::DefinedOr => Ok(if left.is_defined() {
            left.clone()
        } else {
            right.clone()
        }),

        // Ranges only exist in list context, where the interpreter expands
        // them itself.
        BinaryOp::Range => Ok(Value::Undef),
    }
}

// Operator Families

fn eval_arith(left: &Value, right: &Value, op: BinaryOp) -> Value {
    match arith_operands(left, right) {
        Operands::Int(a, b) => match op {
            BinaryOp::Add => int_or_float(a.checked_add(b), || a as f64 + b as f64),
            BinaryOp::Sub => int_or_float(a.checked_sub(b), || a as f64 - b as f64),
            _ => int_or_float(a.checked_mul(b), || a as f64 * b as f64),
        },
        Operands::Float(a, b) => Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            _ => a * b,
        }),
    }
}

fn eval_div(left: &Value, right: &Value) -> EvalResult {
    let divisor = right.as_float();
    if divisor == 0.0 {
        return Err(division_by_zero());
    }
    Ok(Value::Float(left.as_float() / divisor))
}

/// Integer modulus; the result takes the sign of the right operand.
fn eval_mod(left: &Value, right: &Value) -> EvalResult {
    let (a, b) = (left.as_int(), right.as_int());
    if b == 0 {
        return Err(modulo_by_zero());
    }
    let r = a.wrapping_rem(b);
    let r = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
    Ok(Value::Int(r))
}

fn eval_numeric_comparison(left: &Value, right: &Value, op: BinaryOp) -> Value {
    let ord = compare_numbers(left, right);
    if op == BinaryOp::NumCmp {
        return ord.map_or(Value::Undef, ordering_value);
    }
    let result = match ord {
        // NaN compares false to everything, including itself
        None => op == BinaryOp::NumNe,
        Some(ord) => match op {
            BinaryOp::NumEq => ord == Ordering::Equal,
            BinaryOp::NumNe => ord != Ordering::Equal,
            BinaryOp::NumLt => ord == Ordering::Less,
            BinaryOp::NumLe => ord != Ordering::Greater,
            BinaryOp::NumGt => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        },
    };
    Value::boolean(result)
}

fn eval_string_comparison(left: &Value, right: &Value, op: BinaryOp) -> Value {
    let ord = compare_strings(left, right);
    match op {
        BinaryOp::StrCmp => ordering_value(ord),
        BinaryOp::StrEq => Value::boolean(ord == Ordering::Equal),
        BinaryOp::StrNe => Value::boolean(ord != Ordering::Equal),
        BinaryOp::StrLt => Value::boolean(ord == Ordering::Less),
        BinaryOp::StrLe => Value::boolean(ord != Ordering::Greater),
        BinaryOp::StrGt => Value::boolean(ord == Ordering::Greater),
        _ => Value::boolean(ord != Ordering::Less),
    }
}

fn eval_bitwise(a: i64, b: i64, op: BinaryOp) -> Value {
    let shift = u32::try_from(b).ok().filter(|s| *s < 64);
    Value::Int(match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl => shift.map_or(0, |s| a.wrapping_shl(s)),
        // logical shift, as on unsigned integers
        _ => shift.map_or(0, |s| ((a as u64) >> s) as i64),
    })
}

//! Tests for binary operator implementations.
//!
//! Relocated from `operators.rs`.

use std::cmp::Ordering;

use crate::operators::{compare_numbers, compare_strings, evaluate_binary};
use camel_ir::BinaryOp;
use camel_value::{EvalErrorKind, Value};

#[test]
fn test_int_operations() {
    assert_eq!(
        evaluate_binary(&Value::int(2), &Value::int(3), BinaryOp::Add).unwrap(),
        Value::int(5)
    );
    assert_eq!(
        evaluate_binary(&Value::int(5), &Value::int(3), BinaryOp::Sub).unwrap(),
        Value::int(2)
    );
    assert_eq!(
        evaluate_binary(&Value::int(2), &Value::int(3), BinaryOp::Mul).unwrap(),
        Value::int(6)
    );
    assert_eq!(
        evaluate_binary(&Value::int(7), &Value::int(2), BinaryOp::Mod).unwrap(),
        Value::int(1)
    );
}

#[test]
fn test_division_is_floating() {
    assert_eq!(
        evaluate_binary(&Value::int(7), &Value::int(2), BinaryOp::Div).unwrap(),
        Value::float(3.5)
    );
    let whole = evaluate_binary(&Value::int(10), &Value::int(2), BinaryOp::Div).unwrap();
    assert_eq!(whole.as_string(), "5");
}

#[test]
fn test_overflow_promotes_to_float() {
    let result = evaluate_binary(&Value::int(i64::MAX), &Value::int(1), BinaryOp::Add).unwrap();
    assert!(matches!(result, Value::Float(_)));
    let result = evaluate_binary(&Value::int(i64::MAX), &Value::int(2), BinaryOp::Mul).unwrap();
    assert!(matches!(result, Value::Float(_)));
}

#[test]
fn test_division_by_zero() {
    let err = evaluate_binary(&Value::int(1), &Value::int(0), BinaryOp::Div).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    let err = evaluate_binary(&Value::int(1), &Value::int(0), BinaryOp::Mod).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::ModuloByZero);
}

#[test]
fn test_modulus_takes_sign_of_right_operand() {
    assert_eq!(
        evaluate_binary(&Value::int(-7), &Value::int(3), BinaryOp::Mod).unwrap(),
        Value::int(2)
    );
    assert_eq!(
        evaluate_binary(&Value::int(7), &Value::int(-3), BinaryOp::Mod).unwrap(),
        Value::int(-2)
    );
}

#[test]
fn test_string_operands_coerce() {
    assert_eq!(
        evaluate_binary(&Value::string("10"), &Value::int(5), BinaryOp::Add)
            .unwrap()
            .as_string(),
        "15"
    );
    assert_eq!(
        evaluate_binary(&Value::string("3 apples"), &Value::int(2), BinaryOp::Mul)
            .unwrap()
            .as_string(),
        "6"
    );
}

#[test]
fn test_concat_and_repeat() {
    assert_eq!(
        evaluate_binary(&Value::string("foo"), &Value::int(1), BinaryOp::Concat).unwrap(),
        Value::string("foo1")
    );
    assert_eq!(
        evaluate_binary(&Value::string("ab"), &Value::int(3), BinaryOp::Repeat).unwrap(),
        Value::string("ababab")
    );
    assert_eq!(
        evaluate_binary(&Value::string("ab"), &Value::int(-1), BinaryOp::Repeat).unwrap(),
        Value::string("")
    );
}

#[test]
fn test_numeric_comparisons() {
    let cmp = |a: i64, b: i64, op| evaluate_binary(&Value::int(a), &Value::int(b), op).unwrap();
    assert_eq!(cmp(2, 3, BinaryOp::NumLt), Value::boolean(true));
    assert_eq!(cmp(3, 2, BinaryOp::NumLt), Value::boolean(false));
    assert_eq!(cmp(2, 2, BinaryOp::NumLe), Value::boolean(true));
    assert_eq!(cmp(2, 2, BinaryOp::NumEq), Value::boolean(true));
    assert_eq!(cmp(1, 2, BinaryOp::NumCmp), Value::int(-1));
    assert_eq!(cmp(2, 1, BinaryOp::NumCmp), Value::int(1));
    assert_eq!(
        evaluate_binary(&Value::string("1.0"), &Value::int(1), BinaryOp::NumEq).unwrap(),
        Value::boolean(true)
    );
}

#[test]
fn test_nan_compares_false() {
    let nan = Value::float(f64::NAN);
    assert_eq!(
        evaluate_binary(&nan, &nan, BinaryOp::NumEq).unwrap(),
        Value::boolean(false)
    );
    assert_eq!(
        evaluate_binary(&nan, &nan, BinaryOp::NumNe).unwrap(),
        Value::boolean(true)
    );
    assert_eq!(evaluate_binary(&nan, &Value::int(1), BinaryOp::NumCmp).unwrap(), Value::Undef);
    assert_eq!(compare_numbers(&nan, &Value::int(1)), None);
}

#[test]
fn test_string_comparisons() {
    let cmp = |a: &str, b: &str, op| {
        evaluate_binary(&Value::string(a), &Value::string(b), op).unwrap()
    };
    assert_eq!(cmp("abc", "abd", BinaryOp::StrLt), Value::boolean(true));
    assert_eq!(cmp("b", "a", BinaryOp::StrCmp), Value::int(1));
    assert_eq!(cmp("10", "9", BinaryOp::StrLt), Value::boolean(true));
    assert_eq!(cmp("x", "x", BinaryOp::StrEq), Value::boolean(true));
    assert_eq!(
        compare_strings(&Value::int(10), &Value::int(9)),
        Ordering::Less
    );
}

#[test]
fn test_bitwise() {
    let bit = |a: i64, b: i64, op| evaluate_binary(&Value::int(a), &Value::int(b), op).unwrap();
    assert_eq!(bit(6, 3, BinaryOp::BitAnd), Value::int(2));
    assert_eq!(bit(6, 3, BinaryOp::BitOr), Value::int(7));
    assert_eq!(bit(6, 3, BinaryOp::BitXor), Value::int(5));
    assert_eq!(bit(1, 4, BinaryOp::Shl), Value::int(16));
    assert_eq!(bit(16, 2, BinaryOp::Shr), Value::int(4));
    assert_eq!(bit(1, 64, BinaryOp::Shl), Value::int(0));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(
        evaluate_binary(&Value::int(0), &Value::string("x"), BinaryOp::Or).unwrap(),
        Value::string("x")
    );
    assert_eq!(
        evaluate_binary(&Value::int(0), &Value::string("x"), BinaryOp::And).unwrap(),
        Value::int(0)
    );
    assert_eq!(
        evaluate_binary(&Value::Undef, &Value::int(7), BinaryOp::DefinedOr).unwrap(),
        Value::int(7)
    );
    assert_eq!(
        evaluate_binary(&Value::int(0), &Value::int(7), BinaryOp::DefinedOr).unwrap(),
        Value::int(0)
    );
}

//! Tests for unary operator implementations.
//!
//! Relocated from `unary_operators.rs`.

use crate::unary_operators::{evaluate_unary, magic_increment, step};
use camel_ir::UnaryOp;
use camel_value::Value;

mod negation {
    use super::*;

    #[test]
    fn int_positive() {
        assert_eq!(evaluate_unary(&Value::int(5), UnaryOp::Neg), Value::int(-5));
    }

    #[test]
    fn int_min_promotes() {
        let result = evaluate_unary(&Value::int(i64::MIN), UnaryOp::Neg);
        assert!(matches!(result, Value::Float(_)));
    }

    #[test]
    fn float() {
        assert_eq!(evaluate_unary(&Value::float(2.5), UnaryOp::Neg), Value::float(-2.5));
    }

    #[test]
    fn bareword_string() {
        assert_eq!(
            evaluate_unary(&Value::string("foo"), UnaryOp::Neg),
            Value::string("-foo")
        );
        assert_eq!(
            evaluate_unary(&Value::string("-foo"), UnaryOp::Neg),
            Value::string("+foo")
        );
    }

    #[test]
    fn numeric_string() {
        assert_eq!(evaluate_unary(&Value::string("12"), UnaryOp::Neg), Value::int(-12));
    }
}

mod logical_not {
    use super::*;

    #[test]
    fn true_and_false_values() {
        assert_eq!(evaluate_unary(&Value::int(0), UnaryOp::Not), Value::int(1));
        assert_eq!(evaluate_unary(&Value::string("0"), UnaryOp::Not), Value::int(1));
        assert_eq!(evaluate_unary(&Value::Undef, UnaryOp::Not), Value::int(1));
        assert_eq!(evaluate_unary(&Value::string("a"), UnaryOp::Not), Value::string(""));
    }
}

mod bit_not {
    use super::*;

    #[test]
    fn complements() {
        assert_eq!(evaluate_unary(&Value::int(0), UnaryOp::BitNot), Value::int(-1));
    }
}

mod increment {
    use super::*;

    #[test]
    fn numeric_step() {
        assert_eq!(step(&Value::int(1), true), Value::int(2));
        assert_eq!(step(&Value::int(1), false), Value::int(0));
        assert_eq!(step(&Value::Undef, true), Value::int(1));
        assert_eq!(step(&Value::float(1.5), true), Value::float(2.5));
        assert_eq!(step(&Value::string("9"), true), Value::int(10));
    }

    #[test]
    fn magic_string_increment() {
        assert_eq!(step(&Value::string("aa"), true), Value::string("ab"));
        assert_eq!(step(&Value::string("Az"), true), Value::string("Ba"));
        assert_eq!(step(&Value::string("zz"), true), Value::string("aaa"));
        assert_eq!(step(&Value::string("a9"), true), Value::string("b0"));
    }

    #[test]
    fn decrement_is_never_magic() {
        assert_eq!(step(&Value::string("aa"), false), Value::int(-1));
    }

    #[test]
    fn magic_increment_rejects_non_matching() {
        assert_eq!(magic_increment(""), None);
        assert_eq!(magic_increment("12"), None);
        assert_eq!(magic_increment("a-b"), None);
        assert_eq!(magic_increment("Zz"), Some("AAa".to_string()));
    }
}

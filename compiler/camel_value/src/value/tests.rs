use super::*;
use pretty_assertions::assert_eq;

// Truthiness

#[test]
fn false_values() {
    assert!(!Value::Undef.is_true());
    assert!(!Value::int(0).is_true());
    assert!(!Value::float(0.0).is_true());
    assert!(!Value::from("").is_true());
    assert!(!Value::from("0").is_true());
}

#[test]
fn zero_lookalike_strings_are_true() {
    assert!(Value::from("0.0").is_true());
    assert!(Value::from("00").is_true());
    assert!(Value::from(" 0").is_true());
    assert!(Value::from("0E0").is_true());
}

#[test]
fn empty_container_references_are_false() {
    assert!(!Value::new_array_ref(vec![]).is_true());
    assert!(!Value::Ref(RefTarget::Hash(Container::new(Hash::new()))).is_true());
}

#[test]
fn filled_container_references_are_true() {
    assert!(Value::new_array_ref(vec![Value::Int(0)]).is_true());
    let hash = Container::new(Hash::new());
    hash.borrow_mut().store("k", Value::Undef);
    assert!(Value::Ref(RefTarget::Hash(hash)).is_true());
    assert!(Value::Ref(RefTarget::Scalar(Container::new(Value::Undef))).is_true());
}

// Numeric coercion

#[test]
fn string_numeric_prefix() {
    assert_eq!(Value::from("42abc").as_int(), 42);
    assert_eq!(Value::from("abc").as_int(), 0);
    assert_eq!(Value::from("  12").as_int(), 12);
    assert_eq!(Value::from("-5").as_int(), -5);
    assert_eq!(Value::from("3.7xyz").as_int(), 3);
    assert_eq!(Value::from("1e3").as_int(), 1000);
    assert_eq!(Value::from("").as_int(), 0);
}

#[test]
fn float_coercion_uses_prefix() {
    assert_eq!(Value::from("2.5 apples").as_float(), 2.5);
    assert_eq!(Value::from(".5").as_float(), 0.5);
    assert_eq!(Value::Undef.as_float(), 0.0);
}

#[test]
fn float_to_int_truncates() {
    assert_eq!(Value::float(3.9).as_int(), 3);
    assert_eq!(Value::float(-3.9).as_int(), -3);
    assert_eq!(Value::float(f64::NAN).as_int(), 0);
}

#[test]
fn as_number_keeps_integer_ness() {
    assert_eq!(Value::from("17").as_number(), Number::Int(17));
    assert_eq!(Value::from("1.5").as_number(), Number::Float(1.5));
    assert_eq!(
        Value::from("99999999999999999999").as_number(),
        Number::Float(1e20)
    );
}

#[test]
fn coercion_does_not_change_tag() {
    let v = Value::from("10");
    let _ = v.as_int();
    assert!(matches!(v, Value::Str(_)));
}

// String coercion

#[test]
fn integral_floats_print_without_fraction() {
    assert_eq!(Value::float(5.0).as_string(), "5");
    assert_eq!(Value::float(-0.0).as_string(), "0");
    assert_eq!(Value::float(2.5).as_string(), "2.5");
}

#[test]
fn floats_print_with_fifteen_significant_digits() {
    assert_eq!(Value::float(0.1 + 0.2).as_string(), "0.3");
    assert_eq!(Value::float(1.0 / 3.0).as_string(), "0.333333333333333");
    assert_eq!(Value::float(1e20).as_string(), "1e+20");
    assert_eq!(Value::float(1.5e-7).as_string(), "1.5e-07");
}

#[test]
fn special_floats() {
    assert_eq!(Value::float(f64::INFINITY).as_string(), "Inf");
    assert_eq!(Value::float(f64::NEG_INFINITY).as_string(), "-Inf");
    assert_eq!(Value::float(f64::NAN).as_string(), "NaN");
}

#[test]
fn undef_is_empty_string() {
    assert_eq!(Value::Undef.as_string(), "");
    assert_eq!(Value::boolean(false).as_string(), "");
    assert_eq!(Value::boolean(true).as_string(), "1");
}

#[test]
fn looks_like_number() {
    assert!(Value::from("12").looks_like_number());
    assert!(Value::from(" 1.5e3 ").looks_like_number());
    assert!(Value::from("-Inf").looks_like_number());
    assert!(!Value::from("12abc").looks_like_number());
    assert!(!Value::from("").looks_like_number());
    assert!(!Value::Undef.looks_like_number());
}

// References

#[test]
fn reference_string_form() {
    let r = Value::new_array_ref(vec![Value::int(1)]);
    let s = r.as_string();
    assert!(s.starts_with("ARRAY(0x"), "{s}");

    let target = r.as_ref_target().cloned();
    if let Some(t) = target {
        t.bless("Point");
    }
    assert!(r.as_string().starts_with("Point=ARRAY(0x"));
}

#[test]
fn reference_equality_is_identity() {
    let a = Value::new_hash_ref(Hash::new());
    let b = a.clone();
    let c = Value::new_hash_ref(Hash::new());
    assert_eq!(a, b);
    assert!(a != c);
    assert_eq!(a.as_int(), b.as_int());
}

#[test]
fn format_general_matches_printf_g() {
    assert_eq!(format_general(100000.0, 6), "100000");
    assert_eq!(format_general(1000000.0, 6), "1e+06");
    assert_eq!(format_general(0.0001, 6), "0.0001");
    assert_eq!(format_general(0.00001, 6), "1e-05");
    assert_eq!(format_general(3.14159, 3), "3.14");
}

mod proptest_coercions {
    use super::super::Value;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn int_truthiness_is_nonzero(n in any::<i64>()) {
            prop_assert_eq!(Value::int(n).is_true(), n != 0);
        }

        #[test]
        fn string_truthiness(s in ".{0,8}") {
            let expected = !(s.is_empty() || s == "0");
            prop_assert_eq!(Value::from(s.as_str()).is_true(), expected);
        }

        #[test]
        fn int_string_round_trip(n in any::<i64>()) {
            let text = Value::int(n).as_string();
            prop_assert_eq!(Value::from(text.as_str()).as_int(), n);
        }

        #[test]
        fn integral_float_prints_as_int(n in -1_000_000_000i64..1_000_000_000) {
            prop_assert_eq!(Value::float(n as f64).as_string(), n.to_string());
        }
    }
}

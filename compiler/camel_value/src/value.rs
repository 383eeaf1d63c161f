//! The tagged scalar value and its coercions.
//!
//! A `Value` is one of `Undef`, `Int`, `Float`, `Str` or `Ref`. Strings and
//! numbers convert into each other on demand (`as_int`, `as_float`,
//! `as_string`); the conversion is computed from whatever tag is present
//! and never changes it, so `"10"` stays a string after being added to.
//!
//! References do not copy their target. A `Ref` holds a [`RefTarget`],
//! which names a container by identity: cloning the `Value` clones the
//! handle, and writes through either clone are visible through both.

mod container;
mod numeric;

use std::fmt;
use std::rc::Rc;

pub use container::{
    Array, ArrayCell, CodeCell, Container, Hash, HashCell, Pad, RefTarget, ScalarCell, Slot,
    Subroutine, WeakContainer,
};
pub use numeric::{format_general, parse_number, Number};

/// Runtime scalar value.
#[derive(Clone)]
pub enum Value {
    Undef,
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Ref(RefTarget),
}

// Factory Methods

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    /// The canonical results of comparisons and `!`: `1` and `""`.
    #[inline]
    pub fn boolean(b: bool) -> Self {
        if b {
            Value::Int(1)
        } else {
            Value::Str(Rc::from(""))
        }
    }

    /// A fresh anonymous array and a reference to it (`[ ... ]`).
    pub fn new_array_ref(items: Vec<Value>) -> Self {
        Value::Ref(RefTarget::Array(Container::new(Array::from_vec(items))))
    }

    /// A fresh anonymous hash and a reference to it (`{ ... }`).
    pub fn new_hash_ref(hash: Hash) -> Self {
        Value::Ref(RefTarget::Hash(Container::new(hash)))
    }
}

// Coercions

impl Value {
    #[inline]
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        !self.is_undef()
    }

    /// Boolean interpretation.
    ///
    /// False exactly for `Undef`, numeric zero, `""`, `"0"` and references
    /// to an empty array or hash. Note that `"0.0"` and `"00"` are true:
    /// only the two spellings above are false.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !(s.is_empty() || &**s == "0"),
            Value::Ref(RefTarget::Array(cell)) => cell.borrow().is_true(),
            Value::Ref(RefTarget::Hash(cell)) => cell.borrow().is_true(),
            Value::Ref(RefTarget::Scalar(_) | RefTarget::Code(_)) => true,
        }
    }

    /// Integer interpretation: floats truncate toward zero, strings use
    /// their leading numeric prefix (`"42abc"` is 42, `"abc"` is 0),
    /// references use their address.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Undef => 0,
            Value::Int(n) => *n,
            Value::Float(f) => float_to_int(*f),
            Value::Str(s) => match parse_number(s) {
                Number::Int(n) => n,
                Number::Float(f) => float_to_int(f),
            },
            Value::Ref(r) => r.addr() as i64,
        }
    }

    /// Floating-point interpretation, with the same prefix rule as
    /// [`Value::as_int`].
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Undef => 0.0,
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => parse_number(s).as_float(),
            Value::Ref(r) => r.addr() as f64,
        }
    }

    /// Numeric interpretation preserving integer-ness of the source.
    pub fn as_number(&self) -> Number {
        match self {
            Value::Undef => Number::Int(0),
            Value::Int(n) => Number::Int(*n),
            Value::Float(f) => Number::Float(*f),
            Value::Str(s) => parse_number(s),
            Value::Ref(r) => Number::Int(r.addr() as i64),
        }
    }

    /// String interpretation. Integral floats print without a fraction
    /// (`5.0` is `"5"`), others with up to 15 significant digits.
    pub fn as_string(&self) -> String {
        match self {
            Value::Undef => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.to_string(),
            Value::Ref(r) => r.describe(),
        }
    }

    /// Whether the string form parses completely as a number.
    pub fn looks_like_number(&self) -> bool {
        match self {
            Value::Int(_) | Value::Float(_) => true,
            Value::Str(s) => numeric::is_complete_number(s),
            Value::Undef | Value::Ref(_) => false,
        }
    }

    /// The referenced container, if this is a reference.
    #[inline]
    pub fn as_ref_target(&self) -> Option<&RefTarget> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Short tag name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undef => "undef",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Ref(_) => "reference",
        }
    }
}

/// Float to integer, saturating at the `i64` range and mapping NaN to 0.
fn float_to_int(f: f64) -> i64 {
    if f.is_nan() {
        0
    } else {
        f.trunc() as i64
    }
}

/// Render a float the way the language prints numbers.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if f == f.trunc() && f.abs() < 1e15 {
        // -0.0 prints as 0
        return (f as i64).to_string();
    }
    format_general(f, 15)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undef, Value::Undef) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "Undef"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Ref(r) => write!(f, "Ref({})", r.describe()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

#[cfg(test)]
mod tests;

//! Binary and unary operators.
//!
//! Numeric and string comparison are separate operator families: `==` and
//! `eq` never share a variant, so the evaluator never has to guess which
//! coercion a comparison wants.

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // String
    Concat,
    Repeat,

    // Numeric comparison
    NumEq,
    NumNe,
    NumLt,
    NumLe,
    NumGt,
    NumGe,
    NumCmp,

    // String comparison
    StrEq,
    StrNe,
    StrLt,
    StrLe,
    StrGt,
    StrGe,
    StrCmp,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Short-circuit
    And,
    Or,
    DefinedOr,

    // List
    Range,
}

impl BinaryOp {
    /// Source-level spelling, used in diagnostics and tracing output.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Concat => ".",
            Self::Repeat => "x",
            Self::NumEq => "==",
            Self::NumNe => "!=",
            Self::NumLt => "<",
            Self::NumLe => "<=",
            Self::NumGt => ">",
            Self::NumGe => ">=",
            Self::NumCmp => "<=>",
            Self::StrEq => "eq",
            Self::StrNe => "ne",
            Self::StrLt => "lt",
            Self::StrLe => "le",
            Self::StrGt => "gt",
            Self::StrGe => "ge",
            Self::StrCmp => "cmp",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "&&",
            Self::Or => "||",
            Self::DefinedOr => "//",
            Self::Range => "..",
        }
    }

    /// Whether the right operand is evaluated only on demand.
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::DefinedOr)
    }
}

/// Unary prefix operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x` and `not x`
    Not,
    /// `~x`
    BitNot,
}

/// Increment and decrement, prefix or postfix.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IncDec {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDec {
    /// `true` for `++`, `false` for `--`.
    pub const fn is_increment(self) -> bool {
        matches!(self, Self::PreInc | Self::PostInc)
    }

    /// `true` when the expression yields the value before the update.
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }
}

//! Fatal evaluation outcomes.
//!
//! Nothing in this module is catchable by the running program. An
//! `EvalError` unwinds to the program boundary, where the driver reports
//! it and terminates the process with [`EvalError::exit_code`].
//!
//! Factory functions (`division_by_zero()`, `die(..)`, ...) are the public
//! API; they populate both `kind` and `message`.

use std::fmt;

use crate::value::Value;

/// Result of evaluating an expression.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// `die LIST`. `message` is the final text written to the error sink.
    Die { message: String },
    /// `exit CODE`. Not an error for the user, but it unwinds the same way.
    Exit { code: i32 },

    // Arithmetic
    DivisionByZero,
    ModuloByZero,

    // Calls
    UndefinedSubroutine { name: String },
    NotAReference { expected: &'static str, got: String },
    WrongReferenceType { expected: &'static str },
    NotACodeReference,
    MethodOnUnblessed { method: String },
    RecursionLimit { depth: usize },

    // Containers
    NonCreatableElement { index: i64 },

    // Loop control
    LabelNotFound { keyword: &'static str, label: String },
    LoopControlOutsideLoop { keyword: &'static str },

    /// Catch-all for messages without a structured kind.
    Custom { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Die { message } => write!(f, "{message}"),
            Self::Exit { code } => write!(f, "exit({code})"),

            Self::DivisionByZero => write!(f, "Illegal division by zero"),
            Self::ModuloByZero => write!(f, "Illegal modulus zero"),

            Self::UndefinedSubroutine { name } => {
                write!(f, "Undefined subroutine &{name} called")
            }
            Self::NotAReference { expected, got } => {
                if got.is_empty() {
                    write!(f, "Can't use an undefined value as {expected} reference")
                } else {
                    write!(f, "Can't use string (\"{got}\") as {expected} ref")
                }
            }
            Self::WrongReferenceType { expected } => write!(f, "Not {expected} reference"),
            Self::NotACodeReference => write!(f, "Not a CODE reference"),
            Self::MethodOnUnblessed { method } => {
                write!(f, "Can't call method \"{method}\" on unblessed reference")
            }
            Self::RecursionLimit { depth } => {
                write!(f, "Deep recursion limit exceeded (limit: {depth})")
            }

            Self::NonCreatableElement { index } => {
                write!(f, "Modification of non-creatable array value attempted, subscript {index}")
            }

            Self::LabelNotFound { keyword, label } => {
                write!(f, "Label not found for \"{keyword} {label}\"")
            }
            Self::LoopControlOutsideLoop { keyword } => {
                write!(f, "Can't \"{keyword}\" outside a loop block")
            }

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory-built
    /// errors.
    pub message: String,
    /// Source line of the statement that raised the error, when known.
    pub line: Option<u32>,
}

impl EvalError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            line: None,
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            line: None,
        }
    }

    /// Attach a source line unless one is already recorded (the innermost
    /// statement wins).
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        if self.line.is_none() && line != 0 {
            self.line = Some(line);
        }
        self
    }

    /// Whether this is a normal `exit`, as opposed to a failure.
    #[inline]
    pub fn is_exit(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Exit { .. })
    }

    /// Process exit status: the requested code for `exit`, 255 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            EvalErrorKind::Exit { code } => code,
            _ => 255,
        }
    }

    /// Text to write to the error sink before terminating. Empty for
    /// `exit`.
    ///
    /// `die` messages are complete already. Other fatal errors get the
    /// usual ` at SCRIPT line N.` suffix.
    pub fn report(&self, script: &str) -> String {
        match &self.kind {
            EvalErrorKind::Exit { .. } => String::new(),
            EvalErrorKind::Die { message } => message.clone(),
            _ => match self.line {
                Some(line) => format!("{} at {script} line {line}.\n", self.message),
                None => format!("{}.\n", self.message),
            },
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

// Process control

/// `die` with an already-located message.
#[cold]
pub fn die(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Die {
        message: message.into(),
    })
}

/// `exit(code)`.
#[cold]
pub fn exit(code: i32) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Exit { code })
}

// Arithmetic

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn modulo_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuloByZero)
}

// Calls

#[cold]
pub fn undefined_subroutine(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedSubroutine {
        name: name.to_string(),
    })
}

/// A value was used as an `expected` (`"an ARRAY"`, `"a HASH"`, ...)
/// reference but is not one. A reference of the wrong kind gets the
/// shorter "Not an ARRAY reference" form.
#[cold]
pub fn not_a_reference(expected: &'static str, got: &Value) -> EvalError {
    let kind = match got {
        Value::Ref(_) => EvalErrorKind::WrongReferenceType { expected },
        _ => EvalErrorKind::NotAReference {
            expected,
            got: got.as_string(),
        },
    };
    EvalError::from_kind(kind)
}

#[cold]
pub fn not_a_code_reference() -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotACodeReference)
}

#[cold]
pub fn method_on_unblessed(method: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MethodOnUnblessed {
        method: method.to_string(),
    })
}

#[cold]
pub fn recursion_limit_exceeded(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { depth: limit })
}

// Containers

#[cold]
pub fn non_creatable_element(index: i64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NonCreatableElement { index })
}

// Loop control

/// `last LABEL` / `next LABEL` with no enclosing loop of that name.
#[cold]
pub fn label_not_found(keyword: &'static str, label: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::LabelNotFound {
        keyword,
        label: label.to_string(),
    })
}

/// Bare `last` / `next` with no enclosing loop at all.
#[cold]
pub fn loop_control_outside_loop(keyword: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::LoopControlOutsideLoop { keyword })
}

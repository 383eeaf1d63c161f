//! Camel Value - runtime values for the camel evaluator.
//!
//! # Layout
//!
//! - [`Value`]: the tagged scalar (`Undef`, `Int`, `Float`, `Str`, `Ref`)
//!   with on-demand coercions. Coercion never rewrites the stored tag.
//! - [`Container`]: shared, identity-carrying handle to an [`Array`],
//!   [`Hash`], scalar cell or [`Subroutine`]. Blessing is recorded on the
//!   container, so every reference to it sees the same package.
//! - [`Pad`]: a lexical scratchpad of named slots, one map per sigil.
//! - [`EvalError`]: fatal evaluation outcomes (`die`, `exit`, division by
//!   zero, ...). Everything recoverable resolves to `Undef` instead.

mod errors;
mod value;

pub use errors::{
    die, division_by_zero, exit, label_not_found, loop_control_outside_loop, method_on_unblessed,
    modulo_by_zero, non_creatable_element, not_a_code_reference, not_a_reference,
    recursion_limit_exceeded, undefined_subroutine, EvalError, EvalErrorKind, EvalResult,
};
pub use value::{
    format_general, parse_number, Array, ArrayCell, CodeCell, Container, Hash, HashCell, Number,
    Pad, RefTarget, ScalarCell, Slot, Subroutine, Value, WeakContainer,
};

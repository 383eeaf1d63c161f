//! Camel Eval - tree-walking evaluator for camel programs.
//!
//! Programs arrive as already-built `camel_ir` trees; this crate runs
//! them. There is no parser here.
//!
//! # Architecture
//!
//! The evaluator uses:
//! - `Interpreter`: statement and expression dispatch, contexts, calls
//! - `Environment`: lexical scopes over a table of package globals
//! - `PackageRegistry`: per-package sub tables and `@ISA` method search
//! - `evaluate_binary` / `evaluate_unary`: operator semantics on values
//! - `RegexCache` and the match helpers in `regex_bridge`
//! - `FileTable`: named file handles for `open`/`print FH`/`<FH>`
//! - `PrintHandler`: redirectable stdout/stderr sink
//!
//! # Re-exports
//!
//! Value and error types are re-exported from `camel_value`:
//! - `Value`, `RefTarget`, `Array`, `Hash`, `Container`
//! - `EvalError`, `EvalErrorKind`, `EvalResult`

mod environment;
mod file_handles;
pub mod interpreter;
mod operators;
mod packages;
mod print_handler;
mod regex_bridge;
mod unary_operators;

use std::sync::Once;

pub use camel_value::{
    Array, Container, EvalError, EvalErrorKind, EvalResult, Hash, RefTarget, Value,
};

pub use environment::{Environment, LocalScope, Scope};
pub use file_handles::{FileError, FileMode, FileTable};
pub use interpreter::{sprintf, Flow, Interpreter, InterpreterBuilder, Signal, Values};
pub use operators::{compare_numbers, compare_strings, evaluate_binary};
pub use packages::{qualify, PackageRegistry};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use regex_bridge::{MatchData, RegexCache};
pub use unary_operators::evaluate_unary;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=camel_eval=debug` or `RUST_LOG=camel_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// End the process with the status a finished run calls for: 0 after
/// normal completion, the requested code after `exit`, 255 after any
/// other fatal error.
pub fn terminate(result: EvalResult) -> ! {
    let code = match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    };
    std::process::exit(code)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

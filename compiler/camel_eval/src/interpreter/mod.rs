//! Tree-walking interpreter for camel programs.
//!
//! # Execution model
//!
//! Statements return a [`Flow`]: the value they produced plus a [`Signal`]
//! telling enclosing blocks and loops whether to keep going (`return`,
//! `last` and `next` travel this way). Only fatal conditions use `Err`.
//!
//! Expressions are evaluated in scalar or list context through
//! [`Interpreter::eval_scalar`] and [`Interpreter::eval_list`]; the context
//! of the current sub call is kept in `want` for `wantarray`, `return` and
//! the fall-through value of a sub body.
//!
//! # Variable resolution
//!
//! Lexical scopes are searched first. Anything not declared lexically is a
//! package global stored under its qualified name (`main::x`, `Dog::ISA`).
//! A handful of punctuation and system names always live in `main`.

mod builder;
mod builtins;
mod eval_expr;
mod exec_stmt;
mod file_io;
mod format;
mod function_call;
mod lvalue;
mod method_dispatch;
mod regex_ops;
mod scope_guard;

use std::rc::Rc;

use smallvec::SmallVec;

use camel_ir::{Program, Special, Want};
use camel_value::{
    label_not_found, loop_control_outside_loop, ArrayCell, EvalError, EvalResult, HashCell,
    ScalarCell, Value,
};

use crate::environment::Environment;
use crate::file_handles::FileTable;
use crate::packages::{qualify, PackageRegistry};
use crate::print_handler::SharedPrintHandler;
use crate::regex_bridge::{MatchData, RegexCache};

pub use builder::InterpreterBuilder;
pub use format::sprintf;
pub use scope_guard::ScopedInterpreter;

/// Values produced by a statement or a call. Scalar results never spill.
pub type Values = SmallVec<[Value; 1]>;

/// Out-of-band control state of a statement.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Signal {
    #[default]
    Normal,
    Return(Values),
    Last(Option<String>),
    Next(Option<String>),
}

/// Result of executing a statement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flow {
    pub value: Values,
    pub signal: Signal,
}

impl Flow {
    #[inline]
    pub fn normal(value: Values) -> Self {
        Flow {
            value,
            signal: Signal::Normal,
        }
    }

    #[inline]
    pub fn signal(signal: Signal) -> Self {
        Flow {
            value: Values::new(),
            signal,
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self.signal, Signal::Normal)
    }
}

/// Reduce a result list to what a scalar-context consumer sees.
pub(crate) fn last_value(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().last().unwrap_or(Value::Undef)
}

/// Shape a result list for the context that asked for it.
pub(crate) fn in_context(values: Values, want: Want) -> Values {
    match want {
        Want::List => values,
        Want::Scalar if values.len() == 1 => values,
        Want::Scalar => smallvec::smallvec![last_value(values)],
    }
}

/// `last`/`next` that left every enclosing loop.
#[cold]
pub(crate) fn escaped_loop_control(signal: Signal) -> EvalError {
    match signal {
        Signal::Last(Some(label)) => label_not_found("last", &label),
        Signal::Next(Some(label)) => label_not_found("next", &label),
        Signal::Next(None) => loop_control_outside_loop("next"),
        _ => loop_control_outside_loop("last"),
    }
}

/// Names that resolve in `main` no matter which package is current.
fn is_main_only(name: &str) -> bool {
    matches!(
        name,
        "_" | "0" | "ARGV" | "ENV" | "INC" | "STDIN" | "STDOUT" | "STDERR" | "!" | "@" | ","
    ) || name.starts_with(|c: char| c.is_ascii_digit())
}

/// Tree-walking interpreter.
pub struct Interpreter {
    /// Current lexical environment.
    pub(crate) env: Environment,
    /// Subroutine tables and `@ISA` lists.
    pub(crate) packages: PackageRegistry,
    /// Named file handles.
    pub(crate) files: FileTable,
    /// Sink for program and error output.
    pub(crate) print_handler: SharedPrintHandler,
    pub(crate) regexes: RegexCache,
    /// Most recent successful match: `$&`, `$1..$N`.
    pub(crate) last_match: Option<MatchData>,
    /// Package that unqualified globals and sub definitions belong to.
    pub(crate) package: Rc<str>,
    /// Context of the innermost sub call.
    pub(crate) want: Want,
    pub(crate) call_depth: usize,
    pub(crate) max_call_depth: Option<usize>,
    /// Line of the statement being executed, for `die`/`warn` suffixes.
    pub(crate) line: u32,
    /// `$!`
    pub(crate) os_error: String,
    pub(crate) script_name: String,
}

impl Interpreter {
    /// An interpreter writing to the process's stdout and stderr.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Run a whole program and return the value of its last statement.
    ///
    /// Named subs and `use parent` declarations are registered first, so
    /// code may call subs defined further down. A fatal error is written
    /// to the error sink before it is returned; pending output is flushed
    /// either way.
    pub fn run(&mut self, program: &Program) -> EvalResult {
        self.hoist_declarations(&program.body.stmts, "main");
        let result = self.exec_program(program);

        self.files.flush_all();
        if let Err(err) = &result {
            tracing::debug!(error = %err, exit = err.is_exit(), "program stopped");
            let report = err.report(&self.script_name);
            if !report.is_empty() {
                self.print_handler.eprint(&report);
            }
        }
        self.print_handler.flush();
        result
    }

    fn exec_program(&mut self, program: &Program) -> EvalResult {
        let flow = self.exec_stmts(&program.body.stmts, Some(Want::Scalar))?;
        match flow.signal {
            Signal::Normal => Ok(last_value(flow.value)),
            Signal::Return(values) => Ok(last_value(values)),
            signal => Err(escaped_loop_control(signal)),
        }
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Name of the current package.
    pub fn current_package(&self) -> &str {
        &self.package
    }

    pub fn packages(&self) -> &PackageRegistry {
        &self.packages
    }

    /// Value of the global scalar `$name` (qualified or in `main`).
    pub fn global_scalar(&self, name: &str) -> Value {
        let qualified = if name.contains("::") {
            name.to_string()
        } else {
            qualify("main", name)
        };
        let cell = self.env.global_scalar(&qualified);
        let value = cell.borrow().clone();
        value
    }

    // Variable resolution

    /// Qualified global name for `name` as written in the current package.
    pub(crate) fn qualified(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix("::") {
            return qualify("main", rest);
        }
        if name.contains("::") {
            return name.to_string();
        }
        if is_main_only(name) {
            return qualify("main", name);
        }
        qualify(&self.package, name)
    }

    pub(crate) fn scalar_cell(&self, name: &str) -> ScalarCell {
        if !name.contains("::") {
            if let Some(cell) = self.env.lookup_scalar(name) {
                return cell;
            }
        }
        self.env.global_scalar(&self.qualified(name))
    }

    pub(crate) fn array_cell(&mut self, name: &str) -> ArrayCell {
        if !name.contains("::") {
            if let Some(cell) = self.env.lookup_array(name) {
                return cell;
            }
        }
        self.global_array(&self.qualified(name))
    }

    pub(crate) fn hash_cell(&self, name: &str) -> HashCell {
        if !name.contains("::") {
            if let Some(cell) = self.env.lookup_hash(name) {
                return cell;
            }
        }
        self.env.global_hash(&self.qualified(name))
    }

    /// Global array by qualified name. `@Pkg::ISA` is the registry's own
    /// container, so writes to it change method resolution directly.
    pub(crate) fn global_array(&mut self, qualified: &str) -> ArrayCell {
        if let Some(package) = qualified.strip_suffix("::ISA") {
            return self.packages.isa_cell(package);
        }
        self.env.global_array(qualified)
    }

    /// `$_`
    pub(crate) fn topic_cell(&self) -> ScalarCell {
        self.env.global_scalar("main::_")
    }

    /// `@_`: the current call's arguments, or `@main::_` outside any call.
    pub(crate) fn args_cell(&self) -> ArrayCell {
        self.env
            .lookup_array("_")
            .unwrap_or_else(|| self.env.global_array("main::_"))
    }

    pub(crate) fn special_value(&self, special: Special) -> Value {
        match special {
            Special::Topic => self.topic_cell().borrow().clone(),
            Special::ArgList => Value::Int(self.args_cell().borrow().len() as i64),
            Special::Capture(n) => self
                .last_match
                .as_ref()
                .and_then(|m| m.groups.get(n.checked_sub(1)?))
                .and_then(|g| g.as_deref())
                .map_or(Value::Undef, Value::from),
            Special::MatchedText => self
                .last_match
                .as_ref()
                .map_or(Value::Undef, |m| Value::from(m.matched.as_str())),
            Special::OsError => Value::string(self.os_error.as_str()),
        }
    }

    /// ` at SCRIPT line N.` suffix for `die`/`warn` messages.
    pub(crate) fn location_suffix(&self) -> String {
        if self.line == 0 {
            ".\n".to_string()
        } else {
            format!(" at {} line {}.\n", self.script_name, self.line)
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

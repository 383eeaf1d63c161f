//! Subroutine calls.
//!
//! # Call protocol
//!
//! 1. Arguments are evaluated left to right in list context and flattened.
//! 2. The body runs in a child environment that sees the globals, the
//!    slots the sub captured when it was created, and a fresh `@_`.
//! 3. The current package becomes the sub's package, so unqualified
//!    globals and `SUPER::` resolve where the sub was written.
//! 4. `return` values, or the value of the last statement, are the
//!    result; the caller's environment, package and context are restored.

use std::mem;
use std::rc::Rc;

use camel_ir::{Expr, Want};
use camel_stack::ensure_sufficient_stack;
use camel_value::{
    not_a_code_reference, recursion_limit_exceeded, undefined_subroutine, Array, CodeCell,
    Container, EvalError, RefTarget, Slot, Value,
};

use super::{escaped_loop_control, in_context, Interpreter, Signal, Values};
use crate::packages::qualify;

impl Interpreter {
    /// Evaluate call arguments, flattening arrays, hashes and lists.
    pub(crate) fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        self.eval_items(args)
    }

    /// Named sub as written at a call site: `name` in the current package
    /// (falling back to `main`), or an explicitly qualified `Pkg::name`.
    pub(crate) fn find_named_sub(&self, name: &str) -> Option<CodeCell> {
        if name.contains("::") {
            return self.packages.find_sub(&self.qualified(name));
        }
        self.packages
            .find_sub(&qualify(&self.package, name))
            .or_else(|| self.packages.find_sub(&qualify("main", name)))
    }

    /// `name(args)`: builtin if there is one, otherwise a user sub.
    pub(crate) fn eval_call(
        &mut self,
        name: &str,
        args: &[Expr],
        want: Want,
    ) -> Result<Values, EvalError> {
        if let Some(values) = self.call_builtin(name, args, want)? {
            return Ok(values);
        }
        let Some(code) = self.find_named_sub(name) else {
            return Err(undefined_subroutine(&self.qualified(name)));
        };
        let args = self.eval_args(args)?;
        self.call_sub(&code, args, want)
    }

    /// `$code->(args)` / `&$code(args)`. A string names a sub.
    pub(crate) fn eval_call_ref(
        &mut self,
        target: &Expr,
        args: &[Expr],
        want: Want,
    ) -> Result<Values, EvalError> {
        let target = self.eval_scalar(target)?;
        let code = self.code_from_value(&target)?;
        let args = self.eval_args(args)?;
        self.call_sub(&code, args, want)
    }

    /// `&$code;` passes the caller's `@_` through.
    pub(crate) fn call_with_current_args(
        &mut self,
        target: &Expr,
        want: Want,
    ) -> Result<Values, EvalError> {
        let target = self.eval_scalar(target)?;
        let code = self.code_from_value(&target)?;
        let args = self.args_cell().borrow().to_vec();
        self.call_sub(&code, args, want)
    }

    fn code_from_value(&self, value: &Value) -> Result<CodeCell, EvalError> {
        match value {
            Value::Ref(RefTarget::Code(code)) => Ok(code.clone()),
            Value::Str(name) if !name.is_empty() => self
                .find_named_sub(name)
                .ok_or_else(|| undefined_subroutine(&self.qualified(name))),
            _ => Err(not_a_code_reference()),
        }
    }

    /// Call `code` with an already-evaluated argument list.
    #[tracing::instrument(level = "debug", skip_all, fields(sub = %code.borrow().display_name()))]
    pub fn call_sub(
        &mut self,
        code: &CodeCell,
        args: Vec<Value>,
        want: Want,
    ) -> Result<Values, EvalError> {
        if let Some(limit) = self.max_call_depth {
            if self.call_depth >= limit {
                return Err(recursion_limit_exceeded(limit));
            }
        }

        let (body, package) = {
            let sub = code.borrow();
            (Rc::clone(&sub.body), Rc::clone(&sub.package))
        };

        let mut frame = self.env.child();
        frame.push_scope();
        for (name, slot) in code.borrow().captures.slots() {
            frame.define(name, slot);
        }
        frame.push_scope();
        frame.define("_", Slot::Array(Container::new(Array::from_vec(args))));

        let saved_env = mem::replace(&mut self.env, frame);
        let saved_package = mem::replace(&mut self.package, package);
        let saved_want = mem::replace(&mut self.want, want);
        let saved_line = self.line;
        self.call_depth += 1;

        let result = ensure_sufficient_stack(|| self.exec_stmts(&body.stmts, Some(want)));

        self.call_depth -= 1;
        self.line = saved_line;
        self.want = saved_want;
        self.package = saved_package;
        self.env = saved_env;

        let flow = result?;
        match flow.signal {
            Signal::Normal => Ok(in_context(flow.value, want)),
            Signal::Return(values) => Ok(in_context(values, want)),
            signal => Err(escaped_loop_control(signal)),
        }
    }
}

//! Method call dispatch.
//!
//! The invocant picks the search package: a blessed reference searches its
//! package, a plain string is a class name. Resolution order:
//!
//! 1. `SUPER::m` searches the parents of the package the calling sub was
//!    defined in; `Pkg::m` starts the search (and the `AUTOLOAD` fallback)
//!    at `Pkg`.
//! 2. Depth-first, left-to-right search through `@ISA`.
//! 3. The universal methods `isa`, `can`, `DOES` and `VERSION`.
//! 4. `AUTOLOAD`, found by the same search, with `$AUTOLOAD` set to the
//!    fully qualified name that was asked for.
//! 5. Otherwise the call quietly yields `Undef`.
//!
//! An invocant that names no package at all (undef, the empty string or an
//! unblessed reference) is fatal before any search starts.

use camel_ir::{Expr, MethodName, Want};
use camel_value::{method_on_unblessed, CodeCell, EvalError, RefTarget, Value};

use super::{Interpreter, Values};
use crate::packages::{qualify, split_qualified};

impl Interpreter {
    /// `invocant->method(args)`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) fn eval_method_call(
        &mut self,
        invocant: &Expr,
        method: &MethodName,
        args: &[Expr],
        want: Want,
    ) -> Result<Values, EvalError> {
        let receiver = self.eval_scalar(invocant)?;
        let name = match method {
            MethodName::Named(name) => name.clone(),
            MethodName::Dynamic(expr) => {
                let method = self.eval_scalar(expr)?;
                // `$obj->$coderef(...)` calls the code with $obj first
                if let Value::Ref(RefTarget::Code(code)) = &method {
                    let mut call_args = vec![receiver];
                    call_args.extend(self.eval_args(args)?);
                    return self.call_sub(code, call_args, want);
                }
                method.as_string()
            }
        };

        let mut call_args = vec![receiver.clone()];
        call_args.extend(self.eval_args(args)?);
        self.dispatch_method(&receiver, &name, call_args, want)
    }

    /// Search package for a method call on `receiver`.
    fn invocant_class(&self, receiver: &Value, method: &str) -> Result<String, EvalError> {
        match receiver {
            Value::Ref(target) => target
                .blessed()
                .map(|package| package.to_string())
                .ok_or_else(|| method_on_unblessed(method)),
            Value::Undef => Err(EvalError::new(format!(
                "Can't call method \"{method}\" on an undefined value"
            ))),
            other => {
                let class = other.as_string();
                if class.is_empty() {
                    return Err(EvalError::new(format!(
                        "Can't call method \"{method}\" without a package or object reference"
                    )));
                }
                Ok(class)
            }
        }
    }

    /// Resolve and call `method`; `args[0]` is the receiver.
    pub(crate) fn dispatch_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
        want: Want,
    ) -> Result<Values, EvalError> {
        let class = self.invocant_class(receiver, method)?;

        if let Some(method) = method.strip_prefix("SUPER::") {
            let enclosing = self.package.to_string();
            tracing::debug!(%enclosing, method, "SUPER dispatch");
            if let Some((code, _)) = self.packages.resolve_super(&enclosing, method) {
                return self.call_sub(&code, args, want);
            }
            let autoload = self.packages.resolve_super(&enclosing, "AUTOLOAD");
            return self.autoload(autoload, &class, method, args, want);
        }

        if let (Some(package), name) = split_qualified(method) {
            if let Some((code, _)) = self.packages.resolve_method(package, name) {
                return self.call_sub(&code, args, want);
            }
            let autoload = self.packages.resolve_method(package, "AUTOLOAD");
            return self.autoload(autoload, package, name, args, want);
        }

        if let Some((code, from)) = self.packages.resolve_method(&class, method) {
            tracing::debug!(%class, method, %from, "method resolved");
            return self.call_sub(&code, args, want);
        }

        if let Some(value) = self.universal_method(&class, method, &args) {
            return Ok(smallvec::smallvec![value]);
        }

        let autoload = self.packages.resolve_method(&class, "AUTOLOAD");
        self.autoload(autoload, &class, method, args, want)
    }

    /// Methods every class has. `None` when `method` is not one of them.
    fn universal_method(&self, class: &str, method: &str, args: &[Value]) -> Option<Value> {
        let arg = || args.get(1).map(Value::as_string).unwrap_or_default();
        match method {
            "isa" | "DOES" => Some(Value::boolean(self.packages.isa(class, &arg()))),
            "can" => Some(
                self.packages
                    .resolve_method(class, &arg())
                    .map_or(Value::Undef, |(code, _)| Value::Ref(RefTarget::Code(code))),
            ),
            "VERSION" => {
                let cell = self.env.global_scalar(&qualify(class, "VERSION"));
                let version = cell.borrow().clone();
                Some(version)
            }
            _ => None,
        }
    }

    /// Call a resolved `AUTOLOAD` for `class->method`, or yield nothing.
    /// `DESTROY` is never autoloaded.
    fn autoload(
        &mut self,
        found: Option<(CodeCell, String)>,
        class: &str,
        method: &str,
        args: Vec<Value>,
        want: Want,
    ) -> Result<Values, EvalError> {
        let Some((code, package)) = found.filter(|_| method != "DESTROY") else {
            tracing::debug!(class, method, "method not found");
            return Ok(Values::new());
        };
        let requested = qualify(class, method);
        tracing::debug!(%package, %requested, "AUTOLOAD");
        *self
            .env
            .global_scalar(&qualify(&package, "AUTOLOAD"))
            .borrow_mut() = Value::string(requested);
        self.call_sub(&code, args, want)
    }
}

//! RAII-style scope guards for Interpreter environment management.
//!
//! [`ScopedInterpreter`] pushes a lexical scope when created and pops it
//! when dropped, so a block body that fails with `?` (or panics) never
//! leaves its `my` variables visible to the caller.
//!
//! The guard holds `&mut Interpreter` and implements `Deref`/`DerefMut`,
//! so all interpreter methods are available through it.
//!
//! ```text
//! {
//!     let mut scoped = interpreter.scoped();
//!     scoped.env.define("x", slot);
//!     scoped.exec_stmts(&body.stmts, None)?;
//! } // pop_scope called here
//! ```

use std::ops::{Deref, DerefMut};

use camel_value::Slot;

use super::Interpreter;

/// RAII guard that pops the environment scope on drop.
pub struct ScopedInterpreter<'guard> {
    interpreter: &'guard mut Interpreter,
}

impl Drop for ScopedInterpreter<'_> {
    fn drop(&mut self) {
        self.interpreter.env.pop_scope();
    }
}

impl Deref for ScopedInterpreter<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for ScopedInterpreter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Push a scope that is popped when the returned guard is dropped.
    pub fn scoped(&mut self) -> ScopedInterpreter<'_> {
        self.env.push_scope();
        ScopedInterpreter { interpreter: self }
    }

    /// Run `f` inside a fresh scope.
    pub fn with_env_scope<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut ScopedInterpreter<'_>) -> T,
    {
        let mut scoped = self.scoped();
        f(&mut scoped)
    }

    /// Run `f` inside a fresh scope with `bindings` already defined.
    pub fn with_bindings<T, F, I>(&mut self, bindings: I, f: F) -> T
    where
        F: FnOnce(&mut ScopedInterpreter<'_>) -> T,
        I: IntoIterator<Item = (String, Slot)>,
    {
        self.with_env_scope(|scoped| {
            for (name, slot) in bindings {
                scoped.env.define(&name, slot);
            }
            f(scoped)
        })
    }
}

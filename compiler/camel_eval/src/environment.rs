//! Environment for variable scoping in the interpreter.
//!
//! Uses a scope stack (not cloning) for scope management. Each scope owns a
//! [`Pad`] of slots; a slot is a shared container handle, so closures and
//! `\$x` references alias the variable instead of copying its value.
//!
//! Globals (undeclared or package variables) live in the bottom scope under
//! their qualified name, `main::x`. File-level `my` variables live in the
//! same scope under their bare name, which is what makes them visible
//! inside named subs.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use camel_ir::Sigil;
use camel_value::{Array, ArrayCell, Container, Hash, HashCell, Pad, ScalarCell, Slot, Value};

/// A single-threaded scope wrapper for reference-counted interior mutability.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A single scope containing variable slots.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    pad: Pad,
    parent: Option<LocalScope<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn with_parent(parent: LocalScope<Scope>) -> Self {
        Scope {
            pad: Pad::new(),
            parent: Some(parent),
        }
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    #[inline]
    pub fn define(&mut self, name: &str, slot: Slot) {
        self.pad.insert(name, slot);
    }

    /// Look up a slot here or in an enclosing scope.
    pub fn lookup(&self, sigil: Sigil, name: &str) -> Option<Slot> {
        if let Some(slot) = self.pad.get(sigil, name) {
            return Some(slot);
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.borrow().lookup(sigil, name))
    }

    fn find<T>(&self, get: &impl Fn(&Pad) -> Option<T>) -> Option<T> {
        if let Some(found) = get(&self.pad) {
            return Some(found);
        }
        self.parent.as_ref().and_then(|parent| parent.borrow().find(get))
    }
}

/// A fresh, empty slot for `sigil`.
pub fn new_slot(sigil: Sigil) -> Slot {
    match sigil {
        Sigil::Array => Slot::Array(Container::new(Array::new())),
        Sigil::Hash => Slot::Hash(Container::new(Hash::new())),
        Sigil::Scalar | Sigil::Code => Slot::Scalar(Container::new(Value::Undef)),
    }
}

/// Environment for the interpreter using a scope stack.
pub struct Environment {
    /// Stack of scopes, with current scope at the top.
    scopes: Vec<LocalScope<Scope>>,
    /// Global scope (always at the bottom).
    global: LocalScope<Scope>,
}

impl Environment {
    pub fn new() -> Self {
        let global = LocalScope::new(Scope::new());
        Environment {
            scopes: vec![global.clone()],
            global,
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    #[inline]
    pub fn push_scope(&mut self) {
        let parent = self.current_scope().clone();
        self.scopes.push(LocalScope::new(Scope::with_parent(parent)));
    }

    #[inline]
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    #[inline]
    fn current_scope(&self) -> &LocalScope<Scope> {
        self.scopes.last().unwrap_or(&self.global)
    }

    /// `my`: create a fresh slot in the innermost scope.
    pub fn declare(&mut self, sigil: Sigil, name: &str) -> Slot {
        let slot = new_slot(sigil);
        self.define(name, slot.clone());
        slot
    }

    /// Bind an existing slot in the innermost scope.
    #[inline]
    pub fn define(&mut self, name: &str, slot: Slot) {
        self.current_scope().borrow_mut().define(name, slot);
    }

    /// Lexical lookup from the innermost scope outwards.
    #[inline]
    pub fn lookup(&self, sigil: Sigil, name: &str) -> Option<Slot> {
        self.current_scope().borrow().lookup(sigil, name)
    }

    pub fn lookup_scalar(&self, name: &str) -> Option<ScalarCell> {
        self.current_scope()
            .borrow()
            .find(&|pad: &Pad| pad.scalar(name).cloned())
    }

    pub fn lookup_array(&self, name: &str) -> Option<ArrayCell> {
        self.current_scope()
            .borrow()
            .find(&|pad: &Pad| pad.array(name).cloned())
    }

    pub fn lookup_hash(&self, name: &str) -> Option<HashCell> {
        self.current_scope()
            .borrow()
            .find(&|pad: &Pad| pad.hash(name).cloned())
    }

    pub fn global_scalar(&self, qualified: &str) -> ScalarCell {
        let mut global = self.global.borrow_mut();
        if let Some(cell) = global.pad.scalar(qualified) {
            return cell.clone();
        }
        let cell = Container::new(Value::Undef);
        global.define(qualified, Slot::Scalar(cell.clone()));
        cell
    }

    pub fn global_array(&self, qualified: &str) -> ArrayCell {
        let mut global = self.global.borrow_mut();
        if let Some(cell) = global.pad.array(qualified) {
            return cell.clone();
        }
        let cell = Container::new(Array::new());
        global.define(qualified, Slot::Array(cell.clone()));
        cell
    }

    pub fn global_hash(&self, qualified: &str) -> HashCell {
        let mut global = self.global.borrow_mut();
        if let Some(cell) = global.pad.hash(qualified) {
            return cell.clone();
        }
        let cell = Container::new(Hash::new());
        global.define(qualified, Slot::Hash(cell.clone()));
        cell
    }

    /// The global slot for a qualified name, created on first use.
    pub fn global(&self, sigil: Sigil, qualified: &str) -> Slot {
        let mut global = self.global.borrow_mut();
        if let Some(slot) = global.pad.get(sigil, qualified) {
            return slot;
        }
        let slot = new_slot(sigil);
        global.define(qualified, slot.clone());
        slot
    }

    /// Create a child environment for sub calls: it shares the global
    /// scope but none of the caller's lexical scopes.
    #[must_use]
    pub fn child(&self) -> Self {
        let global = self.global.clone();
        Environment {
            scopes: vec![global.clone()],
            global,
        }
    }

    /// Capture every visible non-global slot, innermost binding first, for
    /// a closure created here.
    pub fn capture(&self) -> Pad {
        let mut captures = Pad::new();
        let mut scope = Some(self.current_scope().clone());
        while let Some(current) = scope {
            if current.ptr_eq(&self.global) {
                break;
            }
            let borrowed = current.borrow();
            captures.absorb(&borrowed.pad);
            scope = borrowed.parent.clone();
        }
        captures
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

//! Statement execution: blocks, declarations, conditionals and loops.
//!
//! `tail` is the context of the enclosing sub call when the statement is
//! the last one of its body (directly or through `if`/bare blocks); the
//! value of such a statement becomes the sub's fall-through result.

use std::rc::Rc;

use camel_ir::{Block, DeclScope, Expr, Sigil, Stmt, StmtKind, VarDecl, Want};
use camel_value::{Container, EvalError, Slot, Subroutine, Value};

use super::lvalue::Place;
use super::{Flow, Interpreter, Signal, Values};
use crate::packages::qualify;

/// What a loop does after one pass of its body.
enum LoopStep {
    Continue,
    Break,
    /// The signal belongs to an outer construct.
    Propagate(Signal),
}

fn loop_step(signal: Signal, label: Option<&String>) -> LoopStep {
    let ours = |target: &Option<String>| target.is_none() || target.as_ref() == label;
    match signal {
        Signal::Normal => LoopStep::Continue,
        Signal::Next(ref target) if ours(target) => LoopStep::Continue,
        Signal::Last(ref target) if ours(target) => LoopStep::Break,
        other => LoopStep::Propagate(other),
    }
}

impl Interpreter {
    /// Run a block in its own lexical scope. A `package NAME;` statement
    /// inside the block ends with it.
    pub(crate) fn exec_block(&mut self, block: &Block, tail: Option<Want>) -> Result<Flow, EvalError> {
        let saved_package = Rc::clone(&self.package);
        let result = self.scoped().exec_stmts(&block.stmts, tail);
        self.package = saved_package;
        result
    }

    /// Run statements in the current scope, stopping at the first
    /// non-normal signal.
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt], tail: Option<Want>) -> Result<Flow, EvalError> {
        let mut flow = Flow::default();
        for (i, stmt) in stmts.iter().enumerate() {
            let stmt_tail = if i + 1 == stmts.len() { tail } else { None };
            flow = self.exec_stmt(stmt, stmt_tail)?;
            if !flow.is_normal() {
                break;
            }
        }
        Ok(flow)
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt, tail: Option<Want>) -> Result<Flow, EvalError> {
        if stmt.line != 0 {
            self.line = stmt.line;
        }
        tracing::trace!(line = stmt.line, "exec");
        self.exec_stmt_kind(&stmt.kind, tail)
            .map_err(|err| err.with_line(stmt.line))
    }

    fn exec_stmt_kind(&mut self, kind: &StmtKind, tail: Option<Want>) -> Result<Flow, EvalError> {
        match kind {
            StmtKind::Expr(expr) => {
                let value = match tail {
                    Some(want) => self.eval_want(expr, want)?,
                    None => smallvec::smallvec![self.eval_scalar(expr)?],
                };
                Ok(Flow::normal(value))
            }

            StmtKind::Decl { decl, init } => {
                let values = self.exec_decl(decl, init.as_ref())?;
                Ok(Flow::normal(values))
            }

            StmtKind::If {
                unless,
                cond,
                then_block,
                elsifs,
                else_block,
            } => {
                if self.eval_scalar(cond)?.is_true() != *unless {
                    return self.exec_block(then_block, tail);
                }
                for (cond, block) in elsifs {
                    if self.eval_scalar(cond)?.is_true() {
                        return self.exec_block(block, tail);
                    }
                }
                match else_block {
                    Some(block) => self.exec_block(block, tail),
                    None => Ok(Flow::default()),
                }
            }

            StmtKind::While {
                label,
                until,
                cond,
                body,
            } => self.exec_while(label.as_ref(), *until, cond.as_ref(), body),

            StmtKind::For {
                label,
                init,
                cond,
                step,
                body,
            } => self.exec_for(label.as_ref(), init.as_deref(), cond.as_ref(), step.as_ref(), body),

            StmtKind::Foreach {
                label,
                var,
                list,
                body,
            } => self.exec_foreach(label.as_ref(), var.as_deref(), list, body),

            StmtKind::Block { label, body } => {
                let flow = self.exec_block(body, tail)?;
                match loop_step(flow.signal.clone(), label.as_ref()) {
                    LoopStep::Continue if flow.is_normal() => Ok(flow),
                    LoopStep::Continue | LoopStep::Break => Ok(Flow::default()),
                    LoopStep::Propagate(signal) => Ok(Flow::signal(signal)),
                }
            }

            StmtKind::Return(value) => {
                let values = match value {
                    Some(expr) => self.eval_want(expr, self.want)?,
                    None => Values::new(),
                };
                Ok(Flow::signal(Signal::Return(values)))
            }
            StmtKind::Last(label) => Ok(Flow::signal(Signal::Last(label.clone()))),
            StmtKind::Next(label) => Ok(Flow::signal(Signal::Next(label.clone()))),

            StmtKind::SubDef { name, body } => {
                let package = Rc::clone(&self.package);
                self.define_named_sub(name, body, &package);
                Ok(Flow::default())
            }

            StmtKind::Package { name, body } => {
                match body {
                    None => self.package = Rc::from(name.as_str()),
                    Some(block) => {
                        let saved = std::mem::replace(&mut self.package, Rc::from(name.as_str()));
                        let result = self.exec_block(block, None);
                        self.package = saved;
                        return result;
                    }
                }
                Ok(Flow::default())
            }

            StmtKind::SetIsa { parents } => {
                let package = Rc::clone(&self.package);
                self.packages.set_isa(&package, parents);
                Ok(Flow::default())
            }
        }
    }

    // Declarations

    /// Register named subs and `use parent` lists before the program runs,
    /// tracking `package` statements to qualify them.
    pub(crate) fn hoist_declarations(&mut self, stmts: &[Stmt], package: &str) {
        let mut package: Rc<str> = Rc::from(package);
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::SubDef { name, body } => self.define_named_sub(name, body, &package),
                StmtKind::SetIsa { parents } => self.packages.set_isa(&package, parents),
                StmtKind::Package { name, body: None } => package = Rc::from(name.as_str()),
                StmtKind::Package {
                    name,
                    body: Some(block),
                } => self.hoist_declarations(&block.stmts, name),
                StmtKind::Block { body, .. } => self.hoist_declarations(&body.stmts, &package),
                _ => {}
            }
        }
    }

    /// Install `sub name { body }` compiled in `package`. Reaching the
    /// definition of an already registered body only refreshes what it
    /// closes over, so a sub sees the lexicals declared above it.
    pub(crate) fn define_named_sub(&mut self, name: &str, body: &Rc<Block>, package: &Rc<str>) {
        let qualified = if name.contains("::") {
            name.to_string()
        } else {
            qualify(package, name)
        };
        if let Some(existing) = self.packages.find_sub(&qualified) {
            let same_body = Rc::ptr_eq(&existing.borrow().body, body);
            if same_body {
                existing.borrow_mut().captures = self.env.capture();
                return;
            }
        }
        let code = Container::new(Subroutine {
            name: Some(Rc::from(qualified.as_str())),
            package: Rc::clone(package),
            body: Rc::clone(body),
            captures: self.env.capture(),
        });
        self.packages.define_sub(&qualified, code);
    }

    /// Declare the variables of `decl` in the current scope and return
    /// their places. `our` binds the lexical name to the package global;
    /// `local` declares like `my`.
    pub(crate) fn declare(&mut self, decl: &VarDecl) -> Place {
        let places: Vec<Place> = decl
            .vars
            .iter()
            .map(|(sigil, name)| self.declare_one(decl.scope, *sigil, name))
            .collect();
        if places.len() == 1 && !decl.parenthesized {
            places.into_iter().next().unwrap_or(Place::Discard)
        } else {
            Place::List(places)
        }
    }

    fn declare_one(&mut self, scope: DeclScope, sigil: Sigil, name: &str) -> Place {
        let slot = match scope {
            DeclScope::My | DeclScope::Local => self.env.declare(sigil, name),
            DeclScope::Our => {
                let qualified = self.qualified(name);
                let slot = match sigil {
                    Sigil::Array => Slot::Array(self.global_array(&qualified)),
                    Sigil::Hash => Slot::Hash(self.env.global_hash(&qualified)),
                    Sigil::Scalar | Sigil::Code => Slot::Scalar(self.env.global_scalar(&qualified)),
                };
                self.env.define(name, slot.clone());
                slot
            }
        };
        Place::from_slot(slot)
    }

    /// `my ...;` / `my ... = init;`. The initializer is evaluated before
    /// the names are declared, so `my $x = $x` reads the outer `$x`.
    fn exec_decl(&mut self, decl: &VarDecl, init: Option<&Expr>) -> Result<Values, EvalError> {
        let list_assign = decl.parenthesized
            || decl
                .vars
                .first()
                .is_some_and(|(sigil, _)| matches!(sigil, Sigil::Array | Sigil::Hash));

        if list_assign {
            let values = match init {
                Some(expr) => Some(self.eval_list(expr)?),
                None => None,
            };
            let place = self.declare(decl);
            if let Some(values) = values {
                place.assign_list(values)?;
            }
            return Ok(place.values().into_iter().collect());
        }

        let value = match init {
            Some(expr) => Some(self.eval_scalar(expr)?),
            None => None,
        };
        let place = self.declare(decl);
        if let Some(value) = value {
            place.store(value)?;
        }
        Ok(smallvec::smallvec![place.fetch()])
    }

    // Loops

    /// `while`/`until`. Variables declared in the condition live for the
    /// whole loop.
    fn exec_while(
        &mut self,
        label: Option<&String>,
        until: bool,
        cond: Option<&Expr>,
        body: &Block,
    ) -> Result<Flow, EvalError> {
        let mut scoped = self.scoped();
        loop {
            if let Some(cond) = cond {
                if scoped.loop_condition(cond)? == until {
                    break;
                }
            }
            let flow = scoped.exec_block(body, None)?;
            match loop_step(flow.signal, label) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Propagate(signal) => return Ok(Flow::signal(signal)),
            }
        }
        Ok(Flow::default())
    }

    /// Truth of a loop condition. A bare `<FH>` reads into `$_`, and both
    /// it and `$x = <FH>` test definedness rather than truth, so a final
    /// line of `"0"` still runs the body.
    fn loop_condition(&mut self, cond: &Expr) -> Result<bool, EvalError> {
        match cond {
            Expr::ReadLine(_) => {
                let line = self.eval_scalar(cond)?;
                let defined = line.is_defined();
                *self.topic_cell().borrow_mut() = line;
                Ok(defined)
            }
            Expr::Assign {
                op: None, value, ..
            } if matches!(**value, Expr::ReadLine(_)) => Ok(self.eval_scalar(cond)?.is_defined()),
            _ => Ok(self.eval_scalar(cond)?.is_true()),
        }
    }

    /// C-style `for`. The step runs after `next` but not after `last`.
    fn exec_for(
        &mut self,
        label: Option<&String>,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Block,
    ) -> Result<Flow, EvalError> {
        let mut scoped = self.scoped();
        if let Some(init) = init {
            scoped.exec_stmt(init, None)?;
        }
        loop {
            if let Some(cond) = cond {
                if !scoped.eval_scalar(cond)?.is_true() {
                    break;
                }
            }
            let flow = scoped.exec_block(body, None)?;
            match loop_step(flow.signal, label) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Propagate(signal) => return Ok(Flow::signal(signal)),
            }
            if let Some(step) = step {
                scoped.eval_scalar(step)?;
            }
        }
        Ok(Flow::default())
    }

    /// `foreach`. The loop variable holds a copy of each element; without
    /// one, `$_` is set per element and restored afterwards.
    fn exec_foreach(
        &mut self,
        label: Option<&String>,
        var: Option<&str>,
        list: &Expr,
        body: &Block,
    ) -> Result<Flow, EvalError> {
        let items = self.eval_list(list)?;
        match var {
            Some(name) => self.foreach_items(label, items, body, |scoped, item| {
                if let Slot::Scalar(cell) = scoped.env.declare(Sigil::Scalar, name) {
                    *cell.borrow_mut() = item;
                }
            }),
            None => {
                let topic = self.topic_cell();
                let saved = topic.borrow().clone();
                let result = self.foreach_items(label, items, body, |_, item| {
                    *topic.borrow_mut() = item;
                });
                *topic.borrow_mut() = saved;
                result
            }
        }
    }

    fn foreach_items(
        &mut self,
        label: Option<&String>,
        items: Vec<Value>,
        body: &Block,
        bind: impl Fn(&mut Interpreter, Value),
    ) -> Result<Flow, EvalError> {
        for item in items {
            let flow = {
                let mut scoped = self.scoped();
                bind(&mut *scoped, item);
                scoped.exec_stmts(&body.stmts, None)?
            };
            match loop_step(flow.signal, label) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Propagate(signal) => return Ok(Flow::signal(signal)),
            }
        }
        Ok(Flow::default())
    }
}

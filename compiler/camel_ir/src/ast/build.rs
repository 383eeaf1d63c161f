//! Constructors for hand-built trees.
//!
//! Front ends and tests build programs node by node; these helpers keep
//! that readable without hiding the node structure.
//!
//! ```text
//! // my $x = 10; $x += 5; say $x;
//! Program::new(vec![
//!     Stmt::my("x", Expr::int(10)),
//!     Stmt::expr(Expr::op_assign(BinaryOp::Add, Expr::scalar("x"), Expr::int(5))),
//!     Stmt::expr(Expr::say(vec![Expr::scalar("x")])),
//! ])
//! ```

use std::rc::Rc;

use super::{
    BinaryOp, Block, DeclScope, Expr, FileRef, IncDec, Literal, MethodName, PrintKind, Program,
    Sigil, Special, Stmt, StmtKind, StrPart, UnaryOp, VarDecl,
};

impl Program {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Program {
            body: Block::new(stmts),
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block { stmts }
    }

    /// A block holding a single expression statement, as `grep EXPR, LIST`
    /// is written.
    pub fn of_expr(expr: Expr) -> Self {
        Block {
            stmts: vec![Stmt::expr(expr)],
        }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt { kind, line: 0 }
    }

    /// Attach a source line.
    #[must_use]
    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::new(StmtKind::Expr(expr))
    }

    /// `my $name = init;`
    pub fn my(name: &str, init: Expr) -> Self {
        Stmt::declare(DeclScope::My, vec![(Sigil::Scalar, name)], false, Some(init))
    }

    /// `my @name = init;`
    pub fn my_array(name: &str, init: Expr) -> Self {
        Stmt::declare(DeclScope::My, vec![(Sigil::Array, name)], false, Some(init))
    }

    /// `my %name = init;`
    pub fn my_hash(name: &str, init: Expr) -> Self {
        Stmt::declare(DeclScope::My, vec![(Sigil::Hash, name)], false, Some(init))
    }

    /// `my ($a, $b, ...) = init;`
    pub fn my_list(names: &[&str], init: Expr) -> Self {
        let vars = names.iter().map(|n| (Sigil::Scalar, *n)).collect();
        Stmt::declare(DeclScope::My, vars, true, Some(init))
    }

    pub fn declare(
        scope: DeclScope,
        vars: Vec<(Sigil, &str)>,
        parenthesized: bool,
        init: Option<Expr>,
    ) -> Self {
        Stmt::new(StmtKind::Decl {
            decl: VarDecl {
                scope,
                vars: vars
                    .into_iter()
                    .map(|(sigil, name)| (sigil, name.to_string()))
                    .collect(),
                parenthesized,
            },
            init,
        })
    }

    pub fn if_(cond: Expr, then_block: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::If {
            unless: false,
            cond,
            then_block: Block::new(then_block),
            elsifs: Vec::new(),
            else_block: None,
        })
    }

    pub fn if_else(cond: Expr, then_block: Vec<Stmt>, else_block: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::If {
            unless: false,
            cond,
            then_block: Block::new(then_block),
            elsifs: Vec::new(),
            else_block: Some(Block::new(else_block)),
        })
    }

    pub fn unless(cond: Expr, then_block: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::If {
            unless: true,
            cond,
            then_block: Block::new(then_block),
            elsifs: Vec::new(),
            else_block: None,
        })
    }

    pub fn while_(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::While {
            label: None,
            until: false,
            cond: Some(cond),
            body: Block::new(body),
        })
    }

    pub fn until(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::While {
            label: None,
            until: true,
            cond: Some(cond),
            body: Block::new(body),
        })
    }

    pub fn for_(init: Stmt, cond: Expr, step: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::For {
            label: None,
            init: Some(Box::new(init)),
            cond: Some(cond),
            step: Some(step),
            body: Block::new(body),
        })
    }

    /// `foreach my $var (list) { body }`; `None` iterates with `$_`.
    pub fn foreach(var: Option<&str>, list: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Foreach {
            label: None,
            var: var.map(str::to_string),
            list,
            body: Block::new(body),
        })
    }

    /// Set the label of a loop or bare block; other statements are returned
    /// unchanged.
    #[must_use]
    pub fn labeled(mut self, name: &str) -> Self {
        match &mut self.kind {
            StmtKind::While { label, .. }
            | StmtKind::For { label, .. }
            | StmtKind::Foreach { label, .. }
            | StmtKind::Block { label, .. } => *label = Some(name.to_string()),
            _ => {}
        }
        self
    }

    pub fn block(body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Block {
            label: None,
            body: Block::new(body),
        })
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::new(StmtKind::Return(Some(value)))
    }

    pub fn ret_empty() -> Self {
        Stmt::new(StmtKind::Return(None))
    }

    pub fn last(label: Option<&str>) -> Self {
        Stmt::new(StmtKind::Last(label.map(str::to_string)))
    }

    pub fn next(label: Option<&str>) -> Self {
        Stmt::new(StmtKind::Next(label.map(str::to_string)))
    }

    pub fn sub(name: &str, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::SubDef {
            name: name.to_string(),
            body: Rc::new(Block::new(body)),
        })
    }

    pub fn package(name: &str) -> Self {
        Stmt::new(StmtKind::Package {
            name: name.to_string(),
            body: None,
        })
    }

    pub fn set_isa(parents: &[&str]) -> Self {
        Stmt::new(StmtKind::SetIsa {
            parents: parents.iter().map(|p| (*p).to_string()).collect(),
        })
    }
}

impl Expr {
    pub fn undef() -> Self {
        Expr::Literal(Literal::Undef)
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal(Literal::Int(n))
    }

    pub fn float(f: f64) -> Self {
        Expr::Literal(Literal::Float(f))
    }

    pub fn str(s: &str) -> Self {
        Expr::Literal(Literal::Str(s.to_string()))
    }

    pub fn interp(parts: Vec<StrPart>) -> Self {
        Expr::Interpolate(parts)
    }

    pub fn scalar(name: &str) -> Self {
        Expr::Var(Sigil::Scalar, name.to_string())
    }

    pub fn array(name: &str) -> Self {
        Expr::Var(Sigil::Array, name.to_string())
    }

    pub fn hash(name: &str) -> Self {
        Expr::Var(Sigil::Hash, name.to_string())
    }

    pub fn topic() -> Self {
        Expr::Special(Special::Topic)
    }

    pub fn args() -> Self {
        Expr::Special(Special::ArgList)
    }

    pub fn capture(n: usize) -> Self {
        Expr::Special(Special::Capture(n))
    }

    /// `$name[index]`
    pub fn elem(array: &str, index: Expr) -> Self {
        Expr::Element {
            array: array.to_string(),
            index: Box::new(index),
        }
    }

    /// `$name{key}`
    pub fn entry(hash: &str, key: Expr) -> Self {
        Expr::Entry {
            hash: hash.to_string(),
            key: Box::new(key),
        }
    }

    /// `base->[index]`
    pub fn arrow_index(base: Expr, index: Expr) -> Self {
        Expr::ArrowIndex {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// `base->{key}`
    pub fn arrow_key(base: Expr, key: Expr) -> Self {
        Expr::ArrowKey {
            base: Box::new(base),
            key: Box::new(key),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::unary(UnaryOp::Not, operand)
    }

    pub fn inc_dec(op: IncDec, target: Expr) -> Self {
        Expr::IncDec {
            op,
            target: Box::new(target),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn op_assign(op: BinaryOp, target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn ternary(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Expr::List(items)
    }

    pub fn range(from: Expr, to: Expr) -> Self {
        Expr::binary(BinaryOp::Range, from, to)
    }

    pub fn reference(target: Expr) -> Self {
        Expr::Ref(Box::new(target))
    }

    pub fn deref(sigil: Sigil, expr: Expr) -> Self {
        Expr::Deref {
            sigil,
            expr: Box::new(expr),
        }
    }

    pub fn anon_sub(body: Vec<Stmt>) -> Self {
        Expr::AnonSub(Rc::new(Block::new(body)))
    }

    /// Inline `my $name`.
    pub fn my(name: &str) -> Self {
        Expr::My(VarDecl {
            scope: DeclScope::My,
            vars: vec![(Sigil::Scalar, name.to_string())],
            parenthesized: false,
        })
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    pub fn call_ref(target: Expr, args: Vec<Expr>) -> Self {
        Expr::CallRef {
            target: Box::new(target),
            args,
        }
    }

    pub fn method(invocant: Expr, name: &str, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            invocant: Box::new(invocant),
            method: MethodName::Named(name.to_string()),
            args,
        }
    }

    /// `target =~ /pattern/flags`
    pub fn matches(target: Expr, pattern: &str, flags: &str) -> Self {
        Expr::Match {
            target: Some(Box::new(target)),
            pattern: Box::new(Expr::str(pattern)),
            flags: flags.to_string(),
            negate: false,
        }
    }

    /// `target =~ s/pattern/replacement/flags`
    pub fn subst(target: Expr, pattern: &str, replacement: Expr, flags: &str) -> Self {
        Expr::Subst {
            target: Some(Box::new(target)),
            pattern: Box::new(Expr::str(pattern)),
            replacement: Box::new(replacement),
            flags: flags.to_string(),
        }
    }

    pub fn regex(pattern: &str, flags: &str) -> Self {
        Expr::Regex {
            pattern: Box::new(Expr::str(pattern)),
            flags: flags.to_string(),
        }
    }

    pub fn print(args: Vec<Expr>) -> Self {
        Expr::Print {
            kind: PrintKind::Print,
            handle: None,
            args,
        }
    }

    pub fn say(args: Vec<Expr>) -> Self {
        Expr::Print {
            kind: PrintKind::Say,
            handle: None,
            args,
        }
    }

    /// `print HANDLE args`
    pub fn print_to(handle: FileRef, args: Vec<Expr>) -> Self {
        Expr::Print {
            kind: PrintKind::Print,
            handle: Some(handle),
            args,
        }
    }

    pub fn grep(block: Block, list: Expr) -> Self {
        Expr::Grep {
            block,
            list: Box::new(list),
        }
    }

    pub fn map(block: Block, list: Expr) -> Self {
        Expr::Map {
            block,
            list: Box::new(list),
        }
    }

    pub fn sort(cmp: Option<Block>, list: Expr) -> Self {
        Expr::Sort {
            cmp,
            list: Box::new(list),
        }
    }
}

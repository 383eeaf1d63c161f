//! Statement and expression nodes.
//!
//! Node kinds are closed enums: the evaluator matches them exhaustively, so
//! adding a variant here is a compile error everywhere it is not handled.
//!
//! # Variable access forms
//!
//! `$name`, `@name` and `%name` are three independent bindings. Element
//! access picks the container by *form*: [`Expr::Element`] (`$a[0]`) reads
//! the array slot of `a`, [`Expr::Entry`] (`$h{k}`) the hash slot of `h`,
//! neither touches the scalar slot `$a`/`$h`.

mod build;
mod operators;

use std::rc::Rc;

pub use operators::{BinaryOp, IncDec, UnaryOp};

/// Variable namespace selector.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Sigil {
    /// `$`
    Scalar,
    /// `@`
    Array,
    /// `%`
    Hash,
    /// `&`
    Code,
}

impl Sigil {
    /// The sigil character as written in source.
    pub const fn as_char(self) -> char {
        match self {
            Self::Scalar => '$',
            Self::Array => '@',
            Self::Hash => '%',
            Self::Code => '&',
        }
    }
}

/// Evaluation context requested by the consumer of an expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Want {
    #[default]
    Scalar,
    List,
}

/// A whole program: the top-level statement sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub body: Block,
}

/// A brace-delimited statement sequence. Blocks open a lexical scope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

/// Statement node with its source line (0 when unknown).
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

/// Declarator keyword.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclScope {
    My,
    Our,
    Local,
}

/// The left-hand side of `my $x`, `my ($a, @rest)`, `our @ISA`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub scope: DeclScope,
    pub vars: Vec<(Sigil, String)>,
    /// `my ($x) = ...` assigns position-wise; `my $x = ...` assigns in
    /// scalar context.
    pub parenthesized: bool,
}

/// Statement kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its side effects (and its value, when it is
    /// the last statement of a sub body).
    Expr(Expr),

    /// `my`/`our`/`local` declaration with optional initializer.
    Decl { decl: VarDecl, init: Option<Expr> },

    /// `if`/`unless` with `elsif` chain. `unless` negates only `cond`.
    If {
        unless: bool,
        cond: Expr,
        then_block: Block,
        elsifs: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },

    /// `while`/`until`. A missing condition loops forever.
    While {
        label: Option<String>,
        until: bool,
        cond: Option<Expr>,
        body: Block,
    },

    /// C-style `for (init; cond; step)`.
    For {
        label: Option<String>,
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Block,
    },

    /// `foreach my $var (LIST)`. `var: None` binds the topic `$_`.
    Foreach {
        label: Option<String>,
        var: Option<String>,
        list: Expr,
        body: Block,
    },

    /// Bare block; behaves as a loop that runs once for `last`/`next`.
    Block { label: Option<String>, body: Block },

    Return(Option<Expr>),
    Last(Option<String>),
    Next(Option<String>),

    /// `sub name { ... }`, registered before the program runs.
    SubDef { name: String, body: Rc<Block> },

    /// `package Name;` or `package Name { ... }`.
    Package { name: String, body: Option<Block> },

    /// `use parent -norequire, 'A', 'B'` / `use base`.
    SetIsa { parents: Vec<String> },
}

/// Literal constants.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Undef,
    Int(i64),
    Float(f64),
    Str(String),
}

/// A piece of an interpolated string. Array-valued parts are joined with
/// a single space.
#[derive(Clone, Debug, PartialEq)]
pub enum StrPart {
    Lit(String),
    Expr(Expr),
}

/// Special variables that are not ordinary named slots.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Special {
    /// `$_`
    Topic,
    /// `@_`
    ArgList,
    /// `$1`, `$2`, ...
    Capture(usize),
    /// `$&`
    MatchedText,
    /// `$!`
    OsError,
}

/// Method named at the call site or computed (`$obj->$name()`).
#[derive(Clone, Debug, PartialEq)]
pub enum MethodName {
    /// May be qualified: `SUPER::new`, `Base::init`.
    Named(String),
    Dynamic(Box<Expr>),
}

/// A file handle operand: bareword `FH` or an expression holding a handle
/// (`$fh`).
#[derive(Clone, Debug, PartialEq)]
pub enum FileRef {
    Named(String),
    Expr(Box<Expr>),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrintKind {
    Print,
    Say,
    Printf,
}

/// Expression nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Interpolate(Vec<StrPart>),

    /// `$x`, `@x`, `%x`, `&x` (the latter yields a code reference).
    Var(Sigil, String),
    Special(Special),

    /// `$name[index]`
    Element { array: String, index: Box<Expr> },
    /// `$name{key}`
    Entry { hash: String, key: Box<Expr> },
    /// `base->[index]`, also the implicit arrow in `$a[0][1]`.
    ArrowIndex { base: Box<Expr>, index: Box<Expr> },
    /// `base->{key}`
    ArrowKey { base: Box<Expr>, key: Box<Expr> },
    /// `@a[LIST]`, `@{$r}[LIST]`; `base` names the array container.
    Slice { base: Box<Expr>, indices: Box<Expr> },
    /// `@h{LIST}`; `base` names the hash container.
    HashSlice { base: Box<Expr>, keys: Box<Expr> },
    /// `$#a`, `$#{$r}`
    LastIndex(Box<Expr>),

    Unary { op: UnaryOp, operand: Box<Expr> },
    IncDec { op: IncDec, target: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `target = value`, or `target OP= value` when `op` is set.
    Assign { op: Option<BinaryOp>, target: Box<Expr>, value: Box<Expr> },
    Ternary { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },

    /// Parenthesised comma list.
    List(Vec<Expr>),
    /// `[ ... ]`
    AnonArray(Vec<Expr>),
    /// `{ ... }`
    AnonHash(Vec<Expr>),
    /// `sub { ... }`
    AnonSub(Rc<Block>),

    /// `\expr`
    Ref(Box<Expr>),
    /// `$$r`, `@$r`, `%$r`, `&$r`
    Deref { sigil: Sigil, expr: Box<Expr> },

    /// Inline declaration: `open(my $fh, ...)`, `while (my $l = <FH>)`.
    My(VarDecl),

    /// Named call: user sub (possibly `Pkg::name`) or builtin.
    Call { name: String, args: Vec<Expr> },
    /// `$code->(args)`, `&$code(args)`
    CallRef { target: Box<Expr>, args: Vec<Expr> },
    /// `invocant->method(args)`
    MethodCall { invocant: Box<Expr>, method: MethodName, args: Vec<Expr> },

    /// `target =~ /pattern/flags` (`!~` when `negate`). No target means `$_`.
    Match { target: Option<Box<Expr>>, pattern: Box<Expr>, flags: String, negate: bool },
    /// `target =~ s/pattern/replacement/flags`
    Subst { target: Option<Box<Expr>>, pattern: Box<Expr>, replacement: Box<Expr>, flags: String },
    /// `qr/pattern/flags`, also the pattern operand of `split`.
    Regex { pattern: Box<Expr>, flags: String },

    /// `<FH>`, `<$fh>`
    ReadLine(FileRef),
    /// Bareword file handle operand, e.g. the first argument of `open(FH, ...)`.
    FileHandle(String),
    Print { kind: PrintKind, handle: Option<FileRef>, args: Vec<Expr> },

    Grep { block: Block, list: Box<Expr> },
    Map { block: Block, list: Box<Expr> },
    /// `sort LIST` or `sort { $a <=> $b } LIST`
    Sort { cmp: Option<Block>, list: Box<Expr> },
}

#[cfg(test)]
mod tests;

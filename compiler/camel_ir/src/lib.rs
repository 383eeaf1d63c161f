//! Camel IR - the syntax tree consumed by the camel evaluator.
//!
//! The evaluator never parses source text. A front end (parser, test
//! harness, code generator) builds a [`Program`] out of the statement and
//! expression nodes defined here and hands it over whole.
//!
//! Nodes are plain owned data. Subroutine bodies are held behind `Rc` so
//! that registering a sub, or creating a closure, shares the body instead
//! of copying it.

mod ast;

pub use ast::{
    BinaryOp, Block, DeclScope, Expr, FileRef, IncDec, Literal, MethodName, PrintKind, Program,
    Sigil, Special, Stmt, StmtKind, StrPart, UnaryOp, VarDecl, Want,
};

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn sigils_render_as_source() {
    assert_eq!(Sigil::Scalar.as_char(), '$');
    assert_eq!(Sigil::Array.as_char(), '@');
    assert_eq!(Sigil::Hash.as_char(), '%');
    assert_eq!(Sigil::Code.as_char(), '&');
}

#[test]
fn short_circuit_operators() {
    assert!(BinaryOp::And.is_short_circuit());
    assert!(BinaryOp::Or.is_short_circuit());
    assert!(BinaryOp::DefinedOr.is_short_circuit());
    assert!(!BinaryOp::Concat.is_short_circuit());
    assert_eq!(BinaryOp::NumCmp.as_symbol(), "<=>");
    assert_eq!(BinaryOp::StrCmp.as_symbol(), "cmp");
}

#[test]
fn inc_dec_classification() {
    assert!(IncDec::PostInc.is_increment());
    assert!(IncDec::PostInc.is_postfix());
    assert!(!IncDec::PreDec.is_increment());
    assert!(!IncDec::PreDec.is_postfix());
}

#[test]
fn my_list_builds_parenthesized_declaration() {
    let stmt = Stmt::my_list(&["a", "b"], Expr::args());
    assert_eq!(
        stmt.kind,
        StmtKind::Decl {
            decl: VarDecl {
                scope: DeclScope::My,
                vars: vec![
                    (Sigil::Scalar, "a".to_string()),
                    (Sigil::Scalar, "b".to_string())
                ],
                parenthesized: true,
            },
            init: Some(Expr::Special(Special::ArgList)),
        }
    );
}

#[test]
fn labeled_only_applies_to_loops() {
    let looped = Stmt::while_(Expr::int(1), vec![]).labeled("OUTER");
    assert!(matches!(
        looped.kind,
        StmtKind::While { label: Some(ref l), .. } if l == "OUTER"
    ));

    let plain = Stmt::expr(Expr::int(1)).labeled("OUTER");
    assert_eq!(plain, Stmt::expr(Expr::int(1)));
}

#[test]
fn line_numbers_attach() {
    let stmt = Stmt::ret(Expr::int(1)).at(12);
    assert_eq!(stmt.line, 12);
}

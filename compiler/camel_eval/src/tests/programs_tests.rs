//! End-to-end tests: hand-built programs run through a buffered print
//! handler.

use camel_ir::{
    BinaryOp, Block, DeclScope, Expr, FileRef, IncDec, Program, Sigil, Special, Stmt, StrPart,
};
use proptest::prelude::*;

use crate::{buffer_handler, silent_handler, EvalErrorKind, EvalResult, FileTable, Interpreter, Value};

struct Outcome {
    result: EvalResult,
    out: String,
    err: String,
}

fn run_with(builder: crate::InterpreterBuilder, stmts: Vec<Stmt>) -> Outcome {
    let handler = buffer_handler();
    let mut interp = builder
        .print_handler(handler.clone())
        .script_name("t.pl")
        .import_env(false)
        .build();
    let result = interp.run(&Program::new(stmts));
    Outcome {
        result,
        out: handler.get_output(),
        err: handler.get_error_output(),
    }
}

fn run(stmts: Vec<Stmt>) -> Outcome {
    run_with(Interpreter::builder(), stmts)
}

fn output(stmts: Vec<Stmt>) -> String {
    let outcome = run(stmts);
    assert!(
        outcome.result.is_ok(),
        "program failed: {:?} / {}",
        outcome.result,
        outcome.err
    );
    outcome.out
}

fn say(expr: Expr) -> Stmt {
    Stmt::expr(Expr::say(vec![expr]))
}

fn join(sep: &str, list: Expr) -> Expr {
    Expr::call("join", vec![Expr::str(sep), list])
}

fn ints(values: &[i64]) -> Expr {
    Expr::list(values.iter().copied().map(Expr::int).collect())
}

fn lit(s: &str) -> StrPart {
    StrPart::Lit(s.to_string())
}

fn part(expr: Expr) -> StrPart {
    StrPart::Expr(expr)
}

fn yes_no(cond: Expr) -> Expr {
    Expr::ternary(cond, Expr::str("yes"), Expr::str("no"))
}

/// `my ($a, $b, ...) = @_;`
fn unpack_args(names: &[&str]) -> Stmt {
    Stmt::my_list(names, Expr::args())
}

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("camel_eval_{}_{name}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

mod basics {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_assign_and_say() {
        // my $x = 10; $x += 5; say $x;
        let out = output(vec![
            Stmt::my("x", Expr::int(10)),
            Stmt::expr(Expr::op_assign(BinaryOp::Add, Expr::scalar("x"), Expr::int(5))),
            say(Expr::scalar("x")),
        ]);
        assert_eq!(out, "15\n");
    }

    #[test]
    fn push_and_join() {
        let out = output(vec![
            Stmt::my_array("a", ints(&[1, 2, 3])),
            Stmt::expr(Expr::call("push", vec![Expr::array("a"), Expr::int(4)])),
            say(join(",", Expr::array("a"))),
        ]);
        assert_eq!(out, "1,2,3,4\n");
    }

    #[test]
    fn exists_and_delete() {
        let key = || Expr::entry("h", Expr::str("a"));
        let out = output(vec![
            Stmt::my_hash("h", Expr::list(vec![Expr::str("a"), Expr::int(1)])),
            say(yes_no(Expr::call("exists", vec![key()]))),
            Stmt::expr(Expr::call("delete", vec![key()])),
            say(yes_no(Expr::call("exists", vec![key()]))),
        ]);
        assert_eq!(out, "yes\nno\n");
    }

    #[test]
    fn run_returns_last_statement_value() {
        let outcome = run(vec![Stmt::expr(Expr::binary(
            BinaryOp::Add,
            Expr::int(1),
            Expr::int(2),
        ))]);
        assert_eq!(outcome.result.unwrap(), Value::Int(3));
    }

    #[test]
    fn number_formatting() {
        let out = output(vec![
            say(Expr::binary(BinaryOp::Div, Expr::int(10), Expr::int(2))),
            say(Expr::binary(BinaryOp::Add, Expr::float(0.1), Expr::float(0.2))),
            say(Expr::binary(BinaryOp::Add, Expr::str("3 apples"), Expr::int(2))),
        ]);
        assert_eq!(out, "5\n0.3\n5\n");
    }

    #[test]
    fn string_increment() {
        let out = output(vec![
            Stmt::my("v", Expr::str("az")),
            Stmt::expr(Expr::inc_dec(IncDec::PostInc, Expr::scalar("v"))),
            say(Expr::scalar("v")),
        ]);
        assert_eq!(out, "ba\n");
    }

    #[test]
    fn interpolation_joins_arrays_with_spaces() {
        let out = output(vec![
            Stmt::my_array("a", ints(&[1, 2, 3])),
            say(Expr::interp(vec![
                lit("<"),
                part(Expr::array("a")),
                lit("> "),
                part(Expr::elem("a", Expr::int(-1))),
            ])),
        ]);
        assert_eq!(out, "<1 2 3> 3\n");
    }

    #[test]
    fn inner_block_shadows_outer_lexical() {
        let out = output(vec![
            Stmt::my("x", Expr::int(1)),
            Stmt::block(vec![Stmt::my("x", Expr::int(2)), say(Expr::scalar("x"))]),
            say(Expr::scalar("x")),
        ]);
        assert_eq!(out, "2\n1\n");
    }

    #[test]
    fn printf_formats() {
        let out = output(vec![Stmt::expr(Expr::call(
            "printf",
            vec![Expr::str("%-5s|%03d\n"), Expr::str("ab"), Expr::int(7)],
        ))]);
        assert_eq!(out, "ab   |007\n");
    }

    #[test]
    fn print_uses_output_separator() {
        let out = output(vec![
            Stmt::expr(Expr::assign(Expr::scalar(","), Expr::str("-"))),
            Stmt::expr(Expr::print(vec![Expr::int(1), Expr::int(2), Expr::int(3)])),
        ]);
        assert_eq!(out, "1-2-3");
    }
}

mod subs {
    use super::*;
    use pretty_assertions::assert_eq;

    fn factorial() -> Stmt {
        // sub f { my ($n) = @_; return 1 if $n <= 1; return $n * f($n - 1); }
        let n = || Expr::scalar("n");
        Stmt::sub(
            "f",
            vec![
                unpack_args(&["n"]),
                Stmt::if_(
                    Expr::binary(BinaryOp::NumLe, n(), Expr::int(1)),
                    vec![Stmt::ret(Expr::int(1))],
                ),
                Stmt::ret(Expr::binary(
                    BinaryOp::Mul,
                    n(),
                    Expr::call("f", vec![Expr::binary(BinaryOp::Sub, n(), Expr::int(1))]),
                )),
            ],
        )
    }

    #[test]
    fn recursive_factorial() {
        let out = output(vec![
            factorial(),
            say(Expr::call("f", vec![Expr::int(5)])),
        ]);
        assert_eq!(out, "120\n");
    }

    #[test]
    fn sub_called_before_its_definition() {
        let out = output(vec![
            say(Expr::call("f", vec![Expr::int(4)])),
            factorial(),
        ]);
        assert_eq!(out, "24\n");
    }

    #[test]
    fn fall_through_value_is_the_result() {
        let out = output(vec![
            Stmt::sub(
                "pick",
                vec![Stmt::if_else(
                    Expr::elem("_", Expr::int(0)),
                    vec![Stmt::expr(Expr::str("then"))],
                    vec![Stmt::expr(Expr::str("else"))],
                )],
            ),
            say(Expr::call("pick", vec![Expr::int(1)])),
            say(Expr::call("pick", vec![Expr::int(0)])),
        ]);
        assert_eq!(out, "then\nelse\n");
    }

    #[test]
    fn wantarray_reports_call_context() {
        let out = output(vec![
            Stmt::sub(
                "ctx",
                vec![Stmt::ret(Expr::ternary(
                    Expr::call("wantarray", vec![]),
                    Expr::str("list"),
                    Expr::str("scalar"),
                ))],
            ),
            Stmt::my_array("a", Expr::call("ctx", vec![])),
            Stmt::my("s", Expr::call("ctx", vec![])),
            say(Expr::interp(vec![
                part(Expr::elem("a", Expr::int(0))),
                lit(" "),
                part(Expr::scalar("s")),
            ])),
        ]);
        assert_eq!(out, "list scalar\n");
    }

    #[test]
    fn list_return_in_scalar_context_gives_last_element() {
        let out = output(vec![
            Stmt::sub("three", vec![Stmt::ret(ints(&[7, 8, 9]))]),
            Stmt::my("last", Expr::call("three", vec![])),
            Stmt::my_array("all", Expr::call("three", vec![])),
            say(Expr::scalar("last")),
            say(join("", Expr::array("all"))),
        ]);
        assert_eq!(out, "9\n789\n");
    }

    #[test]
    fn closures_keep_their_own_state() {
        // sub make_counter { my $n = 0; return sub { $n++; return $n; }; }
        let out = output(vec![
            Stmt::sub(
                "make_counter",
                vec![
                    Stmt::my("n", Expr::int(0)),
                    Stmt::ret(Expr::anon_sub(vec![
                        Stmt::expr(Expr::inc_dec(IncDec::PostInc, Expr::scalar("n"))),
                        Stmt::ret(Expr::scalar("n")),
                    ])),
                ],
            ),
            Stmt::my("c", Expr::call("make_counter", vec![])),
            Stmt::expr(Expr::call_ref(Expr::scalar("c"), vec![])),
            Stmt::expr(Expr::call_ref(Expr::scalar("c"), vec![])),
            say(Expr::call_ref(Expr::scalar("c"), vec![])),
            Stmt::my("d", Expr::call("make_counter", vec![])),
            say(Expr::call_ref(Expr::scalar("d"), vec![])),
        ]);
        assert_eq!(out, "3\n1\n");
    }

    #[test]
    fn named_sub_sees_file_lexicals() {
        let out = output(vec![
            Stmt::my("greeting", Expr::str("hi")),
            Stmt::sub(
                "greet",
                vec![Stmt::ret(Expr::binary(
                    BinaryOp::Concat,
                    Expr::scalar("greeting"),
                    Expr::str("!"),
                ))],
            ),
            say(Expr::call("greet", vec![])),
        ]);
        assert_eq!(out, "hi!\n");
    }

    #[test]
    fn args_alias_nothing_but_see_all_values() {
        let out = output(vec![
            Stmt::sub(
                "count",
                vec![Stmt::ret(Expr::call("scalar", vec![Expr::args()]))],
            ),
            Stmt::my_array("a", ints(&[1, 2])),
            say(Expr::call("count", vec![Expr::array("a"), Expr::int(3)])),
        ]);
        assert_eq!(out, "3\n");
    }

    #[test]
    fn recursion_limit_is_fatal() {
        let builder = Interpreter::builder().max_call_depth(Some(50));
        let outcome = run_with(
            builder,
            vec![
                Stmt::sub("r", vec![Stmt::expr(Expr::call("r", vec![]))]),
                Stmt::expr(Expr::call("r", vec![])),
            ],
        );
        let err = outcome.result.unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::RecursionLimit { depth: 50 });
    }

    #[test]
    fn undefined_sub_is_fatal() {
        let outcome = run(vec![Stmt::expr(Expr::call("nope", vec![])).at(3)]);
        let err = outcome.result.unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UndefinedSubroutine {
                name: "main::nope".to_string()
            }
        );
        assert_eq!(
            outcome.err,
            "Undefined subroutine &main::nope called at t.pl line 3.\n"
        );
    }
}

mod objects {
    use super::*;
    use pretty_assertions::assert_eq;

    fn self_key(key: &str) -> Expr {
        Expr::arrow_key(Expr::scalar("self"), Expr::str(key))
    }

    /// `Animal` with a constructor, `speak` and `sound`; `Dog` inherits
    /// and overrides `sound`.
    fn animals() -> Vec<Stmt> {
        vec![
            Stmt::package("Animal"),
            Stmt::sub(
                "new",
                vec![
                    unpack_args(&["class", "name"]),
                    Stmt::my(
                        "self",
                        Expr::AnonHash(vec![Expr::str("name"), Expr::scalar("name")]),
                    ),
                    Stmt::ret(Expr::call(
                        "bless",
                        vec![Expr::scalar("self"), Expr::scalar("class")],
                    )),
                ],
            ),
            Stmt::sub(
                "speak",
                vec![
                    unpack_args(&["self"]),
                    Stmt::ret(Expr::binary(
                        BinaryOp::Concat,
                        self_key("name"),
                        Expr::binary(
                            BinaryOp::Concat,
                            Expr::str(" says "),
                            Expr::method(Expr::scalar("self"), "sound", vec![]),
                        ),
                    )),
                ],
            ),
            Stmt::sub("sound", vec![Stmt::expr(Expr::str("..."))]),
            Stmt::package("Dog"),
            Stmt::set_isa(&["Animal"]),
            Stmt::sub("sound", vec![Stmt::expr(Expr::str("woof"))]),
            Stmt::package("main"),
        ]
    }

    #[test]
    fn inherited_method_calls_override() {
        let mut stmts = animals();
        stmts.extend([
            Stmt::my(
                "d",
                Expr::method(Expr::str("Dog"), "new", vec![Expr::str("Rex")]),
            ),
            say(Expr::method(Expr::scalar("d"), "speak", vec![])),
            say(Expr::call("ref", vec![Expr::scalar("d")])),
        ]);
        assert_eq!(output(stmts), "Rex says woof\nDog\n");
    }

    #[test]
    fn universal_isa_and_can() {
        let mut stmts = animals();
        stmts.extend([
            Stmt::my(
                "d",
                Expr::method(Expr::str("Dog"), "new", vec![Expr::str("Rex")]),
            ),
            say(yes_no(Expr::method(
                Expr::scalar("d"),
                "isa",
                vec![Expr::str("Animal")],
            ))),
            say(yes_no(Expr::method(
                Expr::str("Animal"),
                "isa",
                vec![Expr::str("Dog")],
            ))),
            say(yes_no(Expr::call(
                "defined",
                vec![Expr::method(Expr::str("Dog"), "can", vec![Expr::str("speak")])],
            ))),
        ]);
        assert_eq!(output(stmts), "yes\nno\nyes\n");
    }

    #[test]
    fn super_searches_parents_of_defining_package() {
        let mut stmts = animals();
        stmts.extend([
            Stmt::package("Puppy"),
            Stmt::set_isa(&["Dog"]),
            Stmt::sub(
                "speak",
                vec![
                    unpack_args(&["self"]),
                    Stmt::ret(Expr::binary(
                        BinaryOp::Concat,
                        Expr::str("small: "),
                        Expr::method(Expr::scalar("self"), "SUPER::speak", vec![]),
                    )),
                ],
            ),
            Stmt::package("main"),
            Stmt::my(
                "p",
                Expr::method(Expr::str("Puppy"), "new", vec![Expr::str("Bit")]),
            ),
            say(Expr::method(Expr::scalar("p"), "speak", vec![])),
        ]);
        assert_eq!(output(stmts), "small: Bit says woof\n");
    }

    #[test]
    fn isa_array_assignment_changes_resolution() {
        let out = output(vec![
            Stmt::package("Base"),
            Stmt::sub("hello", vec![Stmt::expr(Expr::str("from base"))]),
            Stmt::package("main"),
            Stmt::expr(Expr::assign(
                Expr::array("Child::ISA"),
                Expr::list(vec![Expr::str("Base")]),
            )),
            say(Expr::method(Expr::str("Child"), "hello", vec![])),
        ]);
        assert_eq!(out, "from base\n");
    }

    #[test]
    fn autoload_receives_requested_name() {
        let out = output(vec![
            Stmt::package("Robot"),
            Stmt::sub(
                "AUTOLOAD",
                vec![Stmt::ret(Expr::binary(
                    BinaryOp::Concat,
                    Expr::str("auto:"),
                    Expr::scalar("AUTOLOAD"),
                ))],
            ),
            Stmt::package("main"),
            say(Expr::method(Expr::str("Robot"), "dance", vec![])),
        ]);
        assert_eq!(out, "auto:Robot::dance\n");
    }

    #[test]
    fn missing_method_without_autoload_is_undef() {
        let out = output(vec![
            Stmt::my("r", Expr::method(Expr::str("Plain"), "meow", vec![])),
            say(yes_no(Expr::call("defined", vec![Expr::scalar("r")]))),
        ]);
        assert_eq!(out, "no\n");
    }

    #[test]
    fn missing_qualified_method_is_undef() {
        let out = output(vec![
            Stmt::my("r", Expr::method(Expr::str("Plain"), "Other::nope", vec![])),
            say(yes_no(Expr::call("defined", vec![Expr::scalar("r")]))),
            say(Expr::str("after")),
        ]);
        assert_eq!(out, "no\nafter\n");
    }

    #[test]
    fn qualified_method_falls_back_to_that_packages_autoload() {
        let out = output(vec![
            Stmt::package("Other"),
            Stmt::sub(
                "AUTOLOAD",
                vec![Stmt::ret(Expr::binary(
                    BinaryOp::Concat,
                    Expr::str("auto:"),
                    Expr::scalar("AUTOLOAD"),
                ))],
            ),
            Stmt::package("main"),
            say(Expr::method(Expr::str("Plain"), "Other::nope", vec![])),
        ]);
        assert_eq!(out, "auto:Other::nope\n");
    }

    #[test]
    fn method_on_unblessed_reference_is_fatal() {
        let outcome = run(vec![
            Stmt::my("r", Expr::AnonHash(vec![])),
            Stmt::expr(Expr::method(Expr::scalar("r"), "go", vec![])),
        ]);
        let err = outcome.result.unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::MethodOnUnblessed { .. }));
    }
}

mod containers {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sorted_keys() {
        let out = output(vec![
            Stmt::my_hash(
                "h",
                Expr::list(vec![
                    Expr::str("b"),
                    Expr::int(2),
                    Expr::str("a"),
                    Expr::int(1),
                    Expr::str("c"),
                    Expr::int(3),
                ]),
            ),
            say(join(
                ",",
                Expr::sort(None, Expr::call("keys", vec![Expr::hash("h")])),
            )),
        ]);
        assert_eq!(out, "a,b,c\n");
    }

    #[test]
    fn push_autovivifies_through_hash_entry() {
        let list = || Expr::deref(Sigil::Array, Expr::entry("data", Expr::str("list")));
        let out = output(vec![
            Stmt::declare(DeclScope::My, vec![(Sigil::Hash, "data")], false, None),
            Stmt::expr(Expr::call("push", vec![list(), Expr::int(1), Expr::int(2)])),
            say(Expr::call("scalar", vec![list()])),
        ]);
        assert_eq!(out, "2\n");
    }

    #[test]
    fn nested_store_vivifies_and_read_does_not() {
        let nested = |outer: &str| {
            Expr::arrow_key(
                Expr::arrow_key(Expr::scalar("r"), Expr::str(outer)),
                Expr::str("b"),
            )
        };
        let out = output(vec![
            Stmt::declare(DeclScope::My, vec![(Sigil::Scalar, "r")], false, None),
            Stmt::expr(Expr::assign(nested("a"), Expr::int(5))),
            say(nested("a")),
            Stmt::my("peek", nested("x")),
            say(yes_no(Expr::call(
                "exists",
                vec![Expr::arrow_key(Expr::scalar("r"), Expr::str("x"))],
            ))),
        ]);
        assert_eq!(out, "5\nno\n");
    }

    #[test]
    fn list_repetition_copies_the_items() {
        let out = output(vec![
            Stmt::my_array(
                "l",
                Expr::binary(BinaryOp::Repeat, ints(&[1, 2]), Expr::int(2)),
            ),
            say(join(",", Expr::array("l"))),
        ]);
        assert_eq!(out, "1,2,1,2\n");
    }

    #[test]
    fn scalar_deref_assignment_vivifies() {
        let target = || Expr::deref(Sigil::Scalar, Expr::scalar("r"));
        let out = output(vec![
            Stmt::declare(DeclScope::My, vec![(Sigil::Scalar, "r")], false, None),
            Stmt::expr(Expr::assign(target(), Expr::int(5))),
            say(target()),
            say(Expr::call("ref", vec![Expr::scalar("r")])),
        ]);
        assert_eq!(out, "5\nSCALAR\n");
    }

    #[test]
    fn empty_container_references_are_false() {
        let out = output(vec![
            Stmt::my("a", Expr::AnonArray(vec![])),
            Stmt::my("h", Expr::AnonHash(vec![])),
            say(yes_no(Expr::scalar("a"))),
            say(yes_no(Expr::scalar("h"))),
            Stmt::expr(Expr::call(
                "push",
                vec![Expr::deref(Sigil::Array, Expr::scalar("a")), Expr::int(0)],
            )),
            say(yes_no(Expr::scalar("a"))),
        ]);
        assert_eq!(out, "no\nno\nyes\n");
    }

    #[test]
    fn references_alias_their_target() {
        let out = output(vec![
            Stmt::my_array("a", ints(&[1, 2])),
            Stmt::my("r", Expr::reference(Expr::array("a"))),
            Stmt::expr(Expr::assign(
                Expr::arrow_index(Expr::scalar("r"), Expr::int(0)),
                Expr::int(9),
            )),
            say(join(",", Expr::array("a"))),
        ]);
        assert_eq!(out, "9,2\n");
    }

    #[test]
    fn pop_and_shift_return_removed_elements() {
        let out = output(vec![
            Stmt::my_array("a", ints(&[1, 2, 3])),
            Stmt::my("last", Expr::call("pop", vec![Expr::array("a")])),
            Stmt::my("first", Expr::call("shift", vec![Expr::array("a")])),
            say(Expr::interp(vec![
                part(Expr::scalar("first")),
                lit(" "),
                part(Expr::scalar("last")),
                lit(" "),
                part(Expr::array("a")),
            ])),
        ]);
        assert_eq!(out, "1 3 2\n");
    }

    #[test]
    fn sort_map_and_grep() {
        let out = output(vec![
            say(join(
                " ",
                Expr::sort(
                    Some(Block::of_expr(Expr::binary(
                        BinaryOp::NumCmp,
                        Expr::scalar("a"),
                        Expr::scalar("b"),
                    ))),
                    ints(&[10, 2, 33, 4]),
                ),
            )),
            say(join(" ", Expr::sort(None, ints(&[10, 2, 33, 4])))),
            say(join(
                " ",
                Expr::map(
                    Block::of_expr(Expr::binary(BinaryOp::Mul, Expr::topic(), Expr::int(2))),
                    ints(&[1, 2, 3]),
                ),
            )),
            say(join(
                " ",
                Expr::grep(
                    Block::of_expr(Expr::Match {
                        target: None,
                        pattern: Box::new(Expr::str("an")),
                        flags: String::new(),
                        negate: false,
                    }),
                    Expr::list(vec![
                        Expr::str("apple"),
                        Expr::str("banana"),
                        Expr::str("mango"),
                    ]),
                ),
            )),
        ]);
        assert_eq!(out, "2 4 10 33\n10 2 33 4\n2 4 6\nbanana mango\n");
    }

    #[test]
    fn grep_restores_topic() {
        let out = output(vec![
            Stmt::expr(Expr::assign(Expr::topic(), Expr::str("outer"))),
            Stmt::expr(Expr::grep(Block::of_expr(Expr::int(1)), ints(&[1, 2]))),
            say(Expr::topic()),
        ]);
        assert_eq!(out, "outer\n");
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labeled_next_skips_outer_iteration() {
        let inner = Stmt::foreach(
            Some("j"),
            Expr::range(Expr::int(1), Expr::int(3)),
            vec![
                Stmt::if_(
                    Expr::binary(BinaryOp::NumEq, Expr::scalar("j"), Expr::int(2)),
                    vec![Stmt::next(Some("OUTER"))],
                ),
                Stmt::expr(Expr::print(vec![Expr::interp(vec![
                    part(Expr::scalar("i")),
                    part(Expr::scalar("j")),
                    lit(" "),
                ])])),
            ],
        );
        let out = output(vec![Stmt::foreach(
            Some("i"),
            Expr::range(Expr::int(1), Expr::int(3)),
            vec![inner],
        )
        .labeled("OUTER")]);
        assert_eq!(out, "11 21 31 ");
    }

    #[test]
    fn last_leaves_while() {
        let i = || Expr::scalar("i");
        let out = output(vec![
            Stmt::my("i", Expr::int(0)),
            Stmt::while_(
                Expr::int(1),
                vec![
                    Stmt::expr(Expr::inc_dec(IncDec::PreInc, i())),
                    Stmt::if_(
                        Expr::binary(BinaryOp::NumGe, i(), Expr::int(5)),
                        vec![Stmt::last(None)],
                    ),
                ],
            ),
            say(i()),
        ]);
        assert_eq!(out, "5\n");
    }

    #[test]
    fn c_style_for_runs_step_after_next() {
        let i = || Expr::scalar("i");
        let out = output(vec![
            Stmt::my("sum", Expr::int(0)),
            Stmt::for_(
                Stmt::my("i", Expr::int(0)),
                Expr::binary(BinaryOp::NumLt, i(), Expr::int(10)),
                Expr::inc_dec(IncDec::PostInc, i()),
                vec![
                    Stmt::if_(
                        Expr::binary(
                            BinaryOp::NumEq,
                            Expr::binary(BinaryOp::Mod, i(), Expr::int(2)),
                            Expr::int(0),
                        ),
                        vec![Stmt::next(None)],
                    ),
                    Stmt::expr(Expr::op_assign(BinaryOp::Add, Expr::scalar("sum"), i())),
                ],
            ),
            say(Expr::scalar("sum")),
        ]);
        assert_eq!(out, "25\n");
    }

    #[test]
    fn until_and_unless() {
        let n = || Expr::scalar("n");
        let out = output(vec![
            Stmt::my("n", Expr::int(0)),
            Stmt::until(
                Expr::binary(BinaryOp::NumEq, n(), Expr::int(3)),
                vec![Stmt::expr(Expr::inc_dec(IncDec::PostInc, n()))],
            ),
            Stmt::unless(
                Expr::binary(BinaryOp::NumEq, n(), Expr::int(0)),
                vec![say(n())],
            ),
        ]);
        assert_eq!(out, "3\n");
    }

    #[test]
    fn last_outside_loop_is_fatal() {
        let outcome = run(vec![
            Stmt::sub("f", vec![Stmt::last(None)]),
            Stmt::foreach(None, ints(&[1]), vec![Stmt::expr(Expr::call("f", vec![]))]),
        ]);
        let err = outcome.result.unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::LoopControlOutsideLoop { keyword: "last" }
        );
    }

    #[test]
    fn unknown_label_is_fatal() {
        let outcome = run(vec![Stmt::foreach(
            None,
            ints(&[1, 2]),
            vec![Stmt::last(Some("NOPE"))],
        )]);
        let err = outcome.result.unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::LabelNotFound {
                keyword: "last",
                label: "NOPE".to_string()
            }
        );
    }

    #[test]
    fn foreach_restores_topic() {
        let out = output(vec![
            Stmt::expr(Expr::assign(Expr::topic(), Expr::str("kept"))),
            Stmt::foreach(None, ints(&[1, 2]), vec![Stmt::expr(Expr::print(vec![]))]),
            say(Expr::topic()),
        ]);
        assert_eq!(out, "12kept\n");
    }
}

mod regexes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn captures_after_successful_match() {
        let out = output(vec![
            Stmt::my("s", Expr::str("hello world")),
            Stmt::if_(
                Expr::matches(Expr::scalar("s"), r"(\w+) (\w+)", ""),
                vec![say(Expr::interp(vec![
                    part(Expr::capture(2)),
                    lit(" "),
                    part(Expr::capture(1)),
                ]))],
            ),
        ]);
        assert_eq!(out, "world hello\n");
    }

    #[test]
    fn failed_match_keeps_previous_captures() {
        let out = output(vec![
            Stmt::expr(Expr::matches(Expr::str("abc"), "(b)", "")),
            Stmt::expr(Expr::matches(Expr::str("xyz"), "(q)", "")),
            say(Expr::capture(1)),
        ]);
        assert_eq!(out, "b\n");
    }

    #[test]
    fn global_substitution_counts() {
        let out = output(vec![
            Stmt::my("t", Expr::str("a.b.c")),
            Stmt::my(
                "n",
                Expr::subst(Expr::scalar("t"), r"\.", Expr::str("-"), "g"),
            ),
            say(Expr::interp(vec![
                part(Expr::scalar("n")),
                lit(" "),
                part(Expr::scalar("t")),
            ])),
        ]);
        assert_eq!(out, "2 a-b-c\n");
    }

    #[test]
    fn replacement_sees_each_match() {
        let out = output(vec![
            Stmt::my("t", Expr::str("a1b2")),
            Stmt::expr(Expr::subst(
                Expr::scalar("t"),
                r"(\d)",
                Expr::interp(vec![lit("<"), part(Expr::capture(1)), lit(">")]),
                "g",
            )),
            say(Expr::scalar("t")),
        ]);
        assert_eq!(out, "a<1>b<2>\n");
    }

    #[test]
    fn fresh_variable_starts_global_match_at_the_beginning() {
        let out = output(vec![Stmt::foreach(
            None,
            ints(&[1, 2, 3]),
            vec![
                Stmt::my("s", Expr::str("abc")),
                Stmt::expr(Expr::print(vec![Expr::ternary(
                    Expr::matches(Expr::scalar("s"), "a", "g"),
                    Expr::str("T"),
                    Expr::str("F"),
                )])),
            ],
        )]);
        assert_eq!(out, "TTT");
    }

    #[test]
    fn assignment_resets_global_match_position() {
        let out = output(vec![
            Stmt::my("s", Expr::str("ab")),
            Stmt::expr(Expr::matches(Expr::scalar("s"), "b", "g")),
            Stmt::expr(Expr::assign(Expr::scalar("s"), Expr::str("ba"))),
            say(yes_no(Expr::matches(Expr::scalar("s"), "b", "g"))),
        ]);
        assert_eq!(out, "yes\n");
    }

    #[test]
    fn list_context_global_match_collects_groups() {
        let out = output(vec![
            Stmt::my_array("w", Expr::matches(Expr::str("x1 y2 z3"), r"(\d)", "g")),
            say(join(",", Expr::array("w"))),
        ]);
        assert_eq!(out, "1,2,3\n");
    }

    #[test]
    fn scalar_global_match_iterates() {
        let out = output(vec![
            Stmt::my("s", Expr::str("aXbXc")),
            Stmt::my("count", Expr::int(0)),
            Stmt::while_(
                Expr::matches(Expr::scalar("s"), "X", "g"),
                vec![Stmt::expr(Expr::inc_dec(IncDec::PostInc, Expr::scalar("count")))],
            ),
            say(Expr::scalar("count")),
        ]);
        assert_eq!(out, "2\n");
    }

    #[test]
    fn split_drops_trailing_empty_fields() {
        let out = output(vec![say(join(
            "|",
            Expr::call("split", vec![Expr::str(","), Expr::str("a,b,,c,,")]),
        ))]);
        assert_eq!(out, "a|b||c\n");
    }

    #[test]
    fn invalid_pattern_does_not_match() {
        let out = output(vec![say(yes_no(Expr::matches(Expr::str("abc"), "(", "")))]);
        assert_eq!(out, "no\n");
    }
}

mod files {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_then_read_back() {
        let path = temp_path("roundtrip.txt");
        let line = || Expr::scalar("line");
        let out = output(vec![
            Stmt::my("path", Expr::str(&path)),
            Stmt::expr(Expr::call(
                "open",
                vec![Expr::my("fh"), Expr::str(">"), Expr::scalar("path")],
            )),
            Stmt::expr(Expr::print_to(
                FileRef::Expr(Box::new(Expr::scalar("fh"))),
                vec![Expr::str("one\ntwo\n")],
            )),
            Stmt::expr(Expr::call("close", vec![Expr::scalar("fh")])),
            Stmt::expr(Expr::call(
                "open",
                vec![
                    Expr::FileHandle("IN".to_string()),
                    Expr::str("<"),
                    Expr::scalar("path"),
                ],
            )),
            Stmt::while_(
                Expr::assign(Expr::my("line"), Expr::ReadLine(FileRef::Named("IN".to_string()))),
                vec![
                    Stmt::expr(Expr::call("chomp", vec![line()])),
                    say(Expr::interp(vec![lit("["), part(line()), lit("]")])),
                ],
            ),
            Stmt::expr(Expr::call("close", vec![Expr::FileHandle("IN".to_string())])),
        ]);
        let _ = std::fs::remove_file(&path);
        assert_eq!(out, "[one]\n[two]\n");
    }

    #[test]
    fn lexical_handles_close_when_their_variable_goes_away() {
        let base = temp_path("loop_");
        let open_for = |name: Expr| {
            Stmt::expr(Expr::call(
                "open",
                vec![
                    Expr::my("fh"),
                    Expr::str(">"),
                    Expr::binary(BinaryOp::Concat, Expr::str(&base), name),
                ],
            ))
        };
        let out = output(vec![
            Stmt::foreach(
                None,
                Expr::list(vec![Expr::str("a"), Expr::str("b")]),
                vec![
                    open_for(Expr::topic()),
                    Stmt::expr(Expr::print_to(
                        FileRef::Expr(Box::new(Expr::scalar("fh"))),
                        vec![Expr::topic()],
                    )),
                ],
            ),
            Stmt::expr(Expr::call(
                "open",
                vec![
                    Expr::FileHandle("IN".to_string()),
                    Expr::str("<"),
                    Expr::str(&format!("{base}b")),
                ],
            )),
            say(Expr::ReadLine(FileRef::Named("IN".to_string()))),
        ]);
        let _ = std::fs::remove_file(format!("{base}a"));
        let _ = std::fs::remove_file(format!("{base}b"));
        assert_eq!(out, "b\n");
    }

    #[test]
    fn returned_lexical_handle_stays_open() {
        let path = temp_path("returned.txt");
        std::fs::write(&path, "kept\n").unwrap();
        let out = output(vec![
            Stmt::sub(
                "opener",
                vec![
                    Stmt::expr(Expr::call(
                        "open",
                        vec![Expr::my("fh"), Expr::str("<"), Expr::str(&path)],
                    )),
                    Stmt::ret(Expr::scalar("fh")),
                ],
            ),
            Stmt::my("in", Expr::call("opener", vec![])),
            Stmt::expr(Expr::call(
                "open",
                vec![
                    Expr::FileHandle("OTHER".to_string()),
                    Expr::str("<"),
                    Expr::str(&path),
                ],
            )),
            Stmt::expr(Expr::print(vec![Expr::ReadLine(FileRef::Expr(Box::new(
                Expr::scalar("in"),
            )))])),
        ]);
        let _ = std::fs::remove_file(&path);
        assert_eq!(out, "kept\n");
    }

    #[test]
    fn failed_open_sets_os_error() {
        let out = output(vec![Stmt::unless(
            Expr::call(
                "open",
                vec![
                    Expr::FileHandle("FH".to_string()),
                    Expr::str("<"),
                    Expr::str("/definitely/not/here.txt"),
                ],
            ),
            vec![say(Expr::Special(Special::OsError))],
        )]);
        assert!(out.len() > 1, "expected an error message, got {out:?}");
    }

    #[test]
    fn preloaded_stdin() {
        let builder = Interpreter::builder().file_table(FileTable::new().with_input("STDIN", "a\nb\n"));
        let outcome = run_with(
            builder,
            vec![
                Stmt::my_array("lines", Expr::ReadLine(FileRef::Named("STDIN".to_string()))),
                say(Expr::call("scalar", vec![Expr::array("lines")])),
                Stmt::expr(Expr::print(vec![Expr::elem("lines", Expr::int(1))])),
            ],
        );
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.out, "2\nb\n");
    }
}

mod termination {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn die_reports_location_and_stops() {
        let outcome = run(vec![
            say(Expr::str("before")),
            Stmt::expr(Expr::call("die", vec![Expr::str("boom")])).at(7),
            say(Expr::str("after")),
        ]);
        let err = outcome.result.unwrap_err();
        assert_eq!(err.exit_code(), 255);
        assert_eq!(outcome.out, "before\n");
        assert_eq!(outcome.err, "boom at t.pl line 7.\n");
    }

    #[test]
    fn die_with_newline_has_no_location() {
        let outcome = run(vec![
            Stmt::expr(Expr::call("die", vec![Expr::str("plain\n")])).at(2)
        ]);
        assert!(outcome.result.is_err());
        assert_eq!(outcome.err, "plain\n");
    }

    #[test]
    fn exit_carries_code_without_message() {
        let outcome = run(vec![
            Stmt::expr(Expr::print(vec![Expr::str("a")])),
            Stmt::expr(Expr::call("exit", vec![Expr::int(3)])),
            Stmt::expr(Expr::print(vec![Expr::str("b")])),
        ]);
        let err = outcome.result.unwrap_err();
        assert!(err.is_exit());
        assert_eq!(err.exit_code(), 3);
        assert_eq!(outcome.out, "a");
        assert_eq!(outcome.err, "");
    }

    #[test]
    fn warn_continues() {
        let outcome = run(vec![
            Stmt::expr(Expr::call("warn", vec![Expr::str("careful\n")])),
            say(Expr::str("still here")),
        ]);
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.err, "careful\n");
        assert_eq!(outcome.out, "still here\n");
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let outcome = run(vec![Stmt::my(
            "x",
            Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0)),
        )
        .at(2)]);
        let err = outcome.result.unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        assert_eq!(outcome.err, "Illegal division by zero at t.pl line 2.\n");
    }
}

/// `my @l = (items); my $yes = grep { $_ % m == 0 } @l;
/// my $no = grep { !($_ % m == 0) } @l; $yes + $no`
fn grep_partition_program(items: &[i64], modulus: i64) -> Program {
    let predicate = || {
        Expr::binary(
            BinaryOp::NumEq,
            Expr::binary(BinaryOp::Mod, Expr::topic(), Expr::int(modulus)),
            Expr::int(0),
        )
    };
    Program::new(vec![
        Stmt::my_array("l", ints(items)),
        Stmt::my("yes", Expr::grep(Block::of_expr(predicate()), Expr::array("l"))),
        Stmt::my(
            "no",
            Expr::grep(Block::of_expr(Expr::not(predicate())), Expr::array("l")),
        ),
        Stmt::expr(Expr::binary(
            BinaryOp::Add,
            Expr::scalar("yes"),
            Expr::scalar("no"),
        )),
    ])
}

proptest! {
    #[test]
    fn grep_and_its_negation_partition_the_list(
        items in prop::collection::vec(-1000i64..1000, 0..40),
        modulus in 1i64..7,
    ) {
        let mut interp = Interpreter::builder()
            .print_handler(silent_handler())
            .import_env(false)
            .build();
        let total = interp.run(&grep_partition_program(&items, modulus)).unwrap();
        prop_assert_eq!(total, Value::Int(items.len() as i64));
    }
}

//! Lowering tests for the core visitor: operators, control flow, scope
//! declaredness, comprehensions, interpolated strings, and the fail-closed
//! paths for constructs outside the grammar.

#[cfg(test)]
mod tests {
    use crate::ast::{
        AssignTarget, BindTarget, ComprehensionKind, FStringPart, Generator, PyBinOp, PyCmpOp,
        PyExpr, PyLiteral, PyStmt, PyUnaryOp,
    };
    use crate::emit::{print_expr, print_stmts};
    use crate::error::{
        CompileResult, ERR_CALL_KEYWORDS, ERR_SCOPE_UNRESOLVED, ERR_UNSUPPORTED,
    };
    use crate::js_ast::JsExpr;
    use crate::scope::ReferenceTable;
    use crate::visitor::Lowerer;

    fn name(n: &str) -> PyExpr {
        PyExpr::Name(n.to_string())
    }

    fn int(i: i64) -> PyExpr {
        PyExpr::Literal(PyLiteral::Int(i))
    }

    fn text(s: &str) -> PyExpr {
        PyExpr::Literal(PyLiteral::Str(s.to_string()))
    }

    fn bin(left: PyExpr, op: PyBinOp, right: PyExpr) -> PyExpr {
        PyExpr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn cmp(left: PyExpr, op: PyCmpOp, right: PyExpr) -> PyExpr {
        PyExpr::Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        }
    }

    fn try_lower(params: &[&str], expr: &PyExpr) -> CompileResult<JsExpr> {
        let refs = ReferenceTable::new();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let mut lowerer = Lowerer::new(&refs, &params);
        lowerer.expr(expr)
    }

    fn lower(params: &[&str], expr: &PyExpr) -> String {
        print_expr(&try_lower(params, expr).unwrap())
    }

    fn lower_body(params: &[&str], body: &[PyStmt]) -> String {
        let refs = ReferenceTable::new();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let mut lowerer = Lowerer::new(&refs, &params);
        print_stmts(&lowerer.lower_body(body).unwrap())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn none_lowers_to_undefined() {
        let e = cmp(name("x"), PyCmpOp::Is, PyExpr::Literal(PyLiteral::None));
        assert_eq!(lower(&["x"], &e), "x === undefined");
    }

    #[test]
    fn equality_is_strict() {
        let e = cmp(name("a"), PyCmpOp::Eq, name("b"));
        assert_eq!(lower(&["a", "b"], &e), "a === b");
        let e = cmp(name("a"), PyCmpOp::NotEq, name("b"));
        assert_eq!(lower(&["a", "b"], &e), "a !== b");
    }

    #[test]
    fn floor_division_uses_math_floor() {
        let e = bin(name("a"), PyBinOp::FloorDiv, name("b"));
        assert_eq!(lower(&["a", "b"], &e), "Math.floor(a / b)");
    }

    #[test]
    fn modulo_corrects_the_sign() {
        let e = bin(name("a"), PyBinOp::Mod, name("b"));
        assert_eq!(
            lower(&["a", "b"], &e),
            "(($a, $b) => ($a % $b + $b) % $b)(a, b)"
        );
    }

    #[test]
    fn power_is_native() {
        let e = bin(name("a"), PyBinOp::Pow, int(2));
        assert_eq!(lower(&["a"], &e), "a ** 2");
    }

    #[test]
    fn chained_comparison_evaluates_middle_operand_once() {
        let e = PyExpr::Compare {
            left: Box::new(int(0)),
            ops: vec![PyCmpOp::LtE, PyCmpOp::Lt],
            comparators: vec![name("x"), name("n")],
        };
        assert_eq!(
            lower(&["x", "n"], &e),
            "(($m1) => 0 <= $m1 && $m1 < n)(x)"
        );
    }

    #[test]
    fn membership_branches_on_representation() {
        let e = cmp(text("k"), PyCmpOp::In, name("d"));
        let js = lower(&["d"], &e);
        assert!(js.contains("$c.has($x)"));
        assert!(js.contains("$c.includes($x)"));
        assert!(js.ends_with("(d, \"k\")"));
    }

    #[test]
    fn not_applies_collection_truthiness() {
        let e = PyExpr::UnaryOp {
            op: PyUnaryOp::Not,
            operand: Box::new(name("xs")),
        };
        let js = lower(&["xs"], &e);
        assert!(js.starts_with("!(($v) =>"));
        assert!(js.contains(".size > 0"));
    }

    #[test]
    fn conditional_expression_with_boolean_test_stays_plain() {
        let e = PyExpr::IfExp {
            test: Box::new(cmp(name("x"), PyCmpOp::Gt, int(0))),
            body: Box::new(name("x")),
            orelse: Box::new(int(0)),
        };
        assert_eq!(lower(&["x"], &e), "x > 0 ? x : 0");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Collections, comprehensions, slices
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn dict_literal_is_a_map_construction() {
        let e = PyExpr::Dict {
            keys: vec![text("a")],
            values: vec![int(1)],
        };
        assert_eq!(lower(&[], &e), "new Map([[\"a\", 1]])");
    }

    #[test]
    fn comprehension_compiles_to_a_filter_map_chain() {
        // [x * 2 for x in range(5) if x != 2]
        let e = PyExpr::Comprehension {
            kind: ComprehensionKind::List,
            element: Box::new(bin(name("x"), PyBinOp::Mul, int(2))),
            value: None,
            generators: vec![Generator {
                target: BindTarget::Name("x".to_string()),
                iter: PyExpr::Call {
                    func: Box::new(name("range")),
                    args: vec![int(5)],
                    kwargs: vec![],
                },
                ifs: vec![cmp(name("x"), PyCmpOp::NotEq, int(2))],
            }],
        };
        assert_eq!(
            lower(&[], &e),
            "Array.from({ length: 5 }, ($_, $i) => $i).filter((x) => x !== 2).map((x) => x * 2)"
        );
    }

    #[test]
    fn dict_comprehension_projects_entry_pairs() {
        // {k: 1 for k in keys}
        let e = PyExpr::Comprehension {
            kind: ComprehensionKind::Dict,
            element: Box::new(name("k")),
            value: Some(Box::new(int(1))),
            generators: vec![Generator {
                target: BindTarget::Name("k".to_string()),
                iter: name("keys"),
                ifs: vec![],
            }],
        };
        let js = lower(&["keys"], &e);
        assert!(js.starts_with("new Map("));
        assert!(js.contains(".map((k) => [k, 1])"));
    }

    #[test]
    fn comprehension_bindings_do_not_leak() {
        let comp = PyStmt::Expr(PyExpr::Comprehension {
            kind: ComprehensionKind::List,
            element: Box::new(name("x")),
            value: None,
            generators: vec![Generator {
                target: BindTarget::Name("x".to_string()),
                iter: name("xs"),
                ifs: vec![],
            }],
        });
        let refs = ReferenceTable::new();
        let params = vec!["xs".to_string()];
        let mut lowerer = Lowerer::new(&refs, &params);
        lowerer.lower_body(&[comp]).unwrap();
        // After the comprehension, `x` is unresolved again.
        assert!(lowerer.expr(&name("x")).is_err());
    }

    #[test]
    fn stepless_slices_map_onto_native_slice() {
        let tail = PyExpr::Slice {
            value: Box::new(name("xs")),
            lower: Some(Box::new(int(1))),
            upper: None,
            step: None,
        };
        assert_eq!(lower(&["xs"], &tail), "xs.slice(1)");
        let head = PyExpr::Slice {
            value: Box::new(name("xs")),
            lower: None,
            upper: Some(Box::new(int(2))),
            step: None,
        };
        assert_eq!(lower(&["xs"], &head), "xs.slice(0, 2)");
    }

    #[test]
    fn bare_negative_step_reverses() {
        let e = PyExpr::Slice {
            value: Box::new(name("xs")),
            lower: None,
            upper: None,
            step: Some(Box::new(PyExpr::UnaryOp {
                op: PyUnaryOp::Neg,
                operand: Box::new(int(1)),
            })),
        };
        let js = lower(&["xs"], &e);
        assert!(js.contains(".reverse()"));
        assert!(js.contains(".join(\"\")"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Interpolated strings
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn fstring_builds_a_template_literal() {
        let e = PyExpr::FString(vec![
            FStringPart::Literal("Total: ".to_string()),
            FStringPart::Field {
                value: name("x"),
                conversion: None,
                spec: Some(".2f".to_string()),
            },
        ]);
        assert_eq!(lower(&["x"], &e), "`Total: ${x.toFixed(2)}`");
    }

    #[test]
    fn lone_formatted_field_skips_the_template() {
        let e = PyExpr::FString(vec![FStringPart::Field {
            value: name("x"),
            conversion: None,
            spec: Some(".2f".to_string()),
        }]);
        assert_eq!(lower(&["x"], &e), "x.toFixed(2)");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Statements and scope
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn first_assignment_declares_later_ones_do_not() {
        let body = vec![
            PyStmt::Assign {
                target: AssignTarget::Name("x".to_string()),
                value: int(1),
            },
            PyStmt::Assign {
                target: AssignTarget::Name("x".to_string()),
                value: int(2),
            },
        ];
        assert_eq!(lower_body(&[], &body), "let x = 1;\nx = 2;\n");
    }

    #[test]
    fn fresh_tuple_unpack_destructures() {
        let body = vec![PyStmt::Assign {
            target: AssignTarget::Tuple(vec!["a".to_string(), "b".to_string()]),
            value: name("pair"),
        }];
        assert_eq!(lower_body(&["pair"], &body), "let [a, b] = pair;\n");
    }

    #[test]
    fn loop_targets_survive_the_loop() {
        let body = vec![PyStmt::For {
            target: BindTarget::Name("i".to_string()),
            iter: name("items"),
            body: vec![PyStmt::AugAssign {
                target: AssignTarget::Name("total".to_string()),
                op: PyBinOp::Add,
                value: name("i"),
            }],
        }];
        let body = [
            &[PyStmt::Assign {
                target: AssignTarget::Name("total".to_string()),
                value: int(0),
            }][..],
            &body[..],
        ]
        .concat();
        let js = lower_body(&["items"], &body);
        assert!(js.contains("let total = 0;"));
        assert!(js.contains("let i;"));
        assert!(js.contains("for (i of "));
        assert!(js.contains("total += i;"));
    }

    #[test]
    fn augmented_modulo_desugars() {
        let body = vec![
            PyStmt::Assign {
                target: AssignTarget::Name("x".to_string()),
                value: int(7),
            },
            PyStmt::AugAssign {
                target: AssignTarget::Name("x".to_string()),
                op: PyBinOp::Mod,
                value: int(3),
            },
        ];
        let js = lower_body(&[], &body);
        assert!(js.contains("x = (($a, $b) => ($a % $b + $b) % $b)(x, 3);"));
    }

    #[test]
    fn reserved_words_are_mangled() {
        let body = vec![PyStmt::Assign {
            target: AssignTarget::Name("new".to_string()),
            value: int(1),
        }];
        assert_eq!(lower_body(&[], &body), "let new$ = 1;\n");
    }

    #[test]
    fn docstrings_vanish() {
        let body = vec![
            PyStmt::Expr(text("compares two rows")),
            PyStmt::Return(Some(int(0))),
        ];
        assert_eq!(lower_body(&[], &body), "return 0;\n");
    }

    #[test]
    fn else_if_chains_flatten() {
        let body = vec![PyStmt::If {
            test: cmp(name("x"), PyCmpOp::Lt, int(0)),
            body: vec![PyStmt::Return(Some(int(-1)))],
            orelse: vec![PyStmt::If {
                test: cmp(name("x"), PyCmpOp::Gt, int(0)),
                body: vec![PyStmt::Return(Some(int(1)))],
                orelse: vec![PyStmt::Return(Some(int(0)))],
            }],
        }];
        let js = lower_body(&["x"], &body);
        assert!(js.contains("} else if (x > 0) {"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Fail-closed paths
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn unresolved_names_never_emit() {
        let err = try_lower(&[], &name("missing")).unwrap_err();
        assert_eq!(err.code, ERR_SCOPE_UNRESOLVED);
        assert_eq!(err.construct.as_deref(), Some("missing"));
    }

    #[test]
    fn unsupported_constructs_fail_closed() {
        let err = try_lower(&[], &PyExpr::Unsupported("await expression".to_string()))
            .unwrap_err();
        assert_eq!(err.code, ERR_UNSUPPORTED);
        assert!(err.message.contains("await expression"));
    }

    #[test]
    fn keywords_on_opaque_calls_are_rejected() {
        let e = PyExpr::Call {
            func: Box::new(name("f")),
            args: vec![int(1)],
            kwargs: vec![("k".to_string(), int(2))],
        };
        let err = try_lower(&["f"], &e).unwrap_err();
        assert_eq!(err.code, ERR_CALL_KEYWORDS);
    }

    #[test]
    fn builtins_resolve_only_in_call_position() {
        // `len` as a bare value is an unresolved name.
        let err = try_lower(&[], &name("len")).unwrap_err();
        assert_eq!(err.code, ERR_SCOPE_UNRESOLVED);
        // In call position it lowers.
        let e = PyExpr::Call {
            func: Box::new(name("len")),
            args: vec![name("xs")],
            kwargs: vec![],
        };
        let js = lower(&["xs"], &e);
        assert!(js.contains(".size"));
        assert!(js.contains(".length"));
    }

    #[test]
    fn lambda_lowers_to_an_arrow() {
        let e = PyExpr::Lambda {
            params: vec!["v".to_string()],
            body: Box::new(bin(name("v"), PyBinOp::Add, int(1))),
        };
        assert_eq!(lower(&[], &e), "(v) => v + 1");
    }
}

//! Printer tests: precedence, parenthesization, escaping, and statement
//! layout. These touch no shared state and run in parallel.

#[cfg(test)]
mod tests {
    use crate::emit::{print_expr, print_stmts};
    use crate::js_ast::*;

    fn float(value: f64) -> JsExpr {
        JsExpr::Float(value)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Precedence and parens
    // ───────────────────────────────────────────────────────────────────────────

    #[test]
    fn looser_subexpressions_take_parens() {
        let expr = binop(
            JsBinOp::Mul,
            binop(JsBinOp::Add, ident("a"), ident("b")),
            ident("c"),
        );
        assert_eq!(print_expr(&expr), "(a + b) * c");
    }

    #[test]
    fn equal_precedence_right_operands_take_parens() {
        let expr = binop(
            JsBinOp::Sub,
            ident("a"),
            binop(JsBinOp::Sub, ident("b"), ident("c")),
        );
        assert_eq!(print_expr(&expr), "a - (b - c)");
    }

    #[test]
    fn pow_parenthesizes_a_unary_base_but_not_a_unary_exponent() {
        let base = binop(
            JsBinOp::Pow,
            unop(JsUnaryOp::Neg, ident("x")),
            int(2),
        );
        assert_eq!(print_expr(&base), "(-x) ** 2");
        let exponent = binop(JsBinOp::Pow, int(10), unop(JsUnaryOp::Neg, ident("n")));
        assert_eq!(print_expr(&exponent), "10 ** -n");
    }

    #[test]
    fn pow_is_right_associative() {
        let expr = binop(
            JsBinOp::Pow,
            int(2),
            binop(JsBinOp::Pow, int(3), int(2)),
        );
        assert_eq!(print_expr(&expr), "2 ** 3 ** 2");
    }

    #[test]
    fn nested_unary_never_fuses_into_decrement() {
        let expr = unop(JsUnaryOp::Neg, unop(JsUnaryOp::Neg, ident("x")));
        assert_eq!(print_expr(&expr), "-(-x)");
    }

    #[test]
    fn word_unary_operators_take_a_space() {
        let expr = typeof_is(ident("v"), "string");
        assert_eq!(print_expr(&expr), "typeof v === \"string\"");
    }

    #[test]
    fn numeric_literal_receivers_take_parens() {
        let expr = method_call(float(3.14159), "toFixed", vec![int(2)]);
        assert_eq!(print_expr(&expr), "(3.14159).toFixed(2)");
        let int_recv = method_call(int(255), "toString", vec![int(16)]);
        assert_eq!(print_expr(&int_recv), "(255).toString(16)");
    }

    #[test]
    fn ternary_tests_nest_with_parens() {
        let expr = ternary(
            ternary(ident("a"), ident("b"), ident("c")),
            int(1),
            int(2),
        );
        assert_eq!(print_expr(&expr), "(a ? b : c) ? 1 : 2");
    }

    #[test]
    fn called_arrows_take_parens() {
        let expr = iife(&["$v"], binop(JsBinOp::Add, ident("$v"), int(1)), vec![ident("x")]);
        assert_eq!(print_expr(&expr), "(($v) => $v + 1)(x)");
    }

    #[test]
    fn arrow_object_bodies_take_parens() {
        let expr = arrow(&["k"], JsExpr::Object(vec![("k".to_string(), ident("k"))]));
        assert_eq!(print_expr(&expr), "(k) => ({ k: k })");
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Literals and escaping
    // ───────────────────────────────────────────────────────────────────────────

    #[test]
    fn integer_valued_floats_print_without_a_fraction() {
        assert_eq!(print_expr(&float(2.0)), "2");
        assert_eq!(print_expr(&float(-7.0)), "-7");
        assert_eq!(print_expr(&float(0.5)), "0.5");
    }

    #[test]
    fn non_finite_floats_print_as_global_names() {
        assert_eq!(print_expr(&float(f64::NAN)), "NaN");
        assert_eq!(print_expr(&float(f64::INFINITY)), "Infinity");
        assert_eq!(print_expr(&float(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn strings_escape_quotes_and_control_characters() {
        assert_eq!(print_expr(&str_lit("a\"b\\c")), "\"a\\\"b\\\\c\"");
        assert_eq!(print_expr(&str_lit("line\nbreak\t")), "\"line\\nbreak\\t\"");
        assert_eq!(print_expr(&str_lit("\u{1}")), "\"\\u0001\"");
    }

    #[test]
    fn templates_escape_backticks_and_interpolation_starts() {
        let expr = JsExpr::Template {
            parts: vec!["a`b${c".to_string(), "".to_string()],
            exprs: vec![ident("x")],
        };
        assert_eq!(print_expr(&expr), "`a\\`b\\${c${x}`");
    }

    #[test]
    fn non_identifier_object_keys_quote() {
        let expr = JsExpr::Object(vec![
            ("plain".to_string(), int(1)),
            ("has space".to_string(), int(2)),
        ]);
        assert_eq!(print_expr(&expr), "{ plain: 1, \"has space\": 2 }");
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Statements
    // ───────────────────────────────────────────────────────────────────────────

    #[test]
    fn statement_position_functions_and_objects_take_parens() {
        let func = JsStmt::Expr(JsExpr::Function {
            name: Some("f".to_string()),
            params: vec!["x".to_string()],
            body: vec![JsStmt::Return(Some(ident("x")))],
        });
        assert_eq!(print_stmts(&[func]), "(function f(x) {\n  return x;\n});\n");
        let object = JsStmt::Expr(JsExpr::Object(vec![("f".to_string(), ident("f"))]));
        assert_eq!(print_stmts(&[object]), "({ f: f });\n");
    }

    #[test]
    fn else_if_chains_flatten() {
        let stmt = JsStmt::If {
            test: ident("a"),
            cons: vec![JsStmt::Return(Some(int(1)))],
            alt: Some(vec![JsStmt::If {
                test: ident("b"),
                cons: vec![JsStmt::Return(Some(int(2)))],
                alt: Some(vec![JsStmt::Return(Some(int(3)))]),
            }]),
        };
        assert_eq!(
            print_stmts(&[stmt]),
            "if (a) {\n  return 1;\n} else if (b) {\n  return 2;\n} else {\n  return 3;\n}\n"
        );
    }

    #[test]
    fn nested_blocks_indent_two_spaces() {
        let stmt = JsStmt::While {
            test: ident("go"),
            body: vec![JsStmt::If {
                test: ident("done"),
                cons: vec![JsStmt::Break],
                alt: None,
            }],
        };
        assert_eq!(
            print_stmts(&[stmt]),
            "while (go) {\n  if (done) {\n    break;\n  }\n}\n"
        );
    }

    #[test]
    fn for_of_prints_with_and_without_a_declaration() {
        let declared = JsStmt::ForOf {
            decl: Some("const"),
            target: ident("item"),
            iter: ident("items"),
            body: vec![],
        };
        assert_eq!(print_stmts(&[declared]), "for (const item of items) {}\n");
        let bare = JsStmt::ForOf {
            decl: None,
            target: ident("i"),
            iter: ident("xs"),
            body: vec![JsStmt::Continue],
        };
        assert_eq!(print_stmts(&[bare]), "for (i of xs) {\n  continue;\n}\n");
    }

    #[test]
    fn compound_assignment_statements_print_the_operator() {
        let stmt = JsStmt::Assign {
            target: ident("total"),
            op: Some(JsBinOp::Add),
            value: ident("x"),
        };
        assert_eq!(print_stmts(&[stmt]), "total += x;\n");
    }

    #[test]
    fn throw_statements_print_their_expression() {
        let stmt = JsStmt::Throw(new_expr("Error", vec![str_lit("KeyError: missing")]));
        assert_eq!(
            print_stmts(&[stmt]),
            "throw new Error(\"KeyError: missing\");\n"
        );
    }

    #[test]
    fn spread_and_comma_sequences_print() {
        let expr = JsExpr::Array(vec![spread(ident("xs")), int(1)]);
        assert_eq!(print_expr(&expr), "[...xs, 1]");
        let seq = comma(vec![
            assign_expr(ident("$v"), int(1)),
            ident("$v"),
        ]);
        assert_eq!(print_expr(&seq), "$v = 1, $v");
    }
}

//! Dispatch tests: the closed builtin and method tables, their exact
//! rewrites, the runtime branches for representation-ambiguous receivers, and
//! the arity/keyword failure paths.

#[cfg(test)]
mod tests {
    use crate::ast::{PyExpr, PyLiteral};
    use crate::emit::print_expr;
    use crate::error::{
        CompileResult, ERR_CALL_ARITY, ERR_FORMAT_SPEC, ERR_SCOPE_UNRESOLVED, ERR_UNSUPPORTED,
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

    fn method(object: PyExpr, method: &str, args: Vec<PyExpr>) -> PyExpr {
        PyExpr::Call {
            func: Box::new(PyExpr::Attribute {
                value: Box::new(object),
                attr: method.to_string(),
            }),
            args,
            kwargs: vec![],
        }
    }

    fn builtin(func: &str, args: Vec<PyExpr>) -> PyExpr {
        PyExpr::Call {
            func: Box::new(name(func)),
            args,
            kwargs: vec![],
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

    // ═══════════════════════════════════════════════════════════════════════════
    // Exact rewrites
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn string_methods_rewrite_directly() {
        assert_eq!(lower(&["s"], &method(name("s"), "upper", vec![])), "s.toUpperCase()");
        assert_eq!(lower(&["s"], &method(name("s"), "strip", vec![])), "s.trim()");
        assert_eq!(
            lower(&["s"], &method(name("s"), "startswith", vec![text("a")])),
            "s.startsWith(\"a\")"
        );
    }

    #[test]
    fn replace_covers_every_occurrence() {
        let e = method(name("s"), "replace", vec![text("a"), text("b")]);
        assert_eq!(lower(&["s"], &e), "s.split(\"a\").join(\"b\")");
    }

    #[test]
    fn join_swaps_receiver_and_argument() {
        let e = method(text(", "), "join", vec![name("xs")]);
        let js = lower(&["xs"], &e);
        assert!(js.ends_with(".join(\", \")"));
        assert!(js.contains("instanceof Map"));
    }

    #[test]
    fn append_is_push() {
        let e = method(name("xs"), "append", vec![int(1)]);
        assert_eq!(lower(&["xs"], &e), "xs.push(1)");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Representation-ambiguous receivers
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn keyed_pop_branches_and_checks_existence() {
        let e = method(name("d"), "pop", vec![text("k")]);
        let js = lower(&["d"], &e);
        assert!(js.contains("instanceof Map"));
        assert!(js.contains("$o.has($k)"));
        assert!(js.contains("KeyError"));
        assert!(js.contains(".splice("));
    }

    #[test]
    fn keyed_pop_with_default_never_throws() {
        let e = method(name("d"), "pop", vec![text("k"), int(0)]);
        let js = lower(&["d"], &e);
        assert!(js.contains("$d"));
        assert!(!js.contains("KeyError"));
    }

    #[test]
    fn clear_branches_on_representation() {
        let e = method(name("xs"), "clear", vec![]);
        let js = lower(&["xs"], &e);
        assert!(js.contains("$o.length = 0"));
        assert!(js.contains("$o.clear()"));
    }

    #[test]
    fn setdefault_does_not_overwrite() {
        let e = method(name("d"), "setdefault", vec![text("k"), int(1)]);
        let js = lower(&["d"], &e);
        assert!(js.contains(".has("));
        assert!(js.contains(".set("));
    }

    #[test]
    fn subscript_normalizes_negative_indices() {
        let e = PyExpr::Subscript {
            value: Box::new(name("xs")),
            index: Box::new(int(-1)),
        };
        let js = lower(&["xs"], &e);
        assert!(js.contains("$o.get($k)"));
        assert!(js.contains("$o.length + $k"));
    }

    #[test]
    fn unknown_methods_fall_through_to_plain_calls() {
        let e = method(name("obj"), "custom", vec![int(1)]);
        assert_eq!(lower(&["obj"], &e), "obj.custom(1)");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Builtins
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn range_with_bounds_shifts_the_index() {
        let e = builtin("range", vec![int(2), name("n")]);
        assert_eq!(
            lower(&["n"], &e),
            "(($s, $e) => Array.from({ length: Math.max(0, $e - $s) }, ($_, $i) => $s + $i))(2, n)"
        );
    }

    #[test]
    fn round_with_literal_negative_digits_divides_first() {
        let e = builtin("round", vec![name("x"), int(-2)]);
        assert_eq!(lower(&["x"], &e), "Math.round(x / 10 ** 2) * 10 ** 2");
    }

    #[test]
    fn round_with_unknown_digits_decides_at_runtime() {
        let e = builtin("round", vec![name("x"), name("n")]);
        let js = lower(&["x", "n"], &e);
        assert!(js.contains("$n < 0 ?"));
        assert!(js.contains("10 ** -$n"));
    }

    #[test]
    fn sum_reduces_with_a_start_value() {
        let e = builtin("sum", vec![name("xs")]);
        let js = lower(&["xs"], &e);
        assert!(js.ends_with(".reduce(($a, $b) => $a + $b, 0)"));
    }

    #[test]
    fn sorted_copies_before_sorting() {
        let e = builtin("sorted", vec![name("xs")]);
        let js = lower(&["xs"], &e);
        assert!(js.starts_with("[..."));
        assert!(js.contains(".sort(($a, $b) =>"));
    }

    #[test]
    fn sorted_reverse_must_be_literal() {
        let e = PyExpr::Call {
            func: Box::new(name("sorted")),
            args: vec![name("xs")],
            kwargs: vec![("reverse".to_string(), name("flag"))],
        };
        let err = try_lower(&["xs", "flag"], &e).unwrap_err();
        assert_eq!(err.code, ERR_CALL_ARITY);
    }

    #[test]
    fn zip_truncates_to_the_shortest() {
        let e = builtin("zip", vec![name("a"), name("b")]);
        let js = lower(&["a", "b"], &e);
        assert!(js.contains("...$as"));
        assert!(js.contains("Math.min("));
    }

    #[test]
    fn enumerate_honors_start() {
        let e = PyExpr::Call {
            func: Box::new(name("enumerate")),
            args: vec![name("xs")],
            kwargs: vec![("start".to_string(), int(1))],
        };
        let js = lower(&["xs"], &e);
        assert!(js.contains("[$i + $s, $x]"));
        assert!(js.ends_with(", 1)"));
    }

    #[test]
    fn all_and_any_apply_collection_truthiness() {
        let e = builtin("all", vec![name("xs")]);
        let js = lower(&["xs"], &e);
        // Each element runs through the container-aware truth check, so an
        // empty nested list counts as false.
        assert!(js.contains(".every(($x) =>"));
        assert!(js.contains("$v.size > 0"));
        assert!(js.contains("$v.length > 0"));

        let e = builtin("any", vec![name("xs")]);
        assert!(lower(&["xs"], &e).contains(".some(($x) =>"));
    }

    #[test]
    fn arity_violations_are_compile_errors() {
        let e = method(name("s"), "upper", vec![int(1)]);
        let err = try_lower(&["s"], &e).unwrap_err();
        assert_eq!(err.code, ERR_CALL_ARITY);
    }

    #[test]
    fn unknown_builtins_fail_closed() {
        let e = builtin("eval", vec![text("1")]);
        let err = try_lower(&[], &e).unwrap_err();
        // `eval` is not in the table at all, so the name does not resolve.
        assert_eq!(err.code, ERR_SCOPE_UNRESOLVED);
        assert!(err.message.contains("eval"));
    }

    #[test]
    fn repr_is_recognized_but_unsupported() {
        // `repr` resolves as a builtin name, then fails with an explicit
        // unsupported error rather than an unresolved-name one.
        let e = builtin("repr", vec![name("x")]);
        let err = try_lower(&["x"], &e).unwrap_err();
        assert_eq!(err.code, ERR_UNSUPPORTED);
        assert!(err.message.contains("repr"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // format() interception
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn format_with_literal_spec_specializes() {
        let e = builtin(
            "format",
            vec![PyExpr::Literal(PyLiteral::Float(3.14159)), text(".2f")],
        );
        assert_eq!(lower(&[], &e), "(3.14159).toFixed(2)");
    }

    #[test]
    fn format_with_dynamic_spec_is_rejected() {
        let e = builtin("format", vec![name("x"), name("spec")]);
        let err = try_lower(&["x", "spec"], &e).unwrap_err();
        assert_eq!(err.code, ERR_FORMAT_SPEC);
    }

    #[test]
    fn format_without_spec_stringifies() {
        let e = builtin("format", vec![name("x")]);
        assert_eq!(lower(&["x"], &e), "String(x)");
    }
}

//! Free-function builtin dispatch.
//!
//! A closed set: every name here has a hand-written lowering rule, anything
//! else resolves through the reference table or fails as a scope error.
//! Builtin names are recognized in call position only.
//!
//! Negative-digit rounding is the one compile-time special case: the host
//! rounding primitive only rounds to an integer, so `round(x, -k)` lowers to
//! `Math.round(x / 10 ** k) * 10 ** k`, with the branch chosen at compile
//! time for a literal digit count and behind a runtime ternary otherwise.

use crate::ast::{PyExpr, PyLiteral};
use crate::error::{CompileResult, CompilerError, ERR_CALL_ARITY, ERR_CALL_KEYWORDS};
use crate::js_ast::{
    arrow, binop, call, ident, iife, iife_block, index, instance_of, int, is_array, member,
    method_call, new_expr, spread, str_lit, ternary, typeof_is, unop, JsBinOp, JsExpr, JsStmt,
    JsUnaryOp,
};
use crate::methods::{iter_guard, sort_arguments};
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    pub static ref BUILTIN_FUNCTIONS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for name in [
            "abs", "all", "any", "bool", "chr", "dict", "divmod", "enumerate", "float",
            "format", "int", "len", "list", "max", "min", "ord", "print", "range", "repr",
            "reversed", "round", "set", "sorted", "str", "sum", "tuple", "zip",
        ] {
            s.insert(name);
        }
        s
    };
}

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(name)
}

fn arity(callee: &str, args: &[JsExpr], min: usize, max: usize) -> CompileResult<()> {
    if args.len() < min || args.len() > max {
        return Err(CompilerError::with_details(
            ERR_CALL_ARITY,
            &format!(
                "Builtin '{callee}' takes {min}..={max} arguments, got {}",
                args.len()
            ),
            Some(callee.to_string()),
            vec![],
        ));
    }
    Ok(())
}

fn reject_kwargs(callee: &str, kwargs: &[(String, JsExpr)]) -> CompileResult<()> {
    if let Some((name, _)) = kwargs.first() {
        return Err(CompilerError::with_details(
            ERR_CALL_KEYWORDS,
            &format!("Builtin '{callee}' does not accept keyword argument '{name}'"),
            Some(callee.to_string()),
            vec![],
        ));
    }
    Ok(())
}

fn math(name: &str, args: Vec<JsExpr>) -> JsExpr {
    call(member(ident("Math"), name), args)
}

/// Length with the Map/Set size branch.
pub fn length_of(value: JsExpr) -> JsExpr {
    let v = || ident("$v");
    iife(
        &["$v"],
        ternary(
            binop(
                JsBinOp::Or,
                instance_of(v(), "Map"),
                instance_of(v(), "Set"),
            ),
            member(v(), "size"),
            member(v(), "length"),
        ),
        vec![value],
    )
}

/// Truthiness matching the authoring language: empty collections are falsy.
pub fn truth_test(value: JsExpr) -> JsExpr {
    let v = || ident("$v");
    iife(
        &["$v"],
        ternary(
            binop(
                JsBinOp::Or,
                instance_of(v(), "Map"),
                instance_of(v(), "Set"),
            ),
            binop(JsBinOp::Gt, member(v(), "size"), int(0)),
            ternary(
                binop(JsBinOp::Or, is_array(v()), typeof_is(v(), "string")),
                binop(JsBinOp::Gt, member(v(), "length"), int(0)),
                unop(JsUnaryOp::Not, unop(JsUnaryOp::Not, v())),
            ),
        ),
        vec![value],
    )
}

/// Lower a builtin free-function call. `py_args` are the unlowered arguments,
/// consulted only where a literal changes the emitted shape (`round`).
/// `format` never reaches this table; the visitor resolves its spec against
/// the reference table first.
pub fn lower_builtin(
    name: &str,
    py_args: &[PyExpr],
    args: Vec<JsExpr>,
    kwargs: Vec<(String, JsExpr)>,
) -> CompileResult<JsExpr> {
    if !matches!(name, "sorted" | "enumerate") {
        reject_kwargs(name, &kwargs)?;
    }
    let lowered = match name {
        "abs" => {
            arity(name, &args, 1, 1)?;
            math("abs", args)
        }
        "all" | "any" => {
            arity(name, &args, 1, 1)?;
            let quantifier = if name == "all" { "every" } else { "some" };
            let mut args = args;
            // Collection-aware truth per element: empty containers are falsy.
            method_call(
                iter_guard(args.remove(0)),
                quantifier,
                vec![arrow(&["$x"], truth_test(ident("$x")))],
            )
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            match args.into_iter().next() {
                Some(value) => truth_test(value),
                None => JsExpr::Bool(false),
            }
        }
        "chr" => {
            arity(name, &args, 1, 1)?;
            call(member(ident("String"), "fromCharCode"), args)
        }
        "ord" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            method_call(args.remove(0), "charCodeAt", vec![int(0)])
        }
        "dict" => {
            arity(name, &args, 0, 1)?;
            match args.into_iter().next() {
                None => new_expr("Map", vec![]),
                Some(value) => {
                    let v = || ident("$v");
                    iife(
                        &["$v"],
                        ternary(
                            binop(
                                JsBinOp::Or,
                                instance_of(v(), "Map"),
                                is_array(v()),
                            ),
                            new_expr("Map", vec![v()]),
                            new_expr(
                                "Map",
                                vec![call(member(ident("Object"), "entries"), vec![v()])],
                            ),
                        ),
                        vec![value],
                    )
                }
            }
        }
        "divmod" => {
            arity(name, &args, 2, 2)?;
            let a = || ident("$a");
            let b = || ident("$b");
            iife(
                &["$a", "$b"],
                JsExpr::Array(vec![
                    math("floor", vec![binop(JsBinOp::Div, a(), b())]),
                    binop(
                        JsBinOp::Mod,
                        binop(JsBinOp::Add, binop(JsBinOp::Mod, a(), b()), b()),
                        b(),
                    ),
                ]),
                args,
            )
        }
        "enumerate" => {
            arity(name, &args, 1, 2)?;
            let mut args = args;
            let mut start = if args.len() == 2 { args.pop().unwrap() } else { int(0) };
            for (kw, value) in kwargs {
                if kw == "start" {
                    start = value;
                } else {
                    return Err(CompilerError::with_details(
                        ERR_CALL_KEYWORDS,
                        &format!("Builtin 'enumerate' does not accept keyword argument '{kw}'"),
                        Some(name.to_string()),
                        vec![],
                    ));
                }
            }
            let v = || ident("$v");
            let s = || ident("$s");
            let x = || ident("$x");
            let i = || ident("$i");
            iife(
                &["$v", "$s"],
                method_call(
                    JsExpr::Array(vec![spread(v())]),
                    "map",
                    vec![arrow(
                        &["$x", "$i"],
                        JsExpr::Array(vec![binop(JsBinOp::Add, i(), s()), x()]),
                    )],
                ),
                vec![iter_guard(args.remove(0)), start],
            )
        }
        "float" => {
            arity(name, &args, 1, 1)?;
            call(ident("Number"), args)
        }
        "int" => {
            arity(name, &args, 1, 1)?;
            let v = || ident("$v");
            iife(
                &["$v"],
                ternary(
                    typeof_is(v(), "string"),
                    call(ident("parseInt"), vec![v(), int(10)]),
                    math("trunc", vec![v()]),
                ),
                args,
            )
        }
        "len" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            length_of(args.remove(0))
        }
        "list" | "tuple" => {
            arity(name, &args, 0, 1)?;
            match args.into_iter().next() {
                None => JsExpr::Array(vec![]),
                Some(value) => JsExpr::Array(vec![spread(iter_guard(value))]),
            }
        }
        "max" | "min" => {
            arity(name, &args, 1, usize::MAX)?;
            if args.len() == 1 {
                let mut args = args;
                math(name, vec![spread(iter_guard(args.remove(0)))])
            } else {
                math(name, args)
            }
        }
        "print" => call(member(ident("console"), "log"), args),
        "range" => lower_range(py_args, args)?,
        "reversed" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            method_call(
                JsExpr::Array(vec![spread(iter_guard(args.remove(0)))]),
                "reverse",
                vec![],
            )
        }
        "round" => lower_round(py_args, args)?,
        "set" => {
            arity(name, &args, 0, 1)?;
            match args.into_iter().next() {
                None => new_expr("Set", vec![]),
                Some(value) => new_expr("Set", vec![iter_guard(value)]),
            }
        }
        "sorted" => {
            arity(name, &args, 1, 1)?;
            let (comparator, reverse) = sort_arguments("sorted", kwargs)?;
            let mut args = args;
            let copied = JsExpr::Array(vec![spread(iter_guard(args.remove(0)))]);
            let sorted = method_call(copied, "sort", vec![comparator]);
            if reverse {
                method_call(sorted, "reverse", vec![])
            } else {
                sorted
            }
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            match args.into_iter().next() {
                None => str_lit(""),
                Some(value) => call(ident("String"), vec![value]),
            }
        }
        "sum" => {
            arity(name, &args, 1, 2)?;
            let mut args = args;
            let start = if args.len() == 2 { args.pop().unwrap() } else { int(0) };
            let a = || ident("$a");
            let b = || ident("$b");
            method_call(
                iter_guard(args.remove(0)),
                "reduce",
                vec![arrow(&["$a", "$b"], binop(JsBinOp::Add, a(), b())), start],
            )
        }
        "zip" => {
            arity(name, &args, 2, usize::MAX)?;
            lower_zip(args)
        }
        other => {
            return Err(CompilerError::unsupported(&format!(
                "builtin function '{other}'"
            )))
        }
    };
    Ok(lowered)
}

fn lower_range(py_args: &[PyExpr], args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("range", &args, 1, 3)?;
    // Literal single bound: emit the closed form directly.
    if let (1, Some(PyExpr::Literal(PyLiteral::Int(n)))) = (args.len(), py_args.first()) {
        if *n >= 0 {
            return Ok(call(
                member(ident("Array"), "from"),
                vec![
                    JsExpr::Object(vec![("length".to_string(), int(*n))]),
                    arrow(&["$_", "$i"], ident("$i")),
                ],
            ));
        }
    }
    let s = || ident("$s");
    let e = || ident("$e");
    let st = || ident("$st");
    let i = || ident("$i");
    Ok(match args.len() {
        1 => iife(
            &["$e"],
            call(
                member(ident("Array"), "from"),
                vec![
                    JsExpr::Object(vec![(
                        "length".to_string(),
                        math("max", vec![int(0), e()]),
                    )]),
                    arrow(&["$_", "$i"], i()),
                ],
            ),
            args,
        ),
        2 => iife(
            &["$s", "$e"],
            call(
                member(ident("Array"), "from"),
                vec![
                    JsExpr::Object(vec![(
                        "length".to_string(),
                        math("max", vec![int(0), binop(JsBinOp::Sub, e(), s())]),
                    )]),
                    arrow(&["$_", "$i"], binop(JsBinOp::Add, s(), i())),
                ],
            ),
            args,
        ),
        _ => iife(
            &["$s", "$e", "$st"],
            call(
                member(ident("Array"), "from"),
                vec![
                    JsExpr::Object(vec![(
                        "length".to_string(),
                        math(
                            "max",
                            vec![
                                int(0),
                                math(
                                    "ceil",
                                    vec![binop(
                                        JsBinOp::Div,
                                        binop(JsBinOp::Sub, e(), s()),
                                        st(),
                                    )],
                                ),
                            ],
                        ),
                    )]),
                    arrow(
                        &["$_", "$i"],
                        binop(JsBinOp::Add, s(), binop(JsBinOp::Mul, i(), st())),
                    ),
                ],
            ),
            args,
        ),
    })
}

fn lower_round(py_args: &[PyExpr], args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("round", &args, 1, 2)?;
    if args.len() == 1 {
        return Ok(math("round", args));
    }
    let mut args = args;
    let digits = args.pop().unwrap();
    let value = args.pop().unwrap();
    // Literal digit count: choose the branch at compile time.
    if let Some(PyExpr::Literal(PyLiteral::Int(n))) = py_args.get(1) {
        return Ok(match *n {
            0 => math("round", vec![value]),
            n if n > 0 => {
                let scale = binop(JsBinOp::Pow, int(10), int(n));
                binop(
                    JsBinOp::Div,
                    math("round", vec![binop(JsBinOp::Mul, value, scale.clone())]),
                    scale,
                )
            }
            n => {
                let scale = binop(JsBinOp::Pow, int(10), int(-n));
                binop(
                    JsBinOp::Mul,
                    math("round", vec![binop(JsBinOp::Div, value, scale.clone())]),
                    scale,
                )
            }
        });
    }
    // Unknown digit count: decide the direction at runtime.
    let x = || ident("$x");
    let n = || ident("$n");
    let neg_scale = binop(JsBinOp::Pow, int(10), unop(JsUnaryOp::Neg, n()));
    let pos_scale = binop(JsBinOp::Pow, int(10), n());
    Ok(iife(
        &["$x", "$n"],
        ternary(
            binop(JsBinOp::Lt, n(), int(0)),
            binop(
                JsBinOp::Mul,
                math("round", vec![binop(JsBinOp::Div, x(), neg_scale.clone())]),
                neg_scale,
            ),
            binop(
                JsBinOp::Div,
                math("round", vec![binop(JsBinOp::Mul, x(), pos_scale.clone())]),
                pos_scale,
            ),
        ),
        vec![value, digits],
    ))
}

fn lower_zip(args: Vec<JsExpr>) -> JsExpr {
    let sources: Vec<JsExpr> = args.into_iter().map(iter_guard).collect();
    let n = || ident("$n");
    let a = || ident("$a");
    let i = || ident("$i");
    let as_ = || ident("$as");
    let body = vec![
        JsStmt::Const {
            name: "$n".to_string(),
            init: math(
                "min",
                vec![spread(method_call(
                    as_(),
                    "map",
                    vec![arrow(&["$a"], member(a(), "length"))],
                ))],
            ),
        },
        JsStmt::Return(Some(method_call(
            method_call(index(as_(), int(0)), "slice", vec![int(0), n()]),
            "map",
            vec![arrow(
                &["$_", "$i"],
                method_call(as_(), "map", vec![arrow(&["$a"], index(a(), i()))]),
            )],
        ))),
    ];
    iife_block(&["...$as"], body, sources)
}

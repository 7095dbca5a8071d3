//! Attribute-method dispatch.
//!
//! Two tiers. Exact rewrites map a method straight onto a host equivalent
//! (`upper` → `toUpperCase`). Representation-ambiguous methods (`pop`,
//! `clear`, `update`, ...) are legal on several runtime representations with
//! no static type information, so they lower to a self-invoking runtime
//! type-check expression branching between array, Map/Set, and plain-object
//! behavior. All branch arms share the combinators in this module; arguments
//! are bound to `$`-prefixed IIFE parameters so each evaluates exactly once.

use crate::error::{CompileResult, CompilerError, ERR_CALL_ARITY, ERR_CALL_KEYWORDS};
use crate::js_ast::{
    arrow, assign_expr, binop, call, iife, iife_block, index, instance_of, int, is_array, member,
    method_call, new_expr, spread, str_lit, ternary, typeof_is, undef, unop, JsBinOp, JsExpr,
    JsStmt, JsUnaryOp,
};
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Every method name the dispatch tables claim. Anything else falls
    /// through to generic call emission for opaque host objects.
    pub static ref DISPATCHED_METHODS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for name in [
            // strings
            "upper", "lower", "strip", "lstrip", "rstrip", "startswith", "endswith", "find",
            "split", "join", "replace", "zfill", "ljust", "rjust", "center", "capitalize",
            "title",
            // lists
            "append", "extend", "insert", "remove", "sort", "reverse",
            // representation-ambiguous
            "pop", "clear", "update", "copy", "count", "index",
            // maps
            "get", "keys", "values", "items", "setdefault", "popitem",
            // sets
            "add", "discard", "union", "intersection", "difference", "issubset", "issuperset",
        ] {
            s.insert(name);
        }
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED COMBINATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Iteration source normalization: a Map iterates its keys, a Set its
/// elements, a string its characters, arrays pass through. The result always
/// carries the array methods the comprehension chains compile to.
pub fn iter_guard(source: JsExpr) -> JsExpr {
    iife(
        &["$v"],
        ternary(
            instance_of(ident_v(), "Map"),
            JsExpr::Array(vec![spread(method_call(ident_v(), "keys", vec![]))]),
            ternary(
                instance_of(ident_v(), "Set"),
                JsExpr::Array(vec![spread(ident_v())]),
                ternary(
                    typeof_is(ident_v(), "string"),
                    JsExpr::Array(vec![spread(ident_v())]),
                    ident_v(),
                ),
            ),
        ),
        vec![source],
    )
}

/// Membership test: Map/Set key presence, array/string containment, plain
/// object key presence.
pub fn contains(container: JsExpr, item: JsExpr) -> JsExpr {
    let c = || crate::js_ast::ident("$c");
    let x = || crate::js_ast::ident("$x");
    iife(
        &["$c", "$x"],
        ternary(
            map_or_set(c()),
            method_call(c(), "has", vec![x()]),
            ternary(
                binop(JsBinOp::Or, is_array(c()), typeof_is(c(), "string")),
                method_call(c(), "includes", vec![x()]),
                binop(JsBinOp::In, x(), c()),
            ),
        ),
        vec![container, item],
    )
}

/// Subscript read with Map lookup and negative-index normalization.
pub fn get_item(object: JsExpr, key: JsExpr) -> JsExpr {
    let o = || crate::js_ast::ident("$o");
    let k = || crate::js_ast::ident("$k");
    iife(
        &["$o", "$k"],
        ternary(
            instance_of(o(), "Map"),
            method_call(o(), "get", vec![k()]),
            ternary(
                binop(
                    JsBinOp::And,
                    typeof_is(k(), "number"),
                    binop(JsBinOp::Lt, k(), int(0)),
                ),
                index(o(), binop(JsBinOp::Add, member(o(), "length"), k())),
                index(o(), k()),
            ),
        ),
        vec![object, key],
    )
}

/// Subscript write.
pub fn set_item(object: JsExpr, key: JsExpr, value: JsExpr) -> JsExpr {
    let o = || crate::js_ast::ident("$o");
    let k = || crate::js_ast::ident("$k");
    let v = || crate::js_ast::ident("$v");
    iife(
        &["$o", "$k", "$v"],
        ternary(
            instance_of(o(), "Map"),
            method_call(o(), "set", vec![k(), v()]),
            assign_expr(index(o(), k()), v()),
        ),
        vec![object, key, value],
    )
}

/// Subscript deletion: Map/Set key removal, array splice, object `delete`.
pub fn del_item(object: JsExpr, key: JsExpr) -> JsExpr {
    let o = || crate::js_ast::ident("$o");
    let k = || crate::js_ast::ident("$k");
    iife(
        &["$o", "$k"],
        ternary(
            map_or_set(o()),
            method_call(o(), "delete", vec![k()]),
            ternary(
                is_array(o()),
                method_call(o(), "splice", vec![normalize_index(o(), k()), int(1)]),
                unop(JsUnaryOp::Delete, index(o(), k())),
            ),
        ),
        vec![object, key],
    )
}

/// The default ordering comparator. JavaScript's `sort` is lexicographic
/// without one; the authoring language orders by value.
pub fn default_compare() -> JsExpr {
    let a = || crate::js_ast::ident("$a");
    let b = || crate::js_ast::ident("$b");
    arrow(
        &["$a", "$b"],
        ternary(
            binop(JsBinOp::Lt, a(), b()),
            unop(JsUnaryOp::Neg, int(1)),
            ternary(binop(JsBinOp::Gt, a(), b()), int(1), int(0)),
        ),
    )
}

/// Comparator through a key function: compare `key(a)` against `key(b)`.
pub fn key_compare(key_fn: JsExpr) -> JsExpr {
    let a = || crate::js_ast::ident("$a");
    let b = || crate::js_ast::ident("$b");
    let ka = || crate::js_ast::ident("$ka");
    let kb = || crate::js_ast::ident("$kb");
    arrow(
        &["$a", "$b"],
        iife(
            &["$ka", "$kb"],
            ternary(
                binop(JsBinOp::Lt, ka(), kb()),
                unop(JsUnaryOp::Neg, int(1)),
                ternary(binop(JsBinOp::Gt, ka(), kb()), int(1), int(0)),
            ),
            vec![call(key_fn.clone(), vec![a()]), call(key_fn, vec![b()])],
        ),
    )
}

/// `(() => { throw new Error(message); })()`
pub fn throw_error(message: JsExpr) -> JsExpr {
    iife_block(
        &[],
        vec![JsStmt::Throw(new_expr("Error", vec![message]))],
        vec![],
    )
}

fn ident_v() -> JsExpr {
    crate::js_ast::ident("$v")
}

fn map_or_set(value: JsExpr) -> JsExpr {
    binop(
        JsBinOp::Or,
        instance_of(value.clone(), "Map"),
        instance_of(value, "Set"),
    )
}

/// `$k < 0 ? $o.length + $k : $k`
fn normalize_index(object: JsExpr, key: JsExpr) -> JsExpr {
    ternary(
        binop(JsBinOp::Lt, key.clone(), int(0)),
        binop(JsBinOp::Add, member(object, "length"), key.clone()),
        key,
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// METHOD DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

fn arity(method: &str, args: &[JsExpr], min: usize, max: usize) -> CompileResult<()> {
    if args.len() < min || args.len() > max {
        return Err(CompilerError::with_details(
            ERR_CALL_ARITY,
            &format!(
                "Method '{method}' takes {min}..={max} arguments, got {}",
                args.len()
            ),
            Some(method.to_string()),
            vec![],
        ));
    }
    Ok(())
}

fn reject_kwargs(method: &str, kwargs: &[(String, JsExpr)]) -> CompileResult<()> {
    if let Some((name, _)) = kwargs.first() {
        return Err(CompilerError::with_details(
            ERR_CALL_KEYWORDS,
            &format!("Method '{method}' does not accept keyword argument '{name}'"),
            Some(method.to_string()),
            vec![],
        ));
    }
    Ok(())
}

/// Lower a dispatched method call. Returns `Ok(None)` when the method is not
/// in the tables, leaving the caller to fall through to generic call
/// emission.
pub fn lower_method(
    object: JsExpr,
    name: &str,
    args: Vec<JsExpr>,
    kwargs: Vec<(String, JsExpr)>,
) -> CompileResult<Option<JsExpr>> {
    if !DISPATCHED_METHODS.contains(name) {
        return Ok(None);
    }
    if name != "sort" {
        reject_kwargs(name, &kwargs)?;
    }
    let lowered = match name {
        // ── strings, exact rewrites ────────────────────────────────────────
        "upper" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "toUpperCase", vec![])
        }
        "lower" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "toLowerCase", vec![])
        }
        "strip" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "trim", vec![])
        }
        "lstrip" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "trimStart", vec![])
        }
        "rstrip" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "trimEnd", vec![])
        }
        "startswith" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "startsWith", args)
        }
        "endswith" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "endsWith", args)
        }
        "find" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "indexOf", args)
        }
        "split" => lower_split(object, args)?,
        "join" => {
            // Receiver and argument swap places: `sep.join(xs)` becomes
            // `xs.join(sep)`.
            arity(name, &args, 1, 1)?;
            let mut args = args;
            method_call(iter_guard(args.remove(0)), "join", vec![object])
        }
        "replace" => {
            // The authoring language replaces every occurrence.
            arity(name, &args, 2, 2)?;
            let mut args = args;
            let new = args.pop().unwrap();
            let old = args.pop().unwrap();
            method_call(method_call(object, "split", vec![old]), "join", vec![new])
        }
        "zfill" => lower_zfill(object, args)?,
        "ljust" => lower_just(object, args, "padEnd")?,
        "rjust" => lower_just(object, args, "padStart")?,
        "center" => lower_center(object, args)?,
        "capitalize" => {
            arity(name, &args, 0, 0)?;
            let s = || crate::js_ast::ident("$s");
            iife(
                &["$s"],
                binop(
                    JsBinOp::Add,
                    method_call(
                        method_call(s(), "charAt", vec![int(0)]),
                        "toUpperCase",
                        vec![],
                    ),
                    method_call(
                        method_call(s(), "slice", vec![int(1)]),
                        "toLowerCase",
                        vec![],
                    ),
                ),
                vec![object],
            )
        }
        "title" => {
            arity(name, &args, 0, 0)?;
            let w = || crate::js_ast::ident("$w");
            method_call(
                object,
                "replace",
                vec![
                    JsExpr::Raw(r"/\w\S*/g".to_string()),
                    arrow(
                        &["$w"],
                        binop(
                            JsBinOp::Add,
                            method_call(
                                method_call(w(), "charAt", vec![int(0)]),
                                "toUpperCase",
                                vec![],
                            ),
                            method_call(
                                method_call(w(), "slice", vec![int(1)]),
                                "toLowerCase",
                                vec![],
                            ),
                        ),
                    ),
                ],
            )
        }

        // ── lists, exact rewrites ──────────────────────────────────────────
        "append" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "push", args)
        }
        "extend" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            method_call(object, "push", vec![spread(iter_guard(args.remove(0)))])
        }
        "insert" => {
            arity(name, &args, 2, 2)?;
            let mut args = args;
            let value = args.pop().unwrap();
            let at = args.pop().unwrap();
            method_call(object, "splice", vec![at, int(0), value])
        }
        "remove" => {
            arity(name, &args, 1, 1)?;
            lower_remove(object, args)
        }
        "sort" => lower_sort(object, args, kwargs)?,
        "reverse" => {
            arity(name, &args, 0, 0)?;
            method_call(object, "reverse", vec![])
        }

        // ── representation-ambiguous, runtime branches ─────────────────────
        "pop" => lower_pop(object, args)?,
        "clear" => {
            arity(name, &args, 0, 0)?;
            let o = || crate::js_ast::ident("$o");
            iife(
                &["$o"],
                ternary(
                    is_array(o()),
                    assign_expr(member(o(), "length"), int(0)),
                    method_call(o(), "clear", vec![]),
                ),
                vec![object],
            )
        }
        "update" => {
            arity(name, &args, 1, 1)?;
            lower_update(object, args)
        }
        "copy" => {
            arity(name, &args, 0, 0)?;
            let o = || crate::js_ast::ident("$o");
            iife(
                &["$o"],
                ternary(
                    instance_of(o(), "Map"),
                    new_expr("Map", vec![o()]),
                    ternary(
                        instance_of(o(), "Set"),
                        new_expr("Set", vec![o()]),
                        JsExpr::Array(vec![spread(o())]),
                    ),
                ),
                vec![object],
            )
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            lower_count(object, args)
        }
        "index" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "indexOf", args)
        }

        // ── maps, check-then-mutate semantics ──────────────────────────────
        "get" => {
            arity(name, &args, 1, 2)?;
            lower_get(object, args)
        }
        "keys" => {
            arity(name, &args, 0, 0)?;
            lower_map_view(object, "keys")
        }
        "values" => {
            arity(name, &args, 0, 0)?;
            lower_map_view(object, "values")
        }
        "items" => {
            arity(name, &args, 0, 0)?;
            lower_map_view(object, "entries")
        }
        "setdefault" => {
            arity(name, &args, 1, 2)?;
            lower_setdefault(object, args)
        }
        "popitem" => {
            arity(name, &args, 0, 0)?;
            lower_popitem(object)
        }

        // ── sets ───────────────────────────────────────────────────────────
        "add" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "add", args)
        }
        "discard" => {
            arity(name, &args, 1, 1)?;
            method_call(object, "delete", args)
        }
        "union" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            let other = args.remove(0);
            let a = || crate::js_ast::ident("$a");
            let b = || crate::js_ast::ident("$b");
            iife(
                &["$a", "$b"],
                new_expr("Set", vec![JsExpr::Array(vec![spread(a()), spread(b())])]),
                vec![object, other],
            )
        }
        "intersection" => lower_set_filter(object, args, false)?,
        "difference" => lower_set_filter(object, args, true)?,
        "issubset" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            lower_set_every(object, args.remove(0))
        }
        "issuperset" => {
            arity(name, &args, 1, 1)?;
            let mut args = args;
            lower_set_every(args.remove(0), object)
        }
        _ => unreachable!("method in DISPATCHED_METHODS without a lowering"),
    };
    Ok(Some(lowered))
}

fn lower_split(object: JsExpr, args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("split", &args, 0, 1)?;
    if args.is_empty() {
        // No separator: split on runs of whitespace, empty input gives [].
        let t = || crate::js_ast::ident("$t");
        let body = vec![
            JsStmt::Const {
                name: "$t".to_string(),
                init: method_call(crate::js_ast::ident("$s"), "trim", vec![]),
            },
            JsStmt::Return(Some(ternary(
                binop(JsBinOp::StrictEq, t(), str_lit("")),
                JsExpr::Array(vec![]),
                method_call(t(), "split", vec![JsExpr::Raw(r"/\s+/".to_string())]),
            ))),
        ];
        Ok(iife_block(&["$s"], body, vec![object]))
    } else {
        Ok(method_call(object, "split", args))
    }
}

fn lower_zfill(object: JsExpr, args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("zfill", &args, 1, 1)?;
    let s = || crate::js_ast::ident("$s");
    let w = || crate::js_ast::ident("$w");
    // A leading sign stays ahead of the zero padding.
    let body = vec![JsStmt::Return(Some(ternary(
        method_call(s(), "startsWith", vec![str_lit("-")]),
        binop(
            JsBinOp::Add,
            str_lit("-"),
            method_call(
                method_call(s(), "slice", vec![int(1)]),
                "padStart",
                vec![binop(JsBinOp::Sub, w(), int(1)), str_lit("0")],
            ),
        ),
        method_call(s(), "padStart", vec![w(), str_lit("0")]),
    )))];
    Ok(iife_block(&["$s", "$w"], body, vec![object, args.into_iter().next().unwrap()]))
}

fn lower_just(object: JsExpr, args: Vec<JsExpr>, pad: &str) -> CompileResult<JsExpr> {
    arity(pad, &args, 1, 2)?;
    let mut args = args;
    let fill = if args.len() == 2 {
        args.pop().unwrap()
    } else {
        str_lit(" ")
    };
    let width = args.pop().unwrap();
    Ok(method_call(object, pad, vec![width, fill]))
}

fn lower_center(object: JsExpr, args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("center", &args, 1, 2)?;
    let mut args = args;
    let fill = if args.len() == 2 {
        args.pop().unwrap()
    } else {
        str_lit(" ")
    };
    let width = args.pop().unwrap();
    let s = || crate::js_ast::ident("$s");
    let w = || crate::js_ast::ident("$w");
    let f = || crate::js_ast::ident("$f");
    let p = || crate::js_ast::ident("$p");
    let l = || crate::js_ast::ident("$l");
    let body = vec![
        JsStmt::Const {
            name: "$p".to_string(),
            init: call(
                member(crate::js_ast::ident("Math"), "max"),
                vec![int(0), binop(JsBinOp::Sub, w(), member(s(), "length"))],
            ),
        },
        JsStmt::Const {
            name: "$l".to_string(),
            init: call(
                member(crate::js_ast::ident("Math"), "floor"),
                vec![binop(JsBinOp::Div, p(), int(2))],
            ),
        },
        JsStmt::Return(Some(binop(
            JsBinOp::Add,
            binop(
                JsBinOp::Add,
                method_call(f(), "repeat", vec![l()]),
                s(),
            ),
            method_call(f(), "repeat", vec![binop(JsBinOp::Sub, p(), l())]),
        ))),
    ];
    Ok(iife_block(&["$s", "$w", "$f"], body, vec![object, width, fill]))
}

fn lower_remove(object: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    let a = || crate::js_ast::ident("$a");
    let x = || crate::js_ast::ident("$x");
    let i = || crate::js_ast::ident("$i");
    let body = vec![
        JsStmt::Const {
            name: "$i".to_string(),
            init: method_call(a(), "indexOf", vec![x()]),
        },
        JsStmt::If {
            test: binop(JsBinOp::Lt, i(), int(0)),
            cons: vec![JsStmt::Throw(new_expr(
                "Error",
                vec![str_lit("ValueError: remove(x): x not in collection")],
            ))],
            alt: None,
        },
        JsStmt::Expr(method_call(a(), "splice", vec![i(), int(1)])),
    ];
    iife_block(&["$a", "$x"], body, vec![object, args.into_iter().next().unwrap()])
}

fn lower_sort(
    object: JsExpr,
    args: Vec<JsExpr>,
    kwargs: Vec<(String, JsExpr)>,
) -> CompileResult<JsExpr> {
    arity("sort", &args, 0, 0)?;
    let (comparator, reverse) = sort_arguments("sort", kwargs)?;
    let sorted = method_call(object, "sort", vec![comparator]);
    Ok(if reverse {
        method_call(sorted, "reverse", vec![])
    } else {
        sorted
    })
}

/// Shared by `sort` and the `sorted` builtin: resolve `key=`/`reverse=`
/// keywords into a comparator and a reverse flag. `reverse` must be a literal
/// boolean so the emitted chain is fixed at compile time.
pub fn sort_arguments(
    callee: &str,
    kwargs: Vec<(String, JsExpr)>,
) -> CompileResult<(JsExpr, bool)> {
    let mut comparator = default_compare();
    let mut reverse = false;
    for (name, value) in kwargs {
        match name.as_str() {
            "key" => comparator = key_compare(value),
            "reverse" => match value {
                JsExpr::Bool(flag) => reverse = flag,
                _ => {
                    return Err(CompilerError::with_details(
                        ERR_CALL_ARITY,
                        &format!("'{callee}' requires a literal boolean for reverse="),
                        Some(callee.to_string()),
                        vec![],
                    ))
                }
            },
            other => {
                return Err(CompilerError::with_details(
                    ERR_CALL_KEYWORDS,
                    &format!("'{callee}' does not accept keyword argument '{other}'"),
                    Some(callee.to_string()),
                    vec![],
                ))
            }
        }
    }
    Ok((comparator, reverse))
}

fn lower_pop(object: JsExpr, args: Vec<JsExpr>) -> CompileResult<JsExpr> {
    arity("pop", &args, 0, 2)?;
    let o = || crate::js_ast::ident("$o");
    let k = || crate::js_ast::ident("$k");

    if args.is_empty() {
        // Array: remove and return the last element. Anything else keeps its
        // own `pop`, for opaque host objects.
        return Ok(iife(
            &["$o"],
            ternary(
                is_array(o()),
                index(
                    method_call(o(), "splice", vec![unop(JsUnaryOp::Neg, int(1)), int(1)]),
                    int(0),
                ),
                method_call(o(), "pop", vec![]),
            ),
            vec![object],
        ));
    }

    let mut args = args;
    let default = if args.len() == 2 { Some(args.pop().unwrap()) } else { None };
    let key = args.pop().unwrap();

    // Map arm: check, read, delete, yield the read value.
    let taken = iife(
        &["$t"],
        crate::js_ast::comma(vec![
            method_call(o(), "delete", vec![k()]),
            crate::js_ast::ident("$t"),
        ]),
        vec![method_call(o(), "get", vec![k()])],
    );
    let missing = match &default {
        Some(_) => crate::js_ast::ident("$d"),
        None => throw_error(binop(
            JsBinOp::Add,
            str_lit("KeyError: "),
            k(),
        )),
    };
    let map_arm = ternary(method_call(o(), "has", vec![k()]), taken, missing);
    // Array arm: splice out one element at a (possibly negative) index.
    let array_arm = index(
        method_call(o(), "splice", vec![normalize_index(o(), k()), int(1)]),
        int(0),
    );
    let branch = ternary(instance_of(o(), "Map"), map_arm, array_arm);

    Ok(match default {
        Some(default) => iife(&["$o", "$k", "$d"], branch, vec![object, key, default]),
        None => iife(&["$o", "$k"], branch, vec![object, key]),
    })
}

fn lower_update(object: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    let o = || crate::js_ast::ident("$o");
    let u = || crate::js_ast::ident("$u");
    let e = || crate::js_ast::ident("$e");
    let entries = ternary(
        instance_of(u(), "Map"),
        JsExpr::Array(vec![spread(method_call(u(), "entries", vec![]))]),
        call(member(crate::js_ast::ident("Object"), "entries"), vec![u()]),
    );
    let map_arm = crate::js_ast::comma(vec![
        method_call(
            entries,
            "forEach",
            vec![arrow(
                &["$e"],
                method_call(o(), "set", vec![index(e(), int(0)), index(e(), int(1))]),
            )],
        ),
        undef(),
    ]);
    iife(
        &["$o", "$u"],
        ternary(
            instance_of(o(), "Map"),
            map_arm,
            call(
                member(crate::js_ast::ident("Object"), "assign"),
                vec![o(), u()],
            ),
        ),
        vec![object, args.into_iter().next().unwrap()],
    )
}

fn lower_count(object: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    let o = || crate::js_ast::ident("$o");
    let x = || crate::js_ast::ident("$x");
    let v = || crate::js_ast::ident("$v");
    let string_arm = binop(
        JsBinOp::Sub,
        member(method_call(o(), "split", vec![x()]), "length"),
        int(1),
    );
    let array_arm = member(
        method_call(
            o(),
            "filter",
            vec![arrow(&["$v"], binop(JsBinOp::StrictEq, v(), x()))],
        ),
        "length",
    );
    iife(
        &["$o", "$x"],
        ternary(typeof_is(o(), "string"), string_arm, array_arm),
        vec![object, args.into_iter().next().unwrap()],
    )
}

fn lower_get(object: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    let m = || crate::js_ast::ident("$m");
    let k = || crate::js_ast::ident("$k");
    let d = || crate::js_ast::ident("$d");
    let mut args = args;
    let default = if args.len() == 2 { args.pop().unwrap() } else { undef() };
    let key = args.pop().unwrap();
    let map_arm = ternary(
        method_call(m(), "has", vec![k()]),
        method_call(m(), "get", vec![k()]),
        d(),
    );
    let object_arm = ternary(binop(JsBinOp::In, k(), m()), index(m(), k()), d());
    iife(
        &["$m", "$k", "$d"],
        ternary(instance_of(m(), "Map"), map_arm, object_arm),
        vec![object, key, default],
    )
}

fn lower_map_view(object: JsExpr, view: &str) -> JsExpr {
    let m = || crate::js_ast::ident("$m");
    let object_fn = match view {
        "keys" => "keys",
        "values" => "values",
        _ => "entries",
    };
    iife(
        &["$m"],
        ternary(
            instance_of(m(), "Map"),
            JsExpr::Array(vec![spread(method_call(m(), view, vec![]))]),
            call(member(crate::js_ast::ident("Object"), object_fn), vec![m()]),
        ),
        vec![object],
    )
}

fn lower_setdefault(object: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    let m = || crate::js_ast::ident("$m");
    let k = || crate::js_ast::ident("$k");
    let d = || crate::js_ast::ident("$d");
    let mut args = args;
    let default = if args.len() == 2 { args.pop().unwrap() } else { undef() };
    let key = args.pop().unwrap();
    // An existing entry is never overwritten.
    let map_arm = ternary(
        method_call(m(), "has", vec![k()]),
        method_call(m(), "get", vec![k()]),
        crate::js_ast::comma(vec![method_call(m(), "set", vec![k(), d()]), d()]),
    );
    let object_arm = ternary(
        binop(JsBinOp::In, k(), m()),
        index(m(), k()),
        crate::js_ast::comma(vec![assign_expr(index(m(), k()), d()), d()]),
    );
    iife(
        &["$m", "$k", "$d"],
        ternary(instance_of(m(), "Map"), map_arm, object_arm),
        vec![object, key, default],
    )
}

fn lower_popitem(object: JsExpr) -> JsExpr {
    let m = || crate::js_ast::ident("$m");
    let e = || crate::js_ast::ident("$e");
    let l = || crate::js_ast::ident("$l");
    let body = vec![
        JsStmt::Const {
            name: "$e".to_string(),
            init: JsExpr::Array(vec![spread(method_call(m(), "entries", vec![]))]),
        },
        JsStmt::If {
            test: binop(JsBinOp::StrictEq, member(e(), "length"), int(0)),
            cons: vec![JsStmt::Throw(new_expr(
                "Error",
                vec![str_lit("KeyError: popitem(): dictionary is empty")],
            ))],
            alt: None,
        },
        JsStmt::Const {
            name: "$l".to_string(),
            init: index(e(), binop(JsBinOp::Sub, member(e(), "length"), int(1))),
        },
        JsStmt::Expr(method_call(m(), "delete", vec![index(l(), int(0))])),
        JsStmt::Return(Some(l())),
    ];
    iife_block(&["$m"], body, vec![object])
}

fn lower_set_filter(object: JsExpr, args: Vec<JsExpr>, negate: bool) -> CompileResult<JsExpr> {
    arity(if negate { "difference" } else { "intersection" }, &args, 1, 1)?;
    let a = || crate::js_ast::ident("$a");
    let b = || crate::js_ast::ident("$b");
    let x = || crate::js_ast::ident("$x");
    let mut test = method_call(b(), "has", vec![x()]);
    if negate {
        test = unop(JsUnaryOp::Not, test);
    }
    Ok(iife(
        &["$a", "$b"],
        new_expr(
            "Set",
            vec![method_call(
                JsExpr::Array(vec![spread(a())]),
                "filter",
                vec![arrow(&["$x"], test)],
            )],
        ),
        vec![object, args.into_iter().next().unwrap()],
    ))
}

fn lower_set_every(subset: JsExpr, superset: JsExpr) -> JsExpr {
    let a = || crate::js_ast::ident("$a");
    let b = || crate::js_ast::ident("$b");
    let x = || crate::js_ast::ident("$x");
    iife(
        &["$a", "$b"],
        method_call(
            JsExpr::Array(vec![spread(a())]),
            "every",
            vec![arrow(&["$x"], method_call(b(), "has", vec![x()]))],
        ),
        vec![subset, superset],
    )
}

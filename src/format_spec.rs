//! Format-specification emulator.
//!
//! Parses the `[[fill]align][sign][#][0][width][,][.precision][type]`
//! mini-language from a compile-time-constant spec and emits a JavaScript
//! expression reproducing the authoring language's display string exactly.
//!
//! The ordering rules that matter: the sign precedes any alternate-form
//! prefix (`0x`/`0b`/`0o`); zero-padding and `=` alignment pad between the
//! sign+prefix and the digits, never before; grouping supports only the comma
//! separator; string-type precision truncates rather than pads.

use crate::error::{
    CompileResult, CompilerError, ERR_FORMAT_ALIGN, ERR_FORMAT_GROUPING, ERR_FORMAT_SPEC,
};
use crate::js_ast::{
    binop, call, ident, iife_block, index, member, method_call, str_lit, ternary, typeof_is,
    JsBinOp, JsExpr, JsStmt,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SPEC_RE: Regex = Regex::new(
        r"(?x)
        ^
        (?:(?P<fill>[^{}])?(?P<align>[<>^=]))?
        (?P<sign>[+\-\ ])?
        (?P<alt>\#)?
        (?P<zero>0)?
        (?P<width>\d+)?
        (?P<group>[,_])?
        (?:\.(?P<prec>\d+))?
        (?P<ty>[bcdeEfFgGnosxX%])?
        $
    "
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<char>,
    pub sign: Option<char>,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<i64>,
    pub comma: bool,
    pub precision: Option<i64>,
    pub ty: Option<char>,
}

pub fn parse_spec(spec: &str) -> CompileResult<FormatSpec> {
    let caps = SPEC_RE.captures(spec).ok_or_else(|| {
        let offending = spec
            .chars()
            .last()
            .map(|c| c.to_string())
            .unwrap_or_default();
        CompilerError::with_details(
            ERR_FORMAT_SPEC,
            &format!("Malformed format spec '{spec}'"),
            Some(offending),
            vec![],
        )
    })?;

    let numeric = |m: regex::Match| -> CompileResult<i64> {
        m.as_str().parse().map_err(|_| {
            CompilerError::with_details(
                ERR_FORMAT_SPEC,
                &format!("Numeric field out of range in format spec '{spec}'"),
                Some(m.as_str().to_string()),
                vec![],
            )
        })
    };
    let first_char = |m: regex::Match| m.as_str().chars().next();

    // `_` is a legal fill character but not a supported group separator.
    let group = caps.name("group").and_then(first_char);
    if group == Some('_') {
        return Err(CompilerError::with_details(
            ERR_FORMAT_GROUPING,
            &format!("Underscore grouping is not supported in format spec '{spec}'"),
            Some("_".to_string()),
            vec![],
        ));
    }

    let parsed = FormatSpec {
        fill: caps.name("fill").and_then(first_char).unwrap_or(' '),
        align: caps.name("align").and_then(first_char),
        sign: caps.name("sign").and_then(first_char),
        alternate: caps.name("alt").is_some(),
        zero: caps.name("zero").is_some(),
        width: caps.name("width").map(numeric).transpose()?,
        comma: group == Some(','),
        precision: caps.name("prec").map(numeric).transpose()?,
        ty: caps.name("ty").and_then(first_char),
    };

    if parsed.ty == Some('n') {
        return Err(CompilerError::with_details(
            ERR_FORMAT_SPEC,
            "Locale-aware type 'n' is not supported",
            Some("n".to_string()),
            vec![],
        ));
    }
    if parsed.align == Some('=') && matches!(parsed.ty, Some('s')) {
        return Err(CompilerError::with_details(
            ERR_FORMAT_ALIGN,
            "'=' alignment is not allowed with string presentation",
            Some("=".to_string()),
            vec![],
        ));
    }
    if parsed.comma && matches!(parsed.ty, Some('s' | 'c')) {
        return Err(CompilerError::with_details(
            ERR_FORMAT_SPEC,
            "Cannot specify ',' with a string presentation type",
            Some(",".to_string()),
            vec![],
        ));
    }
    if parsed.precision.is_some() && matches!(parsed.ty, Some('b' | 'c' | 'd' | 'o' | 'x' | 'X')) {
        return Err(CompilerError::with_details(
            ERR_FORMAT_SPEC,
            "Precision is not allowed with integer presentation types",
            Some(".".to_string()),
            vec![],
        ));
    }
    Ok(parsed)
}

/// Compile `format(value, spec)` to an expression. The spec must already be
/// resolved to a literal string by the caller.
pub fn compile_format(value: JsExpr, spec: &str) -> CompileResult<JsExpr> {
    let parsed = parse_spec(spec)?;

    // Precision-only float spec compiles straight to a fixed-point call.
    if matches!(parsed.ty, Some('f' | 'F'))
        && parsed.precision.is_some()
        && parsed.width.is_none()
        && parsed.align.is_none()
        && parsed.sign.is_none()
        && !parsed.alternate
        && !parsed.zero
        && !parsed.comma
    {
        return Ok(method_call(
            value,
            "toFixed",
            vec![JsExpr::Int(parsed.precision.unwrap())],
        ));
    }

    let body = match parsed.ty {
        Some('d' | 'b' | 'o' | 'x' | 'X') => integer_body(&parsed),
        Some('c') => char_body(&parsed),
        Some('f' | 'F' | 'e' | 'E' | '%') => float_body(&parsed),
        Some('g' | 'G') => general_float_body(&parsed),
        Some('s') => string_body(&parsed),
        None => untyped_body(&parsed),
        Some(other) => {
            return Err(CompilerError::with_details(
                ERR_FORMAT_SPEC,
                &format!("Unsupported presentation type '{other}'"),
                Some(other.to_string()),
                vec![],
            ))
        }
    };
    Ok(iife_block(&["$v"], body, vec![value]))
}

// ───────────────────────────────────────────────────────────────────────────────
// Statement builders
// ───────────────────────────────────────────────────────────────────────────────

fn const_stmt(name: &str, init: JsExpr) -> JsStmt {
    JsStmt::Const {
        name: name.to_string(),
        init,
    }
}

fn let_stmt(name: &str, init: JsExpr) -> JsStmt {
    JsStmt::Let {
        name: name.to_string(),
        init: Some(init),
    }
}

fn reassign(name: &str, value: JsExpr) -> JsStmt {
    JsStmt::Assign {
        target: ident(name),
        op: None,
        value,
    }
}

fn math(name: &str, args: Vec<JsExpr>) -> JsExpr {
    call(member(ident("Math"), name), args)
}

/// `$x < 0 ? "-" : <positive>` — the sign string for the configured mode.
fn sign_expr(spec: &FormatSpec, subject: JsExpr) -> JsExpr {
    let positive = match spec.sign {
        Some('+') => "+",
        Some(' ') => " ",
        _ => "",
    };
    ternary(
        binop(JsBinOp::Lt, subject, JsExpr::Int(0)),
        str_lit("-"),
        str_lit(positive),
    )
}

/// Group the integer part of `$d` with commas.
fn grouping_stmts(float_form: bool) -> Vec<JsStmt> {
    let group = |target: JsExpr| {
        method_call(
            target,
            "replace",
            vec![
                JsExpr::Raw(r"/\B(?=(\d{3})+(?!\d))/g".to_string()),
                str_lit(","),
            ],
        )
    };
    if !float_form {
        return vec![reassign("$d", group(ident("$d")))];
    }
    vec![
        const_stmt("$parts", method_call(ident("$d"), "split", vec![str_lit(".")])),
        JsStmt::Assign {
            target: index(ident("$parts"), JsExpr::Int(0)),
            op: None,
            value: group(index(ident("$parts"), JsExpr::Int(0))),
        },
        reassign("$d", method_call(ident("$parts"), "join", vec![str_lit(".")])),
    ]
}

/// Zero / `=` padding of the digits, after sign and prefix.
fn numeric_pad_stmts(spec: &FormatSpec, prefix_len: i64) -> Vec<JsStmt> {
    let Some(width) = spec.width else { return vec![] };
    let pad_here = spec.align == Some('=') || (spec.zero && spec.align.is_none());
    if !pad_here {
        return vec![];
    }
    let fill = if spec.align == Some('=') && !spec.zero {
        spec.fill
    } else {
        '0'
    };
    let mut pad_width = binop(
        JsBinOp::Sub,
        JsExpr::Int(width),
        member(ident("$s"), "length"),
    );
    if prefix_len > 0 {
        pad_width = binop(JsBinOp::Sub, pad_width, JsExpr::Int(prefix_len));
    }
    vec![reassign(
        "$d",
        method_call(
            ident("$d"),
            "padStart",
            vec![pad_width, str_lit(&fill.to_string())],
        ),
    )]
}

/// Width/alignment padding of the fully assembled string `$r`.
fn align_stmts(spec: &FormatSpec, default_align: char) -> Vec<JsStmt> {
    let Some(width) = spec.width else { return vec![] };
    // `=` and bare-zero numeric padding were applied to the digits already.
    if spec.align == Some('=') || (spec.zero && spec.align.is_none()) {
        return vec![];
    }
    let align = spec.align.unwrap_or(default_align);
    let fill = str_lit(&spec.fill.to_string());
    match align {
        '<' => vec![reassign(
            "$r",
            method_call(ident("$r"), "padEnd", vec![JsExpr::Int(width), fill]),
        )],
        '>' => vec![reassign(
            "$r",
            method_call(ident("$r"), "padStart", vec![JsExpr::Int(width), fill]),
        )],
        _ => {
            // Centering: left gap rounds down, as the authoring language does.
            vec![
                const_stmt(
                    "$gap",
                    math(
                        "max",
                        vec![
                            JsExpr::Int(0),
                            binop(
                                JsBinOp::Sub,
                                JsExpr::Int(width),
                                member(ident("$r"), "length"),
                            ),
                        ],
                    ),
                ),
                const_stmt(
                    "$left",
                    math("floor", vec![binop(JsBinOp::Div, ident("$gap"), JsExpr::Int(2))]),
                ),
                reassign(
                    "$r",
                    binop(
                        JsBinOp::Add,
                        binop(
                            JsBinOp::Add,
                            method_call(fill.clone(), "repeat", vec![ident("$left")]),
                            ident("$r"),
                        ),
                        method_call(
                            fill,
                            "repeat",
                            vec![binop(JsBinOp::Sub, ident("$gap"), ident("$left"))],
                        ),
                    ),
                ),
            ]
        }
    }
}

fn assemble_and_return(spec: &FormatSpec, prefix: &str, default_align: char) -> Vec<JsStmt> {
    let mut with_prefix = ident("$s");
    if !prefix.is_empty() {
        with_prefix = binop(JsBinOp::Add, with_prefix, str_lit(prefix));
    }
    let mut stmts = vec![let_stmt("$r", binop(JsBinOp::Add, with_prefix, ident("$d")))];
    stmts.extend(align_stmts(spec, default_align));
    stmts.push(JsStmt::Return(Some(ident("$r"))));
    stmts
}

// ───────────────────────────────────────────────────────────────────────────────
// Per-type bodies; each receives the value bound to `$v`
// ───────────────────────────────────────────────────────────────────────────────

fn integer_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let ty = spec.ty.unwrap();
    let base: i64 = match ty {
        'b' => 2,
        'o' => 8,
        'x' | 'X' => 16,
        _ => 10,
    };
    let prefix = if spec.alternate {
        match ty {
            'b' => "0b",
            'o' => "0o",
            'x' => "0x",
            'X' => "0X",
            _ => "",
        }
    } else {
        ""
    };

    let mut stmts = vec![
        const_stmt("$n", math("trunc", vec![ident("$v")])),
        const_stmt("$s", sign_expr(spec, ident("$n"))),
        let_stmt(
            "$d",
            method_call(
                math("abs", vec![ident("$n")]),
                "toString",
                vec![JsExpr::Int(base)],
            ),
        ),
    ];
    if ty == 'X' {
        stmts.push(reassign("$d", method_call(ident("$d"), "toUpperCase", vec![])));
    }
    if spec.comma {
        stmts.extend(grouping_stmts(false));
    }
    stmts.extend(numeric_pad_stmts(spec, prefix.len() as i64));
    stmts.extend(assemble_and_return(spec, prefix, '>'));
    stmts
}

fn char_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let mut stmts = vec![let_stmt(
        "$r",
        call(
            member(ident("String"), "fromCharCode"),
            vec![math("trunc", vec![ident("$v")])],
        ),
    )];
    stmts.extend(align_stmts(spec, '<'));
    stmts.push(JsStmt::Return(Some(ident("$r"))));
    stmts
}

fn float_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let ty = spec.ty.unwrap();
    let precision = spec.precision.unwrap_or(6);
    let percent = ty == '%';

    let magnitude = if percent {
        binop(JsBinOp::Mul, math("abs", vec![ident("$v")]), JsExpr::Int(100))
    } else {
        math("abs", vec![ident("$v")])
    };

    let mut stmts = vec![
        const_stmt("$s", sign_expr(spec, ident("$v"))),
        let_stmt("$a", magnitude),
    ];

    match ty {
        'e' | 'E' => {
            stmts.push(let_stmt(
                "$d",
                method_call(ident("$a"), "toExponential", vec![JsExpr::Int(precision)]),
            ));
            // The authoring language pads exponents to two digits.
            stmts.push(reassign(
                "$d",
                method_call(
                    ident("$d"),
                    "replace",
                    vec![
                        JsExpr::Raw(r"/e([+-])(\d)$/".to_string()),
                        str_lit("e$10$2"),
                    ],
                ),
            ));
            if ty == 'E' {
                stmts.push(reassign("$d", method_call(ident("$d"), "toUpperCase", vec![])));
            }
        }
        _ => {
            stmts.push(let_stmt(
                "$d",
                method_call(ident("$a"), "toFixed", vec![JsExpr::Int(precision)]),
            ));
        }
    }

    if spec.comma {
        stmts.extend(grouping_stmts(true));
    }
    if percent {
        stmts.push(reassign("$d", binop(JsBinOp::Add, ident("$d"), str_lit("%"))));
    }
    stmts.extend(numeric_pad_stmts(spec, 0));
    stmts.extend(assemble_and_return(spec, "", '>'));
    stmts
}

fn general_float_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let upper = spec.ty == Some('G');
    let p = spec.precision.unwrap_or(6).max(1);

    let mut stmts = vec![
        const_stmt("$s", sign_expr(spec, ident("$v"))),
        const_stmt("$a", math("abs", vec![ident("$v")])),
        const_stmt(
            "$exp",
            ternary(
                binop(JsBinOp::StrictEq, ident("$a"), JsExpr::Int(0)),
                JsExpr::Int(0),
                math("floor", vec![math("log10", vec![ident("$a")])]),
            ),
        ),
        JsStmt::Let {
            name: "$d".to_string(),
            init: None,
        },
    ];

    // Fixed notation inside the window, scientific outside it.
    let mut fixed_arm = vec![reassign(
        "$d",
        method_call(
            ident("$a"),
            "toFixed",
            vec![math(
                "max",
                vec![
                    JsExpr::Int(0),
                    binop(
                        JsBinOp::Sub,
                        JsExpr::Int(p - 1),
                        ident("$exp"),
                    ),
                ],
            )],
        ),
    )];
    if !spec.alternate {
        fixed_arm.push(reassign(
            "$d",
            method_call(
                method_call(
                    ident("$d"),
                    "replace",
                    vec![JsExpr::Raw(r"/(\.\d*?)0+$/".to_string()), str_lit("$1")],
                ),
                "replace",
                vec![JsExpr::Raw(r"/\.$/".to_string()), str_lit("")],
            ),
        ));
    }

    let mut sci_arm = vec![reassign(
        "$d",
        method_call(ident("$a"), "toExponential", vec![JsExpr::Int(p - 1)]),
    )];
    if !spec.alternate {
        sci_arm.push(reassign(
            "$d",
            method_call(
                method_call(
                    ident("$d"),
                    "replace",
                    vec![JsExpr::Raw(r"/(\.\d*?)0+e/".to_string()), str_lit("$1e")],
                ),
                "replace",
                vec![JsExpr::Raw(r"/\.e/".to_string()), str_lit("e")],
            ),
        ));
    }
    sci_arm.push(reassign(
        "$d",
        method_call(
            ident("$d"),
            "replace",
            vec![
                JsExpr::Raw(r"/e([+-])(\d)$/".to_string()),
                str_lit("e$10$2"),
            ],
        ),
    ));

    stmts.push(JsStmt::If {
        test: binop(
            JsBinOp::And,
            binop(JsBinOp::GtE, ident("$exp"), JsExpr::Int(-4)),
            binop(JsBinOp::Lt, ident("$exp"), JsExpr::Int(p)),
        ),
        cons: fixed_arm,
        alt: Some(sci_arm),
    });

    if upper {
        stmts.push(reassign("$d", method_call(ident("$d"), "toUpperCase", vec![])));
    }
    if spec.comma {
        stmts.extend(grouping_stmts(true));
    }
    stmts.extend(numeric_pad_stmts(spec, 0));
    stmts.extend(assemble_and_return(spec, "", '>'));
    stmts
}

fn string_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let mut stmts = vec![let_stmt("$r", call(ident("String"), vec![ident("$v")]))];
    if let Some(precision) = spec.precision {
        // String precision truncates, never pads.
        stmts.push(reassign(
            "$r",
            method_call(ident("$r"), "slice", vec![JsExpr::Int(0), JsExpr::Int(precision)]),
        ));
    }
    stmts.extend(align_stmts(spec, '<'));
    stmts.push(JsStmt::Return(Some(ident("$r"))));
    stmts
}

/// No presentation type: numeric flags route to the numeric path, otherwise
/// stringify. Default alignment then depends on the runtime type, numbers to
/// the right and everything else to the left.
fn untyped_body(spec: &FormatSpec) -> Vec<JsStmt> {
    let numeric_flags =
        spec.sign.is_some() || spec.comma || spec.zero || spec.align == Some('=');
    if numeric_flags {
        let mut stmts = vec![
            const_stmt("$s", sign_expr(spec, ident("$v"))),
            let_stmt("$d", call(ident("String"), vec![math("abs", vec![ident("$v")])])),
        ];
        if spec.comma {
            stmts.extend(grouping_stmts(true));
        }
        stmts.extend(numeric_pad_stmts(spec, 0));
        stmts.extend(assemble_and_return(spec, "", '>'));
        return stmts;
    }

    let mut stmts = Vec::new();
    if let Some(precision) = spec.precision {
        // Precision rounds numbers the way the general float presentation
        // does; it only truncates strings.
        stmts.push(JsStmt::If {
            test: typeof_is(ident("$v"), "number"),
            cons: general_float_body(spec),
            alt: None,
        });
        stmts.push(let_stmt("$r", call(ident("String"), vec![ident("$v")])));
        stmts.push(reassign(
            "$r",
            method_call(ident("$r"), "slice", vec![JsExpr::Int(0), JsExpr::Int(precision)]),
        ));
    } else {
        stmts.push(let_stmt("$r", call(ident("String"), vec![ident("$v")])));
    }
    if spec.width.is_some() && spec.align.is_none() {
        // Right-align numbers, left-align everything else.
        let width = spec.width.unwrap();
        let fill = str_lit(&spec.fill.to_string());
        stmts.push(reassign(
            "$r",
            ternary(
                typeof_is(ident("$v"), "number"),
                method_call(ident("$r"), "padStart", vec![JsExpr::Int(width), fill.clone()]),
                method_call(ident("$r"), "padEnd", vec![JsExpr::Int(width), fill]),
            ),
        ));
    } else {
        stmts.extend(align_stmts(spec, '<'));
    }
    stmts.push(JsStmt::Return(Some(ident("$r"))));
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::print_expr;

    #[test]
    fn parses_full_grammar() {
        let spec = parse_spec("*>+#012,.3f").unwrap();
        assert_eq!(spec.fill, '*');
        assert_eq!(spec.align, Some('>'));
        assert_eq!(spec.sign, Some('+'));
        assert!(spec.alternate);
        assert!(spec.zero);
        assert_eq!(spec.width, Some(12));
        assert!(spec.comma);
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.ty, Some('f'));
    }

    #[test]
    fn underscore_grouping_is_rejected() {
        let err = parse_spec("_d").unwrap_err();
        assert_eq!(err.code, ERR_FORMAT_GROUPING);
        let err = parse_spec("10_d").unwrap_err();
        assert_eq!(err.code, ERR_FORMAT_GROUPING);
    }

    #[test]
    fn underscore_fill_pads_with_underscores() {
        let spec = parse_spec("_>5").unwrap();
        assert_eq!(spec.fill, '_');
        assert_eq!(spec.align, Some('>'));
        assert!(!spec.comma);
        let expr = compile_format(ident("x"), "_>5").unwrap();
        assert!(print_expr(&expr).contains("$r.padStart(5, \"_\")"));
    }

    #[test]
    fn unknown_type_char_is_rejected() {
        let err = parse_spec("10q").unwrap_err();
        assert_eq!(err.code, ERR_FORMAT_SPEC);
    }

    #[test]
    fn equals_alignment_requires_numeric_type() {
        let err = parse_spec("=10s").unwrap_err();
        assert_eq!(err.code, ERR_FORMAT_ALIGN);
    }

    #[test]
    fn precision_only_float_uses_to_fixed() {
        let expr = compile_format(JsExpr::Float(3.14159), ".2f").unwrap();
        assert_eq!(print_expr(&expr), "(3.14159).toFixed(2)");
    }

    #[test]
    fn zero_padded_int_pads_after_the_sign() {
        let expr = compile_format(ident("x"), "05d").unwrap();
        let js = print_expr(&expr);
        assert!(js.contains("Math.trunc($v)"));
        assert!(js.contains("$d.padStart(5 - $s.length, \"0\")"));
        assert!(js.contains("$s + $d"));
    }

    #[test]
    fn alternate_hex_places_prefix_after_sign() {
        let expr = compile_format(ident("x"), "#x").unwrap();
        let js = print_expr(&expr);
        assert!(js.contains("toString(16)"));
        assert!(js.contains("$s + \"0x\" + $d"));
    }

    #[test]
    fn untyped_precision_rounds_numbers_and_truncates_strings() {
        let expr = compile_format(ident("x"), ".3").unwrap();
        let js = print_expr(&expr);
        // Numbers branch into general-float rounding before the string path.
        assert!(js.contains("typeof $v === \"number\""));
        assert!(js.contains("Math.log10"));
        assert!(js.contains("$a.toFixed(Math.max(0, 2 - $exp))"));
        assert!(js.contains("$r.slice(0, 3)"));
    }

    #[test]
    fn string_width_pads_to_the_left_by_default() {
        let expr = compile_format(ident("x"), ">5").unwrap();
        let js = print_expr(&expr);
        assert!(js.contains("$r.padStart(5, \" \")"));
    }
}

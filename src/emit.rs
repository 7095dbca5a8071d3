//! Serialization of the output AST to JavaScript source text.
//!
//! Precedence-aware: parentheses are inserted exactly where the emitted tree
//! requires them, so printing is deterministic and every node prints
//! standalone. Two-space indentation, double-quoted strings, semicolons on
//! every statement.

use crate::js_ast::{ArrowBody, JsBinOp, JsExpr, JsStmt, JsUnaryOp};

// Binding powers, loosest to tightest.
const PREC_COMMA: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_TERNARY: u8 = 4;
const PREC_OR: u8 = 5;
const PREC_AND: u8 = 6;
const PREC_BIT_OR: u8 = 7;
const PREC_BIT_XOR: u8 = 8;
const PREC_BIT_AND: u8 = 9;
const PREC_EQ: u8 = 10;
const PREC_REL: u8 = 11;
const PREC_SHIFT: u8 = 12;
const PREC_ADD: u8 = 13;
const PREC_MUL: u8 = 14;
const PREC_POW: u8 = 15;
const PREC_UNARY: u8 = 16;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 20;

fn bin_prec(op: JsBinOp) -> u8 {
    match op {
        JsBinOp::Or => PREC_OR,
        JsBinOp::And => PREC_AND,
        JsBinOp::BitOr => PREC_BIT_OR,
        JsBinOp::BitXor => PREC_BIT_XOR,
        JsBinOp::BitAnd => PREC_BIT_AND,
        JsBinOp::StrictEq | JsBinOp::StrictNeq => PREC_EQ,
        JsBinOp::Lt | JsBinOp::LtE | JsBinOp::Gt | JsBinOp::GtE | JsBinOp::Instanceof
        | JsBinOp::In => PREC_REL,
        JsBinOp::Shl | JsBinOp::Shr => PREC_SHIFT,
        JsBinOp::Add | JsBinOp::Sub => PREC_ADD,
        JsBinOp::Mul | JsBinOp::Div | JsBinOp::Mod => PREC_MUL,
        JsBinOp::Pow => PREC_POW,
    }
}

fn expr_prec(expr: &JsExpr) -> u8 {
    match expr {
        JsExpr::Comma(_) => PREC_COMMA,
        JsExpr::Assign { .. } | JsExpr::Arrow { .. } | JsExpr::Function { .. } => PREC_ASSIGN,
        JsExpr::Ternary { .. } => PREC_TERNARY,
        JsExpr::Binary { op, .. } => bin_prec(*op),
        JsExpr::Unary { .. } => PREC_UNARY,
        JsExpr::Call { .. }
        | JsExpr::New { .. }
        | JsExpr::Member { .. }
        | JsExpr::Index { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

pub struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Expressions
    // ───────────────────────────────────────────────────────────────────────────

    pub fn expr(&mut self, expr: &JsExpr, min_prec: u8) {
        let needs_parens = expr_prec(expr) < min_prec;
        if needs_parens {
            self.out.push('(');
        }
        self.expr_inner(expr);
        if needs_parens {
            self.out.push(')');
        }
    }

    fn expr_inner(&mut self, expr: &JsExpr) {
        match expr {
            JsExpr::Ident(name) => self.out.push_str(name),
            JsExpr::Int(value) => self.out.push_str(&value.to_string()),
            JsExpr::Float(value) => self.out.push_str(&float_text(*value)),
            JsExpr::Str(value) => {
                self.out.push('"');
                self.out.push_str(&escape_string(value));
                self.out.push('"');
            }
            JsExpr::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            JsExpr::Undefined => self.out.push_str("undefined"),
            JsExpr::Null => self.out.push_str("null"),
            JsExpr::Template { parts, exprs } => {
                self.out.push('`');
                for (i, part) in parts.iter().enumerate() {
                    self.out.push_str(&escape_template(part));
                    if i < exprs.len() {
                        self.out.push_str("${");
                        self.expr(&exprs[i], PREC_ASSIGN);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
            JsExpr::Array(elems) => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(elem, PREC_ASSIGN);
                }
                self.out.push(']');
            }
            JsExpr::Object(props) => {
                if props.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                self.out.push_str("{ ");
                for (i, (key, value)) in props.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if is_identifier(key) {
                        self.out.push_str(key);
                    } else {
                        self.out.push('"');
                        self.out.push_str(&escape_string(key));
                        self.out.push('"');
                    }
                    self.out.push_str(": ");
                    self.expr(value, PREC_ASSIGN);
                }
                self.out.push_str(" }");
            }
            JsExpr::Unary { op, operand } => {
                self.out.push_str(op.symbol());
                if op.is_word() {
                    self.out.push(' ');
                }
                // A unary operand that is itself unary always gets parens so
                // `-(-x)` never fuses into a decrement.
                if matches!(**operand, JsExpr::Unary { .. }) {
                    self.out.push('(');
                    self.expr_inner(operand);
                    self.out.push(')');
                } else {
                    self.expr(operand, PREC_UNARY);
                }
            }
            JsExpr::Binary { op, left, right } => {
                let prec = bin_prec(*op);
                // `**` is right-associative, and a unary left operand must be
                // parenthesized per the grammar.
                let (left_min, right_min) = if *op == JsBinOp::Pow {
                    (PREC_UNARY + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.expr(left, left_min);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.expr(right, right_min);
            }
            JsExpr::Assign { target, op, value } => {
                self.expr(target, PREC_CALL);
                self.out.push(' ');
                if let Some(op) = op {
                    self.out.push_str(op.symbol());
                }
                self.out.push_str("= ");
                self.expr(value, PREC_ASSIGN);
            }
            JsExpr::Ternary { test, cons, alt } => {
                self.expr(test, PREC_TERNARY + 1);
                self.out.push_str(" ? ");
                self.expr(cons, PREC_ASSIGN);
                self.out.push_str(" : ");
                self.expr(alt, PREC_ASSIGN);
            }
            JsExpr::Call { callee, args } => {
                self.expr(callee, PREC_CALL);
                self.call_args(args);
            }
            JsExpr::New { callee, args } => {
                self.out.push_str("new ");
                self.expr(callee, PREC_CALL);
                self.call_args(args);
            }
            JsExpr::Member { object, property } => {
                self.member_object(object);
                self.out.push('.');
                self.out.push_str(property);
            }
            JsExpr::Index { object, index } => {
                self.member_object(object);
                self.out.push('[');
                self.expr(index, PREC_ASSIGN);
                self.out.push(']');
            }
            JsExpr::Arrow { params, body } => {
                self.param_list(params);
                self.out.push_str(" => ");
                match body {
                    ArrowBody::Expr(expr) => {
                        // Object literals and comma sequences are ambiguous as
                        // a bare arrow body.
                        if matches!(**expr, JsExpr::Object(_) | JsExpr::Comma(_)) {
                            self.out.push('(');
                            self.expr_inner(expr);
                            self.out.push(')');
                        } else {
                            self.expr(expr, PREC_ASSIGN);
                        }
                    }
                    ArrowBody::Block(stmts) => self.block_inline(stmts),
                }
            }
            JsExpr::Function { name, params, body } => {
                self.out.push_str("function ");
                if let Some(name) = name {
                    self.out.push_str(name);
                }
                self.param_list(params);
                self.out.push(' ');
                self.block_inline(body);
            }
            JsExpr::Spread(value) => {
                self.out.push_str("...");
                self.expr(value, PREC_ASSIGN);
            }
            JsExpr::Comma(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(value, PREC_ASSIGN);
                }
            }
            JsExpr::Raw(source) => self.out.push_str(source),
        }
    }

    fn call_args(&mut self, args: &[JsExpr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn member_object(&mut self, object: &JsExpr) {
        // Numeric literals need parens before a `.`.
        if matches!(object, JsExpr::Int(_) | JsExpr::Float(_)) {
            self.out.push('(');
            self.expr_inner(object);
            self.out.push(')');
        } else {
            self.expr(object, PREC_CALL);
        }
    }

    fn param_list(&mut self, params: &[String]) {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(param);
        }
        self.out.push(')');
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Statements
    // ───────────────────────────────────────────────────────────────────────────

    pub fn stmt(&mut self, stmt: &JsStmt) {
        self.pad();
        match stmt {
            JsStmt::Expr(expr) => {
                // `function` and `{` would be parsed as declarations at the
                // start of a statement.
                if matches!(expr, JsExpr::Function { .. } | JsExpr::Object(_)) {
                    self.out.push('(');
                    self.expr_inner(expr);
                    self.out.push(')');
                } else {
                    self.expr(expr, PREC_COMMA);
                }
                self.out.push_str(";\n");
            }
            JsStmt::Let { name, init } => {
                self.out.push_str("let ");
                self.out.push_str(name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(init, PREC_ASSIGN);
                }
                self.out.push_str(";\n");
            }
            JsStmt::Const { name, init } => {
                self.out.push_str("const ");
                self.out.push_str(name);
                self.out.push_str(" = ");
                self.expr(init, PREC_ASSIGN);
                self.out.push_str(";\n");
            }
            JsStmt::Assign { target, op, value } => {
                self.expr(target, PREC_CALL);
                self.out.push(' ');
                if let Some(op) = op {
                    self.out.push_str(op.symbol());
                }
                self.out.push_str("= ");
                self.expr(value, PREC_ASSIGN);
                self.out.push_str(";\n");
            }
            JsStmt::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(value, PREC_ASSIGN);
                }
                self.out.push_str(";\n");
            }
            JsStmt::If { test, cons, alt } => {
                self.out.push_str("if (");
                self.expr(test, PREC_COMMA);
                self.out.push_str(") ");
                self.block_inline(cons);
                self.if_tail(alt.as_deref());
                self.out.push('\n');
            }
            JsStmt::While { test, body } => {
                self.out.push_str("while (");
                self.expr(test, PREC_COMMA);
                self.out.push_str(") ");
                self.block_inline(body);
                self.out.push('\n');
            }
            JsStmt::ForOf {
                decl,
                target,
                iter,
                body,
            } => {
                self.out.push_str("for (");
                if let Some(decl) = decl {
                    self.out.push_str(decl);
                    self.out.push(' ');
                }
                self.expr(target, PREC_ASSIGN);
                self.out.push_str(" of ");
                self.expr(iter, PREC_ASSIGN);
                self.out.push_str(") ");
                self.block_inline(body);
                self.out.push('\n');
            }
            JsStmt::Break => self.out.push_str("break;\n"),
            JsStmt::Continue => self.out.push_str("continue;\n"),
            JsStmt::Throw(expr) => {
                self.out.push_str("throw ");
                self.expr(expr, PREC_ASSIGN);
                self.out.push_str(";\n");
            }
            JsStmt::FunctionDecl { name, params, body } => {
                self.out.push_str("function ");
                self.out.push_str(name);
                self.param_list(params);
                self.out.push(' ');
                self.block_inline(body);
                self.out.push('\n');
            }
            JsStmt::Raw(line) => {
                self.out.push_str(line);
                self.out.push('\n');
            }
        }
    }

    fn if_tail(&mut self, alt: Option<&[JsStmt]>) {
        let Some(alt) = alt else { return };
        self.out.push_str(" else ");
        // Flatten `else { if ... }` into `else if ...`.
        if alt.len() == 1 {
            if let JsStmt::If { test, cons, alt } = &alt[0] {
                self.out.push_str("if (");
                self.expr(test, PREC_COMMA);
                self.out.push_str(") ");
                self.block_inline(cons);
                self.if_tail(alt.as_deref());
                return;
            }
        }
        self.block_inline(alt);
    }

    /// Braced block printed at the current position; closing brace lands at
    /// the current indent, no trailing newline.
    fn block_inline(&mut self, stmts: &[JsStmt]) {
        if stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.pad();
        self.out.push('}');
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a single expression to text.
pub fn print_expr(expr: &JsExpr) -> String {
    let mut printer = Printer::new();
    printer.expr(expr, PREC_COMMA);
    printer.finish()
}

/// Print a statement sequence to text.
pub fn print_stmts(stmts: &[JsStmt]) -> String {
    let mut printer = Printer::new();
    for stmt in stmts {
        printer.stmt(stmt);
    }
    printer.finish()
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 9e15 {
        return format!("{}", value as i64);
    }
    format!("{value}")
}

fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn escape_template(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

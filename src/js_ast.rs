//! The output JavaScript AST.
//!
//! Built bottom-up by the visitor and never mutated afterwards. Any node
//! prints to standalone text with no hidden context; serialization lives in
//! `emit`. Synthesized binding names (IIFE parameters, unpack temporaries)
//! always contain `$`, which the authoring language cannot produce in an
//! identifier, so they can never collide with user bindings.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsUnaryOp {
    Neg,
    Pos,
    Not,
    BitNot,
    Typeof,
    Delete,
}

impl JsUnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            JsUnaryOp::Neg => "-",
            JsUnaryOp::Pos => "+",
            JsUnaryOp::Not => "!",
            JsUnaryOp::BitNot => "~",
            JsUnaryOp::Typeof => "typeof",
            JsUnaryOp::Delete => "delete",
        }
    }

    /// Word-like operators need a space before their operand.
    pub fn is_word(self) -> bool {
        matches!(self, JsUnaryOp::Typeof | JsUnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    StrictEq,
    StrictNeq,
    Lt,
    LtE,
    Gt,
    GtE,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Instanceof,
    In,
}

impl JsBinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            JsBinOp::Add => "+",
            JsBinOp::Sub => "-",
            JsBinOp::Mul => "*",
            JsBinOp::Div => "/",
            JsBinOp::Mod => "%",
            JsBinOp::Pow => "**",
            JsBinOp::StrictEq => "===",
            JsBinOp::StrictNeq => "!==",
            JsBinOp::Lt => "<",
            JsBinOp::LtE => "<=",
            JsBinOp::Gt => ">",
            JsBinOp::GtE => ">=",
            JsBinOp::And => "&&",
            JsBinOp::Or => "||",
            JsBinOp::BitAnd => "&",
            JsBinOp::BitOr => "|",
            JsBinOp::BitXor => "^",
            JsBinOp::Shl => "<<",
            JsBinOp::Shr => ">>",
            JsBinOp::Instanceof => "instanceof",
            JsBinOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<JsExpr>),
    Block(Vec<JsStmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsExpr {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Undefined,
    Null,
    /// `parts` has exactly one more element than `exprs`.
    Template {
        parts: Vec<String>,
        exprs: Vec<JsExpr>,
    },
    Array(Vec<JsExpr>),
    Object(Vec<(String, JsExpr)>),
    Unary {
        op: JsUnaryOp,
        operand: Box<JsExpr>,
    },
    Binary {
        op: JsBinOp,
        left: Box<JsExpr>,
        right: Box<JsExpr>,
    },
    /// Assignment in expression position; `op` is the compound operator.
    Assign {
        target: Box<JsExpr>,
        op: Option<JsBinOp>,
        value: Box<JsExpr>,
    },
    Ternary {
        test: Box<JsExpr>,
        cons: Box<JsExpr>,
        alt: Box<JsExpr>,
    },
    Call {
        callee: Box<JsExpr>,
        args: Vec<JsExpr>,
    },
    New {
        callee: Box<JsExpr>,
        args: Vec<JsExpr>,
    },
    /// `object.property` with a statically valid property name.
    Member {
        object: Box<JsExpr>,
        property: String,
    },
    /// `object[index]`
    Index {
        object: Box<JsExpr>,
        index: Box<JsExpr>,
    },
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Vec<JsStmt>,
    },
    Spread(Box<JsExpr>),
    /// Comma sequence, printed `(a, b, c)` contexts permitting.
    Comma(Vec<JsExpr>),
    /// Verbatim source, used only for regular-expression literals.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsStmt {
    Expr(JsExpr),
    Let {
        name: String,
        init: Option<JsExpr>,
    },
    Const {
        name: String,
        init: JsExpr,
    },
    Assign {
        target: JsExpr,
        op: Option<JsBinOp>,
        value: JsExpr,
    },
    Return(Option<JsExpr>),
    If {
        test: JsExpr,
        cons: Vec<JsStmt>,
        alt: Option<Vec<JsStmt>>,
    },
    While {
        test: JsExpr,
        body: Vec<JsStmt>,
    },
    /// `for (<decl> target of iter) { body }`; `target` is an identifier or an
    /// array pattern.
    ForOf {
        decl: Option<&'static str>,
        target: JsExpr,
        iter: JsExpr,
        body: Vec<JsStmt>,
    },
    Break,
    Continue,
    Throw(JsExpr),
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<JsStmt>,
    },
    /// Verbatim line, used for import statements assembled by the emitter.
    Raw(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn ident(name: &str) -> JsExpr {
    JsExpr::Ident(name.to_string())
}

pub fn str_lit(value: &str) -> JsExpr {
    JsExpr::Str(value.to_string())
}

pub fn int(value: i64) -> JsExpr {
    JsExpr::Int(value)
}

pub fn undef() -> JsExpr {
    JsExpr::Undefined
}

pub fn member(object: JsExpr, property: &str) -> JsExpr {
    JsExpr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn index(object: JsExpr, idx: JsExpr) -> JsExpr {
    JsExpr::Index {
        object: Box::new(object),
        index: Box::new(idx),
    }
}

pub fn call(callee: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    JsExpr::Call {
        callee: Box::new(callee),
        args,
    }
}

/// `object.method(args)`
pub fn method_call(object: JsExpr, name: &str, args: Vec<JsExpr>) -> JsExpr {
    call(member(object, name), args)
}

pub fn new_expr(callee: &str, args: Vec<JsExpr>) -> JsExpr {
    JsExpr::New {
        callee: Box::new(ident(callee)),
        args,
    }
}

pub fn binop(op: JsBinOp, left: JsExpr, right: JsExpr) -> JsExpr {
    JsExpr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unop(op: JsUnaryOp, operand: JsExpr) -> JsExpr {
    JsExpr::Unary {
        op,
        operand: Box::new(operand),
    }
}

pub fn ternary(test: JsExpr, cons: JsExpr, alt: JsExpr) -> JsExpr {
    JsExpr::Ternary {
        test: Box::new(test),
        cons: Box::new(cons),
        alt: Box::new(alt),
    }
}

pub fn arrow(params: &[&str], body: JsExpr) -> JsExpr {
    JsExpr::Arrow {
        params: params.iter().map(|p| p.to_string()).collect(),
        body: ArrowBody::Expr(Box::new(body)),
    }
}

pub fn arrow_block(params: &[&str], body: Vec<JsStmt>) -> JsExpr {
    JsExpr::Arrow {
        params: params.iter().map(|p| p.to_string()).collect(),
        body: ArrowBody::Block(body),
    }
}

/// Immediately invoked arrow with an expression body. The workhorse of every
/// runtime-branch lowering: arguments evaluate exactly once, outside the arm
/// that consumes them.
pub fn iife(params: &[&str], body: JsExpr, args: Vec<JsExpr>) -> JsExpr {
    call(arrow(params, body), args)
}

/// Immediately invoked arrow with a statement body.
pub fn iife_block(params: &[&str], body: Vec<JsStmt>, args: Vec<JsExpr>) -> JsExpr {
    call(arrow_block(params, body), args)
}

pub fn spread(value: JsExpr) -> JsExpr {
    JsExpr::Spread(Box::new(value))
}

pub fn comma(values: Vec<JsExpr>) -> JsExpr {
    JsExpr::Comma(values)
}

pub fn assign_expr(target: JsExpr, value: JsExpr) -> JsExpr {
    JsExpr::Assign {
        target: Box::new(target),
        op: None,
        value: Box::new(value),
    }
}

/// `x instanceof Type`
pub fn instance_of(value: JsExpr, type_name: &str) -> JsExpr {
    binop(JsBinOp::Instanceof, value, ident(type_name))
}

/// `typeof x === "ty"`
pub fn typeof_is(value: JsExpr, ty: &str) -> JsExpr {
    binop(
        JsBinOp::StrictEq,
        unop(JsUnaryOp::Typeof, value),
        str_lit(ty),
    )
}

/// `Array.isArray(x)`
pub fn is_array(value: JsExpr) -> JsExpr {
    call(member(ident("Array"), "isArray"), vec![value])
}

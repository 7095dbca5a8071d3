//! The restricted input syntax tree and the callable interface.
//!
//! Tree acquisition is an external collaborator: the embedding layer turns a
//! callable's source into these nodes and classifies its enclosing scope. The
//! compiler consumes the classification, it never computes one. Constructs the
//! grammar rejects arrive as `Unsupported` nodes so the compiler can fail
//! closed while naming them.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum PyLiteral {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyBinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl PyBinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PyBinOp::Add => "+",
            PyBinOp::Sub => "-",
            PyBinOp::Mul => "*",
            PyBinOp::Div => "/",
            PyBinOp::FloorDiv => "//",
            PyBinOp::Mod => "%",
            PyBinOp::Pow => "**",
            PyBinOp::BitAnd => "&",
            PyBinOp::BitOr => "|",
            PyBinOp::BitXor => "^",
            PyBinOp::Shl => "<<",
            PyBinOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyUnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyBoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyCmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

/// One `for target in iter if cond ...` clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub target: BindTarget,
    pub iter: PyExpr,
    pub ifs: Vec<PyExpr>,
}

/// A binding position: a plain name or a flat tuple of plain names.
#[derive(Debug, Clone, PartialEq)]
pub enum BindTarget {
    Name(String),
    Tuple(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    /// Generator expressions materialize like list comprehensions.
    Generator,
}

/// One segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Field {
        value: PyExpr,
        /// `!s` or `!r` conversion, when present.
        conversion: Option<char>,
        /// Literal format spec following `:`, when present.
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PyExpr {
    Literal(PyLiteral),
    Name(String),
    BinOp {
        left: Box<PyExpr>,
        op: PyBinOp,
        right: Box<PyExpr>,
    },
    UnaryOp {
        op: PyUnaryOp,
        operand: Box<PyExpr>,
    },
    BoolOp {
        op: PyBoolOp,
        values: Vec<PyExpr>,
    },
    /// Chained comparison: `left ops[0] comparators[0] ops[1] comparators[1] ...`
    Compare {
        left: Box<PyExpr>,
        ops: Vec<PyCmpOp>,
        comparators: Vec<PyExpr>,
    },
    /// `body if test else orelse`
    IfExp {
        test: Box<PyExpr>,
        body: Box<PyExpr>,
        orelse: Box<PyExpr>,
    },
    Call {
        func: Box<PyExpr>,
        args: Vec<PyExpr>,
        kwargs: Vec<(String, PyExpr)>,
    },
    Attribute {
        value: Box<PyExpr>,
        attr: String,
    },
    Subscript {
        value: Box<PyExpr>,
        index: Box<PyExpr>,
    },
    Slice {
        value: Box<PyExpr>,
        lower: Option<Box<PyExpr>>,
        upper: Option<Box<PyExpr>>,
        step: Option<Box<PyExpr>>,
    },
    List(Vec<PyExpr>),
    Tuple(Vec<PyExpr>),
    Dict {
        keys: Vec<PyExpr>,
        values: Vec<PyExpr>,
    },
    Set(Vec<PyExpr>),
    Comprehension {
        kind: ComprehensionKind,
        /// Element expression; the key for dict comprehensions.
        element: Box<PyExpr>,
        /// Value expression of a dict comprehension.
        value: Option<Box<PyExpr>>,
        generators: Vec<Generator>,
    },
    FString(Vec<FStringPart>),
    Lambda {
        params: Vec<String>,
        body: Box<PyExpr>,
    },
    /// `*x` in a call argument position.
    Starred(Box<PyExpr>),
    /// A construct outside the accepted grammar, with its display name.
    Unsupported(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String),
    /// Flat tuple unpack over plain names only.
    Tuple(Vec<String>),
    Subscript {
        value: PyExpr,
        index: PyExpr,
    },
    Attribute {
        value: PyExpr,
        attr: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PyStmt {
    Expr(PyExpr),
    Assign {
        target: AssignTarget,
        value: PyExpr,
    },
    /// Annotated assignment; the annotation itself is discarded upstream.
    AnnAssign {
        target: String,
        value: Option<PyExpr>,
    },
    AugAssign {
        target: AssignTarget,
        op: PyBinOp,
        value: PyExpr,
    },
    If {
        test: PyExpr,
        body: Vec<PyStmt>,
        orelse: Vec<PyStmt>,
    },
    While {
        test: PyExpr,
        body: Vec<PyStmt>,
    },
    For {
        target: BindTarget,
        iter: PyExpr,
        body: Vec<PyStmt>,
    },
    Return(Option<PyExpr>),
    Break,
    Continue,
    Pass,
    /// `del o[k]`; bare `del name` arrives as `Unsupported`.
    Delete {
        value: PyExpr,
        index: PyExpr,
    },
    /// A statement form outside the accepted grammar, with its display name.
    Unsupported(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAIN CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A plain value referenced as a module-level global. Shared structure is
/// identity-significant: two callables referencing the same `Arc` emit one
/// constant definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Arc<ConstValue>>),
    Tuple(Vec<Arc<ConstValue>>),
    /// String-keyed mapping; emits as a native `Map` construction.
    Dict(Vec<(String, Arc<ConstValue>)>),
    /// Emits as a native `Set` construction.
    Set(Vec<Arc<ConstValue>>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALLABLE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
}

/// Enclosing-scope classification, supplied by the provider.
#[derive(Debug, Clone, Default)]
pub struct ScopeInfo {
    /// Names assigned somewhere in the body (true locals).
    pub locals: Vec<String>,
    /// Nonlocal captures. Any entry here is a hard compile error.
    pub nonlocals: Vec<String>,
    /// Module-scope names the body references; each must have a binding in
    /// `Callable::globals`, unless it is only used as a builtin call.
    pub globals: Vec<String>,
}

/// What a module-scope name resolves to.
#[derive(Debug, Clone)]
pub enum GlobalBinding {
    /// Another compilable callable.
    Callable(Arc<Callable>),
    /// A back edge in a cyclic callable graph, held weakly so mutually
    /// recursive callables can be constructed with `Arc::new_cyclic`.
    /// Upgraded at compile time; a dead reference is a scope error.
    CallableRef(Weak<Callable>),
    /// A plain constant, deduplicated by identity.
    Constant(Arc<ConstValue>),
    /// A module-qualified host symbol to import.
    Import {
        module: String,
        name: String,
        kind: ImportKind,
    },
}

/// One compilable callable: ordered parameters, restricted-subset body, and
/// the provider's scope classification. Identity (the `Arc` pointer) keys the
/// process-wide wrapper cache.
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<PyStmt>,
    pub scope: ScopeInfo,
    pub globals: HashMap<String, GlobalBinding>,
}

/// Identity key for a callable, derived from its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(pub usize);

impl CallableId {
    pub fn of(callable: &Arc<Callable>) -> Self {
        CallableId(Arc::as_ptr(callable) as usize)
    }
}

/// Identity key for a plain constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstId(pub usize);

impl ConstId {
    pub fn of(value: &Arc<ConstValue>) -> Self {
        ConstId(Arc::as_ptr(value) as usize)
    }
}

impl Callable {
    /// Convenience constructor for providers and tests.
    pub fn new(name: &str, params: &[&str], body: Vec<PyStmt>) -> Self {
        Callable {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
            scope: ScopeInfo::default(),
            globals: HashMap::new(),
        }
    }

    pub fn with_global(mut self, name: &str, binding: GlobalBinding) -> Self {
        self.scope.globals.push(name.to_string());
        self.globals.insert(name.to_string(), binding);
        self
    }
}

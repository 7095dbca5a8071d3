//! # Client Function Compiler
//!
//! Compiles callables written in a restricted, pure, side-effect-free subset
//! of the authoring language into equivalent JavaScript source, for shipping
//! comparators, formatters, and derived-value mappers to the client.
//!
//! ## Compilation Invariants
//!
//! 1. **Fail closed**: any construct, method, builtin, or format spec outside
//!    the closed tables is a `CompilerError` at compile time. No emitted
//!    module ever contains a best-guess translation.
//!
//! 2. **Reference table is the only escape**: a compiled body can reach its
//!    parameters, its declared locals, and the reference-table entries built
//!    from the callable's module-scope bindings — nothing else. Unresolved
//!    names are `CF-ERR-SCOPE-001`, nonlocal captures `CF-ERR-SCOPE-002`.
//!
//! 3. **Representation-ambiguous operations branch at runtime**: without type
//!    inference, operations whose meaning depends on Map vs Array vs string
//!    (subscripts, membership, `len`, `pop`, iteration) lower to immediately
//!    invoked arrows that branch on the actual representation, evaluating
//!    every operand exactly once.
//!
//! 4. **Synthesized names carry `$`**: every compiler-introduced binding
//!    (`$v`, `$tmp1`, `$c1`, …) contains a character the source language
//!    forbids in identifiers, so synthesized and user names never collide.
//!
//! 5. **Deterministic output**: allocation and emission order derive from
//!    declaration order, never hash-map iteration. The same callable graph
//!    emits byte-identical modules — and therefore identical content hashes —
//!    across runs and cache clears.

mod ast;
mod builtins;
mod constants;
mod emit;
mod error;
mod format_spec;
mod function;
mod js_ast;
mod methods;
mod scope;
mod visitor;

#[cfg(test)]
mod dispatch_tests;
#[cfg(test)]
mod emit_tests;
#[cfg(test)]
mod visitor_tests;

pub use ast::{
    AssignTarget, BindTarget, Callable, CallableId, ComprehensionKind, ConstId, ConstValue,
    FStringPart, Generator, GlobalBinding, ImportKind, PyBinOp, PyBoolOp, PyCmpOp, PyExpr,
    PyLiteral, PyStmt, PyUnaryOp, ScopeInfo,
};
pub use error::{CompileResult, CompilerError};
pub use function::{clear_caches, compile_callable, emit_bundle, emit_entry, EmittedModule};

// Exposed for embedding layers that post-process emitted text.
pub use emit::{print_expr, print_stmts};
pub use js_ast::{JsBinOp, JsExpr, JsStmt, JsUnaryOp};

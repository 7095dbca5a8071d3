//! Compiler error taxonomy.
//!
//! Every failure the compiler can produce is a `CompilerError` carrying a
//! stable code, a human-readable message, and the invariant the code guards.
//! There is no recovery: a violation aborts compilation of the offending
//! callable and, transitively, anything that depends on it. Output is
//! all-or-nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// A node variant, operator, or call pattern outside the accepted grammar.
pub const ERR_UNSUPPORTED: &str = "CF-ERR-UNSUPPORTED-001";
/// A free identifier that resolves to nothing the reference table knows about.
pub const ERR_SCOPE_UNRESOLVED: &str = "CF-ERR-SCOPE-001";
/// A nonlocal capture of mutable enclosing state.
pub const ERR_SCOPE_NONLOCAL: &str = "CF-ERR-SCOPE-002";
/// A malformed format specifier or unknown presentation type.
pub const ERR_FORMAT_SPEC: &str = "CF-ERR-FORMAT-001";
/// Underscore grouping, which the emulator does not support.
pub const ERR_FORMAT_GROUPING: &str = "CF-ERR-FORMAT-002";
/// `=` alignment applied to a non-numeric presentation type.
pub const ERR_FORMAT_ALIGN: &str = "CF-ERR-FORMAT-003";
/// Wrong argument count on a dispatched builtin or method.
pub const ERR_CALL_ARITY: &str = "CF-ERR-CALL-001";
/// Keyword arguments on a call form that has no keyword equivalent.
pub const ERR_CALL_KEYWORDS: &str = "CF-ERR-CALL-002";
/// An internal invariant violation (e.g. a cycle in the constant pool).
pub const ERR_INTERNAL: &str = "CF-ERR-INTERNAL-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_UNSUPPORTED => "Only the restricted, pure subset of the authoring language compiles.",
        ERR_SCOPE_UNRESOLVED => {
            "A compiled callable can only reach its parameters, its locals, and the reference table."
        }
        ERR_SCOPE_NONLOCAL => "Closures over mutable enclosing state are never shipped to the client.",
        ERR_FORMAT_SPEC => "Emitted formatting reproduces the authoring language byte-for-byte.",
        ERR_FORMAT_GROUPING => "Grouping supports only the comma separator.",
        ERR_FORMAT_ALIGN => "The '=' alignment is defined for numeric presentation types only.",
        ERR_CALL_ARITY => "Dispatched builtins are lowered with their exact runtime arity.",
        ERR_CALL_KEYWORDS => "Generic client-side calls have no keyword-argument syntax.",
        ERR_INTERNAL => "Constants are acyclic by construction.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    /// The offending construct or identifier, when one can be named.
    pub construct: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str) -> Self {
        Self::with_details(code, message, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        construct: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: "COMPILE_ERROR".to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            construct,
            hints,
        }
    }

    /// Unsupported-construct error naming the construct that was rejected.
    pub fn unsupported(construct: &str) -> Self {
        Self::with_details(
            ERR_UNSUPPORTED,
            &format!("Unsupported construct: {construct}"),
            Some(construct.to_string()),
            vec![
                "Only the restricted subset compiles to client-side JavaScript.".to_string(),
            ],
        )
    }

    /// Scope error naming the identifier that could not be resolved.
    pub fn unresolved(name: &str) -> Self {
        Self::with_details(
            ERR_SCOPE_UNRESOLVED,
            &format!("Name '{name}' is not a parameter, local, or registered global"),
            Some(name.to_string()),
            vec![
                "Thread module-level values through the callable's globals explicitly.".to_string(),
            ],
        )
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(construct) = &self.construct {
            write!(f, " ({construct})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

pub type CompileResult<T> = Result<T, CompilerError>;

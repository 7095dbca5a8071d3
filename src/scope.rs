//! Scope tracking and the reference table.
//!
//! The locals set is the compiler's record of "already declared": seeded with
//! parameters and explicitly threaded globals, it grows monotonically on
//! first assignment and lives for exactly one compilation pass. The reference
//! table is the only channel through which a body may touch anything outside
//! its own parameters and locals; it is built once per callable and read-only
//! during traversal.

use crate::js_ast::JsExpr;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// JavaScript reserved words and other names an emitted identifier must
    /// never collide with. Authoring-language identifiers that land here are
    /// suffixed with `$`.
    pub static ref JS_RESERVED: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for word in [
            "await", "break", "case", "catch", "class", "const", "continue", "debugger",
            "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally",
            "for", "function", "if", "implements", "import", "in", "instanceof", "interface",
            "let", "new", "null", "package", "private", "protected", "public", "return",
            "static", "super", "switch", "this", "throw", "true", "try", "typeof", "undefined",
            "var", "void", "while", "with", "yield",
            // Globals the emitted code itself leans on.
            "Array", "Boolean", "Error", "Infinity", "JSON", "Map", "Math", "NaN", "Number",
            "Object", "Set", "String",
        ] {
            s.insert(word);
        }
        s
    };

    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

/// Rewrite an authoring-language identifier so it is safe to emit.
pub fn safe_ident(name: &str) -> String {
    if JS_RESERVED.contains(name) {
        format!("{name}$")
    } else {
        name.to_string()
    }
}

/// Whether a provider-supplied name (import alias, host symbol) is emittable
/// as-is.
pub fn is_emittable_name(name: &str) -> bool {
    IDENT_RE.is_match(name) && !JS_RESERVED.contains(name)
}

/// The mutable "is declared" set for one compilation pass.
///
/// Declaredness is function-level even though declarations are emitted
/// block-nested, mirroring the authoring language's scoping: a name first
/// assigned inside a conditional is still the same variable afterwards.
#[derive(Debug, Default)]
pub struct LocalScope {
    declared: HashSet<String>,
}

impl LocalScope {
    /// Seed with parameters and explicitly threaded globals.
    pub fn seeded<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        LocalScope {
            declared: names.into_iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Record the first assignment. Returns true when this is a declaration.
    pub fn declare(&mut self, name: &str) -> bool {
        self.declared.insert(name.to_string())
    }

    /// Snapshot for comprehension chains, whose target bindings must not
    /// leak.
    pub fn snapshot(&self) -> HashSet<String> {
        self.declared.clone()
    }

    pub fn restore(&mut self, snapshot: HashSet<String>) {
        self.declared = snapshot;
    }
}

/// Free identifier → pre-built JavaScript expression. Missing entries are
/// scope errors, raised by the visitor at the point of reference.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    entries: HashMap<String, JsExpr>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, expr: JsExpr) {
        self.entries.insert(name.to_string(), expr);
    }

    pub fn lookup(&self, name: &str) -> Option<&JsExpr> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

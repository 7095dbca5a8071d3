//! The constant pool.
//!
//! Plain values referenced as module-level globals convert once into emitted
//! `const` declarations, deduplicated by identity: two callables holding the
//! same `Arc` share one definition. Dict constants emit as native `Map`
//! constructions and set constants as native `Set` constructions so `.get`,
//! `.keys`, and membership behave consistently with the authoring language;
//! the none value emits as `undefined`.

use crate::ast::{ConstId, ConstValue};
use crate::error::{CompileResult, CompilerError, ERR_INTERNAL};
use crate::js_ast::{self, JsExpr};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ConstantPool {
    names: HashMap<ConstId, String>,
    declarations: Vec<(String, JsExpr)>,
    next: usize,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.declarations.clear();
        self.next = 0;
    }

    /// Resolve a global constant to the identifier of its emitted
    /// declaration, converting and registering it on first sight.
    pub fn intern(&mut self, value: &Arc<ConstValue>) -> CompileResult<JsExpr> {
        let id = ConstId::of(value);
        if let Some(name) = self.names.get(&id) {
            return Ok(js_ast::ident(name));
        }
        self.next += 1;
        let name = format!("$c{}", self.next);
        let mut visiting = HashSet::new();
        let expr = convert(value, &mut visiting)?;
        self.names.insert(id, name.clone());
        self.declarations.push((name.clone(), expr));
        Ok(js_ast::ident(&name))
    }

    /// Emitted declarations in allocation order. Constants never reference
    /// each other (nested structure converts inline), so allocation order is
    /// already topological.
    pub fn declarations(&self) -> &[(String, JsExpr)] {
        &self.declarations
    }
}

/// Convert a plain value to its literal node. `visiting` guards against
/// cyclic data, which is an internal-invariant violation: constants are
/// acyclic by construction.
pub fn convert(value: &Arc<ConstValue>, visiting: &mut HashSet<ConstId>) -> CompileResult<JsExpr> {
    let id = ConstId::of(value);
    if !visiting.insert(id) {
        return Err(CompilerError::new(
            ERR_INTERNAL,
            "Cycle detected in constant structure",
        ));
    }
    let expr = match value.as_ref() {
        ConstValue::None => JsExpr::Undefined,
        ConstValue::Bool(b) => JsExpr::Bool(*b),
        ConstValue::Int(n) => JsExpr::Int(*n),
        ConstValue::Float(f) => JsExpr::Float(*f),
        ConstValue::Str(s) => js_ast::str_lit(s),
        ConstValue::List(items) | ConstValue::Tuple(items) => {
            let mut elems = Vec::with_capacity(items.len());
            for item in items {
                elems.push(convert(item, visiting)?);
            }
            JsExpr::Array(elems)
        }
        ConstValue::Dict(entries) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                pairs.push(JsExpr::Array(vec![
                    js_ast::str_lit(key),
                    convert(item, visiting)?,
                ]));
            }
            js_ast::new_expr("Map", vec![JsExpr::Array(pairs)])
        }
        ConstValue::Set(items) => {
            let mut elems = Vec::with_capacity(items.len());
            for item in items {
                elems.push(convert(item, visiting)?);
            }
            js_ast::new_expr("Set", vec![JsExpr::Array(elems)])
        }
    };
    visiting.remove(&id);
    Ok(expr)
}

//! Function wrappers, the process-wide registry, and module emission.
//!
//! Compiling a callable produces a `FunctionWrapper`: its emitted name, its
//! lowered body, and the identities of the callables, constants, and imports
//! it reaches. Wrappers live in one `Mutex`-guarded registry keyed by callable
//! identity, alongside the shared constant pool and import table, so repeated
//! emissions are cache hits and shared dependencies emit exactly once.
//!
//! Cyclic callable graphs are legal: a callable's emitted name is allocated
//! before its body compiles, and an in-progress marker stops the recursion
//! from re-entering it. Function declarations hoist in the target runtime, so
//! registration order is a valid emission order even across cycles.

use crate::ast::{Callable, CallableId, GlobalBinding, ImportKind};
use crate::builtins;
use crate::error::{CompileResult, CompilerError, ERR_INTERNAL, ERR_SCOPE_NONLOCAL};
use crate::js_ast::{ident, JsExpr, JsStmt};
use crate::scope::{is_emittable_name, safe_ident, ReferenceTable};
use crate::visitor::Lowerer;
use crate::{constants::ConstantPool, emit::print_stmts};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One emitted module: the text blob, its content hash, and the emitted name
/// of the entry function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmittedModule {
    pub source: String,
    pub hash: String,
    pub entry_name: String,
}

pub fn compute_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

type ImportKey = (String, String, ImportKind);

#[derive(Debug)]
struct FunctionWrapper {
    js_name: String,
    params: Vec<String>,
    body: Vec<JsStmt>,
    dependencies: Vec<CallableId>,
    constants: Vec<String>,
    imports: Vec<ImportKey>,
}

/// Collision-free emitted names: first claim wins the bare name, later
/// claims take a numeric suffix.
#[derive(Debug, Default)]
struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    fn allocate(&mut self, base: &str) -> String {
        let base = safe_ident(base);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}${n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn release(&mut self, name: &str) {
        self.taken.remove(name);
    }

    fn clear(&mut self) {
        self.taken.clear();
    }
}

/// Imports deduplicated by (module, name, kind); the first binding's local
/// name becomes the alias every later reference reuses.
#[derive(Debug, Default)]
struct ImportTable {
    aliases: HashMap<ImportKey, String>,
}

impl ImportTable {
    fn intern(&mut self, key: ImportKey, local: &str, names: &mut NameAllocator) -> String {
        if let Some(alias) = self.aliases.get(&key) {
            return alias.clone();
        }
        let alias = names.allocate(local);
        self.aliases.insert(key, alias.clone());
        alias
    }

    fn render(&self, key: &ImportKey) -> String {
        let (module, name, kind) = key;
        // Interned before render; the fallback never prints.
        let alias = self.aliases.get(key).cloned().unwrap_or_else(|| name.clone());
        match kind {
            ImportKind::Named if alias == *name => {
                format!("import {{ {name} }} from \"{module}\";")
            }
            ImportKind::Named => format!("import {{ {name} as {alias} }} from \"{module}\";"),
            ImportKind::Default => format!("import {alias} from \"{module}\";"),
            ImportKind::Namespace => format!("import * as {alias} from \"{module}\";"),
        }
    }

    fn clear(&mut self) {
        self.aliases.clear();
    }
}

#[derive(Debug, Default)]
struct Registry {
    wrappers: HashMap<CallableId, Arc<FunctionWrapper>>,
    js_names: HashMap<CallableId, String>,
    /// Keeps each cached callable alive; identity is its address, so the
    /// registry must pin the allocation for as long as the entry exists.
    retained: HashMap<CallableId, Arc<Callable>>,
    in_progress: HashSet<CallableId>,
    /// Registration order; dependencies registered before dependents except
    /// inside cycles, where hoisting covers the forward reference.
    order: Vec<CallableId>,
    names: NameAllocator,
    constants: ConstantPool,
    imports: ImportTable,
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::default());
}

fn lock_registry() -> std::sync::MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drop every cached wrapper, constant, and import. Compiled output is
/// deterministic, so a rebuild after clearing reproduces identical modules.
pub fn clear_caches() {
    let mut registry = lock_registry();
    registry.wrappers.clear();
    registry.js_names.clear();
    registry.retained.clear();
    registry.in_progress.clear();
    registry.order.clear();
    registry.names.clear();
    registry.constants.clear();
    registry.imports.clear();
}

/// Compile a callable (and its transitive dependencies) into the registry
/// without emitting. Subsequent emissions are cache hits.
pub fn compile_callable(callable: &Arc<Callable>) -> CompileResult<()> {
    let mut registry = lock_registry();
    compile_into(&mut registry, callable)
}

/// Compile and emit a single-entry module.
pub fn emit_entry(callable: &Arc<Callable>) -> CompileResult<EmittedModule> {
    let mut registry = lock_registry();
    compile_into(&mut registry, callable)?;
    let roots = [(CallableId::of(callable), callable.name.clone())];
    render_module(&registry, &roots, true)
}

/// Compile and emit one module covering several entry callables, sharing one
/// constant pool and import table. The trailing expression is a lookup object
/// keyed by the callables' source-level names.
pub fn emit_bundle(callables: &[Arc<Callable>]) -> CompileResult<EmittedModule> {
    if callables.is_empty() {
        return Err(CompilerError::with_details(
            ERR_INTERNAL,
            "emit_bundle requires at least one callable",
            None,
            vec![],
        ));
    }
    let mut registry = lock_registry();
    let mut roots = Vec::with_capacity(callables.len());
    for callable in callables {
        compile_into(&mut registry, callable)?;
        roots.push((CallableId::of(callable), callable.name.clone()));
    }
    render_module(&registry, &roots, false)
}

fn compile_into(registry: &mut Registry, callable: &Arc<Callable>) -> CompileResult<()> {
    let id = CallableId::of(callable);
    if registry.wrappers.contains_key(&id) || registry.in_progress.contains(&id) {
        return Ok(());
    }
    // The emitted name exists before the body compiles so cyclic references
    // resolve against it.
    allocated_name(registry, callable);
    registry.in_progress.insert(id);
    let built = build_wrapper(registry, callable);
    registry.in_progress.remove(&id);
    let wrapper = match built {
        Ok(wrapper) => wrapper,
        Err(err) => {
            purge(registry, id);
            return Err(err);
        }
    };
    log::debug!(
        "registered wrapper '{}' ({} dependencies, {} imports)",
        wrapper.js_name,
        wrapper.dependencies.len(),
        wrapper.imports.len()
    );
    registry.wrappers.insert(id, Arc::new(wrapper));
    registry.order.push(id);
    Ok(())
}

fn allocated_name(registry: &mut Registry, callable: &Arc<Callable>) -> String {
    let id = CallableId::of(callable);
    if let Some(name) = registry.js_names.get(&id) {
        return name.clone();
    }
    let name = registry.names.allocate(&callable.name);
    registry.js_names.insert(id, name.clone());
    registry.retained.insert(id, Arc::clone(callable));
    name
}

/// Evict a failed callable and everything registered that depends on it,
/// directly or through a cycle, releasing their names so a later compilation
/// starts clean.
fn purge(registry: &mut Registry, failed: CallableId) {
    let mut doomed: HashSet<CallableId> = HashSet::new();
    doomed.insert(failed);
    loop {
        let widened: Vec<CallableId> = registry
            .wrappers
            .iter()
            .filter(|&(id, wrapper)| {
                !doomed.contains(id) && wrapper.dependencies.iter().any(|d| doomed.contains(d))
            })
            .map(|(id, _)| *id)
            .collect();
        if widened.is_empty() {
            break;
        }
        doomed.extend(widened);
    }
    for id in &doomed {
        registry.wrappers.remove(id);
        registry.retained.remove(id);
        if let Some(name) = registry.js_names.remove(id) {
            registry.names.release(&name);
        }
    }
    registry.order.retain(|id| !doomed.contains(id));
}

fn build_wrapper(
    registry: &mut Registry,
    callable: &Arc<Callable>,
) -> CompileResult<FunctionWrapper> {
    if let Some(captured) = callable.scope.nonlocals.first() {
        return Err(CompilerError::with_details(
            ERR_SCOPE_NONLOCAL,
            &format!(
                "'{}' captures '{captured}' from an enclosing function scope",
                callable.name
            ),
            Some(captured.clone()),
            vec![
                "pass the value as a parameter or bind it at module scope".to_string(),
            ],
        ));
    }

    let mut refs = ReferenceTable::new();
    let mut dependencies = Vec::new();
    let mut constants = Vec::new();
    let mut imports = Vec::new();

    // A callable may call itself by name without carrying a binding for it;
    // the emitted named function resolves the reference.
    let self_name = allocated_name(registry, callable);
    if !callable.globals.contains_key(&callable.name) {
        refs.insert(&callable.name, ident(&self_name));
    }

    // `scope.globals` order drives every allocation, so emission is
    // deterministic run to run.
    for name in &callable.scope.globals {
        match callable.globals.get(name) {
            Some(GlobalBinding::Callable(dep)) => {
                compile_into(registry, dep)?;
                let dep_name = allocated_name(registry, dep);
                dependencies.push(CallableId::of(dep));
                refs.insert(name, ident(&dep_name));
            }
            Some(GlobalBinding::CallableRef(back_edge)) => {
                // A weak back edge is only valid while its target is alive.
                let dep = back_edge.upgrade().ok_or_else(|| CompilerError::unresolved(name))?;
                compile_into(registry, &dep)?;
                let dep_name = allocated_name(registry, &dep);
                dependencies.push(CallableId::of(&dep));
                refs.insert(name, ident(&dep_name));
            }
            Some(GlobalBinding::Constant(value)) => {
                // Scalars inline at their use sites; composites go through
                // the identity-deduplicated pool.
                match scalar_literal(value) {
                    Some(lit) => refs.insert(name, lit),
                    None => {
                        let pooled = registry.constants.intern(value)?;
                        if let JsExpr::Ident(pool_name) = &pooled {
                            constants.push(pool_name.clone());
                        }
                        refs.insert(name, pooled);
                    }
                }
            }
            Some(GlobalBinding::Import { module, name: symbol, kind }) => {
                // A named symbol prints verbatim inside the import statement.
                if *kind == ImportKind::Named && !is_emittable_name(symbol) {
                    return Err(CompilerError::unsupported(&format!(
                        "import of '{symbol}': not a plain identifier"
                    )));
                }
                let key = (module.clone(), symbol.clone(), *kind);
                let alias = registry
                    .imports
                    .intern(key.clone(), name, &mut registry.names);
                imports.push(key);
                refs.insert(name, ident(&alias));
            }
            None => {
                // Builtins resolve in call position without a binding.
                if !builtins::is_builtin(name) {
                    return Err(CompilerError::unresolved(name));
                }
            }
        }
    }

    let mut lowerer = Lowerer::new(&refs, &callable.params);
    let body = lowerer.lower_body(&callable.body)?;
    let params = callable.params.iter().map(|p| safe_ident(p)).collect();
    Ok(FunctionWrapper {
        js_name: self_name,
        params,
        body,
        dependencies,
        constants,
        imports,
    })
}

/// Inline form of a scalar constant, or `None` for composites.
fn scalar_literal(value: &crate::ast::ConstValue) -> Option<JsExpr> {
    use crate::ast::ConstValue;
    match value {
        ConstValue::None => Some(JsExpr::Undefined),
        ConstValue::Bool(b) => Some(JsExpr::Bool(*b)),
        ConstValue::Int(i) => Some(JsExpr::Int(*i)),
        ConstValue::Float(f) => Some(JsExpr::Float(*f)),
        ConstValue::Str(s) => Some(JsExpr::Str(s.clone())),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

fn render_module(
    registry: &Registry,
    roots: &[(CallableId, String)],
    single_entry: bool,
) -> CompileResult<EmittedModule> {
    let root_ids: Vec<CallableId> = roots.iter().map(|(id, _)| *id).collect();
    let reachable = reachable_from(registry, &root_ids);
    // Registration order restricted to the reachable set: dependencies ahead
    // of dependents, cycles covered by hoisting.
    let ordered: Vec<CallableId> = registry
        .order
        .iter()
        .filter(|id| reachable.contains(id))
        .copied()
        .collect();

    let mut stmts: Vec<JsStmt> = Vec::new();

    // Imports, first-seen order across the emitted wrappers.
    let mut seen_imports = HashSet::new();
    for id in &ordered {
        if let Some(wrapper) = registry.wrappers.get(id) {
            for key in &wrapper.imports {
                if seen_imports.insert(key.clone()) {
                    stmts.push(JsStmt::Raw(registry.imports.render(key)));
                }
            }
        }
    }

    // Constants actually reached, in allocation order.
    let used_constants: HashSet<&String> = ordered
        .iter()
        .filter_map(|id| registry.wrappers.get(id))
        .flat_map(|w| w.constants.iter())
        .collect();
    for (name, init) in registry.constants.declarations() {
        if used_constants.contains(name) {
            stmts.push(JsStmt::Const {
                name: name.clone(),
                init: init.clone(),
            });
        }
    }

    let entry = root_ids[0];
    // A single entry normally trails as a named function expression; when a
    // dependency calls back into it, it must be a hoisted declaration like
    // the rest, and the trailing expression is just its name.
    let entry_in_cycle = single_entry
        && ordered.iter().any(|id| {
            *id != entry
                && registry
                    .wrappers
                    .get(id)
                    .is_some_and(|w| w.dependencies.contains(&entry))
        });

    for id in &ordered {
        if single_entry && *id == entry && !entry_in_cycle {
            continue;
        }
        if let Some(wrapper) = registry.wrappers.get(id) {
            stmts.push(JsStmt::FunctionDecl {
                name: wrapper.js_name.clone(),
                params: wrapper.params.clone(),
                body: wrapper.body.clone(),
            });
        }
    }

    let entry_wrapper = registry.wrappers.get(&entry).ok_or_else(missing_wrapper)?;
    let entry_name = entry_wrapper.js_name.clone();

    if single_entry {
        let trailing = if entry_in_cycle {
            ident(&entry_name)
        } else {
            JsExpr::Function {
                name: Some(entry_name.clone()),
                params: entry_wrapper.params.clone(),
                body: entry_wrapper.body.clone(),
            }
        };
        stmts.push(JsStmt::Expr(trailing));
    } else {
        let mut entries = Vec::with_capacity(roots.len());
        for (id, source_name) in roots {
            let wrapper = registry.wrappers.get(id).ok_or_else(missing_wrapper)?;
            // Keyed by the source-level name so callers look up what they
            // registered, not the disambiguated emitted name.
            entries.push((source_name.clone(), ident(&wrapper.js_name)));
        }
        stmts.push(JsStmt::Expr(JsExpr::Object(entries)));
    }

    let source = print_stmts(&stmts);
    let hash = compute_hash(&source);
    log::debug!(
        "emitted module for '{entry_name}': {} bytes, {} functions",
        source.len(),
        ordered.len()
    );
    Ok(EmittedModule {
        source,
        hash,
        entry_name,
    })
}

fn missing_wrapper() -> CompilerError {
    CompilerError::with_details(
        ERR_INTERNAL,
        "entry wrapper missing from the registry after compilation",
        None,
        vec![],
    )
}

fn reachable_from(registry: &Registry, roots: &[CallableId]) -> HashSet<CallableId> {
    let mut reachable = HashSet::new();
    let mut stack: Vec<CallableId> = roots.to_vec();
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        if let Some(wrapper) = registry.wrappers.get(&id) {
            stack.extend(wrapper.dependencies.iter().copied());
        }
    }
    reachable
}

//! Syntax-directed lowering from the restricted input tree to JavaScript.
//!
//! A single pass with no type inference. Wherever a construct's meaning
//! depends on the runtime representation of its operands, the lowering defers
//! the decision to an emitted runtime branch instead of guessing; see
//! `methods` for the shared combinators. Scope is tracked only as
//! declaredness: the first assignment to a local emits `let`, every later one
//! a plain assignment, and loop and comprehension bindings follow the
//! function-scope rules of the source language rather than block scope.

use crate::ast::{
    AssignTarget, BindTarget, ComprehensionKind, FStringPart, Generator, PyBinOp, PyBoolOp,
    PyCmpOp, PyExpr, PyLiteral, PyStmt, PyUnaryOp,
};
use crate::builtins;
use crate::error::{
    CompileResult, CompilerError, ERR_CALL_ARITY, ERR_CALL_KEYWORDS, ERR_FORMAT_SPEC,
};
use crate::format_spec;
use crate::js_ast::{
    binop, call, ident, iife, iife_block, index, int, member, method_call, spread, str_lit,
    ternary, typeof_is, unop, ArrowBody, JsBinOp, JsExpr, JsStmt, JsUnaryOp,
};
use crate::methods;
use crate::scope::{safe_ident, LocalScope, ReferenceTable};

pub struct Lowerer<'a> {
    refs: &'a ReferenceTable,
    scope: LocalScope,
    tmp: usize,
}

impl<'a> Lowerer<'a> {
    pub fn new(refs: &'a ReferenceTable, params: &[String]) -> Self {
        Lowerer {
            refs,
            scope: LocalScope::seeded(params.iter().map(String::as_str)),
            tmp: 0,
        }
    }

    pub fn lower_body(&mut self, body: &[PyStmt]) -> CompileResult<Vec<JsStmt>> {
        self.block(body)
    }

    fn fresh(&mut self, stem: &str) -> String {
        self.tmp += 1;
        format!("${stem}{}", self.tmp)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPRESSIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn expr(&mut self, expr: &PyExpr) -> CompileResult<JsExpr> {
        match expr {
            PyExpr::Literal(lit) => Ok(literal(lit)),
            PyExpr::Name(name) => self.resolve(name),
            PyExpr::BinOp { left, op, right } => {
                let l = self.expr(left)?;
                let r = self.expr(right)?;
                Ok(binary(*op, l, r))
            }
            PyExpr::UnaryOp { op, operand } => match op {
                PyUnaryOp::Neg => Ok(unop(JsUnaryOp::Neg, self.expr(operand)?)),
                PyUnaryOp::Pos => Ok(unop(JsUnaryOp::Pos, self.expr(operand)?)),
                PyUnaryOp::Invert => Ok(unop(JsUnaryOp::BitNot, self.expr(operand)?)),
                PyUnaryOp::Not => Ok(unop(JsUnaryOp::Not, self.condition(operand)?)),
            },
            PyExpr::BoolOp { op, values } => self.bool_chain(*op, values),
            PyExpr::Compare {
                left,
                ops,
                comparators,
            } => self.compare(left, ops, comparators),
            PyExpr::IfExp { test, body, orelse } => Ok(ternary(
                self.condition(test)?,
                self.expr(body)?,
                self.expr(orelse)?,
            )),
            PyExpr::Call { func, args, kwargs } => self.call(func, args, kwargs),
            PyExpr::Attribute { value, attr } => Ok(member(self.expr(value)?, attr)),
            PyExpr::Subscript { value, index } => {
                Ok(methods::get_item(self.expr(value)?, self.expr(index)?))
            }
            PyExpr::Slice {
                value,
                lower,
                upper,
                step,
            } => self.slice(value, lower.as_deref(), upper.as_deref(), step.as_deref()),
            PyExpr::List(items) | PyExpr::Tuple(items) => Ok(JsExpr::Array(self.args(items)?)),
            PyExpr::Dict { keys, values } => {
                let mut pairs = Vec::with_capacity(keys.len());
                for (k, v) in keys.iter().zip(values) {
                    pairs.push(JsExpr::Array(vec![self.expr(k)?, self.expr(v)?]));
                }
                Ok(crate::js_ast::new_expr("Map", vec![JsExpr::Array(pairs)]))
            }
            PyExpr::Set(items) => Ok(crate::js_ast::new_expr(
                "Set",
                vec![JsExpr::Array(self.args(items)?)],
            )),
            PyExpr::Comprehension {
                kind,
                element,
                value,
                generators,
            } => self.comprehension(*kind, element, value.as_deref(), generators),
            PyExpr::FString(parts) => self.fstring(parts),
            PyExpr::Lambda { params, body } => {
                let saved = self.scope.snapshot();
                for p in params {
                    self.scope.declare(p);
                }
                let lowered = self.expr(body);
                self.scope.restore(saved);
                Ok(JsExpr::Arrow {
                    params: params.iter().map(|p| safe_ident(p)).collect(),
                    body: ArrowBody::Expr(Box::new(lowered?)),
                })
            }
            PyExpr::Starred(_) => Err(CompilerError::unsupported(
                "starred expression outside a call or display",
            )),
            PyExpr::Unsupported(name) => Err(CompilerError::unsupported(name)),
        }
    }

    /// A name in value position: locals shadow module-scope references.
    /// Builtins are resolvable only in call position.
    fn resolve(&self, name: &str) -> CompileResult<JsExpr> {
        if self.scope.is_declared(name) {
            return Ok(ident(&safe_ident(name)));
        }
        if let Some(bound) = self.refs.lookup(name) {
            return Ok(bound.clone());
        }
        Err(CompilerError::unresolved(name))
    }

    /// Condition position: wrap in the collection-aware truthiness adapter
    /// unless the expression is already boolean-valued.
    fn condition(&mut self, expr: &PyExpr) -> CompileResult<JsExpr> {
        let lowered = self.expr(expr)?;
        if self.statically_boolean(expr) {
            Ok(lowered)
        } else {
            Ok(builtins::truth_test(lowered))
        }
    }

    fn statically_boolean(&self, expr: &PyExpr) -> bool {
        match expr {
            PyExpr::Literal(PyLiteral::Bool(_)) => true,
            PyExpr::Compare { .. } => true,
            PyExpr::UnaryOp {
                op: PyUnaryOp::Not, ..
            } => true,
            PyExpr::BoolOp { values, .. } => values.iter().all(|v| self.statically_boolean(v)),
            PyExpr::Call { func, .. } => matches!(
                func.as_ref(),
                PyExpr::Name(n) if matches!(n.as_str(), "bool" | "all" | "any")
                    && self.is_free_builtin(n)
            ),
            _ => false,
        }
    }

    /// True when `name` reaches the builtin table: neither a local nor a
    /// module-scope reference shadows it.
    fn is_free_builtin(&self, name: &str) -> bool {
        !self.scope.is_declared(name) && !self.refs.contains(name) && builtins::is_builtin(name)
    }

    /// Sources that are statically known to lower to a plain array skip the
    /// iteration guard.
    fn statically_array(&self, expr: &PyExpr) -> bool {
        match expr {
            PyExpr::List(_) | PyExpr::Tuple(_) => true,
            PyExpr::Comprehension { kind, .. } => {
                matches!(kind, ComprehensionKind::List | ComprehensionKind::Generator)
            }
            PyExpr::Call { func, .. } => matches!(
                func.as_ref(),
                PyExpr::Name(n) if matches!(
                    n.as_str(),
                    "range" | "sorted" | "list" | "tuple" | "enumerate" | "zip" | "reversed"
                ) && self.is_free_builtin(n)
            ),
            _ => false,
        }
    }

    fn iter_source(&mut self, expr: &PyExpr) -> CompileResult<JsExpr> {
        let lowered = self.expr(expr)?;
        if self.statically_array(expr) {
            Ok(lowered)
        } else {
            Ok(methods::iter_guard(lowered))
        }
    }

    /// `and`/`or` keep their operand-returning semantics. Chains of
    /// boolean-valued operands use the native operators; anything else binds
    /// the left operand so the truthiness adapter and the result read the
    /// same evaluation.
    fn bool_chain(&mut self, op: PyBoolOp, values: &[PyExpr]) -> CompileResult<JsExpr> {
        if values.iter().all(|v| self.statically_boolean(v)) {
            let js_op = match op {
                PyBoolOp::And => JsBinOp::And,
                PyBoolOp::Or => JsBinOp::Or,
            };
            let mut lowered = self.expr(&values[0])?;
            for value in &values[1..] {
                lowered = binop(js_op, lowered, self.expr(value)?);
            }
            return Ok(lowered);
        }
        self.bool_chain_dynamic(op, values)
    }

    fn bool_chain_dynamic(&mut self, op: PyBoolOp, values: &[PyExpr]) -> CompileResult<JsExpr> {
        let first = self.expr(&values[0])?;
        if values.len() == 1 {
            return Ok(first);
        }
        let rest = self.bool_chain_dynamic(op, &values[1..])?;
        let test = builtins::truth_test(ident("$l"));
        let body = match op {
            PyBoolOp::And => ternary(test, rest, ident("$l")),
            PyBoolOp::Or => ternary(test, ident("$l"), rest),
        };
        Ok(iife(&["$l"], body, vec![first]))
    }

    fn compare(
        &mut self,
        left: &PyExpr,
        ops: &[PyCmpOp],
        comparators: &[PyExpr],
    ) -> CompileResult<JsExpr> {
        let lowered_left = self.expr(left)?;
        if ops.len() == 1 {
            let right = self.expr(&comparators[0])?;
            return Ok(cmp(ops[0], lowered_left, right));
        }
        // Chained form: middle operands evaluate exactly once, bound as
        // arguments of an immediately invoked arrow.
        let mut params: Vec<String> = Vec::new();
        let mut bound: Vec<JsExpr> = Vec::new();
        let mut terms: Vec<JsExpr> = Vec::new();
        let mut lhs = lowered_left;
        for (i, (op, comparator)) in ops.iter().zip(comparators).enumerate() {
            let rhs = if i + 1 == ops.len() {
                self.expr(comparator)?
            } else {
                let name = format!("$m{}", i + 1);
                bound.push(self.expr(comparator)?);
                params.push(name.clone());
                ident(&name)
            };
            terms.push(cmp(*op, lhs, rhs.clone()));
            lhs = rhs;
        }
        let mut joined = terms.remove(0);
        for term in terms {
            joined = binop(JsBinOp::And, joined, term);
        }
        let param_refs: Vec<&str> = params.iter().map(String::as_str).collect();
        Ok(iife(&param_refs, joined, bound))
    }

    // ── calls ──────────────────────────────────────────────────────────────────

    fn call(
        &mut self,
        func: &PyExpr,
        args: &[PyExpr],
        kwargs: &[(String, PyExpr)],
    ) -> CompileResult<JsExpr> {
        if let PyExpr::Attribute { value, attr } = func {
            let object = self.expr(value)?;
            let lowered_args = self.args(args)?;
            let lowered_kwargs = self.kwargs(kwargs)?;
            return match methods::lower_method(
                object.clone(),
                attr,
                lowered_args.clone(),
                lowered_kwargs,
            )? {
                Some(expr) => Ok(expr),
                None => {
                    if !kwargs.is_empty() {
                        return Err(keyword_error(attr));
                    }
                    Ok(call(member(object, attr), lowered_args))
                }
            };
        }

        if let PyExpr::Name(name) = func {
            if name == "format" && self.is_free_builtin(name) {
                return self.format_call(args, kwargs);
            }
            if self.scope.is_declared(name) || self.refs.contains(name) {
                let callee = self.resolve(name)?;
                return self.opaque_call(name, callee, args, kwargs);
            }
            if builtins::is_builtin(name) {
                let lowered_args = self.args(args)?;
                let lowered_kwargs = self.kwargs(kwargs)?;
                return builtins::lower_builtin(name, args, lowered_args, lowered_kwargs);
            }
            return Err(CompilerError::unresolved(name));
        }

        let callee = self.expr(func)?;
        self.opaque_call("<expression>", callee, args, kwargs)
    }

    /// A call whose target the compiler has no table for: compiled functions,
    /// imports, locals, lambdas. Positional arguments only.
    fn opaque_call(
        &mut self,
        display: &str,
        callee: JsExpr,
        args: &[PyExpr],
        kwargs: &[(String, PyExpr)],
    ) -> CompileResult<JsExpr> {
        if !kwargs.is_empty() {
            return Err(keyword_error(display));
        }
        Ok(call(callee, self.args(args)?))
    }

    /// `format(value)` and `format(value, spec)`. The spec must resolve to a
    /// string at compile time so the formatter specializes fully.
    fn format_call(&mut self, args: &[PyExpr], kwargs: &[(String, PyExpr)]) -> CompileResult<JsExpr> {
        if !kwargs.is_empty() {
            return Err(keyword_error("format"));
        }
        match args {
            [value] => Ok(call(ident("String"), vec![self.expr(value)?])),
            [value, spec] => {
                let Some(spec_text) = self.literal_spec(spec) else {
                    return Err(CompilerError::with_details(
                        ERR_FORMAT_SPEC,
                        "format() requires a compile-time-constant spec string",
                        Some("format".to_string()),
                        vec![],
                    ));
                };
                let lowered = self.expr(value)?;
                format_spec::compile_format(lowered, &spec_text)
            }
            _ => Err(CompilerError::with_details(
                ERR_CALL_ARITY,
                &format!("'format' expects 1 or 2 arguments, got {}", args.len()),
                Some("format".to_string()),
                vec![],
            )),
        }
    }

    /// A spec expression that is a literal, or a module-scope reference that
    /// resolved to a string.
    fn literal_spec(&self, expr: &PyExpr) -> Option<String> {
        match expr {
            PyExpr::Literal(PyLiteral::Str(s)) => Some(s.clone()),
            PyExpr::Name(name) if !self.scope.is_declared(name) => {
                match self.refs.lookup(name) {
                    Some(JsExpr::Str(s)) => Some(s.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn args(&mut self, args: &[PyExpr]) -> CompileResult<Vec<JsExpr>> {
        args.iter()
            .map(|arg| match arg {
                PyExpr::Starred(inner) => Ok(spread(self.expr(inner)?)),
                other => self.expr(other),
            })
            .collect()
    }

    fn kwargs(&mut self, kwargs: &[(String, PyExpr)]) -> CompileResult<Vec<(String, JsExpr)>> {
        kwargs
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.expr(value)?)))
            .collect()
    }

    // ── slices ─────────────────────────────────────────────────────────────────

    fn slice(
        &mut self,
        value: &PyExpr,
        lower: Option<&PyExpr>,
        upper: Option<&PyExpr>,
        step: Option<&PyExpr>,
    ) -> CompileResult<JsExpr> {
        let lowered = self.expr(value)?;
        let Some(step) = step else {
            // Stepless slices map straight onto `.slice`, which shares the
            // negative-bound convention.
            let args = match (lower, upper) {
                (None, None) => vec![],
                (Some(l), None) => vec![self.expr(l)?],
                (l, Some(u)) => {
                    let low = match l {
                        Some(l) => self.expr(l)?,
                        None => int(0),
                    };
                    vec![low, self.expr(u)?]
                }
            };
            return Ok(method_call(lowered, "slice", args));
        };

        if lower.is_none() && upper.is_none() && literal_int(step) == Some(-1) {
            // Full reversal, with the string form rejoined.
            let reversed = |v: JsExpr| method_call(JsExpr::Array(vec![spread(v)]), "reverse", vec![]);
            return Ok(iife(
                &["$v"],
                ternary(
                    typeof_is(ident("$v"), "string"),
                    method_call(reversed(ident("$v")), "join", vec![str_lit("")]),
                    reversed(ident("$v")),
                ),
                vec![lowered],
            ));
        }

        let low = match lower {
            Some(l) => self.expr(l)?,
            None => JsExpr::Undefined,
        };
        let high = match upper {
            Some(u) => self.expr(u)?,
            None => JsExpr::Undefined,
        };
        let step_expr = self.expr(step)?;
        Ok(iife_block(
            &["$v", "$b", "$e", "$s"],
            stepped_slice_body(),
            vec![lowered, low, high, step_expr],
        ))
    }

    // ── comprehensions ─────────────────────────────────────────────────────────

    fn comprehension(
        &mut self,
        kind: ComprehensionKind,
        element: &PyExpr,
        value: Option<&PyExpr>,
        generators: &[Generator],
    ) -> CompileResult<JsExpr> {
        let saved = self.scope.snapshot();
        let chain = self.generator_chain(element, value, generators);
        self.scope.restore(saved);
        let chain = chain?;
        Ok(match kind {
            ComprehensionKind::List | ComprehensionKind::Generator => chain,
            ComprehensionKind::Set => crate::js_ast::new_expr("Set", vec![chain]),
            ComprehensionKind::Dict => crate::js_ast::new_expr("Map", vec![chain]),
        })
    }

    fn generator_chain(
        &mut self,
        element: &PyExpr,
        value: Option<&PyExpr>,
        generators: &[Generator],
    ) -> CompileResult<JsExpr> {
        let generator = &generators[0];
        // The source sees the scope before this clause binds its target.
        let mut chain = self.iter_source(&generator.iter)?;
        let param = self.bind_param(&generator.target);
        for cond in &generator.ifs {
            let test = self.condition(cond)?;
            chain = method_call(chain, "filter", vec![comp_arrow(&param, test)]);
        }
        if generators.len() > 1 {
            let inner = self.generator_chain(element, value, &generators[1..])?;
            return Ok(method_call(chain, "flatMap", vec![comp_arrow(&param, inner)]));
        }
        let projected = match value {
            // Dict comprehensions project entry pairs for the Map constructor.
            Some(v) => JsExpr::Array(vec![self.expr(element)?, self.expr(v)?]),
            None => self.expr(element)?,
        };
        Ok(method_call(chain, "map", vec![comp_arrow(&param, projected)]))
    }

    /// Declare a binding target and render its parameter pattern.
    fn bind_param(&mut self, target: &BindTarget) -> String {
        match target {
            BindTarget::Name(name) => {
                self.scope.declare(name);
                safe_ident(name)
            }
            BindTarget::Tuple(names) => {
                for name in names {
                    self.scope.declare(name);
                }
                let rendered: Vec<String> = names.iter().map(|n| safe_ident(n)).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }

    // ── interpolated strings ───────────────────────────────────────────────────

    fn fstring(&mut self, parts: &[FStringPart]) -> CompileResult<JsExpr> {
        // A lone formatted field is already a string; skip the template.
        if let [FStringPart::Field {
            value,
            conversion,
            spec: Some(spec),
        }] = parts
        {
            let lowered = self.field_value(value, *conversion)?;
            return format_spec::compile_format(lowered, spec);
        }

        let mut literals = vec![String::new()];
        let mut exprs = Vec::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => {
                    if let Some(last) = literals.last_mut() {
                        last.push_str(text);
                    }
                }
                FStringPart::Field {
                    value,
                    conversion,
                    spec,
                } => {
                    let mut lowered = self.field_value(value, *conversion)?;
                    if let Some(spec) = spec {
                        lowered = format_spec::compile_format(lowered, spec)?;
                    }
                    exprs.push(lowered);
                    literals.push(String::new());
                }
            }
        }
        Ok(JsExpr::Template {
            parts: literals,
            exprs,
        })
    }

    fn field_value(&mut self, value: &PyExpr, conversion: Option<char>) -> CompileResult<JsExpr> {
        let lowered = self.expr(value)?;
        Ok(match conversion {
            Some('r') => method_call(ident("JSON"), "stringify", vec![lowered]),
            Some(_) => call(ident("String"), vec![lowered]),
            None => lowered,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn block(&mut self, stmts: &[PyStmt]) -> CompileResult<Vec<JsStmt>> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    fn stmt(&mut self, stmt: &PyStmt, out: &mut Vec<JsStmt>) -> CompileResult<()> {
        match stmt {
            PyStmt::Expr(expr) => {
                // Docstrings and other bare literals have no effect.
                if !matches!(expr, PyExpr::Literal(_)) {
                    let lowered = self.expr(expr)?;
                    out.push(JsStmt::Expr(lowered));
                }
            }
            PyStmt::Assign { target, value } => self.assign(target, value, out)?,
            PyStmt::AnnAssign { target, value } => match value {
                Some(value) => self.assign(&AssignTarget::Name(target.clone()), value, out)?,
                None => {
                    if self.scope.declare(target) {
                        out.push(JsStmt::Let {
                            name: safe_ident(target),
                            init: None,
                        });
                    }
                }
            },
            PyStmt::AugAssign { target, op, value } => self.aug_assign(target, *op, value, out)?,
            PyStmt::If { test, body, orelse } => {
                let test = self.condition(test)?;
                let cons = self.block(body)?;
                let alt = if orelse.is_empty() {
                    None
                } else {
                    Some(self.block(orelse)?)
                };
                out.push(JsStmt::If { test, cons, alt });
            }
            PyStmt::While { test, body } => {
                let test = self.condition(test)?;
                let body = self.block(body)?;
                out.push(JsStmt::While { test, body });
            }
            PyStmt::For { target, iter, body } => self.for_loop(target, iter, body, out)?,
            PyStmt::Return(value) => {
                let lowered = match value {
                    Some(value) => Some(self.expr(value)?),
                    None => None,
                };
                out.push(JsStmt::Return(lowered));
            }
            PyStmt::Break => out.push(JsStmt::Break),
            PyStmt::Continue => out.push(JsStmt::Continue),
            PyStmt::Pass => {}
            PyStmt::Delete { value, index } => {
                let object = self.expr(value)?;
                let key = self.expr(index)?;
                out.push(JsStmt::Expr(methods::del_item(object, key)));
            }
            PyStmt::Unsupported(name) => return Err(CompilerError::unsupported(name)),
        }
        Ok(())
    }

    fn assign(
        &mut self,
        target: &AssignTarget,
        value: &PyExpr,
        out: &mut Vec<JsStmt>,
    ) -> CompileResult<()> {
        // The right-hand side sees the pre-assignment scope.
        let lowered = self.expr(value)?;
        match target {
            AssignTarget::Name(name) => {
                if self.scope.declare(name) {
                    out.push(JsStmt::Let {
                        name: safe_ident(name),
                        init: Some(lowered),
                    });
                } else {
                    out.push(JsStmt::Assign {
                        target: ident(&safe_ident(name)),
                        op: None,
                        value: lowered,
                    });
                }
            }
            AssignTarget::Tuple(names) => self.tuple_assign(names, lowered, out),
            AssignTarget::Subscript { value: obj, index } => {
                let object = self.expr(obj)?;
                let key = self.expr(index)?;
                out.push(JsStmt::Expr(methods::set_item(object, key, lowered)));
            }
            AssignTarget::Attribute { value: obj, attr } => {
                let object = self.expr(obj)?;
                out.push(JsStmt::Assign {
                    target: member(object, attr),
                    op: None,
                    value: lowered,
                });
            }
        }
        Ok(())
    }

    fn tuple_assign(&mut self, names: &[String], value: JsExpr, out: &mut Vec<JsStmt>) {
        let all_fresh = names.iter().all(|n| !self.scope.is_declared(n));
        if all_fresh {
            let rendered: Vec<String> = names
                .iter()
                .map(|n| {
                    self.scope.declare(n);
                    safe_ident(n)
                })
                .collect();
            out.push(JsStmt::Let {
                name: format!("[{}]", rendered.join(", ")),
                init: Some(value),
            });
            return;
        }
        // Mixed fresh and reassigned names: bind once, then assign by index.
        let tmp = self.fresh("tmp");
        out.push(JsStmt::Const {
            name: tmp.clone(),
            init: value,
        });
        for (i, name) in names.iter().enumerate() {
            let element = index(ident(&tmp), int(i as i64));
            if self.scope.declare(name) {
                out.push(JsStmt::Let {
                    name: safe_ident(name),
                    init: Some(element),
                });
            } else {
                out.push(JsStmt::Assign {
                    target: ident(&safe_ident(name)),
                    op: None,
                    value: element,
                });
            }
        }
    }

    fn aug_assign(
        &mut self,
        target: &AssignTarget,
        op: PyBinOp,
        value: &PyExpr,
        out: &mut Vec<JsStmt>,
    ) -> CompileResult<()> {
        let rhs = self.expr(value)?;
        match target {
            AssignTarget::Name(name) => {
                if !self.scope.is_declared(name) {
                    return Err(CompilerError::unresolved(name));
                }
                let target = ident(&safe_ident(name));
                match compound_op(op) {
                    Some(js_op) => out.push(JsStmt::Assign {
                        target,
                        op: Some(js_op),
                        value: rhs,
                    }),
                    // Floor division and modulo have no faithful compound form.
                    None => {
                        let value = binary(op, target.clone(), rhs);
                        out.push(JsStmt::Assign {
                            target,
                            op: None,
                            value,
                        });
                    }
                }
            }
            AssignTarget::Subscript { value: obj, index } => {
                let object_tmp = self.fresh("tmp");
                let key_tmp = self.fresh("tmp");
                out.push(JsStmt::Const {
                    name: object_tmp.clone(),
                    init: self.expr(obj)?,
                });
                out.push(JsStmt::Const {
                    name: key_tmp.clone(),
                    init: self.expr(index)?,
                });
                let current = methods::get_item(ident(&object_tmp), ident(&key_tmp));
                let updated = binary(op, current, rhs);
                out.push(JsStmt::Expr(methods::set_item(
                    ident(&object_tmp),
                    ident(&key_tmp),
                    updated,
                )));
            }
            AssignTarget::Attribute { value: obj, attr } => {
                let target = member(self.expr(obj)?, attr);
                match compound_op(op) {
                    Some(js_op) => out.push(JsStmt::Assign {
                        target,
                        op: Some(js_op),
                        value: rhs,
                    }),
                    None => {
                        let value = binary(op, target.clone(), rhs);
                        out.push(JsStmt::Assign {
                            target,
                            op: None,
                            value,
                        });
                    }
                }
            }
            AssignTarget::Tuple(_) => {
                return Err(CompilerError::unsupported("augmented tuple assignment"))
            }
        }
        Ok(())
    }

    fn for_loop(
        &mut self,
        target: &BindTarget,
        iter: &PyExpr,
        body: &[PyStmt],
        out: &mut Vec<JsStmt>,
    ) -> CompileResult<()> {
        let source = self.iter_source(iter)?;
        // Loop bindings survive the loop, so fresh names are declared ahead
        // of it and the loop head assigns without `let`.
        let js_target = match target {
            BindTarget::Name(name) => {
                if self.scope.declare(name) {
                    out.push(JsStmt::Let {
                        name: safe_ident(name),
                        init: None,
                    });
                }
                ident(&safe_ident(name))
            }
            BindTarget::Tuple(names) => {
                let mut elements = Vec::with_capacity(names.len());
                for name in names {
                    if self.scope.declare(name) {
                        out.push(JsStmt::Let {
                            name: safe_ident(name),
                            init: None,
                        });
                    }
                    elements.push(ident(&safe_ident(name)));
                }
                JsExpr::Array(elements)
            }
        };
        let body = self.block(body)?;
        out.push(JsStmt::ForOf {
            decl: None,
            target: js_target,
            iter: source,
            body,
        });
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATOR LOWERINGS
// ═══════════════════════════════════════════════════════════════════════════════

fn literal(lit: &PyLiteral) -> JsExpr {
    match lit {
        PyLiteral::None => JsExpr::Undefined,
        PyLiteral::Bool(b) => JsExpr::Bool(*b),
        PyLiteral::Int(i) => JsExpr::Int(*i),
        PyLiteral::Float(f) => JsExpr::Float(*f),
        PyLiteral::Str(s) => JsExpr::Str(s.clone()),
    }
}

/// Binary operators. Floor division and the sign-correcting remainder have no
/// direct operator and lower through `Math.floor` and a bound-argument arrow.
fn binary(op: PyBinOp, left: JsExpr, right: JsExpr) -> JsExpr {
    match op {
        PyBinOp::FloorDiv => call(
            member(ident("Math"), "floor"),
            vec![binop(JsBinOp::Div, left, right)],
        ),
        PyBinOp::Mod => iife(
            &["$a", "$b"],
            binop(
                JsBinOp::Mod,
                binop(
                    JsBinOp::Add,
                    binop(JsBinOp::Mod, ident("$a"), ident("$b")),
                    ident("$b"),
                ),
                ident("$b"),
            ),
            vec![left, right],
        ),
        other => binop(map_binop(other), left, right),
    }
}

fn map_binop(op: PyBinOp) -> JsBinOp {
    match op {
        PyBinOp::Add => JsBinOp::Add,
        PyBinOp::Sub => JsBinOp::Sub,
        PyBinOp::Mul => JsBinOp::Mul,
        PyBinOp::Div => JsBinOp::Div,
        PyBinOp::Pow => JsBinOp::Pow,
        PyBinOp::BitAnd => JsBinOp::BitAnd,
        PyBinOp::BitOr => JsBinOp::BitOr,
        PyBinOp::BitXor => JsBinOp::BitXor,
        PyBinOp::Shl => JsBinOp::Shl,
        PyBinOp::Shr => JsBinOp::Shr,
        PyBinOp::FloorDiv | PyBinOp::Mod => unreachable!("lowered in binary()"),
    }
}

/// Operators with a faithful compound-assignment form.
fn compound_op(op: PyBinOp) -> Option<JsBinOp> {
    match op {
        PyBinOp::FloorDiv | PyBinOp::Mod => None,
        other => Some(map_binop(other)),
    }
}

fn cmp(op: PyCmpOp, left: JsExpr, right: JsExpr) -> JsExpr {
    match op {
        PyCmpOp::Eq | PyCmpOp::Is => binop(JsBinOp::StrictEq, left, right),
        PyCmpOp::NotEq | PyCmpOp::IsNot => binop(JsBinOp::StrictNeq, left, right),
        PyCmpOp::Lt => binop(JsBinOp::Lt, left, right),
        PyCmpOp::LtE => binop(JsBinOp::LtE, left, right),
        PyCmpOp::Gt => binop(JsBinOp::Gt, left, right),
        PyCmpOp::GtE => binop(JsBinOp::GtE, left, right),
        PyCmpOp::In => methods::contains(right, left),
        PyCmpOp::NotIn => unop(JsUnaryOp::Not, methods::contains(right, left)),
    }
}

fn comp_arrow(param: &str, body: JsExpr) -> JsExpr {
    JsExpr::Arrow {
        params: vec![param.to_string()],
        body: ArrowBody::Expr(Box::new(body)),
    }
}

fn keyword_error(display: &str) -> CompilerError {
    CompilerError::with_details(
        ERR_CALL_KEYWORDS,
        &format!("Keyword arguments are not supported when calling '{display}'"),
        Some(display.to_string()),
        vec![],
    )
}

fn literal_int(expr: &PyExpr) -> Option<i64> {
    match expr {
        PyExpr::Literal(PyLiteral::Int(i)) => Some(*i),
        PyExpr::UnaryOp {
            op: PyUnaryOp::Neg,
            operand,
        } => match operand.as_ref() {
            PyExpr::Literal(PyLiteral::Int(i)) => Some(-i),
            _ => None,
        },
        _ => None,
    }
}

/// Body of the general stepped-slice arrow: clamp both bounds the way the
/// source language does, walk by `$s`, and rejoin strings.
fn stepped_slice_body() -> Vec<JsStmt> {
    let clamp = |bound: &str, empty_default: JsExpr| {
        // bound === undefined ? <default> : bound < 0 ? max($n + bound, floor)
        //                                             : min(bound, ceiling)
        let b = || ident(bound);
        let down = || ident("$down");
        let floor = ternary(down(), int(-1), int(0));
        let ceiling = ternary(
            down(),
            binop(JsBinOp::Sub, ident("$n"), int(1)),
            ident("$n"),
        );
        ternary(
            binop(JsBinOp::StrictEq, b(), JsExpr::Undefined),
            empty_default,
            ternary(
                binop(JsBinOp::Lt, b(), int(0)),
                call(
                    member(ident("Math"), "max"),
                    vec![binop(JsBinOp::Add, ident("$n"), b()), floor],
                ),
                call(member(ident("Math"), "min"), vec![b(), ceiling]),
            ),
        )
    };
    let start_default = ternary(
        ident("$down"),
        binop(JsBinOp::Sub, ident("$n"), int(1)),
        int(0),
    );
    let stop_default = ternary(ident("$down"), int(-1), ident("$n"));
    vec![
        JsStmt::Const {
            name: "$n".to_string(),
            init: member(ident("$v"), "length"),
        },
        JsStmt::Const {
            name: "$down".to_string(),
            init: binop(JsBinOp::Lt, ident("$s"), int(0)),
        },
        JsStmt::Let {
            name: "$i".to_string(),
            init: Some(clamp("$b", start_default)),
        },
        JsStmt::Const {
            name: "$stop".to_string(),
            init: clamp("$e", stop_default),
        },
        JsStmt::Const {
            name: "$out".to_string(),
            init: JsExpr::Array(vec![]),
        },
        JsStmt::While {
            test: ternary(
                ident("$down"),
                binop(JsBinOp::Gt, ident("$i"), ident("$stop")),
                binop(JsBinOp::Lt, ident("$i"), ident("$stop")),
            ),
            body: vec![
                JsStmt::Expr(method_call(
                    ident("$out"),
                    "push",
                    vec![index(ident("$v"), ident("$i"))],
                )),
                JsStmt::Assign {
                    target: ident("$i"),
                    op: Some(JsBinOp::Add),
                    value: ident("$s"),
                },
            ],
        },
        JsStmt::Return(Some(ternary(
            typeof_is(ident("$v"), "string"),
            method_call(ident("$out"), "join", vec![str_lit("")]),
            ident("$out"),
        ))),
    ]
}

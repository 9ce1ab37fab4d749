//! The tree-walking evaluator: `Expr`/`Stmt` dispatch, the `Evaluator`
//! struct, and every piece of call-site state it carries (`spec.md` §4,
//! component C9).
//!
//! No direct teacher analogue — ouros evaluates compiled bytecode, not an
//! AST. The shape here (one struct owning every piece of cross-cutting
//! state — memo cache, context registry, resource tracker, print sink,
//! tracer — with a `match`-per-node-kind dispatcher) follows the teacher's
//! own `Runner`, which plays the identical role for its bytecode VM.

use std::{collections::HashMap, rc::Rc};

use indexmap::IndexMap;

use crate::{
    context::ContextRegistry,
    decorator::DecoratorSpec,
    environment::{EnvRef, Environment},
    error::{ErrorKind, RunError, RunResult},
    expressions::{BinaryOp, Expr, MatchCase, Stmt},
    function::{self, Function, FunctionBody},
    io::PrintWriter,
    ops, pipe,
    pipeline::{self, BidirectionalPipeline, Pipeline},
    promise, resource,
    signature::{Param, Signature},
    tracer::{TraceEvent, VmTracer},
    value::{Value, deep_equal},
};

/// Owns every piece of state that outlives a single expression evaluation:
/// the call-depth guard, the declared-context registry, the `#memo` cache,
/// custom decorator definitions, the configured output sink and tracer, and
/// the in-flight `return` signal (`spec.md` §4.2 step 6).
pub struct Evaluator {
    /// A fallback environment for builtins that need to construct an
    /// environment-carrying value (e.g. `Pipeline.from`) without one handed
    /// to them — builtins receive only their arguments, never a lexical
    /// scope (`spec.md` §6 kernel builtin contracts).
    global_env: EnvRef,
    contexts: ContextRegistry,
    custom_decorators: HashMap<String, Rc<Function>>,
    memo: HashMap<(usize, String), Value>,
    resources: resource::ResourceTracker,
    print: Box<dyn PrintWriter>,
    /// Depth of nested `#pure` wrapping currently in effect; `print_line`
    /// emits a warning instead of real output while this is nonzero
    /// (`spec.md` §4.6 `#pure`).
    pure_depth: usize,
    tracer: Box<dyn VmTracer>,
    /// Set by `Expr::ReturnExpr` and consumed at the nearest enclosing
    /// function-call boundary (`function.rs::run_body`). `return` is
    /// deliberately never represented as a `RunError` — see `error.rs`'s
    /// module doc — so decorators like `retry` can never observe or catch
    /// it; it only ever escapes as far as a sequence of statements lets it.
    pending_return: Option<Value>,
    /// Names bound by `#export` (`spec.md` §4.6); `spec.md` documents this
    /// as a module-layer marker with no required runtime effect, but making
    /// the exported value visible at the top level is the only way for that
    /// marker to mean anything observable in a single-file program, so we
    /// also bind it into the root environment.
    exports: HashMap<String, Value>,
    /// Whether `run_async` (rather than `run`) is driving this evaluation
    /// (`spec.md` §4.8's "two faithful paths"). On the async path a pipe
    /// whose left side is a promise is forced immediately instead of
    /// building a second, deferred promise.
    async_mode: bool,
}

impl Evaluator {
    #[must_use]
    pub fn new(limits: resource::ResourceLimits, print: Box<dyn PrintWriter>, tracer: Box<dyn VmTracer>) -> Self {
        Self {
            global_env: Environment::root(),
            contexts: ContextRegistry::default(),
            custom_decorators: HashMap::new(),
            memo: HashMap::new(),
            resources: resource::ResourceTracker::new(limits),
            print,
            pure_depth: 0,
            tracer,
            pending_return: None,
            exports: HashMap::new(),
            async_mode: false,
        }
    }

    #[must_use]
    pub fn global_env(&self) -> &EnvRef {
        &self.global_env
    }

    pub fn resources_mut(&mut self) -> &mut resource::ResourceTracker {
        &mut self.resources
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut ContextRegistry {
        &mut self.contexts
    }

    #[must_use]
    pub fn call_depth(&self) -> usize {
        self.resources.depth()
    }

    pub fn trace(&mut self, event: TraceEvent) {
        self.tracer.on_event(event);
    }

    pub fn print_line(&mut self, line: &str) {
        if self.pure_depth > 0 {
            self.print.write_line(&format!("[pure] print suppressed: {line}"));
        } else {
            self.print.write_line(line);
        }
    }

    /// Enters a `#pure` region, returning a token to restore with
    /// `restore_print`. Nests correctly: a `#pure` function calling another
    /// `#pure` function still suppresses output for the whole span.
    pub fn suppress_print(&mut self) -> usize {
        self.pure_depth += 1;
        self.pure_depth
    }

    pub fn restore_print(&mut self, previous: usize) {
        self.pure_depth = previous - 1;
    }

    #[must_use]
    pub fn memo_get(&self, key: &(usize, String)) -> Option<Value> {
        self.memo.get(key).cloned()
    }

    pub fn memo_set(&mut self, key: (usize, String), value: Value) {
        self.memo.insert(key, value);
    }

    pub fn lookup_custom_decorator(&self, name: &str) -> Option<Rc<Function>> {
        self.custom_decorators.get(name).cloned()
    }

    pub fn export_global(&mut self, name: &str, value: Value) {
        self.exports.insert(name.to_owned(), value.clone());
        self.global_env.borrow_mut().define(name.to_owned(), value, false);
    }

    #[must_use]
    pub fn exports(&self) -> &HashMap<String, Value> {
        &self.exports
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.async_mode
    }

    pub fn set_async(&mut self, value: bool) {
        self.async_mode = value;
    }

    /// Takes the pending `return` value, if one is in flight. Consumed
    /// exactly once per function-call boundary (`function.rs::run_body`).
    pub fn take_pending_return(&mut self) -> Option<Value> {
        self.pending_return.take()
    }

    /// Calls any callable `Value` with a uniform convention, regardless of
    /// its concrete kind (`spec.md` §3: functions, pipelines, reversible
    /// functions, and overload sets are all "callable").
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> RunResult<Value> {
        match callee {
            Value::Function(f) => function::apply(self, f, args),
            Value::Builtin(b) => (b.func)(self, args),
            Value::Native(native) => {
                let mut native = Rc::clone(native);
                let result = native.borrow_mut()(self, args);
                drop(native);
                result
            }
            Value::OverloadSet(set) => resolve_overload(self, set, args),
            Value::Pipeline(p) => pipeline::apply(self, p, args),
            Value::BidirectionalPipeline(p) => pipeline::apply_bidirectional_forward(self, p, args.into_iter().next().unwrap_or(Value::Null)),
            Value::ReversibleFunction(pair) => function::apply(self, &pair.forward, args),
            other => Err(RunError::new(ErrorKind::InvalidPipeTarget, format!("{} is not callable", other.type_name()))),
        }
    }

    /// Evaluates `expr` in `env` (`spec.md` §6's AST, §4's evaluation
    /// rules).
    pub fn eval_expr(&mut self, env: &EnvRef, expr: &Expr) -> RunResult<Value> {
        match expr {
            Expr::NumberLiteral(n) => Ok(Value::Number(*n)),
            Expr::StringLiteral(s) => Ok(Value::str(s.clone())),
            Expr::BooleanLiteral(b) => Ok(Value::Bool(*b)),
            Expr::NullLiteral => Ok(Value::Null),
            Expr::TemplateStringExpr(parts) => self.eval_template(env, parts),
            Expr::Identifier(name) => Environment::get(env, name),
            Expr::PlaceholderExpr => Environment::get(env, "_"),
            Expr::ListExpr(items) => {
                let values = items.iter().map(|e| self.eval_expr(env, e)).collect::<RunResult<Vec<_>>>()?;
                Ok(Value::new_list(values))
            }
            Expr::TupleExpr(items) => {
                let values = items.iter().map(|e| self.eval_expr(env, e)).collect::<RunResult<Vec<_>>>()?;
                Ok(Value::Tuple(Rc::from(values.into_boxed_slice())))
            }
            Expr::RecordExpr(fields) => {
                let mut record = IndexMap::with_capacity(fields.len());
                for (key, value_expr) in fields {
                    let value = self.eval_expr(env, value_expr)?;
                    record.insert(key.clone(), value);
                }
                Ok(Value::new_record(record))
            }
            Expr::IndexExpr { target, index } => self.eval_index(env, target, index),
            Expr::UnaryExpr { op, operand } => {
                let value = self.eval_expr(env, operand)?;
                ops::apply_unary(*op, value)
            }
            Expr::BinaryExpr { op: BinaryOp::And, left, right } => {
                let l = self.eval_expr(env, left)?;
                if l.is_truthy() { self.eval_expr(env, right) } else { Ok(l) }
            }
            Expr::BinaryExpr { op: BinaryOp::Or, left, right } => {
                let l = self.eval_expr(env, left)?;
                if l.is_truthy() { Ok(l) } else { self.eval_expr(env, right) }
            }
            Expr::BinaryExpr { op, left, right } => {
                let l = self.eval_expr(env, left)?;
                let r = self.eval_expr(env, right)?;
                ops::apply_binary(*op, l, r)
            }
            Expr::TernaryExpr { cond, then_branch, else_branch } => {
                if self.eval_expr(env, cond)?.is_truthy() { self.eval_expr(env, then_branch) } else { self.eval_expr(env, else_branch) }
            }
            Expr::MatchExpr { scrutinee, cases } => self.eval_match(env, scrutinee, cases),
            Expr::ReturnExpr(inner) => {
                let value = match inner {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                self.pending_return = Some(value.clone());
                Ok(value)
            }
            Expr::MemberExpr { target, member } => self.eval_member(env, target, member),
            Expr::CallExpr { callee, args } => self.eval_call(env, callee, args),
            Expr::FunctionExpr(literal) => self.eval_function_literal(env, literal),
            Expr::AwaitExpr(inner) => {
                let value = self.eval_expr(env, inner)?;
                match value {
                    Value::Promise(p) => promise::force(self, &p),
                    other => Ok(other),
                }
            }
            Expr::PipeExpr { left, right } => pipe::eval_pipe(self, env, left, right),
            Expr::SpreadPipeExpr { left, right } => pipe::eval_spread_pipe(self, env, left, right),
            Expr::ParallelPipeExpr { input, branches } => pipe::eval_parallel_pipe(self, env, input, branches),
            Expr::ReversePipeExpr { value, target } => pipe::eval_reverse_pipe(self, env, value, target),
            Expr::PipelineLiteral { stages, decorators } => {
                let specs = self.eval_decorators(env, decorators)?;
                Ok(Value::Pipeline(Rc::new(Pipeline::from_ast(stages, Rc::clone(env), specs))))
            }
            Expr::BidirectionalPipelineLiteral { stages, decorators } => {
                let specs = self.eval_decorators(env, decorators)?;
                Ok(Value::BidirectionalPipeline(Rc::new(BidirectionalPipeline::from_ast(stages, Rc::clone(env), specs))))
            }
        }
    }

    fn eval_template(&mut self, env: &EnvRef, parts: &[crate::expressions::TemplatePart]) -> RunResult<Value> {
        use crate::expressions::TemplatePart;
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Expr(expr) => out.push_str(&self.eval_expr(env, expr)?.to_display_string()),
            }
        }
        Ok(Value::str(out))
    }

    fn eval_index(&mut self, env: &EnvRef, target: &Expr, index: &Expr) -> RunResult<Value> {
        let target_value = self.eval_expr(env, target)?;
        let index_value = self.eval_expr(env, index)?;
        match (&target_value, &index_value) {
            (Value::List(items), Value::Number(n)) => index_into(&items.borrow(), *n),
            (Value::Tuple(items), Value::Number(n)) => index_into(items, *n),
            (Value::Str(s), Value::Number(n)) => {
                let i = *n as i64;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| RunError::new(ErrorKind::InvalidIndex, format!("string index {i} out of bounds")))
            }
            (Value::Record(fields), Value::Str(key)) => {
                fields.borrow().get(&**key).cloned().ok_or_else(|| RunError::new(ErrorKind::MissingField, format!("record has no field '{key}'")))
            }
            _ => Err(RunError::new(ErrorKind::InvalidIndex, format!("cannot index {} with {}", target_value.type_name(), index_value.type_name()))),
        }
    }

    fn eval_match(&mut self, env: &EnvRef, scrutinee: &Expr, cases: &[MatchCase]) -> RunResult<Value> {
        let value = self.eval_expr(env, scrutinee)?;
        let case_env = pipe::bind_placeholder(env, value.clone());
        for case in cases {
            match case {
                MatchCase::Guarded { guard, body } => {
                    if self.eval_expr(&case_env, guard)?.is_truthy() {
                        return self.eval_expr(&case_env, body);
                    }
                }
                MatchCase::Pattern { pattern, body } => {
                    let pattern_value = self.eval_expr(&case_env, pattern)?;
                    if deep_equal(&value, &pattern_value) {
                        return self.eval_expr(&case_env, body);
                    }
                }
                MatchCase::Default { body } => return self.eval_expr(&case_env, body),
            }
        }
        Err(RunError::new(ErrorKind::NoMatchingCase, "No matching case in match expression"))
    }

    fn eval_member(&mut self, env: &EnvRef, target: &Expr, member: &str) -> RunResult<Value> {
        let target_value = self.eval_expr(env, target)?;
        if let Some(value) = pipeline::member_get(&target_value, member) {
            return Ok(value);
        }
        match &target_value {
            Value::Record(fields) => fields
                .borrow()
                .get(member)
                .cloned()
                .ok_or_else(|| RunError::new(ErrorKind::MissingField, format!("record has no field '{member}'"))),
            _ => Err(RunError::new(ErrorKind::MissingField, format!("{} has no member '{member}'", target_value.type_name()))),
        }
    }

    fn eval_call(&mut self, env: &EnvRef, callee: &Expr, args: &[Expr]) -> RunResult<Value> {
        if let Expr::MemberExpr { target, member } = callee {
            let target_value = self.eval_expr(env, target)?;
            let arg_values = pipe::eval_args(self, env, args)?;
            if let Some(result) = pipeline::try_method_call(self, &target_value, member, arg_values.clone()) {
                return result;
            }
            if let Value::Record(fields) = &target_value {
                let field = fields.borrow().get(member).cloned();
                if let Some(field) = field {
                    return self.call_value(&field, arg_values);
                }
            }
            return Err(RunError::new(ErrorKind::MissingField, format!("{} has no method '{member}'", target_value.type_name())));
        }
        let callee_value = self.eval_expr(env, callee)?;
        let arg_values = pipe::eval_args(self, env, args)?;
        self.call_value(&callee_value, arg_values)
    }

    fn eval_function_literal(&mut self, env: &EnvRef, literal: &Rc<crate::expressions::FunctionLiteral>) -> RunResult<Value> {
        let params: Vec<Param> = literal
            .params
            .iter()
            .map(|p| -> RunResult<Param> {
                let default = p.default.as_ref().map(|_| ()).map(|()| ());
                let _ = default;
                Ok(Param { name: p.name.clone(), type_ann: p.type_ann, default: p.default.clone().map(Rc::new) })
            })
            .collect::<RunResult<Vec<_>>>()?;
        let body = match &literal.body {
            crate::expressions::BodyExpr::Expr(expr) => FunctionBody::Expr(Rc::new((**expr).clone())),
            crate::expressions::BodyExpr::Block { statements, result } => {
                FunctionBody::Block { statements: Rc::from(statements.clone().into_boxed_slice()), result: Rc::new((**result).clone()) }
            }
        };
        let decorators = self.eval_decorators(env, &literal.decorators)?;
        let signature = Signature { params: params.clone(), return_type: literal.return_type };
        let func = Function {
            name: literal.name.clone(),
            params,
            attachments: literal.attachments.clone(),
            body,
            env: Rc::clone(env),
            decorators,
            signature,
            is_reverse: literal.is_reverse,
        };
        Ok(Value::Function(Rc::new(func)))
    }

    fn eval_decorators(&mut self, env: &EnvRef, decorators: &[crate::expressions::DecoratorRef]) -> RunResult<Vec<DecoratorSpec>> {
        let mut specs = Vec::with_capacity(decorators.len());
        for decorator in decorators {
            let mut args = Vec::with_capacity(decorator.args.len());
            for arg in &decorator.args {
                args.push(self.eval_expr(env, arg)?);
            }
            specs.push(DecoratorSpec { name: decorator.name.clone(), args });
        }
        Ok(specs)
    }

    /// Executes `stmt` in `env`. Returns `Some(value)` when a `return`
    /// unwind is in flight, signaling callers (block statement loops) to
    /// stop processing further statements and bubble the value up
    /// (`spec.md` §4.2 step 6).
    pub fn eval_stmt(&mut self, env: &EnvRef, stmt: &Stmt) -> RunResult<Option<Value>> {
        match stmt {
            Stmt::LetStmt { name, mutable, value, decorators } => {
                let evaluated = self.eval_expr(env, value)?;
                if let Some(returned) = self.take_pending_return() {
                    return Ok(Some(returned));
                }
                let final_value = self.attach_extra_decorators(env, evaluated, decorators)?;
                env.borrow_mut().bind_let(name, final_value, *mutable);
                Ok(None)
            }
            Stmt::AndStmt { name, value } => {
                let evaluated = self.eval_expr(env, value)?;
                if let Some(returned) = self.take_pending_return() {
                    return Ok(Some(returned));
                }
                env.borrow_mut().bind_and(name, evaluated)?;
                Ok(None)
            }
            Stmt::ExprStmt(expr) => {
                self.eval_expr(env, expr)?;
                Ok(self.take_pending_return())
            }
            Stmt::ContextDefStmt { name, default } => {
                let evaluated = self.eval_expr(env, default)?;
                if let Some(returned) = self.take_pending_return() {
                    return Ok(Some(returned));
                }
                self.contexts.declare(name.clone(), evaluated);
                Ok(None)
            }
            Stmt::ProvideStmt { name, value } => {
                let evaluated = self.eval_expr(env, value)?;
                if let Some(returned) = self.take_pending_return() {
                    return Ok(Some(returned));
                }
                if !self.contexts.provide(name, evaluated) {
                    return Err(RunError::undefined_context(name));
                }
                Ok(None)
            }
            Stmt::DecoratorDefStmt { name, value } => {
                let evaluated = self.eval_expr(env, value)?;
                if let Some(returned) = self.take_pending_return() {
                    return Ok(Some(returned));
                }
                match evaluated {
                    Value::Function(f) => {
                        self.custom_decorators.insert(name.clone(), f);
                        Ok(None)
                    }
                    other => Err(RunError::new(ErrorKind::InvalidDecoratorArgument, format!("decorator '{name}' must be defined as a function, got {}", other.type_name()))),
                }
            }
            Stmt::CodeblockStmt(statements) => {
                let child = Environment::child(env);
                for nested in statements {
                    if let Some(returned) = self.eval_stmt(&child, nested)? {
                        return Ok(Some(returned));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Layers `extra` decorators onto a freshly-bound `let`/`and` value
    /// (`spec.md` §6 `LetStmt`'s own `decorators` field, distinct from a
    /// function literal's `#dec` prefix list), producing a new `Function`/
    /// `Pipeline` rather than mutating the existing one (invariant 1).
    fn attach_extra_decorators(&mut self, env: &EnvRef, value: Value, extra: &[crate::expressions::DecoratorRef]) -> RunResult<Value> {
        if extra.is_empty() {
            return Ok(value);
        }
        let specs = self.eval_decorators(env, extra)?;
        match value {
            Value::Function(f) => {
                let mut extended = (*f).clone();
                extended.decorators.extend(specs);
                Ok(Value::Function(Rc::new(extended)))
            }
            Value::Pipeline(p) => {
                let extended = Pipeline { stages: p.stages.clone(), env: Rc::clone(&p.env), decorators: [p.decorators.clone(), specs].concat() };
                Ok(Value::Pipeline(Rc::new(extended)))
            }
            other => Ok(other),
        }
    }
}

fn index_into(items: &[Value], n: f64) -> RunResult<Value> {
    usize::try_from(n as i64)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| RunError::new(ErrorKind::InvalidIndex, format!("index {n} out of bounds")))
}

fn resolve_overload(eval: &mut Evaluator, set: &crate::value::OverloadSet, args: Vec<Value>) -> RunResult<Value> {
    let mut best: Option<(u32, &Rc<Function>)> = None;
    for candidate in &set.overloads {
        if let Some(score) = candidate.signature.score(&args)
            && best.as_ref().is_none_or(|(b, _)| score > *b)
        {
            best = Some((score, candidate));
        }
    }
    match best {
        Some((_, f)) => function::apply(eval, f, args),
        None => Err(RunError::new(ErrorKind::NoMatchingOverload, "No overload matches the given arguments")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    fn eval_with_env() -> (Evaluator, EnvRef) {
        (Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)), Environment::root())
    }

    #[test]
    fn arithmetic_and_short_circuit_or() {
        let (mut eval, env) = eval_with_env();
        let expr = Expr::BinaryExpr {
            op: BinaryOp::Add,
            left: Box::new(Expr::NumberLiteral(2.0)),
            right: Box::new(Expr::NumberLiteral(3.0)),
        };
        assert!(matches!(eval.eval_expr(&env, &expr).unwrap(), Value::Number(n) if n == 5.0));
    }

    #[test]
    fn ternary_selects_branch() {
        let (mut eval, env) = eval_with_env();
        let expr = Expr::TernaryExpr {
            cond: Box::new(Expr::BooleanLiteral(false)),
            then_branch: Box::new(Expr::NumberLiteral(1.0)),
            else_branch: Box::new(Expr::NumberLiteral(2.0)),
        };
        assert!(matches!(eval.eval_expr(&env, &expr).unwrap(), Value::Number(n) if n == 2.0));
    }

    #[test]
    fn match_expr_falls_through_to_default() {
        let (mut eval, env) = eval_with_env();
        let expr = Expr::MatchExpr {
            scrutinee: Box::new(Expr::NumberLiteral(9.0)),
            cases: vec![
                MatchCase::Pattern { pattern: Expr::NumberLiteral(1.0), body: Expr::StringLiteral("one".into()) },
                MatchCase::Default { body: Expr::StringLiteral("other".into()) },
            ],
        };
        assert!(matches!(eval.eval_expr(&env, &expr).unwrap(), Value::Str(s) if &*s == "other"));
    }

    #[test]
    fn return_inside_block_stops_remaining_statements() {
        let (mut eval, env) = eval_with_env();
        let body = FunctionBody::Block {
            statements: Rc::from(
                vec![
                    Stmt::ExprStmt(Expr::ReturnExpr(Some(Box::new(Expr::NumberLiteral(1.0))))),
                    Stmt::ExprStmt(Expr::ReturnExpr(Some(Box::new(Expr::NumberLiteral(2.0))))),
                ]
                .into_boxed_slice(),
            ),
            result: Rc::new(Expr::NumberLiteral(3.0)),
        };
        let func = Rc::new(Function { name: None, params: vec![], attachments: vec![], body, env, decorators: vec![], signature: Signature::default(), is_reverse: false });
        let result = function::apply(&mut eval, &func, vec![]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn overload_resolution_prefers_earliest_matching_declaration() {
        let (mut eval, env) = eval_with_env();
        let typed_param = |type_name| Param { name: "x".into(), type_ann: Some(crate::signature::TypeAnnotation { name: type_name, optional: false }), default: None };
        let int_fn = Rc::new(Function {
            name: Some("f".into()),
            params: vec![typed_param(crate::signature::TypeName::Int)],
            attachments: vec![],
            body: FunctionBody::Expr(Rc::new(Expr::StringLiteral("int-branch".into()))),
            env: Rc::clone(&env),
            decorators: vec![],
            signature: Signature { params: vec![typed_param(crate::signature::TypeName::Int)], return_type: None },
            is_reverse: false,
        });
        let str_fn = Rc::new(Function {
            name: Some("f".into()),
            params: vec![typed_param(crate::signature::TypeName::Str)],
            attachments: vec![],
            body: FunctionBody::Expr(Rc::new(Expr::StringLiteral("str-branch".into()))),
            env,
            decorators: vec![],
            signature: Signature { params: vec![typed_param(crate::signature::TypeName::Str)], return_type: None },
            is_reverse: false,
        });
        let set = crate::value::OverloadSet { overloads: vec![int_fn, str_fn] };
        let result = resolve_overload(&mut eval, &set, vec![Value::str("hi")]).unwrap();
        assert!(matches!(result, Value::Str(s) if &*s == "str-branch"));
    }
}

//! `Pipeline`, `BidirectionalPipeline`, and `ReversibleFunction`: pipes
//! promoted to first-class, composable values (`spec.md` §3, §4.5,
//! component C7).
//!
//! No teacher analogue. Grounded on the same AST-directed-recursion style
//! `pipe.rs` uses for a bare pipe expression — a `Pipeline` is essentially a
//! *stored*, replayable chain of forward-pipe steps, so stage execution
//! reuses `pipe::apply_forward` directly rather than re-deriving its rules.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    decorator::{CallInfo, DecoratorSpec, build_executor, callee_key_for},
    environment::EnvRef,
    error::{ErrorKind, RunError, RunResult},
    evaluator::Evaluator,
    expressions::{Expr, StageExpr},
    function::Function,
    pipe,
    signature::Signature,
    value::Value,
};

/// One stage of a [`Pipeline`]. Mirrors `expressions::StageExpr` for stages
/// parsed from a pipeline literal, plus a `Value` variant for stages
/// appended/prepended programmatically by the algebra methods below (e.g.
/// `.append(someFunction)`), which have no source expression to point to.
#[derive(Clone)]
pub enum PipelineStage {
    Single(Rc<Expr>),
    Parallel(Rc<[Expr]>),
    Spread(Rc<Expr>),
    Value(Value),
}

impl PipelineStage {
    fn from_ast(stage: &StageExpr) -> Self {
        match stage {
            StageExpr::Single(expr) => Self::Single(Rc::new(expr.clone())),
            StageExpr::Parallel(exprs) => Self::Parallel(Rc::from(exprs.clone().into_boxed_slice())),
            StageExpr::Spread(expr) => Self::Spread(Rc::new(expr.clone())),
        }
    }

    /// A best-effort structural key for the algebra methods (`without`,
    /// `intersection`, `union`, `equals`) — stages wrap an `Expr`, which has
    /// no semantic equality of its own, so we compare their debug form. Two
    /// independently-parsed identical stages compare equal; this does not
    /// attempt alpha-equivalence.
    fn structural_key(&self) -> String {
        match self {
            Self::Single(e) => format!("s:{e:?}"),
            Self::Parallel(es) => format!("p:{es:?}"),
            Self::Spread(e) => format!("x:{e:?}"),
            Self::Value(v) => format!("v:{}:{}", v.type_name(), crate::value::identity_key(v)),
        }
    }
}

/// A forward pipeline: a sequence of stages applied left to right, each
/// transforming the current value via `pipe::apply_forward`
/// (`spec.md` §4.5).
pub struct Pipeline {
    pub stages: Vec<PipelineStage>,
    pub env: EnvRef,
    pub decorators: Vec<DecoratorSpec>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pipeline({} stages)", self.stages.len())
    }
}

impl Pipeline {
    #[must_use]
    pub fn from_ast(stages: &[StageExpr], env: EnvRef, decorators: Vec<DecoratorSpec>) -> Self {
        Self { stages: stages.iter().map(PipelineStage::from_ast).collect(), env, decorators }
    }

    /// `Pipeline.identity` (`spec.md` §4.5): a single `__identity__` stage
    /// returning its input unchanged. Distinct from [`Self::empty`] — data
    /// model invariant 4 requires `.stages` to be empty only for the latter,
    /// and `.length`/`.isEmpty()` must tell the two apart.
    #[must_use]
    pub fn identity(env: EnvRef) -> Rc<Self> {
        let stage = PipelineStage::Single(Rc::new(Expr::Identifier("__identity__".into())));
        Rc::new(Self { stages: vec![stage], env, decorators: vec![] })
    }

    /// `Pipeline.empty` (`spec.md` §4.5): the zero-stage pipeline, the
    /// algebraic neutral element applying as the identity.
    #[must_use]
    pub fn empty(env: EnvRef) -> Rc<Self> {
        Rc::new(Self { stages: vec![], env, decorators: vec![] })
    }

    fn with_stages(&self, stages: Vec<PipelineStage>) -> Rc<Self> {
        Rc::new(Self { stages, env: Rc::clone(&self.env), decorators: self.decorators.clone() })
    }
}

/// A bidirectional pipeline (`spec.md` §4.5): a sequence of reversible
/// stages, applied forward left to right and in reverse right to left.
pub struct BidirectionalPipeline {
    pub stages: Vec<Rc<Expr>>,
    pub env: EnvRef,
    pub decorators: Vec<DecoratorSpec>,
}

impl std::fmt::Debug for BidirectionalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BidirectionalPipeline({} stages)", self.stages.len())
    }
}

impl BidirectionalPipeline {
    #[must_use]
    pub fn from_ast(stages: &[Expr], env: EnvRef, decorators: Vec<DecoratorSpec>) -> Self {
        Self { stages: stages.iter().map(|e| Rc::new(e.clone())).collect(), env, decorators }
    }
}

/// A function formed by `and f = (x) <- ...` attaching a reverse body to an
/// existing forward definition (`spec.md` §3, §4.1).
#[derive(Debug)]
pub struct ReversibleFunction {
    pub forward: Rc<Function>,
    pub reverse: Rc<Function>,
}

/// Applies a pipeline to its (single) argument (`spec.md` §4.5). Pipelines
/// are always called with exactly one positional argument in practice — the
/// value entering the chain — but we accept `args` as a vector to match the
/// uniform calling convention `Evaluator::call_value` uses for every
/// callable kind.
pub fn apply(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, args: Vec<Value>) -> RunResult<Value> {
    eval.resources_mut().enter()?;
    let result = apply_inner(eval, pipeline, args);
    eval.resources_mut().exit();
    result
}

fn apply_inner(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, args: Vec<Value>) -> RunResult<Value> {
    let input = args.first().cloned().unwrap_or(Value::Null);
    let info = CallInfo {
        name: "<pipeline>".to_owned(),
        signature: Signature::default(),
        args: vec![input.clone()],
        env: Rc::clone(&pipeline.env),
        callee_key: callee_key_for(&Value::Pipeline(Rc::clone(pipeline))),
    };

    // `batch`/`parallel`/`prefetch` are genuinely pipeline-shaped operations
    // (`spec.md` §4.6's "(pipeline)" column): they re-run the *whole* stage
    // sequence once per chunk/element of a list input, which is a different
    // shape of repetition than any generic function decorator performs. We
    // intercept them here rather than in `decorator.rs`, and wrap whatever
    // decorators remain around the result with the normal executor chain.
    let list_op = pipeline.decorators.iter().position(|d| matches!(d.name.as_str(), "batch" | "parallel" | "prefetch"));

    let pipeline2 = Rc::clone(pipeline);
    let base: crate::decorator::Executor = match list_op.map(|i| &pipeline.decorators[i]) {
        Some(spec) if spec.name == "batch" => {
            let n = list_decorator_arg(spec, "batch")?.max(1);
            let input = input.clone();
            Box::new(move |eval| run_batched(eval, &pipeline2, input.clone(), n))
        }
        Some(spec) if spec.name == "parallel" => {
            let input = input.clone();
            Box::new(move |eval| run_listwise(eval, &pipeline2, input.clone()))
        }
        Some(spec) if spec.name == "prefetch" => {
            let input = input.clone();
            Box::new(move |eval| run_listwise(eval, &pipeline2, input.clone()))
        }
        _ => Box::new(move |eval| run_stages(eval, &pipeline2, input.clone())),
    };

    let rest: Vec<DecoratorSpec> = pipeline
        .decorators
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != list_op)
        .map(|(_, d)| d.clone())
        .collect();

    let mut executor = build_executor(eval, &rest, &info, base)?;
    executor(eval)
}

fn list_decorator_arg(spec: &DecoratorSpec, name: &'static str) -> RunResult<usize> {
    match spec.args.first() {
        Some(Value::Number(n)) if *n >= 0.0 => Ok(*n as usize),
        _ => Err(RunError::new(ErrorKind::InvalidDecoratorArgument, format!("#{name} requires a non-negative numeric argument")).from_decorator(name)),
    }
}

/// `#batch(n)` on a pipeline (`spec.md` §4.6): splits a list input into `n`
/// near-equal chunks, runs the full stage sequence over each chunk, and
/// flattens the per-chunk results back into one list.
fn run_batched(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, input: Value, n: usize) -> RunResult<Value> {
    let Value::List(items) = &input else {
        return run_stages(eval, pipeline, input);
    };
    let elements = items.borrow().clone();
    if elements.len() <= n {
        return run_stages(eval, pipeline, input);
    }
    let chunks = near_equal_chunks(&elements, n);
    let mut flattened = Vec::with_capacity(elements.len());
    for chunk in chunks {
        match run_stages(eval, pipeline, Value::new_list(chunk))? {
            Value::List(result_items) => flattened.extend(result_items.borrow().iter().cloned()),
            other => flattened.push(other),
        }
    }
    Ok(Value::new_list(flattened))
}

/// Splits `elements` into exactly `n` chunks whose sizes differ by at most
/// one, distributing the remainder across the first chunks.
fn near_equal_chunks(elements: &[Value], n: usize) -> Vec<Vec<Value>> {
    let base = elements.len() / n;
    let remainder = elements.len() % n;
    let mut chunks = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let size = base + usize::from(i < remainder);
        chunks.push(elements[start..start + size].to_vec());
        start += size;
    }
    chunks
}

/// `#parallel`/`#prefetch` on a pipeline (`spec.md` §4.6): runs the stage
/// sequence once per element of a list input, preserving order. The
/// concurrency-limit/sliding-window arguments are accepted but have no
/// observable effect in this single-threaded, synchronous evaluator — every
/// element still runs to completion before the next starts, which yields
/// the same result a real scheduler would, just without the overlap.
fn run_listwise(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, input: Value) -> RunResult<Value> {
    let Value::List(items) = &input else {
        return run_stages(eval, pipeline, input);
    };
    let elements = items.borrow().clone();
    let mut results = Vec::with_capacity(elements.len());
    for element in elements {
        results.push(run_stages(eval, pipeline, element)?);
    }
    Ok(Value::new_list(results))
}

fn run_stages(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, start: Value) -> RunResult<Value> {
    let mut current = start;
    for stage in &pipeline.stages {
        current = run_stage(eval, &pipeline.env, current, stage)?;
    }
    Ok(current)
}

fn run_stage(eval: &mut Evaluator, env: &EnvRef, current: Value, stage: &PipelineStage) -> RunResult<Value> {
    match stage {
        PipelineStage::Single(expr) => pipe::apply_forward(eval, env, current, expr),
        PipelineStage::Parallel(branches) => {
            let mut results = Vec::with_capacity(branches.len());
            for branch in branches.iter() {
                results.push(pipe::apply_forward(eval, env, current.clone(), branch)?);
            }
            Ok(Value::ParallelResult(Rc::new(results)))
        }
        PipelineStage::Spread(expr) => {
            let elements = match &current {
                Value::List(items) => items.borrow().clone(),
                Value::ParallelResult(items) => (**items).clone(),
                _ => return Err(RunError::new(ErrorKind::InvalidSpreadTarget, "Spread stage requires a list or parallel result")),
            };
            let mut results = Vec::with_capacity(elements.len());
            for element in elements {
                results.push(pipe::apply_forward(eval, env, element, expr)?);
            }
            Ok(Value::new_list(results))
        }
        PipelineStage::Value(callable) => eval.call_value(callable, vec![current]),
    }
}

/// Applies a pipeline's stages in reverse order (`spec.md` §4.4's reverse
/// pipe, when the target is a plain `Pipeline`). Every stage must itself
/// resolve to something reversible; the first non-reversible stage fails
/// the whole operation rather than silently skipping it.
pub fn apply_reverse(eval: &mut Evaluator, pipeline: &Rc<Pipeline>, value: Value) -> RunResult<Value> {
    let mut current = value;
    for stage in pipeline.stages.iter().rev() {
        current = reverse_stage(eval, &pipeline.env, current, stage)?;
    }
    Ok(current)
}

fn reverse_stage(eval: &mut Evaluator, env: &EnvRef, value: Value, stage: &PipelineStage) -> RunResult<Value> {
    match stage {
        PipelineStage::Single(expr) => {
            let target = eval.eval_expr(env, expr)?;
            pipe::reverse_apply(eval, value, &target)
        }
        PipelineStage::Value(target) => pipe::reverse_apply(eval, value, target),
        PipelineStage::Parallel(_) | PipelineStage::Spread(_) => {
            Err(RunError::new(ErrorKind::NotReversible, "Parallel and spread pipeline stages are not reversible"))
        }
    }
}

/// Applies a bidirectional pipeline in reverse: stages run right to left,
/// each resolved to a value and applied via `pipe::reverse_apply`.
pub fn apply_bidirectional_reverse(eval: &mut Evaluator, bidi: &Rc<BidirectionalPipeline>, value: Value) -> RunResult<Value> {
    let mut current = value;
    for stage in bidi.stages.iter().rev() {
        let target = eval.eval_expr(&bidi.env, stage)?;
        current = pipe::reverse_apply(eval, current, &target)?;
    }
    Ok(current)
}

/// Applies a bidirectional pipeline forward: ordinary left-to-right forward
/// piping through each stage expression.
pub fn apply_bidirectional_forward(eval: &mut Evaluator, bidi: &Rc<BidirectionalPipeline>, value: Value) -> RunResult<Value> {
    let mut current = value;
    for stage in &bidi.stages {
        current = pipe::apply_forward(eval, &bidi.env, current, stage)?;
    }
    Ok(current)
}

/// Plain-property member access on a pipeline value (`spec.md` §4.5):
/// `.length`, `.stages`, `.first`, `.last`. Returns `None` when `value` is
/// not pipeline-like or `member` does not name one of these properties, so
/// the caller can fall back to record-field lookup.
pub fn member_get(value: &Value, member: &str) -> Option<Value> {
    let stages = pipeline_stages(value)?;
    match member {
        "length" => Some(Value::Number(stages.len() as f64)),
        "isEmpty" => Some(Value::Bool(stages.is_empty())),
        "first" => stages.first().map(|s| single_stage_pipeline(value, s.clone())),
        "last" => stages.last().map(|s| single_stage_pipeline(value, s.clone())),
        "stages" => Some(Value::new_list(stages.iter().map(|s| Value::str(stage_description(s))).collect())),
        _ => None,
    }
}

fn pipeline_stages(value: &Value) -> Option<Vec<PipelineStage>> {
    match value {
        Value::Pipeline(p) => Some(p.stages.clone()),
        Value::BidirectionalPipeline(p) => Some(p.stages.iter().cloned().map(PipelineStage::Single).collect()),
        _ => None,
    }
}

fn single_stage_pipeline(template: &Value, stage: PipelineStage) -> Value {
    let env = match template {
        Value::Pipeline(p) => Rc::clone(&p.env),
        Value::BidirectionalPipeline(p) => Rc::clone(&p.env),
        _ => unreachable!("caller guarantees a pipeline-like value"),
    };
    Value::Pipeline(Rc::new(Pipeline { stages: vec![stage], env, decorators: vec![] }))
}

/// Method-style member calls on a pipeline value: `.isEmpty()`, `.equals()`,
/// `.at()`, `.prepend()`, `.append()`, `.reverse()`, `.slice()`,
/// `.without()`/`.difference()`, `.intersection()`, `.union()`, `.concat()`,
/// `.visualize()` (`spec.md` §4.5). Returns `None` when `target` is not
/// pipeline-like or `member` does not name one of these methods.
pub fn try_method_call(eval: &mut Evaluator, target: &Value, member: &str, args: Vec<Value>) -> Option<RunResult<Value>> {
    let Value::Pipeline(pipeline) = target else {
        return None;
    };
    let result = match member {
        "isEmpty" => Ok(Value::Bool(pipeline.stages.is_empty())),
        "equals" => Ok(Value::Bool(pipelines_equal(pipeline, args.first()))),
        "at" => at(pipeline, &args),
        "prepend" => Ok(Value::Pipeline(prepend(pipeline, &args))),
        "append" => Ok(Value::Pipeline(append(pipeline, &args))),
        "reverse" => Ok(Value::Pipeline(pipeline.with_stages(pipeline.stages.iter().rev().cloned().collect()))),
        "slice" => slice(pipeline, &args),
        "without" | "difference" => Ok(Value::Pipeline(set_op(pipeline, &args, SetOp::Without))),
        "intersection" => Ok(Value::Pipeline(set_op(pipeline, &args, SetOp::Intersection))),
        "union" => Ok(Value::Pipeline(set_op(pipeline, &args, SetOp::Union))),
        "concat" => Ok(Value::Pipeline(append(pipeline, &args))),
        "visualize" => {
            eval.print_line(&visualize(pipeline));
            Ok(Value::Null)
        }
        _ => return None,
    };
    Some(result)
}

fn other_pipeline(args: &[Value]) -> RunResult<&Rc<Pipeline>> {
    match args.first() {
        Some(Value::Pipeline(p)) => Ok(p),
        _ => Err(RunError::new(ErrorKind::TypeMismatch, "Expected a pipeline argument")),
    }
}

fn pipelines_equal(pipeline: &Rc<Pipeline>, other: Option<&Value>) -> bool {
    let Some(Value::Pipeline(other)) = other else { return false };
    if Rc::ptr_eq(pipeline, other) {
        return true;
    }
    pipeline.stages.len() == other.stages.len()
        && pipeline.stages.iter().zip(other.stages.iter()).all(|(a, b)| a.structural_key() == b.structural_key())
}

fn at(pipeline: &Rc<Pipeline>, args: &[Value]) -> RunResult<Value> {
    let index = index_arg(args)?;
    pipeline
        .stages
        .get(index)
        .map(|s| single_stage_pipeline(&Value::Pipeline(Rc::clone(pipeline)), s.clone()))
        .ok_or_else(|| RunError::new(ErrorKind::InvalidIndex, format!("pipeline has no stage at index {index}")))
}

fn index_arg(args: &[Value]) -> RunResult<usize> {
    match args.first() {
        Some(Value::Number(n)) if *n >= 0.0 => Ok(*n as usize),
        _ => Err(RunError::new(ErrorKind::InvalidIndex, "Pipeline index must be a non-negative number")),
    }
}

fn prepend(pipeline: &Rc<Pipeline>, args: &[Value]) -> Rc<Pipeline> {
    let mut stages = stage_source(args.first());
    stages.extend(pipeline.stages.iter().cloned());
    pipeline.with_stages(stages)
}

fn append(pipeline: &Rc<Pipeline>, args: &[Value]) -> Rc<Pipeline> {
    let mut stages = pipeline.stages.clone();
    stages.extend(stage_source(args.first()));
    pipeline.with_stages(stages)
}

/// Converts an argument to the algebra methods into the stage(s) it
/// contributes: another pipeline contributes all of its stages, any other
/// callable value contributes itself as a single `Value` stage.
fn stage_source(arg: Option<&Value>) -> Vec<PipelineStage> {
    match arg {
        Some(Value::Pipeline(p)) => p.stages.clone(),
        Some(other) => vec![PipelineStage::Value(other.clone())],
        None => vec![],
    }
}

fn slice(pipeline: &Rc<Pipeline>, args: &[Value]) -> RunResult<Value> {
    let start = match args.first() {
        Some(Value::Number(n)) if *n >= 0.0 => *n as usize,
        _ => return Err(RunError::new(ErrorKind::InvalidIndex, "Pipeline.slice requires a non-negative start index")),
    };
    let end = match args.get(1) {
        Some(Value::Number(n)) if *n >= 0.0 => (*n as usize).min(pipeline.stages.len()),
        None => pipeline.stages.len(),
        _ => return Err(RunError::new(ErrorKind::InvalidIndex, "Pipeline.slice requires a non-negative end index")),
    };
    let start = start.min(end);
    Ok(Value::Pipeline(pipeline.with_stages(pipeline.stages[start..end].to_vec())))
}

enum SetOp {
    Without,
    Intersection,
    Union,
}

fn set_op(pipeline: &Rc<Pipeline>, args: &[Value], op: SetOp) -> Rc<Pipeline> {
    let Ok(other) = other_pipeline(args) else {
        return Rc::clone(pipeline);
    };
    let other_keys: std::collections::HashSet<String> = other.stages.iter().map(PipelineStage::structural_key).collect();
    let stages = match op {
        SetOp::Without => pipeline.stages.iter().filter(|s| !other_keys.contains(&s.structural_key())).cloned().collect(),
        SetOp::Intersection => pipeline.stages.iter().filter(|s| other_keys.contains(&s.structural_key())).cloned().collect(),
        SetOp::Union => {
            let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
            let mut stages = Vec::new();
            for stage in pipeline.stages.iter().chain(other.stages.iter()) {
                let key = stage.structural_key();
                if seen.insert(key) {
                    stages.push(stage.clone());
                }
            }
            stages
        }
    };
    pipeline.with_stages(stages)
}

/// Renders one stage's description string (`spec.md` §4.5 `.stages`:
/// "identifier name, call name, λ for lambdas, or `parallel[N]`, `spread`").
fn stage_description(stage: &PipelineStage) -> String {
    match stage {
        PipelineStage::Single(expr) => expr_description(expr),
        PipelineStage::Parallel(branches) => format!("parallel[{}]", branches.len()),
        PipelineStage::Spread(_) => "spread".to_owned(),
        PipelineStage::Value(v) => value_description(v),
    }
}

fn expr_description(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::CallExpr { callee, .. } => expr_description(callee),
        Expr::FunctionExpr(_) => "λ".to_owned(),
        Expr::MemberExpr { target, member } => format!("{}.{member}", expr_description(target)),
        other => format!("{other:?}"),
    }
}

fn value_description(value: &Value) -> String {
    match value {
        Value::Function(_) | Value::Builtin(_) | Value::Native(_) => "λ".to_owned(),
        other => other.to_display_string(),
    }
}

fn visualize(pipeline: &Rc<Pipeline>) -> String {
    if pipeline.stages.is_empty() {
        return "<empty pipeline>".to_owned();
    }
    pipeline.stages.iter().map(stage_description).collect::<Vec<_>>().join(" /> ")
}

/// Implements the `from` field of the `Pipeline` namespace record
/// (`SPEC_FULL.md` AMBIENT-4): builds a pipeline whose stages are exactly
/// the callables in `values`, in order.
pub fn from_values(env: EnvRef, values: Vec<Value>) -> Rc<Pipeline> {
    Rc::new(Pipeline { stages: values.into_iter().map(PipelineStage::Value).collect(), env, decorators: vec![] })
}

/// Builds the `Pipeline` namespace record installed into the root
/// environment (`SPEC_FULL.md` AMBIENT-4): `identity`, `empty`, and `from`.
#[must_use]
pub fn namespace_record(env: &EnvRef) -> Value {
    let mut fields = IndexMap::new();
    fields.insert("identity".to_owned(), Value::Pipeline(Pipeline::identity(Rc::clone(env))));
    fields.insert("empty".to_owned(), Value::Pipeline(Pipeline::empty(Rc::clone(env))));
    fields.insert(
        "from".to_owned(),
        Value::Builtin(Rc::new(crate::value::Builtin { name: "Pipeline.from", func: builtin_from })),
    );
    Value::new_record(fields)
}

fn builtin_from(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let elements = match args.first() {
        Some(Value::List(items)) => items.borrow().clone(),
        Some(_) => return Err(RunError::new(ErrorKind::BuiltinTypeError, "Pipeline.from expects a list of callables")),
        None => vec![],
    };
    Ok(Value::Pipeline(from_values(Rc::clone(eval.global_env()), elements)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{environment::Environment, io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    fn eval() -> Evaluator {
        Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer))
    }

    #[test]
    fn identity_pipeline_applies_as_identity() {
        let env = Environment::root();
        crate::builtins::install(&env);
        let mut ev = eval();
        let pipeline = Pipeline::identity(env);
        let result = apply(&mut ev, &pipeline, vec![Value::Number(3.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn empty_pipeline_applies_as_identity() {
        let env = Environment::root();
        let mut ev = eval();
        let pipeline = Pipeline::empty(env);
        let result = apply(&mut ev, &pipeline, vec![Value::Number(3.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn identity_has_one_stage_and_empty_has_none() {
        let env = Environment::root();
        let identity = Pipeline::identity(Rc::clone(&env));
        let empty = Pipeline::empty(env);
        assert_eq!(identity.stages.len(), 1);
        assert!(!identity.stages.is_empty());
        assert_eq!(empty.stages.len(), 0);
        assert!(empty.stages.is_empty());
    }

    #[test]
    fn stages_member_returns_description_strings_not_pipelines() {
        let env = Environment::root();
        let pipeline = Pipeline::identity(env);
        let Value::List(stages) = member_get(&Value::Pipeline(pipeline), "stages").unwrap() else {
            panic!("expected a list")
        };
        let stages = stages.borrow();
        assert_eq!(stages.len(), 1);
        assert!(matches!(&stages[0], Value::Str(s) if &**s == "__identity__"));
    }

    #[test]
    fn append_extends_stage_list_length() {
        let env = Environment::root();
        let pipeline = Pipeline::empty(env);
        let appended = append(&pipeline, &[Value::Builtin(Rc::new(crate::value::Builtin { name: "noop", func: |_, a| Ok(a.into_iter().next().unwrap_or(Value::Null)) }))]);
        assert_eq!(appended.stages.len(), 1);
    }

    #[test]
    fn near_equal_chunks_distributes_remainder_to_front() {
        let elements: Vec<Value> = (0..7).map(|i| Value::Number(i as f64)).collect();
        let chunks = near_equal_chunks(&elements, 3);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 2, 2]);
    }
}

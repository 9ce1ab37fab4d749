//! The AST contract the evaluator consumes (`spec.md` §6).
//!
//! `spec.md` treats the parser as an external, fixed-contract collaborator;
//! this module is that contract, shared between `parser.rs` (the first-party
//! producer, SUPP-1 in `SPEC_FULL.md`) and every evaluator module.

use std::rc::Rc;

use crate::signature::TypeAnnotation;

/// Binary operator tokens (`spec.md` §6 "BinaryExpr (operator token kind)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// One part of a `TemplateStringExpr`: alternating literal text and
/// interpolated expressions (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum TemplatePart {
    Literal(String),
    Expr(Box<Expr>),
}

/// A decorator attached to a function or pipeline literal, e.g. `#retry(3)`.
/// Argument expressions are evaluated once, in the defining environment, at
/// the moment the `Function`/`Pipeline` value is constructed — decorators
/// are a binding-time concept (`spec.md` Glossary: "attached to a function
/// or pipeline at definition time").
#[derive(Debug, Clone)]
pub struct DecoratorRef {
    pub name: String,
    pub args: Vec<Expr>,
}

/// One stage of a `PipelineLiteral` (`spec.md` §3, §4.5).
#[derive(Debug, Clone)]
pub enum StageExpr {
    Single(Expr),
    Parallel(Vec<Expr>),
    Spread(Expr),
}

/// One case of a `MatchExpr` (`spec.md` §4.7).
#[derive(Debug, Clone)]
pub enum MatchCase {
    Guarded { guard: Expr, body: Expr },
    Pattern { pattern: Expr, body: Expr },
    Default { body: Expr },
}

/// A function parameter as written in source, before signature resolution.
#[derive(Debug, Clone)]
pub struct ParamExpr {
    pub name: String,
    pub type_ann: Option<TypeAnnotation>,
    pub default: Option<Expr>,
}

/// A function literal's body: either a bare expression or a block of
/// statements followed by a result expression (`spec.md` §3).
#[derive(Debug, Clone)]
pub enum BodyExpr {
    Expr(Box<Expr>),
    Block { statements: Vec<Stmt>, result: Box<Expr> },
}

#[derive(Debug, Clone)]
pub struct FunctionLiteral {
    pub name: Option<String>,
    pub params: Vec<ParamExpr>,
    pub attachments: Vec<String>,
    pub body: BodyExpr,
    pub decorators: Vec<DecoratorRef>,
    pub return_type: Option<TypeAnnotation>,
    pub is_reverse: bool,
}

/// Expression node kinds (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum Expr {
    NumberLiteral(f64),
    StringLiteral(String),
    TemplateStringExpr(Vec<TemplatePart>),
    BooleanLiteral(bool),
    NullLiteral,
    Identifier(String),
    PlaceholderExpr,
    ListExpr(Vec<Expr>),
    IndexExpr { target: Box<Expr>, index: Box<Expr> },
    UnaryExpr { op: UnaryOp, operand: Box<Expr> },
    BinaryExpr { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    PipeExpr { left: Box<Expr>, right: Box<Expr> },
    SpreadPipeExpr { left: Box<Expr>, right: Box<Expr> },
    ParallelPipeExpr { input: Box<Expr>, branches: Vec<Expr> },
    ReversePipeExpr { value: Box<Expr>, target: Box<Expr> },
    CallExpr { callee: Box<Expr>, args: Vec<Expr> },
    FunctionExpr(Rc<FunctionLiteral>),
    AwaitExpr(Box<Expr>),
    RecordExpr(Vec<(String, Expr)>),
    MemberExpr { target: Box<Expr>, member: String },
    TernaryExpr { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    ReturnExpr(Option<Box<Expr>>),
    TupleExpr(Vec<Expr>),
    PipelineLiteral { stages: Vec<StageExpr>, decorators: Vec<DecoratorRef> },
    BidirectionalPipelineLiteral { stages: Vec<Expr>, decorators: Vec<DecoratorRef> },
    MatchExpr { scrutinee: Box<Expr>, cases: Vec<MatchCase> },
}

/// Statement kinds (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum Stmt {
    LetStmt { name: String, mutable: bool, value: Expr, decorators: Vec<DecoratorRef> },
    AndStmt { name: String, value: Expr },
    ExprStmt(Expr),
    ContextDefStmt { name: String, default: Expr },
    ProvideStmt { name: String, value: Expr },
    DecoratorDefStmt { name: String, value: Expr },
    /// A `{ ... }` block used as a statement (e.g. a bare scope), distinct
    /// from a function body's block form.
    CodeblockStmt(Vec<Stmt>),
}

/// A full program: a sequence of top-level statements (`spec.md` §6 "Program
/// entry").
pub type Program = Vec<Stmt>;

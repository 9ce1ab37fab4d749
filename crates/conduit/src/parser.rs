//! Recursive-descent parser producing the `expressions.rs` AST
//! (`SPEC_FULL.md` SUPP-1).
//!
//! Precedence, low to high: pipe chain (`/>`, `/>>>`, `\>`, `</`) < ternary
//! < `||` < `&&` < equality < comparison < additive < multiplicative <
//! unary < postfix (call/index/member) < primary. `and` is never an
//! expression-level operator — it is reserved for `AndStmt`, so a `let`'s
//! value expression naturally stops before a trailing `and ... = ...`
//! clause instead of swallowing it as a logical operator.
//!
//! No teacher analogue: `ouros` never parses its own surface syntax, it
//! hands Python source to `ruff_python_parser` and walks the resulting
//! `ruff_python_ast` tree.

use std::rc::Rc;

use crate::{
    error::{ErrorKind, RunError, RunResult},
    expressions::{BinaryOp, DecoratorRef, Expr, FunctionLiteral, MatchCase, ParamExpr, Program, Stmt, TemplatePart, UnaryOp},
    lexer::{self, TemplatePartTokens, Token},
    signature::{TypeAnnotation, TypeName},
};

/// Lexes and parses a full Conduit program.
pub fn parse_program(source: &str) -> RunResult<Program> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    parser.parse_program_statements()
}

fn parse_expr_from_tokens(tokens: &[Token]) -> RunResult<Expr> {
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if !parser.is_eof() {
        return Err(parser.error("unexpected trailing tokens in interpolation"));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, t: &Token) -> bool {
        self.current() == Some(t)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, t: Token) -> RunResult<()> {
        if self.check(&t) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {t:?}, found {:?}", self.current())))
        }
    }

    fn expect_ident(&mut self) -> RunResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(self.error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> RunError {
        RunError::new(ErrorKind::SyntaxError, format!("near token {}: {}", self.pos, message.into()))
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current(), Some(Token::Newline)) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.current(), Some(Token::Newline | Token::Semicolon)) {
            self.advance();
        }
    }

    fn at_expr_boundary(&self) -> bool {
        matches!(self.current(), None | Some(Token::Newline | Token::Semicolon | Token::RBrace | Token::RParen | Token::RBracket | Token::Comma))
    }

    // ---- statements ----------------------------------------------------

    fn parse_program_statements(&mut self) -> RunResult<Program> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.is_eof() {
                break;
            }
            stmts.extend(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block_statements(&mut self, terminator: &Token) -> RunResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.check(terminator) || self.is_eof() {
                break;
            }
            stmts.extend(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        match self.current() {
            Some(Token::Let) => self.parse_let_stmt(false),
            Some(Token::Maybe) => self.parse_let_stmt(true),
            Some(Token::And) => self.parse_and_stmt(),
            Some(Token::Context) => self.parse_context_stmt(),
            Some(Token::Provide) => self.parse_provide_stmt(),
            Some(Token::Decorator) => self.parse_decorator_def_stmt(),
            Some(Token::LBrace) => self.parse_codeblock_stmt(),
            _ => Ok(vec![Stmt::ExprStmt(self.parse_expr()?)]),
        }
    }

    /// `let NAME = EXPR decorators? (in EXPR)?`. The `in` form is sugar: it
    /// desugars to the `let` statement followed by an `ExprStmt` for the
    /// body, which is exactly how a `let` binding followed by a reference
    /// to it behaves at any other statement boundary.
    fn parse_let_stmt(&mut self, mutable: bool) -> RunResult<Vec<Stmt>> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        let decorators = self.parse_decorator_list()?;
        let let_stmt = Stmt::LetStmt { name, mutable, value, decorators };
        if self.check(&Token::In) {
            self.advance();
            let body = self.parse_expr()?;
            Ok(vec![let_stmt, Stmt::ExprStmt(body)])
        } else {
            Ok(vec![let_stmt])
        }
    }

    fn parse_and_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        Ok(vec![Stmt::AndStmt { name, value }])
    }

    fn parse_context_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let default = self.parse_expr()?;
        Ok(vec![Stmt::ContextDefStmt { name, default }])
    }

    fn parse_provide_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        Ok(vec![Stmt::ProvideStmt { name, value }])
    }

    fn parse_decorator_def_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        Ok(vec![Stmt::DecoratorDefStmt { name, value }])
    }

    fn parse_codeblock_stmt(&mut self) -> RunResult<Vec<Stmt>> {
        self.advance();
        let stmts = self.parse_block_statements(&Token::RBrace)?;
        self.expect(Token::RBrace)?;
        Ok(vec![Stmt::CodeblockStmt(stmts)])
    }

    fn parse_decorator_list(&mut self) -> RunResult<Vec<DecoratorRef>> {
        let mut decorators = Vec::new();
        while self.check(&Token::Hash) {
            self.advance();
            let name = self.expect_ident()?;
            let args = if self.check(&Token::LParen) {
                self.advance();
                let mut args = self.parse_call_args()?;
                self.expect(Token::RParen)?;
                // `#coerce(T)`/`#tease(T)` (`spec.md` §4.6) write their target
                // type as a bare type-name token, the same surface form a
                // parameter's `: T` annotation uses — not a variable
                // reference. Rewrite it to the string literal the decorator
                // bodies read from `spec.args`, the same way
                // `try_parse_type_annotation` resolves the token directly
                // rather than through environment lookup.
                if matches!(name.as_str(), "coerce" | "tease") {
                    for arg in &mut args {
                        if let Expr::Identifier(ident) = arg {
                            if TypeName::from_name(ident).is_some() {
                                *arg = Expr::StringLiteral(ident.clone());
                            }
                        }
                    }
                }
                args
            } else {
                Vec::new()
            };
            decorators.push(DecoratorRef { name, args });
        }
        Ok(decorators)
    }

    // ---- expressions, lowest precedence first --------------------------

    fn parse_expr(&mut self) -> RunResult<Expr> {
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_ternary()?;
        loop {
            match self.current() {
                Some(Token::PipeParallel) => {
                    let mut branches = Vec::new();
                    while self.check(&Token::PipeParallel) {
                        self.advance();
                        branches.push(self.parse_ternary()?);
                    }
                    left = Expr::ParallelPipeExpr { input: Box::new(left), branches };
                }
                Some(Token::PipeForward) => {
                    self.advance();
                    let right = self.parse_ternary()?;
                    left = Expr::PipeExpr { left: Box::new(left), right: Box::new(right) };
                }
                Some(Token::PipeSpread) => {
                    self.advance();
                    let right = self.parse_ternary()?;
                    left = Expr::SpreadPipeExpr { left: Box::new(left), right: Box::new(right) };
                }
                Some(Token::PipeReverse) => {
                    self.advance();
                    let right = self.parse_ternary()?;
                    left = Expr::ReversePipeExpr { value: Box::new(left), target: Box::new(right) };
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_ternary(&mut self) -> RunResult<Expr> {
        let cond = self.parse_logic_or()?;
        if self.check(&Token::Question) {
            self.advance();
            let then_branch = Box::new(self.parse_ternary()?);
            self.expect(Token::Colon)?;
            let else_branch = Box::new(self.parse_ternary()?);
            Ok(Expr::TernaryExpr { cond: Box::new(cond), then_branch, else_branch })
        } else {
            Ok(cond)
        }
    }

    fn parse_logic_or(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_logic_and()?;
        while self.check(&Token::OrOr) {
            self.advance();
            let right = self.parse_logic_and()?;
            left = Expr::BinaryExpr { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_logic_and(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.check(&Token::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::BinaryExpr { op: BinaryOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::BinaryExpr { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::BinaryExpr { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryExpr { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryExpr { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> RunResult<Expr> {
        match self.current() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::UnaryExpr { op: UnaryOp::Neg, operand: Box::new(self.parse_unary()?) })
            }
            Some(Token::Bang) => {
                self.advance();
                Ok(Expr::UnaryExpr { op: UnaryOp::Not, operand: Box::new(self.parse_unary()?) })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> RunResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.advance();
                    let member = self.expect_ident()?;
                    expr = Expr::MemberExpr { target: Box::new(expr), member };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::IndexExpr { target: Box::new(expr), index: Box::new(index) };
                }
                Some(Token::LParen) => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(Token::RParen)?;
                    expr = Expr::CallExpr { callee: Box::new(expr), args };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> RunResult<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_newlines();
        if !self.check(&Token::RParen) {
            loop {
                self.skip_newlines();
                args.push(self.parse_expr()?);
                self.skip_newlines();
                if self.check(&Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        Ok(args)
    }

    fn parse_primary(&mut self) -> RunResult<Expr> {
        match self.current().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::NumberLiteral(n))
            }
            Some(Token::Str(s)) => {
                self.advance();
                Ok(Expr::StringLiteral(s))
            }
            Some(Token::TemplateStr(parts)) => {
                self.advance();
                self.build_template(parts)
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::BooleanLiteral(true))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::BooleanLiteral(false))
            }
            Some(Token::Null) => {
                self.advance();
                Ok(Expr::NullLiteral)
            }
            Some(Token::Ident(name)) if name == "_" => {
                self.advance();
                Ok(Expr::PlaceholderExpr)
            }
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Expr::Identifier(name))
            }
            Some(Token::LParen) => self.parse_paren_primary(),
            Some(Token::LBracket) => self.parse_list_literal(),
            Some(Token::LBrace) => self.parse_record_literal(),
            Some(Token::Await) => {
                self.advance();
                Ok(Expr::AwaitExpr(Box::new(self.parse_unary()?)))
            }
            Some(Token::Return) => self.parse_return_expr(),
            Some(Token::Match) => self.parse_match_expr(),
            Some(Token::PipeForward) => self.parse_pipeline_literal(),
            Some(Token::BidiMarker) => self.parse_bidirectional_pipeline_literal(),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_return_expr(&mut self) -> RunResult<Expr> {
        self.advance();
        if self.at_expr_boundary() {
            Ok(Expr::ReturnExpr(None))
        } else {
            Ok(Expr::ReturnExpr(Some(Box::new(self.parse_expr()?))))
        }
    }

    fn parse_list_literal(&mut self) -> RunResult<Expr> {
        self.advance();
        let mut items = Vec::new();
        self.skip_newlines();
        if !self.check(&Token::RBracket) {
            loop {
                self.skip_newlines();
                items.push(self.parse_expr()?);
                self.skip_newlines();
                if self.check(&Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        self.expect(Token::RBracket)?;
        Ok(Expr::ListExpr(items))
    }

    fn parse_record_literal(&mut self) -> RunResult<Expr> {
        self.advance();
        let mut fields = Vec::new();
        self.skip_newlines();
        if !self.check(&Token::RBrace) {
            loop {
                self.skip_newlines();
                let key = match self.current().cloned() {
                    Some(Token::Ident(n)) => {
                        self.advance();
                        n
                    }
                    Some(Token::Str(s)) => {
                        self.advance();
                        s
                    }
                    other => return Err(self.error(format!("expected field name, found {other:?}"))),
                };
                self.expect(Token::Colon)?;
                let value = self.parse_expr()?;
                fields.push((key, value));
                self.skip_newlines();
                if self.check(&Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        self.expect(Token::RBrace)?;
        Ok(Expr::RecordExpr(fields))
    }

    fn parse_match_expr(&mut self) -> RunResult<Expr> {
        self.advance();
        let scrutinee = Box::new(self.parse_expr()?);
        let mut cases = Vec::new();
        self.skip_newlines();
        while self.check(&Token::Pipe) {
            self.advance();
            self.skip_newlines();
            if self.check(&Token::If) {
                self.advance();
                let guard = self.parse_expr()?;
                self.expect(Token::Arrow)?;
                let body = self.parse_expr()?;
                cases.push(MatchCase::Guarded { guard, body });
            } else {
                let first = self.parse_expr()?;
                if self.check(&Token::Arrow) {
                    self.advance();
                    let body = self.parse_expr()?;
                    cases.push(MatchCase::Pattern { pattern: first, body });
                } else {
                    cases.push(MatchCase::Default { body: first });
                }
            }
            self.skip_newlines();
        }
        Ok(Expr::MatchExpr { scrutinee, cases })
    }

    /// `/>[ stage (, stage)* ]` is a pipeline literal. Each stage is a bare
    /// expression (`StageExpr::Single`), a `/>>> expr` spread stage, or a
    /// `\>(e1, e2, ...)` parallel-branch stage.
    fn parse_pipeline_literal(&mut self) -> RunResult<Expr> {
        self.advance();
        self.expect(Token::LBracket)?;
        let mut stages = Vec::new();
        self.skip_newlines();
        if !self.check(&Token::RBracket) {
            loop {
                self.skip_newlines();
                stages.push(self.parse_stage()?);
                self.skip_newlines();
                if self.check(&Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        self.expect(Token::RBracket)?;
        let decorators = self.parse_decorator_list()?;
        Ok(Expr::PipelineLiteral { stages, decorators })
    }

    fn parse_stage(&mut self) -> RunResult<crate::expressions::StageExpr> {
        use crate::expressions::StageExpr;
        match self.current() {
            Some(Token::PipeSpread) => {
                self.advance();
                Ok(StageExpr::Spread(self.parse_ternary()?))
            }
            Some(Token::PipeParallel) => {
                self.advance();
                self.expect(Token::LParen)?;
                let mut branches = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        branches.push(self.parse_expr()?);
                        if self.check(&Token::Comma) {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                self.expect(Token::RParen)?;
                Ok(StageExpr::Parallel(branches))
            }
            _ => Ok(StageExpr::Single(self.parse_ternary()?)),
        }
    }

    /// `<>[ stage (, stage)* ]` is a bidirectional pipeline literal: every
    /// stage must be reversible, so (unlike a plain pipeline) there is no
    /// spread/parallel stage shape.
    fn parse_bidirectional_pipeline_literal(&mut self) -> RunResult<Expr> {
        self.advance();
        self.expect(Token::LBracket)?;
        let mut stages = Vec::new();
        self.skip_newlines();
        if !self.check(&Token::RBracket) {
            loop {
                self.skip_newlines();
                stages.push(self.parse_ternary()?);
                self.skip_newlines();
                if self.check(&Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        self.expect(Token::RBracket)?;
        let decorators = self.parse_decorator_list()?;
        Ok(Expr::BidirectionalPipelineLiteral { stages, decorators })
    }

    fn build_template(&mut self, parts: Vec<TemplatePartTokens>) -> RunResult<Expr> {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePartTokens::Literal(s) => out.push(TemplatePart::Literal(s)),
                TemplatePartTokens::Tokens(tokens) => out.push(TemplatePart::Expr(Box::new(parse_expr_from_tokens(&tokens)?))),
            }
        }
        Ok(Expr::TemplateStringExpr(out))
    }

    /// `(params) [: type] [attach(Ctx, ...)] -> body` or `<- body` for a
    /// reverse-marked function. Tried speculatively against `(` so a plain
    /// parenthesized expression or tuple is never misread as a parameter
    /// list: on any mismatch the token position is rewound and
    /// `parse_paren_primary` falls back to grouping/tuple parsing.
    fn parse_paren_primary(&mut self) -> RunResult<Expr> {
        let checkpoint = self.pos;
        if let Some(literal) = self.try_parse_function_literal()? {
            return Ok(Expr::FunctionExpr(Rc::new(literal)));
        }
        self.pos = checkpoint;
        self.expect(Token::LParen)?;
        self.skip_newlines();
        if self.check(&Token::RParen) {
            self.advance();
            return Ok(Expr::TupleExpr(vec![]));
        }
        let mut items = vec![self.parse_expr()?];
        self.skip_newlines();
        while self.check(&Token::Comma) {
            self.advance();
            self.skip_newlines();
            items.push(self.parse_expr()?);
            self.skip_newlines();
        }
        self.expect(Token::RParen)?;
        if items.len() == 1 {
            Ok(items.pop().expect("checked len == 1"))
        } else {
            Ok(Expr::TupleExpr(items))
        }
    }

    fn try_parse_function_literal(&mut self) -> RunResult<Option<FunctionLiteral>> {
        let checkpoint = self.pos;
        let Some(params) = self.try_parse_params() else {
            self.pos = checkpoint;
            return Ok(None);
        };
        let return_type = if self.check(&Token::Colon) {
            self.advance();
            match self.try_parse_type_annotation() {
                Some(t) => Some(t),
                None => {
                    self.pos = checkpoint;
                    return Ok(None);
                }
            }
        } else {
            None
        };
        let attachments = self.parse_attachments()?;
        let is_reverse = match self.current() {
            Some(Token::Arrow) => {
                self.advance();
                false
            }
            Some(Token::ReverseArrow) => {
                self.advance();
                true
            }
            _ => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };
        let body = self.parse_body()?;
        let decorators = self.parse_decorator_list()?;
        Ok(Some(FunctionLiteral { name: None, params, attachments, body, decorators, return_type, is_reverse }))
    }

    /// Strict parameter-list grammar: `Ident (: type ?)? (= default)?`,
    /// comma-separated. Returns `None` on the first token that doesn't fit,
    /// rather than raising a syntax error, so the caller can fall back to
    /// parenthesized-expression parsing.
    fn try_parse_params(&mut self) -> Option<Vec<ParamExpr>> {
        if !self.check(&Token::LParen) {
            return None;
        }
        self.advance();
        let mut params = Vec::new();
        if self.check(&Token::RParen) {
            self.advance();
            return Some(params);
        }
        loop {
            let name = match self.current().cloned() {
                Some(Token::Ident(n)) => {
                    self.advance();
                    n
                }
                _ => return None,
            };
            let type_ann = if self.check(&Token::Colon) {
                self.advance();
                Some(self.try_parse_type_annotation()?)
            } else {
                None
            };
            let default = if self.check(&Token::Eq) {
                self.advance();
                self.parse_expr().ok()
            } else {
                None
            };
            params.push(ParamExpr { name, type_ann, default });
            if self.check(&Token::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        if !self.check(&Token::RParen) {
            return None;
        }
        self.advance();
        Some(params)
    }

    fn try_parse_type_annotation(&mut self) -> Option<TypeAnnotation> {
        let name = match self.current() {
            Some(Token::Ident(n)) => n.clone(),
            _ => return None,
        };
        let type_name = TypeName::from_name(&name)?;
        self.advance();
        let optional = if self.check(&Token::Question) {
            self.advance();
            true
        } else {
            false
        };
        Some(TypeAnnotation { name: type_name, optional })
    }

    /// `attach(Name, Name2, ...)`: a soft keyword recognized only right
    /// after a parameter list (and optional return type), listing the
    /// context names the function injects at call time (`spec.md` §3,
    /// §4.2 step 3). `attach` is otherwise an ordinary identifier.
    fn parse_attachments(&mut self) -> RunResult<Vec<String>> {
        let is_attach = matches!(self.current(), Some(Token::Ident(n)) if n == "attach");
        if !is_attach {
            return Ok(Vec::new());
        }
        self.advance();
        self.expect(Token::LParen)?;
        let mut names = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                names.push(self.expect_ident()?);
                if self.check(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(names)
    }

    fn parse_body(&mut self) -> RunResult<crate::expressions::BodyExpr> {
        use crate::expressions::BodyExpr;
        if self.check(&Token::LBrace) {
            self.advance();
            let mut statements = self.parse_block_statements(&Token::RBrace)?;
            self.expect(Token::RBrace)?;
            let result = match statements.pop() {
                Some(Stmt::ExprStmt(e)) => e,
                Some(other) => {
                    statements.push(other);
                    Expr::NullLiteral
                }
                None => Expr::NullLiteral,
            };
            Ok(BodyExpr::Block { statements, result: Box::new(result) })
        } else {
            Ok(BodyExpr::Expr(Box::new(self.parse_expr()?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{BodyExpr, Expr, Stmt};

    fn parse(src: &str) -> Program {
        parse_program(src).unwrap()
    }

    #[test]
    fn parses_forward_pipe_chain_left_associatively() {
        let program = parse("16 /> sqrt /> print");
        assert_eq!(program.len(), 1);
        match &program[0] {
            Stmt::ExprStmt(Expr::PipeExpr { left, right }) => {
                assert!(matches!(**right, Expr::Identifier(ref n) if n == "print"));
                assert!(matches!(**left, Expr::PipeExpr { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_list_and_lambda_pipeline() {
        let program = parse("[1,2,3,4,5] /> filter((x) -> x > 2) /> map((x) -> x * x) /> reduce(0, (acc,x) -> acc + x)");
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn parses_let_and_reverse_function_with_and_stmt() {
        let program = parse("let double = (x) -> x * 2 and double = (x) <- x / 2\n5 /> double");
        assert_eq!(program.len(), 3);
        assert!(matches!(program[0], Stmt::LetStmt { .. }));
        assert!(matches!(program[1], Stmt::AndStmt { .. }));
        assert!(matches!(program[2], Stmt::ExprStmt(Expr::PipeExpr { .. })));
    }

    #[test]
    fn parses_parallel_pipe_then_forward() {
        let program = parse("10 \\> (x) -> x + 1 \\> (x) -> x * 2 /> (a, b) -> a + b");
        match &program[0] {
            Stmt::ExprStmt(Expr::PipeExpr { left, .. }) => {
                assert!(matches!(**left, Expr::ParallelPipeExpr { ref branches, .. } if branches.len() == 2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_spread_pipe_with_template_string_body() {
        let program = parse("[\"a\",\"b\",\"c\"] />>> (x, i) -> `${i}: ${x}`");
        match &program[0] {
            Stmt::ExprStmt(Expr::SpreadPipeExpr { right, .. }) => match &**right {
                Expr::FunctionExpr(lit) => assert!(matches!(lit.body, BodyExpr::Expr(_))),
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_ternary_and_memo_decorator_on_recursive_function() {
        let program = parse("let fib = (n) -> n <= 1 ? n : fib(n-1) + fib(n-2) #memo\nfib(30)");
        match &program[0] {
            Stmt::LetStmt { decorators, value, .. } => {
                assert_eq!(decorators.len(), 1);
                assert_eq!(decorators[0].name, "memo");
                assert!(matches!(value, Expr::FunctionExpr(_)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_match_with_pattern_guard_and_default() {
        let program = parse("match 0 | 0 -> \"zero\" | 1 -> \"one\" | \"other\"");
        match &program[0] {
            Stmt::ExprStmt(Expr::MatchExpr { cases, .. }) => {
                assert_eq!(cases.len(), 3);
                assert!(matches!(cases[2], MatchCase::Default { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_let_in_as_sugar_for_two_statements() {
        let program = parse("let user = { name: \"Alice\", age: 30 } in user.name");
        assert_eq!(program.len(), 2);
        assert!(matches!(program[0], Stmt::LetStmt { .. }));
        assert!(matches!(program[1], Stmt::ExprStmt(Expr::MemberExpr { .. })));
    }

    #[test]
    fn parses_record_literal_fields() {
        let program = parse("{ name: \"Alice\", age: 30 }");
        match &program[0] {
            Stmt::ExprStmt(Expr::RecordExpr(fields)) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_tuple_vs_grouping() {
        let program = parse("(1, 2)\n(3)");
        assert!(matches!(program[0], Stmt::ExprStmt(Expr::TupleExpr(_))));
        assert!(matches!(program[1], Stmt::ExprStmt(Expr::NumberLiteral(n)) if n == 3.0));
    }

    #[test]
    fn parses_function_with_type_annotations_and_default() {
        let program = parse("(x: int, y: int = 1) -> x + y");
        match &program[0] {
            Stmt::ExprStmt(Expr::FunctionExpr(lit)) => {
                assert_eq!(lit.params.len(), 2);
                assert!(lit.params[0].type_ann.is_some());
                assert!(lit.params[1].default.is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_attach_clause() {
        let program = parse("(x) attach(Logger) -> x");
        match &program[0] {
            Stmt::ExprStmt(Expr::FunctionExpr(lit)) => assert_eq!(lit.attachments, vec!["Logger".to_string()]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_pipeline_literal_with_spread_and_parallel_stages() {
        let program = parse("/>[ double, />>> triple, \\>(inc, dec) ]");
        match &program[0] {
            Stmt::ExprStmt(Expr::PipelineLiteral { stages, .. }) => assert_eq!(stages.len(), 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_bidirectional_pipeline_literal() {
        let program = parse("<>[ double, triple ]");
        match &program[0] {
            Stmt::ExprStmt(Expr::BidirectionalPipelineLiteral { stages, .. }) => assert_eq!(stages.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_context_and_provide_statements() {
        let program = parse("context Logger = null\nprovide Logger = \"real\"");
        assert!(matches!(program[0], Stmt::ContextDefStmt { .. }));
        assert!(matches!(program[1], Stmt::ProvideStmt { .. }));
    }

    #[test]
    fn parses_block_function_body() {
        let program = parse("(x) -> { let y = x + 1\ny * 2 }");
        match &program[0] {
            Stmt::ExprStmt(Expr::FunctionExpr(lit)) => match &lit.body {
                BodyExpr::Block { statements, .. } => assert_eq!(statements.len(), 1),
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn syntax_error_on_unexpected_token() {
        let err = parse_program(")").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }
}

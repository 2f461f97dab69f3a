//! Recursive-descent parser for the extended WHILE language.
//!
//! Grammar (statements are `;`-separated, the final `;` before `}` is
//! optional, control structures take no `;`):
//!
//! ```text
//! prog  := 'def' ID '(' vars ')' '->' '(' vars ')' body
//! body  := '{' (ctrl | stmt ';')* [stmt] '}'
//! stmt  := 'skip' | var ':=' aexp | 'break' | 'continue'
//! ctrl  := 'if' bexp body ['else' body]
//!        | 'while' bexp body
//!        | 'for' idx 'in' '[' aexp '..' aexp ']' body
//! aexp  := term (('+'|'-') term)*
//! term  := fact (('*'|'/') fact)*
//! fact  := var | num | '-' aexp | '(' aexp ')'
//! bexp  := 'true' | 'false' | aexp ('=='|'<'|'>') aexp
//! ```
//!
//! Scoping is enforced while parsing: every braced body opens a scope,
//! assignment targets define variables in the innermost scope, expression
//! operands must already be defined, and `for` indices must be fresh.

use anyhow::{bail, Result};
use rustc_hash::FxHashSet;

use crate::ast::{Body, Def, Stmt};
use crate::lexer::{tokenize, SpannedTok, Tok};
use crate::sym::{BinOp, Cond, Expr, Rel, Var};

/// Parses a complete WHILE routine from source text.
///
/// # Errors
///
/// Fails on lexical errors, syntax errors, and scope violations (undefined
/// or repeated variables, `break`/`continue` outside a loop, reused `for`
/// indices, outputs never assigned).
pub fn parse(source: &str) -> Result<Def> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_prog()
}

struct Parser {
    tokens: Vec<SpannedTok>,
    pos: usize,
    /// Innermost scope last; inputs live in the first entry.
    scopes: Vec<FxHashSet<Var>>,
    loop_depth: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedTok>) -> Self {
        let mut scopes = Vec::new();
        scopes.push(FxHashSet::default());
        Self {
            tokens,
            pos: 0,
            scopes,
            loop_depth: 0,
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |t| t.line)
    }

    fn advance(&mut self) -> Result<SpannedTok> {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                self.pos += 1;
                Ok(tok.clone())
            }
            None => bail!("Input ended unexpectedly"),
        }
    }

    fn unexpected(&self) -> anyhow::Error {
        match self.tokens.get(self.pos) {
            Some(tok) => anyhow::anyhow!(
                "Token \"{}\" at line {} was unexpected",
                tok.tok,
                tok.line
            ),
            None => anyhow::anyhow!("Input ended unexpectedly"),
        }
    }

    fn expect(&mut self, want: &Tok) -> Result<SpannedTok> {
        if self.peek() == Some(want) {
            self.advance()
        } else {
            Err(self.unexpected())
        }
    }

    fn eat(&mut self, want: &Tok) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<(Var, usize)> {
        match self.tokens.get(self.pos) {
            Some(SpannedTok {
                tok: Tok::Ident(name),
                line,
            }) => {
                let out = (name.clone(), *line);
                self.pos += 1;
                Ok(out)
            }
            _ => Err(self.unexpected()),
        }
    }

    // --- scope handling -------------------------------------------------

    fn defined(&self, name: &Var) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn define_innermost(&mut self, name: Var) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name);
        }
    }

    // --- grammar --------------------------------------------------------

    fn parse_prog(&mut self) -> Result<Def> {
        self.expect(&Tok::Def)?;
        let (name, _) = self.ident()?;

        self.expect(&Tok::LParen)?;
        let inputs = self.parse_vars("Input")?;
        for input in &inputs {
            self.define_innermost(input.clone());
        }
        self.expect(&Tok::RParen)?;
        self.expect(&Tok::To)?;
        self.expect(&Tok::LParen)?;
        let outputs = self.parse_vars("Output")?;
        self.expect(&Tok::RParen)?;

        let (body, top_scope) = self.parse_body()?;

        if self.pos != self.tokens.len() {
            return Err(self.unexpected());
        }

        let missing: Vec<&Var> = outputs.iter().filter(|v| !top_scope.contains(*v)).collect();
        match missing.as_slice() {
            [] => {}
            [only] => bail!("Output variable {only} is undefined"),
            many => bail!(
                "Output variables {} are undefined",
                many.iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }

        Ok(Def {
            name,
            inputs,
            outputs,
            body,
        })
    }

    fn parse_vars(&mut self, kind: &str) -> Result<Vec<Var>> {
        let mut vars: Vec<Var> = Vec::new();
        while let Some(Tok::Ident(_)) = self.peek() {
            let (name, line) = self.ident()?;
            if vars.contains(&name) {
                bail!("{kind} variable {name} at line {line} is repeated");
            }
            vars.push(name);
        }
        Ok(vars)
    }

    /// Parses a braced body, returning it with the set of variables its
    /// top-level scope defined (used for the output-variable check).
    fn parse_body(&mut self) -> Result<(Body, FxHashSet<Var>)> {
        self.expect(&Tok::LCurly)?;
        self.scopes.push(FxHashSet::default());

        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::RCurly) => break,
                Some(Tok::If | Tok::While | Tok::For) => stmts.push(self.parse_ctrl()?),
                Some(_) => {
                    stmts.push(self.parse_stmt()?);
                    if !self.eat(&Tok::Semicolon) && self.peek() != Some(&Tok::RCurly) {
                        return Err(self.unexpected());
                    }
                }
                None => bail!("Input ended unexpectedly"),
            }
        }
        self.expect(&Tok::RCurly)?;

        let scope = self.scopes.pop().unwrap_or_default();
        Ok((Body(stmts), scope))
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Tok::Skip) => {
                self.advance()?;
                Ok(Stmt::Skip)
            }
            Some(Tok::Break) => {
                let line = self.line();
                self.advance()?;
                if self.loop_depth == 0 {
                    bail!("Break at line {line} is outside of a loop");
                }
                Ok(Stmt::Break)
            }
            Some(Tok::Continue) => {
                let line = self.line();
                self.advance()?;
                if self.loop_depth == 0 {
                    bail!("Continue at line {line} is outside of a loop");
                }
                Ok(Stmt::Continue)
            }
            Some(Tok::Ident(_)) => {
                let (var, _) = self.ident()?;
                self.expect(&Tok::Assign)?;
                // The target is in scope for its own right-hand side.
                if !self.defined(&var) {
                    self.define_innermost(var.clone());
                }
                let expr = self.parse_aexp()?;
                Ok(Stmt::Assign { var, expr })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_ctrl(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Tok::If) => {
                self.advance()?;
                let cond = self.parse_bexp()?;
                let (then, _) = self.parse_body()?;
                let els = if self.eat(&Tok::Else) {
                    self.parse_body()?.0
                } else {
                    Body::default()
                };
                Ok(Stmt::If { cond, then, els })
            }
            Some(Tok::While) => {
                self.advance()?;
                let cond = self.parse_bexp()?;
                self.loop_depth += 1;
                let body = self.parse_body()?.0;
                self.loop_depth -= 1;
                Ok(Stmt::While { cond, body })
            }
            Some(Tok::For) => {
                self.advance()?;
                let (idx, line) = self.ident()?;
                if self.defined(&idx) {
                    bail!("Index {idx} at line {line} already exists");
                }
                self.expect(&Tok::In)?;
                self.expect(&Tok::LBrack)?;
                // The index is not in scope for its own bounds.
                let start = self.parse_aexp()?;
                self.expect(&Tok::Ellipses)?;
                let end = self.parse_aexp()?;
                self.expect(&Tok::RBrack)?;

                self.define_innermost(idx.clone());
                self.loop_depth += 1;
                let body = self.parse_body()?.0;
                self.loop_depth -= 1;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.remove(&idx);
                }
                Ok(Stmt::For {
                    idx,
                    start,
                    end,
                    body,
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_aexp(&mut self) -> Result<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            expr = Expr::bin(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut expr = self.parse_fact()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Times) => BinOp::Mul,
                Some(Tok::Divide) => BinOp::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_fact()?;
            expr = Expr::bin(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_fact(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Tok::Number(_)) => {
                if let Tok::Number(n) = self.advance()?.tok {
                    Ok(Expr::Num(n))
                } else {
                    Err(self.unexpected())
                }
            }
            Some(Tok::Ident(_)) => {
                let (name, line) = self.ident()?;
                if !self.defined(&name) {
                    bail!("Variable {name} at line {line} is undefined");
                }
                Ok(Expr::Var(name))
            }
            Some(Tok::Minus) => {
                // Unary minus negates the whole trailing expression.
                self.advance()?;
                let operand = self.parse_aexp()?;
                Ok(Expr::bin(BinOp::Sub, Expr::Num(0), operand))
            }
            Some(Tok::LParen) => {
                self.advance()?;
                let expr = self.parse_aexp()?;
                self.expect(&Tok::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_bexp(&mut self) -> Result<Cond> {
        if let Some(Tok::Bool(_)) = self.peek() {
            if let Tok::Bool(b) = self.advance()?.tok {
                return Ok(Cond::Bool(b));
            }
        }
        let lhs = self.parse_aexp()?;
        let rel = match self.peek() {
            Some(Tok::Equals) => Rel::Eq,
            Some(Tok::Less) => Rel::Lt,
            Some(Tok::Greater) => Rel::Gt,
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        let rhs = self.parse_aexp()?;
        Ok(Cond::Cmp { rel, lhs, rhs })
    }
}

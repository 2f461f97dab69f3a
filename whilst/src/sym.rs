//! Symbolic arithmetic expressions and boolean conditions.
//!
//! The analysis core relies on exactly three capabilities of this module:
//! structural equality, condition negation, and variable substitution
//! (`Expr::subs`). Any implementation providing those would satisfy the
//! analyzer; this one is purely syntactic.

use std::collections::BTreeMap;
use std::fmt;

use compact_str::CompactString;

/// Variable identifier.
pub type Var = CompactString;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// Arithmetic expression over integer literals and variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal.
    Num(i64),
    /// Variable reference.
    Var(Var),
    /// Binary operation.
    Bin {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Convenience constructor for a binary operation.
    #[must_use]
    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Substitutes every bound variable with its expression from `env`.
    ///
    /// Unbound variables are left in place.
    #[must_use]
    pub fn subs(&self, env: &Effect) -> Expr {
        match self {
            Self::Num(n) => Self::Num(*n),
            Self::Var(v) => env.get(v),
            Self::Bin { op, lhs, rhs } => Self::bin(*op, lhs.subs(env), rhs.subs(env)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Var(v) => f.write_str(v),
            Self::Bin { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}

/// Comparison relation between two arithmetic expressions.
///
/// The parser only produces `Eq`, `Lt` and `Gt`; the complementary forms
/// appear when a condition is negated during loop normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl Rel {
    /// The complementary relation.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
        }
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
        };
        f.write_str(symbol)
    }
}

/// Boolean condition guarding a conditional jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    /// Boolean literal.
    Bool(bool),
    /// Comparison between two arithmetic expressions.
    Cmp {
        /// Relation.
        rel: Rel,
        /// Left operand.
        lhs: Expr,
        /// Right operand.
        rhs: Expr,
    },
}

impl Cond {
    /// The logical negation of this condition.
    #[must_use]
    pub fn negated(&self) -> Self {
        match self {
            Self::Bool(b) => Self::Bool(!b),
            Self::Cmp { rel, lhs, rhs } => Self::Cmp {
                rel: rel.negated(),
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Cmp { rel, lhs, rhs } => write!(f, "{lhs} {rel} {rhs}"),
        }
    }
}

/// Variable-to-expression mapping describing the net effect of a code path.
///
/// Lookup of an unbound variable yields the variable itself, so an empty
/// effect is the identity mapping. Kept ordered for deterministic display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effect {
    bindings: BTreeMap<Var, Expr>,
}

impl Effect {
    /// The identity effect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An effect with a single binding.
    #[must_use]
    pub fn binding(var: Var, expr: Expr) -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(var, expr);
        Self { bindings }
    }

    /// The expression bound to `var`, or `var` itself when unbound.
    #[must_use]
    pub fn get(&self, var: &Var) -> Expr {
        self.bindings
            .get(var)
            .cloned()
            .unwrap_or_else(|| Expr::Var(var.clone()))
    }

    /// Whether no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates the bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Expr)> {
        self.bindings.iter()
    }

    /// Applies this effect after `incoming`.
    ///
    /// Every bound expression has `incoming` substituted into it; bindings
    /// of `incoming` for variables this effect does not touch are adopted
    /// unchanged.
    #[must_use]
    pub fn compose(&self, incoming: &Effect) -> Effect {
        let mut bindings: BTreeMap<Var, Expr> = self
            .bindings
            .iter()
            .map(|(var, expr)| (var.clone(), expr.subs(incoming)))
            .collect();
        for (var, expr) in &incoming.bindings {
            bindings
                .entry(var.clone())
                .or_insert_with(|| expr.clone());
        }
        Effect { bindings }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, expr)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var} -> {expr}")?;
        }
        f.write_str("}")
    }
}

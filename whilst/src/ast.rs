//! Abstract syntax tree for the extended WHILE language.
//!
//! `Display` doubles as the unparser: formatting a [`Def`] and parsing the
//! result yields a structurally equal tree, which the round-trip tests rely
//! on.

use std::fmt;

use crate::sym::{Cond, Expr, Var};

/// A complete routine: `def name (inputs) -> (outputs) { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Def {
    /// Routine name.
    pub name: Var,
    /// Input variables.
    pub inputs: Vec<Var>,
    /// Output variables.
    pub outputs: Vec<Var>,
    /// Routine body.
    pub body: Body,
}

/// A braced statement sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(pub Vec<Stmt>);

/// A statement or control structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `skip;`
    Skip,
    /// `var := aexp;`
    Assign {
        /// Assignment target.
        var: Var,
        /// Assigned expression.
        expr: Expr,
    },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `if cond { ... } else { ... }` (a missing `else` is an empty body).
    If {
        /// Branch condition.
        cond: Cond,
        /// True branch.
        then: Body,
        /// False branch.
        els: Body,
    },
    /// `while cond { ... }`
    While {
        /// Loop condition.
        cond: Cond,
        /// Loop body.
        body: Body,
    },
    /// `for idx in [start .. end] { ... }`
    For {
        /// Loop index, fresh in the enclosing scope.
        idx: Var,
        /// Inclusive lower bound.
        start: Expr,
        /// Inclusive upper bound.
        end: Expr,
        /// Loop body.
        body: Body,
    },
}

impl fmt::Display for Def {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "def {} ({}) -> ({}) {}",
            self.name,
            self.inputs.join(" "),
            self.outputs.join(" "),
            self.body
        )
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, stmt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{stmt}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip;"),
            Self::Assign { var, expr } => write!(f, "{var} := {expr};"),
            Self::Break => f.write_str("break;"),
            Self::Continue => f.write_str("continue;"),
            Self::If { cond, then, els } => write!(f, "if {cond} {then} else {els}"),
            Self::While { cond, body } => write!(f, "while {cond} {body}"),
            Self::For {
                idx,
                start,
                end,
                body,
            } => write!(f, "for {idx} in [{start}..{end}] {body}"),
        }
    }
}

//! Bytecode lowering: AST to the flat instruction sequence.
//!
//! Control structures compile to conditional jumps whose fallthrough is the
//! true branch, with relative offsets measured from the emitting
//! instruction. `break`/`continue` lower to placeholder markers patched by
//! the innermost enclosing `while`; `for` desugars to a counted `while`
//! before lowering.

use crate::ast::{Body, Def, Stmt};
use crate::cfg::Instr;
use crate::sym::{BinOp, Cond, Expr, Rel, Var};

/// A lowered slot: either a finished instruction or a jump placeholder
/// still owed its offset by the enclosing loop.
enum Slot {
    Instr(Instr),
    Break,
    Continue,
}

/// Lowers a routine to its instruction sequence, terminated by `End`.
#[must_use]
pub fn lower(def: &Def) -> Vec<Instr> {
    let mut code = Vec::new();
    lower_body(&def.body, &mut code);
    let mut instrs: Vec<Instr> = code
        .into_iter()
        .map(|slot| match slot {
            Slot::Instr(instr) => instr,
            // The parser rejects break/continue outside a loop.
            Slot::Break | Slot::Continue => {
                unreachable!("loop marker escaped every enclosing while")
            }
        })
        .collect();
    instrs.push(Instr::End);
    instrs
}

fn lower_body(body: &Body, out: &mut Vec<Slot>) {
    for stmt in &body.0 {
        lower_stmt(stmt, out);
    }
}

#[allow(clippy::cast_possible_wrap)] // instruction counts stay tiny
fn lower_stmt(stmt: &Stmt, out: &mut Vec<Slot>) {
    match stmt {
        Stmt::Skip => {}
        Stmt::Assign { var, expr } => out.push(Slot::Instr(Instr::Assign {
            var: var.clone(),
            expr: expr.clone(),
        })),
        Stmt::Break => out.push(Slot::Break),
        Stmt::Continue => out.push(Slot::Continue),
        Stmt::If { cond, then, els } => {
            let mut else_code = Vec::new();
            lower_body(els, &mut else_code);
            let mut then_code = Vec::new();
            lower_body(then, &mut then_code);
            then_code.push(Slot::Instr(Instr::Jump {
                delta: else_code.len() as isize + 1,
            }));
            out.push(Slot::Instr(Instr::CondJump {
                cond: cond.clone(),
                delta: then_code.len() as isize + 1,
                loops: false,
            }));
            out.extend(then_code);
            out.extend(else_code);
        }
        Stmt::While { cond, body } => {
            let mut body_code = Vec::new();
            lower_body(body, &mut body_code);
            body_code.push(Slot::Instr(Instr::Jump {
                delta: -(body_code.len() as isize) - 1,
            }));
            let len = body_code.len();
            for (i, slot) in body_code.iter_mut().enumerate() {
                match slot {
                    Slot::Continue => {
                        *slot = Slot::Instr(Instr::Jump {
                            delta: -(i as isize) - 1,
                        });
                    }
                    Slot::Break => {
                        *slot = Slot::Instr(Instr::Jump {
                            delta: (len - i) as isize,
                        });
                    }
                    Slot::Instr(_) => {}
                }
            }
            out.push(Slot::Instr(Instr::CondJump {
                cond: cond.clone(),
                delta: len as isize + 1,
                loops: true,
            }));
            out.extend(body_code);
        }
        Stmt::For {
            idx,
            start,
            end,
            body,
        } => {
            // for i in [a..b] desugars to:
            //   i_k := a; i_lim := b + 1;
            //   while i_k < i_lim { i := i_k; i_k := i_k + 1; ...body }
            let k = Var::from(format!("{idx}_k"));
            let lim = Var::from(format!("{idx}_lim"));
            let mut stmts = vec![
                Stmt::Assign {
                    var: idx.clone(),
                    expr: Expr::Var(k.clone()),
                },
                Stmt::Assign {
                    var: k.clone(),
                    expr: Expr::bin(BinOp::Add, Expr::Var(k.clone()), Expr::Num(1)),
                },
            ];
            stmts.extend(body.0.iter().cloned());

            lower_stmt(
                &Stmt::Assign {
                    var: k.clone(),
                    expr: start.clone(),
                },
                out,
            );
            lower_stmt(
                &Stmt::Assign {
                    var: lim.clone(),
                    expr: Expr::bin(BinOp::Add, end.clone(), Expr::Num(1)),
                },
                out,
            );
            lower_stmt(
                &Stmt::While {
                    cond: Cond::Cmp {
                        rel: Rel::Lt,
                        lhs: Expr::Var(k),
                        rhs: Expr::Var(lim),
                    },
                    body: Body(stmts),
                },
                out,
            );
        }
    }
}

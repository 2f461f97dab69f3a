//! Graph construction from the flat instruction sequence.
//!
//! Jumps never become nodes: every fallthrough and branch target is
//! resolved by chasing chains of unconditional jumps (each contributing its
//! own delta) until a real operation or the terminal `END` is reached.

use anyhow::{ensure, Result};

use super::types::{Graph, Instr, NodeId, NodeKind};

/// Builds the control-flow graph for an instruction sequence.
///
/// # Errors
///
/// Rejects malformed input outright: a sequence not terminated by exactly
/// one `End`, a jump or branch offset outside the sequence, or a jump chain
/// that never reaches a non-jump instruction.
pub fn build(instrs: &[Instr]) -> Result<Graph> {
    ensure!(
        matches!(instrs.last(), Some(Instr::End)),
        "instruction sequence does not end with END"
    );
    ensure!(
        instrs
            .iter()
            .filter(|instr| matches!(instr, Instr::End))
            .count()
            == 1,
        "instruction sequence contains more than one END"
    );

    let mut graph = Graph::default();

    // Allocate one node per retained (non-jump) instruction so targets can
    // be linked in a second pass.
    let mut node_at: Vec<Option<NodeId>> = Vec::with_capacity(instrs.len());
    for instr in instrs {
        let id = match instr {
            Instr::Assign { var, expr } => Some(graph.push_node(
                NodeKind::Assign {
                    var: var.clone(),
                    expr: expr.clone(),
                },
                None,
            )),
            Instr::CondJump { cond, loops, .. } => Some(graph.push_node(
                NodeKind::Branch {
                    cond: cond.clone(),
                    loops: *loops,
                    // Placeholder until the branch target is resolved.
                    diverge: 0,
                },
                None,
            )),
            Instr::Jump { .. } => None,
            Instr::End => Some(graph.push_node(NodeKind::End, None)),
        };
        node_at.push(id);
    }
    graph.order = node_at.iter().copied().flatten().collect();

    for (i, instr) in instrs.iter().enumerate() {
        let Some(id) = node_at[i] else { continue };
        match instr {
            Instr::Assign { .. } => {
                let target = chase(instrs, &node_at, i, 1)?;
                graph.node_mut(id).primary = Some(target);
                graph.add_pred(target, id);
            }
            Instr::CondJump { delta, .. } => {
                let primary = chase(instrs, &node_at, i, 1)?;
                graph.node_mut(id).primary = Some(primary);
                graph.add_pred(primary, id);

                let diverge = chase(instrs, &node_at, i, *delta)?;
                if let NodeKind::Branch { diverge: slot, .. } = &mut graph.node_mut(id).kind {
                    *slot = diverge;
                }
                graph.add_pred(diverge, id);
            }
            Instr::Jump { .. } | Instr::End => {}
        }
    }

    Ok(graph)
}

/// Resolves the target `delta` away from instruction `i`, following any
/// chain of unconditional jumps, to the node of the first real operation.
fn chase(
    instrs: &[Instr],
    node_at: &[Option<NodeId>],
    i: usize,
    delta: isize,
) -> Result<NodeId> {
    let mut j = offset(i, delta, instrs.len())?;
    let mut steps = 0usize;
    loop {
        match &instrs[j] {
            Instr::Jump { delta } => {
                steps += 1;
                // A chain longer than the sequence must revisit a jump.
                ensure!(
                    steps <= instrs.len(),
                    "jump chain starting at instruction {i} never reaches an operation"
                );
                j = offset(j, *delta, instrs.len())?;
            }
            _ => {
                return node_at[j].ok_or_else(|| {
                    anyhow::anyhow!("instruction {j} was not retained in the graph")
                })
            }
        }
    }
}

fn offset(from: usize, delta: isize, len: usize) -> Result<usize> {
    isize::try_from(from)
        .ok()
        .and_then(|f| f.checked_add(delta))
        .and_then(|t| usize::try_from(t).ok())
        .filter(|&t| t < len)
        .ok_or_else(|| {
            anyhow::anyhow!("jump target {delta:+} from instruction {from} is out of bounds")
        })
}

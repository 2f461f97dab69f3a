//! Iteration-effect propagation.
//!
//! Computes, per node, the accumulated variable-to-expression mappings of
//! every path reaching it, and the per-iteration effect stored on summary
//! nodes. Solving the resulting recurrences into closed forms is an
//! explicit extension point, not part of this module's contract.

use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

use crate::cfg::{Graph, NodeId, NodeKind};
use crate::sym::Effect;

/// Composes the net effect of one trip around the loop body: the
/// primary-only walk from `body_entry` back to `header`.
///
/// A body whose primary path reaches `exit_landing` instead (a loop whose
/// body unconditionally breaks) contributes the effect accumulated up to
/// that point.
///
/// # Errors
///
/// Fails when the walk reaches the routine's end or runs past the active
/// node count without closing the trip; both violate the normalization
/// postcondition.
pub fn iteration_effect(
    graph: &Graph,
    header: NodeId,
    body_entry: NodeId,
    exit_landing: NodeId,
) -> Result<Effect> {
    let mut effect = Effect::new();
    let mut current = body_entry;
    let mut steps = 0usize;

    while current != header && current != exit_landing {
        steps += 1;
        if steps > graph.active_len() {
            bail!("loop body does not return to its header");
        }
        let node = graph.node(current);
        match &node.kind {
            NodeKind::Assign { var, expr } => {
                effect = Effect::binding(var.clone(), expr.clone()).compose(&effect);
            }
            NodeKind::Summary {
                effect: inner_effect,
                ..
            } => {
                effect = inner_effect.compose(&effect);
            }
            NodeKind::Branch { .. } => {}
            NodeKind::End => bail!("loop body does not return to its header"),
        }
        match node.primary {
            Some(next) => current = next,
            None => bail!("loop body does not return to its header"),
        }
    }

    Ok(effect)
}

/// Work-list traversal computing, for every reachable node, the effect
/// mappings accumulated along each path from the entry node.
///
/// Assignments compose their binding into the incoming mapping; non-loop
/// conditionals fork an unmodified copy down both edges; summary nodes
/// compose their iteration effect along the successor and forward the
/// incoming mapping unchanged along continuation edges. A still-live loop
/// header propagates one trip through its body and then stops (the branch
/// tag below), so the traversal also terminates on graphs that were never
/// normalized.
#[must_use]
pub fn propagate(graph: &Graph) -> FxHashMap<NodeId, Vec<Effect>> {
    let mut reached: FxHashMap<NodeId, Vec<Effect>> = FxHashMap::default();
    // (node, accumulated effect, guarding loop header already entered)
    let mut stack: Vec<(NodeId, Effect, Option<NodeId>)> =
        vec![(graph.entry(), Effect::new(), None)];

    while let Some((id, effect, branch_tag)) = stack.pop() {
        reached.entry(id).or_default().push(effect.clone());
        let node = graph.node(id);
        match &node.kind {
            NodeKind::Assign { var, expr } => {
                if let Some(next) = node.primary {
                    let composed = Effect::binding(var.clone(), expr.clone()).compose(&effect);
                    stack.push((next, composed, branch_tag));
                }
            }
            NodeKind::Branch {
                loops: false,
                diverge,
                ..
            } => {
                if let Some(next) = node.primary {
                    stack.push((next, effect.clone(), branch_tag));
                }
                stack.push((*diverge, effect, branch_tag));
            }
            NodeKind::Branch { loops: true, .. } => {
                // One trip through the body, then stop at the header.
                if branch_tag != Some(id) {
                    if let Some(next) = node.primary {
                        stack.push((next, effect, branch_tag.or(Some(id))));
                    }
                }
            }
            NodeKind::Summary {
                effect: iteration,
                continuations,
                ..
            } => {
                if let Some(next) = node.primary {
                    stack.push((next, iteration.compose(&effect), branch_tag));
                }
                for &target in continuations {
                    stack.push((target, effect.clone(), branch_tag));
                }
            }
            NodeKind::End => {}
        }
    }

    reached
}

//! Breakpoint resolution: classifying loop-exit edges and normalizing
//! branch polarity.
//!
//! Inside a loop body a conditional's diverge edge may continue the body,
//! break past the loop, or continue back to the header; which it is only
//! becomes known by tracing where control lands relative to the header's
//! own exit. After resolution every breakpoint's `diverge` uniformly means
//! "leave the loop" and `primary` uniformly means "keep iterating".

use anyhow::{anyhow, bail, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cfg::{Graph, NodeId};

/// One recorded decision point: the conditional whose outcome was taken,
/// whether the diverge edge was the one followed, and where the walk
/// landed.
#[derive(Debug, Clone, Copy)]
struct TraceStep {
    cond: NodeId,
    diverged: bool,
    landing: NodeId,
}

/// Resolves the breakpoints of the loop at `header`, normalizing branch
/// polarity in place.
///
/// Returns the conditionals whose diverge edge is a genuine loop exit
/// after normalization; the header itself is included while its own
/// condition still guards the loop. Transient resolver state (the reentry
/// budgets and flip markers of the trace) lives here, not on the nodes.
///
/// # Errors
///
/// Fails on control patterns the trace cannot normalize: a conditional
/// whose reentry budget is exhausted while a reclassification is still
/// required, or a body walk that never reaches a decision point (possible
/// when an inner loop was left unresolved).
pub fn resolve(graph: &mut Graph, header: NodeId, branches: &[NodeId]) -> Result<Vec<NodeId>> {
    let header_label = graph.label_of(header).unwrap_or(0);
    let body_entry = graph
        .primary(header)
        .ok_or_else(|| anyhow!("loop header at label {header_label} has no body edge"))?;
    let exit_landing = graph
        .diverge(header)
        .ok_or_else(|| anyhow!("loop header at label {header_label} has no exit edge"))?;
    let branch_set: FxHashSet<NodeId> = branches.iter().copied().collect();

    // Forward pass: follow primary edges from the header, recording a step
    // whenever the walk stands on the header's exit landing or a sibling
    // branch, then continue the walk from that branch's both edges.
    let mut queue: Vec<TraceStep> = vec![TraceStep {
        cond: header,
        diverged: false,
        landing: body_entry,
    }];
    let mut trace: Vec<TraceStep> = Vec::new();
    let mut budget: FxHashMap<NodeId, u8> = FxHashMap::default();

    let cap = (graph.active_len() + 1) * (branches.len() + 2) * 2;
    let mut steps = 0usize;
    while let Some(step) = queue.pop() {
        steps += 1;
        if steps > cap {
            bail!(
                "unsupported control pattern in loop at label {header_label}: \
                 body walk does not reach a decision point"
            );
        }
        if step.landing == header {
            continue;
        }
        if step.landing == exit_landing || branch_set.contains(&step.landing) {
            trace.push(step);
            budget.insert(step.cond, 2);
            if branch_set.contains(&step.landing) {
                let branch = step.landing;
                let primary = graph.primary(branch).ok_or_else(|| {
                    anyhow!("conditional at label {header_label} is missing an edge")
                })?;
                let diverge = graph.diverge(branch).ok_or_else(|| {
                    anyhow!("conditional at label {header_label} is missing an edge")
                })?;
                queue.push(TraceStep {
                    cond: branch,
                    diverged: false,
                    landing: primary,
                });
                queue.push(TraceStep {
                    cond: branch,
                    diverged: true,
                    landing: diverge,
                });
            }
        } else {
            let next = graph.primary(step.landing).ok_or_else(|| {
                anyhow!(
                    "unsupported control pattern in loop at label {header_label}: \
                     body walk fell off the routine"
                )
            })?;
            queue.push(TraceStep {
                landing: next,
                ..step
            });
        }
    }

    // Backward pass: from the landing points toward the header, decide for
    // each recorded conditional whether its traced outcome exits the loop,
    // flipping polarity where the non-diverge edge was the exiting one.
    let mut flipped: FxHashSet<NodeId> = FxHashSet::default();
    for step in trace.into_iter().rev() {
        let mut diverged = step.diverged;
        if flipped.remove(&step.cond) {
            diverged = !diverged;
        }

        let landed_on_branch = branch_set.contains(&step.landing);
        let keeps_iterating = (graph.is_loop(step.cond) && diverged)
            || (landed_on_branch
                && (graph.is_loop(step.landing)
                    || budget.get(&step.landing).copied().unwrap_or(0) == 0));

        if keeps_iterating {
            let remaining = budget.entry(step.cond).or_insert(0);
            if *remaining == 0 {
                bail!(
                    "unsupported control pattern in loop at label {header_label}: \
                     reentry budget exhausted at a conditional still awaiting \
                     reclassification"
                );
            }
            *remaining -= 1;
            continue;
        }

        graph.toggle_loop(step.cond);
        if !diverged {
            // The exit was reached through the primary edge: swap edges and
            // negate the guard so diverge uniformly means "leave the loop".
            graph.flip_branch(step.cond);
            flipped.insert(step.cond);
        }
    }

    let mut breakpoints: Vec<NodeId> = Vec::new();
    for &candidate in std::iter::once(&header).chain(branches) {
        if graph.is_loop(candidate) {
            breakpoints.push(candidate);
        }
    }
    Ok(breakpoints)
}

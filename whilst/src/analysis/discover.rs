//! Loop discovery: grouping loop headers by nesting depth.

use rustc_hash::FxHashSet;

use crate::cfg::{Graph, NodeId, NodeKind};

/// A discovered loop: its header and the non-loop conditionals met at the
/// same nesting depth before control returns past the header.
#[derive(Debug, Clone)]
pub struct LoopSite {
    /// The loop's header node.
    pub header: NodeId,
    /// Sibling branch nodes inside the loop body, at this loop's depth.
    pub branches: Vec<NodeId>,
}

/// Discovers every loop header reachable from the entry node, grouped by
/// nesting depth (index 0 is outermost).
///
/// A routine without loops yields an empty mapping; callers treat that as
/// nothing to normalize.
#[must_use]
pub fn discover(graph: &Graph) -> Vec<Vec<LoopSite>> {
    let mut levels: Vec<Vec<LoopSite>> = Vec::new();
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    explore(graph, &[graph.entry()], None, 0, &mut visited, &mut levels);
    levels
}

/// Explores one region depth-first, collecting non-loop conditionals as
/// sibling branches and recursing into loop interiors at depth+1. `end` is
/// the exploration boundary: the enclosing header's diverge target, never
/// crossed while inside its loop.
fn explore(
    graph: &Graph,
    seeds: &[NodeId],
    end: Option<NodeId>,
    depth: usize,
    visited: &mut FxHashSet<NodeId>,
    levels: &mut Vec<Vec<LoopSite>>,
) -> Vec<NodeId> {
    let mut branches = Vec::new();
    let mut stack: Vec<NodeId> = seeds
        .iter()
        .copied()
        .filter(|&s| !visited.contains(&s) && Some(s) != end)
        .collect();

    while let Some(v) = stack.pop() {
        if visited.contains(&v) || Some(v) == end {
            continue;
        }
        visited.insert(v);

        if let NodeKind::Branch { loops, diverge, .. } = &graph.node(v).kind {
            let (loops, diverge) = (*loops, *diverge);
            if loops {
                let interior_seeds: Vec<NodeId> = graph.primary(v).into_iter().collect();
                let inner = explore(
                    graph,
                    &interior_seeds,
                    Some(diverge),
                    depth + 1,
                    visited,
                    levels,
                );
                if levels.len() <= depth {
                    levels.resize_with(depth + 1, Vec::new);
                }
                levels[depth].push(LoopSite {
                    header: v,
                    branches: inner,
                });
            } else {
                branches.push(v);
            }
            if !visited.contains(&diverge) && Some(diverge) != end {
                stack.push(diverge);
            }
        }
        if let Some(next) = graph.primary(v) {
            if !visited.contains(&next) && Some(next) != end {
                stack.push(next);
            }
        }
    }

    branches
}

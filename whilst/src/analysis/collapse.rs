//! Loop collapsing: replacing a resolved loop with a single summary node.

use rustc_hash::FxHashSet;

use crate::cfg::{Graph, NodeId, NodeKind};
use crate::sym::Effect;

/// Collapses the loop at `header` into one summary node.
///
/// `body_entry` and `exit_landing` are the header's primary and diverge
/// targets snapshotted before resolution, so the summary's successor is
/// the original exit regardless of any polarity flips. The summary takes
/// over the header's external predecessors; edges leaving the interior for
/// anywhere other than the exit landing are recorded as continuation
/// edges; the header and interior leave the active node index.
///
/// Returns the summary's node id.
pub fn collapse(
    graph: &mut Graph,
    header: NodeId,
    body_entry: NodeId,
    exit_landing: NodeId,
    effect: Effect,
) -> NodeId {
    // The interior: everything reachable from the body entry without
    // crossing the header or the exit landing.
    let mut interior: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack = vec![body_entry];
    while let Some(v) = stack.pop() {
        if v == header || v == exit_landing || interior.contains(&v) {
            continue;
        }
        interior.insert(v);
        stack.extend(graph.successors(v));
    }

    // Continuation edges: interior successors that are neither interior
    // nor the canonical ways out.
    let mut continuations: Vec<NodeId> = Vec::new();
    for &v in &interior {
        for target in graph.successors(v) {
            if target != header
                && target != exit_landing
                && !interior.contains(&target)
                && !continuations.contains(&target)
            {
                continuations.push(target);
            }
        }
    }
    continuations.sort_unstable_by_key(|&t| graph.label_of(t).unwrap_or(usize::MAX));

    let cond = match &graph.node(header).kind {
        NodeKind::Branch { cond, .. } => cond.clone(),
        // Only branch nodes are ever discovered as headers.
        other => unreachable!("collapse of a non-conditional header: {other:?}"),
    };

    let summary = graph.push_node(
        NodeKind::Summary {
            cond,
            continuations: continuations.clone(),
            effect,
        },
        Some(exit_landing),
    );

    // External predecessors of the header now enter the summary instead.
    let preds: Vec<NodeId> = graph.node(header).preds.to_vec();
    for pred in preds {
        if pred == header || interior.contains(&pred) {
            continue;
        }
        graph.retarget_edge(pred, header, summary);
        graph.add_pred(summary, pred);
    }

    // Interior in-edges die with the interior; the summary takes their
    // place on the exit landing and on every continuation target.
    let stale: Vec<NodeId> = graph
        .node(exit_landing)
        .preds
        .iter()
        .copied()
        .filter(|p| *p == header || interior.contains(p))
        .collect();
    for pred in stale {
        graph.remove_pred(exit_landing, pred);
    }
    graph.add_pred(exit_landing, summary);
    for &target in &continuations {
        let stale: Vec<NodeId> = graph
            .node(target)
            .preds
            .iter()
            .copied()
            .filter(|p| interior.contains(p))
            .collect();
        for pred in stale {
            graph.remove_pred(target, pred);
        }
        graph.add_pred(target, summary);
    }

    // The summary inherits the header's display slot; the interior leaves
    // the active index.
    if let Some(pos) = graph.order.iter().position(|&n| n == header) {
        graph.order[pos] = summary;
    }
    graph.order.retain(|id| !interior.contains(id));

    summary
}

//! Instruction and graph node types.

use std::fmt;

use smallvec::SmallVec;

use crate::sym::{Cond, Effect, Expr, Var};

/// Index of a node in the graph arena. Stable for the graph's lifetime;
/// collapsing a loop retires indices but never reuses them.
pub type NodeId = usize;

/// One instruction of the flat, linearly addressed bytecode.
///
/// Jump offsets are relative to the emitting instruction's own index.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Straight-line assignment.
    Assign {
        /// Assignment target.
        var: Var,
        /// Assigned expression.
        expr: Expr,
    },
    /// Two-way branch. Fallthrough is the true branch; `delta` targets the
    /// false branch. `loops` marks headers produced by `while` desugaring.
    CondJump {
        /// Branch condition.
        cond: Cond,
        /// Relative offset of the false branch.
        delta: isize,
        /// Whether this conditional is a loop header.
        loops: bool,
    },
    /// Unconditional relative jump. Resolved away during graph
    /// construction; never appears as a node.
    Jump {
        /// Relative offset of the target.
        delta: isize,
    },
    /// Terminal marker, exactly one per sequence, always last.
    End,
}

/// Node payload, one variant per retained instruction plus the summary
/// nodes introduced by loop collapsing.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Straight-line assignment.
    Assign {
        /// Assignment target.
        var: Var,
        /// Assigned expression.
        expr: Expr,
    },
    /// Conditional branch. `primary` (on [`Node`]) is the true edge.
    Branch {
        /// Branch condition.
        cond: Cond,
        /// Loop-header flag; toggled during breakpoint resolution.
        loops: bool,
        /// The false edge.
        diverge: NodeId,
    },
    /// A collapsed loop.
    Summary {
        /// The loop condition at collapse time.
        cond: Cond,
        /// Targets re-entered from within the collapsed region other than
        /// the canonical exit.
        continuations: Vec<NodeId>,
        /// Net effect of one trip around the loop body.
        effect: Effect,
    },
    /// Terminal node, no successors.
    End,
}

/// A graph node: payload plus edges. All edges are arena indices.
#[derive(Debug, Clone)]
pub struct Node {
    /// Payload.
    pub kind: NodeKind,
    /// Normal successor: fallthrough for assignments, true branch for
    /// conditionals, exit landing for summaries. `None` only for `End`.
    pub primary: Option<NodeId>,
    /// Nodes whose `primary` or `diverge` edge targets this node.
    pub preds: SmallVec<[NodeId; 2]>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, primary: Option<NodeId>) -> Self {
        Self {
            kind,
            primary,
            preds: SmallVec::new(),
        }
    }

    /// The false edge, present only on conditional nodes.
    #[must_use]
    pub fn diverge(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Branch { diverge, .. } => Some(diverge),
            _ => None,
        }
    }

    /// Whether this node is a conditional currently flagged as a loop
    /// header.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self.kind, NodeKind::Branch { loops: true, .. })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Assign { var, expr } => write!(f, "{var} := {expr}"),
            NodeKind::Branch { cond, .. } => write!(f, "{cond}"),
            NodeKind::Summary { cond, .. } => write!(f, "LOOP({cond})"),
            NodeKind::End => f.write_str("END"),
        }
    }
}

/// Control-flow graph: an arena of nodes plus the active program-order
/// listing used for stable display labels.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node arena. Retired nodes stay allocated but leave [`Graph::order`].
    pub nodes: Vec<Node>,
    /// Active nodes in original program order (jumps removed); shrinks as
    /// loops collapse, never grows.
    pub order: Vec<NodeId>,
}

impl Graph {
    /// The entry node: the first active node in program order.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.order.first().copied().unwrap_or(0)
    }

    /// Number of active nodes.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.order.len()
    }

    /// The 1-indexed display label of an active node, `None` once it has
    /// been collapsed away.
    #[must_use]
    pub fn label_of(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id).map(|pos| pos + 1)
    }

    /// Borrows a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Mutably borrows a node.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// The node's primary successor.
    #[must_use]
    pub fn primary(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].primary
    }

    /// The node's diverge successor, if it is a conditional.
    #[must_use]
    pub fn diverge(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].diverge()
    }

    /// Whether the node is a conditional currently flagged as a loop
    /// header.
    #[must_use]
    pub fn is_loop(&self, id: NodeId) -> bool {
        self.nodes[id].is_loop()
    }

    /// All outgoing edges of a node: primary, diverge, and any
    /// continuation edges of a summary.
    #[must_use]
    pub fn successors(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        let node = &self.nodes[id];
        let mut out = SmallVec::new();
        if let Some(primary) = node.primary {
            out.push(primary);
        }
        match &node.kind {
            NodeKind::Branch { diverge, .. } => out.push(*diverge),
            NodeKind::Summary { continuations, .. } => out.extend(continuations.iter().copied()),
            _ => {}
        }
        out
    }

    pub(crate) fn push_node(&mut self, kind: NodeKind, primary: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(kind, primary));
        id
    }

    pub(crate) fn add_pred(&mut self, target: NodeId, source: NodeId) {
        let preds = &mut self.nodes[target].preds;
        if !preds.contains(&source) {
            preds.push(source);
        }
    }

    pub(crate) fn remove_pred(&mut self, target: NodeId, source: NodeId) {
        self.nodes[target].preds.retain(|&mut p| p != source);
    }

    /// Retargets whichever of `from`'s edges pointed at `old_to` onto
    /// `new_to`. Both edges are rewritten when both pointed there.
    pub(crate) fn retarget_edge(&mut self, from: NodeId, old_to: NodeId, new_to: NodeId) {
        let node = &mut self.nodes[from];
        if node.primary == Some(old_to) {
            node.primary = Some(new_to);
        }
        if let NodeKind::Branch { diverge, .. } = &mut node.kind {
            if *diverge == old_to {
                *diverge = new_to;
            }
        }
    }

    /// Flips a conditional's polarity: swaps its primary and diverge edges
    /// and negates its condition.
    pub(crate) fn flip_branch(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if let NodeKind::Branch { cond, diverge, .. } = &mut node.kind {
            let old_primary = node.primary;
            node.primary = Some(*diverge);
            if let Some(primary) = old_primary {
                *diverge = primary;
            }
            *cond = cond.negated();
        }
    }

    /// Toggles a conditional's loop-header flag.
    pub(crate) fn toggle_loop(&mut self, id: NodeId) {
        if let NodeKind::Branch { loops, .. } = &mut self.nodes[id].kind {
            *loops = !*loops;
        }
    }
}

//! Control-flow graph construction and queries.
//!
//! The graph is an arena of nodes addressed by stable indices; edges are
//! indices, so replacing a node (loop collapsing) is a matter of
//! retargeting predecessor indices rather than chasing aliases. The active
//! program-order listing (`Graph::order`) provides the stable display
//! labels used everywhere a node is shown to the user.

mod builder;
mod render;
mod types;

pub use builder::build;
pub use render::{dot_hook, to_dot};
pub use types::{Graph, Instr, Node, NodeId, NodeKind};

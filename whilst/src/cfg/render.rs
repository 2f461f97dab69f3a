//! Graphviz DOT emission for graph snapshots.
//!
//! The analyzer invokes a render hook after each normalization pass; the
//! hook produced by [`dot_hook`] writes one `.dot` file per snapshot.
//! Rendering never influences analysis results, and hook failures are
//! reported to stderr rather than propagated.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use super::types::{Graph, NodeKind};

/// Renders the active graph as Graphviz DOT text.
///
/// Primary edges are black; diverge edges are red for loop headers and
/// blue for plain branches; continuation edges of collapsed loops are
/// dashed gray. Node labels are the stable display labels.
#[must_use]
pub fn to_dot(graph: &Graph) -> String {
    let mut dot = String::new();
    dot.push_str("digraph cfg {\n");
    dot.push_str("    node [shape=circle, width=.2, height=.2, fontsize=10];\n");

    for (pos, &id) in graph.order.iter().enumerate() {
        let node = graph.node(id);
        let _ = writeln!(
            dot,
            "    n{id} [label=\"{}\", tooltip=\"{}\"];",
            pos + 1,
            escape(&node.to_string())
        );
    }
    for &id in &graph.order {
        let node = graph.node(id);
        if let Some(primary) = node.primary {
            let _ = writeln!(dot, "    n{id} -> n{primary} [color=black];");
        }
        match &node.kind {
            NodeKind::Branch { loops, diverge, .. } => {
                let color = if *loops { "red" } else { "blue" };
                let _ = writeln!(dot, "    n{id} -> n{diverge} [color={color}];");
            }
            NodeKind::Summary { continuations, .. } => {
                for target in continuations {
                    let _ = writeln!(
                        dot,
                        "    n{id} -> n{target} [color=gray, style=dashed];"
                    );
                }
            }
            _ => {}
        }
    }
    dot.push_str("}\n");
    dot
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A render hook writing `cfg_<label>.dot` snapshots into `dir`.
///
/// Write failures are reported once per file on stderr; analysis carries
/// on regardless.
pub fn dot_hook(dir: PathBuf) -> impl FnMut(&Graph, &str) {
    move |graph, label| {
        let path = dir.join(format!("cfg_{label}.dot"));
        if let Err(err) = fs::write(&path, to_dot(graph)) {
            eprintln!("warning: could not write {}: {err}", path.display());
        }
    }
}

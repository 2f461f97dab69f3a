use super::*;
use crate::cfg::{build, Graph, Instr, NodeId, NodeKind};
use crate::lower::lower;
use crate::parser::parse;
use crate::sym::{Cond, Expr, Rel, Var};

fn graph_for(source: &str) -> Graph {
    build(&lower(&parse(source).expect("parse"))).expect("build")
}

/// Edge structure of the active graph, for before/after comparisons.
fn snapshot(graph: &Graph) -> Vec<(NodeId, Option<NodeId>, Option<NodeId>, bool)> {
    graph
        .order
        .iter()
        .map(|&id| (id, graph.primary(id), graph.diverge(id), graph.is_loop(id)))
        .collect()
}

fn summary_ids(graph: &Graph) -> Vec<NodeId> {
    graph
        .order
        .iter()
        .copied()
        .filter(|&id| matches!(graph.node(id).kind, NodeKind::Summary { .. }))
        .collect()
}

#[test]
fn test_no_loops_yields_empty_mapping_and_untouched_graph() {
    let mut graph = graph_for("def f (a) -> (x) { x := a; if a < 1 {x := 1;} else {} }");
    assert!(discover(&graph).is_empty());

    let before = snapshot(&graph);
    let report = analyze(&mut graph);
    assert!(report.loops.is_empty());
    assert_eq!(snapshot(&graph), before, "analysis must not touch the graph");
}

#[test]
fn test_nesting_depths_inner_at_one_outer_at_zero() {
    let graph = graph_for(
        "def f (c) -> (x y) { x := 0; y := 0; \
         while x < c { while y < c { y := y + 1; } x := x + 1; } }",
    );
    let levels = discover(&graph);
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].len(), 1, "one outer loop at depth 0");
    assert_eq!(levels[1].len(), 1, "one inner loop at depth 1");
    let outer = levels[0][0].header;
    let inner = levels[1][0].header;
    assert_ne!(outer, inner);
    // The inner header sits inside the outer body
    assert_eq!(graph.primary(outer), Some(inner));
}

#[test]
fn test_scenario_a_single_if_break() {
    let mut graph = graph_for(
        "def f (c) -> (x) { x := 0; while true { x := x + 1; if x < c {break;} } }",
    );
    let end = *graph.order.last().expect("end node");
    let report = analyze(&mut graph);

    assert_eq!(report.loops.len(), 1);
    let entry = &report.loops[0];
    assert_eq!(entry.error, None);
    assert_eq!(
        entry.breakpoints.len(),
        1,
        "exactly one breakpoint, the if node"
    );
    assert_eq!(entry.breakpoints, vec![4]);
    assert_eq!(entry.iteration_effect.get("x").map(String::as_str), Some("(x + 1)"));

    let summaries = summary_ids(&graph);
    assert_eq!(summaries.len(), 1);
    let NodeKind::Summary { continuations, .. } = &graph.node(summaries[0]).kind else {
        panic!("expected summary");
    };
    assert!(continuations.is_empty(), "no continuation edges");
    assert_eq!(graph.primary(summaries[0]), Some(end));
    // x := 0, the summary, END
    assert_eq!(graph.active_len(), 3);
}

#[test]
fn test_scenario_b_break_in_inner_loop_only() {
    let mut graph = graph_for(
        "def f (c) -> (x y) { x := 0; y := 0; \
         while x < c { while y < c { y := y + 1; if y == c {break;} } x := x + 1; } }",
    );
    let report = analyze(&mut graph);

    assert_eq!(report.loops.len(), 2);
    let inner = &report.loops[0];
    let outer = &report.loops[1];
    // Inner loop first (innermost level), with its single breakpoint
    assert_eq!(inner.header_label, 4);
    assert_eq!(inner.breakpoints, vec![6]);
    assert_eq!(inner.iteration_effect.get("y").map(String::as_str), Some("(y + 1)"));
    // The outer loop contributes no breakpoints beyond its own header
    assert_eq!(outer.header_label, 3);
    assert!(outer.breakpoints.is_empty());
    // One trip of the outer body includes the collapsed inner loop's effect
    assert_eq!(outer.iteration_effect.get("x").map(String::as_str), Some("(x + 1)"));
    assert_eq!(outer.iteration_effect.get("y").map(String::as_str), Some("(y + 1)"));

    // Both loops collapsed; only the outer summary remains active
    assert_eq!(summary_ids(&graph).len(), 1);
    assert_eq!(graph.active_len(), 4);
}

#[test]
fn test_scenario_c_sequential_loops_are_independent() {
    let mut graph = graph_for(
        "def f (a) -> (x) { x := 0; while x < a { x := x + 1; } while x > 0 { x := x - 1; } }",
    );
    let levels = discover(&graph);
    assert_eq!(levels.len(), 1, "both loops at depth 0");
    assert_eq!(levels[0].len(), 2);

    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 2);
    assert!(report.loops.iter().all(|l| l.error.is_none()));
    assert!(report.loops.iter().all(|l| l.breakpoints.is_empty()));
    assert_eq!(
        report.loops[0].iteration_effect.get("x").map(String::as_str),
        Some("(x + 1)")
    );
    assert_eq!(
        report.loops[1].iteration_effect.get("x").map(String::as_str),
        Some("(x - 1)")
    );
    // x := 0, two summaries, END
    assert_eq!(summary_ids(&graph).len(), 2);
    assert_eq!(graph.active_len(), 4);
}

#[test]
fn test_resolution_is_idempotent() {
    let mut graph = graph_for(
        "def f (c) -> (x) { x := 0; while true { x := x + 1; if x < c {break;} } }",
    );
    let levels = discover(&graph);
    let site = &levels[0][0];

    let first = resolve(&mut graph, site.header, &site.branches).expect("resolve");
    let after_first = snapshot(&graph);
    let second = resolve(&mut graph, site.header, &site.branches).expect("re-resolve");
    assert_eq!(first, second, "same breakpoint set");
    assert_eq!(snapshot(&graph), after_first, "no additional flips");
}

#[test]
fn test_normalized_primary_path_returns_to_header() {
    let mut graph = graph_for(
        "def f (c) -> (x) { x := 0; while true { x := x + 1; if x < c {break;} } }",
    );
    let levels = discover(&graph);
    let site = &levels[0][0];
    let body_entry = graph.primary(site.header).expect("body");
    resolve(&mut graph, site.header, &site.branches).expect("resolve");

    // Following primary edges only, never diverging, must reach the header
    let mut current = body_entry;
    for _ in 0..graph.active_len() {
        if current == site.header {
            break;
        }
        current = graph.primary(current).expect("primary");
    }
    assert_eq!(current, site.header, "continue-semantics preserved");
}

#[test]
fn test_summary_successor_is_pre_flip_exit() {
    // The body unconditionally breaks, so resolution flips the header
    // itself; the summary must still exit to the original landing point.
    let mut graph = graph_for("def f (a) -> (x) { x := 0; while true { x := 1; break; } }");
    let end = *graph.order.last().expect("end node");
    let exit_before = {
        let levels = discover(&graph);
        graph.diverge(levels[0][0].header).expect("exit")
    };
    assert_eq!(exit_before, end);

    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    assert!(
        report.loops[0].breakpoints.is_empty(),
        "a body that always exits leaves no breakpoints"
    );
    assert_eq!(
        report.loops[0].iteration_effect.get("x").map(String::as_str),
        Some("1")
    );
    let summaries = summary_ids(&graph);
    assert_eq!(summaries.len(), 1);
    assert_eq!(graph.primary(summaries[0]), Some(exit_before));
}

#[test]
fn test_loop_without_internal_exits_still_collapses() {
    let mut graph = graph_for("def f (c) -> (x) { x := 0; while x < c { x := x + 1; } }");
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    assert!(report.loops[0].breakpoints.is_empty());
    assert_eq!(report.loops[0].error, None);
    let summaries = summary_ids(&graph);
    assert_eq!(summaries.len(), 1);
    let NodeKind::Summary { continuations, .. } = &graph.node(summaries[0]).kind else {
        panic!("expected summary");
    };
    assert!(continuations.is_empty());
    assert_eq!(graph.active_len(), 3);
}

#[test]
fn test_node_count_decreases_monotonically() {
    let mut graph = graph_for(
        "def f (c) -> (x y) { x := 0; y := 0; \
         while x < c { while y < c { y := y + 1; } x := x + 1; } }",
    );
    let mut counts = vec![graph.active_len()];
    analyze_with_hook(&mut graph, &mut |g, _| counts.push(g.active_len()));
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "collapse is monotonic: {counts:?}");
    }
    assert!(counts.last() < counts.first());
}

#[test]
fn test_hook_observes_passes_without_affecting_results() {
    let source = "def f (a) -> (x) { x := 0; while x < a { x := x + 1; } \
                  while x > 0 { x := x - 1; } }";
    let mut with_hook = graph_for(source);
    let mut labels = Vec::new();
    let report_hooked = analyze_with_hook(&mut with_hook, &mut |_, label| {
        labels.push(label.to_owned());
    });
    // start, one per collapsed loop, end
    assert_eq!(labels.first().map(String::as_str), Some("start"));
    assert_eq!(labels.last().map(String::as_str), Some("end"));
    assert_eq!(labels.len(), 4);

    let mut without_hook = graph_for(source);
    let report_plain = analyze(&mut without_hook);
    assert_eq!(snapshot(&with_hook), snapshot(&without_hook));
    assert_eq!(
        report_hooked.loops.len(),
        report_plain.loops.len()
    );
}

#[test]
fn test_unsupported_pattern_is_reported_not_hung() {
    // A self-looping assignment that never reaches a decision point: not
    // producible from source, but the resolver must reject it cleanly.
    let cond = |rel| Cond::Cmp {
        rel,
        lhs: Expr::Var(Var::from("x")),
        rhs: Expr::Num(0),
    };
    let instrs = vec![
        Instr::CondJump {
            cond: cond(Rel::Lt),
            delta: 3,
            loops: true,
        },
        Instr::Assign {
            var: Var::from("x"),
            expr: Expr::Num(1),
        },
        Instr::Jump { delta: -1 },
        Instr::End,
    ];
    let mut graph = build(&instrs).expect("build");
    let before = graph.active_len();
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    assert!(report.has_failures());
    let message = report.loops[0].error.as_deref().expect("error");
    assert!(message.contains("unsupported control pattern"));
    assert_eq!(graph.active_len(), before, "failed loop is left alone");
}

#[test]
fn test_failed_loop_does_not_corrupt_siblings() {
    let cond = |rel| Cond::Cmp {
        rel,
        lhs: Expr::Var(Var::from("x")),
        rhs: Expr::Num(0),
    };
    let instrs = vec![
        // First loop: irreducible body (self-looping assignment)
        Instr::CondJump {
            cond: cond(Rel::Lt),
            delta: 3,
            loops: true,
        },
        Instr::Assign {
            var: Var::from("x"),
            expr: Expr::Num(1),
        },
        Instr::Jump { delta: -1 },
        // Second loop: perfectly ordinary
        Instr::CondJump {
            cond: cond(Rel::Gt),
            delta: 3,
            loops: true,
        },
        Instr::Assign {
            var: Var::from("x"),
            expr: Expr::Num(2),
        },
        Instr::Jump { delta: -2 },
        Instr::End,
    ];
    let mut graph = build(&instrs).expect("build");
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 2);
    assert!(report.loops[0].error.is_some());
    assert!(report.loops[1].error.is_none());
    assert_eq!(summary_ids(&graph).len(), 1, "the healthy loop collapsed");
}

#[test]
fn test_propagate_accumulates_assignments() {
    let graph = graph_for("def f (a b) -> (x y) { x := a + 1; y := x; }");
    let reached = propagate(&graph);
    let end = *graph.order.last().expect("end");
    let at_end = reached.get(&end).expect("reached end");
    assert_eq!(at_end.len(), 1);
    assert_eq!(
        at_end[0].get(&Var::from("y")),
        Expr::bin(crate::sym::BinOp::Add, Expr::Var(Var::from("a")), Expr::Num(1)),
        "y is expressed in terms of routine inputs"
    );
}

#[test]
fn test_propagate_forks_at_branches() {
    let graph = graph_for("def f (a) -> (x) { if a < 1 {x := 1;} else {x := 2;} }");
    let reached = propagate(&graph);
    let end = *graph.order.last().expect("end");
    let at_end = reached.get(&end).expect("reached end");
    assert_eq!(at_end.len(), 2, "one mapping per path");
}

#[test]
fn test_propagate_composes_summary_effects() {
    let mut graph = graph_for("def f (c) -> (x) { x := 0; while x < c { x := x + 1; } }");
    analyze(&mut graph);
    let reached = propagate(&graph);
    let end = *graph.order.last().expect("end");
    let at_end = reached.get(&end).expect("reached end");
    assert_eq!(at_end.len(), 1);
    assert_eq!(
        at_end[0].get(&Var::from("x")).to_string(),
        "(0 + 1)",
        "one iteration effect applied to the entry mapping"
    );
}

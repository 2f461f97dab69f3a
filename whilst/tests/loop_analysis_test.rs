//! End-to-end analysis over source programs: parse, lower, build, analyze.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Tests use unwrap for clarity

use whilst::analysis::{analyze, discover};
use whilst::cfg::{build, Graph, NodeKind};
use whilst::lower::lower;
use whilst::parser::parse;

fn graph_for(source: &str) -> Graph {
    build(&lower(&parse(source).expect("parse"))).expect("build")
}

fn active_summaries(graph: &Graph) -> usize {
    graph
        .order
        .iter()
        .filter(|&&id| matches!(graph.node(id).kind, NodeKind::Summary { .. }))
        .count()
}

#[test]
fn test_straight_line_program_has_nothing_to_analyze() {
    let mut graph = graph_for("def f (a b) -> (x) { x := a + b; x := x * 2; }");
    let before = graph.active_len();
    let report = analyze(&mut graph);
    assert!(report.loops.is_empty());
    assert_eq!(graph.active_len(), before);
    assert_eq!(active_summaries(&graph), 0);
}

#[test]
fn test_for_loop_is_analyzed_through_its_desugaring() {
    let mut graph = graph_for(
        "def f (a b) -> (x) { x := 0; for i in [a..b] { x := x + i; } }",
    );
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    let entry = &report.loops[0];
    assert_eq!(entry.error, None);
    assert!(entry.breakpoints.is_empty());
    assert_eq!(entry.condition, "i_k < i_lim");
    // One trip advances the desugared counter and the index
    assert_eq!(
        entry.iteration_effect.get("i_k").map(String::as_str),
        Some("(i_k + 1)")
    );
    assert_eq!(entry.iteration_effect.get("i").map(String::as_str), Some("i_k"));
    assert_eq!(
        entry.iteration_effect.get("x").map(String::as_str),
        Some("(x + i_k)")
    );
    assert_eq!(active_summaries(&graph), 1);
}

#[test]
fn test_break_inside_nested_conditionals() {
    // The break sits one conditional deep; both its if and the outer if
    // chain are sibling branches of the same loop level.
    let mut graph = graph_for(
        "def f (a c) -> (x) { x := 0; \
         while true { x := x + 1; if a < c { if x < c {break;} } else {} } }",
    );
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    let entry = &report.loops[0];
    assert_eq!(entry.error, None);
    assert_eq!(entry.breakpoints.len(), 1, "only the break's if diverges out");
    assert_eq!(active_summaries(&graph), 1);
}

#[test]
fn test_loop_whose_body_always_breaks_is_degenerate() {
    let mut graph = graph_for(
        "def f (a) -> (x) { x := 0; \
         while true { if a < 1 {x := 1; break;} else {x := 2; break;} } }",
    );
    let end = *graph.order.last().unwrap();
    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 1);
    assert!(report.loops[0].breakpoints.is_empty());
    assert_eq!(report.loops[0].error, None);
    // Still collapsed, still exiting to the original landing point
    let summary = graph
        .order
        .iter()
        .copied()
        .find(|&id| matches!(graph.node(id).kind, NodeKind::Summary { .. }))
        .expect("summary");
    assert_eq!(graph.primary(summary), Some(end));
}

#[test]
fn test_three_level_nesting_collapses_inside_out() {
    let mut graph = graph_for(
        "def f (c) -> (x y z) { x := 0; y := 0; z := 0; \
         while x < c { \
           while y < c { \
             while z < c { z := z + 1; } \
             y := y + 1; \
           } \
           x := x + 1; \
         } }",
    );
    let levels = discover(&graph);
    assert_eq!(levels.len(), 3);
    assert!(levels.iter().all(|level| level.len() == 1));

    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 3);
    assert!(report.loops.iter().all(|l| l.error.is_none()));
    // Deepest first in the report
    assert_eq!(
        report.loops[0].condition, "z < c",
        "innermost loop resolves first"
    );
    assert_eq!(report.loops[2].condition, "x < c");
    // Only the outermost summary stays active
    assert_eq!(active_summaries(&graph), 1);
    // x := 0, y := 0, z := 0, summary, END
    assert_eq!(graph.active_len(), 5);
}

#[test]
fn test_the_kitchen_sink_program() {
    // Sequential and nested control in one routine: a plain branch before
    // the loops, an infinite outer loop, an inner while with a break, and
    // a for whose body always breaks.
    let mut graph = graph_for(
        "
        def func (a b c) -> (x y) {
          x := a + 1;
          y := b + 3;
          if x == y {a := 4}
          else {b := 5;}
          z := 3;
          while true {
            x := y;
            if x == y + 1 {a := 4}
            else {b := 5;}
            m := 3;
            if x == y {x := y;}
            else {y := 3;}
            while m < 3 {
              if x == m {break;}
              if x == m + 1 {x := m + 1;}
            }
            for i in [x .. b+4] {
              x := x + i;
              if x == i {break;}
              else {x := x; break;}
            }
            m := 3;
          }
        }
        ",
    );
    let levels = discover(&graph);
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].len(), 1, "the outer while");
    assert_eq!(levels[1].len(), 2, "the inner while and the desugared for");

    let report = analyze(&mut graph);
    assert_eq!(report.loops.len(), 3);
    assert!(report.loops.iter().all(|l| l.error.is_none()), "{report:?}");

    let inner_while = report
        .loops
        .iter()
        .find(|l| l.condition == "m < 3")
        .expect("inner while report");
    assert_eq!(
        inner_while.breakpoints.len(),
        1,
        "one break escapes the inner while"
    );

    let for_loop = report
        .loops
        .iter()
        .find(|l| l.condition == "i_k < i_lim")
        .expect("for report");
    assert!(
        for_loop.breakpoints.is_empty(),
        "a body that always breaks has no cycle"
    );

    let outer = report
        .loops
        .iter()
        .find(|l| l.condition == "true")
        .expect("outer report");
    assert!(outer.breakpoints.is_empty(), "nothing breaks the outer loop");

    // Everything inside the outer loop collapsed into one summary
    assert_eq!(active_summaries(&graph), 1);
}

#[test]
fn test_report_serializes_to_json() {
    let mut graph = graph_for("def f (c) -> (x) { x := 0; while x < c { x := x + 1; } }");
    let report = analyze(&mut graph);
    let json = serde_json::to_value(&report).expect("serialize");
    let loops = json.get("loops").and_then(|l| l.as_array()).expect("loops");
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0]["condition"], "x < c");
    assert_eq!(loops[0]["iteration_effect"]["x"], "(x + 1)");
    assert!(loops[0]["error"].is_null());
}

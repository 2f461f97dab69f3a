//! Loop-structure analysis: discovery, breakpoint resolution, collapsing,
//! and iteration-effect propagation.
//!
//! The pipeline runs strictly innermost-first: every loop of the deepest
//! nesting level is normalized and collapsed before any enclosing loop is
//! touched, so each resolver pass sees at most one live loop level. A
//! resolver failure aborts that loop alone; sibling loops already
//! processed keep their state and later loops still run.

mod breakpoints;
mod collapse;
mod discover;
mod effects;

pub use breakpoints::resolve;
pub use collapse::collapse;
pub use discover::{discover, LoopSite};
pub use effects::{iteration_effect, propagate};

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cfg::Graph;

/// Diagnostics for one analyzed loop.
#[derive(Debug, Clone, Serialize)]
pub struct LoopReport {
    /// Display label of the loop header at resolution time.
    pub header_label: usize,
    /// The loop condition, as displayed.
    pub condition: String,
    /// Labels of the breakpoints found inside the body, in program order.
    /// Empty when the header's own condition is the only way out.
    pub breakpoints: Vec<usize>,
    /// Net effect of one trip around the loop body.
    pub iteration_effect: BTreeMap<String, String>,
    /// Why resolution was aborted, if it was; the loop is left uncollapsed.
    pub error: Option<String>,
}

/// Diagnostics for a whole analysis pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    /// One entry per discovered loop, innermost level first.
    pub loops: Vec<LoopReport>,
}

impl AnalysisReport {
    /// Whether any loop failed to resolve.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.loops.iter().any(|l| l.error.is_some())
    }
}

/// Runs the full analysis without a render hook.
pub fn analyze(graph: &mut Graph) -> AnalysisReport {
    analyze_with_hook(graph, &mut |_, _| {})
}

/// Runs the full analysis, invoking `hook` with a graph snapshot and a
/// pass label after construction, after each loop's collapse, and at the
/// end. The hook is observational only; a no-op hook yields identical
/// results.
pub fn analyze_with_hook(
    graph: &mut Graph,
    hook: &mut dyn FnMut(&Graph, &str),
) -> AnalysisReport {
    hook(graph, "start");

    let levels = discover(graph);
    let mut report = AnalysisReport::default();

    // Innermost level first: inner loops must be summary nodes by the time
    // an enclosing loop is resolved.
    for level in levels.iter().rev() {
        for site in level {
            // A header swallowed by an earlier collapse would have no
            // label; discovery precludes it, collapsed loops are disjoint.
            let Some(header_label) = graph.label_of(site.header) else {
                continue;
            };
            let Some(body_entry) = graph.primary(site.header) else {
                continue;
            };
            let Some(exit_landing) = graph.diverge(site.header) else {
                continue;
            };
            let condition = graph.node(site.header).to_string();

            let outcome = resolve(graph, site.header, &site.branches).and_then(|found| {
                let effect = iteration_effect(graph, site.header, body_entry, exit_landing)?;
                Ok((found, effect))
            });

            match outcome {
                Ok((found, effect)) => {
                    let mut breakpoints: Vec<usize> = found
                        .iter()
                        .filter(|&&b| b != site.header)
                        .filter_map(|&b| graph.label_of(b))
                        .collect();
                    breakpoints.sort_unstable();

                    let iteration_effect = effect
                        .iter()
                        .map(|(var, expr)| (var.to_string(), expr.to_string()))
                        .collect();

                    collapse(graph, site.header, body_entry, exit_landing, effect);
                    hook(graph, &header_label.to_string());

                    report.loops.push(LoopReport {
                        header_label,
                        condition,
                        breakpoints,
                        iteration_effect,
                        error: None,
                    });
                }
                Err(err) => {
                    report.loops.push(LoopReport {
                        header_label,
                        condition,
                        breakpoints: Vec::new(),
                        iteration_effect: BTreeMap::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }
    }

    hook(graph, "end");
    report
}

#[cfg(test)]
mod tests;

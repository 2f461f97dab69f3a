//! whilst - control-flow and loop-structure analysis for the extended
//! WHILE language.
//!
//! The pipeline turns a routine's source text into a navigable control
//! flow graph and normalizes its loop structure for higher-level
//! reasoning:
//!
//! ```text
//! source -> tokens -> AST -> bytecode -> CFG -> loop analysis
//! ```
//!
//! - [`parser`] and [`ast`] implement the front end; [`lower`] flattens a
//!   routine into jump-offset bytecode.
//! - [`cfg`] resolves jump offsets into direct node references, producing
//!   an arena-indexed graph with at most two successor edges per node.
//! - [`analysis`] discovers loop headers by nesting depth, determines
//!   which edges exit each loop (repairing branch polarity so `diverge`
//!   uniformly means "leave the loop"), and collapses each fully-resolved
//!   loop into a single summary node carrying its per-iteration effect.
//! - [`sym`] provides the symbolic expressions and effect mappings the
//!   analysis composes; deriving closed-form recurrences from them is an
//!   extension point, deliberately out of scope.
//!
//! # Example
//!
//! ```
//! use whilst::{analysis, cfg, lower, parser};
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = "def f (c) -> (x) { x := 0; while x < c { x := x + 1; } }";
//! let def = parser::parse(source)?;
//! let mut graph = cfg::build(&lower::lower(&def))?;
//! let report = analysis::analyze(&mut graph);
//! assert_eq!(report.loops.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod ast;
pub mod cfg;
pub mod cli;
pub mod config;
pub mod entry_point;
pub mod lexer;
pub mod lower;
pub mod output;
pub mod parser;
pub mod sym;

//! Terminal and JSON reporting.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::analysis::AnalysisReport;
use crate::ast::Def;
use crate::cfg::Graph;

fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);

    if cfg!(test) {
        table.set_width(120);
    }
    table
}

/// Print the unparsed abstract syntax tree.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_ast(writer: &mut impl Write, def: &Def) -> std::io::Result<()> {
    writeln!(writer, "{def}")
}

/// Print the active node listing in program order, one labelled line per
/// node.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_listing(writer: &mut impl Write, graph: &Graph) -> std::io::Result<()> {
    for (pos, &id) in graph.order.iter().enumerate() {
        writeln!(writer, "{:>4}  {}", pos + 1, graph.node(id))?;
    }
    Ok(())
}

/// Print the per-loop analysis table.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_analysis(writer: &mut impl Write, report: &AnalysisReport) -> std::io::Result<()> {
    if report.loops.is_empty() {
        writeln!(writer, "  No loops were found.")?;
        return Ok(());
    }

    for entry in &report.loops {
        writeln!(
            writer,
            "  Analyzing loop at label {}",
            entry.header_label.to_string().bold()
        )?;
        if let Some(reason) = &entry.error {
            writeln!(writer, "    ! {}", reason.red())?;
        } else if entry.breakpoints.is_empty() {
            writeln!(writer, "    - There are no cycles and hence no breakpoints.")?;
        } else {
            let labels: Vec<String> = entry.breakpoints.iter().map(ToString::to_string).collect();
            writeln!(
                writer,
                "    + The breakpoints are at labels: [{}]",
                labels.join(", ")
            )?;
        }
    }

    writeln!(writer, "\n{}", "Loop summary".bold().underline())?;
    let mut table = create_table(vec!["Label", "Condition", "Breakpoints", "Iteration effect"]);
    for entry in &report.loops {
        let breakpoints = if entry.error.is_some() {
            "failed".to_owned()
        } else if entry.breakpoints.is_empty() {
            "-".to_owned()
        } else {
            entry
                .breakpoints
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let effect = entry
            .iteration_effect
            .iter()
            .map(|(var, expr)| format!("{var} -> {expr}"))
            .collect::<Vec<_>>()
            .join(", ");
        let status_color = if entry.error.is_some() {
            Color::Red
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(entry.header_label).add_attribute(Attribute::Dim),
            Cell::new(&entry.condition).add_attribute(Attribute::Bold),
            Cell::new(breakpoints).fg(status_color),
            Cell::new(effect),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}

/// Print the analysis report as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn print_analysis_json(writer: &mut impl Write, report: &AnalysisReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

//! Shared CLI entry point.
//!
//! Every front end (the `whilst` binary, tests) funnels through
//! [`run_with_args_to`] so behavior and output stay identical and
//! capturable.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::analysis;
use crate::cfg;
use crate::cli::Cli;
use crate::config::Config;
use crate::lower::lower;
use crate::output;
use crate::parser::parse;

/// Runs the analyzer with the given arguments using stdout as the writer.
///
/// # Errors
///
/// Returns an error if argument parsing fails, or if the command execution
/// fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Runs the analyzer with the given arguments, writing output to the
/// specified writer.
///
/// This is the testable version of [`run_with_args`] that allows output
/// capture.
///
/// # Errors
///
/// Returns an error if reading the source file or writing output fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["whilst".to_owned()];
    program_args.extend(args);
    let cli = match Cli::try_parse_from(program_args) {
        Ok(cli) => cli,
        Err(e) => {
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    write!(writer, "{e}")?;
                    writer.flush()?;
                    return Ok(0);
                }
                _ => {
                    eprint!("{e}");
                    return Ok(1);
                }
            }
        }
    };

    let file_dir = cli
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let config = Config::load_from_dir(&file_dir);

    if cli.no_color || cli.json || !config.whilst.color {
        colored::control::set_override(false);
    }

    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("could not read {}", cli.file.display()))?;
    let display_name = cli.file.display().to_string();

    let def = match parse(&source) {
        Ok(def) => def,
        Err(err) => {
            eprintln!("error: {display_name}: {err}");
            return Ok(1);
        }
    };

    let mut graph = match cfg::build(&lower(&def)) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("error: {display_name}: {err}");
            return Ok(1);
        }
    };

    if cli.ast {
        writeln!(writer, "The abstract syntax tree for {display_name} is:\n")?;
        output::print_ast(writer, &def)?;
        writeln!(writer)?;
    }

    if cli.cfg {
        writeln!(writer, "The control flow graph for {display_name} is:\n")?;
        output::print_listing(writer, &graph)?;
        let dot_path = file_dir.join("cfg.dot");
        fs::write(&dot_path, cfg::to_dot(&graph))
            .with_context(|| format!("could not write {}", dot_path.display()))?;
        writeln!(writer, "\nThe control flow graph is stored in cfg.dot")?;
        writeln!(writer)?;
    }

    if cli.analyze {
        let snapshot_dir = snapshot_dir(&cli, &config, &file_dir);
        let report = match snapshot_dir {
            Some(dir) => {
                let mut hook = cfg::dot_hook(dir);
                analysis::analyze_with_hook(&mut graph, &mut hook)
            }
            None => analysis::analyze(&mut graph),
        };

        if cli.json {
            output::print_analysis_json(writer, &report)?;
        } else {
            writeln!(writer, "Loop structure analysis for {display_name}:\n")?;
            output::print_analysis(writer, &report)?;
        }
        if report.has_failures() {
            return Ok(1);
        }
    }

    if !cli.ast && !cli.cfg && !cli.analyze && !cli.json {
        writeln!(
            writer,
            "{display_name}: parsed successfully; use -a, -c or -z to inspect it"
        )?;
    }

    Ok(0)
}

/// Where `-z` snapshots go: the explicit flag wins, then the config file;
/// no snapshots are written when neither asks for them.
fn snapshot_dir(cli: &Cli, config: &Config, file_dir: &Path) -> Option<PathBuf> {
    if let Some(dir) = &cli.dot_dir {
        return Some(dir.clone());
    }
    if config.whilst.dot {
        return Some(
            config
                .whilst
                .dot_dir
                .as_ref()
                .map_or_else(|| file_dir.to_path_buf(), PathBuf::from),
        );
    }
    None
}

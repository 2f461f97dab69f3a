//! Command line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "whilst - control-flow and loop-structure analysis for the extended WHILE language",
    long_about = None
)]
pub struct Cli {
    /// A .ewl file to be parsed.
    pub file: PathBuf,

    /// Print the abstract syntax tree for the program.
    #[arg(short = 'a', long)]
    pub ast: bool,

    /// Print the control-flow graph's node listing and write cfg.dot.
    #[arg(short = 'c', long)]
    pub cfg: bool,

    /// Analyze the program's loop structure.
    #[arg(short = 'z', long)]
    pub analyze: bool,

    /// Output the analysis report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write cfg_<label>.dot snapshots after each analysis pass into DIR.
    #[arg(long, value_name = "DIR")]
    pub dot_dir: Option<PathBuf>,

    /// Disable colored terminal output.
    #[arg(long)]
    pub no_color: bool,
}

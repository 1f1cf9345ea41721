//! Command-line interface for `astalign`.
//!
//! # Examples
//!
//! ```bash
//! # Run a corpus with the default parsers (Hermes against espree and babel)
//! astalign run corpus/member_expression.json --snapshots snapshots
//!
//! # Re-record snapshot baselines
//! astalign run corpus/member_expression.json --snapshots snapshots --update-snapshots
//!
//! # Print the canonical snapshot text for a source
//! echo 'one?.two;' | astalign render -
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use minijs::Shape;

/// Align a primary JavaScript parser's syntax trees with reference parsers.
#[derive(Parser, Debug, Clone)]
#[command(name = "astalign", author, version, about, long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every case of a corpus and report verdicts
    Run(RunArgs),

    /// Print the canonical snapshot text of a source
    Render(RenderArgs),

    /// List the registered divergence categories
    Categories(CategoriesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Corpus file (.json or .toml)
    pub corpus: PathBuf,

    /// Configuration file; `./astalign.toml` is used when present
    #[arg(long, short = 'c', env = "ASTALIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot baseline directory, overriding `snapshot_dir`
    #[arg(long, env = "ASTALIGN_SNAPSHOTS")]
    pub snapshots: Option<PathBuf>,

    /// Rewrite snapshot baselines instead of checking them
    #[arg(long, short = 'u', env = "ASTALIGN_UPDATE_SNAPSHOTS")]
    pub update_snapshots: bool,

    /// Only run cases whose name contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Treat stale failure expectations as failures
    #[arg(long)]
    pub strict: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Source file, or `-` for stdin
    pub source: String,

    /// Tree shape to parse into
    #[arg(long, default_value = "hermes")]
    pub shape: Shape,

    /// Dialect used to normalize before rendering
    #[arg(long, default_value = "hermes")]
    pub dialect: String,
}

#[derive(Args, Debug, Clone)]
pub struct CategoriesArgs {
    /// Configuration file whose `[[category]]` entries are listed too
    #[arg(long, short = 'c', env = "ASTALIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Report output formats.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored per-case lines and a summary
    #[default]
    Human,
    /// The full run summary as JSON
    Json,
}

impl Cli {
    /// Default `tracing` directive for the verbosity count.
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

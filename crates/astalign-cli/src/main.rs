#![forbid(unsafe_code)]

//! # astalign
//!
//! Runs alignment corpora: every case is parsed by a primary parser and a set
//! of reference parsers, the normalized trees are compared, and each
//! divergence is checked against the tolerance the case declares.
//!
//! ## Usage
//!
//! ```bash
//! astalign run corpus.json                     # check against references
//! astalign run corpus.json --snapshots snaps   # also check snapshot baselines
//! astalign run corpus.json --format json       # machine-readable report
//! astalign render --shape estree file.js       # canonical tree text
//! astalign categories                          # known divergence categories
//! ```
//!
//! Exit status is 0 when every case passes, 1 when any case fails and 2 when
//! the configuration or corpus cannot be loaded.

mod cli;
mod command;
mod config;
mod report;

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use astalign::{Corpus, Dialect, FsSnapshotStore, SnapshotMode};
use clap::Parser;
use termcolor::{ColorChoice, StandardStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{CategoriesArgs, Cli, Command, OutputFormat, RenderArgs, RunArgs};
use config::Config;

const EXIT_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

/// `ASTALIGN_LOG`, then `RUST_LOG`, then the `-v` level; always to stderr.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("ASTALIGN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Run(args) => run(args),
        Command::Render(args) => render(args),
        Command::Categories(args) => categories(args),
    }
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color || !io::stdout().is_terminal() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn run(args: &RunArgs) -> anyhow::Result<ExitCode> {
    let config = Config::discover(args.config.as_deref())?;
    let corpus = Corpus::load(&args.corpus)?;
    info!(corpus = %args.corpus.display(), cases = corpus.len(), "loaded corpus");

    let mut runner = config.build_runner()?;
    match args.snapshots.clone().or_else(|| config.snapshot_dir()) {
        Some(dir) => {
            let mode = if args.update_snapshots {
                SnapshotMode::Update
            } else {
                SnapshotMode::Check
            };
            info!(dir = %dir.display(), ?mode, "snapshot baselines");
            runner = runner.snapshots(Arc::new(FsSnapshotStore::new(dir)), mode);
        }
        None if args.update_snapshots => {
            anyhow::bail!("--update-snapshots needs a snapshot directory (--snapshots or `snapshot_dir`)");
        }
        None => {}
    }

    let summary = runner.run_corpus(&corpus, args.filter.as_deref());
    match args.format {
        OutputFormat::Human => {
            let mut out = StandardStream::stdout(color_choice(args.no_color));
            report::write_human(&mut out, &summary, args.strict)?;
        }
        OutputFormat::Json => report::write_json(&mut io::stdout().lock(), &summary)?,
    }

    Ok(if report::run_failed(&summary, args.strict) {
        ExitCode::from(EXIT_FAILED)
    } else {
        ExitCode::SUCCESS
    })
}

fn render(args: &RenderArgs) -> anyhow::Result<ExitCode> {
    let source = if args.source == "-" {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read source from stdin")?;
        source
    } else {
        std::fs::read_to_string(&args.source).with_context(|| format!("failed to read {}", args.source))?
    };
    let dialect = Dialect::builtin(&args.dialect).with_context(|| {
        format!(
            "unknown dialect `{}` (built-in: {})",
            args.dialect,
            Dialect::BUILTIN_NAMES.join(", ")
        )
    })?;

    let tree = match minijs::parse_to_json(&source, args.shape) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("syntax error: {err}");
            return Ok(ExitCode::from(EXIT_FAILED));
        }
    };
    let node = astalign::normalize(&tree, &dialect)?;
    print!("{}", astalign::render(&node));
    Ok(ExitCode::SUCCESS)
}

fn categories(args: &CategoriesArgs) -> anyhow::Result<ExitCode> {
    let registry = Config::discover(args.config.as_deref())?.category_registry();
    match args.format {
        OutputFormat::Human => {
            let mut out = StandardStream::stdout(color_choice(false));
            report::write_categories(&mut out, &registry)?;
        }
        OutputFormat::Json => report::write_categories_json(&mut io::stdout().lock(), &registry)?,
    }
    Ok(ExitCode::SUCCESS)
}

//! Conformance corpus for astalign.
//!
//! The corpus under `corpus/` declares member and optional member expression
//! cases with a per-reference tolerance, and `snapshots/` holds the committed
//! primary-tree baselines for each case.
//!
//! The standard runner aligns a Hermes-shaped primary with espree- and
//! babel-shaped references, all backed by minijs. Set
//! `ASTALIGN_UPDATE_SNAPSHOTS=1` to rewrite baselines instead of checking them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use astalign_conformance::{load_corpus, standard_runner};
//!
//! let summary = standard_runner().run_corpus(&load_corpus().unwrap(), None);
//! assert!(summary.all_passed());
//! ```

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use astalign::{AlignmentRunner, Corpus, CorpusError, Dialect, FsSnapshotStore, Reference, SnapshotMode};
use minijs::MiniJsParser;
use tracing::info;

/// Environment variable that switches snapshot checks to rewrites.
pub const UPDATE_ENV: &str = "ASTALIGN_UPDATE_SNAPSHOTS";

/// Root of this package.
pub fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn corpus_path() -> PathBuf {
    root().join("corpus").join("member_expression.json")
}

pub fn snapshot_dir() -> PathBuf {
    root().join("snapshots")
}

pub fn load_corpus() -> Result<Corpus, CorpusError> {
    Corpus::load(&corpus_path())
}

/// `Update` when [`UPDATE_ENV`] is set to anything but `0`/empty.
pub fn snapshot_mode() -> SnapshotMode {
    match std::env::var(UPDATE_ENV) {
        Ok(value) if !value.is_empty() && value != "0" => SnapshotMode::Update,
        _ => SnapshotMode::Check,
    }
}

/// Hermes-shaped primary against espree and babel references, without snapshots.
pub fn reference_runner() -> AlignmentRunner {
    AlignmentRunner::new(Arc::new(MiniJsParser::hermes()))
        .reference(Reference::new("espree", Arc::new(MiniJsParser::espree()), Dialect::espree()))
        .reference(Reference::new("babel", Arc::new(MiniJsParser::babel()), Dialect::babel()))
}

/// [`reference_runner`] checking (or updating) the committed baselines.
pub fn standard_runner() -> AlignmentRunner {
    let mode = snapshot_mode();
    info!(dir = %snapshot_dir().display(), ?mode, "conformance snapshots");
    reference_runner().snapshots(Arc::new(FsSnapshotStore::new(snapshot_dir())), mode)
}

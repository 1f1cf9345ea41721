#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

//! # astalign
//!
//! Syntax-tree alignment between a primary JavaScript parser and one or more
//! reference parsers.
//!
//! For each declared case the runner parses the source with every parser,
//! normalizes the trees, compares them structurally and classifies the
//! differences against the tolerance the case declares for each reference.
//! Independently, the primary tree is rendered to deterministic text and
//! checked against a stored snapshot baseline.
//!
//! ## Pipeline
//!
//! - **Normalizer** ([`normalize()`]): strips position metadata and
//!   dialect-private fields, renames node types, orders fields canonically.
//! - **Comparator** ([`compare()`]): lock-step walk producing
//!   [`DifferenceRecord`]s.
//! - **Classifier** ([`classify()`]): turns differences plus a
//!   [`ToleranceSpec`] into an [`AlignmentVerdict`].
//! - **Snapshot Recorder** ([`render()`], [`record()`]): pretty-format text
//!   and baseline checks.
//! - **Runner** ([`AlignmentRunner`]): orchestrates the above per case.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use astalign::prelude::*;
//! use serde_json::json;
//!
//! let tree = json!({"type": "Program", "body": []});
//! let primary_tree = tree.clone();
//! let primary = Arc::new(FnParser::new("primary", move |_: &str| Ok(primary_tree.clone())));
//! let reference = Arc::new(FnParser::new("reference", move |_: &str| Ok(tree.clone())));
//!
//! let runner = AlignmentRunner::new(primary)
//!     .reference(Reference::new("reference", reference, Dialect::default()));
//! let report = runner.run(&AlignmentCase::new("empty", ""));
//! assert_eq!(report.verdict, Some(AlignmentVerdict::Pass));
//! ```

pub mod category;
pub mod classify;
pub mod compare;
pub mod corpus;
pub mod dialect;
pub mod node;
pub mod normalize;
pub mod parser;
pub mod runner;
pub mod snapshot;

pub use category::{CategoryRegistry, DivergenceCategory, PathPattern, PatternError};
pub use classify::{AlignmentVerdict, ToleranceSpec, UnknownCategory, classify, is_stale};
pub use compare::{DifferenceKind, DifferenceRecord, Observed, compare};
pub use corpus::{AlignmentCase, Corpus, CorpusError};
pub use dialect::{Dialect, IgnoreRule};
pub use node::{CanonicalNumber, Entry, NodePath, NodeValue, PathSegment, Scalar, SyntaxNode};
pub use normalize::{MAX_DEPTH, NormalizationError, NormalizeOptions, normalize, normalize_with};
pub use parser::{FnParser, ParserError, Reference, SourceParser, SyntaxError};
pub use runner::{AlignmentRunner, CaseError, CaseReport, RunSummary};
pub use snapshot::{
    FsSnapshotStore, MemorySnapshotStore, SnapshotCheck, SnapshotError, SnapshotMode,
    SnapshotOutcome, SnapshotStore, check, record, render,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::category::{CategoryRegistry, DivergenceCategory};
    pub use crate::classify::{AlignmentVerdict, ToleranceSpec};
    pub use crate::compare::{DifferenceKind, DifferenceRecord};
    pub use crate::corpus::{AlignmentCase, Corpus};
    pub use crate::dialect::Dialect;
    pub use crate::node::{NodeValue, Scalar, SyntaxNode};
    pub use crate::parser::{FnParser, ParserError, Reference, SourceParser, SyntaxError};
    pub use crate::runner::{AlignmentRunner, CaseReport, RunSummary};
    pub use crate::snapshot::{FsSnapshotStore, MemorySnapshotStore, SnapshotMode, SnapshotOutcome};
}

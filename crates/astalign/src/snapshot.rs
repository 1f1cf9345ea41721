//! Snapshot Recorder: deterministic tree text and baseline comparison.
//!
//! Trees render in the pretty-format layout used by Jest inline snapshots:
//!
//! ```text
//! Object {
//!   "name": "x",
//!   "type": "Identifier",
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use similar::TextDiff;
use tracing::debug;

use crate::node::{Entry, NodeValue, SyntaxNode, quote};

const INDENT: &str = "  ";

/// Render `tree` as snapshot text. The text always ends with a newline.
pub fn render(tree: &SyntaxNode) -> String {
    let mut out = String::new();
    write_node(&mut out, tree, 0);
    out.push('\n');
    out
}

fn write_node(out: &mut String, node: &SyntaxNode, depth: usize) {
    out.push_str("Object {\n");
    for entry in node.entries() {
        push_indent(out, depth + 1);
        match entry {
            Entry::Type(node_type) => {
                let _ = write!(out, "\"type\": {}", quote(node_type));
            }
            Entry::Field(name, value) => {
                let _ = write!(out, "{}: ", quote(name));
                write_value(out, value, depth + 1);
            }
        }
        out.push_str(",\n");
    }
    push_indent(out, depth);
    out.push('}');
}

fn write_value(out: &mut String, value: &NodeValue, depth: usize) {
    match value {
        NodeValue::Node(node) => write_node(out, node, depth),
        NodeValue::List(items) if items.is_empty() => out.push_str("Array []"),
        NodeValue::List(items) => {
            out.push_str("Array [\n");
            for item in items {
                push_indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            push_indent(out, depth);
            out.push(']');
        }
        NodeValue::Scalar(scalar) => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Result of comparing rendered text against a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCheck {
    pub matched: bool,
    /// Unified diff from baseline to rendered text; empty when matched.
    pub diff: String,
}

/// Compare `rendered` against `baseline` byte for byte.
pub fn check(rendered: &str, baseline: &str) -> SnapshotCheck {
    if rendered == baseline {
        return SnapshotCheck {
            matched: true,
            diff: String::new(),
        };
    }
    SnapshotCheck {
        matched: false,
        diff: unified_diff(baseline, rendered),
    }
}

fn unified_diff(baseline: &str, rendered: &str) -> String {
    let diff = TextDiff::from_lines(baseline, rendered);
    let mut result = String::from("--- baseline\n+++ rendered\n");
    for hunk in diff.unified_diff().iter_hunks() {
        let _ = write!(result, "{hunk}");
    }
    result
}

/// Snapshot store failure.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write snapshot {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Persisted baselines keyed by case identity.
pub trait SnapshotStore: Send + Sync {
    /// The stored baseline, `None` when nothing was recorded yet.
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError>;

    fn store(&self, key: &str, text: &str) -> Result<(), SnapshotError>;
}

/// One `<key>.snap` file per case under a directory.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the baseline for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.snap", sanitize_key(key)))
    }
}

/// Map a case name onto `[A-Za-z0-9_-]`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl SnapshotStore for FsSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SnapshotError::Read { path, source }),
        }
    }

    fn store(&self, key: &str, text: &str) -> Result<(), SnapshotError> {
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Write {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|source| SnapshotError::Write { path, source })
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a baseline.
    #[must_use]
    pub fn with_baseline(self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.lock().insert(key.into(), text.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.get(key))
    }

    fn store(&self, key: &str, text: &str) -> Result<(), SnapshotError> {
        self.entries.lock().insert(key.to_string(), text.to_string());
        Ok(())
    }
}

/// Whether a run checks baselines or rewrites them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotMode {
    #[default]
    Check,
    Update,
}

/// Snapshot signal reported for a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SnapshotOutcome {
    Matched,
    Mismatch { diff: String },
    /// No baseline recorded and the run was not updating.
    Missing,
    Written { replaced: bool },
    Error { message: String },
}

impl SnapshotOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Mismatch { .. } | Self::Missing | Self::Error { .. })
    }
}

/// Check `rendered` against the stored baseline for `key`, or rewrite it in
/// update mode. Unchanged baselines are never rewritten.
pub fn record(
    store: &dyn SnapshotStore,
    key: &str,
    rendered: &str,
    mode: SnapshotMode,
) -> Result<SnapshotOutcome, SnapshotError> {
    let baseline = store.load(key)?;
    match (baseline, mode) {
        (Some(baseline), _) if baseline == rendered => Ok(SnapshotOutcome::Matched),
        (Some(baseline), SnapshotMode::Check) => Ok(SnapshotOutcome::Mismatch {
            diff: check(rendered, &baseline).diff,
        }),
        (None, SnapshotMode::Check) => Ok(SnapshotOutcome::Missing),
        (baseline, SnapshotMode::Update) => {
            store.store(key, rendered)?;
            debug!(key, replaced = baseline.is_some(), "snapshot written");
            Ok(SnapshotOutcome::Written {
                replaced: baseline.is_some(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scalar;

    fn identifier(name: &str) -> SyntaxNode {
        SyntaxNode::new("Identifier")
            .with_field("name", name)
            .with_field("optional", false)
            .with_field("typeAnnotation", Scalar::Null)
    }

    #[test]
    fn renders_pretty_format_layout() {
        let tree = SyntaxNode::new("Program").with_field(
            "body",
            vec![SyntaxNode::new("ExpressionStatement").with_field("expression", identifier("x"))],
        );
        insta::assert_snapshot!(render(&tree).trim_end(), @r#"
        Object {
          "body": Array [
            Object {
              "expression": Object {
                "name": "x",
                "optional": false,
                "type": "Identifier",
                "typeAnnotation": null,
              },
              "type": "ExpressionStatement",
            },
          ],
          "type": "Program",
        }
        "#);
    }

    #[test]
    fn empty_lists_render_inline() {
        let tree = SyntaxNode::new("Program").with_field("body", Vec::<SyntaxNode>::new());
        assert_eq!(render(&tree), "Object {\n  \"body\": Array [],\n  \"type\": \"Program\",\n}\n");
    }

    #[test]
    fn strings_are_escaped() {
        let tree = SyntaxNode::new("Literal").with_field("raw", "'a\"b'");
        assert!(render(&tree).contains(r#""raw": "'a\"b'","#));
    }

    #[test]
    fn check_reports_one_line_diff() {
        let baseline = render(&identifier("x"));
        let rendered = render(&identifier("y"));
        let result = check(&rendered, &baseline);
        assert!(!result.matched);
        assert!(result.diff.starts_with("--- baseline\n+++ rendered\n"));
        let removed: Vec<_> = result.diff.lines().filter(|l| l.starts_with("-  ")).collect();
        let added: Vec<_> = result.diff.lines().filter(|l| l.starts_with("+  ")).collect();
        assert_eq!(removed, vec!["-  \"name\": \"x\","]);
        assert_eq!(added, vec!["+  \"name\": \"y\","]);

        assert!(check(&baseline, &baseline).matched);
    }

    #[test]
    fn record_check_and_update() {
        let store = MemorySnapshotStore::new().with_baseline("case", "old\n");

        let outcome = record(&store, "case", "new\n", SnapshotMode::Check).unwrap();
        assert!(matches!(outcome, SnapshotOutcome::Mismatch { .. }));
        assert!(outcome.is_failure());

        let outcome = record(&store, "case", "new\n", SnapshotMode::Update).unwrap();
        assert_eq!(outcome, SnapshotOutcome::Written { replaced: true });
        assert_eq!(store.get("case").as_deref(), Some("new\n"));

        let outcome = record(&store, "case", "new\n", SnapshotMode::Check).unwrap();
        assert_eq!(outcome, SnapshotOutcome::Matched);
    }

    #[test]
    fn missing_baselines() {
        let store = MemorySnapshotStore::new();
        assert_eq!(record(&store, "fresh", "x\n", SnapshotMode::Check).unwrap(), SnapshotOutcome::Missing);
        assert!(store.is_empty());
        assert_eq!(
            record(&store, "fresh", "x\n", SnapshotMode::Update).unwrap(),
            SnapshotOutcome::Written { replaced: false }
        );
    }

    #[test]
    fn keys_are_sanitized() {
        assert_eq!(sanitize_key("OptionalMemberExpression/Computed (parens)"), "OptionalMemberExpression_Computed__parens_");
        let store = FsSnapshotStore::new("snaps");
        assert_eq!(store.path_for("a b"), PathBuf::from("snaps").join("a_b.snap"));
    }
}

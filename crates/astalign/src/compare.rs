//! Structural Comparator: lock-step walk over two normalized trees.
//!
//! The reference tree is the baseline. Content the reference has and the
//! primary lacks is `missing-node`; content only the primary has is
//! `extra-node`. Comparison holds no tolerance logic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{NodePath, NodeValue, Scalar, SyntaxNode};
use crate::parser::SyntaxError;

/// Kind of structural disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifferenceKind {
    TypeMismatch,
    FieldMismatch,
    MissingNode,
    ExtraNode,
    /// The reference parser rejected the source.
    ReferenceParseError,
}

impl DifferenceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeMismatch => "type-mismatch",
            Self::FieldMismatch => "field-mismatch",
            Self::MissingNode => "missing-node",
            Self::ExtraNode => "extra-node",
            Self::ReferenceParseError => "reference-parse-error",
        }
    }
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A summary of the value one side held at a difference's path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Observed {
    /// A node of the given type.
    Node(String),
    /// A list of the given length.
    List(usize),
    Scalar(Scalar),
    /// A parse failure message.
    Error(String),
}

impl Observed {
    pub fn of(value: &NodeValue) -> Self {
        match value {
            NodeValue::Node(node) => Self::Node(node.node_type().to_string()),
            NodeValue::List(items) => Self::List(items.len()),
            NodeValue::Scalar(scalar) => Self::Scalar(scalar.clone()),
        }
    }

    /// The node type, when a node was observed.
    pub fn node_type(&self) -> Option<&str> {
        match self {
            Self::Node(node_type) => Some(node_type),
            _ => None,
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node_type) => write!(f, "{node_type} node"),
            Self::List(len) => write!(f, "list of {len}"),
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// One structural disagreement between a primary and a reference tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferenceRecord {
    pub path: NodePath,
    pub kind: DifferenceKind,
    pub primary: Option<Observed>,
    pub reference: Option<Observed>,
}

impl DifferenceRecord {
    /// Record standing in for a reference parser's rejection of the source.
    pub fn reference_parse_error(error: &SyntaxError) -> Self {
        Self {
            path: NodePath::root(),
            kind: DifferenceKind::ReferenceParseError,
            primary: None,
            reference: Some(Observed::Error(error.to_string())),
        }
    }
}

impl fmt::Display for DifferenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.path)?;
        match (&self.primary, &self.reference) {
            (Some(p), Some(r)) => write!(f, ": primary {p}, reference {r}"),
            (Some(p), None) => write!(f, ": primary {p}"),
            (None, Some(r)) => write!(f, ": reference {r}"),
            (None, None) => Ok(()),
        }
    }
}

/// Compare two normalized trees.
///
/// Records come out in traversal order. A `type` mismatch stops descent on
/// that branch, so no field records are produced beneath it.
pub fn compare(primary: &SyntaxNode, reference: &SyntaxNode) -> Vec<DifferenceRecord> {
    let mut walk = Walk::default();
    walk.nodes(primary, reference, &NodePath::root());
    walk.records
}

#[derive(Default)]
struct Walk {
    records: Vec<DifferenceRecord>,
}

impl Walk {
    fn push(
        &mut self,
        path: &NodePath,
        kind: DifferenceKind,
        primary: Option<Observed>,
        reference: Option<Observed>,
    ) {
        self.records.push(DifferenceRecord {
            path: path.clone(),
            kind,
            primary,
            reference,
        });
    }

    fn nodes(&mut self, primary: &SyntaxNode, reference: &SyntaxNode, path: &NodePath) {
        if primary.node_type() != reference.node_type() {
            self.push(
                path,
                DifferenceKind::TypeMismatch,
                Some(Observed::Node(primary.node_type().to_string())),
                Some(Observed::Node(reference.node_type().to_string())),
            );
            return;
        }

        for (name, value) in primary.fields() {
            let field_path = path.child(name);
            match reference.field(name) {
                Some(other) => self.values(value, other, &field_path),
                None => self.push(
                    &field_path,
                    DifferenceKind::ExtraNode,
                    Some(Observed::of(value)),
                    None,
                ),
            }
        }
        for (name, value) in reference.fields() {
            if primary.field(name).is_none() {
                self.push(
                    &path.child(name),
                    DifferenceKind::MissingNode,
                    None,
                    Some(Observed::of(value)),
                );
            }
        }
    }

    fn values(&mut self, primary: &NodeValue, reference: &NodeValue, path: &NodePath) {
        match (primary, reference) {
            (NodeValue::Node(p), NodeValue::Node(r)) => self.nodes(p, r, path),
            (NodeValue::List(p), NodeValue::List(r)) => self.lists(p, r, path),
            (NodeValue::Scalar(p), NodeValue::Scalar(r)) if p == r => {}
            _ => self.push(
                path,
                DifferenceKind::FieldMismatch,
                Some(Observed::of(primary)),
                Some(Observed::of(reference)),
            ),
        }
    }

    fn lists(&mut self, primary: &[NodeValue], reference: &[NodeValue], path: &NodePath) {
        for i in 0..primary.len().max(reference.len()) {
            let item_path = path.index(i);
            match (primary.get(i), reference.get(i)) {
                (Some(p), Some(r)) => self.values(p, r, &item_path),
                (Some(p), None) => {
                    self.push(&item_path, DifferenceKind::ExtraNode, Some(Observed::of(p)), None);
                }
                (None, Some(r)) => {
                    self.push(&item_path, DifferenceKind::MissingNode, None, Some(Observed::of(r)));
                }
                (None, None) => {}
            }
        }
    }
}

//! Tree Normalizer: raw parser output to comparison-ready [`SyntaxNode`]s.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::node::{CanonicalNumber, NodePath, NodeValue, Scalar, SyntaxNode};

/// Deepest object/array nesting a raw tree may have. Trees past this are
/// rejected, so comparison and rendering only ever walk bounded trees.
pub const MAX_DEPTH: usize = 512;

/// A raw tree that cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("node at {path} has no `type` discriminant")]
    MissingType { path: NodePath },

    #[error("node at {path} has a non-string `type` discriminant")]
    InvalidType { path: NodePath },

    #[error("tree root is not an object node")]
    NotANode,

    #[error("tree nests deeper than {max} levels at {path}", max = MAX_DEPTH)]
    TooDeep { path: NodePath },
}

/// Options that depend on the comparison, not on the dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Node types collapsed onto their child when they wrap exactly one node.
    pub unwrap: BTreeSet<String>,
}

impl NormalizeOptions {
    pub fn unwrapping<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unwrap: types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Normalize `raw` under `dialect` with no wrapper unwrapping.
pub fn normalize(raw: &Value, dialect: &Dialect) -> Result<SyntaxNode, NormalizationError> {
    normalize_with(raw, dialect, &NormalizeOptions::default())
}

/// Normalize `raw` under `dialect`.
///
/// Position fields and fields matched by the dialect's ignore rules are
/// dropped, node types are renamed onto the canonical vocabulary, and every
/// node's fields are arranged in the dialect's canonical order. Numbers are
/// canonicalized from their value; `raw` source text is kept verbatim.
pub fn normalize_with(
    raw: &Value,
    dialect: &Dialect,
    options: &NormalizeOptions,
) -> Result<SyntaxNode, NormalizationError> {
    let Value::Object(map) = raw else {
        return Err(NormalizationError::NotANode);
    };
    Normalizer { dialect, options }.node(map, &NodePath::root(), 0)
}

struct Normalizer<'a> {
    dialect: &'a Dialect,
    options: &'a NormalizeOptions,
}

impl Normalizer<'_> {
    fn node(
        &self,
        map: &Map<String, Value>,
        path: &NodePath,
        depth: usize,
    ) -> Result<SyntaxNode, NormalizationError> {
        let raw_type = match map.get("type") {
            Some(Value::String(node_type)) => node_type.as_str(),
            Some(_) => return Err(NormalizationError::InvalidType { path: path.clone() }),
            None => return Err(NormalizationError::MissingType { path: path.clone() }),
        };
        let node_type = self.dialect.canonical_type(raw_type);

        let mut node = SyntaxNode::new(node_type);
        for (key, value) in map {
            if key == "type"
                || self.dialect.is_position_field(key)
                || self.dialect.ignores(node_type, key, value)
            {
                continue;
            }
            let value = self.value(value, &path.child(key), depth)?;
            node.push_field(key.clone(), value);
        }
        node.arrange(|a, b| self.dialect.compare_keys(node_type, a, b));

        if self.options.unwrap.contains(node_type) {
            return Ok(node.into_singleton_child().unwrap_or_else(|wrapper| wrapper));
        }
        Ok(node)
    }

    fn value(&self, value: &Value, path: &NodePath, depth: usize) -> Result<NodeValue, NormalizationError> {
        if matches!(value, Value::Object(_) | Value::Array(_)) && depth >= MAX_DEPTH {
            return Err(NormalizationError::TooDeep { path: path.clone() });
        }
        Ok(match value {
            Value::Object(map) => NodeValue::Node(self.node(map, path, depth + 1)?),
            Value::Array(items) => NodeValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(item, &path.index(i), depth + 1))
                    .collect::<Result<Vec<_>, NormalizationError>>()?,
            ),
            Value::Null => NodeValue::Scalar(Scalar::Null),
            Value::Bool(b) => NodeValue::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => NodeValue::Scalar(Scalar::Number(CanonicalNumber::from_json(n))),
            Value::String(s) => NodeValue::Scalar(Scalar::String(s.clone())),
        })
    }
}

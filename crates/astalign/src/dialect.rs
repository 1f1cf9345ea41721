//! Dialect profiles: how one parser's raw output is canonicalized.
//!
//! A [`Dialect`] is plain data. It names the position metadata to strip,
//! the parser-private fields to drop, the node types to rename onto a shared
//! vocabulary, and the canonical field order. The built-in profiles cover the
//! Hermes snapshot form and the two reference pairings (espree and Babel).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer};

use crate::node::Scalar;

/// Strip one field from matching nodes.
///
/// With `node_type` unset the rule applies to every node. With `when` unset
/// the field is always dropped, otherwise only when its value equals `when`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawIgnoreRule")]
pub struct IgnoreRule {
    pub node_type: Option<String>,
    pub field: String,
    pub when: Option<Scalar>,
}

impl IgnoreRule {
    /// Drop `field` from every node.
    pub fn always(field: impl Into<String>) -> Self {
        Self {
            node_type: None,
            field: field.into(),
            when: None,
        }
    }

    /// Drop `field` from nodes of `node_type`.
    pub fn on(node_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            field: field.into(),
            when: None,
        }
    }

    /// Only drop the field when it holds `value`.
    #[must_use]
    pub fn when(mut self, value: impl Into<Scalar>) -> Self {
        self.when = Some(value.into());
        self
    }

    /// Only drop the field when it is `null`.
    #[must_use]
    pub fn when_null(mut self) -> Self {
        self.when = Some(Scalar::Null);
        self
    }

    fn matches(&self, node_type: &str, field: &str, value: &serde_json::Value) -> bool {
        if self.field != field {
            return false;
        }
        if self.node_type.as_deref().is_some_and(|t| t != node_type) {
            return false;
        }
        match &self.when {
            None => true,
            Some(expected) => Scalar::from_json(value).as_ref() == Some(expected),
        }
    }
}

/// Serialized form of [`IgnoreRule`]. TOML has no `null`, so `when_null`
/// stands in for `when = null`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIgnoreRule {
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    field: String,
    #[serde(default, deserialize_with = "present")]
    when: Option<Scalar>,
    #[serde(default)]
    when_null: bool,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Scalar>, D::Error> {
    Scalar::deserialize(deserializer).map(Some)
}

impl From<RawIgnoreRule> for IgnoreRule {
    fn from(raw: RawIgnoreRule) -> Self {
        let when = if raw.when_null {
            Some(Scalar::Null)
        } else {
            raw.when
        };
        Self {
            node_type: raw.node_type,
            field: raw.field,
            when,
        }
    }
}

/// Canonicalization profile for one parser or parser pairing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dialect {
    pub name: String,
    /// Source-position metadata, stripped from every node.
    pub position_fields: BTreeSet<String>,
    pub ignore: Vec<IgnoreRule>,
    /// Dialect-specific node type to canonical node type.
    pub rename_types: BTreeMap<String, String>,
    /// Per-type keys that sort first, in the listed order.
    pub field_order: BTreeMap<String, Vec<String>>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::named("default")
    }
}

impl Dialect {
    /// A profile that strips source positions and nothing else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position_fields: ["loc", "range", "start", "end"]
                .into_iter()
                .map(String::from)
                .collect(),
            ignore: Vec::new(),
            rename_types: BTreeMap::new(),
            field_order: BTreeMap::new(),
        }
    }

    /// Profile used to snapshot the primary (Hermes) tree.
    pub fn hermes_snapshot() -> Self {
        Self::named("hermes")
    }

    /// Pair profile for comparing the Hermes tree against espree (ESTree).
    pub fn espree() -> Self {
        let mut dialect = Self::named("espree");
        dialect.ignore = vec![
            IgnoreRule::on("Identifier", "optional").when(false),
            IgnoreRule::on("Identifier", "typeAnnotation").when_null(),
            IgnoreRule::on("ExpressionStatement", "directive").when_null(),
            IgnoreRule::on("Literal", "literalType"),
            IgnoreRule::on("Program", "sourceType"),
            IgnoreRule::always("typeArguments").when_null(),
        ];
        dialect
    }

    /// Pair profile for comparing the Hermes tree against Babel.
    pub fn babel() -> Self {
        let mut dialect = Self::named("babel");
        dialect.rename_types = [
            ("StringLiteral", "Literal"),
            ("NumericLiteral", "Literal"),
            ("BooleanLiteral", "Literal"),
            ("NullLiteral", "Literal"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();
        dialect.ignore = vec![
            IgnoreRule::always("extra"),
            IgnoreRule::on("Literal", "raw"),
            IgnoreRule::on("Literal", "literalType"),
            IgnoreRule::on("Literal", "value").when_null(),
            IgnoreRule::on("Identifier", "optional").when(false),
            IgnoreRule::on("Identifier", "typeAnnotation").when_null(),
            IgnoreRule::on("ExpressionStatement", "directive").when_null(),
            IgnoreRule::on("MemberExpression", "optional").when(false),
            IgnoreRule::on("CallExpression", "optional").when(false),
            IgnoreRule::on("Program", "sourceType"),
            IgnoreRule::always("typeArguments").when_null(),
        ];
        dialect
    }

    /// Look up a built-in profile by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "hermes" => Some(Self::hermes_snapshot()),
            "espree" => Some(Self::espree()),
            "babel" => Some(Self::babel()),
            "default" => Some(Self::default()),
            _ => None,
        }
    }

    /// Names accepted by [`Dialect::builtin`].
    pub const BUILTIN_NAMES: [&'static str; 4] = ["hermes", "espree", "babel", "default"];

    /// The canonical spelling of `node_type`.
    pub fn canonical_type<'a>(&'a self, node_type: &'a str) -> &'a str {
        self.rename_types
            .get(node_type)
            .map_or(node_type, String::as_str)
    }

    pub fn is_position_field(&self, field: &str) -> bool {
        self.position_fields.contains(field)
    }

    /// Whether `field` of a node with canonical type `node_type` is dropped.
    pub fn ignores(&self, node_type: &str, field: &str, value: &serde_json::Value) -> bool {
        self.ignore
            .iter()
            .any(|rule| rule.matches(node_type, field, value))
    }

    /// Canonical ordering of two keys (`type` included) of a `node_type` node.
    pub fn compare_keys(&self, node_type: &str, a: &str, b: &str) -> Ordering {
        let order = self.field_order.get(node_type);
        let rank = |key: &str| {
            order
                .and_then(|keys| keys.iter().position(|k| k == key))
                .unwrap_or(usize::MAX)
        };
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    }
}

//! Syntax node model shared by the normalizer, comparator and renderer.
//!
//! A [`SyntaxNode`] is a tagged tree node: a `type` discriminant plus an
//! ordered list of named fields. Field values are nested nodes, lists or
//! [`Scalar`] leaves. Nodes built by hand keep their fields in lexicographic
//! order; nodes produced by the normalizer follow the dialect's canonical
//! order.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical textual form of a numeric literal value.
///
/// Values print the way JavaScript's `Number.prototype.toString` prints them:
/// `2.0` and `2` are both `"2"`, `1e21` is `"1e+21"`, `1e-7` is `"1e-7"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalNumber(String);

impl CanonicalNumber {
    /// Canonicalize a floating point value.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self("NaN".to_string());
        }
        if value.is_infinite() {
            let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
            return Self(text.to_string());
        }
        if value == 0.0 {
            return Self("0".to_string());
        }
        // `{:e}` gives the shortest round-trip digits as `d[.ddd]e<exp>`.
        let scientific = format!("{:e}", value.abs());
        let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
        let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
        let point = exponent.parse::<i32>().unwrap_or(0) + 1;
        let sign = if value < 0.0 { "-" } else { "" };
        Self(format!("{sign}{}", js_notation(&digits, point)))
    }

    /// Canonicalize a JSON number regardless of its integer/float encoding.
    pub fn from_json(number: &serde_json::Number) -> Self {
        Self::from_f64(number.as_f64().unwrap_or(f64::NAN))
    }

    /// The canonical text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Place the decimal point `point` digits into `digits`, switching to
/// exponent form outside `1e-7 < |x| < 1e21`.
fn js_notation(digits: &str, point: i32) -> String {
    let zeros = |count: i32| "0".repeat(usize::try_from(count).unwrap_or_default());
    let width = i32::try_from(digits.len()).unwrap_or(i32::MAX);
    if width <= point && point <= 21 {
        format!("{digits}{}", zeros(point - width))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(usize::try_from(point).unwrap_or_default());
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", zeros(-point))
    } else {
        let exponent = point - 1;
        let sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{sign}{}", exponent.unsigned_abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", exponent.unsigned_abs())
        }
    }
}

impl fmt::Display for CanonicalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf value: identifier names, literal values, boolean flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(CanonicalNumber),
    String(String),
}

impl Scalar {
    /// Convert a JSON leaf. Objects and arrays are not scalars.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => Some(Self::Number(CanonicalNumber::from_json(n))),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Numeric scalar in canonical form.
    pub fn number(value: f64) -> Self {
        Self::Number(CanonicalNumber::from_f64(value))
    }

    /// Short name of the scalar's kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(&quote(s)),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => {
                if let Ok(i) = n.as_str().parse::<i64>() {
                    serializer.serialize_i64(i)
                } else if let Ok(f) = n.as_str().parse::<f64>() {
                    serializer.serialize_f64(f)
                } else {
                    serializer.serialize_str(n.as_str())
                }
            }
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number or a string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
        Ok(Scalar::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Number(CanonicalNumber::from_json(&v.into())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::Number(CanonicalNumber::from_json(&v.into())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar::String(v))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// The value held by a node field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Node(SyntaxNode),
    List(Vec<NodeValue>),
    Scalar(Scalar),
}

impl NodeValue {
    /// The node, if this value is one.
    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<SyntaxNode> for NodeValue {
    fn from(node: SyntaxNode) -> Self {
        Self::Node(node)
    }
}

impl From<Scalar> for NodeValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Vec<SyntaxNode>> for NodeValue {
    fn from(nodes: Vec<SyntaxNode>) -> Self {
        Self::List(nodes.into_iter().map(Self::Node).collect())
    }
}

/// One entry of a node in canonical order: either the `type` key or a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Type(&'a str),
    Field(&'a str, &'a NodeValue),
}

/// A tagged syntax tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    node_type: String,
    fields: Vec<(String, NodeValue)>,
    /// Position of the `type` key among the fields in canonical order.
    type_slot: usize,
}

impl SyntaxNode {
    /// Create a node with no fields.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            fields: Vec::new(),
            type_slot: 0,
        }
    }

    /// Builder: set a field, keeping fields in lexicographic order.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<NodeValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
        self.arrange(str::cmp);
        self
    }

    /// The `type` discriminant.
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&NodeValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Fields in canonical order, `type` excluded.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &NodeValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields, `type` excluded.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// All entries, `type` included, in canonical order.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = Vec::with_capacity(self.fields.len() + 1);
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i == self.type_slot {
                entries.push(Entry::Type(&self.node_type));
            }
            entries.push(Entry::Field(name, value));
        }
        if self.type_slot >= self.fields.len() {
            entries.push(Entry::Type(&self.node_type));
        }
        entries
    }

    /// Append a field without reordering. Callers must `arrange` afterwards.
    pub(crate) fn push_field(&mut self, name: String, value: NodeValue) {
        self.fields.push((name, value));
    }

    /// Sort fields with `cmp` and place the `type` key by the same ordering.
    pub(crate) fn arrange<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&str, &str) -> Ordering,
    {
        self.fields.sort_by(|a, b| cmp(&a.0, &b.0));
        self.type_slot = self
            .fields
            .iter()
            .take_while(|(k, _)| cmp(k, "type") == Ordering::Less)
            .count();
    }

    /// The single child node of a wrapper with exactly one field holding a node.
    pub(crate) fn into_singleton_child(mut self) -> Result<Self, Self> {
        if self.fields.len() != 1 {
            return Err(self);
        }
        match self.fields.pop() {
            Some((_, NodeValue::Node(child))) => Ok(child),
            Some(field) => {
                self.fields.push(field);
                Err(self)
            }
            None => Err(self),
        }
    }
}

/// One step in a path from the tree root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a value inside a tree, e.g. `body[0].expression.object`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The tree root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path to a named field below this one.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self(segments)
    }

    /// Path to an array element below this one.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Double-quote a string with JSON escaping.
pub(crate) fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_numbers_drop_integral_fraction() {
        assert_eq!(CanonicalNumber::from_f64(2.0).as_str(), "2");
        assert_eq!(CanonicalNumber::from_f64(-0.0).as_str(), "0");
        assert_eq!(CanonicalNumber::from_f64(0.5).as_str(), "0.5");
        assert_eq!(CanonicalNumber::from_f64(123.456).as_str(), "123.456");
        assert_eq!(CanonicalNumber::from_f64(-42.0).as_str(), "-42");
        assert_eq!(CanonicalNumber::from_f64(f64::INFINITY).as_str(), "Infinity");
        assert_eq!(CanonicalNumber::from_f64(f64::NAN).as_str(), "NaN");
    }

    #[test]
    fn canonical_numbers_switch_to_exponent_like_javascript() {
        assert_eq!(CanonicalNumber::from_f64(1e20).as_str(), "100000000000000000000");
        assert_eq!(CanonicalNumber::from_f64(1e21).as_str(), "1e+21");
        assert_eq!(CanonicalNumber::from_f64(1.5e300).as_str(), "1.5e+300");
        assert_eq!(CanonicalNumber::from_f64(0.000_001).as_str(), "0.000001");
        assert_eq!(CanonicalNumber::from_f64(1e-7).as_str(), "1e-7");
        assert_eq!(CanonicalNumber::from_f64(-1.25e-10).as_str(), "-1.25e-10");
    }

    #[test]
    fn canonical_numbers_agree_across_json_encodings() {
        let int: serde_json::Value = serde_json::from_str("2").unwrap();
        let float: serde_json::Value = serde_json::from_str("2.0").unwrap();
        assert_eq!(Scalar::from_json(&int), Scalar::from_json(&float));
    }

    #[test]
    fn with_field_keeps_lexicographic_order() {
        let node = SyntaxNode::new("Identifier")
            .with_field("typeAnnotation", Scalar::Null)
            .with_field("name", "x")
            .with_field("optional", false);
        let names: Vec<_> = node.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "optional", "typeAnnotation"]);

        let entries = node.entries();
        assert_eq!(entries[2], Entry::Type("Identifier"));
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn type_entry_trails_when_all_fields_sort_first() {
        let node = SyntaxNode::new("Program").with_field("body", Vec::<SyntaxNode>::new());
        let entries = node.entries();
        assert_eq!(entries.last(), Some(&Entry::Type("Program")));
    }

    #[test]
    fn with_field_replaces_existing_value() {
        let node = SyntaxNode::new("Identifier")
            .with_field("name", "x")
            .with_field("name", "y");
        assert_eq!(node.field_count(), 1);
        assert_eq!(node.field("name"), Some(&NodeValue::from("y")));
    }

    #[test]
    fn path_display() {
        let path = NodePath::root().child("body").index(0).child("expression");
        assert_eq!(path.to_string(), "body[0].expression");
        assert_eq!(NodePath::root().to_string(), "<root>");
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
        assert_eq!(quote("\u{8}\u{c}\t"), "\"\\b\\f\\t\"");
        assert_eq!(quote("caf\u{e9}"), "\"caf\u{e9}\"");
    }

    #[test]
    fn scalar_deserializes_from_untyped_input() {
        let scalar: Scalar = serde_json::from_str("false").unwrap();
        assert_eq!(scalar, Scalar::Bool(false));
        let scalar: Scalar = serde_json::from_str("null").unwrap();
        assert_eq!(scalar, Scalar::Null);
        let scalar: Scalar = serde_json::from_str("3.0").unwrap();
        assert_eq!(scalar, Scalar::number(3.0));
        let scalar: Scalar = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(scalar, Scalar::from("x"));
    }
}

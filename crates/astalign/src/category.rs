//! Registry of known divergence categories.
//!
//! A category names a family of differences that two parsers are known to
//! disagree on. A difference belongs to a category when its kind, the node
//! types each side observed, and its path all fit the category's description.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compare::{DifferenceKind, DifferenceRecord, Observed};
use crate::node::{NodePath, PathSegment};

/// Optional-chaining node shapes of the flat encoding.
pub const OPTIONAL_CHAIN_TYPES: [&str; 2] = ["OptionalMemberExpression", "OptionalCallExpression"];

/// A malformed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path pattern `{pattern}`: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Field(String),
    Index(usize),
    /// `*` or `[*]`: exactly one segment.
    One,
    /// `**`: any number of segments.
    Any,
}

/// Glob over [`NodePath`]s, e.g. `body[*].expression` or `**.callee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn matches(&self, path: &NodePath) -> bool {
        matches_from(&self.segments, path.segments())
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn matches_from(pattern: &[PatternSegment], path: &[PathSegment]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    match head {
        PatternSegment::Any => (0..=path.len()).any(|skip| matches_from(rest, &path[skip..])),
        _ => {
            let Some((first, tail)) = path.split_first() else {
                return false;
            };
            let fits = match (head, first) {
                (PatternSegment::One, _) => true,
                (PatternSegment::Field(want), PathSegment::Field(got)) => want == got,
                (PatternSegment::Index(want), PathSegment::Index(got)) => want == got,
                _ => false,
            };
            fits && matches_from(rest, tail)
        }
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let error = |reason| PatternError {
            pattern: pattern.to_string(),
            reason,
        };
        if pattern.is_empty() {
            return Err(error("pattern is empty"));
        }

        let mut segments = Vec::new();
        for piece in pattern.split('.') {
            match piece {
                "" => return Err(error("empty segment")),
                "*" => {
                    segments.push(PatternSegment::One);
                    continue;
                }
                "**" => {
                    segments.push(PatternSegment::Any);
                    continue;
                }
                _ => {}
            }
            let (name, mut indices) = piece.split_at(piece.find('[').unwrap_or(piece.len()));
            if !name.is_empty() {
                segments.push(PatternSegment::Field(name.to_string()));
            }
            while !indices.is_empty() {
                let Some(close) = indices.find(']') else {
                    return Err(error("unclosed `[`"));
                };
                let inner = &indices[1..close];
                if inner == "*" {
                    segments.push(PatternSegment::One);
                } else {
                    let index = inner.parse().map_err(|_| error("index is not a number"))?;
                    segments.push(PatternSegment::Index(index));
                }
                indices = &indices[close + 1..];
                if !indices.is_empty() && !indices.starts_with('[') {
                    return Err(error("text after `]`"));
                }
            }
        }
        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }
}

impl TryFrom<String> for PathPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A registered divergence category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DivergenceCategory {
    pub tag: String,
    #[serde(default)]
    pub description: String,
    /// Accepted difference kinds.
    pub kinds: Vec<DifferenceKind>,
    /// When non-empty, the primary must have observed one of these node types.
    #[serde(default)]
    pub primary_types: Vec<String>,
    /// When non-empty, the reference must have observed one of these node types.
    #[serde(default)]
    pub reference_types: Vec<String>,
    #[serde(default)]
    pub path_pattern: Option<PathPattern>,
    /// Wrapper node types collapsed before comparing under this category.
    #[serde(default)]
    pub unwrap: Vec<String>,
}

impl DivergenceCategory {
    pub fn new(tag: impl Into<String>, kinds: impl IntoIterator<Item = DifferenceKind>) -> Self {
        Self {
            tag: tag.into(),
            description: String::new(),
            kinds: kinds.into_iter().collect(),
            primary_types: Vec::new(),
            reference_types: Vec::new(),
            path_pattern: None,
            unwrap: Vec::new(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn primary_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn reference_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn at_paths(mut self, pattern: PathPattern) -> Self {
        self.path_pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn unwrapping<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unwrap = types.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `record` is explained by this category.
    pub fn accepts(&self, record: &DifferenceRecord) -> bool {
        self.kinds.contains(&record.kind)
            && type_allowed(&self.primary_types, record.primary.as_ref())
            && type_allowed(&self.reference_types, record.reference.as_ref())
            && self
                .path_pattern
                .as_ref()
                .is_none_or(|pattern| pattern.matches(&record.path))
    }
}

fn type_allowed(allowed: &[String], observed: Option<&Observed>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    observed
        .and_then(Observed::node_type)
        .is_some_and(|node_type| allowed.iter().any(|t| t == node_type))
}

/// Ordered set of categories, keyed by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<DivergenceCategory>,
}

impl CategoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The categories every runner knows about.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            DivergenceCategory::new("ast-diff", [DifferenceKind::TypeMismatch])
                .describe("flat optional-chain nodes where the reference uses another shape")
                .primary_types(OPTIONAL_CHAIN_TYPES),
        );
        registry.register(
            DivergenceCategory::new("chain-wrapper", [DifferenceKind::TypeMismatch])
                .describe("flat optional-chain nodes against unwrapped ChainExpression contents")
                .primary_types(OPTIONAL_CHAIN_TYPES)
                .reference_types(["MemberExpression", "CallExpression"])
                .unwrapping(["ChainExpression"]),
        );
        registry.register(
            DivergenceCategory::new("reference-rejects", [DifferenceKind::ReferenceParseError])
                .describe("the reference parser rejects syntax the primary accepts"),
        );
        registry
    }

    /// Add `category`, replacing any category with the same tag.
    pub fn register(&mut self, category: DivergenceCategory) {
        match self.categories.iter_mut().find(|c| c.tag == category.tag) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&DivergenceCategory> {
        self.categories.iter().find(|c| c.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DivergenceCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

//! Parser interface: source text in, raw JSON tree out.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dialect::Dialect;

/// A parser's rejection of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Attach a 1-based line and column.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " ({line}:{column})"),
            (Some(line), None) => write!(f, " (line {line})"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Why a parser produced no tree.
///
/// Only [`ParserError::Syntax`] says anything about the source; a
/// [`ParserError::Failure`] means the parser itself could not be run or
/// answered with something that is not a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParserError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{0}")]
    Failure(String),
}

impl ParserError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

/// A black-box parser.
pub trait SourceParser: Send + Sync {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    /// Parse `source` into a raw tree of JSON objects carrying `type` keys.
    fn parse(&self, source: &str) -> Result<Value, ParserError>;
}

/// Adapts a closure into a [`SourceParser`].
pub struct FnParser<F> {
    name: String,
    parse: F,
}

impl<F> FnParser<F>
where
    F: Fn(&str) -> Result<Value, ParserError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, parse: F) -> Self {
        Self {
            name: name.into(),
            parse,
        }
    }
}

impl<F> SourceParser for FnParser<F>
where
    F: Fn(&str) -> Result<Value, ParserError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, source: &str) -> Result<Value, ParserError> {
        (self.parse)(source)
    }
}

impl<F> fmt::Debug for FnParser<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnParser").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A reference parser paired with the dialect used to normalize both sides
/// of its comparison against the primary.
#[derive(Clone)]
pub struct Reference {
    pub name: String,
    pub parser: Arc<dyn SourceParser>,
    pub dialect: Dialect,
}

impl Reference {
    pub fn new(name: impl Into<String>, parser: Arc<dyn SourceParser>, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            parser,
            dialect,
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("name", &self.name)
            .field("parser", &self.parser.name())
            .field("dialect", &self.dialect.name)
            .finish()
    }
}

#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # minijs
//!
//! A small parser for JavaScript expression statements: identifiers,
//! literals, parentheses, member access, calls and optional chaining.
//!
//! The same parse can be emitted in three tree shapes:
//!
//! - [`Shape::Hermes`]: flat `OptionalMemberExpression`/`OptionalCallExpression`
//!   chains with Hermes-style `Literal` and `Identifier` fields.
//! - [`Shape::Babel`]: the same flat chains with Babel's typed literals.
//! - [`Shape::Estree`]: plain member/call nodes wrapped in a `ChainExpression`.
//!
//! ```rust
//! use minijs::{Shape, parse_to_json};
//!
//! let tree = parse_to_json("one?.two;", Shape::Estree).unwrap();
//! assert_eq!(tree["body"][0]["expression"]["type"], "ChainExpression");
//! ```

mod ast;
mod emit;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use astalign::{ParserError, SourceParser, SyntaxError};
use serde::Deserialize;
use serde_json::Value;

pub use ast::{Expr, LiteralValue, Program, Statement};
pub use emit::to_json;
pub use lexer::{Position, Span};
pub use parser::{MAX_NESTING_DEPTH, ParseOptions};

/// A syntax error with a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({line}:{column})")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, at: Position) -> Self {
        Self {
            message: message.into(),
            line: at.line,
            column: at.column + 1,
        }
    }
}

impl From<ParseError> for SyntaxError {
    fn from(error: ParseError) -> Self {
        Self::new(error.message).at(error.line, error.column)
    }
}

impl From<ParseError> for ParserError {
    fn from(error: ParseError) -> Self {
        Self::Syntax(error.into())
    }
}

/// Tree encoding to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Hermes,
    Babel,
    Estree,
}

impl Shape {
    pub const ALL: [Self; 3] = [Self::Hermes, Self::Babel, Self::Estree];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hermes => "hermes",
            Self::Babel => "babel",
            Self::Estree => "estree",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hermes" => Ok(Self::Hermes),
            "babel" => Ok(Self::Babel),
            "estree" | "espree" => Ok(Self::Estree),
            other => Err(format!("unknown tree shape `{other}` (expected hermes, babel or estree)")),
        }
    }
}

/// Parse a program with default options.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_with(source, ParseOptions::default())
}

pub fn parse_with(source: &str, options: ParseOptions) -> Result<Program, ParseError> {
    parser::Parser::new(source, options)?.parse_program()
}

/// Parse and emit in one step.
pub fn parse_to_json(source: &str, shape: Shape) -> Result<Value, ParseError> {
    parse(source).map(|program| to_json(&program, shape))
}

/// A minijs configuration usable as a primary or reference parser.
#[derive(Debug, Clone)]
pub struct MiniJsParser {
    name: String,
    shape: Shape,
    options: ParseOptions,
}

impl MiniJsParser {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            options: ParseOptions::default(),
        }
    }

    /// Hermes-shaped primary.
    pub fn hermes() -> Self {
        Self::new("hermes", Shape::Hermes)
    }

    /// Babel-shaped reference.
    pub fn babel() -> Self {
        Self::new("babel", Shape::Babel)
    }

    /// ESTree-shaped reference, standing in for espree.
    pub fn espree() -> Self {
        Self::new("espree", Shape::Estree)
    }

    /// Reject `?.` like a parser predating optional chaining.
    #[must_use]
    pub fn without_optional_chaining(mut self) -> Self {
        self.options.optional_chaining = false;
        self
    }

    pub const fn shape(&self) -> Shape {
        self.shape
    }
}

impl SourceParser for MiniJsParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, source: &str) -> Result<Value, ParserError> {
        let program = parse_with(source, self.options)?;
        Ok(to_json(&program, self.shape))
    }
}

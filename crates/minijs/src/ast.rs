//! Parsed program, independent of the emitted tree shape.

use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier {
        name: String,
        span: Span,
    },
    Literal {
        value: LiteralValue,
        raw: String,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
        /// `?.` directly before this link.
        optional: bool,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        optional: bool,
        span: Span,
    },
    /// Parentheses. Kept in the AST because they end an optional chain.
    Paren { expr: Box<Expr>, span: Span },
}

impl Expr {
    pub const fn span(&self) -> Span {
        match self {
            Self::Identifier { span, .. }
            | Self::Literal { span, .. }
            | Self::Member { span, .. }
            | Self::Call { span, .. }
            | Self::Paren { span, .. } => *span,
        }
    }

    /// Whether this link belongs to an optional chain: it or an unparenthesized
    /// link below it used `?.`.
    pub fn in_optional_chain(&self) -> bool {
        match self {
            Self::Member {
                object, optional, ..
            } => *optional || object.in_optional_chain(),
            Self::Call {
                callee, optional, ..
            } => *optional || callee.in_optional_chain(),
            Self::Identifier { .. } | Self::Literal { .. } | Self::Paren { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression { expression: Expr, span: Span },
    Empty { span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
    pub span: Span,
}

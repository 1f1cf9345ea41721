//! Recursive-descent parser over the token stream.

use crate::ParseError;
use crate::ast::{Expr, LiteralValue, Program, Statement};
use crate::lexer::{Lexer, Position, Span, Token, TokenKind};

/// Deepest expression nesting the parser accepts. Parentheses, brackets,
/// call arguments and chain links each count one level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Syntax toggles, for emulating parsers that lag behind the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub optional_chaining: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            optional_chaining: true,
        }
    }
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    index: usize,
    options: ParseOptions,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: ParseOptions) -> Result<Self, ParseError> {
        Ok(Self {
            source,
            tokens: Lexer::tokenize(source)?,
            index: 0,
            options,
            depth: 0,
        })
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current();
        let message = if token.kind == TokenKind::Eof {
            "Unexpected end of input".to_string()
        } else {
            format!("Unexpected token {}", token.kind)
        };
        ParseError::new(message, token.span.start_pos)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.at(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected())
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.at(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        let end = self.current().span;
        Ok(Program {
            body,
            span: Span {
                start: 0,
                end: end.end,
                start_pos: Position::START,
                end_pos: end.end_pos,
            },
        })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.at(&TokenKind::Semicolon) {
            let span = self.advance().span;
            return Ok(Statement::Empty { span });
        }
        let expression = self.expression()?;
        let mut span = expression.span();
        match self.current().kind {
            TokenKind::Semicolon => span = span.to(self.advance().span),
            TokenKind::Eof => {}
            _ if self.current().newline_before => {}
            _ => return Err(self.unexpected()),
        }
        Ok(Statement::Expression { expression, span })
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "Maximum nesting depth exceeded",
                self.current().span.start_pos,
            ));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let outer = self.depth;
        let expr = self.chain();
        self.depth = outer;
        expr
    }

    fn chain(&mut self) -> Result<Expr, ParseError> {
        self.descend()?;
        let mut expr = self.primary()?;
        loop {
            expr = match self.current().kind {
                TokenKind::Dot => {
                    self.descend()?;
                    self.advance();
                    let property = self.property_name()?;
                    member(expr, property, false, false, None)
                }
                TokenKind::LBracket => {
                    self.descend()?;
                    self.advance();
                    let property = self.expression()?;
                    let close = self.expect(&TokenKind::RBracket)?;
                    member(expr, property, true, false, Some(close))
                }
                TokenKind::LParen => {
                    self.descend()?;
                    self.call(expr, false)?
                }
                TokenKind::QuestionDot => {
                    if !self.options.optional_chaining {
                        return Err(self.unexpected());
                    }
                    self.descend()?;
                    self.advance();
                    match self.current().kind {
                        TokenKind::LBracket => {
                            self.advance();
                            let property = self.expression()?;
                            let close = self.expect(&TokenKind::RBracket)?;
                            member(expr, property, true, true, Some(close))
                        }
                        TokenKind::LParen => self.call(expr, true)?,
                        _ => {
                            let property = self.property_name()?;
                            member(expr, property, false, true, None)
                        }
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    fn property_name(&mut self) -> Result<Expr, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Ok(Expr::Identifier { name, span })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn call(&mut self, callee: Expr, optional: bool) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut arguments = Vec::new();
        while !self.at(&TokenKind::RParen) {
            arguments.push(self.expression()?);
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let close = self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call {
            span: callee.span().to(close),
            callee: Box::new(callee),
            arguments,
            optional,
        })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let source = self.source;
        let raw = || source[token.span.start..token.span.end].to_string();
        let expr = match &token.kind {
            TokenKind::Ident(name) => match name.as_str() {
                "true" | "false" => Expr::Literal {
                    value: LiteralValue::Bool(name == "true"),
                    raw: raw(),
                    span: token.span,
                },
                "null" => Expr::Literal {
                    value: LiteralValue::Null,
                    raw: raw(),
                    span: token.span,
                },
                _ => Expr::Identifier {
                    name: name.clone(),
                    span: token.span,
                },
            },
            TokenKind::Number(value) => Expr::Literal {
                value: LiteralValue::Number(*value),
                raw: raw(),
                span: token.span,
            },
            TokenKind::String(value) => Expr::Literal {
                value: LiteralValue::String(value.clone()),
                raw: raw(),
                span: token.span,
            },
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                return Ok(Expr::Paren {
                    expr: Box::new(inner),
                    span: token.span.to(close),
                });
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expr)
    }
}

fn member(object: Expr, property: Expr, computed: bool, optional: bool, close: Option<Span>) -> Expr {
    let end = close.unwrap_or_else(|| property.span());
    Expr::Member {
        span: object.span().to(end),
        object: Box::new(object),
        property: Box::new(property),
        computed,
        optional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program, ParseError> {
        Parser::new(source, ParseOptions::default())?.parse_program()
    }

    fn only_expression(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match program.body.into_iter().next() {
            Some(Statement::Expression { expression, .. }) => expression,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn chain_membership() {
        assert!(only_expression("one?.two.three").in_optional_chain());
        assert!(only_expression("one.two?.three").in_optional_chain());
        assert!(!only_expression("one.two.three").in_optional_chain());
        assert!(!only_expression("(one?.two).three").in_optional_chain());
        assert!(only_expression("f?.()").in_optional_chain());
    }

    #[test]
    fn statements_need_separators() {
        assert_eq!(parse("a; b\nc").unwrap().body.len(), 3);
        let err = parse("a b").unwrap_err();
        assert_eq!(err.message, "Unexpected token `b`");
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn empty_statements() {
        let program = parse(";x;").unwrap();
        assert!(matches!(program.body[0], Statement::Empty { .. }));
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn member_spans_cover_brackets() {
        let expr = only_expression("x['y']");
        assert_eq!((expr.span().start, expr.span().end), (0, 6));
    }

    #[test]
    fn call_arguments() {
        let Expr::Call { arguments, .. } = only_expression("f(a, 1, 'b',)") else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn optional_chaining_can_be_disabled() {
        let options = ParseOptions {
            optional_chaining: false,
        };
        let err = Parser::new("one?.two", options).unwrap().parse_program().unwrap_err();
        assert_eq!(err.message, "Unexpected token `?.`");
        assert!(Parser::new("one.two", options).unwrap().parse_program().is_ok());
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let parens = format!("{}x{};", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&parens).unwrap_err().message, "Maximum nesting depth exceeded");

        let links = format!("x{};", ".a".repeat(100_000));
        assert_eq!(parse(&links).unwrap_err().message, "Maximum nesting depth exceeded");

        let calls = format!("{}x{};", "f(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse(&calls).unwrap_err().message, "Maximum nesting depth exceeded");

        let shallow = format!("{}x{}.a?.b;", "(".repeat(100), ")".repeat(100));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn depth_resets_between_statements() {
        let statement = format!("{}x{};\n", "(".repeat(MAX_NESTING_DEPTH - 2), ")".repeat(MAX_NESTING_DEPTH - 2));
        assert!(parse(&statement.repeat(4)).is_ok());
    }

    #[test]
    fn unexpected_end() {
        assert_eq!(parse("x[").unwrap_err().message, "Unexpected end of input");
        assert_eq!(parse("(x").unwrap_err().message, "Unexpected end of input");
    }
}

//! Tokenizer.

use std::fmt;

use crate::ParseError;

/// A point in the source: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const START: Self = Self { line: 1, column: 0 };
}

/// Byte range plus the matching line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl Span {
    /// Span from the start of `self` to the end of `other`.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            start_pos: self.start_pos,
            end_pos: other.end_pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    String(String),
    Dot,
    QuestionDot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Number(value) => write!(f, "number `{value}`"),
            Self::String(_) => f.write_str("string"),
            Self::Dot => f.write_str("`.`"),
            Self::QuestionDot => f.write_str("`?.`"),
            Self::LBracket => f.write_str("`[`"),
            Self::RBracket => f.write_str("`]`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Comma => f.write_str("`,`"),
            Self::Semicolon => f.write_str("`;`"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub const fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(source: &'a str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    const fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.position())
    }

    /// Skip whitespace and comments; report whether a newline was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\u{2028}' | '\u{2029}' => {
                    newline = true;
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek_second() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '/' if self.peek_second() == Some('*') => {
                    let start = self.position();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some('\n') => newline = true,
                            Some(_) => {}
                            None => return Err(ParseError::new("Unterminated comment", start)),
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(newline)
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let start_pos = self.position();

        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) if is_ident_start(c) => self.identifier(),
            Some(c) if c.is_ascii_digit() => self.number()?,
            Some('.') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            Some(quote @ ('\'' | '"')) => self.string(quote)?,
            Some('?') => {
                let is_chain = self.peek_second() == Some('.')
                    && !self.source[self.pos..]
                        .chars()
                        .nth(2)
                        .is_some_and(|c| c.is_ascii_digit());
                if !is_chain {
                    return Err(self.error_here("Unexpected character '?'"));
                }
                self.bump();
                self.bump();
                TokenKind::QuestionDot
            }
            Some(c) => {
                let kind = match c {
                    '.' => TokenKind::Dot,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    ';' => TokenKind::Semicolon,
                    other => return Err(self.error_here(format!("Unexpected character '{other}'"))),
                };
                self.bump();
                kind
            }
        };

        Ok(Token {
            kind,
            span: Span {
                start,
                end: self.pos,
                start_pos,
                end_pos: self.position(),
            },
            newline_before,
        })
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        TokenKind::Ident(self.source[start..self.pos].to_string())
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let start_pos = self.position();

        let value = if self.peek() == Some('0') && matches!(self.peek_second(), Some('x' | 'X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.pos];
            u64::from_str_radix(digits, 16)
                .map_err(|_| ParseError::new("Invalid hexadecimal number", start_pos))?
                as f64
        } else {
            self.digits();
            if self.peek() == Some('.') {
                self.bump();
                self.digits();
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error_here("Invalid number"));
                }
                self.digits();
            }
            self.source[start..self.pos]
                .parse::<f64>()
                .map_err(|_| ParseError::new("Invalid number", start_pos))?
        };

        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error_here("Identifier directly after number"));
        }
        Ok(TokenKind::Number(value))
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        let start_pos = self.position();
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::new("Unterminated string constant", start_pos));
                }
                Some(c) if c == quote => return Ok(TokenKind::String(value)),
                Some('\\') => self.escape(&mut value)?,
                Some(c) => value.push(c),
            }
        }
    }

    fn escape(&mut self, value: &mut String) -> Result<(), ParseError> {
        let Some(c) = self.bump() else {
            return Err(self.error_here("Unterminated string constant"));
        };
        match c {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '0' => value.push('\0'),
            '\n' => {}
            'x' => value.push(self.hex_escape(2)?),
            'u' if self.peek() == Some('{') => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                    self.bump();
                }
                let digits = self.source[start..self.pos].to_string();
                if self.bump() != Some('}') {
                    return Err(self.error_here("Invalid Unicode escape sequence"));
                }
                value.push(code_point(&digits).ok_or_else(|| self.error_here("Invalid Unicode escape sequence"))?);
            }
            'u' => value.push(self.hex_escape(4)?),
            other => value.push(other),
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, ParseError> {
        let start = self.pos;
        for _ in 0..len {
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error_here("Bad character escape sequence"));
            }
            self.bump();
        }
        code_point(&self.source[start..self.pos])
            .ok_or_else(|| self.error_here("Bad character escape sequence"))
    }
}

fn code_point(hex: &str) -> Option<char> {
    u32::from_str_radix(hex, 16)
        .ok()
        .map(|code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn optional_chain_punctuation() {
        assert_eq!(
            kinds("one?.[2]"),
            vec![
                TokenKind::Ident("one".into()),
                TokenKind::QuestionDot,
                TokenKind::LBracket,
                TokenKind::Number(2.0),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn question_before_digit_is_not_a_chain() {
        let err = Lexer::tokenize("a?.5").unwrap_err();
        assert_eq!(err.message, "Unexpected character '?'");
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("0x1F")[0], TokenKind::Number(31.0));
        assert_eq!(kinds("1.5e3")[0], TokenKind::Number(1500.0));
        assert_eq!(kinds(".25")[0], TokenKind::Number(0.25));
        assert!(Lexer::tokenize("3in").is_err());
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(kinds(r"'a\'b'")[0], TokenKind::String("a'b".into()));
        assert_eq!(kinds(r#""A\x42\u{43}""#)[0], TokenKind::String("ABC".into()));
        let err = Lexer::tokenize("'open").unwrap_err();
        assert_eq!((err.message.as_str(), err.line, err.column), ("Unterminated string constant", 1, 1));
    }

    #[test]
    fn newlines_and_comments() {
        let tokens = Lexer::tokenize("a // note\n/* block\n */ b").unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].span.start_pos, Position { line: 3, column: 4 });
    }
}

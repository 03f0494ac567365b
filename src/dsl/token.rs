//! Token types for the LiquidCode lexer.

use std::fmt;

use super::error::Position;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
    /// Length of the lexeme in bytes.
    pub len: usize,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position::new(self.offset, self.line, self.col)
    }

    /// Byte offset one past the end of the lexeme.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    TypeCode(String), // Kp, Cn, ...
    Digit(u8),
    Number(String), // 12, 2.5 (lexeme kept)
    Str(String),
    Ident(String),

    // Sigils
    Colon,
    At,
    Lt,
    Gt,
    Bang,
    Star,
    Caret,
    Percent,
    Hash,
    Slash,
    Question,
    Eq,
    LBracket,
    RBracket,
    Comma,
    Arrow, // ->

    // Special
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::TypeCode(code) => write!(f, "type code '{code}'"),
            TokenKind::Digit(d) => write!(f, "digit {d}"),
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
            TokenKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::At => f.write_str("'@'"),
            TokenKind::Lt => f.write_str("'<'"),
            TokenKind::Gt => f.write_str("'>'"),
            TokenKind::Bang => f.write_str("'!'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Caret => f.write_str("'^'"),
            TokenKind::Percent => f.write_str("'%'"),
            TokenKind::Hash => f.write_str("'#'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Question => f.write_str("'?'"),
            TokenKind::Eq => f.write_str("'='"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Arrow => f.write_str("'->'"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

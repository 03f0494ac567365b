//! Lexer for LiquidCode.
//!
//! Converts source text into a flat stream of [`Token`]s. The lexer never
//! interprets meaning: `h` after `!` and `h` as a field name are the same
//! identifier token, and the parser decides by position.

use super::error::{CompileError, Position};
use super::token::{Token, TokenKind};

const BOM: char = '\u{feff}';

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    byte: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            byte: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        if self.chars.first() == Some(&BOM) {
            self.pos += 1;
            self.byte += BOM.len_utf8();
        }

        loop {
            self.skip_whitespace();
            self.skip_comment();

            if self.is_at_end() {
                tokens.push(self.token(TokenKind::Eof, self.here()));
                break;
            }

            let ch = self.peek();

            if ch == '\n' {
                let start = self.here();
                self.advance();
                tokens.push(self.token(TokenKind::Newline, start));
                continue;
            }

            let token = match ch {
                ':' => self.single_char(TokenKind::Colon),
                '@' => self.single_char(TokenKind::At),
                '<' => self.single_char(TokenKind::Lt),
                '>' => self.single_char(TokenKind::Gt),
                '!' => self.single_char(TokenKind::Bang),
                '*' => self.single_char(TokenKind::Star),
                '^' => self.single_char(TokenKind::Caret),
                '%' => self.single_char(TokenKind::Percent),
                '#' => self.single_char(TokenKind::Hash),
                '/' => self.single_char(TokenKind::Slash),
                '?' => self.single_char(TokenKind::Question),
                '=' => self.single_char(TokenKind::Eq),
                '[' => self.single_char(TokenKind::LBracket),
                ']' => self.single_char(TokenKind::RBracket),
                ',' => self.single_char(TokenKind::Comma),
                '"' => self.lex_string()?,
                '-' => self.lex_arrow()?,
                '0'..='9' => self.lex_number(),
                c if is_ident_start(c) => self.lex_word(),
                _ => {
                    return Err(CompileError::lex(
                        format!("unexpected character: '{ch}'"),
                        self.here(),
                    ));
                }
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        self.byte += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn here(&self) -> Position {
        Position::new(self.byte, self.line, self.col)
    }

    fn token(&self, kind: TokenKind, start: Position) -> Token {
        Token {
            kind,
            offset: start.offset,
            len: self.byte - start.offset,
            line: start.line,
            col: start.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && matches!(self.peek(), ' ' | '\t' | '\r') {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        if !self.is_at_end() && self.peek() == '/' && self.peek_next() == Some('/') {
            while !self.is_at_end() && self.peek() != '\n' {
                self.advance();
            }
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let start = self.here();
        self.advance();
        self.token(kind, start)
    }

    fn lex_string(&mut self) -> Result<Token, CompileError> {
        let start = self.here();
        self.advance(); // opening '"'
        let mut s = String::new();
        loop {
            if self.is_at_end() {
                return Err(CompileError::lex("unterminated string literal", start));
            }
            match self.advance() {
                '"' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(CompileError::lex("unterminated string literal", start));
                    }
                    let escaped = match self.advance() {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    };
                    s.push(escaped);
                }
                ch => s.push(ch),
            }
        }
        Ok(self.token(TokenKind::Str(s), start))
    }

    fn lex_arrow(&mut self) -> Result<Token, CompileError> {
        let start = self.here();
        if self.peek_next() == Some('>') {
            self.advance();
            self.advance();
            return Ok(self.token(TokenKind::Arrow, start));
        }
        Err(CompileError::lex("unexpected '-' (only '->' is valid)", start))
    }

    /// A lone digit becomes [`TokenKind::Digit`]; longer runs and decimals
    /// keep their lexeme as [`TokenKind::Number`].
    fn lex_number(&mut self) -> Token {
        let start = self.here();
        let mut s = String::new();

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance());
        }

        let is_decimal = !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_decimal {
            s.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }

        let kind = match s.as_bytes() {
            [d] => TokenKind::Digit(d - b'0'),
            _ => TokenKind::Number(s),
        };
        self.token(kind, start)
    }

    fn lex_word(&mut self) -> Token {
        let start = self.here();
        let mut s = String::new();

        while !self.is_at_end() && is_ident_continue(self.peek()) {
            s.push(self.advance());
        }

        let kind = if is_type_code(&s) {
            TokenKind::TypeCode(s)
        } else {
            TokenKind::Ident(s)
        };
        self.token(kind, start)
    }
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

/// Exactly one ASCII uppercase letter followed by one ASCII lowercase letter.
pub(crate) fn is_type_code(word: &str) -> bool {
    matches!(word.as_bytes(), [a, b] if a.is_ascii_uppercase() && b.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_type_code_and_field() {
        assert_eq!(
            kinds("Kp :revenue !h"),
            vec![
                TokenKind::TypeCode("Kp".into()),
                TokenKind::Colon,
                TokenKind::Ident("revenue".into()),
                TokenKind::Bang,
                TokenKind::Ident("h".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_type_code_must_be_whole_word() {
        assert_eq!(kinds("Kpi")[0], TokenKind::Ident("Kpi".into()));
        assert_eq!(kinds("KP")[0], TokenKind::Ident("KP".into()));
        assert_eq!(kinds("Tx")[0], TokenKind::TypeCode("Tx".into()));
    }

    #[test]
    fn lex_digit_vs_number() {
        assert_eq!(
            kinds("3 12 2.5"),
            vec![
                TokenKind::Digit(3),
                TokenKind::Number("12".into()),
                TokenKind::Number("2.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_dotted_identifier() {
        assert_eq!(kinds(":user.name")[1], TokenKind::Ident("user.name".into()));
    }

    #[test]
    fn lex_all_sigils() {
        assert_eq!(
            kinds(": @ < > ! * ^ % # / ? = [ ] , ->"),
            vec![
                TokenKind::Colon,
                TokenKind::At,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Bang,
                TokenKind::Star,
                TokenKind::Caret,
                TokenKind::Percent,
                TokenKind::Hash,
                TokenKind::Slash,
                TokenKind::Question,
                TokenKind::Eq,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(
            kinds(r#""a \"b\" \\ \n\t \q""#)[0],
            TokenKind::Str("a \"b\" \\ \n\t q".into())
        );
    }

    #[test]
    fn lex_newlines_and_comments() {
        assert_eq!(
            kinds("Tx // a comment\r\nBt"),
            vec![
                TokenKind::TypeCode("Tx".into()),
                TokenKind::Newline,
                TokenKind::TypeCode("Bt".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_skips_bom() {
        let tokens = Lexer::new("\u{feff}Kp").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::TypeCode("Kp".into()));
        assert_eq!(tokens[0].offset, 3);
        assert_eq!(tokens[0].col, 1);
    }

    #[test]
    fn lex_positions() {
        let tokens = Lexer::new("Cn [\n  Tx \"é\" :b]").tokenize().unwrap();
        let tx = &tokens[3];
        assert_eq!(tx.kind, TokenKind::TypeCode("Tx".into()));
        assert_eq!((tx.line, tx.col, tx.offset, tx.len), (2, 3, 7, 2));
        let s = &tokens[4];
        assert_eq!((s.col, s.len), (6, 4));
        let colon = &tokens[5];
        assert_eq!((colon.col, colon.offset), (10, 15));
    }

    #[test]
    fn lex_error_unterminated_string() {
        let err = Lexer::new("Tx \"open").tokenize().unwrap_err();
        assert_eq!(err.position(), Some(Position::new(3, 1, 4)));
    }

    #[test]
    fn lex_error_lone_dash() {
        assert!(Lexer::new("Kp - 3").tokenize().is_err());
    }

    #[test]
    fn lex_error_unknown_character() {
        let err = Lexer::new("Kp $").tokenize().unwrap_err();
        assert!(err.to_string().contains("'$'"));
        assert_eq!(err.position().map(|p| p.col), Some(4));
    }
}

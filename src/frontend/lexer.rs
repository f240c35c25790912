//! Lexer for Tern
//!
//! Converts source code into a stream of tokens.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{FileId, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current 1-based line and column
    line: u32,
    column: u32,
    /// Line and column of the current token start
    start_line: u32,
    start_column: u32,
    /// File ID for span tracking
    file_id: FileId,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str, file_id: FileId) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            file_id,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.file_id, self.start_line, self.start_column)
    }

    /// Create a token with the current span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Consume `next` if it follows, choosing between two kinds
    fn either(&mut self, next: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));

        self.make_token(kind)
    }

    /// Read a decimal integer literal
    fn read_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();

        match text.parse() {
            Ok(value) => self.make_token(TokenKind::IntLit(value)),
            Err(_) => self.make_token(TokenKind::IntOutOfRange(text)),
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        let mut value = String::new();

        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance();
                break;
            } else if c == '\\' {
                self.advance();
                match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                    None => break,
                }
            } else if c == '\n' {
                // Unterminated string
                break;
            } else {
                value.push(c);
                self.advance();
            }
        }

        self.make_token(TokenKind::StringLit(value))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some(c) = self.peek() else {
            return Token::eof(self.make_span());
        };

        if c.is_alphabetic() || c == '_' {
            return self.read_identifier();
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' {
            return self.read_string();
        }

        self.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => self.either('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => self.either('=', TokenKind::Ne, TokenKind::Not),
            '<' => self.either('=', TokenKind::Le, TokenKind::Lt),
            '>' => self.either('=', TokenKind::Ge, TokenKind::Gt),
            '&' => self.either('&', TokenKind::AndAnd, TokenKind::Unknown('&')),
            '|' => self.either('|', TokenKind::OrOr, TokenKind::Unknown('|')),
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '@' => TokenKind::At,
            _ => TokenKind::Unknown(c),
        };

        self.make_token(kind)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { }", 0);
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::Ident(ref s) if s == "int"));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2].kind, TokenKind::LParen));
        assert!(matches!(tokens[3].kind, TokenKind::RParen));
        assert!(matches!(tokens[4].kind, TokenKind::LBrace));
        assert!(matches!(tokens[5].kind, TokenKind::RBrace));
        assert!(matches!(tokens[6].kind, TokenKind::Eof));
    }

    #[test]
    fn test_keywords() {
        let mut lexer = Lexer::new("package import as public protected extern", 0);
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::Package));
        assert!(matches!(tokens[1].kind, TokenKind::Import));
        assert!(matches!(tokens[2].kind, TokenKind::As));
        assert!(matches!(tokens[3].kind, TokenKind::Public));
        assert!(matches!(tokens[4].kind, TokenKind::Protected));
        assert!(matches!(tokens[5].kind, TokenKind::Extern));
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("== != <= >= && || ! = < >", 0);
        let kinds: Vec<_> = lexer.tokenize().into_iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::EqEq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Not,
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        let mut lexer = Lexer::new(r#"42 1_000 "hello\nworld""#, 0);
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::IntLit(42)));
        assert!(matches!(tokens[1].kind, TokenKind::IntLit(1000)));
        assert!(matches!(tokens[2].kind, TokenKind::StringLit(ref s) if s == "hello\nworld"));
    }

    #[test]
    fn test_integer_overflow_keeps_text() {
        let mut lexer = Lexer::new("9223372036854775807 99_999_999_999_999_999_999", 0);
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::IntLit(i64::MAX)));
        assert!(matches!(tokens[1].kind, TokenKind::IntOutOfRange(ref s) if s == "99999999999999999999"));
        assert_eq!(tokens[1].span.column, 21);
    }

    #[test]
    fn test_positions_skip_comments() {
        let mut lexer = Lexer::new("// header\npackage /* inline */ test;", 3);
        let tokens = lexer.tokenize();

        assert_eq!((tokens[0].span.line, tokens[0].span.column), (2, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 22));
        assert_eq!(tokens[1].span.file_id, 3);
    }
}

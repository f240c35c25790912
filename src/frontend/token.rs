//! Token definitions for Tern

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// package
    Package,
    /// import
    Import,
    /// as
    As,
    /// struct
    Struct,
    /// if
    If,
    /// else
    Else,
    /// return
    Return,
    /// true
    True,
    /// false
    False,

    // ============ Visibility Keywords ============
    /// public
    Public,
    /// protected
    Protected,
    /// private
    Private,
    /// export
    Export,
    /// extern
    Extern,
    /// default (only meaningful as a section marker)
    Default,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name, function name, type name)
    Ident(String),
    /// Integer literal
    IntLit(i64),
    /// Integer literal that does not fit in `i64`
    IntOutOfRange(String),
    /// String literal
    StringLit(String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// !
    Not,
    /// .
    Dot,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ,
    Comma,
    /// :
    Colon,
    /// ;
    Semicolon,
    /// @ (annotation)
    At,

    // ============ Special ============
    /// End of file
    Eof,
    /// Unknown/invalid character
    Unknown(char),
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "package" => Some(TokenKind::Package),
            "import" => Some(TokenKind::Import),
            "as" => Some(TokenKind::As),
            "struct" => Some(TokenKind::Struct),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "return" => Some(TokenKind::Return),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "public" => Some(TokenKind::Public),
            "protected" => Some(TokenKind::Protected),
            "private" => Some(TokenKind::Private),
            "export" => Some(TokenKind::Export),
            "extern" => Some(TokenKind::Extern),
            "default" => Some(TokenKind::Default),
            _ => None,
        }
    }

    /// Get the precedence of a binary operator (for Pratt parsing)
    /// Returns None if not a binary operator
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            // Logical OR
            TokenKind::OrOr => Some(2),

            // Logical AND
            TokenKind::AndAnd => Some(3),

            // Equality
            TokenKind::EqEq | TokenKind::Ne => Some(7),

            // Comparison
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(8),

            // Additive
            TokenKind::Plus | TokenKind::Minus => Some(10),

            // Multiplicative (highest for binary)
            TokenKind::Star | TokenKind::Slash => Some(11),

            _ => None,
        }
    }

    /// Short human-readable form used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::IntLit(n) => format!("integer {}", n),
            TokenKind::IntOutOfRange(text) => format!("integer {}", text),
            TokenKind::StringLit(_) => "string literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Unknown(c) => format!("'{}'", c),
            other => format!("{:?}", other),
        }
    }
}

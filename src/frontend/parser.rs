//! Parser for Tern
//!
//! Recursive descent parser with Pratt parsing for expressions.

use std::cell::{Cell, OnceCell};

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, FileId, Result, Span};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file_id: FileId,
    /// Next index handed out for a `VarId`
    next_var: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer, file_id: FileId) -> Self {
        Self {
            tokens: lexer.tokenize(),
            pos: 0,
            file_id,
            next_var: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // the token stream always ends with Eof and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: self.current_kind().describe(),
            span: self.current().span,
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&expected.describe()))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn next_var_id(&mut self) -> VarId {
        let id = VarId::new(self.file_id, self.next_var);
        self.next_var += 1;
        id
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete source file
    pub fn parse_file(&mut self, path: &str) -> Result<SourceFile> {
        self.expect(TokenKind::Package)?;
        let package = self.parse_dotted()?;
        self.expect(TokenKind::Semicolon)?;

        let mut file = SourceFile {
            path: path.to_string(),
            package,
            imports: Vec::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            layout: Vec::new(),
        };

        while !self.is_at_end() {
            if self.check(&TokenKind::Import) {
                file.imports.push(self.parse_import()?);
            } else if let Some(visibility) = self.parse_section_marker() {
                file.layout.push(Layout::Section(visibility));
            } else {
                self.parse_declaration(&mut file)?;
            }
        }

        Ok(file)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident {
                    name: name.clone(),
                    span: token.span,
                })
            }
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    fn parse_dotted(&mut self) -> Result<DottedName> {
        let mut segments = vec![self.parse_ident()?];
        while self.consume(&TokenKind::Dot) {
            segments.push(self.parse_ident()?);
        }
        let span = segments[0].span.merge(&self.previous_span());
        Ok(DottedName { segments, span })
    }

    fn parse_import(&mut self) -> Result<Import> {
        let start = self.current().span;
        self.expect(TokenKind::Import)?;

        let path = self.parse_dotted()?;
        if path.segments.len() < 2 {
            return Err(Error::UnexpectedToken {
                expected: "'.'".to_string(),
                got: self.current_kind().describe(),
                span: self.current().span,
            });
        }

        let alias = if self.consume(&TokenKind::As) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Import {
            path,
            alias,
            span: start.merge(&self.previous_span()),
            resolved: OnceCell::new(),
        })
    }

    fn visibility_keyword(kind: &TokenKind) -> Option<Visibility> {
        match kind {
            TokenKind::Public => Some(Visibility::Public),
            TokenKind::Protected => Some(Visibility::Protected),
            TokenKind::Private => Some(Visibility::Private),
            TokenKind::Export => Some(Visibility::Export),
            TokenKind::Extern => Some(Visibility::Extern),
            _ => None,
        }
    }

    /// `public:` and friends; `default:` restores the default visibility
    fn parse_section_marker(&mut self) -> Option<Visibility> {
        if !matches!(self.peek_kind(1), TokenKind::Colon) {
            return None;
        }
        let visibility = match self.current_kind() {
            TokenKind::Default => Visibility::Default,
            kind => Self::visibility_keyword(kind)?,
        };
        self.advance();
        self.advance();
        Some(visibility)
    }

    fn parse_declaration(&mut self, file: &mut SourceFile) -> Result<()> {
        let start = self.current().span;

        let mut annotations = Vec::new();
        while self.consume(&TokenKind::At) {
            let name = self.parse_ident()?;
            match Annotation::from_name(&name.name) {
                Some(annotation) => annotations.push(annotation),
                None => {
                    return Err(Error::UnknownAnnotation {
                        name: name.name,
                        span: name.span,
                    })
                }
            }
        }

        let declared_visibility = Self::visibility_keyword(self.current_kind());
        if declared_visibility.is_some() {
            self.advance();
        }

        if self.check(&TokenKind::Struct) {
            let decl = self.parse_struct(start, declared_visibility)?;
            file.layout.push(Layout::Struct(file.structs.len()));
            file.structs.push(decl);
        } else if matches!(self.current_kind(), TokenKind::Ident(_)) {
            let func = self.parse_function(start, declared_visibility, annotations)?;
            file.layout.push(Layout::Function(file.functions.len()));
            file.functions.push(func);
        } else {
            return Err(self.unexpected("declaration (struct or function)"));
        }
        Ok(())
    }

    fn parse_struct(&mut self, start: Span, declared_visibility: Option<Visibility>) -> Result<StructDecl> {
        self.expect(TokenKind::Struct)?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let ty = self.parse_ident()?;
            let name = self.parse_ident()?;
            self.expect(TokenKind::Semicolon)?;
            fields.push(Field { ty, name });
        }
        self.expect(TokenKind::RBrace)?;

        Ok(StructDecl {
            name,
            fields,
            declared_visibility,
            visibility: OnceCell::new(),
            span: start.merge(&self.previous_span()),
        })
    }

    /// Parse a function definition
    fn parse_function(
        &mut self,
        start: Span,
        declared_visibility: Option<Visibility>,
        annotations: Vec<Annotation>,
    ) -> Result<Function> {
        let return_type = self.parse_ident()?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let body = if self.consume(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };

        Ok(Function {
            name,
            return_type,
            params,
            body,
            annotations,
            declared_visibility,
            visibility: OnceCell::new(),
            span: start.merge(&self.previous_span()),
            resolved_return: OnceCell::new(),
            check_state: Cell::new(CheckState::Unchecked),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<VarDecl>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_var_decl()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// `type name [= expr]`, without the trailing semicolon
    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let ty_name = self.parse_ident()?;
        let name = self.parse_ident()?;

        let init = if self.consume(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(VarDecl {
            id: self.next_var_id(),
            span: ty_name.span.merge(&self.previous_span()),
            name,
            ty_name,
            init,
            ty: OnceCell::new(),
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current().span;
        self.expect(TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            stmts,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Ident(_) if matches!(self.peek_kind(1), TokenKind::Ident(_)) => {
                let decl = self.parse_var_decl()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Ident(_) if self.at_assignment() => self.parse_assignment(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Looks past `name(.field)*` for an `=`
    fn at_assignment(&self) -> bool {
        let mut offset = 1;
        while matches!(self.peek_kind(offset), TokenKind::Dot)
            && matches!(self.peek_kind(offset + 1), TokenKind::Ident(_))
        {
            offset += 2;
        }
        matches!(self.peek_kind(offset), TokenKind::Eq)
    }

    fn parse_assignment(&mut self) -> Result<Stmt> {
        let base = VarRef::new(self.parse_ident()?);
        let mut fields = Vec::new();
        while self.consume(&TokenKind::Dot) {
            fields.push(self.parse_ident()?);
        }

        let target = if fields.is_empty() {
            AssignTarget::Var(base)
        } else {
            let span = base.name.span.merge(&self.previous_span());
            AssignTarget::Member { base, fields, span }
        };
        let start = match &target {
            AssignTarget::Var(var) => var.name.span,
            AssignTarget::Member { span, .. } => *span,
        };

        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Assign {
            target,
            value,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::If)?;

        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;

        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.consume(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Return)?;

        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Return {
            value,
            span: start.merge(&self.previous_span()),
        })
    }

    // ==================== Expression Parsing (Pratt) ====================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    /// Parse expression with binding power (Pratt parsing)
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_primary()?;

        loop {
            let op_token = self.current().clone();
            let Some(bp) = op_token.kind.binary_precedence() else {
                break;
            };

            if bp < min_bp {
                break;
            }

            self.advance();
            let op = Self::token_to_binop(&op_token)?;
            let right = self.parse_expr_bp(bp + 1)?;
            let span = left.span.merge(&right.span);

            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match &token.kind {
            TokenKind::IntLit(n) => {
                self.advance();
                Expr::new(ExprKind::Literal(Literal::Int(*n)), token.span)
            }
            TokenKind::IntOutOfRange(text) => {
                return Err(Error::IntegerOutOfRange {
                    literal: text.clone(),
                    span: token.span,
                })
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Expr::new(ExprKind::Literal(Literal::String(s.clone())), token.span)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                let value = matches!(token.kind, TokenKind::True);
                Expr::new(ExprKind::Literal(Literal::Bool(value)), token.span)
            }

            // Variable or call
            TokenKind::Ident(_) => {
                let name = self.parse_ident()?;
                if self.consume(&TokenKind::LParen) {
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                        args.push(self.parse_expr()?);
                        if !self.consume(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    let span = name.span.merge(&self.previous_span());
                    Expr::new(
                        ExprKind::Call {
                            name,
                            args,
                            callee: OnceCell::new(),
                        },
                        span,
                    )
                } else {
                    let span = name.span;
                    Expr::new(ExprKind::Var(VarRef::new(name)), span)
                }
            }

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                inner
            }

            // Unary operators
            TokenKind::Minus | TokenKind::Plus | TokenKind::Not => {
                self.advance();
                let op = match token.kind {
                    TokenKind::Minus => UnOp::Neg,
                    TokenKind::Plus => UnOp::Plus,
                    _ => UnOp::Not,
                };
                let operand = self.parse_primary()?;
                let span = token.span.merge(&operand.span);
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }

            _ => return Err(Error::ExpectedExpr { span: token.span }),
        };

        Ok(expr)
    }

    fn token_to_binop(token: &Token) -> Result<BinOp> {
        match token.kind {
            TokenKind::Plus => Ok(BinOp::Add),
            TokenKind::Minus => Ok(BinOp::Sub),
            TokenKind::Star => Ok(BinOp::Mul),
            TokenKind::Slash => Ok(BinOp::Div),
            TokenKind::EqEq => Ok(BinOp::Eq),
            TokenKind::Ne => Ok(BinOp::Ne),
            TokenKind::Lt => Ok(BinOp::Lt),
            TokenKind::Le => Ok(BinOp::Le),
            TokenKind::Gt => Ok(BinOp::Gt),
            TokenKind::Ge => Ok(BinOp::Ge),
            TokenKind::AndAnd => Ok(BinOp::And),
            TokenKind::OrOr => Ok(BinOp::Or),
            _ => Err(Error::UnexpectedToken {
                expected: "binary operator".to_string(),
                got: token.kind.describe(),
                span: token.span,
            }),
        }
    }
}

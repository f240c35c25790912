//! Abstract Syntax Tree definitions for Tern
//!
//! The parser builds the tree; semantic analysis never restructures it but
//! fills in the `OnceCell` annotations (effective visibility, bound
//! declarations, resolved types) exactly once each.

use std::cell::{Cell, OnceCell};
use std::fmt;

use crate::types::TypeId;
use crate::utils::{FileId, Span};

// ==================== Identifiers ====================

macro_rules! define_decl_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            pub file: FileId,
            pub index: usize,
        }

        impl $name {
            pub const fn new(file: FileId, index: usize) -> Self {
                Self { file, index }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}:{})"), self.file, self.index)
            }
        }
    };
}

define_decl_id!(FuncId);
define_decl_id!(StructId);
define_decl_id!(VarId);

// ==================== Forest ====================

/// Every parsed source file of one compilation
#[derive(Debug, Default)]
pub struct Forest {
    files: Vec<SourceFile>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// File id the next pushed file must be parsed with
    pub fn next_file_id(&self) -> FileId {
        self.files.len()
    }

    pub fn push(&mut self, file: SourceFile) -> FileId {
        let id = self.files.len();
        self.files.push(file);
        id
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id]
    }

    pub fn path(&self, id: FileId) -> &str {
        &self.files[id].path
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.files[id.file].functions[id.index]
    }

    pub fn struct_decl(&self, id: StructId) -> &StructDecl {
        &self.files[id.file].structs[id.index]
    }

    /// All functions in file order, then declaration order
    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.files.iter().enumerate().flat_map(|(file, source)| {
            (0..source.functions.len()).map(move |index| FuncId::new(file, index))
        })
    }

    /// Visit every expression node in the forest, default values included
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        for file in &self.files {
            for func in &file.functions {
                for param in &func.params {
                    if let Some(value) = &param.init {
                        value.visit(f);
                    }
                }
                if let Some(body) = &func.body {
                    body.visit_exprs(f);
                }
            }
        }
    }
}

/// A parsed compilation unit
#[derive(Debug)]
pub struct SourceFile {
    pub path: String,
    pub package: DottedName,
    pub imports: Vec<Import>,
    pub structs: Vec<StructDecl>,
    pub functions: Vec<Function>,
    /// Source order of section markers and declarations
    pub layout: Vec<Layout>,
}

/// One entry of [`SourceFile::layout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `public:`-style marker changing the default visibility
    Section(Visibility),
    Struct(usize),
    Function(usize),
}

// ==================== Declarations ====================

/// Identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Dotted identifier (`test.a.foo`)
#[derive(Debug, Clone, PartialEq)]
pub struct DottedName {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl fmt::Display for DottedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}

/// Declaration visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Default,
    Private,
    Protected,
    Public,
    Export,
    Extern,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Visibility::Default => "default",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
            Visibility::Export => "export",
            Visibility::Extern => "extern",
        };
        f.write_str(text)
    }
}

/// Declaration annotations (`@entrypoint`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Entrypoint,
}

impl Annotation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "entrypoint" => Some(Annotation::Entrypoint),
            _ => None,
        }
    }
}

/// `import pkg.name [as alias];`
#[derive(Debug)]
pub struct Import {
    pub path: DottedName,
    pub alias: Option<Ident>,
    pub span: Span,
    pub resolved: OnceCell<ImportTarget>,
}

impl Import {
    /// Package part of the path (everything but the last segment)
    pub fn package(&self) -> String {
        let count = self.path.segments.len().saturating_sub(1);
        self.path.segments[..count]
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Imported declaration name
    pub fn target(&self) -> &Ident {
        // the parser never produces an empty path
        &self.path.segments[self.path.segments.len() - 1]
    }

    /// Name the declaration is bound to in the importing file
    pub fn local_name(&self) -> &str {
        self.alias.as_ref().unwrap_or(self.target()).name.as_str()
    }
}

/// What an import resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum ImportTarget {
    Struct(StructId),
    Functions(Vec<FuncId>),
}

/// Struct definition
#[derive(Debug)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub declared_visibility: Option<Visibility>,
    pub visibility: OnceCell<Visibility>,
    pub span: Span,
}

impl StructDecl {
    /// Effective visibility once registered, declared otherwise
    pub fn visibility(&self) -> Visibility {
        self.visibility
            .get()
            .copied()
            .or(self.declared_visibility)
            .unwrap_or_default()
    }
}

/// Struct field
#[derive(Debug)]
pub struct Field {
    pub ty: Ident,
    pub name: Ident,
}

/// Type-checking progress of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    InProgress,
    Checked,
}

/// Function definition
#[derive(Debug)]
pub struct Function {
    pub name: Ident,
    pub return_type: Ident,
    pub params: Vec<VarDecl>,
    pub body: Option<Block>,
    pub annotations: Vec<Annotation>,
    pub declared_visibility: Option<Visibility>,
    pub visibility: OnceCell<Visibility>,
    pub span: Span,
    /// Resolved or deduced return type
    pub resolved_return: OnceCell<TypeId>,
    pub check_state: Cell<CheckState>,
}

impl Function {
    /// Effective visibility once registered, declared otherwise
    pub fn visibility(&self) -> Visibility {
        self.visibility
            .get()
            .copied()
            .or(self.declared_visibility)
            .unwrap_or_default()
    }

    pub fn is_extern(&self) -> bool {
        self.visibility() == Visibility::Extern
    }

    pub fn is_entrypoint(&self) -> bool {
        self.annotations.contains(&Annotation::Entrypoint)
    }

    /// Number of parameters without a default value
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.init.is_none()).count()
    }

    /// Whether a call with `args` arguments fits this signature
    pub fn accepts(&self, args: usize) -> bool {
        args >= self.required_params() && args <= self.params.len()
    }
}

/// Variable or parameter declaration
#[derive(Debug)]
pub struct VarDecl {
    pub id: VarId,
    pub name: Ident,
    pub ty_name: Ident,
    /// Initializer, or default value for parameters
    pub init: Option<Expr>,
    pub span: Span,
    pub ty: OnceCell<TypeId>,
}

impl VarDecl {
    /// Unannotated declarations use the `auto` placeholder
    pub fn is_auto(&self) -> bool {
        self.ty_name.name == "auto"
    }
}

// ==================== Statements ====================

/// Code block
#[derive(Debug)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        for stmt in &self.stmts {
            stmt.visit_exprs(f);
        }
    }
}

/// Statement
#[derive(Debug)]
pub enum Stmt {
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    VarDecl(VarDecl),
    Assign {
        target: AssignTarget,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Stmt::Block(block) => block.visit_exprs(f),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                cond.visit(f);
                then_branch.visit_exprs(f);
                if let Some(branch) = else_branch {
                    branch.visit_exprs(f);
                }
            }
            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    init.visit(f);
                }
            }
            Stmt::Assign { value, .. } => value.visit(f),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    value.visit(f);
                }
            }
            Stmt::Expr(expr) => expr.visit(f),
        }
    }
}

/// Left-hand side of an assignment
#[derive(Debug)]
pub enum AssignTarget {
    Var(VarRef),
    /// `base.field...`
    Member {
        base: VarRef,
        fields: Vec<Ident>,
        span: Span,
    },
}

/// A variable reference, bound by the resolver
#[derive(Debug)]
pub struct VarRef {
    pub name: Ident,
    pub binding: OnceCell<VarId>,
}

impl VarRef {
    pub fn new(name: Ident) -> Self {
        Self { name, binding: OnceCell::new() }
    }
}

// ==================== Expressions ====================

/// Expression node with its resolved type
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: OnceCell<TypeId>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span, ty: OnceCell::new() }
    }

    /// Visit this node and its children, parents first
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Var(_) => {}
            ExprKind::Call { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            ExprKind::Unary { operand, .. } => operand.visit(f),
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Literal),
    Var(VarRef),
    Call {
        name: Ident,
        args: Vec<Expr>,
        callee: OnceCell<FuncId>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    String(String),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Equality
    Eq,
    Ne,
    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// +
    Plus,
    /// -
    Neg,
    /// !
    Not,
}
